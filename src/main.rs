// src/main.rs
//
// Demo driver: opens a window on the headless desktop, simulates a short
// burst of OS activity, and logs the events that come out of the queue.

use std::path::PathBuf;

use anyhow::Context;
use log::{info, warn};

use core_window::config::Config;
use core_window::event::{DispatchMode, EventCategory, EventDriver};
use core_window::platform::{HeadlessPlatform, OsMessage, ResizeReason};
use core_window::video::{VideoInstance, WindowDesc, WindowFlags};

/// Environment variable naming an optional JSON config file.
const CONFIG_ENV: &str = "CORE_WINDOW_CONFIG";

fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = Config::load_or_default(config_path.as_deref());

    let mut driver =
        EventDriver::new(&config.driver, None).context("Failed to create event driver")?;
    if config.driver.dispatch.is_empty() {
        info!("No dispatch table configured; polling every category");
        driver.set_dispatch_mode_all(DispatchMode::Poll);
    }
    driver.set_dispatch_mode(EventCategory::WindowClose, DispatchMode::Callback);
    driver.set_callback(|event| {
        info!("Close requested for window {}", event.source_id);
    });

    let platform = HeadlessPlatform::new(&config.headless);
    let mut video = VideoInstance::new(&mut driver, platform, &config.video, None)
        .context("Failed to create video instance")?;

    let displays = video.displays();
    for handle in displays.handles()? {
        let display = displays.display(handle)?;
        info!(
            "Display {} '{}': {:?}, work area {:?}, scale {:?}, {} mode(s)",
            display.index,
            display.name,
            display.bounds,
            display.work_area,
            display.dpi_scale,
            display.modes.len()
        );
        for mode in display.modes.iter() {
            info!("  {}", mode);
        }
    }

    let desc = WindowDesc::new("core-window demo")
        .with_size(640, 480)
        .with_flags(WindowFlags::default() | WindowFlags::CENTER);
    let id = video
        .create_window(&desc)
        .context("Failed to create demo window")?;
    let surface = video.window(id)?.surface();

    let primary = video.displays().primary()?;
    video.window_mut(id)?.set_fullscreen(primary, true)?;
    video.pump_messages()?;
    video.window_mut(id)?.set_fullscreen(primary, false)?;
    video.window_mut(id)?.maximize()?;
    video.pump_messages()?;

    let platform = video.platform_mut();
    platform.inject(Some(surface), OsMessage::FocusChanged { focused: true });
    for step in 1..=5 {
        platform.inject(
            Some(surface),
            OsMessage::Resized {
                width: 640 + step * 10,
                height: 480 + step * 10,
                reason: ResizeReason::Restored,
            },
        );
    }
    platform.inject(Some(surface), OsMessage::CloseRequested);
    let routed = video.pump_messages()?;
    info!("Routed {} platform message(s)", routed);

    while let Some(event) = video.driver_mut().poll() {
        match event.category {
            EventCategory::WindowResized => info!("Resized to {:?}", event.size()),
            EventCategory::WindowMoved => info!("Moved to {:?}", event.position()),
            EventCategory::WindowStateChanged => info!("State {:?}", event.window_state()),
            other => info!("{:?} from source {}", other, event.source_id),
        }
    }

    let window = video.window(id)?;
    info!(
        "Window {} ends at {:?} in state {:?}",
        id,
        window.rect(),
        window.state()
    );
    if let Err(e) = video.destroy_window(id) {
        warn!("Failed to destroy window {}: {}", id, e);
    }
    info!("core-window demo finished");
    Ok(())
}

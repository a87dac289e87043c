// src/config.rs

//! Configuration structures for the windowing core.
//!
//! Every section is deserializable from JSON and falls back to defaults for
//! missing fields, so a config file only needs to name what it changes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::event::{DispatchMode, EventCategory};
use crate::geometry::{Rect, Size};

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Event driver construction settings.
    pub driver: DriverConfig,
    /// Window placement defaults.
    pub video: VideoConfig,
    /// Simulated desktop used by the headless platform.
    pub headless: HeadlessConfig,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse configuration JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Loads `path` if given and readable, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{:#}; using default configuration", e);
                Self::default()
            }
        }
    }
}

// --- Event Driver Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Starting slot count of the driver-owned queue. Rounded up to a power
    /// of two; the queue doubles when full.
    pub initial_queue_capacity: usize,
    /// Initial dispatch mode per category. Unlisted categories are `None`.
    pub dispatch: BTreeMap<EventCategory, DispatchMode>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            initial_queue_capacity: 64,
            dispatch: BTreeMap::new(),
        }
    }
}

// --- Video Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Margin from the display origin used for default window placement.
    pub default_window_offset: i32,
    /// Client size used when a window description leaves it zero.
    pub default_window_size: Size,
    pub default_title: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            default_window_offset: 32,
            default_window_size: Size::new(800, 600),
            default_title: "core-window".to_string(),
        }
    }
}

// --- Headless Platform Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    pub displays: Vec<HeadlessDisplayConfig>,
    /// Report geometry and visibility changes back as OS notifications, the
    /// way a real window system acknowledges them.
    pub echo_geometry: bool,
    /// Frame thickness added around decorated client areas.
    pub border_px: i32,
    pub title_bar_px: i32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            displays: vec![HeadlessDisplayConfig::default()],
            echo_geometry: true,
            border_px: 1,
            title_bar_px: 30,
        }
    }
}

/// One simulated monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessDisplayConfig {
    pub name: String,
    pub bounds: Rect,
    /// Defaults to `bounds` minus a 40px bottom task bar when absent.
    pub work_area: Option<Rect>,
    /// `None` simulates a platform without a DPI query.
    pub dpi: Option<(u32, u32)>,
    pub refresh_rate: u32,
    /// Raw mode list as the OS reports it, duplicates included.
    pub modes: Vec<HeadlessModeConfig>,
}

impl Default for HeadlessDisplayConfig {
    fn default() -> Self {
        HeadlessDisplayConfig {
            name: "HEADLESS-1".to_string(),
            bounds: Rect::new(0, 0, 1920, 1080),
            work_area: None,
            dpi: Some((96, 96)),
            refresh_rate: 60,
            modes: vec![
                HeadlessModeConfig::new(1920, 1080, 60, 32),
                HeadlessModeConfig::new(1280, 720, 60, 32),
            ],
        }
    }
}

impl HeadlessDisplayConfig {
    pub fn work_area(&self) -> Rect {
        self.work_area.unwrap_or_else(|| {
            let b = self.bounds;
            Rect::new(b.x, b.y, b.width, (b.height - 40).max(0))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HeadlessModeConfig {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub bits_per_pixel: u32,
}

impl HeadlessModeConfig {
    pub const fn new(width: u32, height: u32, refresh_rate: u32, bits_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            refresh_rate,
            bits_per_pixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = Config::from_json_str(
            r#"{
                "driver": { "dispatch": { "WindowClose": "Poll", "KeyDown": "Callback" } },
                "video": { "default_window_offset": 10 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.driver.initial_queue_capacity, 64);
        assert_eq!(
            config.driver.dispatch.get(&EventCategory::WindowClose),
            Some(&DispatchMode::Poll)
        );
        assert_eq!(
            config.driver.dispatch.get(&EventCategory::KeyDown),
            Some(&DispatchMode::Callback)
        );
        assert_eq!(config.video.default_window_offset, 10);
        assert_eq!(config.video.default_window_size, Size::new(800, 600));
        assert_eq!(config.headless.displays.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_error_and_load_or_default_recovers() {
        assert!(Config::from_json_str("{ not json").is_err());
        let missing = Path::new("/nonexistent/core-window.json");
        let config = Config::load_or_default(Some(missing));
        assert_eq!(config.video.default_window_offset, 32);
    }

    #[test]
    fn default_work_area_reserves_a_task_bar() {
        let display = HeadlessDisplayConfig::default();
        assert_eq!(display.work_area(), Rect::new(0, 0, 1920, 1040));
    }
}

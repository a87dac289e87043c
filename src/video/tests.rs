// src/video/tests.rs

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use test_log::test;

use super::*;
use crate::allocator::AllocatorDesc;
use crate::config::{DriverConfig, HeadlessConfig, HeadlessDisplayConfig};
use crate::display::DisplayHandle;
use crate::error::ErrorCode;
use crate::event::{DispatchMode, EventCategory};
use crate::geometry::{Point, Size};
use crate::input::{KeyState, Modifiers};
use crate::platform::{HeadlessPlatform, OsMessage, ResizeReason, SurfaceVisibility, WindowStyle};

fn poll_driver() -> EventDriver {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.set_dispatch_mode_all(DispatchMode::Poll);
    driver
}

/// Headless desktop that only reports what tests inject.
fn quiet_platform() -> HeadlessPlatform {
    HeadlessPlatform::new(&HeadlessConfig {
        echo_geometry: false,
        ..HeadlessConfig::default()
    })
}

fn instance(driver: &mut EventDriver) -> VideoInstance<'_, HeadlessPlatform> {
    VideoInstance::new(driver, quiet_platform(), &VideoConfig::default(), None).unwrap()
}

fn drain<P: Platform>(video: &mut VideoInstance<'_, P>) -> Vec<Event> {
    std::iter::from_fn(|| video.driver_mut().poll()).collect()
}

fn categories(events: &[Event]) -> Vec<EventCategory> {
    events.iter().map(|e| e.category).collect()
}

fn primary<P: Platform>(video: &VideoInstance<'_, P>) -> DisplayHandle {
    video.displays().primary().unwrap()
}

fn windowed(video: &mut VideoInstance<'_, HeadlessPlatform>) -> WindowId {
    let desc = WindowDesc::new("test")
        .with_size(640, 480)
        .with_position(100, 100);
    let id = video.create_window(&desc).unwrap();
    drain(video);
    id
}

#[test]
fn default_placement_offsets_from_the_display_origin() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = video.create_window(&WindowDesc::default()).unwrap();

    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(32, 32, 800, 600));
    assert_eq!(window.title(), "core-window");
    assert_eq!(window.state(), WindowState::Shown);

    let surface = video.platform().surface(window.surface()).unwrap();
    assert_eq!(surface.outer_rect, Rect::new(31, 1, 802, 632));
    assert!(surface.style.contains(WindowStyle::TITLE_BAR | WindowStyle::RESIZABLE));

    let events = drain(&mut video);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].window_state(), Some(WindowState::Shown));
}

#[test]
fn center_flag_uses_the_work_area() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let desc = WindowDesc::new("centred")
        .with_size(640, 480)
        .with_flags(WindowFlags::default() | WindowFlags::CENTER);
    let id = video.create_window(&desc).unwrap();
    assert_eq!(
        video.window(id).unwrap().rect(),
        Rect::new(640, 280, 640, 480)
    );
}

#[test]
fn window_without_shown_flag_starts_hidden() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let desc = WindowDesc::new("hidden").with_flags(WindowFlags::RESIZABLE);
    let id = video.create_window(&desc).unwrap();
    assert_eq!(video.window(id).unwrap().state(), WindowState::Hidden);
    assert!(drain(&mut video).is_empty());
}

#[test]
fn fullscreen_round_trip_restores_exact_geometry() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);
    let original_style = video.window(id).unwrap().style();

    video.window_mut(id).unwrap().set_fullscreen(display, true).unwrap();
    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(0, 0, 1920, 1080));
    assert_eq!(window.state(), WindowState::Fullscreen);
    assert_eq!(window.style(), WindowStyle::BORDERLESS);
    let surface = video.platform().surface(window.surface()).unwrap();
    assert_eq!(surface.outer_rect, Rect::new(0, 0, 1920, 1080));

    video.window_mut(id).unwrap().set_fullscreen(display, false).unwrap();
    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.style(), original_style);
    assert_eq!(window.state(), WindowState::Shown);

    let states: Vec<_> = drain(&mut video)
        .iter()
        .filter_map(Event::window_state)
        .collect();
    assert_eq!(states, vec![WindowState::Fullscreen, WindowState::Shown]);
}

#[test]
fn second_fullscreen_enable_keeps_the_first_snapshot() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);

    let mut window = video.window_mut(id).unwrap();
    window.set_fullscreen(display, true).unwrap();
    window.set_fullscreen(display, true).unwrap();
    assert_eq!(window.rect(), Rect::new(0, 0, 1920, 1080));
    window.set_fullscreen(display, false).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    window.set_fullscreen(display, false).unwrap();
    assert_eq!(window.state(), WindowState::Shown);
}

#[test]
fn fullscreen_on_an_unknown_display_changes_nothing() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let bogus = DisplayHandle::from_raw(77).unwrap();

    let err = video
        .window_mut(id)
        .unwrap()
        .set_fullscreen(bogus, true)
        .unwrap_err();
    assert_eq!(err, VideoError::InvalidDisplay(bogus));

    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
    let surface = video.platform().surface(window.surface()).unwrap();
    assert!(surface.style.is_decorated());
    assert!(drain(&mut video).is_empty());
}

#[test]
fn minimizing_twice_is_a_no_op() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);

    video.window_mut(id).unwrap().minimize().unwrap();
    let (rect, flags) = {
        let w = video.window(id).unwrap();
        (w.rect(), w.flags())
    };
    video.window_mut(id).unwrap().minimize().unwrap();
    let window = video.window(id).unwrap();
    assert_eq!((window.rect(), window.flags()), (rect, flags));
    assert_eq!(flags, WindowStateFlags::MINIMIZED);
    assert_eq!(drain(&mut video).len(), 1);
}

#[test]
fn minimize_leaves_fullscreen_first() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);

    let mut window = video.window_mut(id).unwrap();
    window.set_fullscreen(display, true).unwrap();
    window.minimize().unwrap();
    assert!(!window.is_fullscreen());
    assert!(window.is_minimized());
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
}

#[test]
fn maximize_fills_the_work_area_and_restore_returns() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);

    let mut window = video.window_mut(id).unwrap();
    window.maximize().unwrap();
    assert_eq!(window.rect(), Rect::new(1, 31, 1918, 1008));
    assert_eq!(window.state(), WindowState::Maximized);
    let surface = window.surface();
    window.maximize().unwrap();
    drop(window);
    let outer = video.platform().surface(surface).unwrap().outer_rect;
    assert_eq!(outer, Rect::new(0, 0, 1920, 1040));

    let mut window = video.window_mut(id).unwrap();

    window.minimize().unwrap();
    assert_eq!(window.flags(), WindowStateFlags::MINIMIZED);

    window.restore().unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
}

#[test]
fn hide_and_show_keep_the_maximized_state() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);

    let mut window = video.window_mut(id).unwrap();
    window.maximize().unwrap();
    window.hide().unwrap();
    assert_eq!(window.state(), WindowState::Hidden);
    window.show().unwrap();
    assert_eq!(window.state(), WindowState::Maximized);
    window.show().unwrap();
    assert_eq!(window.state(), WindowState::Maximized);
}

#[test]
fn center_moves_without_resizing_and_is_ignored_when_maximized() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);

    let mut window = video.window_mut(id).unwrap();
    window.center(display).unwrap();
    assert_eq!(window.rect(), Rect::new(640, 280, 640, 480));

    window.maximize().unwrap();
    window.center(display).unwrap();
    assert_eq!(window.rect(), Rect::new(1, 31, 1918, 1008));

    let bogus = DisplayHandle::from_raw(9).unwrap();
    assert_eq!(
        window.center(bogus).unwrap_err().code(),
        ErrorCode::InvalidDisplay
    );
}

#[test]
fn redundant_os_resize_pushes_nothing() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let surface = video.window(id).unwrap().surface();

    video.platform_mut().inject(
        Some(surface),
        OsMessage::Resized {
            width: 640,
            height: 480,
            reason: ResizeReason::Restored,
        },
    );
    assert_eq!(video.pump_messages().unwrap(), 1);
    assert!(drain(&mut video).is_empty());
}

#[test]
fn leaving_fullscreen_survives_a_display_change() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);

    video.window_mut(id).unwrap().set_fullscreen(display, true).unwrap();
    video
        .platform_mut()
        .set_displays(vec![HeadlessDisplayConfig::default()]);
    video.pump_messages().unwrap();
    assert!(video.displays().bounds(display).is_err());

    video.window_mut(id).unwrap().set_fullscreen(display, false).unwrap();
    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
    assert!(window.style().is_decorated());
}

#[test]
fn leaving_fullscreen_when_windowed_is_a_no_op() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let bogus = DisplayHandle::from_raw(77).unwrap();

    video.window_mut(id).unwrap().set_fullscreen(bogus, false).unwrap();
    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
    assert!(drain(&mut video).is_empty());
}

thread_local! {
    static QUEUE_BLOCKS: Cell<usize> = const { Cell::new(0) };
}

fn limited_alloc(size: usize, align: usize, _user: usize) -> *mut u8 {
    let left = QUEUE_BLOCKS.with(Cell::get);
    if left == 0 {
        return std::ptr::null_mut();
    }
    QUEUE_BLOCKS.with(|b| b.set(left - 1));
    let layout = std::alloc::Layout::from_size_align(size, align).unwrap();
    unsafe { std::alloc::alloc(layout) }
}

fn limited_free(ptr: *mut u8, size: usize, align: usize, _user: usize) {
    let layout = std::alloc::Layout::from_size_align(size, align).unwrap();
    unsafe { std::alloc::dealloc(ptr, layout) }
}

#[test]
fn failed_state_push_keeps_the_transition() {
    QUEUE_BLOCKS.with(|b| b.set(1));
    let desc = AllocatorDesc {
        alloc: Some(limited_alloc),
        free: Some(limited_free),
        user_data: 0,
    };
    let config = DriverConfig {
        initial_queue_capacity: 1,
        ..DriverConfig::default()
    };
    let mut driver = EventDriver::new(&config, Some(&desc)).unwrap();
    driver.set_dispatch_mode_all(DispatchMode::Poll);
    let mut video = instance(&mut driver);
    let desc = WindowDesc::new("hidden")
        .with_size(640, 480)
        .with_position(100, 100)
        .with_flags(WindowFlags::RESIZABLE);
    let id = video.create_window(&desc).unwrap();
    assert!(drain(&mut video).is_empty());
    video.driver_mut().push(&Event::user(1, 0, 0)).unwrap();

    let mut window = video.window_mut(id).unwrap();
    let err = window.show().unwrap_err();
    assert_eq!(err.code(), ErrorCode::OutOfMemory);
    assert_eq!(window.state(), WindowState::Shown);
    let surface = window.surface();
    drop(window);
    assert_eq!(
        video.platform().surface(surface).unwrap().visibility,
        SurfaceVisibility::Normal
    );
    assert_eq!(categories(&drain(&mut video)), vec![EventCategory::User]);
}

#[test]
fn os_maximize_pushes_state_change_before_resize() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let surface = video.window(id).unwrap().surface();

    video.platform_mut().inject(
        Some(surface),
        OsMessage::Resized {
            width: 1920,
            height: 1040,
            reason: ResizeReason::Maximized,
        },
    );
    video.pump_messages().unwrap();

    let events = drain(&mut video);
    assert_eq!(
        categories(&events),
        vec![EventCategory::WindowStateChanged, EventCategory::WindowResized]
    );
    assert_eq!(events[0].window_state(), Some(WindowState::Maximized));
    assert_eq!(events[1].size(), Some(Size::new(1920, 1040)));
    assert_eq!(events[1].source_id, u64::from(id));
    assert_eq!(video.window(id).unwrap().size(), Size::new(1920, 1040));
}

#[test]
fn os_minimize_updates_flags_but_not_size() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let surface = video.window(id).unwrap().surface();

    video.platform_mut().inject(
        Some(surface),
        OsMessage::Resized {
            width: 0,
            height: 0,
            reason: ResizeReason::Minimized,
        },
    );
    video.pump_messages().unwrap();

    let window = video.window(id).unwrap();
    assert!(window.is_minimized());
    assert_eq!(window.size(), Size::new(640, 480));
    let events = drain(&mut video);
    assert_eq!(categories(&events), vec![EventCategory::WindowStateChanged]);
}

#[test]
fn close_request_never_destroys_the_window() {
    let mut driver = poll_driver();
    driver.set_dispatch_mode(EventCategory::WindowClose, DispatchMode::None);
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let surface = video.window(id).unwrap().surface();

    video
        .platform_mut()
        .inject(Some(surface), OsMessage::CloseRequested);
    video.pump_messages().unwrap();
    assert!(drain(&mut video).is_empty());
    assert_eq!(video.window(id).unwrap().rect(), Rect::new(100, 100, 640, 480));

    video
        .driver_mut()
        .set_dispatch_mode(EventCategory::WindowClose, DispatchMode::Poll);
    video
        .platform_mut()
        .inject(Some(surface), OsMessage::CloseRequested);
    video.pump_messages().unwrap();
    let events = drain(&mut video);
    assert_eq!(categories(&events), vec![EventCategory::WindowClose]);
    assert_eq!(events[0].source_id, u64::from(id));
    assert!(video.window(id).is_ok());
    assert_eq!(video.platform().surface_count(), 1);
}

#[test]
fn window_ids_are_never_reused() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let first = windowed(&mut video);
    let second = windowed(&mut video);
    video.destroy_window(second).unwrap();
    let third = windowed(&mut video);

    assert_eq!((first.get(), second.get(), third.get()), (1, 2, 3));
    assert_eq!(
        video.window(second).unwrap_err(),
        VideoError::InvalidWindow(second)
    );
    assert_eq!(video.resolve(2).unwrap_err().code(), ErrorCode::InvalidWindow);
    assert_eq!(video.resolve(0).unwrap_err(), VideoError::NullPointer);
    assert_eq!(video.resolve(3).unwrap(), third);
    assert_eq!(
        video.destroy_window(second).unwrap_err().code(),
        ErrorCode::InvalidWindow
    );
    assert_eq!(video.platform().surface_count(), 2);
}

#[test]
fn failed_surface_creation_registers_nothing() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    video.platform_mut().fail_next_create();

    let err = video.create_window(&WindowDesc::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PlatformFailure);
    assert_eq!(video.window_count(), 0);
    assert!(crate::error::last_error().is_some());

    let id = video.create_window(&WindowDesc::default()).unwrap();
    assert_eq!(id.get(), 1);
}

#[test]
fn non_positive_sizes_are_rejected() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let err = video
        .create_window(&WindowDesc::new("flat").with_size(0, 100))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let id = windowed(&mut video);
    let err = video
        .window_mut(id)
        .unwrap()
        .set_size(Size::new(-1, 10))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    assert_eq!(video.window(id).unwrap().size(), Size::new(640, 480));
}

#[test]
fn geometry_changes_while_fullscreen_apply_on_exit() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let display = primary(&video);

    let mut window = video.window_mut(id).unwrap();
    window.set_fullscreen(display, true).unwrap();
    window.set_position(Point { x: 10, y: 20 }).unwrap();
    window.set_size(Size::new(300, 200)).unwrap();
    assert_eq!(window.rect(), Rect::new(0, 0, 1920, 1080));
    window.set_fullscreen(display, false).unwrap();
    assert_eq!(window.rect(), Rect::new(10, 20, 300, 200));
}

#[test]
fn fullscreen_flag_applies_after_creation() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let desc = WindowDesc::new("fs")
        .with_size(640, 480)
        .with_position(100, 100)
        .with_flags(WindowFlags::default() | WindowFlags::FULLSCREEN);
    let id = video.create_window(&desc).unwrap();
    let display = primary(&video);

    let mut window = video.window_mut(id).unwrap();
    assert_eq!(window.state(), WindowState::Fullscreen);
    window.set_fullscreen(display, false).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
}

#[test]
fn create_on_a_secondary_display() {
    let config = HeadlessConfig {
        echo_geometry: false,
        displays: vec![
            HeadlessDisplayConfig::default(),
            HeadlessDisplayConfig {
                name: "HEADLESS-2".to_string(),
                bounds: Rect::new(1920, 0, 1280, 1024),
                work_area: Some(Rect::new(1920, 0, 1280, 1024)),
                ..HeadlessDisplayConfig::default()
            },
        ],
        ..HeadlessConfig::default()
    };
    let mut driver = poll_driver();
    let mut video = VideoInstance::new(
        &mut driver,
        HeadlessPlatform::new(&config),
        &VideoConfig::default(),
        None,
    )
    .unwrap();
    let second = video.displays().handles().unwrap()[1];

    let desc = WindowDesc::new("right")
        .with_size(400, 300)
        .on_display(second)
        .with_flags(WindowFlags::default() | WindowFlags::MAXIMIZED);
    let id = video.create_window(&desc).unwrap();
    assert_eq!(video.window(id).unwrap().rect(), Rect::new(1921, 31, 1278, 992));

    video.window_mut(id).unwrap().restore().unwrap();
    assert_eq!(video.window(id).unwrap().rect(), Rect::new(1952, 32, 400, 300));
}

#[test]
fn os_notifications_route_to_the_owning_window() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let a = windowed(&mut video);
    let b = windowed(&mut video);
    let surface_b = video.window(b).unwrap().surface();
    let platform = video.platform_mut();
    platform.inject(Some(surface_b), OsMessage::FocusChanged { focused: true });
    platform.inject(
        Some(surface_b),
        OsMessage::Key {
            state: KeyState::Down,
            code: 30,
            modifiers: Modifiers::CONTROL,
        },
    );
    platform.inject(Some(surface_b), OsMessage::Moved { x: 5, y: 6 });

    assert_eq!(video.pump_messages().unwrap(), 3);
    let events = drain(&mut video);
    assert!(events.iter().all(|e| e.source_id == u64::from(b)));
    assert_eq!(events[1].key_code(), Some((30, Modifiers::CONTROL)));
    assert!(video.window(b).unwrap().has_focus());
    assert!(!video.window(a).unwrap().has_focus());
    assert_eq!(video.window(b).unwrap().position(), Point { x: 5, y: 6 });
}

#[test]
fn desktop_wide_and_stray_messages() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let stray = crate::platform::SurfaceHandle::from_raw(999).unwrap();
    let platform = video.platform_mut();
    platform.inject(Some(stray), OsMessage::CloseRequested);
    platform.inject(None, OsMessage::MouseWheel { dx: 0, dy: 1 });
    platform.set_displays(vec![HeadlessDisplayConfig::default()]);

    assert_eq!(video.pump_messages().unwrap(), 1);
    let events = drain(&mut video);
    assert_eq!(categories(&events), vec![EventCategory::MonitorListChanged]);
    assert_eq!(events[0].source_id, 0);
}

#[test]
fn callbacks_fire_during_the_pump() {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.set_dispatch_mode(EventCategory::WindowMoved, DispatchMode::Callback);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    driver.set_callback(move |event| sink.borrow_mut().extend(event.position()));

    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let surface = video.window(id).unwrap().surface();
    for x in 0..3 {
        video
            .platform_mut()
            .inject(Some(surface), OsMessage::Moved { x, y: 0 });
    }
    video.pump_messages().unwrap();
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(video.driver().pending(), 0);
}

#[test]
fn echoed_geometry_is_consistent_with_cached_state() {
    let mut driver = poll_driver();
    let mut video =
        VideoInstance::new(&mut driver, HeadlessPlatform::new(&HeadlessConfig::default()), &VideoConfig::default(), None)
            .unwrap();
    let id = windowed(&mut video);
    video.pump_messages().unwrap();
    drain(&mut video);

    video.window_mut(id).unwrap().maximize().unwrap();
    video.window_mut(id).unwrap().minimize().unwrap();
    video.window_mut(id).unwrap().restore().unwrap();
    video.pump_messages().unwrap();

    let window = video.window(id).unwrap();
    assert_eq!(window.rect(), Rect::new(100, 100, 640, 480));
    assert_eq!(window.state(), WindowState::Shown);
}

#[test]
fn native_handles_expose_the_surface() {
    let mut driver = poll_driver();
    let mut video = instance(&mut driver);
    let id = windowed(&mut video);
    let handles = video.native_handles(id).unwrap();
    assert!(handles.display.is_null());
    assert!(!handles.window.is_null());
    assert_eq!(video.window_mut(id).unwrap().native_handles().unwrap(), handles);
}

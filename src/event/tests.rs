// src/event/tests.rs

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use test_log::test;

use super::*;
use crate::allocator::{Allocator, AllocatorDesc};
use crate::config::DriverConfig;
use crate::error::{ErrorCode, VideoError};
use crate::geometry::{Point, Size};
use crate::input::{KeyState, Modifiers, MouseButton};
use crate::video::{WindowId, WindowState};

fn poll_driver() -> EventDriver {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.set_dispatch_mode_all(DispatchMode::Poll);
    driver
}

fn drain(driver: &mut EventDriver) -> Vec<Event> {
    std::iter::from_fn(|| driver.poll()).collect()
}

#[test]
fn category_indices_match_the_table_order() {
    for (i, category) in EventCategory::ALL.iter().enumerate() {
        assert_eq!(category.index(), i);
        assert_eq!(EventCategory::try_from(i as u32).unwrap(), *category);
    }
}

#[test]
fn out_of_range_category_is_invalid_argument() {
    let err = EventCategory::try_from(EventCategory::COUNT as u32).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[test]
fn payload_accessors_read_back_constructor_values() {
    let id = WindowId::from_raw(3).unwrap();
    assert_eq!(
        Event::window_moved(id, Point { x: -20, y: 45 }).position(),
        Some(Point { x: -20, y: 45 })
    );
    assert_eq!(
        Event::window_resized(id, Size::new(640, 480)).size(),
        Some(Size::new(640, 480))
    );
    assert_eq!(
        Event::window_state_changed(id, WindowState::Maximized).window_state(),
        Some(WindowState::Maximized)
    );
    let key = Event::key(9, KeyState::Repeat, 65, Modifiers::SHIFT);
    assert_eq!(key.category, EventCategory::KeyRepeat);
    assert_eq!(key.key_code(), Some((65, Modifiers::SHIFT)));
    let click = Event::mouse_button(9, MouseButton::Right, false, Point { x: 4, y: 5 });
    assert_eq!(click.category, EventCategory::MouseButtonUp);
    assert_eq!(click.button(), Some(MouseButton::Right));
    assert_eq!(click.position(), Some(Point { x: 4, y: 5 }));
    let user = Event::user(0xBEEF, 1, 2);
    assert_eq!((user.user_tag, user.payload), (0xBEEF, [1, 2]));
    assert_eq!(user.size(), None);
}

#[test]
fn non_coalescible_events_poll_in_push_order() {
    let mut driver = poll_driver();
    for i in 0..50 {
        driver.push(&Event::user(i, i, 0)).unwrap();
    }
    let tags: Vec<u64> = drain(&mut driver).iter().map(|e| e.user_tag).collect();
    assert_eq!(tags, (0..50).collect::<Vec<_>>());
    assert!(driver.poll().is_none());
}

#[test]
fn resize_events_for_one_window_coalesce_to_the_latest() {
    let mut driver = poll_driver();
    let id = WindowId::from_raw(1).unwrap();
    driver.push(&Event::window_resized(id, Size::new(100, 100))).unwrap();
    driver.push(&Event::window_resized(id, Size::new(200, 200))).unwrap();
    assert_eq!(driver.pending(), 1);

    let events = drain(&mut driver);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].size(), Some(Size::new(200, 200)));
}

#[test]
fn coalescing_keeps_the_first_position_and_other_sources_apart() {
    let mut driver = poll_driver();
    let a = WindowId::from_raw(1).unwrap();
    let b = WindowId::from_raw(2).unwrap();
    driver.push(&Event::window_moved(a, Point { x: 1, y: 1 })).unwrap();
    driver.push(&Event::window_close(a)).unwrap();
    driver.push(&Event::window_moved(b, Point { x: 5, y: 5 })).unwrap();
    driver.push(&Event::window_moved(a, Point { x: 9, y: 9 })).unwrap();
    driver.push(&Event::window_resized(a, Size::new(3, 3))).unwrap();

    let events = drain(&mut driver);
    let summary: Vec<(EventCategory, u64)> =
        events.iter().map(|e| (e.category, e.source_id)).collect();
    assert_eq!(
        summary,
        vec![
            (EventCategory::WindowMoved, 1),
            (EventCategory::WindowClose, 1),
            (EventCategory::WindowMoved, 2),
            (EventCategory::WindowResized, 1),
        ]
    );
    assert_eq!(events[0].position(), Some(Point { x: 9, y: 9 }));
}

#[test]
fn coalescing_stops_once_the_pending_entry_is_polled() {
    let mut driver = poll_driver();
    let id = WindowId::from_raw(1).unwrap();
    driver.push(&Event::window_moved(id, Point { x: 1, y: 1 })).unwrap();
    assert!(driver.poll().is_some());
    driver.push(&Event::window_moved(id, Point { x: 2, y: 2 })).unwrap();
    assert_eq!(driver.pending(), 1);
}

#[test]
fn mode_none_drops_silently() {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    driver.set_callback(move |_| counter.set(counter.get() + 1));

    for i in 0..10 {
        driver.push(&Event::user(i, 0, 0)).unwrap();
    }
    assert_eq!(driver.dispatch_mode(EventCategory::User), DispatchMode::None);
    assert!(driver.poll().is_none());
    assert_eq!(calls.get(), 0);
}

#[test]
fn callback_mode_runs_inside_push() {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.set_dispatch_mode(EventCategory::KeyDown, DispatchMode::Callback);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    driver.set_callback(move |event| sink.borrow_mut().push(*event));

    for code in 1..=3 {
        driver
            .push(&Event::key(0, KeyState::Down, code, Modifiers::empty()))
            .unwrap();
        assert_eq!(seen.borrow().len(), code as usize);
    }
    assert!(driver.poll().is_none());
    let codes: Vec<u32> = seen
        .borrow()
        .iter()
        .filter_map(|e| e.key_code().map(|(c, _)| c))
        .collect();
    assert_eq!(codes, vec![1, 2, 3]);
}

#[test]
fn callback_mode_without_callback_discards() {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.set_dispatch_mode(EventCategory::User, DispatchMode::Callback);
    driver.push(&Event::user(1, 0, 0)).unwrap();
    assert_eq!(driver.pending(), 0);
    assert!(driver.clear_callback().is_none());
}

#[test]
fn mode_changes_apply_to_the_next_push() {
    let mut driver = EventDriver::new(&DriverConfig::default(), None).unwrap();
    driver.push(&Event::user(1, 0, 0)).unwrap();
    driver.set_dispatch_mode(EventCategory::User, DispatchMode::Poll);
    driver.push(&Event::user(2, 0, 0)).unwrap();
    driver.set_dispatch_mode(EventCategory::User, DispatchMode::None);
    driver.push(&Event::user(3, 0, 0)).unwrap();
    let tags: Vec<u64> = drain(&mut driver).iter().map(|e| e.user_tag).collect();
    assert_eq!(tags, vec![2]);
}

#[test]
fn queue_growth_preserves_order() {
    let mut queue = RingQueue::with_capacity(2, Allocator::system()).unwrap();
    for i in 0..10 {
        queue.push(&Event::user(i, 0, 0)).unwrap();
    }
    assert_eq!(queue.len(), 10);
    assert!(queue.capacity() >= 10);
    let tags: Vec<u64> = std::iter::from_fn(|| queue.poll()).map(|e| e.user_tag).collect();
    assert_eq!(tags, (0..10).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[test]
fn queue_growth_with_wrapped_cursors_preserves_order() {
    let mut queue = RingQueue::with_capacity(4, Allocator::system()).unwrap();
    for i in 0..3 {
        queue.push(&Event::user(i, 0, 0)).unwrap();
    }
    queue.poll();
    queue.poll();
    for i in 3..12 {
        queue.push(&Event::user(i, 0, 0)).unwrap();
    }
    let tags: Vec<u64> = std::iter::from_fn(|| queue.poll()).map(|e| e.user_tag).collect();
    assert_eq!(tags, (2..12).collect::<Vec<_>>());
}

#[test]
fn zero_capacity_queue_is_rejected() {
    let err = RingQueue::with_capacity(0, Allocator::system()).err().unwrap();
    assert!(matches!(err, VideoError::InvalidArgument(_)));
    let config = DriverConfig {
        initial_queue_capacity: 0,
        ..DriverConfig::default()
    };
    assert!(EventDriver::new(&config, None).is_err());
}

thread_local! {
    static BUDGET: Cell<usize> = const { Cell::new(0) };
}

fn budget_alloc(size: usize, align: usize, _user: usize) -> *mut u8 {
    let left = BUDGET.with(Cell::get);
    if left == 0 {
        return std::ptr::null_mut();
    }
    BUDGET.with(|b| b.set(left - 1));
    let layout = std::alloc::Layout::from_size_align(size, align).unwrap();
    unsafe { std::alloc::alloc(layout) }
}

fn budget_free(ptr: *mut u8, size: usize, align: usize, _user: usize) {
    let layout = std::alloc::Layout::from_size_align(size, align).unwrap();
    unsafe { std::alloc::dealloc(ptr, layout) }
}

#[test]
fn failed_growth_surfaces_out_of_memory_from_push() {
    BUDGET.with(|b| b.set(1));
    let desc = AllocatorDesc {
        alloc: Some(budget_alloc),
        free: Some(budget_free),
        user_data: 0,
    };
    let config = DriverConfig {
        initial_queue_capacity: 2,
        ..DriverConfig::default()
    };
    let mut driver = EventDriver::new(&config, Some(&desc)).unwrap();
    driver.set_dispatch_mode(EventCategory::User, DispatchMode::Poll);
    driver.push(&Event::user(1, 0, 0)).unwrap();
    driver.push(&Event::user(2, 0, 0)).unwrap();
    let err = driver.push(&Event::user(3, 0, 0)).unwrap_err();
    assert_eq!(err, VideoError::OutOfMemory);
    assert!(crate::error::last_error().is_some());

    let tags: Vec<u64> = drain(&mut driver).iter().map(|e| e.user_tag).collect();
    assert_eq!(tags, vec![1, 2]);
}

#[test]
fn caller_supplied_queue_is_shared_with_the_caller() {
    let shared = SharedQueue::new(4, Allocator::system()).unwrap();
    let mut driver = EventDriver::with_queue(Box::new(shared.clone()), None).unwrap();
    assert!(!driver.owns_queue());
    driver.set_dispatch_mode(EventCategory::WindowFocus, DispatchMode::Poll);
    let id = WindowId::from_raw(2).unwrap();
    driver.push(&Event::window_focus(id, true)).unwrap();

    let handle = shared.clone();
    let drained = std::thread::spawn(move || handle.drain()).join().unwrap();
    assert_eq!(drained.len(), 1);
    assert!(drained[0].flag());
    assert_eq!(driver.pending(), 0);
    drop(driver);
    assert!(shared.try_poll().is_none());
}

#[test]
fn configured_dispatch_table_is_applied() {
    let mut config = DriverConfig::default();
    config
        .dispatch
        .insert(EventCategory::WindowClose, DispatchMode::Poll);
    let driver = EventDriver::new(&config, None).unwrap();
    assert!(driver.owns_queue());
    assert_eq!(
        driver.dispatch_mode(EventCategory::WindowClose),
        DispatchMode::Poll
    );
    assert_eq!(
        driver.dispatch_mode(EventCategory::WindowMoved),
        DispatchMode::None
    );
}

// src/event/mod.rs
//! Event records and the dispatch pipeline.
//!
//! - `Event`: fixed-size, copyable notification record
//! - `queue`: pending-event storage for POLL-mode categories
//! - `driver`: per-category routing to discard, queue, or callback

pub mod driver;
pub mod queue;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::error::{raise, VideoError};
use crate::geometry::{Point, Size};
use crate::input::{pack_key, unpack_key, KeyState, Modifiers, MouseButton};
use crate::video::{WindowId, WindowState};

pub use driver::{DispatchMode, EventCallback, EventDriver};
pub use queue::{EventQueue, RingQueue, SharedQueue};

/// Closed set of notification kinds. The discriminant doubles as the index
/// into a driver's dispatch-mode table.
#[repr(u32)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum EventCategory {
    #[default]
    WindowClose = 0,
    WindowMoved,
    WindowResized,
    WindowStateChanged,
    WindowFocus,
    WindowVisibility,
    WindowModalBegin,
    WindowModalEnd,
    MonitorDpiChanged,
    MonitorListChanged,
    KeyDown,
    KeyRepeat,
    KeyUp,
    MouseButtonDown,
    MouseButtonUp,
    MouseMove,
    MouseDelta,
    MouseWheel,
    User,
}

impl EventCategory {
    pub const COUNT: usize = 19;

    pub const ALL: [EventCategory; Self::COUNT] = [
        EventCategory::WindowClose,
        EventCategory::WindowMoved,
        EventCategory::WindowResized,
        EventCategory::WindowStateChanged,
        EventCategory::WindowFocus,
        EventCategory::WindowVisibility,
        EventCategory::WindowModalBegin,
        EventCategory::WindowModalEnd,
        EventCategory::MonitorDpiChanged,
        EventCategory::MonitorListChanged,
        EventCategory::KeyDown,
        EventCategory::KeyRepeat,
        EventCategory::KeyUp,
        EventCategory::MouseButtonDown,
        EventCategory::MouseButtonUp,
        EventCategory::MouseMove,
        EventCategory::MouseDelta,
        EventCategory::MouseWheel,
        EventCategory::User,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Categories where only the latest pending value per source matters.
    /// Both fire continuously during interactive drags.
    pub const fn is_coalescible(self) -> bool {
        matches!(self, EventCategory::WindowMoved | EventCategory::WindowResized)
    }
}

impl TryFrom<u32> for EventCategory {
    type Error = VideoError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::ALL.get(raw as usize).copied().ok_or_else(|| {
            raise(VideoError::InvalidArgument(format!(
                "event category {raw} out of range"
            )))
        })
    }
}

/// One notification. Plain value type: copied into queues, lent to callbacks.
///
/// `source_id` is the originating window or device id, 0 when there is none.
/// The two payload words are interpreted per category through the
/// constructors and accessors below. `user_tag` sub-types `User` events.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Event {
    pub category: EventCategory,
    pub source_id: u64,
    pub payload: [u64; 2],
    pub user_tag: u64,
}

pub(crate) fn pack_pair(a: i32, b: i32) -> u64 {
    (u64::from(a as u32) << 32) | u64::from(b as u32)
}

pub(crate) fn unpack_pair(word: u64) -> (i32, i32) {
    ((word >> 32) as u32 as i32, word as u32 as i32)
}

impl Event {
    pub const fn new(category: EventCategory, source_id: u64) -> Self {
        Self {
            category,
            source_id,
            payload: [0; 2],
            user_tag: 0,
        }
    }

    #[must_use]
    pub const fn with_payload(mut self, first: u64, second: u64) -> Self {
        self.payload = [first, second];
        self
    }

    fn with_pair(category: EventCategory, source_id: u64, a: i32, b: i32) -> Self {
        Self::new(category, source_id).with_payload(pack_pair(a, b), 0)
    }

    pub fn window_close(id: WindowId) -> Self {
        Self::new(EventCategory::WindowClose, id.into())
    }

    pub fn window_moved(id: WindowId, position: Point) -> Self {
        Self::with_pair(EventCategory::WindowMoved, id.into(), position.x, position.y)
    }

    pub fn window_resized(id: WindowId, size: Size) -> Self {
        Self::with_pair(
            EventCategory::WindowResized,
            id.into(),
            size.width,
            size.height,
        )
    }

    pub fn window_state_changed(id: WindowId, state: WindowState) -> Self {
        Self::new(EventCategory::WindowStateChanged, id.into()).with_payload(state as u64, 0)
    }

    pub fn window_focus(id: WindowId, focused: bool) -> Self {
        Self::new(EventCategory::WindowFocus, id.into()).with_payload(u64::from(focused), 0)
    }

    pub fn window_visibility(id: WindowId, visible: bool) -> Self {
        Self::new(EventCategory::WindowVisibility, id.into()).with_payload(u64::from(visible), 0)
    }

    pub fn window_modal(id: WindowId, begin: bool) -> Self {
        let category = if begin {
            EventCategory::WindowModalBegin
        } else {
            EventCategory::WindowModalEnd
        };
        Self::new(category, id.into())
    }

    pub fn monitor_dpi_changed(source_id: u64, dpi_x: i32, dpi_y: i32) -> Self {
        Self::with_pair(EventCategory::MonitorDpiChanged, source_id, dpi_x, dpi_y)
    }

    pub fn monitor_list_changed() -> Self {
        Self::new(EventCategory::MonitorListChanged, 0)
    }

    pub fn key(source_id: u64, state: KeyState, code: u32, modifiers: Modifiers) -> Self {
        let category = match state {
            KeyState::Down => EventCategory::KeyDown,
            KeyState::Repeat => EventCategory::KeyRepeat,
            KeyState::Up => EventCategory::KeyUp,
        };
        Self::new(category, source_id).with_payload(pack_key(code, modifiers), 0)
    }

    pub fn mouse_button(source_id: u64, button: MouseButton, pressed: bool, at: Point) -> Self {
        let category = if pressed {
            EventCategory::MouseButtonDown
        } else {
            EventCategory::MouseButtonUp
        };
        Self::new(category, source_id).with_payload(pack_pair(at.x, at.y), u64::from(button.code()))
    }

    pub fn mouse_move(source_id: u64, at: Point) -> Self {
        Self::with_pair(EventCategory::MouseMove, source_id, at.x, at.y)
    }

    pub fn mouse_delta(source_id: u64, dx: i32, dy: i32) -> Self {
        Self::with_pair(EventCategory::MouseDelta, source_id, dx, dy)
    }

    pub fn mouse_wheel(source_id: u64, dx: i32, dy: i32) -> Self {
        Self::with_pair(EventCategory::MouseWheel, source_id, dx, dy)
    }

    pub fn user(tag: u64, first: u64, second: u64) -> Self {
        let mut event = Self::new(EventCategory::User, 0).with_payload(first, second);
        event.user_tag = tag;
        event
    }

    /// First payload word read as two signed 32-bit halves.
    pub fn pair(&self) -> (i32, i32) {
        unpack_pair(self.payload[0])
    }

    pub fn position(&self) -> Option<Point> {
        match self.category {
            EventCategory::WindowMoved
            | EventCategory::MouseMove
            | EventCategory::MouseButtonDown
            | EventCategory::MouseButtonUp => {
                let (x, y) = self.pair();
                Some(Point { x, y })
            }
            _ => None,
        }
    }

    pub fn size(&self) -> Option<Size> {
        (self.category == EventCategory::WindowResized).then(|| {
            let (width, height) = self.pair();
            Size { width, height }
        })
    }

    pub fn key_code(&self) -> Option<(u32, Modifiers)> {
        matches!(
            self.category,
            EventCategory::KeyDown | EventCategory::KeyRepeat | EventCategory::KeyUp
        )
        .then(|| unpack_key(self.payload[0]))
    }

    pub fn button(&self) -> Option<MouseButton> {
        matches!(
            self.category,
            EventCategory::MouseButtonDown | EventCategory::MouseButtonUp
        )
        .then(|| MouseButton::from_code(self.payload[1] as u8))
    }

    pub fn window_state(&self) -> Option<WindowState> {
        (self.category == EventCategory::WindowStateChanged)
            .then(|| WindowState::from_raw(self.payload[0]))
            .flatten()
    }

    /// Focus gained / window shown, for the two boolean window categories.
    pub fn flag(&self) -> bool {
        self.payload[0] != 0
    }
}

// src/platform/messages.rs
//
// Translated OS notifications, as a platform's `pump` reports them.

use crate::input::{KeyState, Modifiers, MouseButton};
use crate::platform::SurfaceHandle;

/// Why the OS resized a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeReason {
    Restored,
    Minimized,
    Maximized,
}

/// One OS notification. Coordinates are client-area values in
/// virtual-desktop space unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OsMessage {
    Moved {
        x: i32,
        y: i32,
    },
    Resized {
        width: i32,
        height: i32,
        reason: ResizeReason,
    },
    CloseRequested,
    FocusChanged {
        focused: bool,
    },
    VisibilityChanged {
        visible: bool,
    },
    /// Interactive move/size loop started or ended.
    ModalLoop {
        entered: bool,
    },
    DpiChanged {
        dpi_x: u32,
        dpi_y: u32,
    },
    /// Monitors were added, removed, or reconfigured.
    DisplaysChanged,
    Key {
        state: KeyState,
        code: u32,
        modifiers: Modifiers,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
        /// Surface-relative.
        x: i32,
        y: i32,
    },
    MouseMoved {
        x: i32,
        y: i32,
    },
    /// Raw relative motion, unaffected by pointer acceleration or clipping.
    MouseDelta {
        dx: i32,
        dy: i32,
    },
    MouseWheel {
        dx: i32,
        dy: i32,
    },
}

/// A notification plus the surface it targets. Desktop-wide notifications
/// such as `DisplaysChanged` carry no surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformMessage {
    pub surface: Option<SurfaceHandle>,
    pub message: OsMessage,
}

impl PlatformMessage {
    pub fn to(surface: SurfaceHandle, message: OsMessage) -> Self {
        Self {
            surface: Some(surface),
            message,
        }
    }

    pub fn global(message: OsMessage) -> Self {
        Self {
            surface: None,
            message,
        }
    }
}

// src/platform/mod.rs
//
// The OS boundary. Everything above this module is platform-independent.

use std::ffi::c_void;
use std::num::NonZeroU64;
use std::ptr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub mod headless;
#[cfg(all(feature = "x11", target_os = "linux"))]
pub mod linux_x11;
pub mod messages;
pub mod platform_trait;


pub use headless::HeadlessPlatform;
#[cfg(all(feature = "x11", target_os = "linux"))]
pub use linux_x11::X11Platform;
pub use messages::{OsMessage, PlatformMessage, ResizeReason};
pub use platform_trait::{DisplayGeometry, Platform, RawDisplayMode};

/// Opaque, non-zero token a platform hands out for each native surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle(NonZeroU64);

impl SurfaceHandle {
    pub const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

/// Native handle pair for graphics-context creation.
///
/// `display` is null on platforms without a connection object (Win32-style
/// HWND-only APIs). Neither pointer is owned by the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandles {
    pub display: *mut c_void,
    pub window: *mut c_void,
}

impl Default for NativeHandles {
    fn default() -> Self {
        Self {
            display: ptr::null_mut(),
            window: ptr::null_mut(),
        }
    }
}

bitflags! {
    /// Decoration and frame-button bits of a native surface. Empty is a
    /// borderless surface whose outer rect equals its client rect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WindowStyle: u32 {
        const BORDER = 1 << 0;
        const TITLE_BAR = 1 << 1;
        const RESIZABLE = 1 << 2;
        const MINIMIZE_BOX = 1 << 3;
        const MAXIMIZE_BOX = 1 << 4;
    }
}

impl WindowStyle {
    pub const BORDERLESS: WindowStyle = WindowStyle::empty();

    pub fn is_decorated(self) -> bool {
        self.intersects(WindowStyle::BORDER | WindowStyle::TITLE_BAR)
    }
}

/// How a surface should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceVisibility {
    #[default]
    Hidden,
    Normal,
    Minimized,
    Maximized,
}

/// Everything a platform needs to create a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDesc {
    pub title: String,
    /// Decorated rect in virtual-desktop coordinates.
    pub outer_rect: crate::geometry::Rect,
    pub style: WindowStyle,
    pub visibility: SurfaceVisibility,
}

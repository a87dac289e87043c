// src/display/mod.rs
//! Monitor enumeration and description.
//!
//! - `DisplayHandle`: opaque per-monitor token from the platform
//! - `DisplayMode` / `ModeList`: de-duplicated video modes
//! - `DisplayRegistry`: queries against a live `Platform`

pub mod registry;


use std::fmt;
use std::num::NonZeroU64;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::allocator::{Allocator, RawBuf};
use crate::error::{raise, Result, VideoError};
use crate::geometry::Rect;

pub use registry::DisplayRegistry;

/// Non-zero monitor token. Stable until the platform reports a display-list
/// change; after that old handles may stop resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplayHandle(NonZeroU64);

impl DisplayHandle {
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

/// Bits per colour channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorBits {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl ColorBits {
    /// Channel split for a packed pixel depth. Unknown depths yield all
    /// zeros rather than an error.
    pub const fn from_bits_per_pixel(bpp: u32) -> Self {
        let (red, green, blue, alpha) = match bpp {
            16 => (5, 6, 5, 0),
            24 => (8, 8, 8, 0),
            32 => (8, 8, 8, 8),
            _ => (0, 0, 0, 0),
        };
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub color: ColorBits,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}Hz ({}/{}/{}/{})",
            self.width,
            self.height,
            self.refresh_rate,
            self.color.red,
            self.color.green,
            self.color.blue,
            self.color.alpha
        )
    }
}

/// Unique display modes in enumeration order, stored with the registry's
/// allocator. Derefs to a slice.
pub struct ModeList {
    buf: Option<RawBuf<DisplayMode>>,
    len: usize,
    allocator: Allocator,
}

impl ModeList {
    pub(crate) fn new(allocator: Allocator) -> Self {
        Self {
            buf: None,
            len: 0,
            allocator,
        }
    }

    /// Appends `mode` unless an identical tuple is already present.
    /// Returns whether it was added.
    pub(crate) fn insert_unique(&mut self, mode: DisplayMode) -> Result<bool> {
        if self.contains(&mode) {
            return Ok(false);
        }
        let capacity = self.buf.as_ref().map_or(0, RawBuf::capacity);
        if self.len == capacity {
            self.grow()?;
        }
        if let Some(buf) = self.buf.as_mut() {
            buf.write(self.len, mode);
            self.len += 1;
        }
        Ok(true)
    }

    fn grow(&mut self) -> Result<()> {
        let capacity = match self.buf.as_ref() {
            None => 8,
            Some(buf) => buf
                .capacity()
                .checked_mul(2)
                .ok_or_else(|| raise(VideoError::OutOfMemory))?,
        };
        let mut grown = RawBuf::with_capacity(capacity, self.allocator)?;
        for (i, mode) in self.iter().enumerate() {
            grown.write(i, *mode);
        }
        self.buf = Some(grown);
        Ok(())
    }
}

impl Deref for ModeList {
    type Target = [DisplayMode];

    fn deref(&self) -> &[DisplayMode] {
        match self.buf.as_ref() {
            // SAFETY: the first `len` slots are written by `insert_unique`.
            Some(buf) => unsafe { buf.as_slice(self.len) },
            None => &[],
        }
    }
}

impl fmt::Debug for ModeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Snapshot of one monitor.
#[derive(Debug)]
pub struct Display {
    pub handle: DisplayHandle,
    /// Position in enumeration order; 0 is the primary display.
    pub index: usize,
    pub name: String,
    pub bounds: Rect,
    pub work_area: Rect,
    /// Effective DPI divided by 96, per axis. 1.0 where the platform cannot
    /// report DPI.
    pub dpi_scale: (f32, f32),
    pub refresh_rate: u32,
    pub modes: ModeList,
}

// src/display/registry.rs
//! DisplayRegistry - monitor queries over a borrowed `Platform`.
//!
//! Nothing is cached: every call asks the platform, so results always
//! reflect the current display list.

use log::debug;

use crate::allocator::Allocator;
use crate::display::{ColorBits, Display, DisplayHandle, DisplayMode, ModeList};
use crate::error::{raise, Result, VideoError};
use crate::geometry::{Point, Rect};
use crate::platform::Platform;

/// DPI that maps to a scale of 1.0.
pub const BASELINE_DPI: f32 = 96.0;

pub struct DisplayRegistry<'p> {
    platform: &'p dyn Platform,
    allocator: Allocator,
}

impl<'p> DisplayRegistry<'p> {
    pub fn new(platform: &'p dyn Platform, allocator: Allocator) -> Self {
        Self {
            platform,
            allocator,
        }
    }

    /// Two-call enumeration. Returns the true display count and fills as
    /// many handles into `out` as fit. Pass `None` to size a buffer first.
    pub fn enumerate(&self, out: Option<&mut [DisplayHandle]>) -> Result<usize> {
        let handles = self.platform.display_handles()?;
        if let Some(out) = out {
            let n = out.len().min(handles.len());
            out[..n].copy_from_slice(&handles[..n]);
        }
        Ok(handles.len())
    }

    pub fn count(&self) -> Result<usize> {
        self.enumerate(None)
    }

    pub fn handles(&self) -> Result<Vec<DisplayHandle>> {
        self.platform.display_handles()
    }

    /// The first enumerated display.
    pub fn primary(&self) -> Result<DisplayHandle> {
        self.handles()?.first().copied().ok_or_else(|| {
            raise(VideoError::PlatformFailure(
                "no displays are attached".into(),
            ))
        })
    }

    /// Validates a raw handle value: zero is `NullPointer`, an unknown value
    /// is `InvalidDisplay`.
    pub fn resolve(&self, raw: u64) -> Result<DisplayHandle> {
        let handle = DisplayHandle::from_raw(raw).ok_or_else(|| raise(VideoError::NullPointer))?;
        self.index_of(handle)?;
        Ok(handle)
    }

    fn index_of(&self, handle: DisplayHandle) -> Result<usize> {
        self.handles()?
            .iter()
            .position(|&h| h == handle)
            .ok_or_else(|| raise(VideoError::InvalidDisplay(handle)))
    }

    pub fn bounds(&self, handle: DisplayHandle) -> Result<Rect> {
        Ok(self.platform.display_geometry(handle)?.bounds)
    }

    pub fn work_area(&self, handle: DisplayHandle) -> Result<Rect> {
        Ok(self.platform.display_geometry(handle)?.work_area)
    }

    /// DPI divided by 96 per axis, or (1.0, 1.0) when the platform has no
    /// DPI query. Other failures propagate.
    pub fn dpi_scale(&self, handle: DisplayHandle) -> Result<(f32, f32)> {
        match self.platform.display_dpi(handle) {
            Ok((dx, dy)) => Ok((dx as f32 / BASELINE_DPI, dy as f32 / BASELINE_DPI)),
            Err(VideoError::FeatureNotSupported(_)) => Ok((1.0, 1.0)),
            Err(e) => Err(e),
        }
    }

    /// Unique modes of `handle`, in the order the platform lists them.
    pub fn modes(&self, handle: DisplayHandle) -> Result<ModeList> {
        let mut modes = ModeList::new(self.allocator);
        let mut index = 0;
        let mut duplicates = 0;
        while let Some(raw) = self.platform.display_mode(handle, index)? {
            let mode = DisplayMode {
                width: raw.width,
                height: raw.height,
                refresh_rate: raw.refresh_rate,
                color: ColorBits::from_bits_per_pixel(raw.bits_per_pixel),
            };
            if !modes.insert_unique(mode)? {
                duplicates += 1;
            }
            index += 1;
        }
        debug!(
            "DisplayRegistry: display {} has {} mode(s), {} duplicate(s) dropped",
            handle.raw(),
            modes.len(),
            duplicates
        );
        Ok(modes)
    }

    pub fn display(&self, handle: DisplayHandle) -> Result<Display> {
        let index = self.index_of(handle)?;
        let geometry = self.platform.display_geometry(handle)?;
        Ok(Display {
            handle,
            index,
            name: geometry.name,
            bounds: geometry.bounds,
            work_area: geometry.work_area,
            dpi_scale: self.dpi_scale(handle)?,
            refresh_rate: geometry.refresh_rate,
            modes: self.modes(handle)?,
        })
    }

    /// Display whose bounds contain `point`, falling back to the primary.
    pub fn display_at(&self, point: Point) -> Result<DisplayHandle> {
        for handle in self.handles()? {
            if self.bounds(handle)?.contains(point) {
                return Ok(handle);
            }
        }
        self.primary()
    }

    /// Display containing the centre of `rect`.
    pub fn display_for_rect(&self, rect: Rect) -> Result<DisplayHandle> {
        self.display_at(rect.center())
    }
}

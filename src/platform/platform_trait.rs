// src/platform/platform_trait.rs
//
// Defines the `Platform` trait, the minimal set of OS primitives the video
// layer drives. All window state logic lives above it in `video`.

use crate::display::DisplayHandle;
use crate::error::Result;
use crate::geometry::Rect;
use crate::platform::{
    NativeHandles, PlatformMessage, SurfaceDesc, SurfaceHandle, SurfaceVisibility, WindowStyle,
};

/// Monitor geometry as the OS reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub name: String,
    pub bounds: Rect,
    /// Bounds minus task bars and docks.
    pub work_area: Rect,
    pub refresh_rate: u32,
}

/// One entry of a monitor's mode list before colour-depth decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub bits_per_pixel: u32,
}

/// Platform-specific window system primitives.
///
/// Implementations are RISC-style: they apply what they are told and report
/// what the OS tells them. They never push events; `pump` returns translated
/// messages and the video layer routes them.
///
/// Surface calls with an unknown handle fail with `PlatformFailure`; display
/// calls with an unknown handle fail with `InvalidDisplay`.
pub trait Platform {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceHandle>;

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()>;

    /// Moves and sizes the decorated rect.
    fn set_surface_rect(&mut self, surface: SurfaceHandle, outer: Rect) -> Result<()>;

    fn set_surface_style(&mut self, surface: SurfaceHandle, style: WindowStyle) -> Result<()>;

    fn set_surface_visibility(
        &mut self,
        surface: SurfaceHandle,
        visibility: SurfaceVisibility,
    ) -> Result<()>;

    fn set_surface_title(&mut self, surface: SurfaceHandle, title: &str) -> Result<()>;

    /// Decorated rect enclosing `client` for a surface with `style`.
    fn adjust_rect(&self, client: Rect, style: WindowStyle) -> Rect;

    fn native_handles(&self, surface: SurfaceHandle) -> Result<NativeHandles>;

    /// Attached monitors, primary first.
    fn display_handles(&self) -> Result<Vec<DisplayHandle>>;

    fn display_geometry(&self, display: DisplayHandle) -> Result<DisplayGeometry>;

    /// The `index`th raw mode, or `None` past the end of the list.
    fn display_mode(&self, display: DisplayHandle, index: usize) -> Result<Option<RawDisplayMode>>;

    /// Effective DPI per axis. `FeatureNotSupported` where the OS has no query.
    fn display_dpi(&self, display: DisplayHandle) -> Result<(u32, u32)>;

    /// Drains pending OS notifications without blocking.
    fn pump(&mut self) -> Result<Vec<PlatformMessage>>;
}

// src/platform/headless.rs
//
// In-memory virtual desktop. Deterministic stand-in for a window system,
// used by the test suite and the demo binary.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::c_void;
use std::num::NonZeroU64;
use std::ptr;

use log::{debug, trace};

use crate::config::{HeadlessConfig, HeadlessDisplayConfig};
use crate::display::DisplayHandle;
use crate::error::{raise, Result, VideoError};
use crate::geometry::Rect;
use crate::platform::{
    DisplayGeometry, NativeHandles, OsMessage, Platform, PlatformMessage, RawDisplayMode,
    ResizeReason, SurfaceDesc, SurfaceHandle, SurfaceVisibility, WindowStyle,
};

/// Observable state of one simulated surface.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    pub title: String,
    pub outer_rect: Rect,
    pub style: WindowStyle,
    pub visibility: SurfaceVisibility,
    /// Client rect and visibility as last reported through `pump`.
    reported: (Rect, SurfaceVisibility),
}

/// Handles are 1-based so that zero never names anything.
fn serial(n: u64) -> NonZeroU64 {
    NonZeroU64::MIN.saturating_add(n)
}

struct HeadlessDisplay {
    handle: DisplayHandle,
    config: HeadlessDisplayConfig,
}

pub struct HeadlessPlatform {
    border_px: i32,
    title_bar_px: i32,
    echo_geometry: bool,
    displays: Vec<HeadlessDisplay>,
    display_serial: u64,
    surfaces: BTreeMap<SurfaceHandle, HeadlessSurface>,
    surface_serial: u64,
    pending: VecDeque<PlatformMessage>,
    fail_next_create: bool,
}

impl HeadlessPlatform {
    pub fn new(config: &HeadlessConfig) -> Self {
        let mut platform = Self {
            border_px: config.border_px.max(0),
            title_bar_px: config.title_bar_px.max(0),
            echo_geometry: config.echo_geometry,
            displays: Vec::new(),
            display_serial: 0,
            surfaces: BTreeMap::new(),
            surface_serial: 0,
            pending: VecDeque::new(),
            fail_next_create: false,
        };
        platform.attach_displays(config.displays.clone());
        debug!(
            "HeadlessPlatform: {} display(s), echo_geometry={}",
            platform.displays.len(),
            platform.echo_geometry
        );
        platform
    }

    fn attach_displays(&mut self, configs: Vec<HeadlessDisplayConfig>) {
        self.displays.clear();
        for config in configs {
            let handle = DisplayHandle::new(serial(self.display_serial));
            self.display_serial += 1;
            self.displays.push(HeadlessDisplay { handle, config });
        }
    }

    /// Replaces the monitor set. Handles of the old set stop resolving and a
    /// `DisplaysChanged` notification is queued.
    pub fn set_displays(&mut self, configs: Vec<HeadlessDisplayConfig>) {
        self.attach_displays(configs);
        self.pending
            .push_back(PlatformMessage::global(OsMessage::DisplaysChanged));
    }

    /// Queues a notification as if the OS had sent it.
    pub fn inject(&mut self, surface: Option<SurfaceHandle>, message: OsMessage) {
        self.pending.push_back(PlatformMessage { surface, message });
    }

    /// Makes the next `create_surface` fail with `PlatformFailure`.
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    pub fn surface(&self, surface: SurfaceHandle) -> Option<&HeadlessSurface> {
        self.surfaces.get(&surface)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Frame thickness (left, top, right, bottom) for `style`.
    fn frame(&self, style: WindowStyle) -> (i32, i32, i32, i32) {
        let border = if style.contains(WindowStyle::BORDER) {
            self.border_px
        } else {
            0
        };
        let title = if style.contains(WindowStyle::TITLE_BAR) {
            self.title_bar_px
        } else {
            0
        };
        (border, border + title, border, border)
    }

    fn client_rect(&self, outer: Rect, style: WindowStyle) -> Rect {
        let (l, t, r, b) = self.frame(style);
        outer.inflate(-l, -t, -r, -b)
    }

    fn find_display(&self, display: DisplayHandle) -> Result<&HeadlessDisplayConfig> {
        self.displays
            .iter()
            .find(|d| d.handle == display)
            .map(|d| &d.config)
            .ok_or_else(|| raise(VideoError::InvalidDisplay(display)))
    }

    fn find_surface(&mut self, surface: SurfaceHandle) -> Result<&mut HeadlessSurface> {
        self.surfaces.get_mut(&surface).ok_or_else(|| {
            raise(VideoError::PlatformFailure(format!(
                "unknown surface {}",
                surface.raw()
            )))
        })
    }

    /// Notifications describing how each surface differs from what was last
    /// reported, the way a window system acknowledges configure requests.
    fn echo_changes(&mut self) -> Vec<PlatformMessage> {
        let mut echoed = Vec::new();
        let frames: Vec<(SurfaceHandle, Rect)> = self
            .surfaces
            .iter()
            .map(|(&handle, s)| (handle, self.client_rect(s.outer_rect, s.style)))
            .collect();

        for (handle, client) in frames {
            let Some(surface) = self.surfaces.get_mut(&handle) else {
                continue;
            };
            let (last_client, last_visibility) = surface.reported;
            let visibility = surface.visibility;
            let was_visible = last_visibility != SurfaceVisibility::Hidden;
            let is_visible = visibility != SurfaceVisibility::Hidden;

            if was_visible != is_visible {
                echoed.push(PlatformMessage::to(
                    handle,
                    OsMessage::VisibilityChanged { visible: is_visible },
                ));
            }
            if client.position() != last_client.position() {
                echoed.push(PlatformMessage::to(
                    handle,
                    OsMessage::Moved {
                        x: client.x,
                        y: client.y,
                    },
                ));
            }
            let shown_state_changed = visibility != last_visibility && is_visible;
            if visibility == SurfaceVisibility::Minimized {
                if last_visibility != SurfaceVisibility::Minimized {
                    echoed.push(PlatformMessage::to(
                        handle,
                        OsMessage::Resized {
                            width: 0,
                            height: 0,
                            reason: ResizeReason::Minimized,
                        },
                    ));
                }
            } else if is_visible && (client.size() != last_client.size() || shown_state_changed) {
                let reason = match visibility {
                    SurfaceVisibility::Maximized => ResizeReason::Maximized,
                    _ => ResizeReason::Restored,
                };
                echoed.push(PlatformMessage::to(
                    handle,
                    OsMessage::Resized {
                        width: client.width,
                        height: client.height,
                        reason,
                    },
                ));
            }
            surface.reported = (client, visibility);
        }
        echoed
    }
}

impl Platform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceHandle> {
        if std::mem::take(&mut self.fail_next_create) {
            return Err(raise(VideoError::PlatformFailure(
                "surface creation refused".into(),
            )));
        }
        let handle = SurfaceHandle::new(serial(self.surface_serial));
        self.surface_serial += 1;
        let client = self.client_rect(desc.outer_rect, desc.style);
        self.surfaces.insert(
            handle,
            HeadlessSurface {
                title: desc.title.clone(),
                outer_rect: desc.outer_rect,
                style: desc.style,
                visibility: desc.visibility,
                reported: (client, desc.visibility),
            },
        );
        trace!("HeadlessPlatform: created surface {}", handle.raw());
        Ok(handle)
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()> {
        self.find_surface(surface)?;
        self.surfaces.remove(&surface);
        self.pending.retain(|m| m.surface != Some(surface));
        trace!("HeadlessPlatform: destroyed surface {}", surface.raw());
        Ok(())
    }

    fn set_surface_rect(&mut self, surface: SurfaceHandle, outer: Rect) -> Result<()> {
        self.find_surface(surface)?.outer_rect = outer;
        Ok(())
    }

    fn set_surface_style(&mut self, surface: SurfaceHandle, style: WindowStyle) -> Result<()> {
        self.find_surface(surface)?.style = style;
        Ok(())
    }

    fn set_surface_visibility(
        &mut self,
        surface: SurfaceHandle,
        visibility: SurfaceVisibility,
    ) -> Result<()> {
        self.find_surface(surface)?.visibility = visibility;
        Ok(())
    }

    fn set_surface_title(&mut self, surface: SurfaceHandle, title: &str) -> Result<()> {
        self.find_surface(surface)?.title = title.to_string();
        Ok(())
    }

    fn adjust_rect(&self, client: Rect, style: WindowStyle) -> Rect {
        let (l, t, r, b) = self.frame(style);
        client.inflate(l, t, r, b)
    }

    fn native_handles(&self, surface: SurfaceHandle) -> Result<NativeHandles> {
        if !self.surfaces.contains_key(&surface) {
            return Err(raise(VideoError::PlatformFailure(format!(
                "unknown surface {}",
                surface.raw()
            ))));
        }
        Ok(NativeHandles {
            display: ptr::null_mut(),
            window: surface.raw() as usize as *mut c_void,
        })
    }

    fn display_handles(&self) -> Result<Vec<DisplayHandle>> {
        Ok(self.displays.iter().map(|d| d.handle).collect())
    }

    fn display_geometry(&self, display: DisplayHandle) -> Result<DisplayGeometry> {
        let config = self.find_display(display)?;
        Ok(DisplayGeometry {
            name: config.name.clone(),
            bounds: config.bounds,
            work_area: config.work_area(),
            refresh_rate: config.refresh_rate,
        })
    }

    fn display_mode(&self, display: DisplayHandle, index: usize) -> Result<Option<RawDisplayMode>> {
        let config = self.find_display(display)?;
        Ok(config.modes.get(index).map(|m| RawDisplayMode {
            width: m.width,
            height: m.height,
            refresh_rate: m.refresh_rate,
            bits_per_pixel: m.bits_per_pixel,
        }))
    }

    fn display_dpi(&self, display: DisplayHandle) -> Result<(u32, u32)> {
        self.find_display(display)?
            .dpi
            .ok_or_else(|| raise(VideoError::FeatureNotSupported("per-monitor DPI query")))
    }

    fn pump(&mut self) -> Result<Vec<PlatformMessage>> {
        let mut messages: Vec<PlatformMessage> = self.pending.drain(..).collect();
        if self.echo_geometry {
            messages.extend(self.echo_changes());
        }
        Ok(messages)
    }
}

// src/video/mod.rs
//! VideoInstance - aggregate root for windows on one platform.
//!
//! The instance owns the platform and every window it creates, and borrows
//! the event driver it pushes into. Because the driver is held by `&mut`,
//! it cannot be dropped or re-entered while the instance lives, and windows
//! cannot outlive the instance that holds them.
//!
//! ## Message flow
//! `pump_messages` drains the platform and routes each notification to its
//! window's handler, which updates cached state and pushes events through
//! the driver. Desktop-wide notifications become monitor events.

pub mod window;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

use log::{debug, trace, warn};

use crate::allocator::{Allocator, AllocatorDesc};
use crate::config::VideoConfig;
use crate::display::{DisplayHandle, DisplayRegistry};
use crate::error::{raise, Result, VideoError};
use crate::event::{Event, EventDriver};
use crate::geometry::Rect;
use crate::platform::{
    NativeHandles, OsMessage, Platform, PlatformMessage, SurfaceDesc, SurfaceHandle,
    SurfaceVisibility,
};

pub use window::{
    Window, WindowDesc, WindowFlags, WindowId, WindowMut, WindowState, WindowStateFlags,
};

pub struct VideoInstance<'d, P: Platform> {
    allocator: Allocator,
    config: VideoConfig,
    platform: P,
    driver: &'d mut EventDriver,
    windows: BTreeMap<WindowId, Window>,
    surfaces: HashMap<SurfaceHandle, WindowId>,
    next_window_id: u32,
}

impl<'d, P: Platform> VideoInstance<'d, P> {
    pub fn new(
        driver: &'d mut EventDriver,
        platform: P,
        config: &VideoConfig,
        allocator: Option<&AllocatorDesc>,
    ) -> Result<Self> {
        let allocator = Allocator::from_desc(allocator)?;
        debug!("VideoInstance: created on {} platform", platform.name());
        Ok(Self {
            allocator,
            config: config.clone(),
            platform,
            driver,
            windows: BTreeMap::new(),
            surfaces: HashMap::new(),
            next_window_id: 1,
        })
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn driver(&self) -> &EventDriver {
        &*self.driver
    }

    pub fn driver_mut(&mut self) -> &mut EventDriver {
        &mut *self.driver
    }

    pub fn displays(&self) -> DisplayRegistry<'_> {
        DisplayRegistry::new(&self.platform, self.allocator)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }

    /// Validates a raw id: zero is `NullPointer`, an unknown or destroyed id
    /// is `InvalidWindow`.
    pub fn resolve(&self, raw: u32) -> Result<WindowId> {
        let id = WindowId::from_raw(raw).ok_or_else(|| raise(VideoError::NullPointer))?;
        self.window(id).map(Window::id)
    }

    pub fn window(&self, id: WindowId) -> Result<&Window> {
        self.windows
            .get(&id)
            .ok_or_else(|| raise(VideoError::InvalidWindow(id)))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Result<WindowMut<'_>> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or_else(|| raise(VideoError::InvalidWindow(id)))?;
        Ok(WindowMut::new(
            window,
            &mut self.platform,
            &mut *self.driver,
            self.allocator,
        ))
    }

    pub fn window_for_surface(&self, surface: SurfaceHandle) -> Option<WindowId> {
        self.surfaces.get(&surface).copied()
    }

    pub fn native_handles(&self, id: WindowId) -> Result<NativeHandles> {
        let surface = self.window(id)?.surface();
        self.platform.native_handles(surface)
    }

    /// Creates a native surface and its window record.
    ///
    /// Placement: `CENTER` centres in the target display's work area,
    /// otherwise an explicit position is used, otherwise the window sits
    /// `default_window_offset` pixels in from the display's origin. The
    /// initial state follows `MAXIMIZED`, then `SHOWN`, else hidden;
    /// `FULLSCREEN` is applied last, on the target display.
    pub fn create_window(&mut self, desc: &WindowDesc) -> Result<WindowId> {
        let size = desc.size.unwrap_or(self.config.default_window_size);
        if size.width <= 0 || size.height <= 0 {
            return Err(raise(VideoError::InvalidArgument(format!(
                "window size must be positive, got {}x{}",
                size.width, size.height
            ))));
        }
        let raw_id = NonZeroU32::new(self.next_window_id).ok_or_else(|| {
            raise(VideoError::PlatformFailure(
                "window identifiers exhausted".into(),
            ))
        })?;

        let (display, geometry) = {
            let displays = self.displays();
            let display = match desc.display {
                Some(display) => display,
                None => displays.primary()?,
            };
            (display, self.platform.display_geometry(display)?)
        };
        let origin = if desc.flags.contains(WindowFlags::CENTER) {
            geometry.work_area.centered_origin(size)
        } else {
            desc.position.unwrap_or_else(|| {
                geometry
                    .bounds
                    .offset_origin(self.config.default_window_offset)
            })
        };
        let rect = Rect::new(origin.x, origin.y, size.width, size.height);
        let style = desc.flags.style();
        let title = desc
            .title
            .clone()
            .unwrap_or_else(|| self.config.default_title.clone());

        let outer_rect = self.platform.adjust_rect(rect, style);
        let surface = self.platform.create_surface(&SurfaceDesc {
            title: title.clone(),
            outer_rect,
            style,
            visibility: SurfaceVisibility::Hidden,
        })?;
        let id = WindowId::new(raw_id);
        self.next_window_id = self.next_window_id.wrapping_add(1);
        self.windows
            .insert(id, Window::new(id, surface, title, rect, style));
        self.surfaces.insert(surface, id);

        if let Err(e) = self.apply_initial_state(id, display, desc.flags) {
            warn!("VideoInstance: window {} failed initial state: {}", id, e);
            self.discard(id);
            return Err(e);
        }
        debug!(
            "VideoInstance: created window {} at {:?} ({:?})",
            id,
            rect,
            self.window(id)?.state()
        );
        Ok(id)
    }

    fn apply_initial_state(
        &mut self,
        id: WindowId,
        display: DisplayHandle,
        flags: WindowFlags,
    ) -> Result<()> {
        let mut window = self.window_mut(id)?;
        if flags.contains(WindowFlags::MAXIMIZED) {
            window.maximize()?;
        } else if flags.contains(WindowFlags::SHOWN) {
            window.show()?;
        }
        if flags.contains(WindowFlags::FULLSCREEN) {
            window.set_fullscreen(display, true)?;
        }
        Ok(())
    }

    /// Unregisters `id` and releases its surface, logging platform failures.
    fn discard(&mut self, id: WindowId) {
        if let Some(window) = self.windows.remove(&id) {
            self.surfaces.remove(&window.surface());
            if let Err(e) = self.platform.destroy_surface(window.surface()) {
                warn!("VideoInstance: leaking surface of window {}: {}", id, e);
            }
        }
    }

    /// Destroys the native surface, then forgets the window. The id is never
    /// handed out again.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        let surface = self.window(id)?.surface();
        self.platform.destroy_surface(surface)?;
        self.surfaces.remove(&surface);
        self.windows.remove(&id);
        debug!("VideoInstance: destroyed window {}", id);
        Ok(())
    }

    /// Drains pending OS notifications and routes each one. Returns how many
    /// reached a window or produced a monitor event. Routing continues past a
    /// failed push; the first error is returned at the end.
    pub fn pump_messages(&mut self) -> Result<usize> {
        let messages = self.platform.pump()?;
        let mut routed = 0;
        let mut first_error = None;
        for message in messages {
            match self.route(message) {
                Ok(true) => routed += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(routed),
        }
    }

    fn route(&mut self, message: PlatformMessage) -> Result<bool> {
        let Some(surface) = message.surface else {
            return self.route_global(message.message);
        };
        let Some(id) = self.window_for_surface(surface) else {
            trace!(
                "VideoInstance: {:?} for unknown surface {}, dropped",
                message.message,
                surface.raw()
            );
            return Ok(false);
        };
        self.window_mut(id)?.handle_message(message.message)?;
        Ok(true)
    }

    fn route_global(&mut self, message: OsMessage) -> Result<bool> {
        let event = match message {
            OsMessage::DisplaysChanged => Event::monitor_list_changed(),
            OsMessage::DpiChanged { dpi_x, dpi_y } => {
                Event::monitor_dpi_changed(0, dpi_x as i32, dpi_y as i32)
            }
            other => {
                trace!("VideoInstance: {:?} has no target window, dropped", other);
                return Ok(false);
            }
        };
        self.driver.push(&event)?;
        Ok(true)
    }
}

impl<P: Platform> Drop for VideoInstance<'_, P> {
    fn drop(&mut self) {
        if !self.windows.is_empty() {
            warn!(
                "VideoInstance: dropped with {} live window(s); destroying them",
                self.windows.len()
            );
        }
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        for id in ids {
            self.discard(id);
        }
    }
}

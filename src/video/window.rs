// src/video/window.rs
//! Window records and their state machine.
//!
//! `Window` is the cached, read-only view. `WindowMut` pairs a window with the
//! platform and event driver it needs to change state; every transition is
//! validated before anything is mutated, and each change of the derived
//! [`WindowState`] pushes one `WindowStateChanged` event.
//!
//! Events are pushed after the surface and cached state have changed. When a
//! push fails with `OutOfMemory` the transition stays applied and only the
//! event is lost; the error still reaches the caller.

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Deref;

use bitflags::bitflags;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::allocator::Allocator;
use crate::display::{DisplayHandle, DisplayRegistry};
use crate::error::{raise, Result, VideoError};
use crate::event::{Event, EventDriver};
use crate::geometry::{Point, Rect, Size};
use crate::platform::{
    NativeHandles, OsMessage, Platform, ResizeReason, SurfaceHandle, SurfaceVisibility,
    WindowStyle,
};

/// Instance-unique window identifier. Never zero, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(NonZeroU32);

impl WindowId {
    pub(crate) const fn new(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl From<WindowId> for u64 {
    fn from(id: WindowId) -> u64 {
        u64::from(id.get())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Creation-time requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WindowFlags: u32 {
        const SHOWN = 1 << 0;
        const RESIZABLE = 1 << 1;
        const MINIMIZE_BOX = 1 << 2;
        const MAXIMIZE_BOX = 1 << 3;
        const BORDERLESS = 1 << 4;
        /// Centre in the target display's work area.
        const CENTER = 1 << 5;
        const MAXIMIZED = 1 << 6;
        const FULLSCREEN = 1 << 7;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        WindowFlags::SHOWN
            | WindowFlags::RESIZABLE
            | WindowFlags::MINIMIZE_BOX
            | WindowFlags::MAXIMIZE_BOX
    }
}

impl WindowFlags {
    pub fn style(self) -> WindowStyle {
        if self.contains(WindowFlags::BORDERLESS) {
            return WindowStyle::BORDERLESS;
        }
        let mut style = WindowStyle::BORDER | WindowStyle::TITLE_BAR;
        style.set(WindowStyle::RESIZABLE, self.contains(WindowFlags::RESIZABLE));
        style.set(
            WindowStyle::MINIMIZE_BOX,
            self.contains(WindowFlags::MINIMIZE_BOX),
        );
        style.set(
            WindowStyle::MAXIMIZE_BOX,
            self.contains(WindowFlags::MAXIMIZE_BOX),
        );
        style
    }
}

bitflags! {
    /// Live presentation state. MINIMIZED and MAXIMIZED never coexist, and
    /// MINIMIZED implies not HIDDEN.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WindowStateFlags: u32 {
        const HIDDEN = 1 << 0;
        const MINIMIZED = 1 << 1;
        const MAXIMIZED = 1 << 2;
        const FULLSCREEN = 1 << 3;
    }
}

/// Single-valued summary of [`WindowStateFlags`], carried in
/// `WindowStateChanged` payloads.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowState {
    Hidden = 0,
    Shown,
    Minimized,
    Maximized,
    Fullscreen,
}

impl WindowState {
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(WindowState::Hidden),
            1 => Some(WindowState::Shown),
            2 => Some(WindowState::Minimized),
            3 => Some(WindowState::Maximized),
            4 => Some(WindowState::Fullscreen),
            _ => None,
        }
    }

    pub fn from_flags(flags: WindowStateFlags) -> Self {
        if flags.contains(WindowStateFlags::HIDDEN) {
            WindowState::Hidden
        } else if flags.contains(WindowStateFlags::FULLSCREEN) {
            WindowState::Fullscreen
        } else if flags.contains(WindowStateFlags::MINIMIZED) {
            WindowState::Minimized
        } else if flags.contains(WindowStateFlags::MAXIMIZED) {
            WindowState::Maximized
        } else {
            WindowState::Shown
        }
    }
}

/// Parameters for `VideoInstance::create_window`. Unset fields take the
/// instance's configured defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowDesc {
    pub title: Option<String>,
    /// Client size.
    pub size: Option<Size>,
    /// Client origin in desktop coordinates. Ignored with `CENTER`.
    pub position: Option<Point>,
    /// Target display; the primary display when unset.
    pub display: Option<DisplayHandle>,
    pub flags: WindowFlags,
}

impl WindowDesc {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    #[must_use]
    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some(Point { x, y });
        self
    }

    #[must_use]
    pub fn on_display(mut self, display: DisplayHandle) -> Self {
        self.display = Some(display);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// What fullscreen replaced, restored verbatim on exit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedPlacement {
    style: WindowStyle,
    rect: Rect,
    flags: WindowStateFlags,
}

#[derive(Debug)]
pub struct Window {
    id: WindowId,
    surface: SurfaceHandle,
    title: String,
    /// Client rect in desktop coordinates.
    rect: Rect,
    style: WindowStyle,
    flags: WindowStateFlags,
    fullscreen_saved: Option<SavedPlacement>,
    /// Rect to return to when leaving the maximized state.
    restore_rect: Option<Rect>,
    focused: bool,
    in_modal_loop: bool,
    dpi: Option<(u32, u32)>,
}

impl Window {
    pub(crate) fn new(
        id: WindowId,
        surface: SurfaceHandle,
        title: String,
        rect: Rect,
        style: WindowStyle,
    ) -> Self {
        Self {
            id,
            surface,
            title,
            rect,
            style,
            flags: WindowStateFlags::HIDDEN,
            fullscreen_saved: None,
            restore_rect: None,
            focused: false,
            in_modal_loop: false,
            dpi: None,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn position(&self) -> Point {
        self.rect.position()
    }

    pub fn size(&self) -> Size {
        self.rect.size()
    }

    pub fn style(&self) -> WindowStyle {
        self.style
    }

    pub fn flags(&self) -> WindowStateFlags {
        self.flags
    }

    pub fn state(&self) -> WindowState {
        WindowState::from_flags(self.flags)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(WindowStateFlags::HIDDEN)
    }

    pub fn is_minimized(&self) -> bool {
        self.flags.contains(WindowStateFlags::MINIMIZED)
    }

    pub fn is_maximized(&self) -> bool {
        self.flags.contains(WindowStateFlags::MAXIMIZED)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(WindowStateFlags::FULLSCREEN)
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn in_modal_loop(&self) -> bool {
        self.in_modal_loop
    }

    /// Last DPI the OS reported for this window, if any.
    pub fn dpi(&self) -> Option<(u32, u32)> {
        self.dpi
    }
}

fn visibility_for(flags: WindowStateFlags) -> SurfaceVisibility {
    if flags.contains(WindowStateFlags::HIDDEN) {
        SurfaceVisibility::Hidden
    } else if flags.contains(WindowStateFlags::MINIMIZED) {
        SurfaceVisibility::Minimized
    } else if flags.contains(WindowStateFlags::MAXIMIZED) {
        SurfaceVisibility::Maximized
    } else {
        SurfaceVisibility::Normal
    }
}

/// Mutable access to one window plus the collaborators it drives.
///
/// Transition methods return `OutOfMemory` when the resulting event cannot be
/// queued. The window has already moved to its new state in that case.
pub struct WindowMut<'a> {
    window: &'a mut Window,
    platform: &'a mut dyn Platform,
    driver: &'a mut EventDriver,
    allocator: Allocator,
}

impl Deref for WindowMut<'_> {
    type Target = Window;

    fn deref(&self) -> &Window {
        self.window
    }
}

impl<'a> WindowMut<'a> {
    pub(crate) fn new(
        window: &'a mut Window,
        platform: &'a mut dyn Platform,
        driver: &'a mut EventDriver,
        allocator: Allocator,
    ) -> Self {
        Self {
            window,
            platform,
            driver,
            allocator,
        }
    }

    fn displays(&self) -> DisplayRegistry<'_> {
        DisplayRegistry::new(&*self.platform, self.allocator)
    }

    fn push(&mut self, event: Event) -> Result<()> {
        self.driver.push(&event)
    }

    /// Stores `flags`, pushing `WindowStateChanged` if the derived state moved.
    /// The flags are kept even if the push fails.
    fn commit_flags(&mut self, flags: WindowStateFlags) -> Result<()> {
        let before = self.window.state();
        self.window.flags = flags;
        let after = self.window.state();
        if before != after {
            debug!("Window {}: {:?} -> {:?}", self.window.id, before, after);
            self.push(Event::window_state_changed(self.window.id, after))?;
        }
        Ok(())
    }

    /// Largest client rect whose decorated frame fits inside `outer`.
    fn client_within(&self, outer: Rect) -> Rect {
        let framed = self.platform.adjust_rect(outer, self.window.style);
        let left = outer.x - framed.x;
        let top = outer.y - framed.y;
        let right = (framed.x + framed.width) - (outer.x + outer.width);
        let bottom = (framed.y + framed.height) - (outer.y + outer.height);
        outer.inflate(-left, -top, -right, -bottom)
    }

    fn apply_rect(&mut self, client: Rect) -> Result<()> {
        let outer = self.platform.adjust_rect(client, self.window.style);
        self.platform.set_surface_rect(self.window.surface, outer)?;
        self.window.rect = client;
        Ok(())
    }

    pub fn native_handles(&self) -> Result<NativeHandles> {
        self.platform.native_handles(self.window.surface)
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.platform.set_surface_title(self.window.surface, title)?;
        self.window.title = title.to_string();
        Ok(())
    }

    /// Moves the client origin. While fullscreen, updates the placement that
    /// leaving fullscreen returns to.
    pub fn set_position(&mut self, position: Point) -> Result<()> {
        if let Some(saved) = self.window.fullscreen_saved.as_mut() {
            saved.rect = saved.rect.with_position(position.x, position.y);
            return Ok(());
        }
        let rect = self.window.rect.with_position(position.x, position.y);
        self.apply_rect(rect)
    }

    /// Resizes the client area. Non-positive sizes are `InvalidArgument`.
    pub fn set_size(&mut self, size: Size) -> Result<()> {
        if size.width <= 0 || size.height <= 0 {
            return Err(raise(VideoError::InvalidArgument(format!(
                "window size must be positive, got {}x{}",
                size.width, size.height
            ))));
        }
        if let Some(saved) = self.window.fullscreen_saved.as_mut() {
            saved.rect = saved.rect.with_size(size.width, size.height);
            return Ok(());
        }
        let rect = self.window.rect.with_size(size.width, size.height);
        self.apply_rect(rect)
    }

    pub fn show(&mut self) -> Result<()> {
        if !self.window.is_hidden() {
            return Ok(());
        }
        let flags = self.window.flags - WindowStateFlags::HIDDEN;
        self.platform
            .set_surface_visibility(self.window.surface, visibility_for(flags))?;
        self.commit_flags(flags)
    }

    pub fn hide(&mut self) -> Result<()> {
        if self.window.is_hidden() {
            return Ok(());
        }
        self.platform
            .set_surface_visibility(self.window.surface, SurfaceVisibility::Hidden)?;
        self.commit_flags(self.window.flags | WindowStateFlags::HIDDEN)
    }

    /// Leaves fullscreen first if needed. Idempotent.
    pub fn minimize(&mut self) -> Result<()> {
        if self.window.is_minimized() {
            return Ok(());
        }
        self.leave_fullscreen()?;
        self.platform
            .set_surface_visibility(self.window.surface, SurfaceVisibility::Minimized)?;
        let flags = (self.window.flags | WindowStateFlags::MINIMIZED)
            - (WindowStateFlags::MAXIMIZED | WindowStateFlags::HIDDEN);
        self.commit_flags(flags)
    }

    /// Fits the decorated window to the work area of the display under the
    /// window's centre, remembering the current rect for
    /// [`WindowMut::restore`]. Idempotent.
    pub fn maximize(&mut self) -> Result<()> {
        if self.window.is_maximized() {
            return Ok(());
        }
        let reference = self
            .window
            .fullscreen_saved
            .map_or(self.window.rect, |saved| saved.rect);
        let work_area = {
            let displays = self.displays();
            let display = displays.display_for_rect(reference)?;
            displays.work_area(display)?
        };

        self.leave_fullscreen()?;
        let restore_to = self.window.restore_rect.unwrap_or(self.window.rect);
        self.platform
            .set_surface_visibility(self.window.surface, SurfaceVisibility::Maximized)?;
        let client = self.client_within(work_area);
        self.apply_rect(client)?;
        self.window.restore_rect = Some(restore_to);
        let flags = (self.window.flags | WindowStateFlags::MAXIMIZED)
            - (WindowStateFlags::MINIMIZED | WindowStateFlags::HIDDEN);
        self.commit_flags(flags)
    }

    /// Returns to a shown, normal window: leaves fullscreen, clears
    /// minimized and maximized, and puts back the pre-maximize rect.
    pub fn restore(&mut self) -> Result<()> {
        self.leave_fullscreen()?;
        let cleared = WindowStateFlags::MINIMIZED
            | WindowStateFlags::MAXIMIZED
            | WindowStateFlags::HIDDEN;
        if !self.window.flags.intersects(cleared) {
            return Ok(());
        }
        self.platform
            .set_surface_visibility(self.window.surface, SurfaceVisibility::Normal)?;
        if let Some(rect) = self.window.restore_rect.take() {
            self.apply_rect(rect)?;
        }
        self.commit_flags(self.window.flags - cleared)
    }

    /// Centres the window in `display`'s work area. No-op while fullscreen
    /// or maximized.
    pub fn center(&mut self, display: DisplayHandle) -> Result<()> {
        let work_area = self.displays().work_area(display)?;
        if self.window.is_fullscreen() || self.window.is_maximized() {
            trace!("Window {}: center ignored in {:?}", self.window.id, self.window.state());
            return Ok(());
        }
        let origin = work_area.centered_origin(self.window.size());
        let rect = self.window.rect.with_position(origin.x, origin.y);
        self.apply_rect(rect)
    }

    /// Borderless window covering `display`'s full bounds, or back to the
    /// saved placement. Entering twice or leaving twice is a no-op. `display`
    /// is only consulted when entering, so leaving works after the monitor
    /// set has changed.
    pub fn set_fullscreen(&mut self, display: DisplayHandle, enable: bool) -> Result<()> {
        if !enable {
            return self.leave_fullscreen();
        }
        let bounds = self.displays().bounds(display)?;
        self.enter_fullscreen(bounds)
    }

    fn enter_fullscreen(&mut self, bounds: Rect) -> Result<()> {
        if self.window.is_fullscreen() {
            return Ok(());
        }
        let saved = SavedPlacement {
            style: self.window.style,
            rect: self.window.rect,
            flags: self.window.flags,
        };
        let surface = self.window.surface;
        let outer = self.platform.adjust_rect(bounds, WindowStyle::BORDERLESS);

        self.platform
            .set_surface_style(surface, WindowStyle::BORDERLESS)?;
        let applied = self
            .platform
            .set_surface_rect(surface, outer)
            .and_then(|()| {
                self.platform
                    .set_surface_visibility(surface, SurfaceVisibility::Normal)
            });
        if let Err(e) = applied {
            self.rollback_surface(saved);
            return Err(e);
        }

        self.window.style = WindowStyle::BORDERLESS;
        self.window.rect = bounds;
        self.window.fullscreen_saved = Some(saved);
        self.commit_flags(WindowStateFlags::FULLSCREEN)
    }

    fn leave_fullscreen(&mut self) -> Result<()> {
        let Some(saved) = self.window.fullscreen_saved else {
            return Ok(());
        };
        let surface = self.window.surface;
        let outer = self.platform.adjust_rect(saved.rect, saved.style);
        self.platform.set_surface_style(surface, saved.style)?;
        self.platform.set_surface_rect(surface, outer)?;
        self.platform
            .set_surface_visibility(surface, visibility_for(saved.flags))?;

        self.window.style = saved.style;
        self.window.rect = saved.rect;
        self.window.fullscreen_saved = None;
        self.commit_flags(saved.flags)
    }

    /// Best-effort return of the native surface to `saved` after a partial
    /// fullscreen switch. The cached window state was never touched.
    fn rollback_surface(&mut self, saved: SavedPlacement) {
        let surface = self.window.surface;
        let outer = self.platform.adjust_rect(saved.rect, saved.style);
        let restored = self
            .platform
            .set_surface_style(surface, saved.style)
            .and_then(|()| self.platform.set_surface_rect(surface, outer))
            .and_then(|()| {
                self.platform
                    .set_surface_visibility(surface, visibility_for(saved.flags))
            });
        if let Err(e) = restored {
            warn!("Window {}: could not roll back surface: {}", self.window.id, e);
        }
    }

    /// Translates one OS notification for this window into cached state and
    /// pushed events.
    pub fn handle_message(&mut self, message: OsMessage) -> Result<()> {
        let id = self.window.id;
        match message {
            OsMessage::Moved { x, y } => {
                self.window.rect = self.window.rect.with_position(x, y);
                self.push(Event::window_moved(id, Point { x, y }))
            }
            OsMessage::Resized {
                width,
                height,
                reason,
            } => self.handle_resize(Size::new(width, height), reason),
            OsMessage::CloseRequested => self.push(Event::window_close(id)),
            OsMessage::FocusChanged { focused } => {
                self.window.focused = focused;
                self.push(Event::window_focus(id, focused))
            }
            OsMessage::VisibilityChanged { visible } => {
                let mut flags = self.window.flags;
                flags.set(WindowStateFlags::HIDDEN, !visible);
                self.commit_flags(flags)?;
                self.push(Event::window_visibility(id, visible))
            }
            OsMessage::ModalLoop { entered } => {
                self.window.in_modal_loop = entered;
                self.push(Event::window_modal(id, entered))
            }
            OsMessage::DpiChanged { dpi_x, dpi_y } => {
                self.window.dpi = Some((dpi_x, dpi_y));
                self.push(Event::monitor_dpi_changed(
                    id.into(),
                    dpi_x as i32,
                    dpi_y as i32,
                ))
            }
            OsMessage::DisplaysChanged => self.push(Event::monitor_list_changed()),
            OsMessage::Key {
                state,
                code,
                modifiers,
            } => self.push(Event::key(id.into(), state, code, modifiers)),
            OsMessage::MouseButton {
                button,
                pressed,
                x,
                y,
            } => self.push(Event::mouse_button(
                id.into(),
                button,
                pressed,
                Point { x, y },
            )),
            OsMessage::MouseMoved { x, y } => self.push(Event::mouse_move(id.into(), Point { x, y })),
            OsMessage::MouseDelta { dx, dy } => self.push(Event::mouse_delta(id.into(), dx, dy)),
            OsMessage::MouseWheel { dx, dy } => self.push(Event::mouse_wheel(id.into(), dx, dy)),
        }
    }

    fn handle_resize(&mut self, size: Size, reason: ResizeReason) -> Result<()> {
        let mut flags = self.window.flags;
        match reason {
            ResizeReason::Minimized => {
                flags.insert(WindowStateFlags::MINIMIZED);
                flags.remove(WindowStateFlags::MAXIMIZED | WindowStateFlags::HIDDEN);
            }
            ResizeReason::Maximized => {
                flags.insert(WindowStateFlags::MAXIMIZED);
                flags.remove(WindowStateFlags::MINIMIZED | WindowStateFlags::HIDDEN);
            }
            ResizeReason::Restored => {
                flags.remove(WindowStateFlags::MINIMIZED | WindowStateFlags::MAXIMIZED);
            }
        }
        self.commit_flags(flags)?;

        // A minimized surface reports a meaningless client size.
        if reason == ResizeReason::Minimized || size == self.window.size() {
            return Ok(());
        }
        self.window.rect = self.window.rect.with_size(size.width, size.height);
        self.push(Event::window_resized(self.window.id, size))
    }
}

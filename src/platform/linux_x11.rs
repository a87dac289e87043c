// src/platform/linux_x11.rs
//
// Xlib backend. One display (the default screen), decorations left to the
// window manager, close requests via WM_DELETE_WINDOW.

use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::num::NonZeroU64;
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_uint};
use std::ptr;

use log::{debug, info, trace, warn};
use x11::xlib;

use crate::display::DisplayHandle;
use crate::error::{raise, Result, VideoError};
use crate::geometry::Rect;
use crate::input::{KeyState, Modifiers, MouseButton};
use crate::platform::{
    DisplayGeometry, NativeHandles, OsMessage, Platform, PlatformMessage, RawDisplayMode,
    ResizeReason, SurfaceDesc, SurfaceHandle, SurfaceVisibility, WindowStyle,
};

const MWM_HINTS_DECORATIONS: c_long = 1 << 1;
const MM_PER_INCH: f64 = 25.4;

struct X11Surface {
    xid: xlib::Window,
    visibility: SurfaceVisibility,
}

pub struct X11Platform {
    display: *mut xlib::Display,
    screen: c_int,
    root: xlib::Window,
    wm_delete_window: xlib::Atom,
    motif_wm_hints: xlib::Atom,
    surfaces: HashMap<SurfaceHandle, X11Surface>,
    by_xid: HashMap<xlib::Window, SurfaceHandle>,
    surface_serial: u64,
}

fn single_display() -> DisplayHandle {
    DisplayHandle::new(NonZeroU64::MIN)
}

fn c_string(text: &str) -> Result<CString> {
    CString::new(text)
        .map_err(|_| raise(VideoError::InvalidArgument("text contains a NUL byte".into())))
}

fn extract_modifiers(state: c_uint) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    if state & xlib::ShiftMask != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if state & xlib::ControlMask != 0 {
        modifiers |= Modifiers::CONTROL;
    }
    if state & xlib::Mod1Mask != 0 {
        modifiers |= Modifiers::ALT;
    }
    if state & xlib::Mod4Mask != 0 {
        modifiers |= Modifiers::SUPER;
    }
    if state & xlib::LockMask != 0 {
        modifiers |= Modifiers::CAPS_LOCK;
    }
    if state & xlib::Mod2Mask != 0 {
        modifiers |= Modifiers::NUM_LOCK;
    }
    modifiers
}

fn map_button(button: c_uint) -> MouseButton {
    match button {
        1 => MouseButton::Left,
        2 => MouseButton::Middle,
        3 => MouseButton::Right,
        8 => MouseButton::X1,
        9 => MouseButton::X2,
        n => MouseButton::Other(n as u8),
    }
}

impl X11Platform {
    /// Connects to the server named by `$DISPLAY`.
    pub fn new() -> Result<Self> {
        unsafe {
            let display = xlib::XOpenDisplay(ptr::null());
            if display.is_null() {
                return Err(raise(VideoError::PlatformFailure(
                    "failed to open X11 display; is DISPLAY set?".into(),
                )));
            }
            let screen = xlib::XDefaultScreen(display);
            let root = xlib::XRootWindow(display, screen);
            let wm_delete_window = xlib::XInternAtom(
                display,
                b"WM_DELETE_WINDOW\0".as_ptr() as *const c_char,
                xlib::False,
            );
            let motif_wm_hints = xlib::XInternAtom(
                display,
                b"_MOTIF_WM_HINTS\0".as_ptr() as *const c_char,
                xlib::False,
            );
            info!("X11Platform: connected, screen {}", screen);
            Ok(Self {
                display,
                screen,
                root,
                wm_delete_window,
                motif_wm_hints,
                surfaces: HashMap::new(),
                by_xid: HashMap::new(),
                surface_serial: 0,
            })
        }
    }

    fn surface(&self, surface: SurfaceHandle) -> Result<&X11Surface> {
        self.surfaces.get(&surface).ok_or_else(|| {
            raise(VideoError::PlatformFailure(format!(
                "unknown surface {}",
                surface.raw()
            )))
        })
    }

    fn check_display(&self, display: DisplayHandle) -> Result<()> {
        if display == single_display() {
            Ok(())
        } else {
            Err(raise(VideoError::InvalidDisplay(display)))
        }
    }

    fn screen_rect(&self) -> Rect {
        unsafe {
            Rect::new(
                0,
                0,
                xlib::XDisplayWidth(self.display, self.screen),
                xlib::XDisplayHeight(self.display, self.screen),
            )
        }
    }

    /// Asks the window manager to draw or drop decorations.
    fn apply_decorations(&self, xid: xlib::Window, style: WindowStyle) {
        let decorations = c_long::from(style.is_decorated());
        let hints: [c_long; 5] = [MWM_HINTS_DECORATIONS, 0, decorations, 0, 0];
        unsafe {
            xlib::XChangeProperty(
                self.display,
                xid,
                self.motif_wm_hints,
                self.motif_wm_hints,
                32,
                xlib::PropModeReplace,
                hints.as_ptr() as *const c_uchar,
                hints.len() as c_int,
            );
        }
    }

    fn apply_visibility(&self, xid: xlib::Window, visibility: SurfaceVisibility) {
        unsafe {
            match visibility {
                SurfaceVisibility::Hidden => {
                    xlib::XUnmapWindow(self.display, xid);
                }
                SurfaceVisibility::Minimized => {
                    xlib::XIconifyWindow(self.display, xid, self.screen);
                }
                SurfaceVisibility::Normal | SurfaceVisibility::Maximized => {
                    xlib::XMapWindow(self.display, xid);
                }
            }
        }
    }

    /// Root-relative origin of a window's client area.
    fn root_origin(&self, xid: xlib::Window) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        let mut child: xlib::Window = 0;
        unsafe {
            xlib::XTranslateCoordinates(self.display, xid, self.root, 0, 0, &mut x, &mut y, &mut child);
        }
        (x, y)
    }

    fn translate(&self, event: &xlib::XEvent) -> Option<PlatformMessage> {
        let xid = unsafe { event.any.window };
        let handle = *self.by_xid.get(&xid)?;
        let visibility = self.surfaces.get(&handle)?.visibility;
        let message = unsafe {
            match event.get_type() {
                xlib::ConfigureNotify => {
                    let configure = event.configure;
                    let reason = match visibility {
                        SurfaceVisibility::Maximized => ResizeReason::Maximized,
                        _ => ResizeReason::Restored,
                    };
                    // `pump` adds the matching Moved from a root translation.
                    return Some(PlatformMessage::to(
                        handle,
                        OsMessage::Resized {
                            width: configure.width,
                            height: configure.height,
                            reason,
                        },
                    ));
                }
                xlib::ClientMessage => {
                    let client = event.client_message;
                    if client.data.get_long(0) as xlib::Atom != self.wm_delete_window {
                        return None;
                    }
                    OsMessage::CloseRequested
                }
                xlib::FocusIn => OsMessage::FocusChanged { focused: true },
                xlib::FocusOut => OsMessage::FocusChanged { focused: false },
                xlib::MapNotify => OsMessage::VisibilityChanged { visible: true },
                xlib::UnmapNotify if visibility == SurfaceVisibility::Minimized => {
                    OsMessage::Resized {
                        width: 0,
                        height: 0,
                        reason: ResizeReason::Minimized,
                    }
                }
                xlib::UnmapNotify => OsMessage::VisibilityChanged { visible: false },
                xlib::KeyPress | xlib::KeyRelease => {
                    let key = event.key;
                    OsMessage::Key {
                        state: if event.get_type() == xlib::KeyPress {
                            KeyState::Down
                        } else {
                            KeyState::Up
                        },
                        code: key.keycode,
                        modifiers: extract_modifiers(key.state),
                    }
                }
                xlib::ButtonPress | xlib::ButtonRelease => {
                    let button = event.button;
                    let pressed = event.get_type() == xlib::ButtonPress;
                    match button.button {
                        4 | 5 if pressed => OsMessage::MouseWheel {
                            dx: 0,
                            dy: if button.button == 4 { 1 } else { -1 },
                        },
                        6 | 7 if pressed => OsMessage::MouseWheel {
                            dx: if button.button == 7 { 1 } else { -1 },
                            dy: 0,
                        },
                        4..=7 => return None,
                        n => OsMessage::MouseButton {
                            button: map_button(n),
                            pressed,
                            x: button.x,
                            y: button.y,
                        },
                    }
                }
                xlib::MotionNotify => {
                    let motion = event.motion;
                    OsMessage::MouseMoved {
                        x: motion.x,
                        y: motion.y,
                    }
                }
                _ => return None,
            }
        };
        Some(PlatformMessage::to(handle, message))
    }
}

impl Platform for X11Platform {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceHandle> {
        let title = c_string(&desc.title)?;
        let rect = desc.outer_rect;
        let xid = unsafe {
            let xid = xlib::XCreateSimpleWindow(
                self.display,
                self.root,
                rect.x,
                rect.y,
                rect.width.max(1) as c_uint,
                rect.height.max(1) as c_uint,
                0,
                xlib::XBlackPixel(self.display, self.screen),
                xlib::XBlackPixel(self.display, self.screen),
            );
            if xid == 0 {
                return Err(raise(VideoError::PlatformFailure(
                    "XCreateSimpleWindow failed".into(),
                )));
            }
            xlib::XStoreName(self.display, xid, title.as_ptr());
            xlib::XSelectInput(
                self.display,
                xid,
                xlib::KeyPressMask
                    | xlib::KeyReleaseMask
                    | xlib::ButtonPressMask
                    | xlib::ButtonReleaseMask
                    | xlib::PointerMotionMask
                    | xlib::StructureNotifyMask
                    | xlib::FocusChangeMask,
            );
            let mut protocols = [self.wm_delete_window];
            xlib::XSetWMProtocols(self.display, xid, protocols.as_mut_ptr(), 1);
            xid
        };
        self.apply_decorations(xid, desc.style);
        self.apply_visibility(xid, desc.visibility);
        unsafe {
            xlib::XFlush(self.display);
        }

        let handle = SurfaceHandle::new(NonZeroU64::MIN.saturating_add(self.surface_serial));
        self.surface_serial += 1;
        self.surfaces.insert(
            handle,
            X11Surface {
                xid,
                visibility: desc.visibility,
            },
        );
        self.by_xid.insert(xid, handle);
        debug!("X11Platform: created window 0x{:x}", xid);
        Ok(handle)
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()> {
        let xid = self.surface(surface)?.xid;
        unsafe {
            xlib::XDestroyWindow(self.display, xid);
            xlib::XFlush(self.display);
        }
        self.surfaces.remove(&surface);
        self.by_xid.remove(&xid);
        Ok(())
    }

    fn set_surface_rect(&mut self, surface: SurfaceHandle, outer: Rect) -> Result<()> {
        let xid = self.surface(surface)?.xid;
        unsafe {
            xlib::XMoveResizeWindow(
                self.display,
                xid,
                outer.x,
                outer.y,
                outer.width.max(1) as c_uint,
                outer.height.max(1) as c_uint,
            );
            xlib::XFlush(self.display);
        }
        Ok(())
    }

    fn set_surface_style(&mut self, surface: SurfaceHandle, style: WindowStyle) -> Result<()> {
        let xid = self.surface(surface)?.xid;
        self.apply_decorations(xid, style);
        unsafe {
            xlib::XFlush(self.display);
        }
        Ok(())
    }

    fn set_surface_visibility(
        &mut self,
        surface: SurfaceHandle,
        visibility: SurfaceVisibility,
    ) -> Result<()> {
        let xid = self.surface(surface)?.xid;
        self.apply_visibility(xid, visibility);
        unsafe {
            xlib::XFlush(self.display);
        }
        if let Some(entry) = self.surfaces.get_mut(&surface) {
            entry.visibility = visibility;
        }
        Ok(())
    }

    fn set_surface_title(&mut self, surface: SurfaceHandle, title: &str) -> Result<()> {
        let xid = self.surface(surface)?.xid;
        let title = c_string(title)?;
        unsafe {
            xlib::XStoreName(self.display, xid, title.as_ptr());
            xlib::XFlush(self.display);
        }
        Ok(())
    }

    /// The window manager draws frames outside the client window, so the
    /// rect handed to the server is the client rect.
    fn adjust_rect(&self, client: Rect, _style: WindowStyle) -> Rect {
        client
    }

    fn native_handles(&self, surface: SurfaceHandle) -> Result<NativeHandles> {
        let xid = self.surface(surface)?.xid;
        Ok(NativeHandles {
            display: self.display as *mut c_void,
            window: xid as usize as *mut c_void,
        })
    }

    fn display_handles(&self) -> Result<Vec<DisplayHandle>> {
        Ok(vec![single_display()])
    }

    fn display_geometry(&self, display: DisplayHandle) -> Result<DisplayGeometry> {
        self.check_display(display)?;
        let bounds = self.screen_rect();
        Ok(DisplayGeometry {
            name: format!("X11 screen {}", self.screen),
            bounds,
            work_area: bounds,
            refresh_rate: 0,
        })
    }

    fn display_mode(&self, display: DisplayHandle, index: usize) -> Result<Option<RawDisplayMode>> {
        self.check_display(display)?;
        if index > 0 {
            return Ok(None);
        }
        let bounds = self.screen_rect();
        let depth = unsafe { xlib::XDefaultDepth(self.display, self.screen) };
        Ok(Some(RawDisplayMode {
            width: bounds.width.max(0) as u32,
            height: bounds.height.max(0) as u32,
            refresh_rate: 0,
            // Depth-24 visuals are stored in 32-bit pixels.
            bits_per_pixel: if depth == 24 { 32 } else { depth.max(0) as u32 },
        }))
    }

    fn display_dpi(&self, display: DisplayHandle) -> Result<(u32, u32)> {
        self.check_display(display)?;
        let (width_mm, height_mm) = unsafe {
            (
                xlib::XDisplayWidthMM(self.display, self.screen),
                xlib::XDisplayHeightMM(self.display, self.screen),
            )
        };
        if width_mm <= 0 || height_mm <= 0 {
            return Err(raise(VideoError::FeatureNotSupported(
                "screen reports no physical size",
            )));
        }
        let bounds = self.screen_rect();
        let dpi = |px: i32, mm: i32| (f64::from(px) * MM_PER_INCH / f64::from(mm)).round() as u32;
        Ok((dpi(bounds.width, width_mm), dpi(bounds.height, height_mm)))
    }

    fn pump(&mut self) -> Result<Vec<PlatformMessage>> {
        let mut messages = Vec::new();
        unsafe {
            while xlib::XPending(self.display) > 0 {
                let mut event: xlib::XEvent = std::mem::zeroed();
                xlib::XNextEvent(self.display, &mut event);
                let Some(message) = self.translate(&event) else {
                    trace!("X11Platform: ignored event type {}", event.get_type());
                    continue;
                };
                if let (xlib::ConfigureNotify, Some(handle)) = (event.get_type(), message.surface) {
                    let (x, y) = self.root_origin(event.any.window);
                    messages.push(PlatformMessage::to(handle, OsMessage::Moved { x, y }));
                }
                messages.push(message);
            }
        }
        Ok(messages)
    }
}

impl Drop for X11Platform {
    fn drop(&mut self) {
        if !self.surfaces.is_empty() {
            warn!(
                "X11Platform: {} window(s) still open at shutdown",
                self.surfaces.len()
            );
        }
        unsafe {
            for surface in self.surfaces.values() {
                xlib::XDestroyWindow(self.display, surface.xid);
            }
            if !self.display.is_null() {
                xlib::XCloseDisplay(self.display);
            }
        }
        info!("X11Platform: disconnected");
    }
}

// src/lib.rs
//! Windowing and event-dispatch core.
//!
//! An [`EventDriver`] routes every notification by category: dropped, queued
//! for polling, or delivered to a callback inside `push`. A
//! [`VideoInstance`] owns a [`Platform`] and the windows created on it,
//! translating OS notifications into events through the driver it borrows.

pub mod allocator;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod geometry;
pub mod input;
pub mod platform;
pub mod video;

pub use allocator::{Allocator, AllocatorDesc};
pub use config::Config;
pub use display::{Display, DisplayHandle, DisplayMode, DisplayRegistry};
pub use error::{clear_last_error, last_error, ErrorCode, Result, VideoError};
pub use event::{DispatchMode, Event, EventCategory, EventDriver, EventQueue};
pub use geometry::{Point, Rect, Size};
pub use platform::{HeadlessPlatform, NativeHandles, OsMessage, Platform, PlatformMessage};
pub use video::{VideoInstance, Window, WindowDesc, WindowFlags, WindowId, WindowState};

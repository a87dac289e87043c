// src/error.rs
//! Error taxonomy for the windowing core.
//!
//! Every fallible operation returns [`Result`]. Each error raised inside the
//! crate also records its message in a per-thread slot, readable through
//! [`last_error`], so a caller that only looks at an [`ErrorCode`] can still
//! fetch a human-readable diagnostic without racing other threads.

use std::cell::RefCell;

use thiserror::Error;

use crate::display::DisplayHandle;
use crate::video::WindowId;

pub type Result<T> = std::result::Result<T, VideoError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoError {
    #[error("Required handle or pointer argument was missing")]
    NullPointer,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Allocator returned no memory")]
    OutOfMemory,
    #[error("Allocator descriptor must set both alloc and free, or neither")]
    InvalidAllocator,
    #[error("Platform call failed: {0}")]
    PlatformFailure(String),
    #[error("Window {0:?} does not resolve")]
    InvalidWindow(WindowId),
    #[error("Display {0:?} does not resolve")]
    InvalidDisplay(DisplayHandle),
    #[error("Feature not supported by this platform: {0}")]
    FeatureNotSupported(&'static str),
}

/// Flat result codes, one per [`VideoError`] variant plus `Success`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success = 0,
    NullPointer,
    InvalidArgument,
    OutOfMemory,
    InvalidAllocator,
    PlatformFailure,
    InvalidWindow,
    InvalidDisplay,
    FeatureNotSupported,
}

impl ErrorCode {
    /// `Success` for `Ok`, otherwise the code of the contained error.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::Success,
            Err(e) => e.code(),
        }
    }
}

impl VideoError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VideoError::NullPointer => ErrorCode::NullPointer,
            VideoError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            VideoError::OutOfMemory => ErrorCode::OutOfMemory,
            VideoError::InvalidAllocator => ErrorCode::InvalidAllocator,
            VideoError::PlatformFailure(_) => ErrorCode::PlatformFailure,
            VideoError::InvalidWindow(_) => ErrorCode::InvalidWindow,
            VideoError::InvalidDisplay(_) => ErrorCode::InvalidDisplay,
            VideoError::FeatureNotSupported(_) => ErrorCode::FeatureNotSupported,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Records `err` as this thread's last error and returns it, so call sites can
/// write `return Err(raise(VideoError::OutOfMemory))`.
pub(crate) fn raise(err: VideoError) -> VideoError {
    let message = err.to_string();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
    err
}

/// The message of the most recent error raised on the calling thread.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

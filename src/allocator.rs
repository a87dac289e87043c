// src/allocator.rs
//! Pluggable allocator descriptor.
//!
//! Owning constructors take an `Option<&AllocatorDesc>`. `None`, or a
//! descriptor with neither function set, selects the process allocator.
//! Setting exactly one of the two functions is rejected.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::error::{raise, Result, VideoError};

/// Allocation hook: `(size, align, user_data)`; returns null on failure.
pub type AllocFn = fn(usize, usize, usize) -> *mut u8;
/// Release hook: `(ptr, size, align, user_data)`.
pub type FreeFn = fn(*mut u8, usize, usize, usize);

/// Caller-facing allocator description: two optional hooks plus an opaque
/// user word passed back on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorDesc {
    pub alloc: Option<AllocFn>,
    pub free: Option<FreeFn>,
    pub user_data: usize,
}

/// A validated allocator. Cheap to copy; every owning object keeps its own.
#[derive(Clone, Copy)]
pub struct Allocator {
    alloc: AllocFn,
    free: FreeFn,
    user_data: usize,
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("system", &self.is_system())
            .field("user_data", &self.user_data)
            .finish()
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::system()
    }
}

fn system_alloc(size: usize, align: usize, _user: usize) -> *mut u8 {
    match Layout::from_size_align(size, align) {
        // SAFETY: callers never request zero-sized blocks.
        Ok(layout) if size > 0 => unsafe { alloc::alloc(layout) },
        _ => std::ptr::null_mut(),
    }
}

fn system_free(ptr: *mut u8, size: usize, align: usize, _user: usize) {
    if ptr.is_null() {
        return;
    }
    if let Ok(layout) = Layout::from_size_align(size, align) {
        // SAFETY: `ptr` came from `system_alloc` with this exact layout.
        unsafe { alloc::dealloc(ptr, layout) }
    }
}

impl Allocator {
    pub fn system() -> Self {
        Self {
            alloc: system_alloc,
            free: system_free,
            user_data: 0,
        }
    }

    /// Validates a descriptor. Exactly one hook set is `InvalidAllocator`.
    pub fn from_desc(desc: Option<&AllocatorDesc>) -> Result<Self> {
        match desc {
            None => Ok(Self::system()),
            Some(d) => match (d.alloc, d.free) {
                (Some(alloc), Some(free)) => Ok(Self {
                    alloc,
                    free,
                    user_data: d.user_data,
                }),
                (None, None) => Ok(Self::system()),
                _ => Err(raise(VideoError::InvalidAllocator)),
            },
        }
    }

    pub fn is_system(&self) -> bool {
        self.alloc as usize == system_alloc as usize
    }

    /// Allocates a block for `layout`, mapping a null return to `OutOfMemory`.
    pub(crate) fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        let ptr = (self.alloc)(layout.size(), layout.align(), self.user_data);
        NonNull::new(ptr).ok_or_else(|| raise(VideoError::OutOfMemory))
    }

    /// # Safety
    /// `ptr` must have been returned by [`Allocator::allocate`] on an
    /// allocator with the same hooks, with the same `layout`.
    pub(crate) unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (self.free)(ptr.as_ptr(), layout.size(), layout.align(), self.user_data);
    }
}

/// Fixed-capacity buffer of `Copy` values in allocator-owned memory.
///
/// Slots are uninitialised until written; callers track which are live.
pub(crate) struct RawBuf<T: Copy> {
    allocator: Allocator,
    ptr: NonNull<T>,
    capacity: usize,
}

// SAFETY: the block is exclusively owned; `T: Send` carries the rest.
unsafe impl<T: Copy + Send> Send for RawBuf<T> {}

impl<T: Copy> RawBuf<T> {
    pub(crate) fn with_capacity(capacity: usize, allocator: Allocator) -> Result<Self> {
        if capacity == 0 {
            return Err(raise(VideoError::InvalidArgument(
                "buffer capacity must be non-zero".into(),
            )));
        }
        let layout = Self::layout(capacity)?;
        let ptr = allocator.allocate(layout)?.cast::<T>();
        Ok(Self {
            allocator,
            ptr,
            capacity,
        })
    }

    fn layout(capacity: usize) -> Result<Layout> {
        Layout::array::<T>(capacity).map_err(|_| raise(VideoError::OutOfMemory))
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn allocator(&self) -> Allocator {
        self.allocator
    }

    pub(crate) fn write(&mut self, index: usize, value: T) {
        assert!(index < self.capacity, "RawBuf write out of bounds");
        // SAFETY: index checked above.
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }

    /// # Safety
    /// `index` must be in bounds and previously written.
    pub(crate) unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.capacity);
        self.ptr.as_ptr().add(index).read()
    }

    /// # Safety
    /// The first `len` slots must have been written.
    pub(crate) unsafe fn as_slice(&self, len: usize) -> &[T] {
        debug_assert!(len <= self.capacity);
        std::slice::from_raw_parts(self.ptr.as_ptr(), len)
    }
}

impl<T: Copy> Drop for RawBuf<T> {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.capacity) {
            // SAFETY: allocated in `with_capacity` with this layout.
            unsafe { self.allocator.deallocate(self.ptr.cast(), layout) };
        }
    }
}

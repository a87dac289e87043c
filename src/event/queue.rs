// src/event/queue.rs
//! Pending-event storage for POLL-mode categories.
//!
//! `RingQueue` is the default: a power-of-two ring over an allocator-owned
//! buffer that doubles when full and coalesces high-frequency geometry events.
//! `SharedQueue` wraps one behind a mutex for callers that want to keep their
//! own handle to the queue a driver pushes into.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::allocator::{Allocator, RawBuf};
use crate::error::{raise, Result, VideoError};
use crate::event::Event;

/// Storage a driver routes POLL-mode events into.
pub trait EventQueue {
    /// Appends `event`, or overwrites a pending coalescible match in place.
    fn push(&mut self, event: &Event) -> Result<()>;

    /// Removes and returns the oldest pending event. Never blocks.
    fn poll(&mut self) -> Option<Event>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Growable coalescing ring buffer.
///
/// `head` and `tail` only ever increase (wrapping); the slot for a cursor is
/// `cursor & (capacity - 1)`, so pending count is `tail - head` and the queue
/// is empty iff they are equal.
pub struct RingQueue {
    buf: RawBuf<Event>,
    head: usize,
    tail: usize,
}

impl RingQueue {
    /// `capacity` is rounded up to a power of two. Zero is `InvalidArgument`.
    pub fn with_capacity(capacity: usize, allocator: Allocator) -> Result<Self> {
        if capacity == 0 {
            return Err(raise(VideoError::InvalidArgument(
                "event queue capacity must be non-zero".into(),
            )));
        }
        let capacity = capacity
            .checked_next_power_of_two()
            .ok_or_else(|| raise(VideoError::OutOfMemory))?;
        Ok(Self {
            buf: RawBuf::with_capacity(capacity, allocator)?,
            head: 0,
            tail: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    fn slot(&self, cursor: usize) -> usize {
        cursor & (self.buf.capacity() - 1)
    }

    fn pending_at(&self, cursor: usize) -> Event {
        // SAFETY: only called for cursors in [head, tail), which are written.
        unsafe { self.buf.read(self.slot(cursor)) }
    }

    /// Cursor of the pending entry with the same category and source, newest first.
    fn find_coalesce_target(&self, event: &Event) -> Option<usize> {
        (1..=self.len())
            .map(|back| self.tail.wrapping_sub(back))
            .find(|&cursor| {
                let pending = self.pending_at(cursor);
                pending.category == event.category && pending.source_id == event.source_id
            })
    }

    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.buf.capacity();
        let new_capacity = old_capacity
            .checked_mul(2)
            .ok_or_else(|| raise(VideoError::OutOfMemory))?;
        let mut grown = RawBuf::with_capacity(new_capacity, self.buf.allocator())?;

        let mut cursor = self.head;
        while cursor != self.tail {
            grown.write(cursor & (new_capacity - 1), self.pending_at(cursor));
            cursor = cursor.wrapping_add(1);
        }
        self.buf = grown;
        debug!(
            "RingQueue: grew from {} to {} slots ({} pending)",
            old_capacity,
            new_capacity,
            self.len()
        );
        Ok(())
    }
}

impl EventQueue for RingQueue {
    fn push(&mut self, event: &Event) -> Result<()> {
        if event.category.is_coalescible() {
            if let Some(cursor) = self.find_coalesce_target(event) {
                let slot = self.slot(cursor);
                self.buf.write(slot, *event);
                return Ok(());
            }
        }
        if self.len() == self.capacity() {
            self.grow()?;
        }
        let slot = self.slot(self.tail);
        self.buf.write(slot, *event);
        self.tail = self.tail.wrapping_add(1);
        Ok(())
    }

    fn poll(&mut self) -> Option<Event> {
        if self.head == self.tail {
            return None;
        }
        let event = self.pending_at(self.head);
        self.head = self.head.wrapping_add(1);
        Some(event)
    }

    fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head)
    }
}

/// Cloneable handle to a mutex-guarded `RingQueue`.
///
/// Hand one clone to `EventDriver::with_queue` and keep another to drain or
/// inspect the same storage, possibly from a different thread. The storage is
/// released when the last handle drops.
#[derive(Clone)]
pub struct SharedQueue {
    inner: Arc<Mutex<RingQueue>>,
}

impl SharedQueue {
    pub fn new(capacity: usize, allocator: Allocator) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(RingQueue::with_capacity(capacity, allocator)?)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RingQueue> {
        // Ring cursors are only advanced after a slot write completes, so a
        // poisoned guard still holds a consistent queue.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Polls without needing `&mut`, for consumers holding a shared clone.
    pub fn try_poll(&self) -> Option<Event> {
        self.lock().poll()
    }

    pub fn drain(&self) -> Vec<Event> {
        let mut queue = self.lock();
        std::iter::from_fn(|| queue.poll()).collect()
    }
}

impl EventQueue for SharedQueue {
    fn push(&mut self, event: &Event) -> Result<()> {
        self.lock().push(event)
    }

    fn poll(&mut self) -> Option<Event> {
        self.lock().poll()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

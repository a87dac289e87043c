// src/event/driver.rs
//! EventDriver - the single routing point for every produced event.
//!
//! Windows, the input subsystem and application code all call
//! [`EventDriver::push`]. The driver looks up the category's dispatch mode and
//! either drops the event, queues it for [`EventDriver::poll`], or hands it to
//! the registered callback before `push` returns.
//!
//! ## Threading Model
//! Not internally synchronised. Any thread may drive a driver, but only one
//! at a time; the owner of the platform message pump is the usual choice.

use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::allocator::{Allocator, AllocatorDesc};
use crate::config::DriverConfig;
use crate::error::Result;
use crate::event::queue::{EventQueue, RingQueue};
use crate::event::{Event, EventCategory};

/// Per-category delivery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DispatchMode {
    /// Drop the event.
    #[default]
    None,
    /// Store it for `poll`.
    Poll,
    /// Invoke the callback synchronously inside `push`.
    Callback,
}

/// Receives CALLBACK-mode events. The reference is only valid for the call;
/// copy the event to keep it. Captured state plays the role of a user pointer.
pub type EventCallback = Box<dyn FnMut(&Event)>;

pub struct EventDriver {
    modes: [DispatchMode; EventCategory::COUNT],
    callback: Option<EventCallback>,
    queue: Box<dyn EventQueue>,
    owns_queue: bool,
    allocator: Allocator,
}

impl fmt::Debug for EventDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDriver")
            .field("modes", &self.modes)
            .field("has_callback", &self.callback.is_some())
            .field("pending", &self.queue.len())
            .field("owns_queue", &self.owns_queue)
            .finish()
    }
}

impl EventDriver {
    /// Creates a driver with its own `RingQueue`, applying the configured
    /// dispatch table. Categories absent from the table stay `None`.
    pub fn new(config: &DriverConfig, allocator: Option<&AllocatorDesc>) -> Result<Self> {
        let allocator = Allocator::from_desc(allocator)?;
        let queue = RingQueue::with_capacity(config.initial_queue_capacity, allocator)?;
        let mut driver = Self {
            modes: [DispatchMode::None; EventCategory::COUNT],
            callback: None,
            queue: Box::new(queue),
            owns_queue: true,
            allocator,
        };
        for (&category, &mode) in &config.dispatch {
            driver.set_dispatch_mode(category, mode);
        }
        Ok(driver)
    }

    /// Creates a driver that pushes into a caller-supplied queue.
    pub fn with_queue(
        queue: Box<dyn EventQueue>,
        allocator: Option<&AllocatorDesc>,
    ) -> Result<Self> {
        Ok(Self {
            modes: [DispatchMode::None; EventCategory::COUNT],
            callback: None,
            queue,
            owns_queue: false,
            allocator: Allocator::from_desc(allocator)?,
        })
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Whether the queue was created by this driver rather than supplied.
    pub fn owns_queue(&self) -> bool {
        self.owns_queue
    }

    pub fn set_dispatch_mode(&mut self, category: EventCategory, mode: DispatchMode) {
        self.modes[category.index()] = mode;
    }

    pub fn dispatch_mode(&self, category: EventCategory) -> DispatchMode {
        self.modes[category.index()]
    }

    pub fn set_dispatch_mode_all(&mut self, mode: DispatchMode) {
        self.modes = [mode; EventCategory::COUNT];
    }

    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) -> Option<EventCallback> {
        self.callback.take()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Routes one event according to its category's mode. Only queue growth
    /// can fail, with `OutOfMemory`; the event is then not accepted.
    pub fn push(&mut self, event: &Event) -> Result<()> {
        match self.modes[event.category.index()] {
            DispatchMode::None => Ok(()),
            DispatchMode::Callback => {
                match self.callback.as_mut() {
                    Some(callback) => callback(event),
                    None => trace!("EventDriver: no callback for {:?}, dropped", event.category),
                }
                Ok(())
            }
            DispatchMode::Poll => self.queue.push(event),
        }
    }

    /// Next POLL-mode event, or `None` when the queue is drained.
    pub fn poll(&mut self) -> Option<Event> {
        self.queue.poll()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

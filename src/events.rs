//! Event publishing keyed by recipient.

use crate::config::{Event, UserId};
use parking_lot::Mutex;

/// Destination for events addressed to individual users.
///
/// Publishing is fire-and-forget: delivery failures are the sink's concern.
pub trait EventSink: Send + Sync {
    fn publish(&self, recipient: UserId, event: &Event);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopEventSink;

impl EventSink for NopEventSink {
    fn publish(&self, _recipient: UserId, _event: &Event) {}
}

/// Keeps published events in memory, in publish order.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    published: Mutex<Vec<(UserId, Event)>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything published so far.
    pub fn take(&self) -> Vec<(UserId, Event)> {
        std::mem::take(&mut *self.published.lock())
    }

    pub fn len(&self) -> usize {
        self.published.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.lock().is_empty()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, recipient: UserId, event: &Event) {
        self.published.lock().push((recipient, event.clone()));
    }
}

impl<F> EventSink for F
where
    F: Fn(UserId, &Event) + Send + Sync,
{
    fn publish(&self, recipient: UserId, event: &Event) {
        self(recipient, event)
    }
}

//! Where the transaction write boundary sends its events.

use std::sync::{Arc, Mutex};

use super::DomainEvent;

/// Receives events after a ledger mutation has been stored.
///
/// `emit` is called on the writer's thread, so implementations hand the
/// event off (to a queue, a channel) instead of recalculating inline. A sink
/// that fails to deliver must not fail the write that produced the event.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);

    fn emit_batch(&self, events: Vec<DomainEvent>) {
        events.into_iter().for_each(|event| self.emit(event));
    }
}

/// Drops events. The default for services whose callers recalculate directly.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Records events so tests can assert on what a write announced.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    recorded: Arc<Mutex<Vec<DomainEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far, oldest first.
    pub fn recorded(&self) -> Vec<DomainEvent> {
        match self.recorded.lock() {
            Ok(recorded) => recorded.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn take(&self) -> Vec<DomainEvent> {
        match self.recorded.lock() {
            Ok(mut recorded) => std::mem::take(&mut *recorded),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DomainEventSink for RecordingEventSink {
    fn emit(&self, event: DomainEvent) {
        match self.recorded.lock() {
            Ok(mut recorded) => recorded.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

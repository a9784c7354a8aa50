//! Lock-guarded event buffer shared by the dispatcher implementations

use crate::event::EventRecord;
use crate::message::EventBuffer;
use crate::time::TimeSource;
use crate::types::Result;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The single live [`EventBuffer`] of a dispatcher
///
/// All operations take the same lock, so a swap after a successful send is
/// atomic with respect to concurrent submissions: every event lands either in
/// the batch being sent or in the fresh buffer installed afterwards.
pub struct SharedBuffer {
    buffer: Mutex<EventBuffer>,
    clock: Arc<dyn TimeSource>,
}

impl SharedBuffer {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            buffer: Mutex::new(EventBuffer::new()),
            clock,
        }
    }

    pub fn submit(&self, event: EventRecord) {
        let mut buffer = self.lock();
        log::trace!("Buffering event '{}'", event.tag());
        buffer.add_event(event);
    }

    pub fn clear(&self) {
        let mut buffer = self.lock();
        log::debug!("Dropping {} buffered event(s)", buffer.len());
        *buffer = EventBuffer::new();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the buffer and hand the payload to `send`
    ///
    /// The lock is held for the whole call, including `send`. The buffer is
    /// replaced only when both serialization and `send` succeed.
    pub fn flush_with<F>(&self, send: F) -> Result<usize>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        let mut buffer = self.lock();
        let payload = buffer.serialize(self.clock.now())?;
        send(&payload)?;

        let sent = buffer.len();
        *buffer = EventBuffer::new();
        log::debug!("Flushed {} event(s), buffer reset", sent);
        Ok(sent)
    }

    // A producer that panicked mid-push cannot leave the Vec inconsistent,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, EventBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("pending", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::message::WirePayload;
    use crate::time::ManualClock;
    use crate::types::{Tag, TrackerError};

    fn record(tag: &str) -> EventRecord {
        EventRecord::new(Tag::new(tag).unwrap(), 1, EventKind::Instant)
    }

    #[test]
    fn test_flush_success_resets_buffer() {
        let buffer = SharedBuffer::new(Arc::new(ManualClock::new(99)));
        buffer.submit(record("a"));
        buffer.submit(record("b"));

        let mut seen = None;
        let sent = buffer
            .flush_with(|payload| {
                seen = Some(serde_json::from_str::<WirePayload>(payload).unwrap());
                Ok(())
            })
            .unwrap();

        assert_eq!(sent, 2);
        assert!(buffer.is_empty());
        let payload = seen.unwrap();
        assert_eq!(payload.when_sent, 99);
        assert_eq!(payload.events.len(), 2);
    }

    #[test]
    fn test_flush_failure_keeps_events() {
        let buffer = SharedBuffer::new(Arc::new(ManualClock::new(0)));
        buffer.submit(record("a"));

        let result = buffer.flush_with(|_| Err(TrackerError::TransportFailure("down".into())));
        assert!(matches!(result, Err(TrackerError::TransportFailure(_))));
        assert_eq!(buffer.len(), 1);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}

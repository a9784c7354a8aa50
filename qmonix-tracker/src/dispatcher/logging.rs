//! Dispatcher that writes batches to the process log

use super::{Dispatcher, SharedBuffer};
use crate::event::EventRecord;
use crate::time::{SystemClock, TimeSource};
use crate::types::Result;
use log::Level;
use std::sync::Arc;

/// Log target used for emitted batches
pub const LOG_TARGET: &str = "qmonix";

/// Collects events and writes each flushed batch to the `log` facade
///
/// Useful during development and as a stand-in before a collection endpoint
/// is configured. Flushing only fails if the batch cannot be encoded.
#[derive(Debug)]
pub struct LogDispatcher {
    buffer: SharedBuffer,
    level: Level,
}

impl LogDispatcher {
    /// Create a dispatcher logging at `Info` with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            buffer: SharedBuffer::new(clock),
            level: Level::Info,
        }
    }

    /// Builder method: change the level batches are logged at
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for LogDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for LogDispatcher {
    fn submit(&self, event: EventRecord) {
        self.buffer.submit(event);
    }

    fn flush(&self) -> Result<usize> {
        let level = self.level;
        self.buffer.flush_with(|payload| {
            log::log!(target: LOG_TARGET, level, "{}", payload);
            Ok(())
        })
    }

    fn clear(&self) {
        self.buffer.clear();
    }

    fn pending(&self) -> usize {
        self.buffer.len()
    }
}

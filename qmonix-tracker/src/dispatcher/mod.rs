//! Event dispatchers
//!
//! A dispatcher owns the buffer of fired events and knows how to flush it to a
//! sink. Two sinks are provided:
//!
//! - [`LogDispatcher`]: writes the serialized batch through the `log` facade
//! - [`HttpDispatcher`]: posts the serialized batch to a collection endpoint
//!
//! `submit`, `flush`/`dispatch` and `clear` on one dispatcher are mutually
//! exclusive. A failed flush leaves the buffer untouched so it can be retried;
//! only a successful flush (or `clear`) empties it.

use crate::event::EventRecord;
use crate::types::Result;

pub mod buffered;
pub mod http;
pub mod logging;

pub use buffered::SharedBuffer;
pub use http::{HttpDispatcher, ReqwestTransport, Transport, TransportError};
pub use logging::LogDispatcher;

/// Common interface for all event dispatchers
pub trait Dispatcher: Send + Sync {
    /// Add a fired event to the live buffer
    fn submit(&self, event: EventRecord);

    /// Serialize and send the live buffer
    ///
    /// On success the buffer is replaced with an empty one and the number of
    /// events sent is returned. On failure the buffer is left as it was.
    fn flush(&self) -> Result<usize>;

    /// Drop all buffered events without sending them
    fn clear(&self);

    /// Number of events waiting to be sent
    fn pending(&self) -> usize;

    /// Flush the buffer and report the outcome to `handler`
    fn dispatch(&self, handler: &mut dyn DispatchHandler) {
        match self.flush() {
            Ok(_) => handler.on_success(),
            Err(e) => handler.on_error(&e.to_string()),
        }
    }
}

/// Receiver of dispatch outcomes
pub trait DispatchHandler {
    fn on_success(&mut self);
    fn on_error(&mut self, message: &str);
}

/// [`DispatchHandler`] built from two closures
///
/// # Example
/// ```
/// use qmonix_tracker::{DispatchCallbacks, Dispatcher, LogDispatcher};
///
/// let dispatcher = LogDispatcher::new();
/// let mut sent = false;
/// dispatcher.dispatch(&mut DispatchCallbacks::new(
///     || sent = true,
///     |err: &str| eprintln!("dispatch failed: {}", err),
/// ));
/// assert!(sent);
/// ```
pub struct DispatchCallbacks<S, E>
where
    S: FnMut(),
    E: FnMut(&str),
{
    on_success: S,
    on_error: E,
}

impl<S, E> DispatchCallbacks<S, E>
where
    S: FnMut(),
    E: FnMut(&str),
{
    pub fn new(on_success: S, on_error: E) -> Self {
        Self {
            on_success,
            on_error,
        }
    }
}

impl<S, E> DispatchHandler for DispatchCallbacks<S, E>
where
    S: FnMut(),
    E: FnMut(&str),
{
    fn on_success(&mut self) {
        (self.on_success)()
    }

    fn on_error(&mut self, message: &str) {
        (self.on_error)(message)
    }
}

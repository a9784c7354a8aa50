//! Tracker facade
//!
//! The [`Tracker`] is the object applications create once in their composition
//! root and hand to the code that records events. It holds the active
//! dispatcher and the time source and builds the event variants.

use crate::dispatcher::{DispatchHandler, Dispatcher};
use crate::event::{Event, TimingEvent};
use crate::time::{SystemClock, TimeSource};
use crate::types::{Result, Tag, TrackerError};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Entry point for recording events
///
/// A tracker without a dispatcher rejects every call with
/// [`TrackerError::Uninitialized`] until [`Tracker::init`] is called.
///
/// # Example
/// ```
/// use qmonix_tracker::{Dispatcher, LogDispatcher, Tracker};
/// use std::sync::Arc;
///
/// let tracker = Tracker::with_dispatcher(Arc::new(LogDispatcher::new()));
/// tracker.fire("app/start").unwrap();
/// tracker.fire_volume("shop/purchase", 3).unwrap();
///
/// let mut timing = tracker.start_timing("shop/checkout").unwrap();
/// timing.pause().unwrap();
/// timing.resume().unwrap();
/// timing.fire().unwrap();
///
/// assert_eq!(tracker.dispatcher().unwrap().pending(), 3);
/// tracker.flush().unwrap();
/// ```
pub struct Tracker {
    dispatcher: RwLock<Option<Arc<dyn Dispatcher>>>,
    clock: Arc<dyn TimeSource>,
}

impl Tracker {
    /// Create an uninitialized tracker using `clock`
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            dispatcher: RwLock::new(None),
            clock,
        }
    }

    /// Create a tracker that is ready to use, with the system clock
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        let tracker = Self::new(Arc::new(SystemClock));
        tracker.set_dispatcher(dispatcher);
        tracker
    }

    /// Install the first dispatcher; same as [`Tracker::set_dispatcher`]
    pub fn init(&self, dispatcher: Arc<dyn Dispatcher>) {
        self.set_dispatcher(dispatcher);
    }

    /// Atomically replace the active dispatcher
    ///
    /// Events buffered in the previous dispatcher stay there; flush it first if
    /// they should be sent. Timing events already started keep submitting to
    /// the dispatcher they were started with.
    ///
    /// Never touches the previous dispatcher's buffer, so a flush in flight on
    /// it does not hold up the swap or producers using the new one.
    pub fn set_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        let previous = {
            let mut slot = self.dispatcher.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, Some(dispatcher))
        };
        if previous.is_some() {
            log::debug!("Dispatcher replaced; previous buffer left as is");
        }
    }

    /// The active dispatcher
    pub fn dispatcher(&self) -> Result<Arc<dyn Dispatcher>> {
        self.dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TrackerError::Uninitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.dispatcher().is_ok()
    }

    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    /// Fire an instantaneous event
    pub fn fire(&self, tag: &str) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        let mut event = Event::new(Tag::new(tag)?);
        event.fire(self.clock.now(), dispatcher.as_ref())
    }

    /// Fire an event carrying `volume`, which must not be negative
    pub fn fire_volume(&self, tag: &str, volume: i64) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        let mut event = Event::with_volume(Tag::new(tag)?, volume)?;
        event.fire(self.clock.now(), dispatcher.as_ref())
    }

    /// Create and start a timing event bound to the current dispatcher
    pub fn start_timing(&self, tag: &str) -> Result<TimingEvent> {
        let dispatcher = self.dispatcher()?;
        let mut event = TimingEvent::new(Tag::new(tag)?, Arc::clone(&self.clock), dispatcher);
        event.start()?;
        Ok(event)
    }

    /// Flush the active dispatcher, returning the number of events sent
    pub fn flush(&self) -> Result<usize> {
        self.dispatcher()?.flush()
    }

    /// Flush the active dispatcher and report the outcome to `handler`
    pub fn dispatch(&self, handler: &mut dyn DispatchHandler) -> Result<()> {
        self.dispatcher()?.dispatch(handler);
        Ok(())
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

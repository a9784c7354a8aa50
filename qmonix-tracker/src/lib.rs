//! Qmonix Tracker Library
//!
//! A client-side telemetry library: application code records events, the
//! library buffers them and flushes them as JSON batches to a collection
//! endpoint.
//!
//! # Architecture
//!
//! - [`Event`]: instantaneous events, with or without a volume
//! - [`TimingEvent`]: events whose volume is time spent running, with
//!   pause/resume support
//! - [`EventBuffer`]: ordered batch of fired events and its wire payload
//! - [`Dispatcher`]: buffers events and flushes them to a sink
//!   ([`LogDispatcher`], [`HttpDispatcher`])
//! - [`Tracker`]: the facade applications create once and share
//!
//! The library does NOT:
//! - Retry failed flushes on its own
//! - Persist unsent events across restarts
//! - Route events to more than one endpoint
//!
//! A failed flush never loses events; they stay buffered until the next
//! successful flush or an explicit `clear`.
//!
//! # Example Usage
//!
//! ```no_run
//! use qmonix_tracker::{DispatchCallbacks, HttpDispatcher, Tracker};
//! use std::sync::Arc;
//!
//! let dispatcher = HttpDispatcher::new("http://demo.qmonix.com/event/").unwrap();
//! let tracker = Tracker::with_dispatcher(Arc::new(dispatcher));
//!
//! tracker.fire("app/start").unwrap();
//! tracker.fire_volume("shop/items_in_cart", 4).unwrap();
//!
//! let mut checkout = tracker.start_timing("shop/checkout").unwrap();
//! checkout.pause().unwrap();
//! checkout.resume().unwrap();
//! checkout.fire().unwrap();
//!
//! tracker
//!     .dispatch(&mut DispatchCallbacks::new(
//!         || println!("events sent"),
//!         |err: &str| eprintln!("dispatch failed: {}", err),
//!     ))
//!     .unwrap();
//! ```

// Public modules
pub mod config;
pub mod dispatcher;
pub mod event;
pub mod interval;
pub mod message;
pub mod time;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use config::{DispatcherConfig, LogLevel, TrackerConfig};
pub use dispatcher::{
    DispatchCallbacks, DispatchHandler, Dispatcher, HttpDispatcher, LogDispatcher,
    ReqwestTransport, Transport, TransportError,
};
pub use event::{Event, EventKind, EventRecord, TimingEvent, TimingMachine, TimingState};
pub use interval::TimeInterval;
pub use message::{EventBuffer, WireEvent, WirePayload};
pub use time::{ManualClock, SystemClock, TimeSource};
pub use tracker::Tracker;
pub use types::{Result, Tag, Timestamp, TrackerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

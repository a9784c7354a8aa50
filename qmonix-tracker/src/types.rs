//! Core types for the tracker library
//!
//! This module defines the small value types shared by every other module:
//! timestamps, event tags and the error taxonomy. Programmer errors (illegal
//! state transitions, bad arguments) are returned synchronously to the caller;
//! encoding and transport failures only ever surface through dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the tracker: whole seconds since the Unix epoch
pub type Timestamp = i64;

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while recording or dispatching events
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid time interval: stop {stop} precedes start {start}")]
    InvalidInterval { start: Timestamp, stop: Timestamp },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to encode events to JSON: {0}")]
    EncodingError(String),

    #[error("Failed to send events to server: {0}")]
    TransportFailure(String),

    #[error("Tracker has no dispatcher; call init() first")]
    Uninitialized,
}

impl TrackerError {
    pub(crate) fn illegal_state(msg: impl Into<String>) -> Self {
        TrackerError::IllegalState(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        TrackerError::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::EncodingError(err.to_string())
    }
}

/// Identifier of an event kind, e.g. `"shop/checkout"`
///
/// Tags are never empty. Keeping tags unique across logically different events
/// is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Create a tag, rejecting empty or whitespace-only names
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TrackerError::invalid_argument("tag name cannot be empty"));
        }
        Ok(Tag(name))
    }

    /// Borrow the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Tag {
    type Error = TrackerError;

    fn try_from(value: &str) -> Result<Self> {
        Tag::new(value)
    }
}

impl TryFrom<String> for Tag {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(value)
    }
}

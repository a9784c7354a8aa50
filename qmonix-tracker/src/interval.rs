//! Time intervals used by timing events

use crate::types::{Result, Timestamp, TrackerError};

/// A `[start, stop)` span of time, open while `stop` is unset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: Timestamp,
    stop: Option<Timestamp>,
}

impl TimeInterval {
    /// Open a new interval starting at `start`
    pub fn open(start: Timestamp) -> Self {
        Self { start, stop: None }
    }

    /// Create an already closed interval
    pub fn closed(start: Timestamp, stop: Timestamp) -> Result<Self> {
        if stop < start {
            return Err(TrackerError::InvalidInterval { start, stop });
        }
        Ok(Self {
            start,
            stop: Some(stop),
        })
    }

    /// Close the interval at `stop`
    pub fn close(&mut self, stop: Timestamp) -> Result<()> {
        if self.stop.is_some() {
            return Err(TrackerError::illegal_state("time interval is already closed"));
        }
        if stop < self.start {
            return Err(TrackerError::InvalidInterval {
                start: self.start,
                stop,
            });
        }
        self.stop = Some(stop);
        Ok(())
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn stop(&self) -> Option<Timestamp> {
        self.stop
    }

    pub fn is_open(&self) -> bool {
        self.stop.is_none()
    }

    /// Length of a closed interval in seconds
    pub fn duration(&self) -> Result<u64> {
        match self.stop {
            // stop >= start is guaranteed by construction
            Some(stop) => Ok((stop - self.start) as u64),
            None => Err(TrackerError::illegal_state(
                "duration of an open time interval is undefined",
            )),
        }
    }
}

//! Tracker configuration types
//!
//! This module defines the configuration needed to build a dispatcher and a
//! tracker. It is plain serde data so applications can embed it in their own
//! config files (the CLI reads it from TOML).

use crate::dispatcher::{Dispatcher, HttpDispatcher, LogDispatcher, ReqwestTransport};
use crate::time::{SystemClock, TimeSource};
use crate::tracker::Tracker;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the tracker library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Which dispatcher to install (default: log dispatcher at info level)
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Dispatcher selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DispatcherConfig {
    /// Write batches to the process log
    Log {
        #[serde(default)]
        level: LogLevel,
    },
    /// Post batches to a collection endpoint
    Http {
        endpoint: String,
        /// Per-request timeout in milliseconds (default: 30000)
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig::Log {
            level: LogLevel::default(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Level the log dispatcher writes batches at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: use the log dispatcher at `level`
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.dispatcher = DispatcherConfig::Log { level };
        self
    }

    /// Builder method: use the HTTP dispatcher posting to `endpoint`
    pub fn with_http_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let timeout_ms = match self.dispatcher {
            DispatcherConfig::Http { timeout_ms, .. } => timeout_ms,
            DispatcherConfig::Log { .. } => default_timeout_ms(),
        };
        self.dispatcher = DispatcherConfig::Http {
            endpoint: endpoint.into(),
            timeout_ms,
        };
        self
    }

    /// Builder method: set the HTTP timeout; ignored for the log dispatcher
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        if let DispatcherConfig::Http { timeout_ms, .. } = &mut self.dispatcher {
            *timeout_ms = timeout;
        }
        self
    }

    /// Build the configured dispatcher
    ///
    /// A malformed endpoint is reported here as a `ConfigError`, never later
    /// during dispatch.
    pub fn build_dispatcher(&self, clock: Arc<dyn TimeSource>) -> Result<Arc<dyn Dispatcher>> {
        match &self.dispatcher {
            DispatcherConfig::Log { level } => {
                log::debug!("Using log dispatcher at level {:?}", level);
                Ok(Arc::new(LogDispatcher::with_clock(clock).with_level((*level).into())))
            }
            DispatcherConfig::Http {
                endpoint,
                timeout_ms,
            } => {
                log::debug!("Using HTTP dispatcher for {} (timeout {} ms)", endpoint, timeout_ms);
                let transport = ReqwestTransport::new(Duration::from_millis(*timeout_ms))?;
                let dispatcher = HttpDispatcher::with_transport(endpoint, Box::new(transport), clock)?;
                Ok(Arc::new(dispatcher))
            }
        }
    }

    /// Build an initialized tracker on the system clock
    pub fn build_tracker(&self) -> Result<Tracker> {
        let clock: Arc<dyn TimeSource> = Arc::new(SystemClock);
        let dispatcher = self.build_dispatcher(Arc::clone(&clock))?;
        let tracker = Tracker::new(clock);
        tracker.init(dispatcher);
        Ok(tracker)
    }
}

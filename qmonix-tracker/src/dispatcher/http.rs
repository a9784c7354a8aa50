//! Dispatcher that posts batches to an HTTP collection endpoint
//!
//! The actual network call sits behind the [`Transport`] trait. The default
//! [`ReqwestTransport`] uses a blocking reqwest client, so `flush` blocks the
//! calling thread for the whole round trip. Callers that care should flush from
//! a background thread.

use super::{Dispatcher, SharedBuffer};
use crate::event::EventRecord;
use crate::time::{SystemClock, TimeSource};
use crate::types::{Result, TrackerError};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Content type of every posted payload
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Default timeout for a single post
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Network collaborator performing the POST
pub trait Transport: Send + Sync {
    /// Post `body` to `uri` and return the response body
    fn post(&self, uri: &str, body: &str) -> std::result::Result<String, TransportError>;
}

/// Transport-level error returned when a post fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Blocking reqwest-based [`Transport`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport whose posts give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TrackerError::ConfigError(format!("http client build failed: {}", err)))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn post(&self, uri: &str, body: &str) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(ACCEPT, CONTENT_TYPE_JSON)
            .body(body.to_owned())
            .send()
            .map_err(|err| TransportError::new(format!("post to {} failed: {}", uri, err)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(format!(
                "{} returned status {}",
                uri, status
            )));
        }
        response
            .text()
            .map_err(|err| TransportError::new(format!("reading response failed: {}", err)))
    }
}

/// Collects events and posts each flushed batch to a fixed endpoint
pub struct HttpDispatcher {
    endpoint: Url,
    transport: Box<dyn Transport>,
    buffer: SharedBuffer,
}

impl HttpDispatcher {
    /// Create a dispatcher posting to `endpoint` with the default reqwest transport
    ///
    /// # Example
    /// ```
    /// use qmonix_tracker::HttpDispatcher;
    ///
    /// assert!(HttpDispatcher::new("http://demo.qmonix.com/event/").is_ok());
    /// assert!(HttpDispatcher::new("not a url").is_err());
    /// ```
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::from_parts(endpoint, Box::new(transport), Arc::new(SystemClock)))
    }

    /// Create a dispatcher with a caller supplied transport and clock
    pub fn with_transport(
        endpoint: &str,
        transport: Box<dyn Transport>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self::from_parts(endpoint, transport, clock))
    }

    fn from_parts(endpoint: Url, transport: Box<dyn Transport>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            endpoint,
            transport,
            buffer: SharedBuffer::new(clock),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Validate the collection endpoint: absolute http(s) URL with a host
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|err| TrackerError::ConfigError(format!("bad server URI '{}': {}", endpoint, err)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TrackerError::ConfigError(format!(
            "bad server URI '{}': unsupported scheme '{}'",
            endpoint,
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TrackerError::ConfigError(format!(
            "bad server URI '{}': missing host",
            endpoint
        )));
    }
    Ok(url)
}

impl Dispatcher for HttpDispatcher {
    fn submit(&self, event: EventRecord) {
        self.buffer.submit(event);
    }

    fn flush(&self) -> Result<usize> {
        let result = self.buffer.flush_with(|payload| {
            log::debug!("Posting to {}: {}", self.endpoint, payload);
            let response = self
                .transport
                .post(self.endpoint.as_str(), payload)
                .map_err(|err| TrackerError::TransportFailure(err.to_string()))?;
            log::trace!("Server response: {}", response);
            Ok(())
        });
        if let Err(ref e) = result {
            log::warn!("Dispatch to {} failed, events kept: {}", self.endpoint, e);
        }
        result
    }

    fn clear(&self) {
        self.buffer.clear();
    }

    fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("endpoint", &self.endpoint.as_str())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::message::WirePayload;
    use crate::time::ManualClock;
    use crate::types::Tag;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        fail: AtomicBool,
        posts: Mutex<Vec<(String, String)>>,
    }

    impl Transport for Arc<RecordingTransport> {
        fn post(&self, uri: &str, body: &str) -> std::result::Result<String, TransportError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::new("connection refused"));
            }
            self.posts.lock().unwrap().push((uri.to_string(), body.to_string()));
            Ok("{}".to_string())
        }
    }

    fn record(tag: &str) -> EventRecord {
        EventRecord::new(Tag::new(tag).unwrap(), 5, EventKind::Volume { volume: 2 })
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(parse_endpoint("https://collector.example.com/event/").is_ok());
        assert!(parse_endpoint("http://localhost:8080").is_ok());

        for bad in ["", "not a url", "ftp://example.com/", "file:///tmp/events", "/event/"] {
            assert!(
                matches!(parse_endpoint(bad), Err(TrackerError::ConfigError(_))),
                "expected config error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_failed_post_keeps_buffer() {
        let transport = Arc::new(RecordingTransport::default());
        transport.fail.store(true, Ordering::SeqCst);
        let dispatcher = HttpDispatcher::with_transport(
            "http://collector.local/event/",
            Box::new(transport.clone()),
            Arc::new(ManualClock::new(100)),
        )
        .unwrap();

        dispatcher.submit(record("a"));
        dispatcher.submit(record("b"));

        let err = dispatcher.flush().unwrap_err();
        assert!(matches!(err, TrackerError::TransportFailure(_)));
        assert_eq!(dispatcher.pending(), 2);

        // Retry after the endpoint recovers
        transport.fail.store(false, Ordering::SeqCst);
        assert_eq!(dispatcher.flush().unwrap(), 2);
        assert_eq!(dispatcher.pending(), 0);

        let posts = transport.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "http://collector.local/event/");
        let payload: WirePayload = serde_json::from_str(&posts[0].1).unwrap();
        assert_eq!(payload.when_sent, 100);
        assert_eq!(payload.events.len(), 2);
        assert_eq!(payload.events[1].tag, "b");
    }
}

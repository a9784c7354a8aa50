//! Event buffer and wire payload
//!
//! The buffer collects fired events in submission order and turns them into
//! the JSON payload expected by the collection endpoint:
//!
//! ```text
//! {
//!   "events": [ { "tag": "...", "whenArised": 1700000000, "volume": 12 } ],
//!   "whenSent": 1700000100
//! }
//! ```
//!
//! The send timestamp lets the server shift client event times onto its own
//! clock.

use crate::event::EventRecord;
use crate::types::{Result, Timestamp};
use serde::{Deserialize, Serialize};

/// One event as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub tag: String,
    pub when_arised: Timestamp,
    /// Present only for volume and timing events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

/// A complete batch as posted to the collection endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
    pub events: Vec<WireEvent>,
    pub when_sent: Timestamp,
}

/// Ordered collection of fired events waiting to be sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBuffer {
    events: Vec<EventRecord>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fired event; insertion order is preserved
    pub fn add_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Build the wire payload stamped with `now` as the send time
    pub fn to_payload(&self, now: Timestamp) -> Result<WirePayload> {
        let events = self
            .events
            .iter()
            .map(EventRecord::to_wire)
            .collect::<Result<Vec<_>>>()?;
        Ok(WirePayload {
            events,
            when_sent: now,
        })
    }

    /// Serialize the buffer to indented JSON without modifying it
    pub fn serialize(&self, now: Timestamp) -> Result<String> {
        let payload = self.to_payload(now)?;
        Ok(serde_json::to_string_pretty(&payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::types::Tag;

    fn fired(tag: &str, volume: Option<u64>, at: Timestamp) -> EventRecord {
        let kind = match volume {
            Some(volume) => EventKind::Volume { volume },
            None => EventKind::Instant,
        };
        EventRecord::new(Tag::new(tag).unwrap(), at, kind)
    }

    #[test]
    fn test_payload_shape() {
        let mut buffer = EventBuffer::new();
        buffer.add_event(fired("open", None, 10));
        buffer.add_event(fired("purchase", Some(3), 11));

        let json = buffer.serialize(20).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["whenSent"], 20);
        assert_eq!(value["events"][0]["tag"], "open");
        assert_eq!(value["events"][0]["whenArised"], 10);
        assert!(value["events"][0].get("volume").is_none());
        assert_eq!(value["events"][1]["volume"], 3);
    }

    #[test]
    fn test_serialize_preserves_order_and_is_idempotent() {
        let mut buffer = EventBuffer::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            buffer.add_event(fired(name, None, i as Timestamp));
        }

        let first = buffer.to_payload(100).unwrap();
        let second = buffer.to_payload(200).unwrap();
        assert_eq!(first.events, second.events);
        assert_eq!(second.when_sent, 200);
        assert_eq!(buffer.len(), 3);

        let tags: Vec<_> = first.events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_buffer_serializes() {
        let buffer = EventBuffer::new();
        assert!(buffer.is_empty());
        let payload: WirePayload = serde_json::from_str(&buffer.serialize(7).unwrap()).unwrap();
        assert!(payload.events.is_empty());
        assert_eq!(payload.when_sent, 7);
    }
}

//! Node update event codec.
//!
//! # Wire Format
//! ```text
//! {"resource":"nodeUpdate","n":"node-1","nm":{"c":12.5,"r":40,"t":"2024-..."},"s":"video+a|video+b~video+c"}
//! ```
//!
//! # Design Decisions
//! - Field names are deliberately terse to keep each row small
//! - Zero/empty fields are omitted on encode and defaulted on decode
//! - Both stream lists share one string: `|` within a list, `~` between lists

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource name carried by node update events.
pub const NODE_UPDATE_RESOURCE: &str = "nodeUpdate";

const LIST_SEPARATOR: &str = "|";
const SECTION_SEPARATOR: &str = "~";

/// Errors raised while encoding stream lists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A stream ID contains one of the reserved separator characters.
    #[error("stream ID {0:?} contains a reserved separator ('|' or '~')")]
    ReservedSeparator(String),

    /// An empty stream ID cannot be told apart from an empty list.
    #[error("stream ID must not be empty")]
    EmptyStreamId,
}

/// Point-in-time resource snapshot published by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    #[serde(rename = "c", default, skip_serializing_if = "is_zero")]
    pub cpu_usage_percentage: f64,

    #[serde(rename = "r", default, skip_serializing_if = "is_zero")]
    pub ram_usage_percentage: f64,

    #[serde(rename = "b", default, skip_serializing_if = "is_zero")]
    pub bandwidth_usage_percentage: f64,

    #[serde(rename = "l", default, skip_serializing_if = "is_zero")]
    pub load_avg: f64,

    #[serde(rename = "la", default, skip_serializing_if = "is_zero")]
    pub geo_latitude: f64,

    #[serde(rename = "lo", default, skip_serializing_if = "is_zero")]
    pub geo_longitude: f64,

    /// When the publishing node observed these values.
    #[serde(rename = "t", default = "unix_epoch")]
    pub timestamp: DateTime<Utc>,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            cpu_usage_percentage: 0.0,
            ram_usage_percentage: 0.0,
            bandwidth_usage_percentage: 0.0,
            load_avg: 0.0,
            geo_latitude: 0.0,
            geo_longitude: 0.0,
            timestamp: unix_epoch(),
        }
    }
}

/// The record a node writes into the shared stats store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdateEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,

    #[serde(rename = "n", default, skip_serializing_if = "String::is_empty")]
    pub node_id: String,

    #[serde(rename = "nm", default)]
    pub node_metrics: NodeMetrics,

    #[serde(rename = "s", default, skip_serializing_if = "String::is_empty")]
    pub streams: String,
}

impl NodeUpdateEvent {
    /// Create an event for `node_id` carrying `metrics` and no streams.
    pub fn new(node_id: impl Into<String>, metrics: NodeMetrics) -> Self {
        Self {
            resource: NODE_UPDATE_RESOURCE.to_string(),
            node_id: node_id.into(),
            node_metrics: metrics,
            streams: String::new(),
        }
    }

    /// Encode both stream lists into the compact `a|b~x|y` form.
    ///
    /// Leaves the event untouched when any ID is rejected.
    pub fn set_streams<S: AsRef<str>>(
        &mut self,
        stream_ids: &[S],
        ingest_stream_ids: &[S],
    ) -> Result<(), CodecError> {
        for id in stream_ids.iter().chain(ingest_stream_ids) {
            validate_stream_id(id.as_ref())?;
        }
        self.streams = format!(
            "{}{}{}",
            join(stream_ids),
            SECTION_SEPARATOR,
            join(ingest_stream_ids)
        );
        Ok(())
    }

    /// Playback stream IDs, the part before `~`.
    pub fn get_streams(&self) -> Vec<String> {
        let (before, _) = self.sections();
        split(before)
    }

    /// Ingest stream IDs, the part after `~`.
    pub fn get_ingest_streams(&self) -> Vec<String> {
        let (_, after) = self.sections();
        split(after)
    }

    /// Serialize to the JSON blob stored per row.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a stored JSON blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    fn sections(&self) -> (&str, &str) {
        self.streams
            .split_once(SECTION_SEPARATOR)
            .unwrap_or((self.streams.as_str(), ""))
    }
}

fn validate_stream_id(id: &str) -> Result<(), CodecError> {
    if id.is_empty() {
        return Err(CodecError::EmptyStreamId);
    }
    if id.contains(LIST_SEPARATOR) || id.contains(SECTION_SEPARATOR) {
        return Err(CodecError::ReservedSeparator(id.to_string()));
    }
    Ok(())
}

fn join<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn split(section: &str) -> Vec<String> {
    if section.is_empty() {
        return Vec::new();
    }
    section.split(LIST_SEPARATOR).map(str::to_string).collect()
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(streams: &[&str], ingest: &[&str]) {
        let mut event = NodeUpdateEvent::default();
        event.set_streams(streams, ingest).unwrap();
        assert_eq!(event.get_streams(), streams);
        assert_eq!(event.get_ingest_streams(), ingest);
    }

    #[test]
    fn test_stream_roundtrip() {
        roundtrip(&["video+abc", "video+def", "vod+ghi"], &["video+xyz"]);
        roundtrip(&["video+abc"], &[]);
        roundtrip(&[], &["video+xyz", "video+123"]);
        roundtrip(&[], &[]);
    }

    proptest::proptest! {
        #[test]
        fn prop_stream_lists_roundtrip(
            streams in proptest::collection::vec("[^|~]+", 0..8),
            ingest in proptest::collection::vec("[^|~]+", 0..8),
        ) {
            let mut event = NodeUpdateEvent::new("node-a", NodeMetrics::default());
            event.set_streams(&streams, &ingest).unwrap();
            proptest::prop_assert_eq!(event.get_streams(), streams.clone());
            proptest::prop_assert_eq!(event.get_ingest_streams(), ingest.clone());

            let decoded = NodeUpdateEvent::from_bytes(&event.to_bytes().unwrap()).unwrap();
            proptest::prop_assert_eq!(decoded.get_streams(), streams);
            proptest::prop_assert_eq!(decoded.get_ingest_streams(), ingest);
        }
    }

    #[test]
    fn test_encoded_form() {
        let mut event = NodeUpdateEvent::default();
        event.set_streams(&["a", "b", "c"], &["x", "y"]).unwrap();
        assert_eq!(event.streams, "a|b|c~x|y");

        event.set_streams::<&str>(&[], &[]).unwrap();
        assert_eq!(event.streams, "~");
    }

    #[test]
    fn test_empty_string_decodes_to_empty_lists() {
        let event = NodeUpdateEvent::default();
        assert!(event.get_streams().is_empty());
        assert!(event.get_ingest_streams().is_empty());

        // Older writers may omit the section separator entirely.
        let event = NodeUpdateEvent {
            streams: "a|b".to_string(),
            ..Default::default()
        };
        assert_eq!(event.get_streams(), vec!["a", "b"]);
        assert!(event.get_ingest_streams().is_empty());
    }

    #[test]
    fn test_rejects_reserved_characters() {
        let mut event = NodeUpdateEvent::default();
        event.set_streams(&["ok"], &["ok"]).unwrap();

        let err = event.set_streams(&["bad|id"], &[]).unwrap_err();
        assert_eq!(err, CodecError::ReservedSeparator("bad|id".to_string()));

        let err = event.set_streams(&["ok"], &["bad~id"]).unwrap_err();
        assert_eq!(err, CodecError::ReservedSeparator("bad~id".to_string()));

        assert_eq!(event.set_streams(&[""], &[]), Err(CodecError::EmptyStreamId));

        // Rejected input keeps the previous encoding.
        assert_eq!(event.streams, "ok~ok");
    }

    #[test]
    fn test_json_uses_short_field_names() {
        let ts: DateTime<Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        let mut event = NodeUpdateEvent::new(
            "node-1",
            NodeMetrics {
                cpu_usage_percentage: 12.5,
                ram_usage_percentage: 40.0,
                geo_latitude: 51.5,
                timestamp: ts,
                ..Default::default()
            },
        );
        event.set_streams(&["video+a"], &[]).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();
        assert_eq!(json["resource"], "nodeUpdate");
        assert_eq!(json["n"], "node-1");
        assert_eq!(json["s"], "video+a~");
        assert_eq!(json["nm"]["c"], 12.5);
        assert_eq!(json["nm"]["la"], 51.5);
        // Zero values are omitted.
        assert!(json["nm"].get("b").is_none());
        assert!(json["nm"].get("lo").is_none());

        let decoded = NodeUpdateEvent::from_bytes(&event.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_minimal_row() {
        let event = NodeUpdateEvent::from_bytes(br#"{"n":"node-2"}"#).unwrap();
        assert_eq!(event.node_id, "node-2");
        assert_eq!(event.node_metrics.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert!(event.get_streams().is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(NodeUpdateEvent::from_bytes(b"not json").is_err());
    }
}

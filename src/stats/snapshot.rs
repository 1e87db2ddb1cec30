//! Per-node stream and metric snapshots.
//!
//! # Data Flow
//! ```text
//! store rows (JSON blobs)
//!     → decode NodeUpdateEvent (any failure aborts the whole snapshot)
//!     → keep the newest event per node
//!     → stale metrics: keep ingest streams only
//!     → Stats { streams, ingest_streams, node_metrics }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::stats::event::{NodeMetrics, NodeUpdateEvent};
use crate::stats::store::StoreError;

/// One stream seen on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Full stream name, possibly prefixed (`video+abc`).
    pub id: String,
    /// Bare playback ID (`abc`).
    pub playback_id: String,
    /// When the owning node last reported the stream.
    pub timestamp: DateTime<Utc>,
}

/// Stream key -> Stream.
pub type Streams = HashMap<String, Stream>;

/// Request-local view of the fleet, keyed by node name.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Playback streams, keyed by playback ID. Includes ingest streams.
    pub streams: HashMap<String, Streams>,
    /// Ingest streams, keyed by full stream ID.
    pub ingest_streams: HashMap<String, Streams>,
    pub node_metrics: HashMap<String, NodeMetrics>,
}

impl Stats {
    /// Build a snapshot from raw store rows.
    ///
    /// Stream timestamps inherit the metrics timestamp of the event that
    /// carried them. When a node's newest event has stale metrics, its
    /// metrics and playback streams are dropped but its ingest streams are
    /// kept, so an ingest lookup can tell "stale" apart from "missing".
    pub fn from_rows(
        rows: &[Vec<u8>],
        metric_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let mut newest: HashMap<String, NodeUpdateEvent> = HashMap::new();
        for row in rows {
            let event = NodeUpdateEvent::from_bytes(row)?;
            let is_newer = newest
                .get(&event.node_id)
                .map_or(true, |e| e.node_metrics.timestamp <= event.node_metrics.timestamp);
            if is_newer {
                newest.insert(event.node_id.clone(), event);
            }
        }

        let mut stats = Stats::default();
        for event in newest.into_values() {
            let timestamp = event.node_metrics.timestamp;
            if is_stale(timestamp, metric_timeout, now) {
                tracing::debug!(
                    node = %event.node_id,
                    timestamp = %timestamp,
                    "Skipping stale node stats while refreshing"
                );
                stats.insert_ingest_only(event);
            } else {
                stats.insert_event(event);
            }
        }

        Ok(stats)
    }

    fn insert_event(&mut self, event: NodeUpdateEvent) {
        let timestamp = event.node_metrics.timestamp;
        let mut streams = Streams::new();
        let mut ingest_streams = Streams::new();

        for id in event.get_streams() {
            let stream = Stream::new(id, timestamp);
            streams.insert(stream.playback_id.clone(), stream);
        }
        for id in event.get_ingest_streams() {
            let stream = Stream::new(id, timestamp);
            streams.insert(stream.playback_id.clone(), stream.clone());
            ingest_streams.insert(stream.id.clone(), stream);
        }

        self.streams.insert(event.node_id.clone(), streams);
        self.ingest_streams.insert(event.node_id.clone(), ingest_streams);
        self.node_metrics.insert(event.node_id, event.node_metrics);
    }

    fn insert_ingest_only(&mut self, event: NodeUpdateEvent) {
        let timestamp = event.node_metrics.timestamp;
        let ingest_streams: Streams = event
            .get_ingest_streams()
            .into_iter()
            .map(|id| {
                let stream = Stream::new(id, timestamp);
                (stream.id.clone(), stream)
            })
            .collect();
        self.ingest_streams.insert(event.node_id, ingest_streams);
    }
}

impl Stream {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            playback_id: playback_id(&id).to_string(),
            id,
            timestamp,
        }
    }
}

/// Strip an optional `prefix+` from a stream name.
///
/// Names with no `+`, or more than one, are returned unchanged.
pub fn playback_id(stream_id: &str) -> &str {
    match stream_id.split_once('+') {
        Some((_, rest)) if !rest.contains('+') => rest,
        _ => stream_id,
    }
}

/// True once `now - timestamp >= timeout`.
pub fn is_stale(timestamp: DateTime<Utc>, timeout: Duration, now: DateTime<Utc>) -> bool {
    match TimeDelta::from_std(timeout) {
        Ok(timeout) => now.signed_duration_since(timestamp) >= timeout,
        // Larger than chrono can represent: nothing is ever that old.
        Err(_) => false,
    }
}

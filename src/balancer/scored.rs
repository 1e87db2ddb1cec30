//! Per-request scored candidates.
//!
//! All component scores are in the range 0-2, where:
//! - 2 = Good
//! - 1 = Okay
//! - 0 = Bad

use std::fmt;

use crate::cluster::Node;
use crate::stats::{NodeMetrics, Streams};

/// Any resource above this percentage marks the node overloaded.
pub const OVERLOADED_PERCENT: f64 = 85.0;
/// Any resource above this percentage marks the node busy.
pub const BUSY_PERCENT: f64 = 50.0;

/// A node annotated with scores for one request. Discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub score: i64,
    pub geo_score: i64,
    pub stream_score: i64,
    /// Kilometres from the requester.
    pub geo_distance: f64,
    pub node: Node,
    /// Non-stale playback streams, keyed by playback ID.
    pub streams: Streams,
    pub metrics: NodeMetrics,
}

impl ScoredNode {
    /// A candidate with all scores zeroed.
    pub fn new(node: Node, streams: Streams, metrics: NodeMetrics) -> Self {
        Self {
            score: 0,
            geo_score: 0,
            stream_score: 0,
            geo_distance: 0.0,
            node,
            streams,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// True if the node is currently serving `playback_id`.
    pub fn has_stream(&self, playback_id: &str) -> bool {
        self.streams.contains_key(playback_id)
    }

    /// 0 when overloaded, 1 when busy, 2 otherwise.
    pub fn load_score(&self) -> i64 {
        let m = &self.metrics;
        let usage = [
            m.cpu_usage_percentage,
            m.ram_usage_percentage,
            m.bandwidth_usage_percentage,
        ];
        if usage.iter().any(|&u| u > OVERLOADED_PERCENT) {
            return 0;
        }
        if usage.iter().any(|&u| u > BUSY_PERCENT) {
            return 1;
        }
        2
    }
}

impl fmt::Display for ScoredNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Name:{} Score:{} GeoScore:{} StreamScore:{} GeoDistance:{:.2} Lat:{:.2} Lon:{:.2} CPU:{:.2} RAM:{:.2} BW:{:.2})",
            self.node.name,
            self.score,
            self.geo_score,
            self.stream_score,
            self.geo_distance,
            self.metrics.geo_latitude,
            self.metrics.geo_longitude,
            self.metrics.cpu_usage_percentage,
            self.metrics.ram_usage_percentage,
            self.metrics.bandwidth_usage_percentage,
        )
    }
}

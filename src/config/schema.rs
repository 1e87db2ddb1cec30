//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::cluster::Member;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatalystConfig {
    /// Identity of this instance.
    pub node: NodeConfig,

    /// Selection and staleness settings.
    pub balancer: BalancerConfig,

    /// Shared node stats store.
    pub stats_store: StatsStoreConfig,

    /// Static cluster members, for setups without a membership provider.
    pub members: Vec<Member>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Identity of this instance.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Cluster member name; returned when no other node qualifies.
    pub name: String,
}

/// Balancer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Node metrics (and playback streams) older than this are ignored.
    pub metric_timeout_secs: u64,

    /// Ingest streams older than this are ignored.
    pub ingest_stream_timeout_secs: u64,

    /// Optional bound on each stats store query, in milliseconds.
    pub query_timeout_ms: Option<u64>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            metric_timeout_secs: 16,
            ingest_stream_timeout_secs: 20,
            query_timeout_ms: None,
        }
    }
}

/// Node stats store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsStoreConfig {
    /// PostgreSQL connection URL. Unset disables the store.
    pub url: Option<String>,

    /// Table holding one row per node.
    pub table: String,

    /// JSON column holding the encoded node update event.
    pub column: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Connection acquire timeout in seconds.
    pub acquire_timeout_secs: u64,

    /// How often this node publishes its own stats, in seconds.
    pub publish_interval_secs: u64,
}

impl Default for StatsStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: "node_stats".to_string(),
            column: "stats".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            publish_interval_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

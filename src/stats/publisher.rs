//! Periodic publication of this node's own stats.
//!
//! # Responsibilities
//! - Collect local metrics and stream lists
//! - Encode them as a `NodeUpdateEvent`
//! - Write the event into the shared store on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::stats::event::{CodecError, NodeMetrics, NodeUpdateEvent};
use crate::stats::store::{NodeStatsStore, StoreError};

/// Default publish interval.
pub const UPDATE_NODE_STATS_EVERY: Duration = Duration::from_secs(5);

/// What this node is doing right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalNodeState {
    /// Timestamp is overwritten at publish time.
    pub metrics: NodeMetrics,
    pub streams: Vec<String>,
    pub ingest_streams: Vec<String>,
}

/// Source of the local node's state (system probes, media server API, ...).
#[async_trait]
pub trait LocalStateSource: Send + Sync {
    async fn collect(&self) -> Result<LocalNodeState, PublishError>;
}

/// Fixed state, for nodes whose load is reported out of band.
#[derive(Debug, Clone, Default)]
pub struct StaticStateSource(pub LocalNodeState);

#[async_trait]
impl LocalStateSource for StaticStateSource {
    async fn collect(&self) -> Result<LocalNodeState, PublishError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to collect local node state: {0}")]
    Collect(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("failed to encode node update event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Writes this node's `NodeUpdateEvent` into the shared store.
pub struct NodeStatsPublisher {
    node_name: String,
    source: Arc<dyn LocalStateSource>,
    store: Arc<dyn NodeStatsStore>,
    interval: Duration,
}

impl NodeStatsPublisher {
    /// A zero `interval` falls back to `UPDATE_NODE_STATS_EVERY`.
    pub fn new(
        node_name: impl Into<String>,
        source: Arc<dyn LocalStateSource>,
        store: Arc<dyn NodeStatsStore>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                default = ?UPDATE_NODE_STATS_EVERY,
                "Zero publish interval, using the default"
            );
            UPDATE_NODE_STATS_EVERY
        } else {
            interval
        };
        Self {
            node_name: node_name.into(),
            source,
            store,
            interval,
        }
    }

    /// Collect, encode and publish once.
    pub async fn publish_once(&self) -> Result<NodeUpdateEvent, PublishError> {
        let state = self.source.collect().await?;

        let mut node_metrics = state.metrics;
        node_metrics.timestamp = Utc::now();

        let mut event = NodeUpdateEvent::new(self.node_name.clone(), node_metrics);
        event.set_streams(&state.streams, &state.ingest_streams)?;

        self.store.publish(&self.node_name, event.to_bytes()?).await?;

        tracing::trace!(
            node = %self.node_name,
            streams = state.streams.len(),
            ingest_streams = state.ingest_streams.len(),
            "Published node stats"
        );
        Ok(event)
    }

    /// Publish every interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            node = %self.node_name,
            interval = ?self.interval,
            "Node stats publisher starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.publish_once().await {
                        Ok(_) => metrics::record_publish(true),
                        Err(e) => {
                            metrics::record_publish(false);
                            tracing::warn!(node = %self.node_name, error = %e, "Failed to publish node stats");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Node stats publisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

//! Shared fixtures for balancer integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalyst_balancer::cluster::member::{DTSC_TAG, MEDIA_NODE, NODE_TAG};
use catalyst_balancer::cluster::Member;
use catalyst_balancer::stats::{MemoryStatsStore, NodeMetrics, NodeStatsStore, NodeUpdateEvent, StoreError};
use catalyst_balancer::CataBalancer;
use chrono::{TimeDelta, Utc};

pub const LONDON: (f64, f64) = (51.5074, -0.1278);
pub const PARIS: (f64, f64) = (48.8566, 2.3522);
pub const NEW_YORK: (f64, f64) = (40.7128, -74.0060);

/// A media member with the usual tags.
pub fn media_member(name: &str) -> Member {
    Member::new(name)
        .with_tag(NODE_TAG, MEDIA_NODE)
        .with_tag(DTSC_TAG, format!("dtsc://{name}"))
}

/// Builder for one row in the stats store.
pub struct RowBuilder {
    node: String,
    metrics: NodeMetrics,
    age: Duration,
    streams: Vec<String>,
    ingest_streams: Vec<String>,
}

pub fn row(node: &str) -> RowBuilder {
    RowBuilder {
        node: node.to_string(),
        metrics: NodeMetrics::default(),
        age: Duration::ZERO,
        streams: Vec::new(),
        ingest_streams: Vec::new(),
    }
}

#[allow(dead_code)]
impl RowBuilder {
    pub fn at(mut self, (lat, lon): (f64, f64)) -> Self {
        self.metrics.geo_latitude = lat;
        self.metrics.geo_longitude = lon;
        self
    }

    pub fn cpu(mut self, percent: f64) -> Self {
        self.metrics.cpu_usage_percentage = percent;
        self
    }

    pub fn aged(mut self, age: Duration) -> Self {
        self.age = age;
        self
    }

    pub fn stream(mut self, id: &str) -> Self {
        self.streams.push(id.to_string());
        self
    }

    pub fn ingest(mut self, id: &str) -> Self {
        self.ingest_streams.push(id.to_string());
        self
    }

    pub fn insert_into(self, store: &MemoryStatsStore) {
        let mut metrics = self.metrics;
        metrics.timestamp = Utc::now() - TimeDelta::from_std(self.age).unwrap();
        let mut event = NodeUpdateEvent::new(self.node.clone(), metrics);
        event
            .set_streams(&self.streams, &self.ingest_streams)
            .unwrap();
        store.insert_row(&self.node, event.to_bytes().unwrap());
    }
}

/// Balancer named `name` over `store`, 16s metric / 20s ingest timeouts.
pub fn balancer(name: &str, store: Arc<MemoryStatsStore>) -> CataBalancer {
    CataBalancer::new(
        name,
        Duration::from_secs(16),
        Duration::from_secs(20),
        Some(store as Arc<dyn NodeStatsStore>),
    )
}

/// Store that answers only after `delay`.
#[allow(dead_code)]
pub struct SlowStore {
    pub inner: MemoryStatsStore,
    pub delay: Duration,
}

#[async_trait]
impl NodeStatsStore for SlowStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_all().await
    }

    async fn publish(&self, node_id: &str, stats: Vec<u8>) -> Result<(), StoreError> {
        self.inner.publish(node_id, stats).await
    }
}

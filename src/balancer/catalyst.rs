//! Catalyst balancer: stats-store backed node selection.
//!
//! # Responsibilities
//! - Keep the node registry in sync with cluster membership
//! - Rebuild the fleet snapshot from the stats store per request
//! - Score registered nodes and pick one for playback
//! - Locate the node holding an ingest stream

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::balancer::error::{BalancerError, BalancerResult};
use crate::balancer::scored::ScoredNode;
use crate::balancer::selection::select_node;
use crate::balancer::{Balancer, PlaybackRequest};
use crate::cluster::{Member, NodeRegistry};
use crate::config::BalancerConfig;
use crate::observability::metrics;
use crate::stats::snapshot::{is_stale, Stats, Streams};
use crate::stats::store::{NodeStatsStore, StoreError};

/// Prefix used for redirect stream names when the caller supplies none.
pub const DEFAULT_REDIRECT_PREFIX: &str = "video";

/// Balancer backed by the shared node stats store.
pub struct CataBalancer {
    /// Name of this instance, chosen when no other node qualifies.
    node_name: String,
    registry: NodeRegistry,
    metric_timeout: Duration,
    ingest_stream_timeout: Duration,
    query_timeout: Option<Duration>,
    store: Option<Arc<dyn NodeStatsStore>>,
    rng: Mutex<StdRng>,
}

impl CataBalancer {
    /// Create a balancer. Without a store every refresh fails.
    pub fn new(
        node_name: impl Into<String>,
        metric_timeout: Duration,
        ingest_stream_timeout: Duration,
        store: Option<Arc<dyn NodeStatsStore>>,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            registry: NodeRegistry::new(),
            metric_timeout,
            ingest_stream_timeout,
            query_timeout: None,
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a balancer from the `[balancer]` config section.
    pub fn from_config(
        node_name: impl Into<String>,
        config: &BalancerConfig,
        store: Option<Arc<dyn NodeStatsStore>>,
    ) -> Self {
        Self::new(
            node_name,
            Duration::from_secs(config.metric_timeout_secs),
            Duration::from_secs(config.ingest_stream_timeout_secs),
            store,
        )
        .with_query_timeout(config.query_timeout_ms.map(Duration::from_millis))
    }

    /// Bound every store query. `None` leaves timeouts to the caller.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Seed the tie-breaking RNG, making selection reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Read and decode every row in the stats store.
    ///
    /// Any query or decode failure fails the whole refresh.
    pub async fn refresh_nodes(&self, cancel: &CancellationToken) -> BalancerResult<Stats> {
        let started = Instant::now();
        let result = self.refresh_inner(cancel).await;
        metrics::record_refresh(result.is_ok(), started);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Failed to refresh node stats");
        }
        result
    }

    async fn refresh_inner(&self, cancel: &CancellationToken) -> BalancerResult<Stats> {
        if cancel.is_cancelled() {
            return Err(BalancerError::Cancelled);
        }
        let store = self.store.as_ref().ok_or(StoreError::Unavailable)?;

        tracing::trace!("Refreshing node stats");
        let query = async {
            match self.query_timeout {
                Some(limit) => match time::timeout(limit, store.fetch_all()).await {
                    Ok(rows) => rows,
                    Err(_) => Err(StoreError::Timeout(limit)),
                },
                None => store.fetch_all().await,
            }
        };

        let rows = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BalancerError::Cancelled),
            rows = query => rows?,
        };

        Ok(Stats::from_rows(&rows, self.metric_timeout, Utc::now())?)
    }

    /// Build candidates from registered nodes with fresh metrics.
    ///
    /// Nodes that appear only in the stats store are never candidates.
    pub fn create_scored_nodes(&self, stats: &Stats, now: DateTime<Utc>) -> Vec<ScoredNode> {
        self.registry.with_nodes(|nodes| {
            let mut scored = Vec::with_capacity(nodes.len());
            for (name, node) in nodes {
                let Some(node_metrics) = stats.node_metrics.get(name) else {
                    continue;
                };
                if is_stale(node_metrics.timestamp, self.metric_timeout, now) {
                    tracing::debug!(
                        node = %name,
                        timestamp = %node_metrics.timestamp,
                        "Ignoring node with stale metrics"
                    );
                    continue;
                }

                let streams = fresh_streams(stats.streams.get(name), self.metric_timeout, now);
                scored.push(ScoredNode::new(
                    node.clone(),
                    streams,
                    node_metrics.clone(),
                ));
            }
            scored
        })
    }

    fn choose(&self, nodes: Vec<ScoredNode>, playback_id: &str, lat: f64, lon: f64) -> BalancerResult<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        select_node(nodes, playback_id, lat, lon, &mut *rng).map(|node| node.name)
    }
}

#[async_trait]
impl Balancer for CataBalancer {
    async fn start(&self) -> BalancerResult<()> {
        tracing::info!(
            node = %self.node_name,
            metric_timeout = ?self.metric_timeout,
            ingest_stream_timeout = ?self.ingest_stream_timeout,
            query_timeout = ?self.query_timeout,
            "Catalyst balancer started"
        );
        Ok(())
    }

    async fn update_members(&self, members: &[Member]) -> BalancerResult<()> {
        let kept = self.registry.update_members(members);
        metrics::record_registry_size(kept);
        Ok(())
    }

    async fn get_best_node(
        &self,
        cancel: &CancellationToken,
        request: &PlaybackRequest,
    ) -> BalancerResult<(String, String)> {
        let lat = parse_coordinate("latitude", &request.lat)?;
        let lon = parse_coordinate("longitude", &request.lon)?;

        let stats = self.refresh_nodes(cancel).await?;
        let scored = self.create_scored_nodes(&stats, Utc::now());
        metrics::record_candidates(scored.len());

        let node_name = if scored.is_empty() {
            tracing::info!(
                chosen = %self.node_name,
                stream = %request.playback_id,
                lat = %request.lat,
                lon = %request.lon,
                "No nodes found, choosing myself"
            );
            metrics::record_self_selection();
            self.node_name.clone()
        } else {
            self.choose(scored, &request.playback_id, lat, lon)?
        };

        let prefix = request
            .redirect_prefixes
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_PREFIX);
        Ok((node_name, format!("{}+{}", prefix, request.playback_id)))
    }

    async fn mist_util_load_source(
        &self,
        cancel: &CancellationToken,
        stream_id: &str,
        _lat: &str,
        _lon: &str,
    ) -> BalancerResult<String> {
        let stats = self.refresh_nodes(cancel).await?;
        let now = Utc::now();

        let mut found_stale = false;
        let holder = self.registry.with_nodes(|nodes| {
            let mut best: Option<(&str, DateTime<Utc>)> = None;
            for name in nodes.keys() {
                let Some(stream) = stats.ingest_streams.get(name).and_then(|s| s.get(stream_id)) else {
                    continue;
                };
                if is_stale(stream.timestamp, self.ingest_stream_timeout, now) {
                    found_stale = true;
                    continue;
                }
                if best.map_or(true, |(_, ts)| stream.timestamp > ts) {
                    best = Some((name.as_str(), stream.timestamp));
                }
            }
            best.map(|(name, _)| name.to_string())
        });

        match holder {
            Some(name) => {
                let dtsc = format!("dtsc://{name}");
                tracing::debug!(dtsc = %dtsc, node = %name, stream = %stream_id, "Found ingest node");
                Ok(dtsc)
            }
            None => Err(BalancerError::IngestStreamNotFound {
                stream_id: stream_id.to_string(),
                stale: found_stale,
            }),
        }
    }
}

/// Empty string means "unknown" and maps to 0.0.
fn parse_coordinate(axis: &'static str, value: &str) -> BalancerResult<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value
        .parse::<f64>()
        .map_err(|source| BalancerError::InvalidCoordinate {
            axis,
            value: value.to_string(),
            source,
        })
}

fn fresh_streams(streams: Option<&Streams>, timeout: Duration, now: DateTime<Utc>) -> Streams {
    streams
        .into_iter()
        .flatten()
        .filter(|(_, s)| !is_stale(s.timestamp, timeout, now))
        .map(|(k, s)| (k.clone(), s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::event::{NodeMetrics, NodeUpdateEvent};
    use crate::stats::store::MemoryStatsStore;
    use chrono::TimeDelta;

    const METRIC_TIMEOUT: Duration = Duration::from_secs(30);
    const INGEST_TIMEOUT: Duration = Duration::from_secs(10);

    fn media(name: &str) -> Member {
        Member::new(name).with_tag("node", "media")
    }

    fn publish(store: &MemoryStatsStore, node: &str, age_secs: i64, streams: &[&str], ingest: &[&str]) {
        let mut event = NodeUpdateEvent::new(
            node,
            NodeMetrics {
                cpu_usage_percentage: 10.0,
                timestamp: Utc::now() - TimeDelta::seconds(age_secs),
                ..Default::default()
            },
        );
        event.set_streams(streams, ingest).unwrap();
        store.insert_row(node, event.to_bytes().unwrap());
    }

    fn balancer(store: Arc<MemoryStatsStore>) -> CataBalancer {
        CataBalancer::new("me", METRIC_TIMEOUT, INGEST_TIMEOUT, Some(store)).with_seed(1)
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("latitude", "").unwrap(), 0.0);
        assert_eq!(parse_coordinate("latitude", "51.5").unwrap(), 51.5);
        assert_eq!(parse_coordinate("longitude", "-0.12").unwrap(), -0.12);
        assert!(matches!(
            parse_coordinate("latitude", "not-a-number"),
            Err(BalancerError::InvalidCoordinate { axis: "latitude", .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_store_fails() {
        let bal = CataBalancer::new("me", METRIC_TIMEOUT, INGEST_TIMEOUT, None);
        let err = bal.refresh_nodes(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, BalancerError::Refresh(StoreError::Unavailable)));
    }

    #[tokio::test]
    async fn test_refresh_honours_cancellation() {
        let store = Arc::new(MemoryStatsStore::new());
        let bal = balancer(store);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bal.refresh_nodes(&cancel).await.unwrap_err();
        assert!(matches!(err, BalancerError::Cancelled));
    }

    #[tokio::test]
    async fn test_create_scored_nodes_only_registered_and_fresh() {
        let store = Arc::new(MemoryStatsStore::new());
        publish(&store, "a", 1, &["video+one"], &[]);
        publish(&store, "b", 1, &[], &[]);
        publish(&store, "ghost", 1, &["video+one"], &[]);

        let bal = balancer(store);
        bal.update_members(&[media("a"), media("b"), media("no-stats")])
            .await
            .unwrap();

        let stats = bal.refresh_nodes(&CancellationToken::new()).await.unwrap();
        let mut scored = bal.create_scored_nodes(&stats, Utc::now());
        scored.sort_by(|x, y| x.node.name.cmp(&y.node.name));

        let names: Vec<&str> = scored.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(scored[0].has_stream("one"));
    }

    #[tokio::test]
    async fn test_stale_ingest_on_a_fresh_node() {
        let store = Arc::new(MemoryStatsStore::new());
        // Fresh for metrics (30s) but stale for ingest (10s).
        publish(&store, "a", 15, &[], &["video+live"]);

        let bal = balancer(store);
        bal.update_members(&[media("a")]).await.unwrap();
        let stats = bal.refresh_nodes(&CancellationToken::new()).await.unwrap();
        let scored = bal.create_scored_nodes(&stats, Utc::now());
        assert_eq!(scored.len(), 1);
        assert!(scored[0].has_stream("live"));

        let err = bal
            .mist_util_load_source(&CancellationToken::new(), "video+live", "", "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BalancerError::IngestStreamNotFound { stale: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_ingest_on_a_stale_node() {
        let store = Arc::new(MemoryStatsStore::new());
        publish(&store, "a", 45, &[], &["video+live"]);

        let bal = balancer(store);
        bal.update_members(&[media("a")]).await.unwrap();
        let stats = bal.refresh_nodes(&CancellationToken::new()).await.unwrap();
        assert!(bal.create_scored_nodes(&stats, Utc::now()).is_empty());

        let err = bal
            .mist_util_load_source(&CancellationToken::new(), "video+live", "", "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BalancerError::IngestStreamNotFound { stale: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_best_node_stream_name_prefix() {
        let bal = balancer(Arc::new(MemoryStatsStore::new()));
        let cancel = CancellationToken::new();

        let mut request = PlaybackRequest::new("abc");
        let (node, stream) = bal.get_best_node(&cancel, &request).await.unwrap();
        assert_eq!(node, "me");
        assert_eq!(stream, "video+abc");

        request.redirect_prefixes = vec!["vod".into(), "video".into()];
        let (_, stream) = bal.get_best_node(&cancel, &request).await.unwrap();
        assert_eq!(stream, "vod+abc");
    }

    #[tokio::test]
    async fn test_load_source_prefers_fresh_copy() {
        let store = Arc::new(MemoryStatsStore::new());
        publish(&store, "old", 20, &[], &["video+live"]);
        publish(&store, "new", 1, &[], &["video+live"]);

        let bal = balancer(store);
        bal.update_members(&[media("old"), media("new")]).await.unwrap();
        let dtsc = bal
            .mist_util_load_source(&CancellationToken::new(), "video+live", "", "")
            .await
            .unwrap();
        assert_eq!(dtsc, "dtsc://new");
    }

    #[tokio::test]
    async fn test_load_source_not_found() {
        let store = Arc::new(MemoryStatsStore::new());
        publish(&store, "a", 1, &["video+live"], &[]);

        let bal = balancer(store);
        bal.update_members(&[media("a")]).await.unwrap();
        let err = bal
            .mist_util_load_source(&CancellationToken::new(), "video+live", "", "")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BalancerError::IngestStreamNotFound { stale: false, .. }
        ));
    }
}

//! Component construction from validated configuration.
//!
//! # Responsibilities
//! - Open the stats store when a URL is configured
//! - Build the balancer and seed it with the static member list

use std::sync::Arc;

use crate::balancer::CataBalancer;
use crate::config::{CatalystConfig, StatsStoreConfig};
use crate::stats::{NodeStatsStore, PgStatsStore, StoreError};

/// Open the configured store, if any.
pub fn build_store(
    config: &StatsStoreConfig,
) -> Result<Option<Arc<dyn NodeStatsStore>>, StoreError> {
    match config.url.as_deref() {
        Some(url) => {
            let store = PgStatsStore::from_config(config, url)?;
            tracing::info!(table = %config.table, "Stats store configured");
            Ok(Some(Arc::new(store)))
        }
        None => {
            tracing::warn!("No stats store configured, balancing requests will fail");
            Ok(None)
        }
    }
}

/// Build the balancer for this node.
pub fn build_balancer(
    config: &CatalystConfig,
    store: Option<Arc<dyn NodeStatsStore>>,
) -> CataBalancer {
    let balancer = CataBalancer::from_config(&config.node.name, &config.balancer, store);
    let count = balancer.registry().update_members(&config.members);
    tracing::info!(
        node = %config.node.name,
        media_nodes = count,
        "Balancer initialized"
    );
    balancer
}

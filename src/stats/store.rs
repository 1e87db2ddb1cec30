//! Shared node stats store.
//!
//! # Responsibilities
//! - Return every stored `NodeUpdateEvent` blob on request
//! - Accept this node's own blob from the publisher
//!
//! # Design Decisions
//! - Rows are opaque bytes; decoding happens in `snapshot.rs`
//! - One row per published update per node; readers do not rely on dedupe
//! - PostgreSQL via sqlx for the shared deployment, in-memory for tests

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::StatsStoreConfig;

/// Errors that can occur while reading or writing node stats.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backing store was configured for this balancer.
    #[error("node stats store not configured")]
    Unavailable,

    /// The store query itself failed.
    #[error("failed to query node stats: {0}")]
    Query(String),

    /// A row could not be decoded into a node update event.
    #[error("failed to decode node update event: {0}")]
    Decode(#[from] serde_json::Error),

    /// The store did not answer within the configured query timeout.
    #[error("node stats query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// A queryable table of serialized node update events.
#[async_trait]
pub trait NodeStatsStore: Send + Sync {
    /// Return the blob of every stored row.
    async fn fetch_all(&self) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Store `stats` as the latest row for `node_id`.
    async fn publish(&self, node_id: &str, stats: Vec<u8>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct StatsRow {
    node_id: String,
    stats: Vec<u8>,
}

/// Process-local store, used by tests and single-node setups.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    rows: RwLock<Vec<StatsRow>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row without replacing earlier rows for the same node.
    pub fn insert_row(&self, node_id: &str, stats: Vec<u8>) {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.push(StatsRow {
            node_id: node_id.to_string(),
            stats,
        });
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NodeStatsStore for MemoryStatsStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter().map(|r| r.stats.clone()).collect())
    }

    async fn publish(&self, node_id: &str, stats: Vec<u8>) -> Result<(), StoreError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.retain(|r| r.node_id != node_id);
        rows.push(StatsRow {
            node_id: node_id.to_string(),
            stats,
        });
        Ok(())
    }
}

/// PostgreSQL-backed store.
///
/// Expects a table shaped like
/// `CREATE TABLE node_stats (node_id TEXT PRIMARY KEY, stats JSONB NOT NULL)`;
/// table and column names come from configuration.
#[derive(Debug, Clone)]
pub struct PgStatsStore {
    pool: PgPool,
    select_sql: String,
    upsert_sql: String,
}

impl PgStatsStore {
    /// Build a store from configuration. The pool connects lazily.
    pub fn from_config(config: &StatsStoreConfig, url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(url)?;
        Ok(Self::with_pool(pool, &config.table, &config.column))
    }

    /// Wrap an existing pool. `table` and `column` must be validated identifiers.
    pub fn with_pool(pool: PgPool, table: &str, column: &str) -> Self {
        Self {
            pool,
            select_sql: format!("SELECT {column}::text FROM {table}"),
            upsert_sql: format!(
                "INSERT INTO {table} (node_id, {column}) VALUES ($1, $2::jsonb) \
                 ON CONFLICT (node_id) DO UPDATE SET {column} = EXCLUDED.{column}"
            ),
        }
    }
}

#[async_trait]
impl NodeStatsStore for PgStatsStore {
    async fn fetch_all(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(&self.select_sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(String::into_bytes).collect())
    }

    async fn publish(&self, node_id: &str, stats: Vec<u8>) -> Result<(), StoreError> {
        let stats = String::from_utf8(stats).map_err(|e| StoreError::Query(e.to_string()))?;
        sqlx::query(&self.upsert_sql)
            .bind(node_id)
            .bind(stats)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

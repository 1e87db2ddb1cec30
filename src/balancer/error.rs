//! Balancer error definitions.

use std::num::ParseFloatError;

use thiserror::Error;

use crate::stats::store::StoreError;

/// Errors returned by balancing operations.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// Request latitude/longitude was not a number.
    #[error("invalid {axis} {value:?}: {source}")]
    InvalidCoordinate {
        axis: &'static str,
        value: String,
        source: ParseFloatError,
    },

    /// Selection was asked to choose from an empty candidate list.
    #[error("no nodes to select from")]
    NoNodes,

    /// Node stats could not be refreshed; no partial data is used.
    #[error("error refreshing nodes: {0}")]
    Refresh(#[from] StoreError),

    /// No registered node holds the ingest stream, or only a stale copy.
    #[error("no node found for ingest stream: {stream_id} stale: {stale}")]
    IngestStreamNotFound { stream_id: String, stale: bool },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

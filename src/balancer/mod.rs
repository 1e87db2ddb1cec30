//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Playback request (playback ID, lat, lon)
//!     → catalyst.rs (parse coordinates, refresh stats snapshot)
//!     → scored.rs (candidates = registered nodes with fresh metrics)
//!     → selection.rs (geo.rs scores, tiered ranking, random pick)
//!     → (node name, "<prefix>+<playback ID>")
//!
//! Ingest lookup (stream ID)
//!     → catalyst.rs (refresh snapshot, scan registered nodes)
//!     → "dtsc://<node name>" or not-found (stale / missing)
//! ```
//!
//! # Design Decisions
//! - Balancer holds no fleet state besides the registry; stats are per request
//! - No candidates means "serve it myself", not an error
//! - Unregistered nodes are never returned, whatever the store says

pub mod catalyst;
pub mod error;
pub mod geo;
pub mod scored;
pub mod selection;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::cluster::Member;

pub use catalyst::CataBalancer;
pub use error::{BalancerError, BalancerResult};
pub use scored::ScoredNode;

/// A playback redirect request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// Stream name prefixes; the first one is used for the redirect.
    pub redirect_prefixes: Vec<String>,
    pub playback_id: String,
    /// Requester latitude. Empty when unknown.
    pub lat: String,
    /// Requester longitude. Empty when unknown.
    pub lon: String,
    /// Accepted for interface compatibility; does not affect selection.
    pub fallback_prefix: String,
    /// Accepted for interface compatibility; does not affect selection.
    pub is_studio_req: bool,
}

impl PlaybackRequest {
    pub fn new(playback_id: impl Into<String>) -> Self {
        Self {
            playback_id: playback_id.into(),
            ..Default::default()
        }
    }

    /// Builder-style requester location.
    pub fn with_location(mut self, lat: impl Into<String>, lon: impl Into<String>) -> Self {
        self.lat = lat.into();
        self.lon = lon.into();
        self
    }
}

/// The contract the HTTP layer balances through.
#[async_trait]
pub trait Balancer: Send + Sync {
    /// Start background work, if any.
    async fn start(&self) -> BalancerResult<()>;

    /// Replace the known node set with the media nodes among `members`.
    async fn update_members(&self, members: &[Member]) -> BalancerResult<()>;

    /// Choose a node for playback. Returns `(node name, full stream name)`.
    async fn get_best_node(
        &self,
        cancel: &CancellationToken,
        request: &PlaybackRequest,
    ) -> BalancerResult<(String, String)>;

    /// Find the node holding ingest stream `stream_id`, as `dtsc://<node>`.
    async fn mist_util_load_source(
        &self,
        cancel: &CancellationToken,
        stream_id: &str,
        lat: &str,
        lon: &str,
    ) -> BalancerResult<String>;
}

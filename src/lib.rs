//! Catalyst load balancer core.
//!
//! Chooses which media node in a cluster should serve a playback request
//! or act as the source for a pulled stream, based on node stats that
//! every node publishes into a shared store.

pub mod balancer;
pub mod cluster;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod stats;

pub use balancer::{Balancer, BalancerError, CataBalancer, PlaybackRequest};
pub use config::CatalystConfig;
pub use lifecycle::Shutdown;

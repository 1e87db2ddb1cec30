//! Cluster membership subsystem.
//!
//! # Data Flow
//! ```text
//! Membership provider (member list + tags)
//!     → member.rs (filter on node=media, read dtsc tag)
//!     → registry.rs (atomic swap under write lock)
//!     → balancer reads copies under read lock
//! ```

pub mod member;
pub mod registry;

pub use member::{Member, Node};
pub use registry::NodeRegistry;

//! Node stats subsystem.
//!
//! # Data Flow
//! ```text
//! Each node (publisher.rs):
//!     Periodic timer
//!     → collect local metrics + stream lists
//!     → event.rs (encode NodeUpdateEvent)
//!     → store.rs (write own row)
//!
//! Each balancing request (snapshot.rs):
//!     store.rs (read all rows)
//!     → event.rs (decode)
//!     → staleness filter
//!     → Stats (request-local, never shared)
//! ```
//!
//! # Design Decisions
//! - Polling, not push: readers tolerate stale or missing rows
//! - Snapshots are rebuilt per request rather than cached
//! - A single undecodable row fails the whole snapshot

pub mod event;
pub mod publisher;
pub mod snapshot;
pub mod store;

pub use event::{CodecError, NodeMetrics, NodeUpdateEvent};
pub use snapshot::{Stats, Stream, Streams};
pub use store::{MemoryStatsStore, NodeStatsStore, PgStatsStore, StoreError};
pub use publisher::{LocalNodeState, LocalStateSource, NodeStatsPublisher, PublishError, StaticStateSource};

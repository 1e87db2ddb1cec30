//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → store (optional) → balancer → static members
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → background tasks exit
//!
//! Signals (signals.rs):
//!     SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

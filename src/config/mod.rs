//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CatalystConfig (validated, immutable)
//!     → sections handed to balancer, store, observability
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::CatalystConfig;
pub use schema::NodeConfig;
pub use schema::ObservabilityConfig;
pub use schema::StatsStoreConfig;

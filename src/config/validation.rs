//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Keep SQL identifiers safe to interpolate
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CatalystConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::CatalystConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("node.name must not be empty")]
    EmptyNodeName,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} {value:?} is not a valid SQL identifier")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("member at index {0} has an empty name")]
    EmptyMemberName(usize),
}

/// Check a parsed configuration.
pub fn validate_config(config: &CatalystConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.node.name.trim().is_empty() {
        errors.push(ValidationError::EmptyNodeName);
    }

    let balancer = &config.balancer;
    if balancer.metric_timeout_secs == 0 {
        errors.push(ValidationError::Zero("balancer.metric_timeout_secs"));
    }
    if balancer.ingest_stream_timeout_secs == 0 {
        errors.push(ValidationError::Zero("balancer.ingest_stream_timeout_secs"));
    }
    if balancer.query_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero("balancer.query_timeout_ms"));
    }

    let store = &config.stats_store;
    for (field, value) in [("stats_store.table", &store.table), ("stats_store.column", &store.column)] {
        if !is_identifier(value) {
            errors.push(ValidationError::InvalidIdentifier {
                field,
                value: value.clone(),
            });
        }
    }
    if store.max_connections == 0 {
        errors.push(ValidationError::Zero("stats_store.max_connections"));
    }
    if store.publish_interval_secs == 0 {
        errors.push(ValidationError::Zero("stats_store.publish_interval_secs"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    for (i, member) in config.members.iter().enumerate() {
        if member.name.is_empty() {
            errors.push(ValidationError::EmptyMemberName(i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Member;

    fn valid() -> CatalystConfig {
        let mut config = CatalystConfig::default();
        config.node.name = "lon-1".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.node.name = " ".into();
        config.balancer.metric_timeout_secs = 0;
        config.balancer.query_timeout_ms = Some(0);
        config.stats_store.table = "node_stats; DROP TABLE x".into();
        config.members.push(Member::new(""));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::EmptyNodeName));
        assert!(errors.contains(&ValidationError::Zero("balancer.metric_timeout_secs")));
        assert!(errors.contains(&ValidationError::Zero("balancer.query_timeout_ms")));
        assert!(errors.contains(&ValidationError::EmptyMemberName(0)));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidMetricsAddress("nowhere".into())]
        );
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("node_stats"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("stats::text"));
    }
}

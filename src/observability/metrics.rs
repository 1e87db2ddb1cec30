//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catabalancer_selections_total` (counter): selections by tier
//! - `catabalancer_self_selections_total` (counter): no candidates, chose self
//! - `catabalancer_refresh_total` (counter): stats refreshes by outcome
//! - `catabalancer_refresh_duration_seconds` (histogram): store read + decode
//! - `catabalancer_candidates` (gauge): candidates in the last request
//! - `catabalancer_registry_nodes` (gauge): media nodes in the registry
//! - `catabalancer_publish_total` (counter): own-stats publishes by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_selection(tier: &'static str) {
    counter!("catabalancer_selections_total", "tier" => tier).increment(1);
}

pub fn record_self_selection() {
    counter!("catabalancer_self_selections_total").increment(1);
}

pub fn record_refresh(ok: bool, started: Instant) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("catabalancer_refresh_total", "outcome" => outcome).increment(1);
    histogram!("catabalancer_refresh_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_candidates(count: usize) {
    gauge!("catabalancer_candidates").set(count as f64);
}

pub fn record_registry_size(count: usize) {
    gauge!("catabalancer_registry_nodes").set(count as f64);
}

pub fn record_publish(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("catabalancer_publish_total", "outcome" => outcome).increment(1);
}

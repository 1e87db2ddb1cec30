//! Tiered node selection.
//!
//! # Tiers
//! ```text
//! 1. local + serving the stream + not overloaded  → shuffle, top N
//! 2. local + not overloaded                       → shuffle, top N
//! 3. everyone, score = geo + load + (2 if stream) → sort desc, top N
//! then: uniform random pick among the top N
//! ```
//!
//! # Design Decisions
//! - Randomness comes from the caller's `Rng` so tests can seed it
//! - Ties in tier 3 keep no particular order; callers must not rely on one

use rand::seq::SliceRandom;
use rand::Rng;

use crate::balancer::error::{BalancerError, BalancerResult};
use crate::balancer::geo::{geo_score, haversine_km};
use crate::balancer::scored::ScoredNode;
use crate::cluster::Node;
use crate::observability::metrics;

/// How many top candidates the final pick chooses from.
pub const TOP_NODES: usize = 3;

/// Pick a node for `stream_id` requested from `(lat, lon)`.
pub fn select_node<R: Rng + ?Sized>(
    nodes: Vec<ScoredNode>,
    stream_id: &str,
    lat: f64,
    lon: f64,
    rng: &mut R,
) -> BalancerResult<Node> {
    if nodes.is_empty() {
        return Err(BalancerError::NoNodes);
    }

    let top_nodes = select_top_nodes(nodes, stream_id, lat, lon, TOP_NODES, &mut *rng);
    let chosen = top_nodes.choose(rng).ok_or(BalancerError::NoNodes)?;

    tracing::debug!(
        chosen = %chosen.node.name,
        top_nodes = %format_nodes(&top_nodes),
        stream = %stream_id,
        lat,
        lon,
        "Selected node"
    );
    Ok(chosen.node.clone())
}

/// Rank candidates and return at most `num_nodes` of the best.
pub fn select_top_nodes<R: Rng + ?Sized>(
    nodes: Vec<ScoredNode>,
    stream_id: &str,
    lat: f64,
    lon: f64,
    num_nodes: usize,
    rng: &mut R,
) -> Vec<ScoredNode> {
    let mut nodes = geo_scores(nodes, lat, lon);

    // 1. Has stream, is local, isn't overloaded
    let mut local_with_stream: Vec<ScoredNode> = nodes
        .iter()
        .filter(|n| n.geo_score == 2 && n.has_stream(stream_id) && n.load_score() == 2)
        .cloned()
        .map(|mut n| {
            n.stream_score = 2;
            n
        })
        .collect();
    if !local_with_stream.is_empty() {
        metrics::record_selection("local_with_stream");
        local_with_stream.shuffle(rng);
        local_with_stream.truncate(num_nodes);
        return local_with_stream;
    }

    // 2. Is local, isn't overloaded
    let mut local: Vec<ScoredNode> = nodes
        .iter()
        .filter(|n| n.geo_score == 2 && n.load_score() == 2)
        .cloned()
        .collect();
    if !local.is_empty() {
        metrics::record_selection("local");
        local.shuffle(rng);
        local.truncate(num_nodes);
        return local;
    }

    // 3. Weighted least-bad option
    for n in nodes.iter_mut() {
        n.score += n.geo_score + n.load_score();
        if n.has_stream(stream_id) {
            n.stream_score = 2;
            n.score += 2;
        }
    }
    metrics::record_selection("weighted");
    nodes.sort_by(|a, b| b.score.cmp(&a.score));
    nodes.truncate(num_nodes);
    nodes
}

/// Fill in distance and geo score relative to the requester.
pub fn geo_scores(mut nodes: Vec<ScoredNode>, lat: f64, lon: f64) -> Vec<ScoredNode> {
    for n in nodes.iter_mut() {
        n.geo_distance = haversine_km(lat, lon, n.metrics.geo_latitude, n.metrics.geo_longitude);
        n.geo_score = geo_score(n.geo_distance);
    }
    nodes
}

fn format_nodes(nodes: &[ScoredNode]) -> String {
    let parts: Vec<String> = nodes.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(" "))
}

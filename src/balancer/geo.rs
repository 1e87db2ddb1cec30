//! Geographic distance and scoring.
//!
//! # Score Bands
//! ```text
//! distance <= 1000 km  → 2 (local)
//! distance <= 2500 km  → 1 (regional)
//! otherwise            → 0 (remote)
//! ```

use geo::{Distance, Haversine, Point};

/// Upper bound (inclusive) for a node to count as local.
pub const LOCAL_DISTANCE_KM: f64 = 1000.0;
/// Upper bound (inclusive) for a node to count as regional.
pub const REGIONAL_DISTANCE_KM: f64 = 2500.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // geo points are (x = longitude, y = latitude); distance is in metres.
    Haversine::distance(Point::new(lon1, lat1), Point::new(lon2, lat2)) / 1000.0
}

/// Map a distance onto the 0..=2 geo score.
pub fn geo_score(distance_km: f64) -> i64 {
    if distance_km <= LOCAL_DISTANCE_KM {
        2
    } else if distance_km <= REGIONAL_DISTANCE_KM {
        1
    } else {
        0
    }
}

//! Great-circle helpers over longitude/latitude positions.
//!
//! Positions are always `LonLat` (x = longitude, y = latitude, both in degrees). Bearings use the
//! signed convention: 0 is north, 90 is east, and results lie in `[-180, 180)`.

use geom::{Distance, LonLat};

/// Mean earth radius, matching what most web map libraries assume
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine distance between two positions. Symmetric, and zero only for equal positions.
pub fn distance(a: LonLat, b: LonLat) -> Distance {
    Distance::meters(distance_meters(a, b))
}

pub fn distance_meters(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let delta_lat = (b.y() - a.y()).to_radians();
    let delta_lon = (b.x() - a.x()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let h = h.min(1.0);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` towards `b`, in `[-180, 180)`. Equal positions give 0.
pub fn bearing_degrees(a: LonLat, b: LonLat) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let delta_lon = (b.x() - a.x()).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// The position `dist` along the straight line from `a` to `b`, interpolated linearly in
/// longitude/latitude. Distances past either end are clamped to the segment. A zero-length segment
/// always yields `a`.
pub fn point_at_distance(a: LonLat, b: LonLat, dist: Distance) -> LonLat {
    let total = distance(a, b);
    if total == Distance::ZERO {
        return a;
    }
    let pct = (dist / total).max(0.0).min(1.0);
    LonLat::new(a.x() + pct * (b.x() - a.x()), a.y() + pct * (b.y() - a.y()))
}

/// Wraps any angle into `[-180, 180)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// The signed rotation, in `[-180, 180)`, that takes `current` to `target` along the shorter way
/// around the circle. Positive is clockwise.
pub fn shortest_rotation(current: f64, target: f64) -> f64 {
    (target - current + 540.0).rem_euclid(360.0) - 180.0
}

/// Limits a rotation to `[-max, max]`, keeping its sign.
pub fn clamp_rotation(delta: f64, max: f64) -> f64 {
    delta.max(-max).min(max)
}

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod geometry;
mod import;
mod photos;

use anyhow::Result;
use chrono::{DateTime, Utc};
use geom::{Distance, LonLat};
use serde::{Deserialize, Serialize};

pub use import::load_csv;
pub use photos::{load_photos, PhotoMarker};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub pos: LonLat,
    pub time: DateTime<Utc>,
}

impl TrackPoint {
    pub fn new(pos: LonLat, time: DateTime<Utc>) -> Self {
        Self { pos, time }
    }
}

/// An ordered route with timestamps, as produced by the upstream GPX/KML parser. Once built, a
/// track is never mutated; uploading a new file replaces it wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>) -> Result<Self> {
        if points.is_empty() {
            bail!("Track doesn't have any points");
        }
        for pair in points.windows(2) {
            // Equal times are fine; the sampler treats that segment as instantaneous
            if pair[0].time > pair[1].time {
                bail!(
                    "Track input out-of-order: {} then {}",
                    pair[0].time,
                    pair[1].time
                );
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    // Never true, but clippy insists
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.points[0].time
    }

    /// Total playback length in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.offset_ms(self.points.len() - 1)
    }

    /// Milliseconds between the start of the track and the point at `idx`. This is the cursor value
    /// that lands exactly on that point.
    pub fn offset_ms(&self, idx: usize) -> f64 {
        millis_between(self.start_time(), self.points[idx].time)
    }

    pub fn length(&self) -> Distance {
        let mut total = Distance::ZERO;
        for pair in self.points.windows(2) {
            total += geometry::distance(pair[0].pos, pair[1].pos);
        }
        total
    }

    /// The index of the track point closest to `pos`. Ties go to the earlier point.
    pub fn nearest_point(&self, pos: LonLat) -> usize {
        let mut best = (0, f64::MAX);
        for (idx, pt) in self.points.iter().enumerate() {
            let dist = geometry::distance_meters(pt.pos, pos);
            if dist < best.1 {
                best = (idx, dist);
            }
        }
        best.0
    }
}

pub fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    match (to - from).num_microseconds() {
        Some(us) => us as f64 / 1000.0,
        // Only overflows for spans of hundreds of thousands of years
        None => (to - from).num_milliseconds() as f64,
    }
}

pub fn linestring(pts: &[LonLat]) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::LineString(
        pts.iter().map(|pt| vec![pt.x(), pt.y()]).collect(),
    ))
}

pub fn point(pt: LonLat) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::Point(vec![pt.x(), pt.y()]))
}

#[cfg(test)]
pub(crate) fn simple_track(pts: &[(f64, f64, i64)]) -> Track {
    use chrono::TimeZone;

    let start = Utc.with_ymd_and_hms(2022, 6, 1, 8, 0, 0).unwrap();
    Track::new(
        pts.iter()
            .map(|(lon, lat, ms)| {
                TrackPoint::new(
                    LonLat::new(*lon, *lat),
                    start + chrono::Duration::milliseconds(*ms),
                )
            })
            .collect(),
    )
    .unwrap()
}

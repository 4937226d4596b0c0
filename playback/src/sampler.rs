use geom::{Distance, LonLat};
use serde::{Deserialize, Serialize};

use track::geometry::{bearing_degrees, distance, point_at_distance};
use track::{millis_between, Track};

/// Where the marker is at some cursor, and how it's moving.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentPointSample {
    pub position: LonLat,
    /// Heading over the bearing window, in `[-180, 180)`. 0 when the window runs off the track.
    pub bearing: f64,
    /// Over the bracketing segment. Distance in meters divided by duration in ms/3600, which works
    /// out to km/h.
    pub speed: f64,
    /// The first track point after the cursor (the split index). Points before this have been
    /// traversed.
    pub index: usize,
}

/// Computes the current point for a cursor, in milliseconds since the start of the track.
///
/// `pinned` is the track index of a photo that playback has to stop at. If the cursor reaches that
/// point's segment, the segment ends there and the point's exact position is used.
pub fn sample(
    track: &Track,
    cursor_ms: f64,
    bearing_line_length: Distance,
    pinned: Option<usize>,
) -> CurrentPointSample {
    let points = track.points();
    if points.len() < 2 {
        return CurrentPointSample {
            position: points[0].pos,
            bearing: 0.0,
            speed: 0.0,
            index: points.len(),
        };
    }

    let start = track.start_time();
    let split_idx = points
        .iter()
        .enumerate()
        .position(|(idx, pt)| millis_between(start, pt.time) > cursor_ms || Some(idx) == pinned)
        .unwrap_or(points.len());

    let end_idx = split_idx.max(1).min(points.len() - 1);
    let start_idx = split_idx.saturating_sub(1).min(end_idx - 1);
    let p1 = points[start_idx];
    let p2 = points[end_idx];

    let segment_ms = millis_between(p1.time, p2.time);
    let segment_length = distance(p1.pos, p2.pos);

    let position = if Some(end_idx) == pinned {
        p2.pos
    } else {
        let pct = if segment_ms > 0.0 {
            let raw = (cursor_ms - millis_between(start, p1.time)) / segment_ms;
            // Round to avoid jitter between frames
            (raw.max(0.0).min(1.0) * 100.0).round() / 100.0
        } else {
            1.0
        };
        point_at_distance(p1.pos, p2.pos, segment_length * pct)
    };

    let speed = if segment_ms > 0.0 {
        segment_length.inner_meters() / (segment_ms / 3600.0)
    } else {
        0.0
    };

    CurrentPointSample {
        position,
        bearing: windowed_bearing(track, position, split_idx, bearing_line_length),
        speed,
        index: split_idx,
    }
}

/// Measures the heading between the nearest points at least half the window length behind and
/// ahead of `current`, smoothing out GPS jitter.
fn windowed_bearing(
    track: &Track,
    current: LonLat,
    split_idx: usize,
    window: Distance,
) -> f64 {
    let points = track.points();
    let half = window * 0.5;

    let behind = walk(current, points[..split_idx].iter().rev().map(|pt| pt.pos), half);
    let ahead = walk(current, points[split_idx..].iter().map(|pt| pt.pos), half);
    match (behind, ahead) {
        (Some(p1), Some(p2)) => bearing_degrees(p1, p2),
        _ => 0.0,
    }
}

fn walk(from: LonLat, pts: impl Iterator<Item = LonLat>, threshold: Distance) -> Option<LonLat> {
    let mut so_far = Distance::ZERO;
    let mut last = from;
    for pt in pts {
        so_far += distance(last, pt);
        last = pt;
        if so_far >= threshold {
            return Some(pt);
        }
    }
    None
}

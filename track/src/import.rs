use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use geom::LonLat;
use serde::Deserialize;

use crate::{Track, TrackPoint};

/// Reads a track from CSV with `longitude`, `latitude` and `time` columns. Times are RFC 3339, or
/// `%Y-%m-%d %H:%M:%S` interpreted as UTC.
pub fn load_csv<R: std::io::Read>(reader: R) -> Result<Track> {
    let mut points = Vec::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        let time = parse_time(&rec.time)?;
        if !rec.longitude.is_finite() || !rec.latitude.is_finite() {
            bail!("Bad position at {}: {}, {}", rec.time, rec.longitude, rec.latitude);
        }
        points.push(TrackPoint::new(LonLat::new(rec.longitude, rec.latitude), time));
    }
    debug!("Read {} track points", points.len());
    Track::new(points)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[derive(Deserialize)]
struct Record {
    longitude: f64,
    latitude: f64,
    time: String,
}

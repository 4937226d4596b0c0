use geom::LonLat;
use serde::{Deserialize, Serialize};

use track::Track;

/// Which part of the route a line covers, for styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Before,
    After,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Before => "before",
            Status::After => "after",
        }
    }
}

/// The route cut at the current point. Both halves share `current`, so together they form one
/// continuous path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSplit {
    pub before: Vec<LonLat>,
    pub after: Vec<LonLat>,
}

impl RouteSplit {
    pub fn new(track: &Track, current: LonLat, split_idx: usize) -> Self {
        let points = track.points();
        let split_idx = split_idx.min(points.len());

        let mut before: Vec<LonLat> = points[..split_idx].iter().map(|pt| pt.pos).collect();
        before.push(current);

        let mut after = vec![current];
        after.extend(points[split_idx..].iter().map(|pt| pt.pos));

        Self { before, after }
    }

    pub fn line(&self, status: Status) -> &Vec<LonLat> {
        match status {
            Status::Before => &self.before,
            Status::After => &self.after,
        }
    }

    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let mut features = Vec::new();
        for status in [Status::Before, Status::After] {
            let mut properties = serde_json::Map::new();
            properties.insert("status".to_string(), status.as_str().into());
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(track::linestring(self.line(status))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

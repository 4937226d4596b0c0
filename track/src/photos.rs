use anyhow::Result;
use geom::LonLat;
use serde::{Deserialize, Serialize};

use crate::Track;

/// A photo the user attached to the route. Only photos assigned to a track point (`feature_id`)
/// take part in playback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoMarker {
    pub name: String,
    /// From the photo's geotag, if it had one
    #[serde(default)]
    pub position: Option<LonLat>,
    /// Index of the track point this photo is pinned to
    #[serde(default)]
    pub feature_id: Option<usize>,
}

impl PhotoMarker {
    /// Pins a geotagged photo to the closest track point, unless it's already been placed.
    pub fn assign_to_track(&mut self, track: &Track) {
        if self.feature_id.is_some() {
            return;
        }
        if let Some(pos) = self.position {
            let idx = track.nearest_point(pos);
            debug!("Pinning photo {} to track point {}", self.name, idx);
            self.feature_id = Some(idx);
        }
    }
}

/// Reads a JSON list of photos, pins the geotagged ones and drops assignments that point past the
/// end of the track.
pub fn load_photos<R: std::io::Read>(reader: R, track: &Track) -> Result<Vec<PhotoMarker>> {
    let mut photos: Vec<PhotoMarker> = serde_json::from_reader(reader)?;
    for photo in &mut photos {
        photo.assign_to_track(track);
        if let Some(idx) = photo.feature_id {
            if idx >= track.len() {
                warn!(
                    "Photo {} is pinned to point {}, but the track only has {} points",
                    photo.name,
                    idx,
                    track.len()
                );
                photo.feature_id = None;
            }
        }
    }
    Ok(photos)
}

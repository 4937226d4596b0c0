use anyhow::Result;
use serde_json::Value;

use track::{PhotoMarker, Track};

use crate::{sample, AnimationControls, CurrentPointSample, Signal, Subscription};

/// Everything one playback session shares: the uploaded route and photos, plus the reactive state
/// the driver publishes. Built once and handed to whoever needs it.
pub struct Session {
    track: Track,
    /// Only pinned photos, sorted by the track point they're pinned to
    photos: Vec<PhotoMarker>,

    /// Private so every write goes through validation
    controls: Signal<AnimationControls>,
    /// Milliseconds since the start of the track
    pub cursor: Signal<f64>,
    /// Index into `photos()` of the photo being shown right now
    pub displaying_photo: Signal<Option<usize>>,
}

impl Session {
    pub fn new(track: Track, photos: Vec<PhotoMarker>, controls: AnimationControls) -> Result<Self> {
        controls.validate()?;
        Ok(Self {
            track,
            photos: pinned_photos(photos),
            controls: Signal::new(controls),
            cursor: Signal::new(0.0),
            displaying_photo: Signal::new(None),
        })
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn photos(&self) -> &[PhotoMarker] {
        &self.photos
    }

    /// Swaps in a newly uploaded route. Playback restarts from the beginning.
    pub fn replace_track(&mut self, track: Track, photos: Vec<PhotoMarker>) {
        info!(
            "Loaded a new track with {} points and {} photos",
            track.len(),
            photos.len()
        );
        self.track = track;
        self.photos = pinned_photos(photos);
        self.cursor.set(0.0);
        self.displaying_photo.set(None);
    }

    pub fn controls(&self) -> AnimationControls {
        self.controls.get()
    }

    /// Called right away with the current controls, then after every accepted change
    pub fn subscribe_controls<F: Fn(&AnimationControls) + 'static>(
        &self,
        cb: F,
    ) -> Subscription<AnimationControls> {
        self.controls.subscribe(cb)
    }

    pub fn set_controls(&self, controls: AnimationControls) -> Result<()> {
        controls.validate()?;
        self.controls.set(controls);
        Ok(())
    }

    /// A single live edit from a control widget, keyed like presets
    pub fn edit_control(&self, key: &str, value: Value) -> Result<()> {
        let mut controls = self.controls.get();
        controls.apply_edit(key, value)?;
        self.controls.set(controls);
        Ok(())
    }

    pub fn import_preset(&self, json: &str) -> Result<()> {
        let controls = AnimationControls::import_preset(json)?;
        self.controls.set(controls);
        Ok(())
    }

    pub fn sample(&self, cursor_ms: f64, pinned: Option<usize>) -> CurrentPointSample {
        sample(
            &self.track,
            cursor_ms,
            self.controls.get().bearing_line_length(),
            pinned,
        )
    }
}

fn pinned_photos(photos: Vec<PhotoMarker>) -> Vec<PhotoMarker> {
    let mut pinned: Vec<PhotoMarker> = photos
        .into_iter()
        .filter(|photo| photo.feature_id.is_some())
        .collect();
    // Stable, so photos on the same point keep their upload order
    pinned.sort_by_key(|photo| photo.feature_id);
    pinned
}

use geom::LonLat;
use serde::{Deserialize, Serialize};

use track::geometry::{clamp_rotation, shortest_rotation};
use track::{PhotoMarker, Track};

use crate::{sample, AnimationControls, CurrentPointSample, RouteSplit, Session};

/// Where the driver asks the map camera to go. Angles in degrees, duration in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub center: LonLat,
    pub bearing: f64,
    pub pitch: f64,
    pub zoom: f64,
    pub roll: f64,
    pub duration: f64,
}

/// The map renderer. Only the driver or a scrub touch it, never both at once.
pub trait MapView {
    /// The bearing the camera currently has, wherever an easing is in progress
    fn camera_bearing(&self) -> f64;
    fn set_current_point(&mut self, pos: LonLat);
    fn set_route(&mut self, route: &RouteSplit);
    fn ease_to(&mut self, target: CameraTarget);
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Stopped,
    Playing {
        /// Timestamp of the previous frame. None right after starting, so the first frame doesn't
        /// count time spent stopped.
        last_frame: Option<f64>,
    },
    /// Frames are suspended until `resume_at`
    ShowingPhoto { photo: usize, resume_at: f64 },
}

/// Animates the current point along the session's track, one display refresh at a time.
///
/// The host calls `tick` with a monotonic timestamp in milliseconds for every refresh while
/// `wants_frame` is true, and at or after `next_timer` while a photo is showing. Nothing here
/// blocks or sleeps.
pub struct Driver<M: MapView> {
    session: Session,
    map: M,

    state: State,
    /// Some while the user is dragging the progress control. True if playback should resume
    /// afterwards.
    scrubbing: Option<bool>,
    cursor: f64,
    /// Index into the session's sorted photos of the next one to stop at
    next_photo: usize,
    loops: usize,
}

impl<M: MapView> Driver<M> {
    pub fn new(session: Session, map: M) -> Self {
        let cursor = session.cursor.get();
        let next_photo = first_photo_ahead(&session, cursor);
        Self {
            session,
            map,
            state: State::Stopped,
            scrubbing: None,
            cursor,
            next_photo,
            loops: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// How many times playback wrapped from the end of the route back to the start
    pub fn loops_completed(&self) -> usize {
        self.loops
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self.state, State::Stopped)
    }

    /// True if the host should deliver another frame
    pub fn wants_frame(&self) -> bool {
        matches!(self.state, State::Playing { .. })
    }

    /// When a photo is showing, the timestamp at which playback resumes
    pub fn next_timer(&self) -> Option<f64> {
        match self.state {
            State::ShowingPhoto { resume_at, .. } => Some(resume_at),
            _ => None,
        }
    }

    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.session.track().len() < 2 {
            warn!("Can't animate a track with a single point");
            let sample = self.session.sample(0.0, None);
            self.push_geometry(&sample);
            return;
        }
        info!("Starting playback at {}ms", self.cursor);
        self.state = State::Playing { last_frame: None };
    }

    /// Stops playback, cancelling the next frame and any photo being shown. The cursor stays put.
    pub fn stop(&mut self) {
        if let State::ShowingPhoto { photo, .. } = self.state {
            debug!("Cancelling display of photo {}", photo);
            self.session.displaying_photo.set(None);
        }
        if self.is_playing() {
            info!("Stopping playback at {}ms", self.cursor);
        }
        self.state = State::Stopped;
    }

    /// Cancels everything pending. Nothing fires after this, even if the host ticks again.
    pub fn teardown(&mut self) {
        self.stop();
        self.scrubbing = None;
        if self.session.displaying_photo.get().is_some() {
            self.session.displaying_photo.set(None);
        }
    }

    pub fn tick(&mut self, now: f64) {
        match self.state {
            State::Stopped => {}
            State::Playing { last_frame } => self.step(now, last_frame),
            State::ShowingPhoto { photo, resume_at } => {
                if now >= resume_at {
                    debug!("Done showing photo {}", photo);
                    self.session.displaying_photo.set(None);
                    // The marker was snapped onto the photo's point, so don't jump back from it
                    if let Some(feature_id) = self.pending_photo() {
                        let track = self.session.track();
                        let offset = track.offset_ms(feature_id.min(track.len() - 1));
                        self.cursor = self.cursor.max(offset);
                    }
                    self.next_photo += 1;
                    self.state = State::Playing { last_frame: None };
                    self.step(now, None);
                }
            }
        }
    }

    fn step(&mut self, now: f64, last_frame: Option<f64>) {
        let controls = self.session.controls();
        let dt = last_frame.map(|t| (now - t).max(0.0)).unwrap_or(0.0);
        // The multiplier is added on top of real time every frame, not multiplied by it
        self.cursor += dt + controls.speed_multiplier;

        if self.cursor >= self.session.track().duration_ms() {
            debug!("Reached the end of the route; looping");
            self.cursor = 0.0;
            self.next_photo = 0;
            self.loops += 1;
        }

        let pinned = self.pending_photo();
        let sample = sample(
            self.session.track(),
            self.cursor,
            controls.bearing_line_length(),
            pinned,
        );
        self.push_geometry(&sample);

        if let Some(feature_id) = pinned {
            if feature_id <= sample.index {
                self.show_photo(now, feature_id, &sample, &controls);
                self.session.cursor.set(self.cursor);
                return;
            }
        }

        if controls.follow_current_point {
            self.move_camera(&sample, &controls);
        }
        self.session.cursor.set(self.cursor);
        self.state = State::Playing {
            last_frame: Some(now),
        };
    }

    fn pending_photo(&self) -> Option<usize> {
        self.session
            .photos()
            .get(self.next_photo)
            .and_then(|photo| photo.feature_id)
    }

    fn show_photo(
        &mut self,
        now: f64,
        feature_id: usize,
        sample: &CurrentPointSample,
        controls: &AnimationControls,
    ) {
        info!(
            "Pausing on photo {} at track point {}",
            self.session.photos()[self.next_photo].name,
            feature_id
        );
        if let (true, Some(zoom)) = (controls.follow_current_point, controls.zoom_in_to_images) {
            let bearing = self.map.camera_bearing();
            self.map.ease_to(CameraTarget {
                center: sample.position,
                bearing,
                pitch: controls.pitch,
                zoom,
                roll: controls.camera_roll,
                duration: controls.ease_duration,
            });
        }

        self.state = State::ShowingPhoto {
            photo: self.next_photo,
            resume_at: now + controls.display_image_duration,
        };
        self.session.displaying_photo.set(Some(self.next_photo));
    }

    fn move_camera(&mut self, sample: &CurrentPointSample, controls: &AnimationControls) {
        let target = controls.camera_angle
            + if controls.auto_rotate {
                sample.bearing
            } else {
                0.0
            };
        let current = self.map.camera_bearing();
        let delta = clamp_rotation(
            shortest_rotation(current, target),
            controls.max_bearing_diff_per_frame,
        );
        self.map.ease_to(CameraTarget {
            center: sample.position,
            bearing: current + delta,
            pitch: controls.pitch,
            zoom: controls.zoom,
            roll: controls.camera_roll,
            duration: controls.ease_duration,
        });
    }

    fn push_geometry(&mut self, sample: &CurrentPointSample) {
        self.map.set_current_point(sample.position);
        self.map.set_route(&RouteSplit::new(
            self.session.track(),
            sample.position,
            sample.index,
        ));
    }

    /// Swaps in a newly uploaded route and photos. Playback stops and rewinds to the start; the
    /// map gets the new route right away.
    pub fn replace_track(&mut self, track: Track, photos: Vec<PhotoMarker>) {
        self.teardown();
        self.session.replace_track(track, photos);
        self.cursor = 0.0;
        self.next_photo = 0;
        self.loops = 0;

        let sample = self.session.sample(0.0, None);
        self.push_geometry(&sample);
    }

    /// The user grabbed the progress control. Playback pauses until `scrub_end`.
    pub fn scrub_start(&mut self) {
        if self.scrubbing.is_some() {
            return;
        }
        let resume = self.is_playing();
        if resume {
            debug!("Pausing playback for a scrub");
        }
        self.stop();
        self.scrubbing = Some(resume);
    }

    /// Jumps straight to a cursor, bypassing the frame loop.
    pub fn scrub_to(&mut self, cursor_ms: f64) {
        self.scrub_start();
        let duration = self.session.track().duration_ms();
        self.cursor = cursor_ms.max(0.0).min(duration);

        let sample = self.session.sample(self.cursor, None);
        self.next_photo = first_photo_ahead(&self.session, self.cursor);

        self.push_geometry(&sample);
        self.session.cursor.set(self.cursor);
    }

    pub fn scrub_end(&mut self) {
        if let Some(resume) = self.scrubbing.take() {
            if resume {
                self.start();
            }
        }
    }
}

/// Index into the session's sorted photos of the first one pinned at or after the cursor. Photos
/// behind it have already been passed.
fn first_photo_ahead(session: &Session, cursor_ms: f64) -> usize {
    let track = session.track();
    session
        .photos()
        .iter()
        .position(|photo| match photo.feature_id {
            Some(id) => track.offset_ms(id.min(track.len() - 1)) >= cursor_ms,
            None => false,
        })
        .unwrap_or(session.photos().len())
}

impl<M: MapView> Drop for Driver<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::tests::{photo, track_from};

    #[derive(Default)]
    struct FakeMap {
        bearing: f64,
        current: Option<LonLat>,
        routes: usize,
        eases: Vec<CameraTarget>,
    }

    impl MapView for FakeMap {
        fn camera_bearing(&self) -> f64 {
            self.bearing
        }
        fn set_current_point(&mut self, pos: LonLat) {
            self.current = Some(pos);
        }
        fn set_route(&mut self, _: &RouteSplit) {
            self.routes += 1;
        }
        fn ease_to(&mut self, target: CameraTarget) {
            // Pretend the easing finishes instantly
            self.bearing = target.bearing;
            self.eases.push(target);
        }
    }

    fn three_points() -> Track {
        track_from(&[(0.0, 0.0, 0), (0.0, 0.001, 1000), (0.0, 0.002, 2000)])
    }

    fn driver(track: Track, photos: Vec<PhotoMarker>, speed_multiplier: f64) -> Driver<FakeMap> {
        let mut controls = AnimationControls::default();
        controls.speed_multiplier = speed_multiplier;
        controls.display_image_duration = 500.0;
        controls.bearing_line_length_in_meters = 50.0;
        Driver::new(
            Session::new(track, photos, controls).unwrap(),
            FakeMap::default(),
        )
    }

    #[test]
    fn advances_by_elapsed_time_plus_multiplier() {
        let mut d = driver(three_points(), Vec::new(), 10.0);
        d.tick(0.0);
        assert_eq!(d.cursor(), 0.0);

        d.start();
        assert!(d.wants_frame());
        d.tick(100.0);
        // The first frame has no previous timestamp
        assert_eq!(d.cursor(), 10.0);
        d.tick(116.0);
        assert_eq!(d.cursor(), 36.0);
        assert_eq!(d.session().cursor.get(), 36.0);
        assert_eq!(d.map().routes, 2);
        assert_eq!(d.map().eases.len(), 2);
    }

    #[test]
    fn wraps_and_resets_photos() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1)], 0.0);
        d.start();
        // Entering the segment that ends at the photo snaps onto it and pauses
        d.tick(0.0);
        assert_eq!(d.session().displaying_photo.get(), Some(0));
        assert_eq!(d.next_timer(), Some(500.0));
        assert_eq!(d.map().current, Some(LonLat::new(0.0, 0.001)));
        assert_eq!(d.cursor(), 0.0);

        // Resuming continues from the photo's point
        d.tick(500.0);
        assert_eq!(d.session().displaying_photo.get(), None);
        assert_eq!(d.next_photo, 1);
        assert_eq!(d.cursor(), 1000.0);
        d.tick(1400.0);
        assert_eq!(d.cursor(), 1900.0);

        d.tick(1600.0);
        assert_eq!(d.cursor(), 0.0);
        assert_eq!(d.next_photo, 0);
        assert_eq!(d.loops_completed(), 1);
        assert_eq!(d.session().displaying_photo.get(), Some(0));
    }

    #[test]
    fn frames_stop_while_a_photo_shows() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1), photo("b.jpg", 1)], 0.0);
        d.start();
        d.tick(0.0);
        assert!(!d.wants_frame());
        assert!(d.is_playing());

        let routes = d.map().routes;
        d.tick(100.0);
        d.tick(400.0);
        assert_eq!(d.cursor(), 0.0);
        assert_eq!(d.map().routes, routes);

        // Two photos on the same point show one after the other
        d.tick(500.0);
        assert_eq!(d.session().displaying_photo.get(), Some(1));
        assert_eq!(d.next_timer(), Some(1000.0));
        d.tick(1000.0);
        assert_eq!(d.session().displaying_photo.get(), None);
        assert!(d.wants_frame());
    }

    #[test]
    fn teardown_cancels_the_photo_timer() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1)], 0.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let _sub = d
            .session()
            .displaying_photo
            .subscribe(move |x| seen2.borrow_mut().push(*x));

        d.start();
        d.tick(0.0);
        assert_eq!(d.next_timer(), Some(500.0));
        d.teardown();
        assert_eq!(d.next_timer(), None);
        assert!(!d.is_playing());

        // A stale timer firing after teardown does nothing
        d.tick(5000.0);
        assert_eq!(*seen.borrow(), vec![None, Some(0), None]);
        assert_eq!(d.next_photo, 0);
    }

    #[test]
    fn camera_rotation_is_bounded() {
        // Heading due east, camera pointing north
        let track = track_from(&[(0.0, 0.0, 0), (0.001, 0.0, 1000), (0.002, 0.0, 2000)]);
        let mut d = driver(track, Vec::new(), 0.0);
        d.session()
            .edit_control("maxBearingDiffPerFrame", serde_json::json!(5))
            .unwrap();
        d.start();
        d.tick(0.0);
        let mut now = 0.0;
        for _ in 0..5 {
            now += 200.0;
            d.tick(now);
        }
        let bearings: Vec<f64> = d.map().eases.iter().map(|e| e.bearing).collect();
        // Until the marker is half a window in, there's no heading yet
        assert_eq!(bearings[0], 0.0);
        for pair in bearings.windows(2) {
            assert!(pair[1] >= pair[0]);
            assert!(pair[1] - pair[0] <= 5.0 + 1e-9);
        }
        assert_eq!(bearings.last(), Some(&20.0));
    }

    #[test]
    fn camera_turns_the_short_way() {
        let track = track_from(&[(0.0, 0.0, 0), (0.001, 0.0, 1000), (0.002, 0.0, 2000)]);
        let mut d = driver(track, Vec::new(), 0.0);
        let mut controls = d.session().controls();
        controls.auto_rotate = false;
        controls.camera_angle = 10.0;
        controls.max_bearing_diff_per_frame = 3.0;
        d.session().set_controls(controls).unwrap();

        d.map_mut().bearing = 350.0;
        d.start();
        d.tick(0.0);
        assert_eq!(d.map().eases[0].bearing, 353.0);

        d.map_mut().bearing = 11.0;
        d.tick(10.0);
        assert_eq!(d.map().eases[1].bearing, 10.0);
    }

    #[test]
    fn no_camera_without_follow() {
        let mut d = driver(three_points(), Vec::new(), 0.0);
        d.session()
            .edit_control("followCurrentPoint", serde_json::json!(false))
            .unwrap();
        d.start();
        d.tick(0.0);
        d.tick(100.0);
        assert!(d.map().eases.is_empty());
        assert_eq!(d.map().routes, 2);
    }

    #[test]
    fn scrubbing_pauses_and_resumes() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1), photo("b.jpg", 2)], 0.0);
        d.start();
        d.tick(0.0);

        d.scrub_start();
        assert!(!d.is_playing());
        d.scrub_to(1500.0);
        assert_eq!(d.cursor(), 1500.0);
        assert_eq!(d.session().cursor.get(), 1500.0);
        // The first photo is behind us now
        assert_eq!(d.next_photo, 1);
        let pos = d.map().current.unwrap();
        assert!((pos.y() - 0.0015).abs() < 1e-7);

        d.scrub_to(99999.0);
        assert_eq!(d.cursor(), 2000.0);
        d.scrub_end();
        assert!(d.wants_frame());

        // Scrubbing while stopped doesn't start anything
        d.stop();
        d.scrub_to(10.0);
        d.scrub_end();
        assert!(!d.is_playing());
    }

    #[test]
    fn photos_zoom_in_when_following() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1)], 0.0);
        d.session()
            .edit_control("zoomInToImages", serde_json::json!(18.5))
            .unwrap();
        d.map_mut().bearing = 42.0;
        d.start();
        d.tick(0.0);
        assert_eq!(d.session().displaying_photo.get(), Some(0));
        let ease = d.map().eases.last().copied().unwrap();
        assert_eq!(ease.zoom, 18.5);
        assert_eq!(ease.center, LonLat::new(0.0, 0.001));
        // Zooming in doesn't rotate
        assert_eq!(ease.bearing, 42.0);
    }

    #[test]
    fn photos_dont_zoom_when_disabled() {
        for (key, value) in [
            ("zoomInToImages", serde_json::json!(false)),
            ("followCurrentPoint", serde_json::json!(false)),
        ] {
            let mut d = driver(three_points(), vec![photo("a.jpg", 1)], 0.0);
            d.session().edit_control(key, value).unwrap();
            d.start();
            d.tick(0.0);
            assert_eq!(d.session().displaying_photo.get(), Some(0));
            assert!(d.map().eases.is_empty(), "{key} should suppress the zoom");
        }
    }

    #[test]
    fn starting_mid_track_skips_passed_photos() {
        let mut controls = AnimationControls::default();
        controls.speed_multiplier = 0.0;
        let session = Session::new(
            three_points(),
            vec![photo("a.jpg", 1), photo("b.jpg", 2)],
            controls,
        )
        .unwrap();
        session.cursor.set(1500.0);
        let mut d = Driver::new(session, FakeMap::default());
        assert_eq!(d.next_photo, 1);

        d.start();
        d.tick(0.0);
        // The first photo was passed, so playback heads straight for the second
        assert_eq!(d.session().displaying_photo.get(), Some(1));
        assert_eq!(d.map().current, Some(LonLat::new(0.0, 0.002)));

        // At the very start, a photo on the first point is still ahead
        let d = driver(three_points(), vec![photo("a.jpg", 0)], 0.0);
        assert_eq!(d.next_photo, 0);
    }

    #[test]
    fn replacing_the_track_rewinds() {
        let mut d = driver(three_points(), vec![photo("a.jpg", 1)], 600.0);
        d.start();
        d.tick(0.0);
        d.tick(500.0);
        d.tick(1000.0);
        d.tick(1100.0);
        assert_eq!(d.loops_completed(), 1);
        assert!(d.next_timer().is_some());

        let east = track_from(&[(1.0, 0.0, 0), (1.001, 0.0, 5000)]);
        d.replace_track(east, Vec::new());
        assert!(!d.is_playing());
        assert_eq!(d.next_timer(), None);
        assert_eq!(d.cursor(), 0.0);
        assert_eq!(d.loops_completed(), 0);
        assert_eq!(d.next_photo, 0);
        assert_eq!(d.session().cursor.get(), 0.0);
        assert_eq!(d.session().displaying_photo.get(), None);
        assert!(d.session().photos().is_empty());
        assert_eq!(d.map().current, Some(LonLat::new(1.0, 0.0)));

        d.start();
        d.tick(2000.0);
        assert_eq!(d.cursor(), 600.0);
    }

    #[test]
    fn single_point_tracks_dont_play() {
        let mut d = driver(track_from(&[(1.0, 2.0, 0)]), Vec::new(), 5.0);
        d.start();
        assert!(!d.is_playing());
        assert_eq!(d.map().current, Some(LonLat::new(1.0, 2.0)));
    }
}

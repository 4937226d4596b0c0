use geom::LonLat;

use playback::{CameraTarget, MapView, RouteSplit};

/// Stands in for a real map renderer: remembers the latest geometry and camera, and logs what it
/// was asked to do.
pub struct LoggingMap {
    bearing: f64,
    current: Option<LonLat>,
    route: Option<RouteSplit>,
    pub camera: Option<CameraTarget>,
    pub eases: usize,
}

impl LoggingMap {
    pub fn new() -> Self {
        Self {
            bearing: 0.0,
            current: None,
            route: None,
            camera: None,
            eases: 0,
        }
    }

    /// The route split and the current point
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let mut fc = match self.route {
            Some(ref route) => route.to_geojson(),
            None => geojson::FeatureCollection {
                bbox: None,
                features: Vec::new(),
                foreign_members: None,
            },
        };
        if let Some(pt) = self.current {
            let mut properties = serde_json::Map::new();
            properties.insert("status".to_string(), "current".into());
            if let Some(camera) = self.camera {
                properties.insert("bearing".to_string(), camera.bearing.into());
            }
            fc.features.push(geojson::Feature {
                bbox: None,
                geometry: Some(track::point(pt)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
        fc
    }
}

impl MapView for LoggingMap {
    fn camera_bearing(&self) -> f64 {
        self.bearing
    }

    fn set_current_point(&mut self, pos: LonLat) {
        self.current = Some(pos);
    }

    fn set_route(&mut self, route: &RouteSplit) {
        self.route = Some(route.clone());
    }

    fn ease_to(&mut self, target: CameraTarget) {
        trace!(
            "Camera to {:.6}, {:.6} bearing {:.1} pitch {} zoom {}",
            target.center.x(),
            target.center.y(),
            target.bearing,
            target.pitch,
            target.zoom
        );
        // No renderer to animate, so the easing lands immediately
        self.bearing = target.bearing;
        self.camera = Some(target);
        self.eases += 1;
    }
}

//! The tunable animation parameters, and the checks they must pass before playback uses them.
//!
//! Every value crossing into the engine goes through the same checks, whether it comes from a live
//! control edit or a preset file. Checking stops at the first bad field.

use anyhow::Result;
use geom::Distance;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationControls {
    /// Move the camera along with the current point
    pub follow_current_point: bool,
    /// Add the route's heading to the camera angle
    pub auto_rotate: bool,
    pub camera_angle: f64,
    pub camera_roll: f64,
    pub pitch: f64,
    pub zoom: f64,
    /// The zoom to use while showing a photo. Serialized as `false` when disabled.
    #[serde(with = "false_or_number")]
    pub zoom_in_to_images: Option<f64>,
    pub bearing_line_length_in_meters: f64,
    pub max_bearing_diff_per_frame: f64,
    /// How long to pause on each photo, in milliseconds
    pub display_image_duration: f64,
    /// Extra milliseconds added to the cursor every frame, on top of the real elapsed time
    pub speed_multiplier: f64,
    /// Length of each camera easing, in milliseconds
    pub ease_duration: f64,
}

impl Default for AnimationControls {
    fn default() -> Self {
        Self {
            follow_current_point: true,
            auto_rotate: true,
            camera_angle: 0.0,
            camera_roll: 0.0,
            pitch: 60.0,
            zoom: 16.0,
            zoom_in_to_images: Some(17.0),
            bearing_line_length_in_meters: 200.0,
            max_bearing_diff_per_frame: 1.0,
            display_image_duration: 3000.0,
            speed_multiplier: 100.0,
            ease_duration: 0.0,
        }
    }
}

impl AnimationControls {
    pub fn validate(&self) -> Result<()> {
        validate_animation_controls(&serde_json::to_value(self)?)
    }

    pub fn bearing_line_length(&self) -> Distance {
        Distance::meters(self.bearing_line_length_in_meters)
    }

    /// Changes one parameter, identified by its preset key. Nothing changes if the new value is
    /// invalid.
    pub fn apply_edit(&mut self, key: &str, value: Value) -> Result<()> {
        let field = match FIELDS.iter().find(|f| f.key == key) {
            Some(f) => f,
            None => bail!("Unknown animation control {key}"),
        };
        field.check(&value)?;

        let mut raw = serde_json::to_value(&*self)?;
        raw[key] = value;
        *self = serde_json::from_value(raw)?;
        Ok(())
    }

    /// Parses an untrusted preset. Missing keys keep their defaults; unknown keys are ignored.
    pub fn import_preset(json: &str) -> Result<Self> {
        let preset: Value = serde_json::from_str(json)?;
        validate_animation_controls(&preset)?;

        let mut merged = serde_json::to_value(Self::default())?;
        if let (Some(out), Some(input)) = (merged.as_object_mut(), preset.as_object()) {
            for (key, value) in input {
                if FIELDS.iter().any(|f| f.key == key.as_str()) {
                    out.insert(key.clone(), value.clone());
                } else {
                    warn!("Ignoring unknown preset key {key}");
                }
            }
        }
        Ok(serde_json::from_value(merged)?)
    }

    pub fn export_preset(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Checks a full or partial set of animation controls, keyed the same way as presets. Keys that
/// aren't present aren't checked.
pub fn validate_animation_controls(value: &Value) -> Result<()> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => bail!("Animation controls must be an object"),
    };
    for field in &FIELDS {
        if let Some(value) = obj.get(field.key) {
            field.check(value)?;
        }
    }
    Ok(())
}

enum Expect {
    Boolean,
    Number { min: f64, max: f64 },
    FalseOrNumber { min: f64, max: f64 },
}

struct Field {
    key: &'static str,
    label: &'static str,
    expect: Expect,
}

impl Field {
    fn check(&self, value: &Value) -> Result<()> {
        match self.expect {
            Expect::Boolean => {
                if !value.is_boolean() {
                    bail!("{} must be of type boolean", self.label);
                }
            }
            Expect::Number { min, max } => match value.as_f64() {
                Some(x) if x >= min && x <= max => {}
                _ => bail!(
                    "{} must be of type number in range [{}, {}]",
                    self.label,
                    min,
                    max
                ),
            },
            Expect::FalseOrNumber { min, max } => match value {
                Value::Bool(false) => {}
                Value::Number(n) if n.as_f64().map(|x| x >= min && x <= max) == Some(true) => {}
                _ => bail!(
                    "{} must be either false or of type number in range [{}, {}]",
                    self.label,
                    min,
                    max
                ),
            },
        }
        Ok(())
    }
}

const FIELDS: [Field; 12] = [
    Field {
        key: "followCurrentPoint",
        label: "Follow current point",
        expect: Expect::Boolean,
    },
    Field {
        key: "autoRotate",
        label: "Auto rotate",
        expect: Expect::Boolean,
    },
    Field {
        key: "cameraAngle",
        label: "Camera angle",
        expect: Expect::Number {
            min: -360.0,
            max: 360.0,
        },
    },
    Field {
        key: "cameraRoll",
        label: "Camera roll",
        expect: Expect::Number {
            min: -360.0,
            max: 360.0,
        },
    },
    Field {
        key: "pitch",
        label: "Pitch",
        expect: Expect::Number {
            min: 0.0,
            max: 85.0,
        },
    },
    Field {
        key: "zoom",
        label: "Zoom",
        expect: Expect::Number {
            min: 0.0,
            max: 20.0,
        },
    },
    Field {
        key: "zoomInToImages",
        label: "Zoom in to images",
        expect: Expect::FalseOrNumber {
            min: 0.0,
            max: 20.0,
        },
    },
    Field {
        key: "bearingLineLengthInMeters",
        label: "Bearing line length in meters",
        expect: Expect::Number {
            min: 0.0,
            max: 100_000.0,
        },
    },
    Field {
        key: "maxBearingDiffPerFrame",
        label: "Max bearing diff per frame",
        expect: Expect::Number {
            min: 0.0,
            max: 360.0,
        },
    },
    Field {
        key: "displayImageDuration",
        label: "Display image duration",
        expect: Expect::Number {
            min: 0.0,
            max: 10_000.0,
        },
    },
    Field {
        key: "speedMultiplier",
        label: "Speed multiplier",
        expect: Expect::Number {
            min: 0.0,
            max: 1_000_000.0,
        },
    },
    Field {
        key: "easeDuration",
        label: "Ease duration",
        expect: Expect::Number {
            min: 0.0,
            max: 1000.0,
        },
    },
];

mod false_or_number {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(x) => s.serialize_f64(*x),
            None => s.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Bool(false) => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("number out of range")),
            other => Err(D::Error::custom(format!(
                "expected false or a number, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(value: Value) -> String {
        validate_animation_controls(&value).unwrap_err().to_string()
    }

    #[test]
    fn pitch_range() {
        let msg = err(json!({"pitch": 86}));
        assert!(msg.contains("Pitch"));
        assert!(msg.contains("[0, 85]"));
        assert!(validate_animation_controls(&json!({"pitch": 85})).is_ok());
        assert!(validate_animation_controls(&json!({"pitch": 0})).is_ok());
        assert!(validate_animation_controls(&json!({"pitch": -0.5})).is_err());
    }

    #[test]
    fn stops_at_the_first_bad_field() {
        let msg = err(json!({"zoom": 21, "pitch": 90, "autoRotate": "yes"}));
        assert_eq!(msg, "Auto rotate must be of type boolean");

        let msg = err(json!({"zoom": 21, "cameraAngle": -400}));
        assert_eq!(msg, "Camera angle must be of type number in range [-360, 360]");
    }

    #[test]
    fn types_are_strict() {
        assert!(err(json!({"followCurrentPoint": 1})).contains("boolean"));
        assert!(err(json!({"zoom": "12"})).contains("of type number"));
        assert!(err(json!({"easeDuration": null})).contains("[0, 1000]"));
        assert!(validate_animation_controls(&json!([1, 2])).is_err());
    }

    #[test]
    fn zoom_in_to_images_is_false_or_a_number() {
        assert!(validate_animation_controls(&json!({"zoomInToImages": false})).is_ok());
        assert!(validate_animation_controls(&json!({"zoomInToImages": 12.5})).is_ok());
        assert!(err(json!({"zoomInToImages": 25})).contains("[0, 20]"));

        let msg = AnimationControls::import_preset(r#"{"zoomInToImages": true}"#)
            .unwrap_err()
            .to_string();
        assert!(msg.contains("either false or of type number"));
    }

    #[test]
    fn defaults_are_valid() {
        AnimationControls::default().validate().unwrap();

        let mut controls = AnimationControls::default();
        controls.speed_multiplier = f64::NAN;
        assert!(controls.validate().is_err());
    }

    #[test]
    fn live_edits() {
        let mut controls = AnimationControls::default();
        controls.apply_edit("pitch", json!(30)).unwrap();
        assert_eq!(controls.pitch, 30.0);

        controls.apply_edit("zoomInToImages", json!(false)).unwrap();
        assert_eq!(controls.zoom_in_to_images, None);

        assert!(controls.apply_edit("pitch", json!(100)).is_err());
        assert_eq!(controls.pitch, 30.0);
        assert!(controls.apply_edit("volume", json!(3)).is_err());
    }

    #[test]
    fn presets() {
        let mut controls = AnimationControls::default();
        controls.zoom_in_to_images = None;
        controls.camera_roll = -15.0;
        let exported = controls.export_preset().unwrap();
        assert!(exported.contains("\"zoomInToImages\": false"));
        assert_eq!(AnimationControls::import_preset(&exported).unwrap(), controls);

        let partial =
            AnimationControls::import_preset(r#"{"zoom": 12, "theme": "dark"}"#).unwrap();
        assert_eq!(partial.zoom, 12.0);
        assert_eq!(partial.pitch, AnimationControls::default().pitch);

        assert!(AnimationControls::import_preset("not json").is_err());
    }
}

//! Movement tuning: the immutable constants every resolver call is given.
//!
//! Tuning is loaded once per session and then passed by reference. There is
//! no process-wide instance; tests build whatever tuning they need.
//!
//! # Invariants
//! - All values are finite and non-negative after `validate()`.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating tuning.
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported tuning file extension: {0:?}")]
    UnknownFormat(String),
    #[error("invalid tuning value {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },
}

/// Quake-style movement constants.
///
/// Units are world units and seconds. `friction` doubles as the scale on
/// acceleration, so raising it sharpens both stopping and starting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveTuning {
    pub gravity: f32,
    /// Floor speed used by friction: slow movers lose at least this much * friction * dt.
    pub stop_speed: f32,
    /// Cap on wish speed and on horizontal speed outside of slides.
    pub max_speed: f32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub slide_accel: f32,
    pub friction: f32,
    /// Per-component upper bound applied by sanitization.
    pub max_velocity: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
}

impl Default for MoveTuning {
    fn default() -> Self {
        Self {
            gravity: 35.0,
            stop_speed: 10.0,
            max_speed: 10.0,
            ground_accel: 2.0,
            air_accel: 1.25,
            slide_accel: 1.4,
            friction: 4.5,
            max_velocity: 1000.0,
            move_speed: 7.5,
            jump_velocity: 10.0,
        }
    }
}

impl MoveTuning {
    fn fields(&self) -> [(&'static str, f32); 10] {
        [
            ("gravity", self.gravity),
            ("stop_speed", self.stop_speed),
            ("max_speed", self.max_speed),
            ("ground_accel", self.ground_accel),
            ("air_accel", self.air_accel),
            ("slide_accel", self.slide_accel),
            ("friction", self.friction),
            ("max_velocity", self.max_velocity),
            ("move_speed", self.move_speed),
            ("jump_velocity", self.jump_velocity),
        ]
    }

    /// Reject non-finite or negative constants.
    pub fn validate(&self) -> Result<(), TuningError> {
        check_all(&self.fields())?;
        if self.max_speed > self.max_velocity {
            tracing::warn!(
                max_speed = self.max_speed,
                max_velocity = self.max_velocity,
                "max_speed exceeds max_velocity; sanitization will cap it"
            );
        }
        Ok(())
    }
}

/// How near-vertical wall contacts remove velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallAbsorption {
    /// Remove the full into-wall component.
    #[default]
    ProjectOnPlane,
    /// Remove the into-wall component from horizontal velocity only and keep `velocity.y`.
    PreserveVertical,
}

/// Capsule dimensions and collision-response thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyTuning {
    pub stand_height: f32,
    pub radius: f32,
    /// Steepest walkable surface, degrees from up.
    pub slope_limit: f32,
    /// Slope limit reported while touching a ladder, so the ladder face is walkable.
    pub ladder_slope_limit: f32,
    /// Contacts at or above this angle (degrees) are walls.
    pub wall_angle: f32,
    /// Speed above which glancing contacts bounce.
    pub bounce_speed: f32,
    /// Minimum contact angle (degrees) for a bounce.
    pub bounce_min_angle: f32,
    /// Share of the into-surface speed lost in a bounce.
    pub bounce_loss: f32,
    /// Max distance between normals for a contact to count as the same slide surface.
    pub slide_normal_tolerance: f32,
    /// Extra radius used when looking for a slide surface the sweep missed.
    pub slide_skin: f32,
    pub look_sensitivity: f32,
    pub wall_absorption: WallAbsorption,
}

impl Default for BodyTuning {
    fn default() -> Self {
        Self {
            stand_height: 1.8,
            radius: 0.45,
            slope_limit: 45.0,
            ladder_slope_limit: 91.0,
            wall_angle: 87.5,
            bounce_speed: 25.0,
            bounce_min_angle: 5.0,
            bounce_loss: 0.4,
            slide_normal_tolerance: 0.01,
            slide_skin: 0.1,
            look_sensitivity: 0.1,
            wall_absorption: WallAbsorption::ProjectOnPlane,
        }
    }
}

impl BodyTuning {
    pub fn validate(&self) -> Result<(), TuningError> {
        check_all(&[
            ("stand_height", self.stand_height),
            ("radius", self.radius),
            ("slope_limit", self.slope_limit),
            ("ladder_slope_limit", self.ladder_slope_limit),
            ("wall_angle", self.wall_angle),
            ("bounce_speed", self.bounce_speed),
            ("bounce_min_angle", self.bounce_min_angle),
            ("bounce_loss", self.bounce_loss),
            ("slide_normal_tolerance", self.slide_normal_tolerance),
            ("slide_skin", self.slide_skin),
            ("look_sensitivity", self.look_sensitivity),
        ])?;
        if self.stand_height < 2.0 * self.radius {
            return Err(TuningError::Invalid {
                field: "stand_height",
                value: self.stand_height,
                reason: "must be at least twice the radius",
            });
        }
        Ok(())
    }
}

/// Everything a session loads at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningSet {
    pub movement: MoveTuning,
    pub body: BodyTuning,
}

impl TuningSet {
    pub fn validate(&self) -> Result<(), TuningError> {
        self.movement.validate()?;
        self.body.validate()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, TuningError> {
        let set: Self = serde_yaml::from_str(text)?;
        set.validate()?;
        Ok(set)
    }

    pub fn from_json_str(text: &str) -> Result<Self, TuningError> {
        let set: Self = serde_json::from_str(text)?;
        set.validate()?;
        Ok(set)
    }

    /// Load a tuning file, choosing the format from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path)?;
        let set = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            other => return Err(TuningError::UnknownFormat(other.to_string())),
        };
        tracing::debug!(path = %path.display(), "loaded tuning");
        Ok(set)
    }
}

fn check_all(fields: &[(&'static str, f32)]) -> Result<(), TuningError> {
    for &(field, value) in fields {
        if !value.is_finite() {
            return Err(TuningError::Invalid {
                field,
                value,
                reason: "must be finite",
            });
        }
        if value < 0.0 {
            return Err(TuningError::Invalid {
                field,
                value,
                reason: "must be non-negative",
            });
        }
    }
    Ok(())
}

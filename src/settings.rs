//! Solver settings
//!
//! Persisted as JSON. Missing fields fall back to the defaults in [`crate::consts`].

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{PhysicsError, Result};

/// Physics world configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity applied to every dynamic body (scaled per body)
    pub gravity: Vec2,
    /// Fixed simulation step (seconds)
    pub fixed_dt: f32,
    /// Impulse sub-steps per tick
    pub iterations: u32,
    /// Catch-up cap per real frame
    pub max_steps_per_frame: u32,

    // === Positional correction ===
    /// Allowed penetration before correcting
    pub slop: f32,
    /// Fraction of penetration corrected per tick
    pub correction_percent: f32,

    /// Impulses at or below this are skipped
    pub impulse_threshold: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            fixed_dt: FIXED_DT,
            iterations: SOLVER_ITERATIONS,
            max_steps_per_frame: MAX_STEPS_PER_FRAME,

            slop: CORRECTION_SLOP,
            correction_percent: CORRECTION_PERCENT,

            impulse_threshold: IMPULSE_THRESHOLD,
        }
    }
}

impl PhysicsSettings {
    /// Sub-step length for one impulse iteration
    #[inline]
    pub fn sub_dt(&self) -> f32 {
        self.fixed_dt / self.iterations as f32
    }

    /// Reject settings the solver cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(PhysicsError::InvalidSettings(format!(
                "fixed_dt must be positive, got {}",
                self.fixed_dt
            )));
        }
        if self.iterations == 0 {
            return Err(PhysicsError::InvalidSettings(
                "iterations must be at least 1".into(),
            ));
        }
        if self.max_steps_per_frame == 0 {
            return Err(PhysicsError::InvalidSettings(
                "max_steps_per_frame must be at least 1".into(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidSettings(
                "gravity must be finite".into(),
            ));
        }
        for (name, value) in [
            ("slop", self.slop),
            ("correction_percent", self.correction_percent),
            ("impulse_threshold", self.impulse_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PhysicsError::InvalidSettings(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded physics settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Physics settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_consts() {
        let settings = PhysicsSettings::default();
        assert_eq!(settings.iterations, 20);
        assert_eq!(settings.gravity, Vec2::new(0.0, -9.81));
        assert!((settings.slop - 0.0008).abs() < 1e-9);
        assert!((settings.sub_dt() - FIXED_DT / 20.0).abs() < 1e-9);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = PhysicsSettings::from_json(r#"{ "gravity": [0.0, -20.0] }"#).unwrap();
        assert_eq!(settings.gravity, Vec2::new(0.0, -20.0));
        assert_eq!(settings.iterations, SOLVER_ITERATIONS);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = PhysicsSettings {
            iterations: 10,
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(PhysicsSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(PhysicsSettings::from_json(r#"{ "iterations": 0 }"#).is_err());
        assert!(PhysicsSettings::from_json(r#"{ "fixed_dt": -1.0 }"#).is_err());
        assert!(PhysicsSettings::from_json(r#"{ "slop": -0.5 }"#).is_err());
        assert!(matches!(
            PhysicsSettings::from_json("not json"),
            Err(PhysicsError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = PhysicsSettings::load("/definitely/not/here/physics.json");
        assert!(matches!(result, Err(PhysicsError::Io(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "impulse2d_settings_{}.json",
            std::process::id()
        ));
        let settings = PhysicsSettings {
            max_steps_per_frame: 3,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        let loaded = PhysicsSettings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}

//! Immutable numeric and axis conventions shared by a skeleton and its poses.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Conventions injected into a skeleton at construction.
///
/// Poses, bone derivation and IK read these through the skeleton they are
/// bound to, so every pose of one skeleton agrees on "up" and on the
/// degeneracy threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Norm below which quaternions, axes and directions count as degenerate
    pub epsilon: f32,
    /// Canonical up axis (bone capsules are modelled along it)
    pub up: Vec3,
    /// Facing direction of the character in its rest pose
    pub forward: Vec3,
    /// Default capsule radius for bone instances
    pub bone_radius: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            up: Vec3::Y,
            forward: Vec3::Z,
            bone_radius: 0.05,
        }
    }
}

impl PoseConfig {
    /// Check the invariants the math relies on.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0) {
            return Err(Error::Config(format!("epsilon must be positive, got {}", self.epsilon)));
        }
        if self.up.length() < self.epsilon || !self.up.is_finite() {
            return Err(Error::Config("up axis must be a finite non-zero vector".into()));
        }
        if self.forward.length() < self.epsilon || !self.forward.is_finite() {
            return Err(Error::Config("forward axis must be a finite non-zero vector".into()));
        }
        if self.up.normalize().cross(self.forward.normalize()).length() < 1e-4 {
            return Err(Error::Config("up and forward axes must not be parallel".into()));
        }
        if !(self.bone_radius > 0.0) {
            return Err(Error::Config(format!("bone_radius must be positive, got {}", self.bone_radius)));
        }
        Ok(())
    }

    /// Copy with both axes normalized.
    pub fn normalized(&self) -> Self {
        Self {
            up: self.up.normalize(),
            forward: self.forward.normalize(),
            ..self.clone()
        }
    }

    /// Save to file as pretty JSON (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file and validate (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: PoseConfig = serde_json::from_str(&json)?;
        config.validate()?;
        log::debug!("Loaded pose config from {}", path.display());
        Ok(config.normalized())
    }
}

//! Physical material shared by rigid bodies

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

/// Immutable density/restitution pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Mass per unit of collider area
    density: f32,
    /// Bounciness; the smaller of two materials wins on contact
    restitution: f32,
}

impl Material {
    /// Zero density is allowed and yields a massless (immovable) body
    pub fn new(density: f32, restitution: f32) -> Result<Self> {
        if !(density.is_finite() && density >= 0.0) {
            return Err(PhysicsError::InvalidMaterial(format!(
                "density must be non-negative, got {density}"
            )));
        }
        if !restitution.is_finite() {
            return Err(PhysicsError::InvalidMaterial(format!(
                "restitution must be finite, got {restitution}"
            )));
        }
        Ok(Self {
            density,
            restitution,
        })
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Restitution used for a contact between two materials
    #[inline]
    pub fn combined_restitution(&self, other: &Material) -> f32 {
        self.restitution.min(other.restitution)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            restitution: 0.0,
        }
    }
}

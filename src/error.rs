//! Error types for physics construction and state changes.
//!
//! Nothing inside a simulation tick returns an error; every variant here is
//! raised by a construction call or an illegal mutation, before any effect.

use thiserror::Error;

use crate::scene::EntityId;
use crate::sim::{BodyId, ColliderId};

/// Errors raised by the physics world and its collaborators.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A shape dimension was zero, negative or not finite.
    #[error("invalid {what}: {value} (must be positive and finite)")]
    InvalidDimension {
        /// Which dimension was rejected.
        what: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Material parameters out of range.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// A second collider or rigid body was attached to the same entity.
    #[error("entity {entity:?} already has a {kind}")]
    DuplicateComponent {
        /// Owning entity.
        entity: EntityId,
        /// Component kind name.
        kind: &'static str,
    },

    /// A component another one depends on is absent.
    #[error("entity {entity:?} has no {kind}")]
    MissingComponent {
        /// Entity that was searched.
        entity: EntityId,
        /// Component kind name.
        kind: &'static str,
    },

    /// Entity handle does not exist in the scene.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    /// Collider handle does not exist (or was destroyed).
    #[error("unknown collider {0:?}")]
    UnknownCollider(ColliderId),

    /// Rigid body handle does not exist (or was destroyed).
    #[error("unknown rigid body {0:?}")]
    UnknownBody(BodyId),

    /// Kinematic bodies ignore forces.
    #[error("cannot add force to kinematic body {0:?}")]
    ForceOnKinematic(BodyId),

    /// `move_to` only drives kinematic bodies.
    #[error("body {0:?} is not kinematic and cannot be moved directly")]
    NotKinematic(BodyId),

    /// Kinematic move parameters must be non-negative and finite.
    #[error("invalid {what}: {value} (must be non-negative and finite)")]
    InvalidMotion {
        /// Which parameter was rejected.
        what: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Static transforms are immovable.
    #[error("transform of entity {0:?} is static")]
    StaticTransform(EntityId),

    /// Reparenting would make an entity its own ancestor.
    #[error("reparenting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle {
        /// Entity being moved.
        child: EntityId,
        /// Requested new parent.
        parent: EntityId,
    },

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be read or written.
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),

    /// Settings JSON was malformed.
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
}

impl PhysicsError {
    /// Checks that a dimension is strictly positive and finite.
    pub(crate) fn check_dimension(what: &'static str, value: f32) -> Result<f32> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(PhysicsError::InvalidDimension { what, value })
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimension() {
        assert!(PhysicsError::check_dimension("radius", 1.0).is_ok());
        assert!(PhysicsError::check_dimension("radius", 0.0).is_err());
        assert!(PhysicsError::check_dimension("radius", -2.0).is_err());
        assert!(PhysicsError::check_dimension("radius", f32::NAN).is_err());
        assert!(PhysicsError::check_dimension("radius", f32::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = PhysicsError::InvalidDimension {
            what: "half width",
            value: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid half width: -1 (must be positive and finite)"
        );
        let err = PhysicsError::ForceOnKinematic(BodyId(3));
        assert!(err.to_string().contains("kinematic"));
    }
}

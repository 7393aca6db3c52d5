//! Collider shapes bound to an entity transform
//!
//! A collider keeps two copies of its shape: the local one it was built with
//! and a world-space one scaled by the owning transform. The world copy is only
//! recomputed when the transform's scale changes. Rotation is never applied:
//! boxes are always treated as axis-aligned.

use std::collections::BTreeSet;
use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::scene::EntityId;

/// Handle to a collider in a [`super::PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub(crate) u32);

impl ColliderId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shape kind tag (for logging and dispatch tables)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Box,
}

/// Collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned box given by half extents
    Box { half_extents: Vec2 },
}

impl Shape {
    pub fn circle(radius: f32) -> Result<Self> {
        let radius = PhysicsError::check_dimension("radius", radius)?;
        Ok(Shape::Circle { radius })
    }

    pub fn rect(half_width: f32, half_height: f32) -> Result<Self> {
        let half_width = PhysicsError::check_dimension("half width", half_width)?;
        let half_height = PhysicsError::check_dimension("half height", half_height)?;
        Ok(Shape::Box {
            half_extents: Vec2::new(half_width, half_height),
        })
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Box { .. } => ShapeKind::Box,
        }
    }

    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => PI * radius * radius,
            Shape::Box { half_extents } => 4.0 * half_extents.x * half_extents.y,
        }
    }

    /// Apply a transform scale. Circles take the larger axis so they stay round.
    pub fn scaled(&self, scale: Vec2) -> Self {
        let scale = scale.abs();
        match *self {
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * scale.max_element(),
            },
            Shape::Box { half_extents } => Shape::Box {
                half_extents: half_extents * scale,
            },
        }
    }
}

/// A shape attached to exactly one entity
#[derive(Debug, Clone)]
pub struct Collider {
    entity: EntityId,
    shape: Shape,
    /// Scale the world shape was last computed for
    cached_scale: Vec2,
    world_shape: Shape,
    area: f32,
    /// Colliders currently overlapping this one
    pub(crate) touching: BTreeSet<ColliderId>,
    pub(crate) enabled: bool,
    pub(crate) is_static: bool,
}

impl Collider {
    pub(crate) fn new(entity: EntityId, shape: Shape, scale: Vec2, is_static: bool) -> Self {
        let world_shape = shape.scaled(scale);
        Self {
            entity,
            shape,
            cached_scale: scale,
            world_shape,
            area: world_shape.area(),
            touching: BTreeSet::new(),
            enabled: false,
            is_static,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Shape as constructed, before scaling
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Shape in world units (scaled by the owning transform)
    pub fn world_shape(&self) -> &Shape {
        &self.world_shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// World-space area, used for mass derivation
    pub fn area(&self) -> f32 {
        self.area
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Colliders currently overlapping this one
    pub fn touching(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.touching.iter().copied()
    }

    /// Recompute world geometry if the transform scale changed.
    /// Returns whether anything was recomputed.
    pub(crate) fn refresh_geometry(&mut self, scale: Vec2) -> bool {
        if scale == self.cached_scale {
            return false;
        }
        self.cached_scale = scale;
        self.world_shape = self.shape.scaled(scale);
        self.area = self.world_shape.area();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_constructors_validate() {
        assert!(Shape::circle(1.0).is_ok());
        assert!(Shape::circle(0.0).is_err());
        assert!(Shape::rect(1.0, 2.0).is_ok());
        assert!(Shape::rect(1.0, -2.0).is_err());
        assert!(Shape::rect(f32::NAN, 2.0).is_err());
    }

    #[test]
    fn test_area() {
        let circle = Shape::circle(2.0).unwrap();
        assert!((circle.area() - 4.0 * PI).abs() < 1e-4);
        let rect = Shape::rect(1.0, 2.0).unwrap();
        assert_eq!(rect.area(), 8.0);
    }

    #[test]
    fn test_scaled_shapes() {
        let circle = Shape::circle(1.0).unwrap().scaled(Vec2::new(2.0, -3.0));
        assert_eq!(circle, Shape::Circle { radius: 3.0 });

        let rect = Shape::rect(1.0, 2.0).unwrap().scaled(Vec2::new(-2.0, 0.5));
        assert_eq!(
            rect,
            Shape::Box {
                half_extents: Vec2::new(2.0, 1.0)
            }
        );
    }

    #[test]
    fn test_refresh_only_on_scale_change() {
        let mut collider = Collider::new(EntityId(0), Shape::rect(1.0, 1.0).unwrap(), Vec2::ONE, false);
        assert_eq!(collider.area(), 4.0);

        assert!(!collider.refresh_geometry(Vec2::ONE));
        assert!(collider.refresh_geometry(Vec2::splat(2.0)));
        assert_eq!(collider.area(), 16.0);
        assert_eq!(
            *collider.world_shape(),
            Shape::Box {
                half_extents: Vec2::splat(2.0)
            }
        );
        assert_eq!(*collider.shape(), Shape::rect(1.0, 1.0).unwrap());
    }
}

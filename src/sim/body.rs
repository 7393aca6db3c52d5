//! Rigid body state
//!
//! Positions are not stored here: a body moves by translating its entity's
//! transform. The body holds velocity, accumulated force and mass.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::material::Material;
use crate::error::{PhysicsError, Result};
use crate::scene::EntityId;

/// Handle to a rigid body in a [`super::PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub(crate) u32);

impl BodyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dynamic, kinematic or static physical state of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    id: BodyId,
    entity: EntityId,
    material: Material,
    is_kinematic: bool,
    pub velocity: Vec2,
    force: Vec2,
    pub gravity_scale: f32,
    mass: f32,
    inv_mass: f32,
    pub(crate) enabled: bool,
    pub(crate) is_static: bool,
}

impl RigidBody {
    pub(crate) fn new(id: BodyId, entity: EntityId, material: Material, is_static: bool) -> Self {
        Self {
            id,
            entity,
            material,
            is_kinematic: false,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            gravity_scale: 1.0,
            mass: 0.0,
            inv_mass: 0.0,
            enabled: false,
            is_static,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn is_kinematic(&self) -> bool {
        self.is_kinematic
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Moved by the solver (integration, impulses, correction)
    #[inline]
    pub fn is_movable(&self) -> bool {
        !self.is_static && !self.is_kinematic
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Zero for massless and kinematic bodies
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Inverse mass seen by the solver: static bodies are immovable too
    #[inline]
    pub fn solver_inv_mass(&self) -> f32 {
        if self.is_static { 0.0 } else { self.inv_mass }
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    /// Accumulate a force until the end of the current tick
    pub fn add_force(&mut self, force: Vec2) -> Result<()> {
        if self.is_kinematic {
            return Err(PhysicsError::ForceOnKinematic(self.id));
        }
        self.force += force;
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub(crate) fn set_kinematic_flag(&mut self, kinematic: bool) {
        self.is_kinematic = kinematic;
    }

    /// Store a freshly derived mass and keep `inv_mass` consistent with it
    pub(crate) fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.inv_mass = if mass == 0.0 || self.is_kinematic {
            0.0
        } else {
            1.0 / mass
        };
    }

    /// Half-step of force and gravity integration
    pub(crate) fn integrate_forces(&mut self, gravity: Vec2, half_dt: f32) {
        self.velocity += (self.force * self.inv_mass + gravity * self.gravity_scale) * half_dt;
    }

    pub(crate) fn clear_force(&mut self) {
        self.force = Vec2::ZERO;
    }
}

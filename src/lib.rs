//! impulse2d - fixed-step 2D rigid-body physics
//!
//! Core modules:
//! - `sim`: Deterministic simulation (colliders, bodies, narrow phase, contacts, solver)
//! - `scene`: Minimal entity hierarchy the simulation reads transforms from
//! - `settings`: Serializable solver configuration
//! - `error`: Construction and state-change errors

pub mod error;
pub mod scene;
pub mod settings;
pub mod sim;

pub use error::{PhysicsError, Result};
pub use scene::{EntityId, GlobalTransform, Scene, Transform};
pub use settings::PhysicsSettings;
pub use sim::{
    BodyId, Collider, ColliderId, Contact, ContactContext, ContactEvent, ContactKind, ContactListener,
    FixedStepper, Manifold, Material, PhysicsWorld, RigidBody, Shape, ShapeKind,
};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    use glam::Vec2;

    /// Fixed simulation timestep (60 Hz)
    pub const FIXED_DT: f32 = 1.0 / 60.0;
    /// Maximum fixed ticks per real frame to prevent spiral of death
    pub const MAX_STEPS_PER_FRAME: u32 = 8;
    /// Impulse solver sub-steps per tick
    pub const SOLVER_ITERATIONS: u32 = 20;

    /// Default world gravity (units/s²)
    pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.81);

    /// Penetration allowed before positional correction kicks in
    pub const CORRECTION_SLOP: f32 = 0.0008;
    /// Fraction of the remaining penetration removed per tick
    pub const CORRECTION_PERCENT: f32 = 0.2;
    /// Impulses at or below this magnitude are dropped (anti-jitter)
    pub const IMPULSE_THRESHOLD: f32 = 0.025;

    /// Normal used when two circle centers coincide
    pub const FALLBACK_NORMAL: Vec2 = Vec2::Y;
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Sign that treats zero as positive (axis selection never yields a zero normal)
#[inline]
pub fn sign_or_one(x: f32) -> f32 {
    if x < 0.0 { -1.0 } else { 1.0 }
}

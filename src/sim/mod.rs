//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by handle)
//! - No rendering or platform dependencies

pub mod body;
pub mod collider;
pub mod collision;
pub mod contacts;
pub mod material;
pub mod tick;
pub mod world;

pub use body::{BodyId, RigidBody};
pub use collider::{Collider, ColliderId, Shape, ShapeKind};
pub use collision::{Manifold, collide};
pub use contacts::{Contact, ContactContext, ContactEvent, ContactKind, ContactListener};
pub use material::Material;
pub use tick::FixedStepper;
pub use world::PhysicsWorld;

//! Physics world: component storage, registries and lifecycle
//!
//! Colliders and rigid bodies live in arenas addressed by handle. The world
//! keeps three registries, mutated only on enable/disable/destroy:
//! - live colliders (every enabled collider)
//! - dynamic colliders (enabled, not on a static transform)
//! - dynamic bodies (enabled, not on a static transform)
//!
//! Registries are ordered sets so every tick iterates in handle order.

use std::collections::{BTreeSet, HashMap};

use glam::Vec2;

use super::body::{BodyId, RigidBody};
use super::collider::{Collider, ColliderId, Shape};
use super::material::Material;
use super::tick::FixedStepper;
use crate::error::{PhysicsError, Result};
use crate::scene::{EntityId, Scene};
use crate::settings::PhysicsSettings;

/// Owns every collider and rigid body of one simulation
pub struct PhysicsWorld {
    pub(crate) settings: PhysicsSettings,
    pub(crate) stepper: FixedStepper,
    pub(crate) ticks: u64,

    pub(crate) colliders: Vec<Option<Collider>>,
    pub(crate) bodies: Vec<Option<RigidBody>>,
    collider_by_entity: HashMap<EntityId, ColliderId>,
    body_by_entity: HashMap<EntityId, BodyId>,

    pub(crate) live_colliders: BTreeSet<ColliderId>,
    pub(crate) dynamic_colliders: BTreeSet<ColliderId>,
    pub(crate) dynamic_bodies: BTreeSet<BodyId>,

    /// Resolved ancestor body per collider, valid for `cache_version`
    body_cache: HashMap<ColliderId, Option<BodyId>>,
    cache_version: u64,

    /// Set while the pair scan runs; destruction is deferred meanwhile
    pub(crate) scanning: bool,
    pub(crate) doomed_colliders: BTreeSet<ColliderId>,
    pub(crate) doomed_bodies: BTreeSet<BodyId>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::with_settings(PhysicsSettings::default())
    }
}

impl PhysicsWorld {
    /// Create a world after validating its settings
    pub fn new(settings: PhysicsSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::with_settings(settings))
    }

    fn with_settings(settings: PhysicsSettings) -> Self {
        Self {
            stepper: FixedStepper::new(settings.fixed_dt, settings.max_steps_per_frame),
            settings,
            ticks: 0,
            colliders: Vec::new(),
            bodies: Vec::new(),
            collider_by_entity: HashMap::new(),
            body_by_entity: HashMap::new(),
            live_colliders: BTreeSet::new(),
            dynamic_colliders: BTreeSet::new(),
            dynamic_bodies: BTreeSet::new(),
            body_cache: HashMap::new(),
            cache_version: 0,
            scanning: false,
            doomed_colliders: BTreeSet::new(),
            doomed_bodies: BTreeSet::new(),
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn gravity(&self) -> Vec2 {
        self.settings.gravity
    }

    /// Override gravity for every body in this world
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.settings.gravity = gravity;
    }

    /// Fixed ticks simulated so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // === Colliders ===

    /// Attach a collider to `entity` and enable it
    pub fn add_collider(&mut self, scene: &Scene, entity: EntityId, shape: Shape) -> Result<ColliderId> {
        if !scene.contains(entity) {
            return Err(PhysicsError::UnknownEntity(entity));
        }
        if self.collider_by_entity.contains_key(&entity) {
            return Err(PhysicsError::DuplicateComponent {
                entity,
                kind: "collider",
            });
        }

        let id = ColliderId(self.colliders.len() as u32);
        let scale = scene.global_transform(entity).scale;
        self.colliders
            .push(Some(Collider::new(entity, shape, scale, scene.is_static(entity))));
        self.collider_by_entity.insert(entity, id);
        self.set_collider_enabled(scene, id, true)?;
        Ok(id)
    }

    /// Enable registers the collider (and refreshes its geometry); disable
    /// deregisters it and silently drops its contact memberships.
    pub fn set_collider_enabled(&mut self, scene: &Scene, id: ColliderId, enabled: bool) -> Result<()> {
        let entity = self
            .collider(id)
            .ok_or(PhysicsError::UnknownCollider(id))?
            .entity();
        let scale = scene.global_transform(entity).scale;

        let collider = self.collider_slot(id)?;
        if collider.enabled == enabled {
            return Ok(());
        }
        collider.enabled = enabled;

        if enabled {
            collider.refresh_geometry(scale);
            let (is_static, kind) = (collider.is_static, collider.kind());
            self.live_colliders.insert(id);
            if !is_static {
                self.dynamic_colliders.insert(id);
            }
            log::debug!("Collider {:?} ({:?}) registered", id, kind);
        } else {
            self.deregister_collider(id);
            log::debug!("Collider {:?} disabled", id);
        }
        Ok(())
    }

    /// Destroy a collider. During the pair scan the collider is only marked and
    /// removed once the scan ends.
    pub fn destroy_collider(&mut self, id: ColliderId) -> Result<()> {
        self.collider_slot(id)?;
        if self.scanning {
            self.doomed_colliders.insert(id);
            return Ok(());
        }
        self.remove_collider(id);
        Ok(())
    }

    fn remove_collider(&mut self, id: ColliderId) {
        self.deregister_collider(id);
        if let Some(collider) = self.colliders[id.index()].take() {
            self.collider_by_entity.remove(&collider.entity());
        }
        self.body_cache.remove(&id);
        log::debug!("Collider {:?} destroyed", id);
    }

    fn deregister_collider(&mut self, id: ColliderId) {
        self.live_colliders.remove(&id);
        self.dynamic_colliders.remove(&id);
        let touching = self.colliders[id.index()]
            .as_mut()
            .map(|c| std::mem::take(&mut c.touching))
            .unwrap_or_default();
        for other in touching {
            if let Some(other) = self.colliders[other.index()].as_mut() {
                other.touching.remove(&id);
            }
        }
    }

    // === Rigid bodies ===

    /// Attach a rigid body to `entity`, enable it and derive its mass
    pub fn add_rigid_body(&mut self, scene: &Scene, entity: EntityId, material: Material) -> Result<BodyId> {
        if !scene.contains(entity) {
            return Err(PhysicsError::UnknownEntity(entity));
        }
        if self.body_by_entity.contains_key(&entity) {
            return Err(PhysicsError::DuplicateComponent {
                entity,
                kind: "rigid body",
            });
        }

        let id = BodyId(self.bodies.len() as u32);
        self.bodies
            .push(Some(RigidBody::new(id, entity, material, scene.is_static(entity))));
        self.body_by_entity.insert(entity, id);
        self.set_body_enabled(scene, id, true)?;
        Ok(id)
    }

    pub fn set_body_enabled(&mut self, scene: &Scene, id: BodyId, enabled: bool) -> Result<()> {
        let body = self.body_slot(id)?;
        if body.enabled == enabled {
            return Ok(());
        }
        body.enabled = enabled;
        let is_static = body.is_static;
        self.body_cache.clear();

        if enabled {
            if !is_static {
                self.dynamic_bodies.insert(id);
            }
            self.refresh_mass(scene, id)?;
            log::debug!("Rigid body {:?} registered", id);
        } else {
            self.dynamic_bodies.remove(&id);
            log::debug!("Rigid body {:?} disabled", id);
        }
        Ok(())
    }

    /// Destroy a body. Deferred while the pair scan runs.
    pub fn destroy_body(&mut self, id: BodyId) -> Result<()> {
        self.body_slot(id)?;
        if self.scanning {
            self.doomed_bodies.insert(id);
            return Ok(());
        }
        self.remove_body(id);
        Ok(())
    }

    fn remove_body(&mut self, id: BodyId) {
        self.dynamic_bodies.remove(&id);
        if let Some(body) = self.bodies[id.index()].take() {
            self.body_by_entity.remove(&body.entity());
        }
        self.body_cache.clear();
        log::debug!("Rigid body {:?} destroyed", id);
    }

    /// Destroy whatever collider and body `entity` carries
    pub fn destroy_entity_components(&mut self, entity: EntityId) -> Result<()> {
        if let Some(id) = self.collider_of(entity) {
            self.destroy_collider(id)?;
        }
        if let Some(id) = self.body_of(entity) {
            self.destroy_body(id)?;
        }
        Ok(())
    }

    /// Remove everything destroyed during the last pair scan
    pub(crate) fn flush_doomed(&mut self) {
        for id in std::mem::take(&mut self.doomed_colliders) {
            if self.collider(id).is_some() {
                self.remove_collider(id);
            }
        }
        for id in std::mem::take(&mut self.doomed_bodies) {
            if self.body(id).is_some() {
                self.remove_body(id);
            }
        }
    }

    /// Switch between kinematic and dynamic; mass is re-derived either way
    pub fn set_kinematic(&mut self, scene: &Scene, id: BodyId, kinematic: bool) -> Result<()> {
        let body = self.body_slot(id)?;
        body.set_kinematic_flag(kinematic);
        if kinematic {
            body.clear_force();
        }
        self.refresh_mass(scene, id)?;
        Ok(())
    }

    /// Derive mass from every collider in the body's sub-tree, stopping at
    /// descendants that carry their own rigid body.
    pub fn refresh_mass(&mut self, scene: &Scene, id: BodyId) -> Result<f32> {
        let entity = self.body_slot(id)?.entity();
        let area = self.subtree_area(scene, entity);
        let body = self.body_slot(id)?;
        let mass = area * body.material().density();
        body.set_mass(mass);
        log::debug!(
            "Rigid body {:?} mass {:.4} (area {:.4}, inv {:.4})",
            id,
            mass,
            area,
            body.inv_mass()
        );
        Ok(mass)
    }

    fn subtree_area(&self, scene: &Scene, entity: EntityId) -> f32 {
        let own = self
            .collider_of(entity)
            .and_then(|id| self.collider(id))
            .map_or(0.0, |c| c.area());
        let nested: f32 = scene
            .children(entity)
            .iter()
            .filter(|child| !self.body_by_entity.contains_key(*child))
            .map(|&child| self.subtree_area(scene, child))
            .sum();
        own + nested
    }

    /// Drive a kinematic body toward `target` at `speed` over `dt`
    pub fn move_to(
        &mut self,
        scene: &mut Scene,
        id: BodyId,
        target: Vec2,
        speed: f32,
        dt: f32,
    ) -> Result<()> {
        for (what, value) in [("speed", speed), ("move step", dt)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidMotion { what, value });
            }
        }
        let body = self.body_slot(id)?;
        if !body.is_kinematic() {
            return Err(PhysicsError::NotKinematic(id));
        }
        let entity = body.entity();
        if body.is_static() {
            return Err(PhysicsError::StaticTransform(entity));
        }

        let to_target = target - scene.global_transform(entity).position;
        let distance = to_target.length();
        // At the target (or paused with zero reach) the direction is undefined: snap
        let delta = if distance <= speed * dt {
            body.velocity = Vec2::ZERO;
            to_target
        } else {
            body.velocity = to_target / distance * speed;
            body.velocity * dt
        };
        scene.translate(entity, delta)
    }

    // === Lookups ===

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id.index()).and_then(Option::as_ref)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.index()).and_then(Option::as_ref)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn collider_of(&self, entity: EntityId) -> Option<ColliderId> {
        self.collider_by_entity.get(&entity).copied()
    }

    pub fn body_of(&self, entity: EntityId) -> Option<BodyId> {
        self.body_by_entity.get(&entity).copied()
    }

    /// Like [`Self::body_of`] but reports the missing dependency as an error
    pub fn require_body(&self, entity: EntityId) -> Result<BodyId> {
        self.body_of(entity).ok_or(PhysicsError::MissingComponent {
            entity,
            kind: "rigid body",
        })
    }

    /// Nearest enabled rigid body on the collider's entity or its ancestors.
    ///
    /// Cached per collider; the cache is dropped whenever the hierarchy or the
    /// set of bodies changes.
    pub fn rigid_body_for(&mut self, scene: &Scene, collider: ColliderId) -> Option<BodyId> {
        if self.cache_version != scene.hierarchy_version() {
            self.body_cache.clear();
            self.cache_version = scene.hierarchy_version();
        }
        if let Some(&cached) = self.body_cache.get(&collider) {
            return cached.filter(|id| !self.doomed_bodies.contains(id));
        }

        let entity = self.collider(collider)?.entity();
        let found = scene.ancestors(entity).find_map(|e| {
            self.body_of(e)
                .filter(|&id| self.body(id).is_some_and(|b| b.enabled))
        });
        self.body_cache.insert(collider, found);
        found.filter(|id| !self.doomed_bodies.contains(id))
    }

    /// Colliders currently overlapping `id`
    pub fn touching(&self, id: ColliderId) -> impl Iterator<Item = ColliderId> + '_ {
        self.collider(id).into_iter().flat_map(|c| c.touching())
    }

    pub fn is_touching(&self, a: ColliderId, b: ColliderId) -> bool {
        self.collider(a).is_some_and(|c| c.touching.contains(&b))
    }

    pub fn live_colliders(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.live_colliders.iter().copied()
    }

    pub fn dynamic_colliders(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.dynamic_colliders.iter().copied()
    }

    pub fn dynamic_bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.dynamic_bodies.iter().copied()
    }

    fn collider_slot(&mut self, id: ColliderId) -> Result<&mut Collider> {
        self.colliders
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownCollider(id))
    }

    fn body_slot(&mut self, id: BodyId) -> Result<&mut RigidBody> {
        self.bodies
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownBody(id))
    }
}

//! Fixed timestep simulation tick
//!
//! Each tick runs, in order:
//! 1. geometry refresh for dynamic colliders (only when scale changed)
//! 2. mass is already current (re-derived on enable / kinematic toggle)
//! 3. all-pairs contact detection with Enter/Exit events
//! 4. `iterations` sub-steps: half force step, impulses, position, half force step
//! 5. positional correction, once per contact
//! 6. force reset

use glam::Vec2;

use super::body::{BodyId, RigidBody};
use super::contacts::Contact;
use super::world::PhysicsWorld;
use crate::scene::Scene;

/// Converts variable frame time into a whole number of fixed ticks
#[derive(Debug, Clone)]
pub struct FixedStepper {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulator: 0.0,
        }
    }

    /// Add a frame's worth of time and return how many ticks to run.
    ///
    /// Time beyond `max_steps` ticks is dropped so a long stall never turns
    /// into a spiral of catch-up ticks.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);

        let budget = self.step * self.max_steps as f32;
        if self.accumulator > budget {
            log::warn!(
                "Physics falling behind, dropping {:.3}s of simulated time",
                self.accumulator - budget
            );
            self.accumulator = budget;
        }

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    /// Leftover fraction of a tick, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl PhysicsWorld {
    /// Advance by a real frame time; returns the number of fixed ticks run so
    /// callers can step other fixed-rate systems the same amount.
    pub fn update(&mut self, scene: &mut Scene, frame_dt: f32) -> u32 {
        let ticks = self.stepper.advance(frame_dt);
        for _ in 0..ticks {
            self.step(scene);
        }
        ticks
    }

    /// Leftover fraction of a tick after the last [`Self::update`]
    pub fn interpolation_alpha(&self) -> f32 {
        self.stepper.alpha()
    }

    /// Run exactly one fixed tick
    pub fn step(&mut self, scene: &mut Scene) {
        self.refresh_geometry(scene);

        let contacts = self.detect_contacts(scene);

        let movers: Vec<BodyId> = self
            .dynamic_bodies
            .iter()
            .copied()
            .filter(|&id| self.body(id).is_some_and(RigidBody::is_movable))
            .collect();

        let gravity = self.settings.gravity;
        let h = self.settings.sub_dt();
        let half = h * 0.5;
        let threshold = self.settings.impulse_threshold;

        for _ in 0..self.settings.iterations {
            for &id in &movers {
                if let Some(body) = self.body_mut(id) {
                    body.integrate_forces(gravity, half);
                }
            }

            for contact in &contacts {
                if let Some((a, b)) = self.body_pair_mut(contact.body_a, contact.body_b) {
                    apply_impulse(a, b, contact.normal, threshold);
                }
            }

            for &id in &movers {
                let Some(body) = self.body_mut(id) else {
                    continue;
                };
                let (entity, delta) = (body.entity(), body.velocity * h);
                body.integrate_forces(gravity, half);
                if let Err(err) = scene.translate(entity, delta) {
                    log::warn!("Integration skipped for {:?}: {err}", id);
                }
            }
        }

        for contact in &contacts {
            self.correct_position(scene, contact);
        }

        for id in self.dynamic_bodies.iter() {
            if let Some(body) = self.bodies[id.index()].as_mut() {
                body.clear_force();
            }
        }

        self.ticks += 1;
    }

    fn refresh_geometry(&mut self, scene: &Scene) {
        for id in self.dynamic_colliders.iter() {
            let Some(collider) = self.colliders[id.index()].as_mut() else {
                continue;
            };
            let scale = scene.global_transform(collider.entity()).scale;
            if collider.refresh_geometry(scale) {
                log::trace!("Collider {:?} rescaled to {:?}", id, scale);
            }
        }
    }

    /// Push both bodies apart along the normal (Baumgarte, one shot)
    fn correct_position(&mut self, scene: &mut Scene, contact: &Contact) {
        let (Some(a), Some(b)) = (self.body(contact.body_a), self.body(contact.body_b)) else {
            return;
        };
        let Some(correction) = positional_correction(
            a,
            b,
            contact.normal,
            contact.depth,
            self.settings.slop,
            self.settings.correction_percent,
        ) else {
            return;
        };

        for (body, delta) in [
            (a, -correction * a.solver_inv_mass()),
            (b, correction * b.solver_inv_mass()),
        ] {
            if !body.is_movable() {
                continue;
            }
            if let Err(err) = scene.translate(body.entity(), delta) {
                log::warn!("Correction skipped for {:?}: {err}", body.id());
            }
        }
    }

    fn body_pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut RigidBody, &mut RigidBody)> {
        let (ia, ib) = (a.index(), b.index());
        if ia == ib || ia >= self.bodies.len() || ib >= self.bodies.len() {
            return None;
        }
        let (a, b) = if ia < ib {
            let (lo, hi) = self.bodies.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.bodies.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };
        Some((a.as_mut()?, b.as_mut()?))
    }
}

/// Resolve the normal component of relative velocity.
///
/// Returns the impulse magnitude applied, or `None` when the bodies are
/// already separating, both are immovable, or the impulse is below
/// `threshold`.
pub fn apply_impulse(a: &mut RigidBody, b: &mut RigidBody, normal: Vec2, threshold: f32) -> Option<f32> {
    let vel_along_normal = (b.velocity - a.velocity).dot(normal);
    if vel_along_normal >= 0.0 {
        return None;
    }

    let (inv_a, inv_b) = (a.solver_inv_mass(), b.solver_inv_mass());
    let inv_sum = inv_a + inv_b;
    if inv_sum == 0.0 {
        return None;
    }

    let e = a.material().combined_restitution(b.material());
    let j = -(1.0 + e) * vel_along_normal / inv_sum;
    if j <= threshold {
        return None;
    }

    let impulse = normal * j;
    a.velocity -= impulse * inv_a;
    b.velocity += impulse * inv_b;
    Some(j)
}

/// Correction vector along the normal, before per-body inverse-mass weighting
pub fn positional_correction(
    a: &RigidBody,
    b: &RigidBody,
    normal: Vec2,
    depth: f32,
    slop: f32,
    percent: f32,
) -> Option<Vec2> {
    let inv_sum = a.solver_inv_mass() + b.solver_inv_mass();
    if inv_sum == 0.0 {
        return None;
    }
    Some(normal * ((depth - slop).max(0.0) / inv_sum) * percent)
}

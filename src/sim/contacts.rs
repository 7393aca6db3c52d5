//! Contact tracking and event delivery
//!
//! Every tick the world tests every ordered pair of live colliders, updates
//! each collider's set of touching colliders and fires Enter/Exit events on
//! transitions. A pair whose sides both resolve a rigid body is a Collision,
//! a pair with exactly one body is a Trigger, and a pair with none is tracked
//! silently.

use glam::Vec2;

use super::body::BodyId;
use super::collider::ColliderId;
use super::collision::collide;
use super::world::PhysicsWorld;
use crate::scene::{EntityId, Scene};

/// Transient contact handed to the solver (rebuilt every tick)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub collider_a: ColliderId,
    pub collider_b: ColliderId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Unit normal from A toward B
    pub normal: Vec2,
    pub depth: f32,
}

/// Physical collision or sensor overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Both sides carry a rigid body
    Collision,
    /// Exactly one side carries a rigid body
    Trigger,
}

/// Notification delivered to [`ContactListener`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactEvent {
    CollisionEnter,
    CollisionExit,
    TriggerEnter,
    TriggerExit,
}

impl ContactEvent {
    pub fn new(kind: ContactKind, entering: bool) -> Self {
        match (kind, entering) {
            (ContactKind::Collision, true) => ContactEvent::CollisionEnter,
            (ContactKind::Collision, false) => ContactEvent::CollisionExit,
            (ContactKind::Trigger, true) => ContactEvent::TriggerEnter,
            (ContactKind::Trigger, false) => ContactEvent::TriggerExit,
        }
    }

    pub fn kind(self) -> ContactKind {
        match self {
            ContactEvent::CollisionEnter | ContactEvent::CollisionExit => ContactKind::Collision,
            ContactEvent::TriggerEnter | ContactEvent::TriggerExit => ContactKind::Trigger,
        }
    }

    pub fn is_enter(self) -> bool {
        matches!(self, ContactEvent::CollisionEnter | ContactEvent::TriggerEnter)
    }

    /// Gameplay-facing callback name
    pub fn name(self) -> &'static str {
        match self {
            ContactEvent::CollisionEnter => "onCollisionEnter",
            ContactEvent::CollisionExit => "onCollisionExit",
            ContactEvent::TriggerEnter => "onTriggerEnter",
            ContactEvent::TriggerExit => "onTriggerExit",
        }
    }
}

/// Gameplay hook for contact transitions. Every method defaults to a no-op.
///
/// `other` is always the collider on the far side of the contact.
pub trait ContactListener {
    fn on_collision_enter(&mut self, _other: ColliderId, _ctx: &mut ContactContext) {}
    fn on_collision_exit(&mut self, _other: ColliderId, _ctx: &mut ContactContext) {}
    fn on_trigger_enter(&mut self, _other: ColliderId, _ctx: &mut ContactContext) {}
    fn on_trigger_exit(&mut self, _other: ColliderId, _ctx: &mut ContactContext) {}
}

/// Side-channel handed to listeners during the pair scan.
///
/// Destruction requested here takes effect immediately for the rest of the
/// tick (the objects stop taking part in pair tests and solving) and the
/// objects are removed once the scan finishes.
#[derive(Debug)]
pub struct ContactContext {
    collider: ColliderId,
    other_entity: EntityId,
    event: ContactEvent,
    doomed_colliders: Vec<ColliderId>,
    doomed_bodies: Vec<BodyId>,
}

impl ContactContext {
    pub(crate) fn new(collider: ColliderId, other_entity: EntityId, event: ContactEvent) -> Self {
        Self {
            collider,
            other_entity,
            event,
            doomed_colliders: Vec::new(),
            doomed_bodies: Vec::new(),
        }
    }

    /// Collider on the receiving side
    pub fn collider(&self) -> ColliderId {
        self.collider
    }

    /// Entity owning the other collider
    pub fn other_entity(&self) -> EntityId {
        self.other_entity
    }

    pub fn event(&self) -> ContactEvent {
        self.event
    }

    pub fn destroy_collider(&mut self, id: ColliderId) {
        self.doomed_colliders.push(id);
    }

    pub fn destroy_body(&mut self, id: BodyId) {
        self.doomed_bodies.push(id);
    }
}

impl PhysicsWorld {
    /// Broad + narrow phase over all live colliders.
    ///
    /// Every unordered pair is visited twice, once per order; membership
    /// updates are idempotent so events still fire once per transition.
    pub(crate) fn detect_contacts(&mut self, scene: &mut Scene) -> Vec<Contact> {
        let live: Vec<ColliderId> = self.live_colliders.iter().copied().collect();
        let mut contacts = Vec::new();

        self.scanning = true;
        for &a in &live {
            for &b in &live {
                if self.doomed_colliders.contains(&a) {
                    break;
                }
                if a == b || self.doomed_colliders.contains(&b) {
                    continue;
                }
                if let Some(contact) = self.test_pair(scene, a, b) {
                    contacts.push(contact);
                }
            }
        }
        self.scanning = false;

        contacts.retain(|c| {
            !self.doomed_colliders.contains(&c.collider_a)
                && !self.doomed_colliders.contains(&c.collider_b)
                && !self.doomed_bodies.contains(&c.body_a)
                && !self.doomed_bodies.contains(&c.body_b)
        });
        self.flush_doomed();
        contacts
    }

    fn test_pair(&mut self, scene: &mut Scene, a: ColliderId, b: ColliderId) -> Option<Contact> {
        let (entity_a, shape_a) = self.collider(a).map(|c| (c.entity(), *c.world_shape()))?;
        let (entity_b, shape_b) = self.collider(b).map(|c| (c.entity(), *c.world_shape()))?;
        let pos_a = scene.global_transform(entity_a).position;
        let pos_b = scene.global_transform(entity_b).position;

        let manifold = collide(pos_a, &shape_a, pos_b, &shape_b);
        let was_touching = self.collider(a).is_some_and(|c| c.touching.contains(&b));

        let transition = match (manifold.is_some(), was_touching) {
            (true, false) => {
                self.set_touching(a, b, true);
                Some(true)
            }
            (false, true) => {
                self.set_touching(a, b, false);
                Some(false)
            }
            _ => None,
        };

        let body_a = self.rigid_body_for(scene, a);
        let body_b = self.rigid_body_for(scene, b);

        if let Some(entering) = transition {
            self.notify(scene, (a, body_a), (b, body_b), entering);
        }

        let manifold = manifold?;
        let (Some(body_a), Some(body_b)) = (body_a, body_b) else {
            return None;
        };
        // Two colliders of one compound body never push against each other
        if body_a == body_b {
            return None;
        }
        // A listener may have destroyed either side
        if [a, b].iter().any(|c| self.doomed_colliders.contains(c))
            || [body_a, body_b].iter().any(|b| self.doomed_bodies.contains(b))
        {
            return None;
        }
        let movable_a = self.body(body_a).is_some_and(|r| r.is_movable());
        let movable_b = self.body(body_b).is_some_and(|r| r.is_movable());
        if !movable_a && !movable_b {
            return None;
        }

        Some(Contact {
            collider_a: a,
            collider_b: b,
            body_a,
            body_b,
            normal: manifold.normal,
            depth: manifold.depth,
        })
    }

    fn set_touching(&mut self, a: ColliderId, b: ColliderId, touching: bool) {
        for (this, other) in [(a, b), (b, a)] {
            if let Some(collider) = self.colliders[this.index()].as_mut() {
                if touching {
                    collider.touching.insert(other);
                } else {
                    collider.touching.remove(&other);
                }
            }
        }
    }

    fn notify(
        &mut self,
        scene: &mut Scene,
        a: (ColliderId, Option<BodyId>),
        b: (ColliderId, Option<BodyId>),
        entering: bool,
    ) {
        let kind = match (a.1, b.1) {
            (Some(_), Some(_)) => ContactKind::Collision,
            (None, None) => return,
            _ => ContactKind::Trigger,
        };
        let event = ContactEvent::new(kind, entering);
        log::trace!("{} {:?} <-> {:?}", event.name(), a.0, b.0);

        self.deliver(scene, a, b.0, event);
        self.deliver(scene, b, a.0, event);
    }

    /// Call listeners on the body's entity, then on the collider's own entity
    /// when the collider sits on a child of the body.
    fn deliver(
        &mut self,
        scene: &mut Scene,
        (this, body): (ColliderId, Option<BodyId>),
        other: ColliderId,
        event: ContactEvent,
    ) {
        let Some(body_entity) = body.and_then(|id| self.body(id)).map(|r| r.entity()) else {
            return;
        };
        let (Some(collider_entity), Some(other_entity)) = (
            self.collider(this).map(|c| c.entity()),
            self.collider(other).map(|c| c.entity()),
        ) else {
            return;
        };

        let mut ctx = ContactContext::new(this, other_entity, event);
        scene.call_listeners(body_entity, event, other, &mut ctx);
        if collider_entity != body_entity {
            scene.call_listeners(collider_entity, event, other, &mut ctx);
        }

        for id in ctx.doomed_colliders {
            if let Err(err) = self.destroy_collider(id) {
                log::warn!("Listener destroy request ignored: {err}");
            }
        }
        for id in ctx.doomed_bodies {
            if let Err(err) = self.destroy_body(id) {
                log::warn!("Listener destroy request ignored: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;
    use crate::sim::{Material, Shape};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(ContactEvent, ColliderId)>>>;

    struct Recorder(Log);

    impl ContactListener for Recorder {
        fn on_collision_enter(&mut self, other: ColliderId, _ctx: &mut ContactContext) {
            self.0.borrow_mut().push((ContactEvent::CollisionEnter, other));
        }
        fn on_collision_exit(&mut self, other: ColliderId, _ctx: &mut ContactContext) {
            self.0.borrow_mut().push((ContactEvent::CollisionExit, other));
        }
        fn on_trigger_enter(&mut self, other: ColliderId, _ctx: &mut ContactContext) {
            self.0.borrow_mut().push((ContactEvent::TriggerEnter, other));
        }
        fn on_trigger_exit(&mut self, other: ColliderId, _ctx: &mut ContactContext) {
            self.0.borrow_mut().push((ContactEvent::TriggerExit, other));
        }
    }

    fn recorder(scene: &mut Scene, entity: EntityId) -> Log {
        let log: Log = Rc::default();
        scene
            .add_listener(entity, Box::new(Recorder(log.clone())))
            .unwrap();
        log
    }

    fn ball(world: &mut PhysicsWorld, scene: &mut Scene, pos: Vec2, body: bool) -> (EntityId, ColliderId) {
        let entity = scene.spawn("ball", Transform::at(pos));
        let collider = world
            .add_collider(scene, entity, Shape::circle(1.0).unwrap())
            .unwrap();
        if body {
            world
                .add_rigid_body(scene, entity, Material::default())
                .unwrap();
        }
        (entity, collider)
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ContactEvent::new(ContactKind::Collision, true).name(), "onCollisionEnter");
        assert_eq!(ContactEvent::new(ContactKind::Trigger, false).name(), "onTriggerExit");
        assert_eq!(ContactEvent::TriggerEnter.kind(), ContactKind::Trigger);
        assert!(!ContactEvent::CollisionExit.is_enter());
    }

    #[test]
    fn test_collision_enter_and_exit_fire_once() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let (ea, ca) = ball(&mut world, &mut scene, Vec2::ZERO, true);
        let (eb, cb) = ball(&mut world, &mut scene, Vec2::new(1.5, 0.0), true);
        let log_a = recorder(&mut scene, ea);
        let log_b = recorder(&mut scene, eb);

        let contacts = world.detect_contacts(&mut scene);
        // Each unordered pair is visited in both orders
        assert_eq!(contacts.len(), 2);
        assert_eq!(*log_a.borrow(), vec![(ContactEvent::CollisionEnter, cb)]);
        assert_eq!(*log_b.borrow(), vec![(ContactEvent::CollisionEnter, ca)]);
        assert!(world.is_touching(ca, cb));

        // Continued overlap: no new events
        world.detect_contacts(&mut scene);
        assert_eq!(log_a.borrow().len(), 1);

        scene.set_position(eb, Vec2::new(5.0, 0.0)).unwrap();
        let contacts = world.detect_contacts(&mut scene);
        assert!(contacts.is_empty());
        assert_eq!(log_a.borrow()[1], (ContactEvent::CollisionExit, cb));
        assert_eq!(log_b.borrow()[1], (ContactEvent::CollisionExit, ca));
        assert_eq!(log_a.borrow().len(), 2);
        assert!(!world.is_touching(ca, cb));
    }

    #[test]
    fn test_trigger_only_notifies_body_side() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let (body_entity, _) = ball(&mut world, &mut scene, Vec2::ZERO, true);
        let (sensor_entity, sensor) = ball(&mut world, &mut scene, Vec2::new(0.5, 0.0), false);
        let body_log = recorder(&mut scene, body_entity);
        let sensor_log = recorder(&mut scene, sensor_entity);

        let contacts = world.detect_contacts(&mut scene);
        assert!(contacts.is_empty());
        assert_eq!(*body_log.borrow(), vec![(ContactEvent::TriggerEnter, sensor)]);
        assert!(sensor_log.borrow().is_empty());
    }

    #[test]
    fn test_no_bodies_tracks_silently() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let (ea, ca) = ball(&mut world, &mut scene, Vec2::ZERO, false);
        let (_, cb) = ball(&mut world, &mut scene, Vec2::new(0.5, 0.0), false);
        let log = recorder(&mut scene, ea);

        world.detect_contacts(&mut scene);
        assert!(log.borrow().is_empty());
        assert!(world.is_touching(ca, cb));
    }

    #[test]
    fn test_child_sensor_notifies_body_and_child() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let player = scene.spawn("player", Transform::at(Vec2::ZERO));
        world
            .add_collider(&scene, player, Shape::rect(0.5, 0.5).unwrap())
            .unwrap();
        world
            .add_rigid_body(&scene, player, Material::default())
            .unwrap();
        let feet = scene
            .spawn_child(player, "feet", Transform::at(Vec2::new(0.0, -1.0)))
            .unwrap();
        let feet_collider = world
            .add_collider(&scene, feet, Shape::circle(0.25).unwrap())
            .unwrap();
        let player_log = recorder(&mut scene, player);
        let feet_log = recorder(&mut scene, feet);

        let (coin_entity, coin) = ball(&mut world, &mut scene, Vec2::new(0.0, -2.0), false);
        world.detect_contacts(&mut scene);

        assert_eq!(world.rigid_body_for(&scene, feet_collider), world.body_of(player));
        // Only the feet reach the coin; the player entity hears about it through its body
        assert_eq!(*player_log.borrow(), vec![(ContactEvent::TriggerEnter, coin)]);
        assert_eq!(*feet_log.borrow(), vec![(ContactEvent::TriggerEnter, coin)]);

        // Still overlapping: nothing new
        world.detect_contacts(&mut scene);
        assert_eq!(player_log.borrow().len(), 1);

        scene.set_position(coin_entity, Vec2::new(0.0, -10.0)).unwrap();
        world.detect_contacts(&mut scene);
        world.detect_contacts(&mut scene);
        let expected = vec![
            (ContactEvent::TriggerEnter, coin),
            (ContactEvent::TriggerExit, coin),
        ];
        assert_eq!(*player_log.borrow(), expected);
        assert_eq!(*feet_log.borrow(), expected);
        assert!(!world.is_touching(feet_collider, coin));
    }

    #[test]
    fn test_immovable_pair_produces_no_contact() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let a = scene.spawn("a", Transform::fixed(Vec2::ZERO));
        let b = scene.spawn("b", Transform::at(Vec2::new(0.5, 0.0)));
        for entity in [a, b] {
            world
                .add_collider(&scene, entity, Shape::circle(1.0).unwrap())
                .unwrap();
            world
                .add_rigid_body(&scene, entity, Material::default())
                .unwrap();
        }
        let body_b = world.body_of(b).unwrap();
        world.set_kinematic(&scene, body_b, true).unwrap();
        let log = recorder(&mut scene, a);

        let contacts = world.detect_contacts(&mut scene);
        assert!(contacts.is_empty());
        // Bookkeeping still happened
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].0, ContactEvent::CollisionEnter);
    }

    struct Pickup;

    impl ContactListener for Pickup {
        fn on_collision_enter(&mut self, _other: ColliderId, ctx: &mut ContactContext) {
            ctx.destroy_collider(ctx.collider());
        }
    }

    #[test]
    fn test_destroy_during_scan_is_excluded() {
        let mut scene = Scene::new();
        let mut world = PhysicsWorld::default();
        let (ea, ca) = ball(&mut world, &mut scene, Vec2::ZERO, true);
        let (_, cb) = ball(&mut world, &mut scene, Vec2::new(1.5, 0.0), true);
        scene.add_listener(ea, Box::new(Pickup)).unwrap();

        let contacts = world.detect_contacts(&mut scene);
        assert!(contacts.is_empty());
        assert!(world.collider(ca).is_none());
        assert!(!world.live_colliders().any(|c| c == ca));
        assert_eq!(world.touching(cb).count(), 0);
    }

    /// Destroys a fixed body when its owner is hit
    struct Crush(BodyId);

    impl ContactListener for Crush {
        fn on_collision_enter(&mut self, _other: ColliderId, ctx: &mut ContactContext) {
            ctx.destroy_body(self.0);
        }
    }

    /// Resting ball `a` with a listener that destroys ball `b`'s body as `b`
    /// arrives head-on.
    fn crush_setup() -> (PhysicsWorld, Scene, EntityId, BodyId, ColliderId, BodyId) {
        let mut scene = Scene::new();
        let settings = crate::settings::PhysicsSettings {
            gravity: Vec2::ZERO,
            ..Default::default()
        };
        let mut world = PhysicsWorld::new(settings).unwrap();
        let (ea, _) = ball(&mut world, &mut scene, Vec2::ZERO, true);
        let (eb, cb) = ball(&mut world, &mut scene, Vec2::new(1.5, 0.0), true);
        let (body_a, body_b) = (world.body_of(ea).unwrap(), world.body_of(eb).unwrap());
        world.body_mut(body_b).unwrap().set_velocity(Vec2::new(-5.0, 0.0));
        scene.add_listener(ea, Box::new(Crush(body_b))).unwrap();
        (world, scene, ea, body_a, cb, body_b)
    }

    #[test]
    fn test_body_destroyed_during_scan_is_excluded() {
        let (mut world, mut scene, _, body_a, cb, body_b) = crush_setup();

        let contacts = world.detect_contacts(&mut scene);
        assert!(contacts.is_empty());
        assert!(world.body(body_b).is_none());
        assert_eq!(world.dynamic_bodies().collect::<Vec<_>>(), vec![body_a]);
        // The collider survives and now resolves no body
        assert!(world.collider(cb).is_some());
        assert_eq!(world.rigid_body_for(&scene, cb), None);
    }

    #[test]
    fn test_body_destroyed_during_step_receives_no_impulse() {
        let (mut world, mut scene, ea, body_a, _, body_b) = crush_setup();

        world.step(&mut scene);
        assert!(world.body(body_b).is_none());
        assert_eq!(world.body(body_a).unwrap().velocity, Vec2::ZERO);
        assert_eq!(scene.global_transform(ea).position, Vec2::ZERO);
    }
}

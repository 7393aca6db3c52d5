//! impulse2d demo
//!
//! Drops a seeded scatter of circles and crates onto a static floor, runs a
//! few seconds at a jittery frame rate and logs contact events.
//!
//! Usage: `impulse2d [seed] [settings.json]`

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use impulse2d::{
    ColliderId, ContactContext, ContactKind, ContactListener, EntityId, Material, PhysicsSettings,
    PhysicsWorld, Scene, Shape, Transform,
};

/// Simulated run length (seconds)
const RUN_SECONDS: f32 = 4.0;
const BODY_COUNT: usize = 12;

#[derive(Default)]
struct Tally {
    collisions: u32,
    separations: u32,
    zone_entries: u32,
    zone_exits: u32,
}

/// Counts events for the summary, logs each one
struct EventLogger {
    name: String,
    tally: Rc<RefCell<Tally>>,
}

impl EventLogger {
    fn record(&self, ctx: &ContactContext) {
        let event = ctx.event();
        let mut tally = self.tally.borrow_mut();
        match (event.kind(), event.is_enter()) {
            (ContactKind::Collision, true) => tally.collisions += 1,
            (ContactKind::Collision, false) => tally.separations += 1,
            (ContactKind::Trigger, true) => tally.zone_entries += 1,
            (ContactKind::Trigger, false) => tally.zone_exits += 1,
        }
    }
}

impl ContactListener for EventLogger {
    fn on_collision_enter(&mut self, other: ColliderId, ctx: &mut ContactContext) {
        log::debug!("{} hit {:?}", self.name, other);
        self.record(ctx);
    }

    fn on_collision_exit(&mut self, _other: ColliderId, ctx: &mut ContactContext) {
        self.record(ctx);
    }

    fn on_trigger_enter(&mut self, _other: ColliderId, ctx: &mut ContactContext) {
        log::info!("{} entered the zone ({:?})", self.name, ctx.other_entity());
        self.record(ctx);
    }

    fn on_trigger_exit(&mut self, _other: ColliderId, ctx: &mut ContactContext) {
        log::info!("{} left the zone", self.name);
        self.record(ctx);
    }
}

fn build_scene(
    world: &mut PhysicsWorld,
    scene: &mut Scene,
    rng: &mut Pcg32,
    tally: &Rc<RefCell<Tally>>,
) -> impulse2d::Result<Vec<EntityId>> {
    let stone = Material::new(5.0, 0.3)?;

    // Floor and walls
    for (name, pos, half) in [
        ("floor", Vec2::new(0.0, -1.0), Vec2::new(12.0, 1.0)),
        ("left wall", Vec2::new(-11.0, 6.0), Vec2::new(1.0, 6.0)),
        ("right wall", Vec2::new(11.0, 6.0), Vec2::new(1.0, 6.0)),
    ] {
        let entity = scene.spawn(name, Transform::fixed(pos));
        world.add_collider(scene, entity, Shape::rect(half.x, half.y)?)?;
        world.add_rigid_body(scene, entity, stone)?;
    }

    // Sensor zone: collider without a body, so overlaps are triggers
    let zone = scene.spawn("zone", Transform::fixed(Vec2::new(0.0, 1.0)));
    world.add_collider(scene, zone, Shape::rect(3.0, 1.0)?)?;

    let mut bodies = Vec::with_capacity(BODY_COUNT);
    for i in 0..BODY_COUNT {
        let pos = Vec2::new(rng.random_range(-8.0..8.0), rng.random_range(3.0..10.0));
        let name = format!("body {i}");
        let entity = scene.spawn(name.clone(), Transform::at(pos));

        let shape = if rng.random_bool(0.5) {
            Shape::circle(rng.random_range(0.3..0.8))?
        } else {
            Shape::rect(rng.random_range(0.3..0.7), rng.random_range(0.3..0.7))?
        };
        world.add_collider(scene, entity, shape)?;

        let material = Material::new(1.0, rng.random_range(0.0..0.8))?;
        let body = world.add_rigid_body(scene, entity, material)?;
        if let Some(body) = world.body_mut(body) {
            body.set_velocity(Vec2::new(rng.random_range(-2.0..2.0), 0.0));
        }

        scene.add_listener(
            entity,
            Box::new(EventLogger {
                name,
                tally: tally.clone(),
            }),
        )?;
        bodies.push(entity);
    }

    Ok(bodies)
}

fn run(seed: u64, settings: PhysicsSettings) -> impulse2d::Result<()> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut world = PhysicsWorld::new(settings)?;
    let mut scene = Scene::new();
    let tally = Rc::new(RefCell::new(Tally::default()));

    let bodies = build_scene(&mut world, &mut scene, &mut rng, &tally)?;
    log::info!(
        "Scene ready: {} colliders, {} dynamic bodies",
        world.live_colliders().count(),
        world.dynamic_bodies().count()
    );

    let mut elapsed = 0.0;
    let mut ticks = 0;
    while elapsed < RUN_SECONDS {
        // Somewhere between 30 and 144 fps
        let frame_dt = rng.random_range(1.0 / 144.0..1.0 / 30.0);
        ticks += world.update(&mut scene, frame_dt);
        elapsed += frame_dt;
    }

    for entity in bodies {
        let pos = scene.global_transform(entity).position;
        log::info!(
            "{:>8}: ({:6.2}, {:6.2})",
            scene.name(entity).unwrap_or("?"),
            pos.x,
            pos.y
        );
    }

    let tally = tally.borrow();
    log::info!(
        "{} ticks: {} collisions, {} separations, {} zone entries, {} zone exits",
        ticks,
        tally.collisions,
        tally.separations,
        tally.zone_entries,
        tally.zone_exits
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);
    let settings = match args.next() {
        Some(path) => match PhysicsSettings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("Failed to load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => PhysicsSettings::default(),
    };

    log::info!("impulse2d demo starting with seed: {}", seed);
    if let Err(err) = run(seed, settings) {
        log::error!("Demo failed: {err}");
        std::process::exit(1);
    }
}

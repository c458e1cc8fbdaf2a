//! Swarm demo: a drone swarm streamed in from a background placement
//! worker, flying between random waypoints while an observer sweeps
//! across the field and pulls nearby drones into full simulation.
//!
//! Pass a `.toml` or `.ron` file to override the built-in configuration.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rand::prelude::*;

use swarm_engine::foundation::logging;
use swarm_engine::prelude::*;

// Swarm layout
const PLACEMENT_BATCHES: usize = 8;
const DRONES_PER_BATCH: usize = 250;
const FIELD_EXTENT: f32 = 2000.0;
const CRUISE_SPEED: f32 = 80.0;
const ENTITY_BASE: u64 = 10_000;

// Near field
const SWAP_DISTANCE: f32 = 300.0;
const POOL_SIZE: usize = 24;

// Timing
const TICK_RATE: f32 = 1.0 / 30.0;
const FRAME_TIME: f32 = 1.0 / 60.0;
const FRAMES: u32 = 1800;
const RETARGET_EVERY: u32 = 300;
const REPORT_EVERY: u32 = 300;
const OBSERVER_SPEED: f32 = 120.0;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start placement worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Physics state of one fully simulated drone
struct DroneBody {
    transform: Transform,
    target: Option<Vec3>,
    speed: f32,
    active: bool,
}

/// Host-side simulation the near-field drones live in
#[derive(Default)]
struct DroneWorld {
    bodies: Vec<Rc<RefCell<DroneBody>>>,
}

impl DroneWorld {
    fn step(&self, delta_time: f32) {
        for body in &self.bodies {
            let mut body = body.borrow_mut();
            if !body.active {
                continue;
            }
            let Some(target) = body.target else {
                continue;
            };
            let to_target = target - body.transform.position;
            let distance = to_target.magnitude();
            let step = body.speed * delta_time;
            if step >= distance {
                body.transform.position = target;
                body.target = None;
            } else {
                body.transform.position += to_target / distance * step;
            }
        }
    }

    fn active_count(&self) -> usize {
        self.bodies.iter().filter(|body| body.borrow().active).count()
    }
}

/// Pooled drone backed by a body in the [`DroneWorld`]
struct Drone {
    body: Rc<RefCell<DroneBody>>,
    promotions: u32,
}

impl PooledObject for Drone {
    fn transform(&self) -> Transform {
        self.body.borrow().transform
    }

    fn set_transform(&mut self, transform: &Transform) {
        self.body.borrow_mut().transform = *transform;
    }

    fn set_activation(&mut self, flags: ActivationFlags) {
        self.body.borrow_mut().active = flags.contains(ActivationFlags::MOTION);
    }

    fn as_promotable_mut(&mut self) -> Option<&mut dyn Promotable> {
        Some(self)
    }
}

impl Promotable for Drone {
    fn on_promote(&mut self, promotion: Promotion) {
        if let Some(count) = promotion.handoff.and_then(|data| data.downcast::<u32>().ok()) {
            self.promotions = *count;
        }
        self.promotions += 1;
        match promotion.entity_id {
            Some(entity) => log::trace!(
                "Drone {} (entity {}) promoted ({} times so far)",
                promotion.id,
                entity,
                self.promotions
            ),
            None => log::trace!("Drone {} promoted ({} times so far)", promotion.id, self.promotions),
        }
    }

    fn on_demote(&mut self) -> Option<HandoffData> {
        self.body.borrow_mut().target = None;
        Some(Box::new(self.promotions))
    }

    fn on_transform_update(&mut self, transform: &Transform) {
        self.body.borrow_mut().transform = *transform;
    }

    fn on_target_update(&mut self, target: Vec3) {
        self.body.borrow_mut().target = Some(target);
    }

    fn on_speed_update(&mut self, speed: f32) {
        self.body.borrow_mut().speed = speed;
    }
}

/// Spawns drones into the world it was created for
struct DroneFactory {
    world: Weak<RefCell<DroneWorld>>,
}

impl ObjectFactory for DroneFactory {
    fn spawn(&mut self, transform: &Transform) -> Result<Box<dyn PooledObject>, SpawnError> {
        let world = self
            .world
            .upgrade()
            .ok_or_else(|| ContextResolutionError::new("drone world"))?;
        let body = Rc::new(RefCell::new(DroneBody {
            transform: *transform,
            target: None,
            speed: CRUISE_SPEED,
            active: true,
        }));
        world.borrow_mut().bodies.push(Rc::clone(&body));
        Ok(Box::new(Drone { body, promotions: 0 }))
    }

    fn destroy(&mut self, object: Box<dyn PooledObject>) {
        drop(object);
        if let Some(world) = self.world.upgrade() {
            world.borrow_mut().bodies.retain(|body| Rc::strong_count(body) > 1);
        }
    }
}

fn default_config() -> SwarmConfig {
    SwarmConfig::new()
        .with_engine(EngineSettings::new().with_debug_log_swaps(true))
        .with_near_field(NearFieldSettings::new().with_swap_distance(SWAP_DISTANCE))
        .with_pool(PoolSettings::new().with_max_pool_size(POOL_SIZE).with_initial_size(POOL_SIZE / 2))
}

fn load_config() -> Result<SwarmConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            let config = SwarmConfig::load_from_file(&path)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

fn random_point(rng: &mut impl Rng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
        rng.gen_range(0.0..200.0),
        rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
    )
}

/// Observer sweeps back and forth along the X axis, low over the field
fn observer_position(elapsed: f32) -> Vec3 {
    let span = 2.0 * FIELD_EXTENT;
    let travelled = (elapsed * OBSERVER_SPEED) % (2.0 * span);
    let x = if travelled < span {
        -FIELD_EXTENT + travelled
    } else {
        FIELD_EXTENT - (travelled - span)
    };
    Vec3::new(x, 50.0, 0.0)
}

fn retarget(swarm: &mut SwarmManager, key: &MeshKey, rng: &mut impl Rng) {
    let count = swarm.set(key).map_or(0, |set| set.len());
    let targets: Vec<Vec3> = (0..count).map(|_| random_point(rng)).collect();
    swarm.registry_mut().set_batch_targets(key, &targets);
    log::info!("Retargeted {} drones", count);
}

fn main() -> Result<(), DemoError> {
    let config = load_config()?;
    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting swarm demo");

    let key = MeshKey::from("drone");
    let observer = TrackedObserver::new();
    let (sender, queue) = placement_channel();
    let mut swarm = SwarmManager::new(config, observer.clone()).with_placement_queue(queue);

    let world = Rc::new(RefCell::new(DroneWorld::default()));
    swarm.registry_mut().set_object_factory(
        &key,
        Box::new(DroneFactory {
            world: Rc::downgrade(&world),
        }),
    );

    swarm.register_handler(
        SwarmEventKind::AllTargetsReached,
        Box::new(|event: &SwarmEvent| {
            if let SwarmEvent::AllTargetsReached { key, count } = event {
                log::info!("All {} drones of '{}' reached their waypoints", count, key);
            }
            true
        }),
    );

    let mut batches_sent = 0;
    let mut placement_rng = StdRng::seed_from_u64(7);
    let placement_key = key.clone();
    let mut worker = PlacementWorker::spawn("drone-placement", sender, move |sender| {
        let transforms: Vec<Transform> = (0..DRONES_PER_BATCH)
            .map(|_| Transform::from_position(random_point(&mut placement_rng)))
            .collect();
        if !sender.send(PlacementBatch::append(placement_key.clone(), transforms)) {
            return WorkerStep::Finished;
        }
        batches_sent += 1;
        if batches_sent == PLACEMENT_BATCHES {
            WorkerStep::Finished
        } else {
            WorkerStep::Continue
        }
    })?;

    let mut rng = thread_rng();
    let mut clock = TickClock::new(TICK_RATE);
    let mut promotions = 0;
    let mut demotions = 0;

    for frame in 1..=FRAMES {
        for _ in 0..clock.advance(FRAME_TIME) {
            observer.set_position(Some(observer_position(clock.tick_count() as f32 * TICK_RATE)));
            world.borrow().step(TICK_RATE);
            swarm.tick_all(TICK_RATE);
        }

        for event in swarm.drain_events() {
            match event.kind() {
                SwarmEventKind::Promoted => promotions += 1,
                SwarmEventKind::Demoted => demotions += 1,
                _ => {}
            }
        }

        if frame % RETARGET_EVERY == 0 {
            retarget(&mut swarm, &key, &mut rng);
        }
        if frame == FRAMES / 4 {
            let count = swarm.set(&key).map_or(0, |set| set.len());
            let entities: Vec<u64> = (0..count as u64).map(|index| ENTITY_BASE + index).collect();
            let tagged = swarm.registry_mut().set_batch_entity_ids(&key, &entities);
            log::info!("Tagged {} drones with entity ids", tagged);
            if count > 0 {
                let hit = InstanceHit::new(key.clone(), rng.gen_range(0..count));
                if swarm.interact("scanner", &hit) {
                    log::info!("Scanner pulled drone {} into the near field", hit.index);
                }
            }
        }
        if frame == FRAMES / 2 {
            let count = swarm.set(&key).map_or(0, |set| set.len());
            let casualties = (0..count).choose_multiple(&mut rng, 10);
            let killed = casualties
                .iter()
                .filter(|index| swarm.registry_mut().kill_instance(&key, **index))
                .count();
            log::info!("Destroyed {} drones", killed);
        }
        if frame % REPORT_EVERY == 0 {
            if let Some(set) = swarm.set(&key) {
                let pool = set.pool().stats();
                log::info!(
                    "Frame {}: {} drones, {} near field, {} pooled, {} bodies active, last tick {:.3} ms",
                    frame,
                    set.len(),
                    pool.bound_objects,
                    pool.total_objects,
                    world.borrow().active_count(),
                    swarm.stats().last_tick_millis
                );
            }
        }
    }

    worker.stop();
    swarm.clear_all_instances();

    let stats = swarm.stats();
    log::info!(
        "Finished after {} ticks: {} promotions, {} demotions ({} events), {} arrivals, {} placement batches",
        stats.ticks,
        stats.promotions,
        stats.demotions,
        promotions + demotions,
        stats.arrivals,
        stats.placements_applied
    );
    Ok(())
}

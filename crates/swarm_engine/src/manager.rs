//! Swarm manager
//!
//! Programmatic entry point tying the registry, swap scheduler, motion
//! integrator, events and placement handoff together. Everything it drives
//! is injected: the observer source, the backend factory and, per set, the
//! object factory. Nothing is looked up globally.
//!
//! Per set, a tick runs in this order:
//! 1. capture the tick frame from the backend
//! 2. proximity scan with hysteresis demotions
//! 3. motion and arrival detection
//! 4. ranked promotion/demotion against the pool budget
//! 5. reached notifications
//! 6. one batched commit to the backend

use std::path::Path;

use crate::core::config::{Config, ConfigError, SwarmConfig};
use crate::events::{EventQueue, SwarmEvent, SwarmEventHandler, SwarmEventKind};
use crate::foundation::math::Vec3;
use crate::foundation::time::Stopwatch;
use crate::handoff::{PlacementMode, PlacementQueue};
use crate::instancing::{InstanceBackend, InstanceBuffer, MeshKey};
use crate::motion::{MotionIntegrator, MotionStats};
use crate::observer::ObserverSource;
use crate::registry::{InstanceRegistry, InstanceSet};
use crate::swap::frame::TickFrame;
use crate::swap::{CommitStats, SwapCounts, SwapScheduler};

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Promotions and demotions
    pub swaps: SwapCounts,
    /// Movement and arrivals
    pub motion: MotionStats,
    /// Backend writes
    pub commit: CommitStats,
    /// Sets skipped because they had nothing to do
    pub skipped_sets: usize,
}

impl std::ops::AddAssign for TickReport {
    fn add_assign(&mut self, other: Self) {
        self.swaps += other.swaps;
        self.motion += other.motion;
        self.commit.transforms += other.commit.transforms;
        self.commit.custom_data += other.commit.custom_data;
        self.skipped_sets += other.skipped_sets;
    }
}

/// An interaction that landed on one instance, such as a trace hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHit {
    /// Set the instance belongs to
    pub key: MeshKey,
    /// Index of the instance in its set
    pub index: usize,
}

impl InstanceHit {
    /// Hit on instance `index` of `key`
    pub fn new(key: MeshKey, index: usize) -> Self {
        Self { key, index }
    }
}

/// Running totals across ticks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwarmStats {
    /// Calls to `tick_all`
    pub ticks: u64,
    /// Promotions so far
    pub promotions: u64,
    /// Demotions so far
    pub demotions: u64,
    /// Arrivals so far
    pub arrivals: u64,
    /// Placement batches applied
    pub placements_applied: u64,
    /// Duration of the last `tick_all`
    pub last_tick_millis: f32,
}

/// Owns every instance set and drives them tick by tick
pub struct SwarmManager<B: InstanceBackend = InstanceBuffer> {
    config: SwarmConfig,
    registry: InstanceRegistry<B>,
    observer: Box<dyn ObserverSource>,
    events: EventQueue,
    placements: Option<PlacementQueue>,
    stats: SwarmStats,
}

impl SwarmManager<InstanceBuffer> {
    /// Create a manager whose sets use in-memory [`InstanceBuffer`]s
    pub fn new(config: SwarmConfig, observer: impl ObserverSource + 'static) -> Self {
        Self::with_backend_factory(config, observer, |_| InstanceBuffer::new())
    }

    /// Load and validate configuration from a TOML or RON file
    pub fn from_config_file(path: impl AsRef<Path>, observer: impl ObserverSource + 'static) -> Result<Self, ConfigError> {
        let config = SwarmConfig::load_from_file(path)?;
        config.validate()?;
        Ok(Self::new(config, observer))
    }
}

impl<B: InstanceBackend> SwarmManager<B> {
    /// Create a manager with a custom backend per set
    pub fn with_backend_factory(
        config: SwarmConfig,
        observer: impl ObserverSource + 'static,
        backend_factory: impl FnMut(&MeshKey) -> B + 'static,
    ) -> Self {
        log::info!(
            "Swarm manager created (swap distance {}, hysteresis {}, pool size {})",
            config.near_field.swap_distance,
            config.engine.swap_hysteresis,
            config.pool.max_pool_size
        );
        Self {
            registry: InstanceRegistry::new(config.clone(), backend_factory),
            config,
            observer: Box::new(observer),
            events: EventQueue::new(),
            placements: None,
            stats: SwarmStats::default(),
        }
    }

    /// Builder: drain `queue` at the start of every [`tick_all`](Self::tick_all)
    pub fn with_placement_queue(mut self, queue: PlacementQueue) -> Self {
        self.placements = Some(queue);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Replace the configuration. Engine settings apply immediately; the set
    /// defaults apply to sets created afterwards.
    pub fn set_config(&mut self, config: SwarmConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.registry.set_defaults(config.clone());
        self.config = config;
        Ok(())
    }

    /// Replace the observer source
    pub fn set_observer(&mut self, observer: impl ObserverSource + 'static) {
        self.observer = Box::new(observer);
    }

    /// Instance registry
    pub fn registry(&self) -> &InstanceRegistry<B> {
        &self.registry
    }

    /// Mutable instance registry
    pub fn registry_mut(&mut self) -> &mut InstanceRegistry<B> {
        &mut self.registry
    }

    /// Set for `key`
    pub fn set(&self, key: &MeshKey) -> Option<&InstanceSet<B>> {
        self.registry.get(key)
    }

    /// Running totals
    pub fn stats(&self) -> SwarmStats {
        self.stats
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: SwarmEventKind, handler: Box<dyn SwarmEventHandler>) {
        self.events.register_handler(kind, handler);
    }

    /// Take every event no handler consumed
    pub fn drain_events(&mut self) -> Vec<SwarmEvent> {
        self.events.drain()
    }

    /// Apply every placement batch received so far
    pub fn apply_pending_placements(&mut self) -> usize {
        let Some(queue) = self.placements.as_ref() else {
            return 0;
        };
        let batches = queue.drain();
        for batch in &batches {
            match batch.mode {
                PlacementMode::Replace => {
                    self.registry.set_transforms(&batch.key, &batch.transforms);
                }
                PlacementMode::Append => {
                    if self.registry.get(&batch.key).is_some() {
                        self.registry.append_transforms(&batch.key, &batch.transforms);
                    } else {
                        self.registry.set_transforms(&batch.key, &batch.transforms);
                    }
                }
            }
            log::debug!(
                "Applied placement batch for '{}' ({} transforms)",
                batch.key,
                batch.transforms.len()
            );
        }
        self.stats.placements_applied += batches.len() as u64;
        batches.len()
    }

    /// Advance one set by `delta_time` seconds
    pub fn tick(&mut self, key: &MeshKey, delta_time: f32) -> TickReport {
        let observer = self.observer.observer_position();
        let scheduler = SwapScheduler::new(&self.config.engine);
        let integrator = MotionIntegrator::new(&self.config.engine);
        let Some(set) = self.registry.get_mut(key) else {
            log::warn!("tick: no instance set registered for '{}'", key);
            return TickReport::default();
        };
        let report = Self::tick_set(set, observer, delta_time, &scheduler, &integrator, &mut self.events);
        self.record(&report);
        self.events.dispatch();
        report
    }

    /// Apply pending placements, then advance every set by `delta_time` seconds
    pub fn tick_all(&mut self, delta_time: f32) -> TickReport {
        let stopwatch = Stopwatch::start_new();
        self.apply_pending_placements();

        let observer = self.observer.observer_position();
        if observer.is_none() {
            log::debug!("No observer position; near-field swaps skipped this tick");
        }
        let scheduler = SwapScheduler::new(&self.config.engine);
        let integrator = MotionIntegrator::new(&self.config.engine);

        let mut report = TickReport::default();
        for set in self.registry.sets_mut() {
            report += Self::tick_set(set, observer, delta_time, &scheduler, &integrator, &mut self.events);
        }
        self.record(&report);
        self.events.dispatch();

        self.stats.ticks += 1;
        self.stats.last_tick_millis = stopwatch.elapsed_millis();
        if report.swaps != SwapCounts::default() || report.motion.arrived > 0 {
            log::debug!(
                "Tick {}: promoted {}, demoted {}, moved {}, arrived {} ({:.3} ms)",
                self.stats.ticks,
                report.swaps.promoted,
                report.swaps.demoted,
                report.motion.moved,
                report.motion.arrived,
                self.stats.last_tick_millis
            );
        }
        report
    }

    /// Promote one instance now, regardless of distance
    pub fn swap_to_near_field(&mut self, key: &MeshKey, index: usize) -> bool {
        let scheduler = SwapScheduler::new(&self.config.engine);
        let Some(set) = self.registry.get_mut(key) else {
            log::warn!("swap_to_near_field: no instance set registered for '{}'", key);
            return false;
        };
        let mut frame = TickFrame::capture_indices(&set.backend, &set.records, &[index]);
        let promoted = scheduler.promote(set, &mut frame, index, &mut self.events);
        frame.commit(&mut set.backend);
        if promoted {
            self.stats.promotions += 1;
        }
        promoted
    }

    /// Demote one instance now
    pub fn swap_to_far_field(&mut self, key: &MeshKey, index: usize) -> bool {
        let scheduler = SwapScheduler::new(&self.config.engine);
        let Some(set) = self.registry.get_mut(key) else {
            log::warn!("swap_to_far_field: no instance set registered for '{}'", key);
            return false;
        };
        let mut frame = TickFrame::capture_indices(&set.backend, &set.records, &[index]);
        let demoted = scheduler.demote(set, &mut frame, index, &mut self.events);
        frame.commit(&mut set.backend);
        if demoted {
            self.stats.demotions += 1;
        }
        demoted
    }

    /// Promote the instance an interaction landed on
    ///
    /// Does nothing when instance interaction is disabled in the engine
    /// settings. The promoted instance then follows the normal demotion
    /// rules of its set.
    pub fn interact(&mut self, instigator: &str, hit: &InstanceHit) -> bool {
        if !self.config.engine.enable_instance_interaction {
            log::debug!("Instance interaction disabled; ignoring hit from {}", instigator);
            return false;
        }
        log::info!("{} interacted with '{}' instance {}", instigator, hit.key, hit.index);
        self.swap_to_near_field(&hit.key, hit.index)
    }

    /// Drop every instance set, destroying all instances and pooled objects
    pub fn clear_all_instances(&mut self) {
        let sets = self.registry.keys().count();
        self.registry.clear_all();
        log::info!("Cleared {} instance sets", sets);
    }

    /// Promote far-field instances of every swap-enabled set within `radius`
    /// of `center`, closest first, as far as each pool allows
    pub fn wake_within_sphere(&mut self, center: Vec3, radius: f32) -> usize {
        let scheduler = SwapScheduler::new(&self.config.engine);
        let mut promoted = 0;
        for set in self.registry.sets_mut() {
            if !set.near_field.settings.swap_enabled {
                continue;
            }
            let mut frame = TickFrame::capture(&set.backend, &set.records);
            promoted += scheduler.wake_within_sphere(set, &mut frame, center, radius, &mut self.events);
            frame.commit(&mut set.backend);
        }
        self.stats.promotions += promoted as u64;
        promoted
    }

    fn tick_set(
        set: &mut InstanceSet<B>,
        observer: Option<Vec3>,
        delta_time: f32,
        scheduler: &SwapScheduler,
        integrator: &MotionIntegrator,
        events: &mut EventQueue,
    ) -> TickReport {
        let swap_enabled = set.near_field.settings.swap_enabled;
        let bound = set.near_field.pool.stats().bound_objects;
        let proximity = observer.filter(|_| swap_enabled && set.near_field.pool.has_factory());
        if set.all_reached && proximity.is_none() && (swap_enabled || bound == 0) {
            return TickReport {
                skipped_sets: 1,
                ..TickReport::default()
            };
        }

        let mut report = TickReport::default();
        let mut frame = TickFrame::capture(&set.backend, &set.records);

        let candidates = match proximity {
            Some(position) => scheduler.scan(set, &mut frame, position, events, &mut report.swaps),
            None => Vec::new(),
        };
        if !swap_enabled && bound > 0 {
            for index in 0..set.records.len() {
                if scheduler.demote(set, &mut frame, index, events) {
                    report.swaps.demoted += 1;
                }
            }
        }

        if !set.all_reached {
            report.motion = integrator.advance(set, &mut frame, delta_time);
        }
        if proximity.is_some() {
            scheduler.reconcile(set, &mut frame, candidates, events, &mut report.swaps);
        }
        MotionIntegrator::publish_arrivals(set, &frame, events);

        report.commit = frame.commit(&mut set.backend);
        report
    }

    fn record(&mut self, report: &TickReport) {
        self.stats.promotions += report.swaps.promoted as u64;
        self.stats.demotions += report.swaps.demoted as u64;
        self.stats.arrivals += report.motion.arrived as u64;
    }
}

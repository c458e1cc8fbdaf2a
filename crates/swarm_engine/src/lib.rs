//! # Swarm Engine
//!
//! Large-scale instanced movement with near/far field swapping.
//!
//! Thousands of lightweight instances live in a batched [`InstanceBackend`]
//! and are moved toward their targets in one pass per tick. Instances that
//! come close to the observer are promoted to individually simulated objects
//! drawn from a fixed-budget pool, and demoted again once the observer
//! leaves, with a hysteresis band in between.
//!
//! ## Features
//!
//! - **Batched Motion**: fixed-speed travel, travel facing and arrival detection
//! - **Near/Far Field Swapping**: distance-ranked promotion against a pool budget
//! - **Object Pooling**: lazy creation, reuse, activation toggling and shrinking
//! - **Handoff**: background placement producers feeding the tick thread
//! - **Configuration**: TOML/RON files with per-section defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swarm_engine::prelude::*;
//!
//! let observer = TrackedObserver::at(Vec3::zeros());
//! let mut swarm = SwarmManager::new(SwarmConfig::default(), observer.clone());
//!
//! let key = MeshKey::from("drone");
//! swarm.registry_mut().set_transforms(&key, &[Transform::identity()]);
//! swarm.registry_mut().set_target_for_index(&key, 0, Vec3::new(100.0, 0.0, 0.0), Some(50.0));
//!
//! for _ in 0..3 {
//!     swarm.tick_all(1.0 / 60.0);
//! }
//! for event in swarm.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```
//!
//! [`InstanceBackend`]: instancing::InstanceBackend

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod error;
pub mod foundation;

pub mod instancing;
pub mod pooling;
pub mod registry;
pub mod swap;
pub mod motion;
pub mod events;
pub mod observer;
pub mod handoff;

mod manager;

pub use manager::{InstanceHit, SwarmManager, SwarmStats, TickReport};

#[cfg(test)]
mod tests;

/// Common imports for swarm users
pub mod prelude {
    pub use crate::{
        InstanceHit, SwarmManager, SwarmStats, TickReport,
        core::config::{
            CommonMovementConfig, Config, ConfigError, EngineSettings, NearFieldSettings, PoolSettings,
            SwarmConfig,
        },
        error::{ContextResolutionError, SpawnError},
        events::{SwarmEvent, SwarmEventHandler, SwarmEventKind},
        foundation::{
            math::{Quat, Transform, Vec3},
            time::{Stopwatch, TickClock},
        },
        handoff::{placement_channel, PlacementBatch, PlacementSender, PlacementWorker, WorkerStep},
        instancing::{InstanceBackend, InstanceBuffer, InstanceId, MeshKey},
        observer::{ObserverSource, TrackedObserver},
        pooling::{ActivationFlags, HandoffData, ObjectFactory, PooledObject, Promotable, Promotion},
    };
}

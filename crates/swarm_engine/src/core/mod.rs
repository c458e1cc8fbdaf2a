//! # Core Module
//!
//! Shared configuration for every subsystem of the swarm engine.

pub mod config;

pub use config::{
    CommonMovementConfig,
    Config,
    ConfigError,
    EngineSettings,
    NearFieldSettings,
    PoolSettings,
    SwarmConfig,
};

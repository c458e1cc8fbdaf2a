//! Batched motion
//!
//! Advances every far-field instance toward its target at a fixed speed,
//! detects arrivals for both fields and raises reached-count notifications.

pub mod integrator;

pub use integrator::{MotionIntegrator, MotionStats};

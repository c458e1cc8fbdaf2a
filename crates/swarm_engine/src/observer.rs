//! Observer position access
//!
//! The reference point for every proximity check is read through an
//! [`ObserverSource`] at the start of each tick and never cached across ticks.

use std::sync::{Arc, RwLock};

use crate::foundation::math::Vec3;

/// Supplies the observer position
pub trait ObserverSource {
    /// Current observer position, `None` when nothing is being observed
    fn observer_position(&self) -> Option<Vec3>;
}

impl<F> ObserverSource for F
where
    F: Fn() -> Option<Vec3>,
{
    fn observer_position(&self) -> Option<Vec3> {
        self()
    }
}

/// Shared observer position updated by the host (camera, possessed pawn, ...)
///
/// Clones share the same position, so one clone can live in the manager and
/// another in the code that moves the camera.
#[derive(Debug, Clone, Default)]
pub struct TrackedObserver {
    position: Arc<RwLock<Option<Vec3>>>,
}

impl TrackedObserver {
    /// Create an observer with no position
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer at `position`
    pub fn at(position: Vec3) -> Self {
        let observer = Self::new();
        observer.set_position(Some(position));
        observer
    }

    /// Move the observer; `None` detaches it
    pub fn set_position(&self, position: Option<Vec3>) {
        match self.position.write() {
            Ok(mut guard) => *guard = position,
            Err(_) => log::warn!("Observer lock poisoned; position update dropped"),
        }
    }
}

impl ObserverSource for TrackedObserver {
    fn observer_position(&self) -> Option<Vec3> {
        self.position.read().ok().and_then(|guard| *guard)
    }
}

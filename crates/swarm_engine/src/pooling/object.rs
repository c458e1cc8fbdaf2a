//! Pooled object capabilities

use std::any::Any;

use bitflags::bitflags;

use crate::error::SpawnError;
use crate::foundation::math::{Transform, Vec3};
use crate::instancing::InstanceId;

bitflags! {
    /// Subsystems of a pooled object that are switched off while it sits in the pool
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActivationFlags: u8 {
        /// Collision queries and responses
        const COLLISION = 1 << 0;
        /// Movement sub-components
        const MOTION = 1 << 1;
        /// Rendering
        const VISIBLE = 1 << 2;
        /// Per-frame update
        const TICK = 1 << 3;
    }
}

/// Arbitrary state carried from a demoted object to the next promotion of the same instance
pub type HandoffData = Box<dyn Any + Send>;

/// An individually simulated object that can stand in for a batched instance
pub trait PooledObject {
    /// World transform of the object
    fn transform(&self) -> Transform;

    /// Move the object
    fn set_transform(&mut self, transform: &Transform);

    /// Switch subsystems on or off; `flags` is the full set that should be active
    fn set_activation(&mut self, flags: ActivationFlags);

    /// Optional near-field notification capability
    ///
    /// Objects that return `None` are still poolable; they simply receive no
    /// promotion, demotion or update hooks.
    fn as_promotable_mut(&mut self) -> Option<&mut dyn Promotable> {
        None
    }
}

/// Data passed to an object when it takes over an instance
pub struct Promotion {
    /// Instance the object now represents
    pub id: InstanceId,
    /// State handed back by the previous demotion of this instance, if any
    pub handoff: Option<HandoffData>,
    /// Host database entity of the instance, if one was assigned
    pub entity_id: Option<u64>,
}

/// Hooks for objects that want to follow the instance they represent
pub trait Promotable {
    /// The object now represents `promotion.id`
    fn on_promote(&mut self, promotion: Promotion);

    /// The object is about to be released; return state to carry back to the instance
    fn on_demote(&mut self) -> Option<HandoffData> {
        None
    }

    /// The instance was moved externally (promoted space)
    fn on_transform_update(&mut self, _transform: &Transform) {}

    /// The instance received a new movement target (instance space)
    fn on_target_update(&mut self, _target: Vec3) {}

    /// The instance received a new movement speed
    fn on_speed_update(&mut self, _speed: f32) {}
}

/// Creates and destroys pooled objects for one pool
///
/// Factories resolve whatever world or simulation context they need on their
/// own; a missing context is reported as [`SpawnError::Context`].
pub trait ObjectFactory {
    /// Create an object at `transform`
    fn spawn(&mut self, transform: &Transform) -> Result<Box<dyn PooledObject>, SpawnError>;

    /// Dispose of an object removed by a shrink
    fn destroy(&mut self, object: Box<dyn PooledObject>) {
        drop(object);
    }
}

impl<F> ObjectFactory for F
where
    F: FnMut(&Transform) -> Result<Box<dyn PooledObject>, SpawnError>,
{
    fn spawn(&mut self, transform: &Transform) -> Result<Box<dyn PooledObject>, SpawnError> {
        self(transform)
    }
}

//! Per-instance movement and swap state

use crate::foundation::math::Vec3;
use crate::instancing::InstanceId;
use crate::pooling::{HandoffData, ObjectKey};

/// Speed given to records that never received one
pub const DEFAULT_SPEED: f32 = 100.0;

/// Which representation currently renders an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Batched instance only
    #[default]
    FarField,
    /// Bound to a pooled object; the batched instance is parked out of the world
    NearField(ObjectKey),
}

impl FieldState {
    /// Whether the instance is bound to an object
    pub fn is_near_field(self) -> bool {
        matches!(self, Self::NearField(_))
    }

    /// Bound object, if any
    pub fn object(self) -> Option<ObjectKey> {
        match self {
            Self::NearField(key) => Some(key),
            Self::FarField => None,
        }
    }
}

/// Movement target and swap state of one instance
pub struct InstanceRecord {
    /// Stable id in the backend
    pub id: InstanceId,
    /// Where the instance is heading
    pub target: Vec3,
    /// Units per second
    pub speed: f32,
    /// Within tolerance of `target`
    pub reached_target: bool,
    /// Cleared by a kill; dead instances never move again
    pub is_alive: bool,
    /// Far or near field
    pub field: FieldState,
    /// State handed back by the last demotion, passed to the next promotion
    pub aux_data: Option<HandoffData>,
    /// Host database entity this instance stands for
    pub entity_id: Option<u64>,
}

impl InstanceRecord {
    /// A record resting at `position` with nothing to do
    pub fn idle(id: InstanceId, position: Vec3) -> Self {
        Self {
            id,
            target: position,
            speed: DEFAULT_SPEED,
            reached_target: true,
            is_alive: true,
            field: FieldState::FarField,
            aux_data: None,
            entity_id: None,
        }
    }

    /// Record reserved by a sparse write: resting at the origin until given a target
    pub fn placeholder(id: InstanceId) -> Self {
        Self::idle(id, Vec3::zeros())
    }

    /// Give the record a fresh target; `None` keeps the current speed
    pub fn retarget(&mut self, target: Vec3, speed: Option<f32>) {
        self.target = target;
        if let Some(speed) = speed.filter(|speed| *speed >= 0.0) {
            self.speed = speed;
        }
        self.reached_target = false;
    }
}

impl std::fmt::Debug for InstanceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRecord")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("speed", &self.speed)
            .field("reached_target", &self.reached_target)
            .field("is_alive", &self.is_alive)
            .field("field", &self.field)
            .field("has_aux_data", &self.aux_data.is_some())
            .field("entity_id", &self.entity_id)
            .finish()
    }
}

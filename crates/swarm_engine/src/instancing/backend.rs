//! Batched rendering backend abstraction

use super::ids::{InstanceId, SlotIndex};
use crate::foundation::math::Transform;

/// Storage for one batch of instanced transforms plus per-instance custom floats.
///
/// Implementors provide slot-addressed primitives; the id-addressed
/// operations used by the swarm are provided on top of [`resolve`](Self::resolve)
/// and re-resolve on every call, so no slot outlives a structural mutation.
pub trait InstanceBackend {
    /// Add instances and return their ids in the same order
    fn add_instances(&mut self, transforms: &[Transform]) -> Vec<InstanceId>;

    /// Remove instances; unknown ids are ignored. May reorder remaining slots.
    fn remove_instances(&mut self, ids: &[InstanceId]);

    /// Remove every instance
    fn clear(&mut self);

    /// Resolve an id to its current slot
    fn resolve(&self, id: InstanceId) -> Option<SlotIndex>;

    /// Ids of all instances in slot order
    fn instance_ids(&self) -> Vec<InstanceId>;

    /// Number of instances
    fn len(&self) -> usize;

    /// Whether the backend holds no instances
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transform stored at a slot
    fn transform_at(&self, slot: SlotIndex) -> Option<Transform>;

    /// Previous-frame transform stored at a slot
    fn previous_transform_at(&self, slot: SlotIndex) -> Option<Transform>;

    /// Write current and previous transform at a slot
    fn write_transform_at(&mut self, slot: SlotIndex, transform: &Transform, previous: &Transform) -> bool;

    /// Custom float stored at a slot
    fn custom_data_at(&self, slot: SlotIndex, channel: usize) -> Option<f32>;

    /// Write a custom float at a slot
    fn write_custom_data_at(&mut self, slot: SlotIndex, channel: usize, value: f32) -> bool;

    /// Flag the batch for re-upload
    fn mark_dirty(&mut self);

    /// Current transform of an instance
    fn transform(&self, id: InstanceId) -> Option<Transform> {
        self.resolve(id).and_then(|slot| self.transform_at(slot))
    }

    /// Previous-frame transform of an instance
    fn previous_transform(&self, id: InstanceId) -> Option<Transform> {
        self.resolve(id).and_then(|slot| self.previous_transform_at(slot))
    }

    /// Update current and previous transform of an instance
    fn update_transform(&mut self, id: InstanceId, transform: &Transform, previous: &Transform) -> bool {
        match self.resolve(id) {
            Some(slot) => self.write_transform_at(slot, transform, previous),
            None => false,
        }
    }

    /// Custom float of an instance
    fn custom_data(&self, id: InstanceId, channel: usize) -> Option<f32> {
        self.resolve(id).and_then(|slot| self.custom_data_at(slot, channel))
    }

    /// Write one custom float of an instance
    fn set_custom_data(&mut self, id: InstanceId, channel: usize, value: f32) -> bool {
        match self.resolve(id) {
            Some(slot) => self.write_custom_data_at(slot, channel, value),
            None => false,
        }
    }
}

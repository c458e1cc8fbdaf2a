//! CPU-side instance buffer
//!
//! In-memory [`InstanceBackend`] that behaves like a GPU instance batch:
//! removal swap-removes, so slots reshuffle and only ids are durable. The
//! buffer packs its contents into [`InstanceData`] for upload by whatever
//! renderer the host uses.

use std::collections::HashMap;

use super::backend::InstanceBackend;
use super::ids::{InstanceId, SlotIndex};
use crate::foundation::math::Transform;

/// Custom floats carried per instance
pub const CUSTOM_DATA_CHANNELS: usize = 4;

/// Instance data structure for GPU upload
/// Must match shader layout exactly
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InstanceData {
    /// Model transformation matrix (4x4, column-major)
    pub model_matrix: [[f32; 4]; 4],
    /// Previous-frame model matrix for motion vectors
    pub previous_model_matrix: [[f32; 4]; 4],
    /// Per-instance custom floats
    pub custom_data: [f32; CUSTOM_DATA_CHANNELS],
}

unsafe impl bytemuck::Pod for InstanceData {}
unsafe impl bytemuck::Zeroable for InstanceData {}

/// Write counters, useful for asserting batching behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceBufferStats {
    /// Transform writes since creation
    pub transform_writes: u64,
    /// Custom-data writes since creation
    pub custom_data_writes: u64,
    /// Calls to `mark_dirty`
    pub dirty_marks: u64,
}

/// In-memory instance batch
#[derive(Debug, Default)]
pub struct InstanceBuffer {
    ids: Vec<InstanceId>,
    slots: HashMap<InstanceId, usize>,
    transforms: Vec<Transform>,
    previous: Vec<Transform>,
    custom_data: Vec<[f32; CUSTOM_DATA_CHANNELS]>,
    next_id: u64,
    dirty: bool,
    stats: InstanceBufferStats,
}

impl InstanceBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the batch changed since the last [`take_dirty`](Self::take_dirty)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Write counters
    pub fn stats(&self) -> InstanceBufferStats {
        self.stats
    }

    /// Pack every instance for GPU upload, in slot order
    pub fn upload_data(&self) -> Vec<InstanceData> {
        self.transforms
            .iter()
            .zip(&self.previous)
            .zip(&self.custom_data)
            .map(|((transform, previous), custom)| InstanceData {
                model_matrix: transform.to_matrix().into(),
                previous_model_matrix: previous.to_matrix().into(),
                custom_data: *custom,
            })
            .collect()
    }

    /// Byte view of packed instance data
    pub fn as_bytes(data: &[InstanceData]) -> &[u8] {
        bytemuck::cast_slice(data)
    }

    fn slot(&self, slot: SlotIndex) -> Option<usize> {
        let index = slot.get();
        (index < self.ids.len()).then_some(index)
    }
}

impl InstanceBackend for InstanceBuffer {
    fn add_instances(&mut self, transforms: &[Transform]) -> Vec<InstanceId> {
        let mut added = Vec::with_capacity(transforms.len());
        for transform in transforms {
            let id = InstanceId::new(self.next_id);
            self.next_id += 1;
            self.slots.insert(id, self.ids.len());
            self.ids.push(id);
            self.transforms.push(*transform);
            self.previous.push(*transform);
            self.custom_data.push([0.0; CUSTOM_DATA_CHANNELS]);
            added.push(id);
        }
        self.dirty |= !added.is_empty();
        added
    }

    fn remove_instances(&mut self, ids: &[InstanceId]) {
        for id in ids {
            let Some(index) = self.slots.remove(id) else {
                continue;
            };
            self.ids.swap_remove(index);
            self.transforms.swap_remove(index);
            self.previous.swap_remove(index);
            self.custom_data.swap_remove(index);
            if let Some(moved) = self.ids.get(index) {
                self.slots.insert(*moved, index);
            }
            self.dirty = true;
        }
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.slots.clear();
        self.transforms.clear();
        self.previous.clear();
        self.custom_data.clear();
        self.dirty = true;
    }

    fn resolve(&self, id: InstanceId) -> Option<SlotIndex> {
        self.slots.get(&id).copied().map(SlotIndex::new)
    }

    fn instance_ids(&self) -> Vec<InstanceId> {
        self.ids.clone()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn transform_at(&self, slot: SlotIndex) -> Option<Transform> {
        self.slot(slot).map(|index| self.transforms[index])
    }

    fn previous_transform_at(&self, slot: SlotIndex) -> Option<Transform> {
        self.slot(slot).map(|index| self.previous[index])
    }

    fn write_transform_at(&mut self, slot: SlotIndex, transform: &Transform, previous: &Transform) -> bool {
        let Some(index) = self.slot(slot) else {
            return false;
        };
        self.transforms[index] = *transform;
        self.previous[index] = *previous;
        self.stats.transform_writes += 1;
        true
    }

    fn custom_data_at(&self, slot: SlotIndex, channel: usize) -> Option<f32> {
        let index = self.slot(slot)?;
        self.custom_data[index].get(channel).copied()
    }

    fn write_custom_data_at(&mut self, slot: SlotIndex, channel: usize, value: f32) -> bool {
        let Some(index) = self.slot(slot) else {
            return false;
        };
        match self.custom_data[index].get_mut(channel) {
            Some(entry) => {
                *entry = value;
                self.stats.custom_data_writes += 1;
                true
            }
            None => false,
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.stats.dirty_marks += 1;
    }
}

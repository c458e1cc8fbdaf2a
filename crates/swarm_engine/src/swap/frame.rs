//! Per-tick working buffers
//!
//! Every decision made during a tick lands here first. Nothing reaches the
//! backend until [`TickFrame::commit`], which writes all dirty transforms and
//! custom floats and marks the batch dirty once.

use std::collections::BTreeMap;

use crate::foundation::math::Transform;
use crate::instancing::{InstanceBackend, InstanceId};
use crate::registry::InstanceRecord;

/// Working copy of one record's batched transform
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameEntry {
    pub id: InstanceId,
    pub current: Transform,
    pub previous: Transform,
    pub dirty: bool,
    /// Promoted or demoted this tick; motion leaves it alone
    pub swapped: bool,
}

/// Counts from one commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Transforms written
    pub transforms: usize,
    /// Custom floats written
    pub custom_data: usize,
}

/// Next/previous transforms and pending custom writes for one instance set
pub(crate) struct TickFrame {
    entries: Vec<Option<FrameEntry>>,
    custom_writes: BTreeMap<(InstanceId, usize), f32>,
}

impl TickFrame {
    /// Capture every record. Records whose id no longer resolves get no entry.
    pub fn capture<B: InstanceBackend>(backend: &B, records: &[InstanceRecord]) -> Self {
        let entries = records
            .iter()
            .map(|record| Self::entry_for(backend, record.id))
            .collect();
        Self {
            entries,
            custom_writes: BTreeMap::new(),
        }
    }

    /// Capture only `indices`; everything else is left untouched by the commit
    pub fn capture_indices<B: InstanceBackend>(backend: &B, records: &[InstanceRecord], indices: &[usize]) -> Self {
        let mut entries = vec![None; records.len()];
        for &index in indices {
            if let Some(record) = records.get(index) {
                entries[index] = Self::entry_for(backend, record.id);
            }
        }
        Self {
            entries,
            custom_writes: BTreeMap::new(),
        }
    }

    fn entry_for<B: InstanceBackend>(backend: &B, id: InstanceId) -> Option<FrameEntry> {
        let slot = backend.resolve(id)?;
        let current = backend.transform_at(slot)?;
        Some(FrameEntry {
            id,
            current,
            previous: current,
            dirty: false,
            swapped: false,
        })
    }

    pub fn entry(&self, index: usize) -> Option<&FrameEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut FrameEntry> {
        self.entries.get_mut(index).and_then(Option::as_mut)
    }

    /// Replace current and previous together so the swap renders without a motion streak
    pub fn sync(&mut self, index: usize, transform: Transform) {
        if let Some(entry) = self.entry_mut(index) {
            entry.current = transform;
            entry.previous = transform;
            entry.dirty = true;
            entry.swapped = true;
        }
    }

    /// Value a channel will hold after the commit
    pub fn custom_value<B: InstanceBackend>(&self, backend: &B, id: InstanceId, channel: usize) -> Option<f32> {
        self.custom_writes
            .get(&(id, channel))
            .copied()
            .or_else(|| backend.custom_data(id, channel))
    }

    /// Queue a custom float unless the channel already holds it
    pub fn write_custom_if_changed<B: InstanceBackend>(
        &mut self,
        backend: &B,
        id: InstanceId,
        channel: usize,
        value: f32,
    ) -> bool {
        if self.custom_value(backend, id, channel) == Some(value) {
            return false;
        }
        self.custom_writes.insert((id, channel), value);
        true
    }

    /// Apply every pending write to the backend in one batch
    pub fn commit<B: InstanceBackend>(self, backend: &mut B) -> CommitStats {
        let mut stats = CommitStats::default();
        for entry in self.entries.into_iter().flatten().filter(|entry| entry.dirty) {
            if backend.update_transform(entry.id, &entry.current, &entry.previous) {
                stats.transforms += 1;
            }
        }
        for ((id, channel), value) in self.custom_writes {
            if backend.set_custom_data(id, channel, value) {
                stats.custom_data += 1;
            }
        }
        if stats.transforms + stats.custom_data > 0 {
            backend.mark_dirty();
        }
        stats
    }
}

//! One keyed set of instances

use std::collections::BTreeSet;

use super::record::{FieldState, InstanceRecord};
use crate::core::config::{CommonMovementConfig, NearFieldSettings, PoolSettings};
use crate::foundation::math::{Transform, Vec3};
use crate::instancing::{InstanceBackend, InstanceId, MeshKey};
use crate::pooling::{ObjectFactory, ObjectPool};

/// Swap eligibility plus the pool that supplies near-field objects
pub struct NearFieldInfo {
    /// Eligibility and trigger distance
    pub settings: NearFieldSettings,
    /// Objects for promoted instances
    pub pool: ObjectPool,
}

/// Backend handle, records and swap state for one [`MeshKey`]
///
/// Records are kept in insertion order. A record's position in `records` is
/// its *index* for the index-based API; the backend slot is resolved from the
/// record's id on every access.
pub struct InstanceSet<B: InstanceBackend> {
    pub(crate) key: MeshKey,
    pub(crate) backend: B,
    pub(crate) records: Vec<InstanceRecord>,
    pub(crate) movement: CommonMovementConfig,
    pub(crate) near_field: NearFieldInfo,
    pub(crate) reached: BTreeSet<InstanceId>,
    pub(crate) reached_since_last_check: BTreeSet<InstanceId>,
    pub(crate) all_reached: bool,
    pub(crate) last_reached_count: usize,
}

impl<B: InstanceBackend> InstanceSet<B> {
    /// Create an empty set
    pub fn new(
        key: MeshKey,
        backend: B,
        movement: CommonMovementConfig,
        near_field: NearFieldSettings,
        pool: PoolSettings,
    ) -> Self {
        Self {
            key,
            backend,
            records: Vec::new(),
            movement,
            near_field: NearFieldInfo {
                settings: near_field,
                pool: ObjectPool::new(pool),
            },
            reached: BTreeSet::new(),
            reached_since_last_check: BTreeSet::new(),
            all_reached: true,
            last_reached_count: 0,
        }
    }

    /// Key of this set
    pub fn key(&self) -> &MeshKey {
        &self.key
    }

    /// Batched backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable batched backend, for hosts that upload from it
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// All records in index order
    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Record at `index`
    pub fn record(&self, index: usize) -> Option<&InstanceRecord> {
        self.records.get(index)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Movement configuration
    pub fn movement(&self) -> &CommonMovementConfig {
        &self.movement
    }

    /// Near-field settings and pool
    pub fn near_field(&self) -> &NearFieldInfo {
        &self.near_field
    }

    /// Object pool of this set
    pub fn pool(&self) -> &ObjectPool {
        &self.near_field.pool
    }

    /// Mutable object pool of this set
    pub fn pool_mut(&mut self) -> &mut ObjectPool {
        &mut self.near_field.pool
    }

    /// Whether every live target has been reached
    pub fn all_targets_reached(&self) -> bool {
        self.all_reached
    }

    /// Index of the record with `id`
    pub fn index_of(&self, id: InstanceId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    /// Replace every instance, releasing all promoted objects
    pub fn set_transforms(&mut self, transforms: &[Transform]) -> Vec<InstanceId> {
        self.release_all_objects();
        self.backend.clear();
        let ids = self.backend.add_instances(transforms);
        self.records = ids
            .iter()
            .zip(transforms)
            .map(|(id, transform)| InstanceRecord::idle(*id, transform.position))
            .collect();
        self.reached.clear();
        self.reached_since_last_check.clear();
        self.all_reached = true;
        self.last_reached_count = 0;
        self.backend.mark_dirty();
        ids
    }

    /// Add instances after the existing ones
    pub fn append_transforms(&mut self, transforms: &[Transform]) -> Vec<InstanceId> {
        let ids = self.backend.add_instances(transforms);
        self.records.extend(
            ids.iter()
                .zip(transforms)
                .map(|(id, transform)| InstanceRecord::idle(*id, transform.position)),
        );
        self.backend.mark_dirty();
        ids
    }

    /// Remove instances by id, releasing their objects
    pub fn remove_instances(&mut self, ids: &[InstanceId]) {
        let doomed: BTreeSet<InstanceId> = ids.iter().copied().collect();
        for record in self.records.iter().filter(|record| doomed.contains(&record.id)) {
            if let FieldState::NearField(object) = record.field {
                self.near_field.pool.release(object);
            }
        }
        self.records.retain(|record| !doomed.contains(&record.id));
        self.reached.retain(|id| !doomed.contains(id));
        self.reached_since_last_check.retain(|id| !doomed.contains(id));
        self.backend.remove_instances(ids);
        self.backend.mark_dirty();
    }

    /// Grow the record list so `index` exists. Never shrinks.
    ///
    /// Missing records are backed by new instances at the origin, so their
    /// ids come from the backend like every other id.
    pub fn ensure_index(&mut self, index: usize) {
        if index < self.records.len() {
            return;
        }
        let missing = vec![Transform::identity(); index + 1 - self.records.len()];
        let ids = self.backend.add_instances(&missing);
        self.records.extend(ids.into_iter().map(InstanceRecord::placeholder));
        self.backend.mark_dirty();
    }

    /// Set the target of the record at `index`, growing the list if needed
    ///
    /// When `forward` is set a promoted object is told about the new target
    /// and speed.
    pub fn set_target(&mut self, index: usize, target: Vec3, speed: Option<f32>, forward: bool) {
        self.ensure_index(index);
        let Some(record) = self.records.get_mut(index) else {
            return;
        };
        record.retarget(target, speed);
        let id = record.id;
        let field = record.field;
        let speed = record.speed;
        self.reached.remove(&id);
        self.reached_since_last_check.remove(&id);
        self.all_reached = false;

        if !forward {
            return;
        }
        if let Some(hooks) = field
            .object()
            .and_then(|key| self.near_field.pool.object_mut(key))
            .and_then(|object| object.as_promotable_mut())
        {
            hooks.on_target_update(target);
            hooks.on_speed_update(speed);
        }
    }

    /// Target of the record at `index`
    pub fn target(&self, index: usize) -> Option<Vec3> {
        self.records.get(index).map(|record| record.target)
    }

    /// Instance-space transform of the record at `index`
    ///
    /// Near-field instances report their object's transform mapped back to
    /// instance space; the parked batched transform is never returned.
    pub fn transform(&self, index: usize) -> Option<Transform> {
        let record = self.records.get(index)?;
        match record.field {
            FieldState::NearField(key) => {
                let object = self.near_field.pool.object(key)?;
                Some(self.near_field.pool.to_local_space(&object.transform()))
            }
            FieldState::FarField => self.backend.transform(record.id),
        }
    }

    /// Move the instance at `index`
    ///
    /// Far-field instances are written with previous = current. Near-field
    /// instances forward the promoted-space transform to their object instead.
    pub fn set_transform(&mut self, index: usize, transform: &Transform, mark_dirty: bool, forward: bool) -> bool {
        let Some(record) = self.records.get(index) else {
            return false;
        };
        match record.field {
            FieldState::NearField(key) => {
                let promoted = self.near_field.pool.to_promoted_space(transform);
                let Some(object) = self.near_field.pool.object_mut(key) else {
                    return false;
                };
                if forward {
                    if let Some(hooks) = object.as_promotable_mut() {
                        hooks.on_transform_update(&promoted);
                        return true;
                    }
                }
                object.set_transform(&promoted);
                true
            }
            FieldState::FarField => {
                let written = self.backend.update_transform(record.id, transform, transform);
                if written && mark_dirty {
                    self.backend.mark_dirty();
                }
                written
            }
        }
    }

    /// Stop the instance where it currently is
    pub fn stop_travel(&mut self, index: usize) -> bool {
        let Some(position) = self.transform(index).map(|transform| transform.position) else {
            return false;
        };
        let record = &mut self.records[index];
        record.target = position;
        record.reached_target = true;
        let id = record.id;
        if let Some(channel) = self.movement.movement_channel {
            if self.backend.set_custom_data(id, channel, self.movement.idle_value) {
                self.backend.mark_dirty();
            }
        }
        true
    }

    /// Stop the instance and mark it dead
    pub fn kill(&mut self, index: usize) -> bool {
        if !self.stop_travel(index) {
            return false;
        }
        let record = &mut self.records[index];
        record.is_alive = false;
        let id = record.id;
        if let Some(channel) = self.movement.movement_channel {
            if self.backend.set_custom_data(id, channel, self.movement.death_value) {
                self.backend.mark_dirty();
            }
        }
        true
    }

    /// Whether the instance at `index` is dead; unknown indices count as dead
    pub fn is_dead(&self, index: usize) -> bool {
        self.records.get(index).map_or(true, |record| !record.is_alive)
    }

    /// Ids of every record in index order
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.records.iter().map(|record| record.id).collect()
    }

    /// Every instance that has arrived since its target was last set
    pub fn reached_ids(&self) -> Vec<InstanceId> {
        self.reached.iter().copied().collect()
    }

    /// Arrivals since the previous call; each call drains the list
    pub fn take_reached_since_last_check(&mut self) -> Vec<InstanceId> {
        std::mem::take(&mut self.reached_since_last_check).into_iter().collect()
    }

    /// Whether `id` has arrived at its current target
    pub fn did_reach_target(&self, id: InstanceId) -> bool {
        self.reached.contains(&id)
    }

    /// Write `floats_per_instance` custom floats per record, in index order
    ///
    /// Returns the number of floats written. A trailing partial chunk is ignored.
    pub fn set_custom_data(&mut self, values: &[f32], floats_per_instance: usize) -> usize {
        if floats_per_instance == 0 {
            return 0;
        }
        let mut written = 0;
        for (record, chunk) in self.records.iter().zip(values.chunks_exact(floats_per_instance)) {
            for (channel, value) in chunk.iter().enumerate() {
                if self.backend.set_custom_data(record.id, channel, *value) {
                    written += 1;
                }
            }
        }
        if written > 0 {
            self.backend.mark_dirty();
        }
        written
    }

    /// Move every instance at once, index-aligned with `transforms`
    ///
    /// Far-field instances keep their old transform as the previous one, so
    /// the batch renders with motion vectors. Near-field instances are
    /// forwarded to their object like [`set_transform`](Self::set_transform).
    /// Extra transforms are ignored. Returns the number of instances moved.
    pub fn update_transforms(&mut self, transforms: &[Transform], forward: bool) -> usize {
        let mut moved = 0;
        for (index, transform) in transforms.iter().enumerate().take(self.records.len()) {
            let id = self.records[index].id;
            if self.records[index].field.is_near_field() {
                if self.set_transform(index, transform, false, forward) {
                    moved += 1;
                }
                continue;
            }
            let previous = self.backend.transform(id).unwrap_or(*transform);
            if self.backend.update_transform(id, transform, &previous) {
                moved += 1;
            }
        }
        if moved > 0 {
            self.backend.mark_dirty();
        }
        moved
    }

    /// Attach a host database entity to the instance at `index`
    pub fn set_entity_id(&mut self, index: usize, entity_id: u64) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.entity_id = Some(entity_id);
                true
            }
            None => false,
        }
    }

    /// Replace every entity id in index order; records past the end of
    /// `entity_ids` lose theirs. Returns the number assigned.
    pub fn set_entity_ids(&mut self, entity_ids: &[u64]) -> usize {
        for (index, record) in self.records.iter_mut().enumerate() {
            record.entity_id = entity_ids.get(index).copied();
        }
        entity_ids.len().min(self.records.len())
    }

    /// Entity id of the instance at `index`
    pub fn entity_id(&self, index: usize) -> Option<u64> {
        self.records.get(index).and_then(|record| record.entity_id)
    }

    /// Index of the instance standing for `entity_id`
    pub fn index_of_entity(&self, entity_id: u64) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.entity_id == Some(entity_id))
    }

    /// Drop every instance and destroy every pooled object
    pub fn clear(&mut self) {
        self.release_all_objects();
        self.near_field.pool.clear();
        self.backend.clear();
        self.records.clear();
        self.reached.clear();
        self.reached_since_last_check.clear();
        self.all_reached = true;
        self.last_reached_count = 0;
    }

    /// Replace the movement configuration
    pub fn set_movement(&mut self, movement: CommonMovementConfig) {
        self.movement = movement;
    }

    /// Replace the near-field settings
    pub fn set_near_field_settings(&mut self, settings: NearFieldSettings) {
        self.near_field.settings = settings;
    }

    /// Replace the pool settings
    pub fn set_pool_settings(&mut self, settings: PoolSettings) {
        self.near_field.pool.apply_settings(settings);
    }

    /// Attach the factory for near-field objects
    pub fn set_object_factory(&mut self, factory: Box<dyn ObjectFactory>) {
        self.near_field.pool.set_factory(factory);
    }

    fn release_all_objects(&mut self) {
        for record in &mut self.records {
            if let FieldState::NearField(object) = record.field {
                self.near_field.pool.release(object);
                record.field = FieldState::FarField;
            }
        }
    }
}

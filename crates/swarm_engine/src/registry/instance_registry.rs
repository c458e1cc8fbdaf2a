//! Keyed collection of instance sets

use std::collections::HashMap;

use super::instance_set::InstanceSet;
use crate::core::config::{CommonMovementConfig, NearFieldSettings, PoolSettings, SwarmConfig};
use crate::foundation::math::{Transform, Vec3};
use crate::instancing::{InstanceBackend, InstanceId, MeshKey};
use crate::pooling::ObjectFactory;

/// Creates the backend for a newly registered key
pub type BackendFactory<B> = Box<dyn FnMut(&MeshKey) -> B>;

/// Registry of instance sets keyed by [`MeshKey`]
///
/// Operations on an unknown key log a warning and do nothing, except the
/// ones that create sets: [`set_transforms`](Self::set_transforms),
/// [`create_set`](Self::create_set) and the sparse target writes.
pub struct InstanceRegistry<B: InstanceBackend> {
    sets: HashMap<MeshKey, InstanceSet<B>>,
    backend_factory: BackendFactory<B>,
    defaults: SwarmConfig,
}

impl<B: InstanceBackend> InstanceRegistry<B> {
    /// Create a registry; new sets take their configuration from `defaults`
    pub fn new(defaults: SwarmConfig, backend_factory: impl FnMut(&MeshKey) -> B + 'static) -> Self {
        Self {
            sets: HashMap::new(),
            backend_factory: Box::new(backend_factory),
            defaults,
        }
    }

    /// Defaults applied to new sets
    pub fn defaults(&self) -> &SwarmConfig {
        &self.defaults
    }

    pub(crate) fn set_defaults(&mut self, defaults: SwarmConfig) {
        self.defaults = defaults;
    }

    fn forward(&self) -> bool {
        self.defaults.engine.forward_to_near_field
    }

    /// Create the set for `key` if it does not exist yet
    pub fn create_set(&mut self, key: &MeshKey) -> &mut InstanceSet<B> {
        let Self {
            sets,
            backend_factory,
            defaults,
        } = self;
        sets.entry(key.clone()).or_insert_with(|| {
            log::info!("Creating instance set '{}'", key);
            InstanceSet::new(
                key.clone(),
                (**backend_factory)(key),
                defaults.movement.clone(),
                defaults.near_field.clone(),
                defaults.pool.clone(),
            )
        })
    }

    /// Set for `key`
    pub fn get(&self, key: &MeshKey) -> Option<&InstanceSet<B>> {
        self.sets.get(key)
    }

    /// Mutable set for `key`
    pub fn get_mut(&mut self, key: &MeshKey) -> Option<&mut InstanceSet<B>> {
        self.sets.get_mut(key)
    }

    /// Registered keys
    pub fn keys(&self) -> impl Iterator<Item = &MeshKey> {
        self.sets.keys()
    }

    /// Every set
    pub fn sets_mut(&mut self) -> impl Iterator<Item = &mut InstanceSet<B>> {
        self.sets.values_mut()
    }

    fn existing_mut(&mut self, key: &MeshKey, operation: &str) -> Option<&mut InstanceSet<B>> {
        let set = self.sets.get_mut(key);
        if set.is_none() {
            log::warn!("{}: no instance set registered for '{}'", operation, key);
        }
        set
    }

    fn existing(&self, key: &MeshKey, operation: &str) -> Option<&InstanceSet<B>> {
        let set = self.sets.get(key);
        if set.is_none() {
            log::warn!("{}: no instance set registered for '{}'", operation, key);
        }
        set
    }

    /// Replace every instance of `key`, creating the set on first use
    pub fn set_transforms(&mut self, key: &MeshKey, transforms: &[Transform]) -> Vec<InstanceId> {
        self.create_set(key).set_transforms(transforms)
    }

    /// Add instances to an existing set
    pub fn append_transforms(&mut self, key: &MeshKey, transforms: &[Transform]) -> Vec<InstanceId> {
        self.existing_mut(key, "append_transforms")
            .map(|set| set.append_transforms(transforms))
            .unwrap_or_default()
    }

    /// Remove instances by id
    pub fn remove_instances(&mut self, key: &MeshKey, ids: &[InstanceId]) {
        if let Some(set) = self.existing_mut(key, "remove_instances") {
            set.remove_instances(ids);
        }
    }

    /// Give every instance a new target, index-aligned with `targets`
    pub fn set_batch_targets(&mut self, key: &MeshKey, targets: &[Vec3]) {
        let forward = self.forward();
        let set = self.create_set(key);
        for (index, target) in targets.iter().enumerate() {
            set.set_target(index, *target, None, forward);
        }
    }

    /// Set one target, growing the record list if `index` is past its end.
    /// Negative speeds leave the current speed unchanged.
    pub fn set_target_for_index(&mut self, key: &MeshKey, index: usize, target: Vec3, speed: Option<f32>) {
        let forward = self.forward();
        self.create_set(key).set_target(index, target, speed, forward);
    }

    /// Target of one instance
    pub fn target_for_index(&self, key: &MeshKey, index: usize) -> Option<Vec3> {
        self.existing(key, "target_for_index")?.target(index)
    }

    /// Instance-space transform of one instance
    pub fn transform_for_index(&self, key: &MeshKey, index: usize) -> Option<Transform> {
        self.existing(key, "transform_for_index")?.transform(index)
    }

    /// Move one instance, notifying its object when promoted
    pub fn set_transform_for_index(&mut self, key: &MeshKey, index: usize, transform: &Transform, mark_dirty: bool) -> bool {
        let forward = self.forward();
        self.existing_mut(key, "set_transform_for_index")
            .is_some_and(|set| set.set_transform(index, transform, mark_dirty, forward))
    }

    /// Replace the movement configuration of a set
    pub fn set_common_config(&mut self, key: &MeshKey, movement: CommonMovementConfig) -> bool {
        self.existing_mut(key, "set_common_config")
            .map(|set| set.set_movement(movement))
            .is_some()
    }

    /// Replace the near-field settings of a set
    pub fn set_near_field_settings(&mut self, key: &MeshKey, settings: NearFieldSettings) -> bool {
        self.existing_mut(key, "set_near_field_settings")
            .map(|set| set.set_near_field_settings(settings))
            .is_some()
    }

    /// Replace the pool settings of a set
    pub fn set_pool_settings(&mut self, key: &MeshKey, settings: PoolSettings) -> bool {
        self.existing_mut(key, "set_pool_settings")
            .map(|set| set.set_pool_settings(settings))
            .is_some()
    }

    /// Attach the object factory of a set, creating the set if needed, and
    /// pre-create the configured number of objects
    pub fn set_object_factory(&mut self, key: &MeshKey, factory: Box<dyn ObjectFactory>) {
        let set = self.create_set(key);
        set.set_object_factory(factory);
        let initial = set.pool().settings().initial_size;
        if initial > 0 {
            set.pool_mut().initialize(initial);
        }
    }

    /// Stop an instance where it is
    pub fn stop_travel(&mut self, key: &MeshKey, index: usize) -> bool {
        self.existing_mut(key, "stop_travel")
            .is_some_and(|set| set.stop_travel(index))
    }

    /// Stop several instances
    pub fn stop_travel_many(&mut self, key: &MeshKey, indices: &[usize]) -> usize {
        self.existing_mut(key, "stop_travel_many").map_or(0, |set| {
            indices.iter().filter(|index| set.stop_travel(**index)).count()
        })
    }

    /// Stop an instance and mark it dead
    pub fn kill_instance(&mut self, key: &MeshKey, index: usize) -> bool {
        self.existing_mut(key, "kill_instance")
            .is_some_and(|set| set.kill(index))
    }

    /// Whether an instance is dead; unknown keys and indices count as dead
    pub fn is_instance_dead(&self, key: &MeshKey, index: usize) -> bool {
        self.sets.get(key).map_or(true, |set| set.is_dead(index))
    }

    /// Ids of every instance of a set in index order
    pub fn all_instance_ids(&self, key: &MeshKey) -> Vec<InstanceId> {
        self.sets.get(key).map(InstanceSet::instance_ids).unwrap_or_default()
    }

    /// Every instance that reached its current target
    pub fn reached_instance_ids(&self, key: &MeshKey) -> Vec<InstanceId> {
        self.sets.get(key).map(InstanceSet::reached_ids).unwrap_or_default()
    }

    /// Arrivals since the previous call (drains)
    pub fn reached_instance_ids_since_last_check(&mut self, key: &MeshKey) -> Vec<InstanceId> {
        self.sets
            .get_mut(key)
            .map(InstanceSet::take_reached_since_last_check)
            .unwrap_or_default()
    }

    /// Whether an instance reached its current target
    pub fn did_instance_reach_target(&self, key: &MeshKey, id: InstanceId) -> bool {
        self.sets.get(key).is_some_and(|set| set.did_reach_target(id))
    }

    /// Write per-instance custom floats
    pub fn set_custom_data(&mut self, key: &MeshKey, values: &[f32], floats_per_instance: usize) -> usize {
        self.existing_mut(key, "set_custom_data")
            .map_or(0, |set| set.set_custom_data(values, floats_per_instance))
    }

    /// Move every instance of a set at once, keeping motion vectors
    pub fn update_transforms(&mut self, key: &MeshKey, transforms: &[Transform]) -> usize {
        let forward = self.forward();
        self.existing_mut(key, "update_transforms")
            .map_or(0, |set| set.update_transforms(transforms, forward))
    }

    /// Attach a host database entity to one instance
    pub fn set_entity_id(&mut self, key: &MeshKey, index: usize, entity_id: u64) -> bool {
        let Some(set) = self.existing_mut(key, "set_entity_id") else {
            return false;
        };
        let assigned = set.set_entity_id(index, entity_id);
        if !assigned {
            log::warn!("set_entity_id: index {} out of range for '{}'", index, key);
        }
        assigned
    }

    /// Replace the entity ids of a set in index order
    pub fn set_batch_entity_ids(&mut self, key: &MeshKey, entity_ids: &[u64]) -> usize {
        self.existing_mut(key, "set_batch_entity_ids")
            .map_or(0, |set| set.set_entity_ids(entity_ids))
    }

    /// Entity id of one instance
    pub fn entity_id_for_index(&self, key: &MeshKey, index: usize) -> Option<u64> {
        self.sets.get(key).and_then(|set| set.entity_id(index))
    }

    /// Drop every set, destroying its instances and pooled objects
    pub fn clear_all(&mut self) {
        for set in self.sets.values_mut() {
            set.clear();
        }
        self.sets.clear();
    }
}

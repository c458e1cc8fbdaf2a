//! Object Pool
//!
//! Fixed-budget allocator of promoted objects with id-keyed lookup.
//!
//! Lowering the budget never takes a bound object away, so the pool can sit
//! above `max_pool_size` until enough objects come back; each release while
//! over budget destroys the returned object instead of keeping it idle.
//!
//! Invariants, checked by the tests below:
//! - `objects.len() <= max_pool_size`, or no object is idle while over budget
//! - every key in `available` is a live object
//! - `in_use` and `object_to_id` are exact inverses and never point at an available object

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use super::coordinate::CoordinateAdapter;
use super::object::{ActivationFlags, ObjectFactory, PooledObject};
use crate::core::config::PoolSettings;
use crate::foundation::math::Transform;
use crate::instancing::InstanceId;

new_key_type! {
    /// Handle to an object owned by an [`ObjectPool`]
    pub struct ObjectKey;
}

/// Statistics about pool usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects currently alive
    pub total_objects: usize,
    /// Objects waiting in the pool
    pub available_objects: usize,
    /// Objects bound to an instance id
    pub bound_objects: usize,
    /// Objects created since the pool was built
    pub spawned: u64,
    /// Objects destroyed by shrinking
    pub destroyed: u64,
    /// Acquisitions refused because the budget was used up
    pub exhausted: u64,
}

/// Fixed-capacity pool of reusable objects
pub struct ObjectPool {
    objects: SlotMap<ObjectKey, Box<dyn PooledObject>>,
    available: Vec<ObjectKey>,
    in_use: HashMap<InstanceId, ObjectKey>,
    object_to_id: HashMap<ObjectKey, InstanceId>,
    factory: Option<Box<dyn ObjectFactory>>,
    settings: PoolSettings,
    adapter: CoordinateAdapter,
    spawned: u64,
    destroyed: u64,
    exhausted: u64,
}

impl ObjectPool {
    /// Create an empty pool; objects are only created once a factory is set
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            objects: SlotMap::with_key(),
            available: Vec::new(),
            in_use: HashMap::new(),
            object_to_id: HashMap::new(),
            factory: None,
            adapter: CoordinateAdapter::new(settings.object_offset),
            settings,
            spawned: 0,
            destroyed: 0,
            exhausted: 0,
        }
    }

    /// Builder: attach the factory used to create objects
    pub fn with_factory(mut self, factory: Box<dyn ObjectFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Replace the factory
    pub fn set_factory(&mut self, factory: Box<dyn ObjectFactory>) {
        self.factory = Some(factory);
    }

    /// Whether a factory is attached
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Current settings
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Replace the settings. Idle objects beyond a reduced budget are destroyed;
    /// objects still held out are destroyed as they are released.
    pub fn apply_settings(&mut self, settings: PoolSettings) {
        self.adapter = CoordinateAdapter::new(settings.object_offset);
        self.settings = settings;
        while self.objects.len() > self.settings.max_pool_size {
            let Some(key) = self.available.pop() else {
                break;
            };
            self.destroy(key);
        }
    }

    /// The object budget
    pub fn capacity(&self) -> usize {
        self.settings.max_pool_size
    }

    /// Objects currently alive
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no object is alive
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects waiting in the pool
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    /// Coordinate mapping between instance and object space
    pub fn adapter(&self) -> &CoordinateAdapter {
        &self.adapter
    }

    /// Instance transform to promoted-object transform
    pub fn to_promoted_space(&self, local: &Transform) -> Transform {
        self.adapter.to_promoted_space(local)
    }

    /// Promoted-object transform to instance transform
    pub fn to_local_space(&self, promoted: &Transform) -> Transform {
        self.adapter.to_local_space(promoted)
    }

    /// Pre-create up to `count` objects (never past the budget).
    ///
    /// Returns how many were created; a spawn failure stops early and is logged.
    pub fn initialize(&mut self, count: usize) -> usize {
        let target = count.min(self.settings.max_pool_size);
        let mut created = 0;
        while self.objects.len() < target {
            let Some(key) = self.spawn() else {
                log::warn!(
                    "Object pool pre-allocation stopped at {} of {} objects",
                    self.objects.len(),
                    target
                );
                break;
            };
            if self.settings.deactivate_on_swap {
                self.deactivate(key);
            }
            self.available.push(key);
            created += 1;
        }
        created
    }

    /// Take an object out of the pool, optionally binding it to `id`.
    ///
    /// Returns `None` when `id` is already bound (logged), when the budget is
    /// used up (silent), or when no object can be created (logged).
    pub fn acquire(&mut self, id: Option<InstanceId>) -> Option<ObjectKey> {
        if let Some(id) = id {
            if self.in_use.contains_key(&id) {
                log::warn!("Object pool: instance {} already has a bound object", id);
                return None;
            }
        }

        let key = match self.available.pop() {
            Some(key) => key,
            None if self.objects.len() < self.settings.max_pool_size => self.spawn()?,
            None => {
                self.exhausted += 1;
                return None;
            }
        };

        if let Some(id) = id {
            self.in_use.insert(id, key);
            self.object_to_id.insert(key, id);
        }
        if self.settings.deactivate_on_swap {
            if let Some(object) = self.objects.get_mut(key) {
                object.set_activation(ActivationFlags::all());
            }
        }
        Some(key)
    }

    /// Return an object to the pool. Unknown keys and repeated releases are no-ops.
    ///
    /// While the pool holds more objects than its budget the object is
    /// destroyed instead.
    pub fn release(&mut self, key: ObjectKey) {
        if !self.objects.contains_key(key) {
            return;
        }
        if let Some(id) = self.object_to_id.remove(&key) {
            self.in_use.remove(&id);
        }
        if self.available.contains(&key) {
            return;
        }
        if self.objects.len() > self.settings.max_pool_size {
            self.destroy(key);
            return;
        }

        if self.settings.deactivate_on_swap {
            self.deactivate(key);
        }
        self.available.push(key);

        if let Some(slack) = self.settings.auto_shrink_slack {
            if self.available.len() > slack {
                self.shrink_to_fit();
            }
        }
    }

    /// Object bound to `id`
    pub fn lookup(&self, id: InstanceId) -> Option<ObjectKey> {
        self.in_use.get(&id).copied()
    }

    /// Instance bound to `key`
    pub fn bound_id(&self, key: ObjectKey) -> Option<InstanceId> {
        self.object_to_id.get(&key).copied()
    }

    /// Borrow an object
    pub fn object(&self, key: ObjectKey) -> Option<&dyn PooledObject> {
        self.objects.get(key).map(|object| &**object)
    }

    /// Mutably borrow an object
    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut dyn PooledObject> {
        match self.objects.get_mut(key) {
            Some(object) => Some(&mut **object),
            None => None,
        }
    }

    /// Destroy every idle object
    pub fn shrink_to_fit(&mut self) {
        let idle = std::mem::take(&mut self.available);
        if !idle.is_empty() {
            log::debug!("Object pool shrinking by {} idle objects", idle.len());
        }
        for key in idle {
            self.destroy(key);
        }
    }

    /// Release every binding and destroy every object
    pub fn clear(&mut self) {
        self.in_use.clear();
        self.object_to_id.clear();
        self.available.clear();
        let keys: Vec<ObjectKey> = self.objects.keys().collect();
        for key in keys {
            self.destroy(key);
        }
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_objects: self.objects.len(),
            available_objects: self.available.len(),
            bound_objects: self.in_use.len(),
            spawned: self.spawned,
            destroyed: self.destroyed,
            exhausted: self.exhausted,
        }
    }

    fn spawn(&mut self) -> Option<ObjectKey> {
        let Some(factory) = self.factory.as_mut() else {
            log::warn!("Object pool has no object factory; cannot create objects");
            return None;
        };
        let parked = Transform::from_position(self.settings.out_of_world_location);
        match factory.spawn(&parked) {
            Ok(object) => {
                self.spawned += 1;
                Some(self.objects.insert(object))
            }
            Err(err) => {
                log::warn!("Object pool failed to spawn an object: {}", err);
                None
            }
        }
    }

    fn deactivate(&mut self, key: ObjectKey) {
        let parked = Transform::from_position(self.settings.out_of_world_location);
        if let Some(object) = self.objects.get_mut(key) {
            object.set_activation(ActivationFlags::empty());
            object.set_transform(&parked);
        }
    }

    fn destroy(&mut self, key: ObjectKey) {
        if let Some(object) = self.objects.remove(key) {
            self.destroyed += 1;
            match self.factory.as_mut() {
                Some(factory) => factory.destroy(object),
                None => drop(object),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(self.objects.len() <= self.settings.max_pool_size || self.available.is_empty());
        for key in &self.available {
            assert!(self.objects.contains_key(*key));
            assert!(!self.object_to_id.contains_key(key));
        }
        let mut deduped = self.available.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), self.available.len());
        assert_eq!(self.in_use.len(), self.object_to_id.len());
        for (id, key) in &self.in_use {
            assert!(self.objects.contains_key(*key));
            assert_eq!(self.object_to_id.get(key), Some(id));
        }
    }
}

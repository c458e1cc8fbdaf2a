//! Proximity Swap Scheduler
//!
//! Decides, once per tick, which instances of a set are near field.
//!
//! 1. Every instance is measured against the observer from its *effective*
//!    position: the object's transform mapped back to instance space when
//!    near field, the batched transform otherwise.
//! 2. Instances inside `swap_distance` become candidates.
//! 3. Near-field instances at or beyond the demotion distance
//!    (`swap_distance * hysteresis` unless set explicitly) are demoted
//!    immediately. Those between the two distances keep their object.
//!    Sets can turn off either direction; interaction-only sets never
//!    produce candidates and only demote.
//! 4. Candidates are ranked by distance (ties by id). Near-field candidates
//!    ranked past the pool budget are demoted, then far-field candidates
//!    inside the budget are promoted. A promotion that finds the pool
//!    exhausted is simply retried next tick.

use std::cmp::Ordering;

use super::frame::TickFrame;
use crate::core::config::EngineSettings;
use crate::events::{EventQueue, SwarmEvent};
use crate::foundation::math::{Transform, Vec3};
use crate::instancing::{InstanceBackend, InstanceId};
use crate::pooling::Promotion;
use crate::registry::{FieldState, InstanceSet};

/// Swap transitions performed during one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapCounts {
    /// Far field to near field
    pub promoted: usize,
    /// Near field to far field
    pub demoted: usize,
}

impl std::ops::AddAssign for SwapCounts {
    fn add_assign(&mut self, other: Self) {
        self.promoted += other.promoted;
        self.demoted += other.demoted;
    }
}

/// Instance inside the promotion radius this tick
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub index: usize,
    pub id: InstanceId,
    pub distance: f32,
}

impl Candidate {
    fn rank(a: &Self, b: &Self) -> Ordering {
        a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id))
    }
}

/// Near/far field swap decisions for instance sets
#[derive(Debug, Clone, Copy)]
pub struct SwapScheduler {
    hysteresis: f32,
    debug_log_swaps: bool,
}

impl SwapScheduler {
    /// Create a scheduler from engine settings
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            hysteresis: settings.swap_hysteresis,
            debug_log_swaps: settings.debug_log_swaps,
        }
    }

    /// Position used for distance checks
    pub(crate) fn effective_position<B: InstanceBackend>(
        set: &InstanceSet<B>,
        frame: &TickFrame,
        index: usize,
    ) -> Option<Vec3> {
        let record = set.records.get(index)?;
        if let FieldState::NearField(key) = record.field {
            let pool = &set.near_field.pool;
            if let Some(object) = pool.object(key) {
                return Some(pool.to_local_space(&object.transform()).position);
            }
        }
        frame.entry(index).map(|entry| entry.current.position)
    }

    /// Steps 1–3: measure every instance, demote those past the hysteresis band,
    /// and return the promotion candidates
    pub(crate) fn scan<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        observer: Vec3,
        events: &mut EventQueue,
        counts: &mut SwapCounts,
    ) -> Vec<Candidate> {
        let settings = &set.near_field.settings;
        let swap_distance = settings.swap_distance;
        let promote_by_distance = settings.swap_in_by_distance;
        let demote_distance = settings.demote_distance(self.hysteresis);
        let mut candidates = Vec::new();

        for index in 0..set.records.len() {
            let Some(position) = Self::effective_position(set, frame, index) else {
                continue;
            };
            let distance = (observer - position).magnitude();
            let record = &set.records[index];

            if promote_by_distance && distance < swap_distance {
                candidates.push(Candidate {
                    index,
                    id: record.id,
                    distance,
                });
            } else if record.field.is_near_field()
                && demote_distance.is_some_and(|demote_at| distance >= demote_at)
                && self.demote(set, frame, index, events)
            {
                counts.demoted += 1;
            }
        }
        candidates
    }

    /// Step 4: fit the ranked candidates to the pool budget
    pub(crate) fn reconcile<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        mut candidates: Vec<Candidate>,
        events: &mut EventQueue,
        counts: &mut SwapCounts,
    ) {
        candidates.sort_by(Candidate::rank);
        let budget = set.near_field.pool.capacity();

        for candidate in candidates.iter().skip(budget) {
            if set.records[candidate.index].field.is_near_field()
                && self.demote(set, frame, candidate.index, events)
            {
                counts.demoted += 1;
            }
        }
        for candidate in candidates.iter().take(budget) {
            if !set.records[candidate.index].field.is_near_field()
                && self.promote(set, frame, candidate.index, events)
            {
                counts.promoted += 1;
            }
        }
    }

    /// Bind the instance at `index` to a pooled object.
    ///
    /// Returns `false` without side effects when the instance is already near
    /// field, has no batched transform, or the pool cannot supply an object.
    pub(crate) fn promote<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        index: usize,
        events: &mut EventQueue,
    ) -> bool {
        let Some(record) = set.records.get_mut(index) else {
            return false;
        };
        if record.field.is_near_field() {
            return false;
        }
        let Some(local) = frame.entry(index).map(|entry| entry.current) else {
            return false;
        };
        let id = record.id;
        let pool = &mut set.near_field.pool;
        let Some(key) = pool.acquire(Some(id)) else {
            return false;
        };

        let promoted = pool.to_promoted_space(&local);
        let parked = Transform {
            position: pool.settings().out_of_world_location,
            ..local
        };
        if let Some(object) = pool.object_mut(key) {
            object.set_transform(&promoted);
            if let Some(hooks) = object.as_promotable_mut() {
                hooks.on_promote(Promotion {
                    id,
                    handoff: record.aux_data.take(),
                    entity_id: record.entity_id,
                });
                hooks.on_transform_update(&promoted);
                hooks.on_target_update(record.target);
                hooks.on_speed_update(record.speed);
            }
        }
        record.field = FieldState::NearField(key);

        frame.sync(index, parked);
        if let Some(channel) = set.movement.movement_channel {
            frame.write_custom_if_changed(&set.backend, id, channel, set.movement.idle_value);
        }

        if self.debug_log_swaps {
            log::debug!(
                "'{}' promoted {} at ({:.1}, {:.1}, {:.1})",
                set.key,
                id,
                local.position.x,
                local.position.y,
                local.position.z
            );
        }
        events.send(SwarmEvent::Promoted {
            key: set.key.clone(),
            id,
        });
        true
    }

    /// Return the instance at `index` to the batched representation.
    ///
    /// The object's hand-back data is stored on the record and its transform,
    /// mapped to instance space, becomes both the current and previous
    /// batched transform.
    pub(crate) fn demote<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        index: usize,
        events: &mut EventQueue,
    ) -> bool {
        let Some(record) = set.records.get_mut(index) else {
            return false;
        };
        let FieldState::NearField(key) = record.field else {
            return false;
        };
        let pool = &mut set.near_field.pool;

        let mut local = None;
        if let Some(object) = pool.object_mut(key) {
            record.aux_data = object.as_promotable_mut().and_then(|hooks| hooks.on_demote());
            local = Some(object.transform());
        }
        let local = local.map(|promoted| pool.to_local_space(&promoted));
        pool.release(key);
        record.field = FieldState::FarField;
        let id = record.id;

        if let Some(local) = local {
            frame.sync(index, local);
        }

        if self.debug_log_swaps {
            log::debug!("'{}' demoted {}", set.key, id);
        }
        events.send(SwarmEvent::Demoted {
            key: set.key.clone(),
            id,
        });
        true
    }

    /// Promote far-field instances within `radius` of `center`, closest first,
    /// until the pool budget runs out
    pub(crate) fn wake_within_sphere<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        center: Vec3,
        radius: f32,
        events: &mut EventQueue,
    ) -> usize {
        let mut inside: Vec<Candidate> = (0..set.records.len())
            .filter(|index| !set.records[*index].field.is_near_field())
            .filter_map(|index| {
                let position = frame.entry(index)?.current.position;
                let distance = (position - center).magnitude();
                (distance <= radius).then(|| Candidate {
                    index,
                    id: set.records[index].id,
                    distance,
                })
            })
            .collect();
        inside.sort_by(Candidate::rank);

        let mut promoted = 0;
        for candidate in inside {
            if self.promote(set, frame, candidate.index, events) {
                promoted += 1;
            } else if set.near_field.pool.len() >= set.near_field.pool.capacity()
                && set.near_field.pool.available_len() == 0
            {
                break;
            }
        }
        promoted
    }
}

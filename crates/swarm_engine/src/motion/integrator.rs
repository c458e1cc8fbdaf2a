//! Batched Motion Integrator

use std::collections::BTreeSet;

use crate::core::config::{CommonMovementConfig, EngineSettings};
use crate::events::{EventQueue, SwarmEvent};
use crate::foundation::math::{look_rotation, rotation_from_degrees, Vec3};
use crate::instancing::{InstanceBackend, InstanceId};
use crate::registry::{FieldState, InstanceRecord, InstanceSet};
use crate::swap::frame::TickFrame;

/// Per-tick motion counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionStats {
    /// Instances that moved
    pub moved: usize,
    /// Instances that reached their target
    pub arrived: usize,
}

impl std::ops::AddAssign for MotionStats {
    fn add_assign(&mut self, other: Self) {
        self.moved += other.moved;
        self.arrived += other.arrived;
    }
}

/// Moves far-field instances and tracks arrivals
#[derive(Debug, Clone, Copy)]
pub struct MotionIntegrator {
    face_travel: bool,
}

/// Reached bookkeeping borrowed from a set
struct Arrivals<'a> {
    reached: &'a mut BTreeSet<InstanceId>,
    since_last_check: &'a mut BTreeSet<InstanceId>,
    stats: &'a mut MotionStats,
}

impl Arrivals<'_> {
    /// Mark the record reached. A far-field instance also gets previous =
    /// current so its motion vector settles once it stops.
    fn record<B: InstanceBackend>(
        &mut self,
        index: usize,
        record: &mut InstanceRecord,
        frame: &mut TickFrame,
        backend: &B,
        movement: &CommonMovementConfig,
    ) {
        if !record.field.is_near_field() {
            if let Some(entry) = frame.entry_mut(index) {
                if entry.dirty || backend.previous_transform(entry.id) != Some(entry.current) {
                    entry.previous = entry.current;
                    entry.dirty = true;
                }
            }
        }
        record.reached_target = true;
        self.reached.insert(record.id);
        self.since_last_check.insert(record.id);
        self.stats.arrived += 1;
        if let Some(channel) = movement.movement_channel {
            frame.write_custom_if_changed(backend, record.id, channel, movement.idle_value);
        }
    }
}

impl MotionIntegrator {
    /// Create an integrator from engine settings
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            face_travel: settings.face_travel,
        }
    }

    /// Advance every instance of `set` by `delta_time` seconds.
    ///
    /// Far-field instances step toward their target and snap onto it once the
    /// step would reach or pass it. Near-field instances are moved by their
    /// object; only their arrival is checked, with the near-field tolerance.
    /// Instances swapped earlier in this tick are left alone.
    pub(crate) fn advance<B: InstanceBackend>(
        &self,
        set: &mut InstanceSet<B>,
        frame: &mut TickFrame,
        delta_time: f32,
    ) -> MotionStats {
        let mut stats = MotionStats::default();
        let movement = &set.movement;
        let backend = &set.backend;
        let pool = &set.near_field.pool;
        let facing_offset = rotation_from_degrees(movement.facing_offset_degrees);
        let mut arrivals = Arrivals {
            reached: &mut set.reached,
            since_last_check: &mut set.reached_since_last_check,
            stats: &mut stats,
        };

        for (index, record) in set.records.iter_mut().enumerate() {
            let Some(entry) = frame.entry(index).copied() else {
                continue;
            };
            if entry.swapped {
                continue;
            }

            if !record.is_alive {
                if let Some(channel) = movement.movement_channel {
                    frame.write_custom_if_changed(backend, record.id, channel, movement.death_value);
                }
                continue;
            }
            if record.reached_target {
                continue;
            }

            if let FieldState::NearField(key) = record.field {
                let position = pool
                    .object(key)
                    .map(|object| pool.to_local_space(&object.transform()).position);
                if let Some(position) = position {
                    if within(record.target, position, movement.near_field_target_tolerance) {
                        arrivals.record(index, record, frame, backend, movement);
                    }
                }
                continue;
            }

            let tolerance = movement.target_tolerance;
            let mut current = entry.current;
            let to_target = record.target - current.position;
            let distance = to_target.magnitude();
            if distance < tolerance {
                arrivals.record(index, record, frame, backend, movement);
                continue;
            }

            if let Some(channel) = movement.movement_channel {
                frame.write_custom_if_changed(backend, record.id, channel, movement.moving_value);
            }

            let direction = to_target / distance;
            if self.face_travel {
                if let Some(look) = look_rotation(&direction) {
                    current.rotation = look * facing_offset;
                }
            }

            let step = record.speed * delta_time;
            if step >= distance {
                current.position = record.target;
            } else {
                current.position += direction * step;
            }

            if let Some(entry) = frame.entry_mut(index) {
                entry.current = current;
                entry.dirty = true;
            }
            arrivals.stats.moved += 1;

            if within(record.target, current.position, tolerance) {
                arrivals.record(index, record, frame, backend, movement);
            }
        }
        stats
    }

    /// Raise reached notifications for `set`.
    ///
    /// `TargetsReached` fires when the reached count changes to a non-zero
    /// value; `AllTargetsReached` fires once when the last live instance
    /// settles and is re-armed by the next target write.
    pub(crate) fn publish_arrivals<B: InstanceBackend>(
        set: &mut InstanceSet<B>,
        frame: &TickFrame,
        events: &mut EventQueue,
    ) {
        let count = set.reached.len();
        let settled = set
            .records
            .iter()
            .enumerate()
            .all(|(index, record)| record.reached_target || !record.is_alive || frame.entry(index).is_none());

        if settled {
            if !set.all_reached {
                set.all_reached = true;
                events.send(SwarmEvent::AllTargetsReached {
                    key: set.key.clone(),
                    count,
                });
            }
        } else if count > 0 && count != set.last_reached_count {
            events.send(SwarmEvent::TargetsReached {
                key: set.key.clone(),
                count,
            });
        }
        set.last_reached_count = count;
    }
}

fn within(target: Vec3, position: Vec3, tolerance: f32) -> bool {
    (target - position).magnitude() < tolerance
}

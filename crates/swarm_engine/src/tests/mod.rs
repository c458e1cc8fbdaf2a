//! Whole-tick scenarios driven through [`SwarmManager`]

pub(crate) mod support;

use approx::assert_relative_eq;

use self::support::{FakeFactory, HookCall, HookLog};
use crate::core::config::{EngineSettings, NearFieldSettings, PoolSettings, SwarmConfig};
use crate::events::{SwarmEvent, SwarmEventKind};
use crate::foundation::math::{Transform, Vec3};
use crate::handoff::{placement_channel, PlacementBatch};
use crate::instancing::{InstanceBackend, MeshKey};
use crate::observer::TrackedObserver;
use crate::registry::FieldState;
use crate::{InstanceHit, SwarmManager};

fn drone() -> MeshKey {
    MeshKey::from("drone")
}

fn at(x: f32) -> Transform {
    Transform::from_position(Vec3::new(x, 0.0, 0.0))
}

fn swarm_config(swap_distance: f32, pool_size: usize) -> SwarmConfig {
    SwarmConfig::new()
        .with_near_field(NearFieldSettings::new().with_swap_distance(swap_distance))
        .with_pool(PoolSettings::new().with_max_pool_size(pool_size))
}

/// Manager with one set at `positions` (x axis) and a promotable object factory
fn swarm_with_pool(
    positions: &[f32],
    swap_distance: f32,
    pool_size: usize,
) -> (SwarmManager, TrackedObserver, HookLog) {
    let observer = TrackedObserver::new();
    let mut swarm = SwarmManager::new(swarm_config(swap_distance, pool_size), observer.clone());
    let transforms: Vec<Transform> = positions.iter().map(|x| at(*x)).collect();
    swarm.registry_mut().set_transforms(&drone(), &transforms);
    let log = HookLog::default();
    swarm
        .registry_mut()
        .set_object_factory(&drone(), Box::new(FakeFactory::new(log.clone())));
    (swarm, observer, log)
}

fn near_field_xs(swarm: &SwarmManager) -> Vec<f32> {
    let set = swarm.set(&drone()).unwrap();
    let mut xs: Vec<f32> = (0..set.len())
        .filter(|index| set.record(*index).unwrap().field.is_near_field())
        .map(|index| set.transform(index).unwrap().position.x)
        .collect();
    xs.sort_by(f32::total_cmp);
    xs
}

fn count_kind(events: &[SwarmEvent], kind: SwarmEventKind) -> usize {
    events.iter().filter(|event| event.kind() == kind).count()
}

#[test]
fn test_travel_snaps_onto_target_in_two_ticks() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let ids = swarm.registry_mut().set_transforms(&drone(), &[at(0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(100.0, 0.0, 0.0), Some(60.0));

    let first = swarm.tick_all(1.0);
    assert_eq!(first.motion.moved, 1);
    let backend = swarm.set(&drone()).unwrap().backend();
    assert_relative_eq!(backend.transform(ids[0]).unwrap().position.x, 60.0);
    assert_eq!(backend.previous_transform(ids[0]).unwrap().position.x, 0.0);
    assert_eq!(backend.custom_data(ids[0], 0), Some(1.0));

    let second = swarm.tick_all(1.0);
    assert_eq!(second.motion.arrived, 1);
    let backend = swarm.set(&drone()).unwrap().backend();
    assert_eq!(backend.transform(ids[0]).unwrap().position, Vec3::new(100.0, 0.0, 0.0));
    assert_eq!(backend.previous_transform(ids[0]), backend.transform(ids[0]));
    assert_eq!(backend.custom_data(ids[0], 0), Some(0.0));
    assert!(swarm.registry().did_instance_reach_target(&drone(), ids[0]));

    // Nothing left to do: the set is skipped and nothing is written
    let third = swarm.tick_all(1.0);
    assert_eq!(third.skipped_sets, 1);
    assert_eq!(third.commit.transforms + third.commit.custom_data, 0);
    assert_eq!(
        swarm.set(&drone()).unwrap().backend().custom_data(ids[0], 0),
        Some(0.0)
    );
}

#[test]
fn test_travel_faces_direction_of_motion() {
    let config = SwarmConfig::new().with_movement(
        crate::core::config::CommonMovementConfig::new().with_facing_offset([0.0, 0.0, 0.0]),
    );
    let mut swarm = SwarmManager::new(config, TrackedObserver::new());
    let ids = swarm.registry_mut().set_transforms(&drone(), &[at(0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(0.0, 0.0, 500.0), None);
    swarm.tick_all(0.1);

    let rotation = swarm.set(&drone()).unwrap().backend().transform(ids[0]).unwrap().rotation;
    let forward = rotation * Vec3::new(0.0, 0.0, 1.0);
    assert_relative_eq!(forward, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
}

#[test]
fn test_one_commit_per_tick() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    swarm
        .registry_mut()
        .set_transforms(&drone(), &[at(0.0), at(10.0), at(20.0), at(30.0)]);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(0.0, 500.0, 0.0); 4]);
    let before = swarm.set(&drone()).unwrap().backend().stats().dirty_marks;

    let report = swarm.tick_all(0.5);
    assert_eq!(report.motion.moved, 4);
    assert_eq!(report.commit.transforms, 4);
    assert_eq!(swarm.set(&drone()).unwrap().backend().stats().dirty_marks, before + 1);
}

#[test]
fn test_hysteresis_band_keeps_object() {
    let (mut swarm, observer, log) = swarm_with_pool(&[0.0], 100.0, 1);
    assert_eq!(swarm.config().engine.swap_hysteresis, 1.3);

    observer.set_position(Some(Vec3::new(99.0, 0.0, 0.0)));
    assert_eq!(swarm.tick_all(0.016).swaps.promoted, 1);

    // Past the swap distance but inside swap_distance * hysteresis
    observer.set_position(Some(Vec3::new(105.0, 0.0, 0.0)));
    assert_eq!(swarm.tick_all(0.016).swaps.demoted, 0);
    assert_eq!(near_field_xs(&swarm), vec![0.0]);

    observer.set_position(Some(Vec3::new(131.0, 0.0, 0.0)));
    assert_eq!(swarm.tick_all(0.016).swaps.demoted, 1);
    assert!(near_field_xs(&swarm).is_empty());

    let events = swarm.drain_events();
    assert_eq!(count_kind(&events, SwarmEventKind::Promoted), 1);
    assert_eq!(count_kind(&events, SwarmEventKind::Demoted), 1);
    assert_eq!(log.promotions().len(), 1);
    assert!(log.calls().contains(&HookCall::Demote { object: 0 }));
}

#[test]
fn test_oversubscription_promotes_closest() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[30.0, 10.0, 50.0, 20.0, 40.0], 100.0, 2);
    observer.set_position(Some(Vec3::zeros()));

    let report = swarm.tick_all(0.016);
    assert_eq!(report.swaps.promoted, 2);
    assert_eq!(near_field_xs(&swarm), vec![10.0, 20.0]);
    assert_eq!(swarm.set(&drone()).unwrap().pool().len(), 2);

    // Observer walks to the other end: the closest two take over the objects
    observer.set_position(Some(Vec3::new(60.0, 0.0, 0.0)));
    let report = swarm.tick_all(0.016);
    assert_eq!(report.swaps.demoted, 2);
    assert_eq!(report.swaps.promoted, 2);
    assert_eq!(near_field_xs(&swarm), vec![40.0, 50.0]);

    let pool = swarm.set(&drone()).unwrap().pool();
    assert_eq!(pool.stats().spawned, 2);
    assert_eq!(pool.stats().bound_objects, 2);
    pool.assert_invariants();
}

#[test]
fn test_equal_distances_rank_by_id() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[-10.0, 10.0, 10.0], 100.0, 1);
    let ids = swarm.registry().all_instance_ids(&drone());
    observer.set_position(Some(Vec3::zeros()));
    swarm.tick_all(0.016);

    let set = swarm.set(&drone()).unwrap();
    assert!(set.pool().lookup(ids[0]).is_some());
    assert!(set.pool().lookup(ids[1]).is_none());
    assert!(set.pool().lookup(ids[2]).is_none());
}

#[test]
fn test_observer_jitter_inside_band_swaps_once() {
    let observer = TrackedObserver::new();
    let config = swarm_config(100.0, 1).with_engine(EngineSettings::new().with_swap_hysteresis(1.1));
    let mut swarm = SwarmManager::new(config, observer.clone());
    swarm.registry_mut().set_transforms(&drone(), &[at(0.0)]);
    let log = HookLog::default();
    swarm
        .registry_mut()
        .set_object_factory(&drone(), Box::new(FakeFactory::new(log.clone())));

    for _ in 0..5 {
        observer.set_position(Some(Vec3::new(99.0, 0.0, 0.0)));
        swarm.tick_all(0.016);
        observer.set_position(Some(Vec3::new(105.0, 0.0, 0.0)));
        swarm.tick_all(0.016);
    }
    let events = swarm.drain_events();
    assert_eq!(count_kind(&events, SwarmEventKind::Promoted), 1);
    assert_eq!(count_kind(&events, SwarmEventKind::Demoted), 0);
    assert_eq!(near_field_xs(&swarm), vec![0.0]);

    // Leaving the band for good demotes exactly once
    for _ in 0..3 {
        observer.set_position(Some(Vec3::new(120.0, 0.0, 0.0)));
        swarm.tick_all(0.016);
    }
    let events = swarm.drain_events();
    assert_eq!(count_kind(&events, SwarmEventKind::Promoted), 0);
    assert_eq!(count_kind(&events, SwarmEventKind::Demoted), 1);
    assert_eq!(log.promotions().len(), 1);
    assert!(near_field_xs(&swarm).is_empty());
}

#[test]
fn test_selection_ignores_insertion_order() {
    let layout = [30.0, -10.0, 45.0, 20.0, -60.0, 70.0];
    let mut reversed = layout;
    reversed.reverse();

    let mut selections = Vec::new();
    for positions in [&layout[..], &reversed[..]] {
        let (mut swarm, observer, _log) = swarm_with_pool(positions, 100.0, 3);
        observer.set_position(Some(Vec3::zeros()));
        swarm.tick_all(0.016);
        selections.push(near_field_xs(&swarm));
    }
    assert_eq!(selections[0], vec![-10.0, 20.0, 30.0]);
    assert_eq!(selections[0], selections[1]);
}

#[test]
fn test_boundary_ties_go_to_lower_id_in_any_order() {
    // Index 0 and 2 tie at distance 10 for the last slot; index 0 always has the lower id
    for positions in [[-10.0, 5.0, 10.0], [10.0, 5.0, -10.0]] {
        let (mut swarm, observer, _log) = swarm_with_pool(&positions, 100.0, 2);
        let ids = swarm.registry().all_instance_ids(&drone());
        assert!(ids[0] < ids[2]);
        observer.set_position(Some(Vec3::zeros()));
        swarm.tick_all(0.016);

        let set = swarm.set(&drone()).unwrap();
        let promoted: Vec<bool> = ids.iter().map(|id| set.pool().lookup(*id).is_some()).collect();
        assert_eq!(promoted, vec![true, true, false]);
    }
}

#[test]
fn test_swap_boundary_has_no_motion_streak() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[0.0], 100.0, 1);
    let id = swarm.registry().all_instance_ids(&drone())[0];
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(0.0, 0.0, 400.0), Some(10.0));

    observer.set_position(Some(Vec3::new(0.0, 0.0, 50.0)));
    swarm.tick_all(1.0);
    let set = swarm.set(&drone()).unwrap();
    let parked = set.pool().settings().out_of_world_location;
    assert!(set.record(0).unwrap().field.is_near_field());
    assert_eq!(set.backend().transform(id).unwrap().position, parked);
    assert_eq!(set.backend().previous_transform(id).unwrap().position, parked);
    // Motion ran before the promotion; reads go through the object, never the parked entry
    assert_eq!(set.transform(0).unwrap().position, Vec3::new(0.0, 0.0, 10.0));

    // The object wanders off by itself before the observer leaves
    let moved = Transform::from_position(Vec3::new(0.0, 0.0, 30.0));
    swarm.registry_mut().set_transform_for_index(&drone(), 0, &moved, true);
    observer.set_position(Some(Vec3::new(0.0, 0.0, 1000.0)));
    swarm.tick_all(1.0);

    let backend = swarm.set(&drone()).unwrap().backend();
    assert_eq!(backend.transform(id).unwrap().position, Vec3::new(0.0, 0.0, 30.0));
    assert_eq!(backend.previous_transform(id), backend.transform(id));
}

#[test]
fn test_handoff_data_survives_round_trip() {
    let (mut swarm, _observer, log) = swarm_with_pool(&[0.0], 100.0, 1);

    assert!(swarm.swap_to_near_field(&drone(), 0));
    assert!(swarm.swap_to_far_field(&drone(), 0));
    assert!(swarm.swap_to_near_field(&drone(), 0));

    let id = swarm.registry().all_instance_ids(&drone())[0];
    assert_eq!(
        log.promotions(),
        vec![
            HookCall::Promote {
                object: 0,
                id,
                handoff: None,
                entity_id: None
            },
            HookCall::Promote {
                object: 0,
                id,
                handoff: Some(1),
                entity_id: None
            },
        ]
    );
}

#[test]
fn test_manual_swap_rejects_duplicates() {
    let (mut swarm, _observer, _log) = swarm_with_pool(&[0.0, 5.0], 100.0, 4);

    assert!(swarm.swap_to_near_field(&drone(), 0));
    let stats = swarm.set(&drone()).unwrap().pool().stats();
    assert!(!swarm.swap_to_near_field(&drone(), 0));
    assert_eq!(swarm.set(&drone()).unwrap().pool().stats(), stats);

    assert!(!swarm.swap_to_far_field(&drone(), 1));
    assert!(!swarm.swap_to_near_field(&MeshKey::from("missing"), 0));
    assert!(!swarm.swap_to_near_field(&drone(), 9));
}

#[test]
fn test_wake_within_sphere_respects_budget() {
    let (mut swarm, _observer, _log) = swarm_with_pool(&[0.0, 3.0, 6.0, 500.0], 100.0, 2);

    let woken = swarm.wake_within_sphere(Vec3::new(5.0, 0.0, 0.0), 10.0);
    assert_eq!(woken, 2);
    assert_eq!(near_field_xs(&swarm), vec![3.0, 6.0]);
    assert_eq!(swarm.stats().promotions, 2);
}

#[test]
fn test_lowered_budget_demotes_farthest_and_shrinks_pool() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[0.0, 5.0, 10.0], 100.0, 3);
    observer.set_position(Some(Vec3::zeros()));
    assert_eq!(swarm.tick_all(0.016).swaps.promoted, 3);

    swarm
        .registry_mut()
        .set_pool_settings(&drone(), PoolSettings::new().with_max_pool_size(1));
    assert_eq!(swarm.set(&drone()).unwrap().pool().len(), 3);

    assert_eq!(swarm.tick_all(0.016).swaps.demoted, 2);
    assert_eq!(near_field_xs(&swarm), vec![0.0]);
    let pool = swarm.set(&drone()).unwrap().pool();
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.stats().destroyed, 2);
    pool.assert_invariants();
}

#[test]
fn test_reached_notifications_fire_once() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    swarm.registry_mut().set_transforms(&drone(), &[at(0.0), at(0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(10.0, 0.0, 0.0), None);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 1, Vec3::new(500.0, 0.0, 0.0), None);

    for _ in 0..10 {
        swarm.tick_all(1.0);
    }
    let events = swarm.drain_events();
    assert_eq!(
        events,
        vec![
            SwarmEvent::TargetsReached {
                key: drone(),
                count: 1
            },
            SwarmEvent::AllTargetsReached {
                key: drone(),
                count: 2
            },
        ]
    );

    // A fresh target re-arms the notification
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(20.0, 0.0, 0.0), None);
    for _ in 0..3 {
        swarm.tick_all(1.0);
    }
    let events = swarm.drain_events();
    assert_eq!(count_kind(&events, SwarmEventKind::AllTargetsReached), 1);
    assert_eq!(swarm.stats().arrivals, 3);
}

#[test]
fn test_handlers_consume_events() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    swarm.registry_mut().set_transforms(&drone(), &[at(0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(1.0, 1.0, 1.0), None);

    let seen = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&seen);
    swarm.register_handler(
        SwarmEventKind::AllTargetsReached,
        Box::new(move |_: &SwarmEvent| {
            counter.set(counter.get() + 1);
            true
        }),
    );
    swarm.tick_all(1.0);
    assert_eq!(seen.get(), 1);
    assert!(swarm.drain_events().is_empty());
}

#[test]
fn test_reached_since_last_check_drains() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let ids = swarm.registry_mut().set_transforms(&drone(), &[at(0.0), at(0.0)]);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0)]);
    swarm.tick_all(1.0);

    let registry = swarm.registry_mut();
    assert_eq!(registry.reached_instance_ids_since_last_check(&drone()), ids);
    assert!(registry.reached_instance_ids_since_last_check(&drone()).is_empty());
    assert_eq!(registry.reached_instance_ids(&drone()), ids);
}

#[test]
fn test_dead_instances_do_not_move() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let ids = swarm.registry_mut().set_transforms(&drone(), &[at(0.0), at(0.0)]);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(500.0, 0.0, 0.0); 2]);
    swarm.tick_all(1.0);

    assert!(swarm.registry_mut().kill_instance(&drone(), 0));
    swarm.tick_all(1.0);

    let backend = swarm.set(&drone()).unwrap().backend();
    assert_eq!(backend.transform(ids[0]).unwrap().position.x, 100.0);
    assert_eq!(backend.transform(ids[1]).unwrap().position.x, 200.0);
    assert_eq!(backend.custom_data(ids[0], 0), Some(3.0));
    assert!(swarm.registry().is_instance_dead(&drone(), 0));
}

#[test]
fn test_stop_travel_settles_set() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    swarm.registry_mut().set_transforms(&drone(), &[at(0.0), at(0.0)]);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(500.0, 0.0, 0.0); 2]);
    swarm.tick_all(1.0);

    assert_eq!(swarm.registry_mut().stop_travel_many(&drone(), &[0, 1, 7]), 2);
    swarm.tick_all(1.0);
    assert!(swarm.set(&drone()).unwrap().all_targets_reached());
    assert_eq!(
        swarm.registry().target_for_index(&drone(), 1),
        Some(Vec3::new(100.0, 0.0, 0.0))
    );
}

#[test]
fn test_near_field_arrival_uses_object_position() {
    let (mut swarm, observer, log) = swarm_with_pool(&[0.0], 1000.0, 1);
    observer.set_position(Some(Vec3::zeros()));
    swarm.tick_all(0.1);

    // Forwarded to the object; the batched entry stays parked
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 0, Vec3::new(50.0, 0.0, 0.0), Some(5.0));
    assert!(log.calls().contains(&HookCall::Target {
        object: 0,
        target: Vec3::new(50.0, 0.0, 0.0)
    }));
    assert!(log.calls().contains(&HookCall::Speed { object: 0, speed: 5.0 }));

    let report = swarm.tick_all(0.1);
    assert_eq!(report.motion.moved, 0);
    assert_eq!(report.motion.arrived, 1);
    let set = swarm.set(&drone()).unwrap();
    let id = set.record(0).unwrap().id;
    assert_eq!(
        set.backend().transform(id).unwrap().position,
        set.pool().settings().out_of_world_location
    );
}

#[test]
fn test_no_observer_means_no_swaps() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[0.0, 10.0], 100.0, 2);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(50.0, 0.0, 0.0); 2]);

    let report = swarm.tick_all(0.1);
    assert_eq!(report.swaps.promoted, 0);
    assert_eq!(report.motion.moved, 2);

    observer.set_position(Some(Vec3::zeros()));
    assert_eq!(swarm.tick_all(0.1).swaps.promoted, 2);
}

#[test]
fn test_disabling_swaps_returns_objects() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[0.0, 10.0], 100.0, 2);
    observer.set_position(Some(Vec3::zeros()));
    swarm.tick_all(0.1);
    assert_eq!(near_field_xs(&swarm).len(), 2);

    swarm
        .registry_mut()
        .set_near_field_settings(&drone(), NearFieldSettings::new().with_swap_enabled(false));
    let report = swarm.tick_all(0.1);
    assert_eq!(report.swaps.demoted, 2);
    assert!(near_field_xs(&swarm).is_empty());
    assert_eq!(swarm.tick_all(0.1).skipped_sets, 1);
}

#[test]
fn test_remove_near_field_instance_releases_object() {
    let (mut swarm, observer, _log) = swarm_with_pool(&[0.0, 10.0], 100.0, 1);
    observer.set_position(Some(Vec3::zeros()));
    swarm.tick_all(0.1);
    let ids = swarm.registry().all_instance_ids(&drone());
    assert!(swarm.set(&drone()).unwrap().pool().lookup(ids[0]).is_some());

    swarm.registry_mut().remove_instances(&drone(), &[ids[0]]);
    let set = swarm.set(&drone()).unwrap();
    assert_eq!(set.pool().available_len(), 1);
    assert_eq!(set.instance_ids(), vec![ids[1]]);

    // The freed object goes to the next closest instance
    swarm.tick_all(0.1);
    assert_eq!(near_field_xs(&swarm), vec![10.0]);
}

#[test]
fn test_object_offset_applies_across_swap() {
    let offset = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));
    let config = swarm_config(100.0, 1).with_pool(
        PoolSettings::new()
            .with_max_pool_size(1)
            .with_object_offset(offset),
    );
    let observer = TrackedObserver::at(Vec3::zeros());
    let mut swarm = SwarmManager::new(config, observer);
    swarm.registry_mut().set_transforms(&drone(), &[at(4.0)]);
    let log = HookLog::default();
    swarm
        .registry_mut()
        .set_object_factory(&drone(), Box::new(FakeFactory::plain(log.clone())));
    swarm.tick_all(0.1);

    let set = swarm.set(&drone()).unwrap();
    let key = set.record(0).unwrap().field.object().unwrap();
    let object_position = set.pool().object(key).unwrap().transform().position;
    assert_relative_eq!(object_position, Vec3::new(4.0, 2.0, 0.0), epsilon = 1e-5);
    assert_relative_eq!(set.transform(0).unwrap().position, Vec3::new(4.0, 0.0, 0.0), epsilon = 1e-5);
    // Plain objects get no hooks
    assert!(log.calls().is_empty());
}

#[test]
fn test_placements_apply_on_tick() {
    let (sender, queue) = placement_channel();
    let mut swarm =
        SwarmManager::new(SwarmConfig::default(), TrackedObserver::new()).with_placement_queue(queue);

    sender.send(PlacementBatch::replace("tree", vec![at(0.0), at(1.0)]));
    sender.send(PlacementBatch::append("tree", vec![at(2.0)]));
    sender.send(PlacementBatch::append("rock", vec![at(3.0)]));
    swarm.tick_all(0.1);

    let tree = MeshKey::from("tree");
    assert_eq!(swarm.set(&tree).unwrap().len(), 3);
    assert_eq!(swarm.set(&MeshKey::from("rock")).unwrap().len(), 1);
    assert_eq!(swarm.stats().placements_applied, 3);
    assert_eq!(swarm.registry().transform_for_index(&tree, 2).unwrap().position.x, 2.0);
}

#[test]
fn test_sparse_targets_reserve_instances() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let key = MeshKey::from("scout");
    swarm.registry_mut().set_transforms(&key, &[at(0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&key, 3, Vec3::new(10.0, 0.0, 0.0), None);
    swarm
        .registry_mut()
        .set_target_for_index(&key, 0, Vec3::new(10.0, 0.0, 0.0), None);

    // The reserved instance starts at the origin and travels like any other
    swarm.tick_all(1.0);
    let events = swarm.drain_events();
    assert!(events.contains(&SwarmEvent::AllTargetsReached { key: key.clone(), count: 2 }));
    let set = swarm.set(&key).unwrap();
    assert_eq!(set.len(), 4);
    assert_eq!(set.backend().len(), 4);
    assert_eq!(set.transform(3).unwrap().position, Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(set.transform(1).unwrap().position, Vec3::zeros());

    // Later appends never reuse a reserved id
    let appended = swarm.registry_mut().append_transforms(&key, &[at(1.0), at(2.0), at(3.0)]);
    let ids = swarm.registry().all_instance_ids(&key);
    assert!(appended.iter().all(|id| ids.iter().filter(|other| *other == id).count() == 1));
    swarm.registry_mut().remove_instances(&key, &[ids[1]]);
    assert_eq!(swarm.set(&key).unwrap().len(), 6);
}

#[test]
fn test_arrival_settles_motion_vectors() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let ids = swarm.registry_mut().set_transforms(&drone(), &[at(0.0), at(0.0)]);
    swarm
        .registry_mut()
        .set_batch_targets(&drone(), &[Vec3::new(50.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0)]);
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 1, Vec3::new(100.0, 0.0, 0.0), Some(60.0));

    // The first instance snaps onto its target; the second is still in flight
    swarm.tick_all(1.0);
    let backend = swarm.set(&drone()).unwrap().backend();
    assert_eq!(backend.transform(ids[0]).unwrap().position.x, 50.0);
    assert_eq!(backend.previous_transform(ids[0]), backend.transform(ids[0]));
    assert_eq!(backend.previous_transform(ids[1]).unwrap().position.x, 0.0);

    // Retargeting next to where it stands arrives without moving
    swarm
        .registry_mut()
        .set_target_for_index(&drone(), 1, Vec3::new(60.5, 0.0, 0.0), None);
    let report = swarm.tick_all(1.0);
    assert_eq!(report.motion.moved, 0);
    assert_eq!(report.motion.arrived, 1);
    let backend = swarm.set(&drone()).unwrap().backend();
    assert_eq!(backend.transform(ids[1]).unwrap().position.x, 60.0);
    assert_eq!(backend.previous_transform(ids[1]), backend.transform(ids[1]));
}

#[test]
fn test_interaction_only_sets_promote_on_hit() {
    let (mut swarm, observer, log) = swarm_with_pool(&[0.0, 30.0], 100.0, 2);
    swarm
        .registry_mut()
        .set_near_field_settings(&drone(), NearFieldSettings::interaction_only(150.0));
    assert!(swarm.registry_mut().set_entity_id(&drone(), 0, 77));

    observer.set_position(Some(Vec3::new(10.0, 0.0, 0.0)));
    assert_eq!(swarm.tick_all(0.016).swaps.promoted, 0);

    assert!(swarm.interact("player", &InstanceHit::new(drone(), 0)));
    let id = swarm.registry().all_instance_ids(&drone())[0];
    assert_eq!(
        log.promotions(),
        vec![HookCall::Promote {
            object: 0,
            id,
            handoff: None,
            entity_id: Some(77)
        }]
    );

    // Stays near field while the observer is inside the far-field distance
    observer.set_position(Some(Vec3::new(140.0, 0.0, 0.0)));
    let report = swarm.tick_all(0.016);
    assert_eq!(report.swaps, crate::swap::SwapCounts::default());
    assert_eq!(near_field_xs(&swarm), vec![0.0]);

    observer.set_position(Some(Vec3::new(160.0, 0.0, 0.0)));
    assert_eq!(swarm.tick_all(0.016).swaps.demoted, 1);
    assert!(near_field_xs(&swarm).is_empty());
}

#[test]
fn test_interaction_can_be_disabled() {
    let (mut swarm, _observer, log) = swarm_with_pool(&[0.0], 100.0, 1);
    let config = swarm_config(100.0, 1).with_engine(EngineSettings::new().with_instance_interaction(false));
    assert!(swarm.set_config(config).is_ok());

    assert!(!swarm.interact("player", &InstanceHit::new(drone(), 0)));
    assert!(log.promotions().is_empty());
    assert!(!swarm.interact("player", &InstanceHit::new(MeshKey::from("missing"), 0)));
}

#[test]
fn test_clear_all_instances() {
    let (mut swarm, observer, log) = swarm_with_pool(&[0.0, 5.0], 100.0, 2);
    observer.set_position(Some(Vec3::zeros()));
    assert_eq!(swarm.tick_all(0.016).swaps.promoted, 2);

    swarm.clear_all_instances();
    assert!(swarm.set(&drone()).is_none());
    assert_eq!(swarm.registry().keys().count(), 0);
    assert_eq!(log.spawned(), 2);
    assert_eq!(swarm.tick_all(0.016), crate::TickReport::default());
}

#[test]
fn test_set_config_validates() {
    let mut swarm = SwarmManager::new(SwarmConfig::default(), TrackedObserver::new());
    let bad = SwarmConfig::new().with_engine(EngineSettings::new().with_swap_hysteresis(0.5));
    assert!(swarm.set_config(bad).is_err());
    assert_eq!(swarm.config().engine.swap_hysteresis, 1.3);

    let good = swarm_config(50.0, 3);
    assert!(swarm.set_config(good).is_ok());
    swarm.registry_mut().set_transforms(&drone(), &[at(0.0)]);
    assert_eq!(swarm.set(&drone()).unwrap().near_field().settings.swap_distance, 50.0);
    assert!(matches!(
        swarm.set(&drone()).unwrap().record(0).unwrap().field,
        FieldState::FarField
    ));
}

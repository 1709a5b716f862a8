//! Integration tests for the runtime: streaming egress out of one core and
//! back into another, the render mirror across threads, and config files.

use std::thread;
use std::time::Duration;

use sector_core::store::IDENTITY_TRANSFORM;
use sector_core::{
    flags, Edge, Entity, EntityBone, FamilyBuffer, FamilyCounts, Hull, HullBone, IndexRange,
    Point, SectorController, NULL_INDEX,
};
use sector_runtime::{CoreMemory, EngineConfig, RuntimeError};

const WAIT: Duration = Duration::from_secs(1);

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.capacity.core = FamilyCounts::ZERO;
    config.capacity.transfer = FamilyCounts::ZERO;
    config.scan.block_size = 4;
    config.compact.slice_size = 3;
    config.runtime.verify_integrity = true;
    config
}

/// One entity with `hulls` hulls of 3 points and 2 edges, a two-bone
/// armature, and one hull bone per hull.
fn spawn(sector: &mut SectorController, x: f32, hulls: u32) -> u32 {
    let entity = sector.next_entity();
    let first_hull = sector.next_hull();
    let root = sector.create_entity_bone(EntityBone::new(0, NULL_INDEX, IDENTITY_TRANSFORM));
    let _ = sector.create_entity_bone(EntityBone::new(1, root, IDENTITY_TRANSFORM));

    for k in 0..hulls {
        let hull = sector.next_hull();
        let bone = sector.create_hull_bone(HullBone::new(IDENTITY_TRANSFORM, root + k % 2, 0));
        let bones = [bone, NULL_INDEX, NULL_INDEX, NULL_INDEX];
        let first_point = sector.next_point();
        for v in 0..3 {
            let _ = sector.create_point(Point::at_rest([x, v as f32], v, hull, bones, 0));
        }
        let first_edge = sector.next_edge();
        let _ = sector.create_edge(Edge::new(first_point, first_point + 1, 1.0, 0, 0));
        let _ = sector.create_edge(Edge::new(first_point + 1, first_point + 2, 1.0, 0, 0));
        let _ = sector.create_hull(Hull::at_rest(
            0,
            [x, 1.0],
            [1.0, 1.0],
            [0.0, 0.0],
            IndexRange::new(first_point, first_point + 3),
            IndexRange::new(first_edge, first_edge + 2),
            IndexRange::new(bone, bone + 1),
            0.5,
            0.0,
            entity,
            0,
            0,
        ));
    }

    sector.create_entity(Entity::new(
        [x, 0.0, 0.0, 0.0],
        IndexRange::new(first_hull, first_hull + hulls),
        IndexRange::new(root, root + 2),
        1.0,
        0,
        0.0,
        first_hull,
        hulls,
        0,
        0,
        0,
    ))
}

#[test]
fn test_egress_streams_into_another_core() {
    let mut source = CoreMemory::new(test_config()).unwrap();
    let mut target = CoreMemory::new(test_config()).unwrap();
    let source_streams = source.connect_streaming();
    let target_streams = target.connect_streaming();

    for i in 0..20 {
        spawn(source.sector_mut(), i as f32, 1 + i % 3);
    }
    let before = source.sector().counts();

    let mut leaving = Vec::new();
    for e in (0..20).step_by(3) {
        source.sector_mut().mark_egress(e).unwrap();
        leaving.push(source.sector().read_position(e).unwrap()[0]);
    }

    let stats = source.tick().unwrap();
    assert_eq!(stats.egress.objects.entity, 7);
    assert_eq!(stats.removed.entity, 7);
    assert_eq!(source.sector().next_entity(), 13);
    assert_eq!(source.sector().verify_integrity(), Ok(()));

    let bundle = source_streams.unloader.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(bundle.tick, 0);
    assert_eq!(bundle.counts, stats.egress);
    assert_eq!(bundle.sector.counts, stats.egress.objects);
    assert!(bundle.broken.is_empty());

    target_streams.loader.send(bundle.sector).unwrap();
    let stats = target.tick().unwrap();
    assert_eq!(stats.merged.entity, 7);
    assert_eq!(target.sector().verify_integrity(), Ok(()));

    let mut arrived: Vec<f32> = (0..7)
        .map(|e| target.sector().read_position(e).unwrap()[0])
        .collect();
    arrived.sort_by(f32::total_cmp);
    assert_eq!(arrived, leaving);

    let entities = &target.sector().buffers().entities;
    for e in 0..7 {
        assert!(!flags::has(entities.read(e).flags, flags::entity::SECTOR_OUT));
    }

    assert_eq!(source.sector().counts() + target.sector().counts(), before);
}

#[test]
fn test_round_trip_restores_totals() {
    let mut core = CoreMemory::new(test_config()).unwrap();
    let streams = core.connect_streaming();
    for i in 0..9 {
        spawn(core.sector_mut(), i as f32, 2);
    }
    let before = core.sector().counts();
    for e in [0, 4, 8] {
        core.sector_mut().mark_egress(e).unwrap();
    }

    core.tick().unwrap();
    let bundle = streams.unloader.recv_timeout(WAIT).unwrap().unwrap();
    streams.loader.send(bundle.sector).unwrap();

    let stats = core.tick().unwrap();
    assert!(stats.egress.is_empty());
    assert_eq!(stats.merged.entity, 3);
    assert_eq!(core.sector().counts(), before);
    assert_eq!(core.sector().verify_integrity(), Ok(()));
    assert_eq!(streams.unloader.pending(), 0);
}

#[test]
fn test_broken_reports_reach_unloader() {
    let mut core = CoreMemory::new(test_config()).unwrap();
    let streams = core.connect_streaming();
    spawn(core.sector_mut(), 3.0, 1);
    spawn(core.sector_mut(), 4.0, 1);
    core.sector_mut()
        .set_entity_flags(1, flags::entity::BROKEN)
        .unwrap();

    core.tick().unwrap();
    let bundle = streams.unloader.recv_timeout(WAIT).unwrap().unwrap();
    assert!(bundle.sector.is_empty());
    assert_eq!(bundle.broken.len(), 1);
    assert_eq!(bundle.broken[0].position, [4.0, 0.0]);
    assert_eq!(core.sector().next_entity(), 1);
}

#[test]
fn test_dropped_unloader_fails_tick() {
    let mut core = CoreMemory::new(test_config()).unwrap();
    let streams = core.connect_streaming();
    drop(streams.unloader);

    spawn(core.sector_mut(), 0.0, 1);
    core.sector_mut().mark_egress(0).unwrap();
    let err = core.tick().unwrap_err();
    assert!(matches!(err, RuntimeError::Disconnected("unloader")));
}

#[test]
fn test_render_mirror_is_readable_from_another_thread() {
    let mut core = CoreMemory::new(test_config()).unwrap();
    let mirror = core.render_mirror();
    for i in 0..5 {
        spawn(core.sector_mut(), i as f32, 1);
    }
    core.tick().unwrap();
    core.sector_mut().mark_deleted(0).unwrap();
    core.tick().unwrap();

    let (tick, entities, first_x) = thread::spawn(move || {
        let view = mirror.read();
        let x = view.buffers().entities.read(0).transform[0];
        (view.tick(), view.counts().entity, x)
    })
    .join()
    .unwrap();

    assert_eq!(tick, 1);
    assert_eq!(entities, 4);
    assert!((first_x - 1.0).abs() < f32::EPSILON);
    assert_eq!(core.stats().ticks_recorded, 2);
}

#[test]
fn test_config_file_loads() {
    let path = std::env::temp_dir().join(format!("sector_runtime_{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[compact]\nslice_size = 64\n\n[runtime]\nchannel_capacity = 8\n",
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.compact.slice_size, 64);
    assert_eq!(config.runtime.channel_capacity, 8);
    assert_eq!(config.scan, EngineConfig::default().scan);
}

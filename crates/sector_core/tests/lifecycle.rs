//! Integration tests for the object lifecycle: create, delete, compact,
//! merge, egress and re-ingest.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sector_core::compact::{ShiftTables, REMOVED};
use sector_core::config::core_capacity;
use sector_core::{
    flags, CompactConfig, DeleteScan, Edge, Entity, EntityBone, Family, FamilyBuffer,
    FamilyCounts, Hull, HullBone, IndexRange, OrderedSectorInput, Point, ScanConfig, ScanPath,
    SectorBuffers, SectorCompactor, SectorController, UnorderedSectorOutput, NULL_INDEX,
};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

/// Builds one entity with a random subtree: hulls of 1-4 points chained by
/// edges, up to two hull bones per hull, and a small armature.
fn spawn_random(sector: &mut SectorController, rng: &mut ChaCha8Rng) -> u32 {
    let entity = sector.next_entity();
    let first_hull = sector.next_hull();

    let first_bone = sector.next_entity_bone();
    let armature = rng.gen_range(0..4u32);
    for k in 0..armature {
        let parent = if k == 0 { NULL_INDEX } else { first_bone + k - 1 };
        let _ = sector.create_entity_bone(EntityBone::new(k, parent, IDENTITY));
    }

    let hulls = rng.gen_range(1..4u32);
    for _ in 0..hulls {
        let hull = sector.next_hull();

        let first_hull_bone = sector.next_hull_bone();
        let hull_bones = rng.gen_range(0..3u32);
        for _ in 0..hull_bones {
            let bind = if armature == 0 {
                NULL_INDEX
            } else {
                first_bone + rng.gen_range(0..armature)
            };
            let _ = sector.create_hull_bone(HullBone::new(IDENTITY, bind, 99));
        }

        let first_point = sector.next_point();
        let points = rng.gen_range(1..5u32);
        for v in 0..points {
            let mut bones = [NULL_INDEX; 4];
            if hull_bones > 0 {
                bones[0] = first_hull_bone + v % hull_bones;
            }
            let x = rng.gen_range(-100.0..100.0f32);
            let _ = sector.create_point(Point::at_rest([x, v as f32], v, hull, bones, 0));
        }

        let first_edge = sector.next_edge();
        for v in 1..points {
            let p1 = first_point + v - 1;
            let _ = sector.create_edge(Edge::new(p1, p1 + 1, 1.0, 0, v));
        }

        let _ = sector.create_hull(Hull::at_rest(
            entity,
            [0.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            IndexRange::new(first_point, first_point + points),
            IndexRange::new(first_edge, sector.next_edge()),
            IndexRange::new(first_hull_bone, first_hull_bone + hull_bones),
            0.5,
            0.1,
            entity,
            0,
            0,
        ));
    }

    sector.create_entity(Entity::new(
        [entity as f32, 0.0, 0.0, 0.0],
        IndexRange::new(first_hull, first_hull + hulls),
        IndexRange::new(first_bone, first_bone + armature),
        1.0,
        0,
        0.0,
        first_hull,
        entity,
        0,
        0,
        0,
    ))
}

/// One entity owning 1 hull, 2 points and 1 edge.
fn spawn_simple(sector: &mut SectorController, x: f32) -> u32 {
    let entity = sector.next_entity();
    let hull = sector.next_hull();
    let p0 = sector.create_point(Point::at_rest([x, 0.0], 0, hull, [NULL_INDEX; 4], 0));
    let p1 = sector.create_point(Point::at_rest([x, 1.0], 1, hull, [NULL_INDEX; 4], 0));
    let edge = sector.create_edge(Edge::new(p0, p1, 1.0, 0, 0));
    let _ = sector.create_hull(Hull::at_rest(
        0,
        [x, 0.5],
        [1.0, 1.0],
        [0.0, 0.0],
        IndexRange::new(p0, p1 + 1),
        IndexRange::new(edge, edge + 1),
        IndexRange::empty_at(sector.next_hull_bone()),
        0.5,
        0.0,
        entity,
        0,
        0,
    ));
    sector.create_entity(Entity::new(
        [x, 0.0, 0.0, 0.0],
        IndexRange::new(hull, hull + 1),
        IndexRange::empty_at(sector.next_entity_bone()),
        1.0,
        0,
        0.0,
        hull,
        0,
        0,
        0,
        0,
    ))
}

fn random_sector(seed: u64, entities: u32) -> SectorController {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut sector = SectorController::new(&FamilyCounts::ZERO);
    for _ in 0..entities {
        spawn_random(&mut sector, &mut rng);
    }
    sector
}

fn compactor(block_size: usize) -> SectorCompactor {
    SectorCompactor::new(ScanConfig { block_size }, CompactConfig { slice_size: 16 }).unwrap()
}

/// Describes one entity's subtree with every index replaced by what it
/// points at, so two layouts of the same objects compare equal.
fn subtree_signature(b: &SectorBuffers, e: usize) -> Vec<u32> {
    let entity = b.entities.read(e);
    let bone_ref = |bone: u32| {
        if bone == NULL_INDEX {
            u32::MAX
        } else {
            b.entity_bones.read(bone as usize).reference_id
        }
    };
    let point_key = |p: u32| {
        let point = b.points.read(p as usize);
        [point.position[0].to_bits(), point.position[1].to_bits()]
    };

    let mut sig = vec![entity.model_id, entity.hull_table.len(), entity.bone_table.len()];
    sig.push(entity.root_hull - entity.hull_table.start);
    for bone in entity.bone_table.slots() {
        let bone = b.entity_bones.read(bone);
        sig.extend([bone.reference_id, bone_ref(bone.parent_id)]);
    }

    for h in entity.hull_table.slots() {
        let hull = b.hulls.read(h);
        sig.push(b.entities.read(hull.entity_id as usize).model_id);
        sig.extend([hull.point_table.len(), hull.edge_table.len(), hull.bone_table.len()]);
        for bone in hull.bone_table.slots() {
            let bone = b.hull_bones.read(bone);
            sig.extend([bone_ref(bone.bind_pose_id), bone.inv_bind_pose_id]);
        }
        for p in hull.point_table.slots() {
            let point = b.points.read(p);
            sig.extend(point_key(p as u32));
            sig.extend([point.vertex_reference, point.hull_index - entity.hull_table.start]);
            for bone in point.bone_table {
                let bind = if bone == NULL_INDEX {
                    u32::MAX
                } else {
                    bone_ref(b.hull_bones.read(bone as usize).bind_pose_id)
                };
                sig.push(bind);
            }
        }
        for i in hull.edge_table.slots() {
            let edge = b.edges.read(i);
            sig.extend(point_key(edge.p1));
            sig.extend(point_key(edge.p2));
        }
    }
    sig
}

fn signatures(sector: &SectorController) -> Vec<Vec<u32>> {
    (0..sector.next_entity() as usize)
        .map(|e| subtree_signature(sector.buffers(), e))
        .collect()
}

/// Every removed slot holds `REMOVED`; every survivor's shift is the number
/// of removed slots before it.
fn assert_slot_shifts(family: Family, removed: &[bool], table: &[u32]) {
    assert_eq!(table.len(), removed.len(), "{family}");
    let mut gone = 0;
    for (slot, &is_removed) in removed.iter().enumerate() {
        if is_removed {
            assert_eq!(table[slot], REMOVED, "{family} slot {slot}");
            gone += 1;
        } else {
            assert_eq!(table[slot], gone, "{family} slot {slot}");
        }
    }
}

fn model_ids(sector: &SectorController) -> Vec<u32> {
    (0..sector.next_entity() as usize)
        .map(|e| sector.buffers().entities.model_id.as_slice()[e])
        .collect()
}

#[test]
fn test_worked_example_five_entities() {
    let mut sector = SectorController::new(&core_capacity());
    for i in 0..5 {
        spawn_simple(&mut sector, i as f32 * 10.0);
    }
    sector.mark_deleted(1).unwrap();
    sector.mark_deleted(3).unwrap();

    let report = compactor(256).delete_and_compact(&mut sector);
    assert_eq!(report.removed.entity, 2);
    assert_eq!(report.path, ScanPath::SingleBlock);

    assert_eq!(sector.next_entity(), 3);
    assert_eq!(sector.next_hull(), 3);
    assert_eq!(sector.next_point(), 6);
    assert_eq!(sector.next_edge(), 3);

    for (slot, x) in [(0u32, 0.0f32), (1, 20.0), (2, 40.0)] {
        assert_eq!(sector.read_position(slot).unwrap(), [x, 0.0]);
        let hull = sector.buffers().hulls.read(slot as usize);
        assert_eq!(hull.point_table, IndexRange::new(slot * 2, slot * 2 + 2));
        assert_eq!(hull.edge_table, IndexRange::new(slot, slot + 1));
        let edge = sector.buffers().edges.read(slot as usize);
        assert_eq!((edge.p1, edge.p2), (slot * 2, slot * 2 + 1));
    }
    assert_eq!(sector.verify_integrity(), Ok(()));
}

#[test]
fn test_compaction_correctness_random() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EC7);
    for seed in 0..8 {
        let mut sector = random_sector(seed, 300);
        let before = sector.counts();
        let ids = model_ids(&sector);
        let contents = signatures(&sector);

        let mut flagged = Vec::new();
        for e in 0..before.entity {
            if rng.gen_bool(0.3) {
                sector.mark_deleted(e).unwrap();
                flagged.push(e);
            }
        }
        let mut removed = FamilyCounts::ZERO;
        for &e in &flagged {
            removed += sector.buffers().subtree_counts(e as usize);
        }

        let report = compactor(32).delete_and_compact(&mut sector);
        assert_eq!(report.removed, removed);
        assert_eq!(sector.counts(), before - removed);
        assert_eq!(sector.verify_integrity(), Ok(()));

        let survivors: Vec<u32> = ids
            .iter()
            .enumerate()
            .filter(|(e, _)| !flagged.contains(&(*e as u32)))
            .map(|(_, &id)| id)
            .collect();
        assert_eq!(model_ids(&sector), survivors);

        let surviving_contents: Vec<Vec<u32>> = contents
            .into_iter()
            .enumerate()
            .filter(|(e, _)| !flagged.contains(&(*e as u32)))
            .map(|(_, sig)| sig)
            .collect();
        assert_eq!(signatures(&sector), surviving_contents, "seed {seed}");
    }
}

#[test]
fn test_compaction_without_flags_is_identity() {
    let mut sector = random_sector(11, 500);
    let before_counts = sector.counts();
    let before = sector.buffers().clone();

    let report = compactor(64).delete_and_compact(&mut sector);
    assert!(report.removed.is_zero());
    assert_eq!(sector.counts(), before_counts);
    for family in Family::ALL {
        assert_eq!(
            sector.buffers().family_bytes(family, before_counts.get(family)),
            before.family_bytes(family, before_counts.get(family)),
        );
    }
}

#[test]
fn test_scan_shift_law() {
    let mut sector = random_sector(3, 200);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for e in 0..sector.next_entity() {
        if rng.gen_bool(0.25) {
            sector.mark_deleted(e).unwrap();
        }
    }

    let mut scan = DeleteScan::new(ScanConfig { block_size: 8 }).unwrap();
    let _ = scan.run(sector.buffers(), sector.next_entity());

    let buffers = sector.buffers();
    let mut flagged_hulls = 0;
    for e in 0..sector.next_entity() {
        let f = buffers.entities.flags.as_slice()[e as usize];
        let hulls = buffers.entities.hull_table.as_slice()[e as usize].len();
        if flags::has(f, flags::entity::DELETED) {
            flagged_hulls += hulls;
        } else {
            assert_eq!(scan.prefix(e).hull, flagged_hulls, "entity {e}");
        }
    }

    let counts = sector.counts();
    let mut shifts = ShiftTables::new();
    shifts.prepare(&counts);
    let _ = shifts.mark(&scan, buffers, counts.entity, 16);

    let mut removed_hulls = vec![false; counts.hull as usize];
    let mut removed_points = vec![false; counts.point as usize];
    for e in 0..counts.entity as usize {
        if !flags::has(buffers.entities.flags.as_slice()[e], flags::entity::DELETED) {
            continue;
        }
        for h in buffers.entities.hull_table.as_slice()[e].slots() {
            removed_hulls[h] = true;
            for p in buffers.hulls.point_table.as_slice()[h].slots() {
                removed_points[p] = true;
            }
        }
    }
    assert_slot_shifts(Family::Hull, &removed_hulls, shifts.table(Family::Hull));
    assert_slot_shifts(Family::Point, &removed_points, shifts.table(Family::Point));
}

#[test]
fn test_boundary_counts_agree() {
    let block = 16usize;
    for entities in [0u32, 1, block as u32, block as u32 + 1] {
        let mut sector = random_sector(u64::from(entities), entities);
        let mut expected = FamilyCounts::ZERO;
        for e in (0..entities).step_by(2) {
            sector.mark_deleted(e).unwrap();
            expected += sector.buffers().subtree_counts(e as usize);
        }

        let report = compactor(block).delete_and_compact(&mut sector);
        assert_eq!(report.removed, expected, "entities = {entities}");
        let path = if entities as usize <= block {
            ScanPath::SingleBlock
        } else {
            ScanPath::MultiBlock { blocks: 2 }
        };
        assert_eq!(report.path, path);
        assert_eq!(sector.verify_integrity(), Ok(()));
    }
}

#[test]
fn test_merge_correctness() {
    let mut target = random_sector(5, 40);
    let mut input = OrderedSectorInput::new(&FamilyCounts::ZERO);
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    for _ in 0..25 {
        spawn_random(input.staging_mut(), &mut rng);
    }

    let base = target.counts();
    let staged_hull_tables: Vec<IndexRange> = (0..25)
        .map(|e| input.staging().buffers().entities.hull_table.as_slice()[e])
        .collect();

    let merged = input.merge_into(&mut target);
    assert_eq!(merged.entity, 25);
    assert_eq!(target.next_entity(), base.entity + 25);
    assert!(input.counts().is_zero());

    for (k, local) in staged_hull_tables.iter().enumerate() {
        let e = base.entity as usize + k;
        assert_eq!(
            target.buffers().entities.hull_table.as_slice()[e],
            local.offset(base.hull)
        );
    }
    assert_eq!(target.verify_integrity(), Ok(()));
}

#[test]
fn test_egress_then_ingress_round_trip() {
    let mut sector = random_sector(9, 120);
    let totals = sector.counts();
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    for e in 0..totals.entity {
        if rng.gen_bool(0.4) {
            sector.mark_egress(e).unwrap();
        }
    }

    let counts = sector.count_egress();
    let mut output = UnorderedSectorOutput::new(&FamilyCounts::ZERO);
    let claimed = output.egress(&mut sector, &counts.objects).unwrap();
    let report = compactor(32).delete_and_compact(&mut sector);
    assert_eq!(report.removed, claimed);
    assert_eq!(sector.counts(), totals - claimed);
    assert_eq!(sector.verify_integrity(), Ok(()));

    let batch = output.unload();
    let mut input = OrderedSectorInput::new(&FamilyCounts::ZERO);
    input.absorb(&batch.buffers, &batch.counts);
    assert_eq!(input.staging().verify_integrity(), Ok(()));
    let _ = input.merge_into(&mut sector);

    assert_eq!(sector.counts(), totals);
    assert_eq!(sector.verify_integrity(), Ok(()));

    let mut before = model_ids(&random_sector(9, 120));
    let mut after = model_ids(&sector);
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(before, after);

    let mut before = signatures(&random_sector(9, 120));
    let mut after = signatures(&sector);
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(before, after);
}

//! # Sector Compactor
//!
//! Removes every `DELETED` entity and its subtree, shifting survivors left
//! and rewriting every reference they hold.
//!
//! ## Pipeline
//!
//! ```text
//! 1. delete scan        flags ──▶ per-entity prefixes + removed totals
//! 2. mark               prefixes ──▶ per-slot shift tables
//! 3. compact × 6        read slot i ──▶ relocate ──▶ write slot i - shift
//! 4. retract counters   counter -= removed
//! ```
//!
//! Step 3 walks every family in ascending slot order. A survivor only ever
//! moves left, onto a slot that was already read, so the pass is in place.

use tracing::debug;

use crate::config::{CompactConfig, ScanConfig};
use crate::error::SectorResult;
use crate::scan::{DeleteScan, DeleteScanReport};
use crate::sector::SectorController;
use crate::store::{Family, FamilyBuffer};

use super::linearize::linearize;
use super::shift::{ShiftRelocation, ShiftTables, REMOVED};

/// Delete-and-compact driver for one region.
///
/// Holds the scan lanes and shift tables between ticks so steady-state
/// compaction does not allocate.
#[derive(Debug)]
pub struct SectorCompactor {
    scan: DeleteScan,
    shifts: ShiftTables,
    slice_size: usize,
}

impl SectorCompactor {
    /// Creates a compactor.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid.
    pub fn new(scan: ScanConfig, compact: CompactConfig) -> SectorResult<Self> {
        compact.validate()?;
        Ok(Self {
            scan: DeleteScan::new(scan)?,
            shifts: ShiftTables::new(),
            slice_size: compact.slice_size,
        })
    }

    /// The delete scan, holding prefixes from the last run.
    #[must_use]
    pub const fn scan(&self) -> &DeleteScan {
        &self.scan
    }

    /// Removes every flagged entity and its subtree from `sector`.
    ///
    /// # Returns
    ///
    /// Removed counts per family and the scan strategy taken.
    pub fn delete_and_compact(&mut self, sector: &mut SectorController) -> DeleteScanReport {
        let counts = sector.counts();
        let report = self.scan.run(sector.buffers(), counts.entity);

        if report.removed.entity == 0 {
            debug!(entities = counts.entity, "nothing to compact");
            return report;
        }

        let slice = self.slice_size;
        self.shifts.prepare(&counts);
        let mut dispatches = self
            .shifts
            .mark(&self.scan, sector.buffers(), counts.entity, slice);

        let reloc = ShiftRelocation::new(&self.shifts, &self.scan);
        let buffers = sector.buffers_mut();

        dispatches += compact_family(
            &mut buffers.entities,
            self.shifts.table(Family::Entity),
            slice,
            |entity, slot| entity.relocate(&reloc, slot),
        );
        dispatches += compact_family(
            &mut buffers.hulls,
            self.shifts.table(Family::Hull),
            slice,
            |hull, _| hull.relocate(&reloc),
        );
        dispatches += compact_family(
            &mut buffers.points,
            self.shifts.table(Family::Point),
            slice,
            |point, _| point.relocate(&reloc),
        );
        dispatches += compact_family(
            &mut buffers.edges,
            self.shifts.table(Family::Edge),
            slice,
            |edge, _| edge.relocate(&reloc),
        );
        dispatches += compact_family(
            &mut buffers.hull_bones,
            self.shifts.table(Family::HullBone),
            slice,
            |bone, _| bone.relocate(&reloc),
        );
        dispatches += compact_family(
            &mut buffers.entity_bones,
            self.shifts.table(Family::EntityBone),
            slice,
            |bone, _| bone.relocate(&reloc),
        );

        sector.compact(&report.removed);

        debug!(
            removed_entities = report.removed.entity,
            removed_hulls = report.removed.hull,
            removed_points = report.removed.point,
            path = ?report.path,
            dispatches,
            "compacted sector"
        );

        report
    }
}

/// Moves every surviving slot of one family to `slot - shift`.
///
/// `shifts` covers exactly the live slots. `relocate` receives each survivor
/// together with its slot before the move.
fn compact_family<B, F>(buffer: &mut B, shifts: &[u32], slice: usize, mut relocate: F) -> usize
where
    B: FamilyBuffer,
    F: FnMut(&mut B::Record, u32),
{
    linearize(shifts.len(), slice, |offset, len| {
        for slot in offset..offset + len {
            let shift = shifts[slot];
            if shift == REMOVED {
                continue;
            }
            let mut record = buffer.read(slot);
            relocate(&mut record, slot as u32);
            buffer.write(slot - shift as usize, &record);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{flags, Entity, FamilyCounts, Hull, IndexRange, Point, NULL_INDEX};

    fn spawn(sector: &mut SectorController, x: f32, points: u32) -> u32 {
        let entity = sector.next_entity();
        let hull = sector.next_hull();
        let first = sector.next_point();
        for i in 0..points {
            let _ = sector.create_point(Point::at_rest(
                [x, i as f32],
                i,
                hull,
                [NULL_INDEX; 4],
                0,
            ));
        }
        let _ = sector.create_hull(Hull::at_rest(
            0,
            [x, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            IndexRange::new(first, first + points),
            IndexRange::empty_at(sector.next_edge()),
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

    fn compactor() -> SectorCompactor {
        SectorCompactor::new(ScanConfig { block_size: 2 }, CompactConfig { slice_size: 2 }).unwrap()
    }

    #[test]
    fn test_nothing_flagged_is_a_no_op() {
        let mut sector = SectorController::new(&FamilyCounts::ZERO);
        for i in 0..3 {
            spawn(&mut sector, i as f32, 2);
        }
        let before = sector.buffers().clone();
        let report = compactor().delete_and_compact(&mut sector);
        assert!(report.removed.is_zero());
        assert_eq!(sector.buffers(), &before);
        assert_eq!(sector.next_entity(), 3);
    }

    #[test]
    fn test_removes_flagged_subtree() {
        let mut sector = SectorController::new(&FamilyCounts::ZERO);
        for i in 0..4 {
            spawn(&mut sector, i as f32 * 10.0, 3);
        }
        sector.mark_deleted(1).unwrap();

        let report = compactor().delete_and_compact(&mut sector);
        assert_eq!(report.removed.entity, 1);
        assert_eq!(report.removed.point, 3);
        assert_eq!(sector.next_entity(), 3);
        assert_eq!(sector.next_hull(), 3);
        assert_eq!(sector.next_point(), 9);

        let buffers = sector.buffers();
        let xs: Vec<f32> = (0..3)
            .map(|e| buffers.entities.transform.as_slice()[e][0])
            .collect();
        assert_eq!(xs, vec![0.0, 20.0, 30.0]);

        for e in 0..3u32 {
            let entity = buffers.entities.read(e as usize);
            assert_eq!(entity.hull_table, IndexRange::new(e, e + 1));
            assert_eq!(entity.root_hull, e);
            let hull = buffers.hulls.read(e as usize);
            assert_eq!(hull.entity_id, e);
            assert_eq!(hull.point_table, IndexRange::new(e * 3, e * 3 + 3));
            for p in hull.point_table.slots() {
                assert_eq!(buffers.points.read(p).hull_index, e);
            }
        }
        assert!(!flags::has(
            buffers.entities.flags.as_slice()[1],
            flags::entity::DELETED
        ));
    }

    #[test]
    fn test_delete_everything() {
        let mut sector = SectorController::new(&FamilyCounts::ZERO);
        for i in 0..5 {
            spawn(&mut sector, i as f32, 1);
            sector.mark_deleted(i).unwrap();
        }
        let report = compactor().delete_and_compact(&mut sector);
        assert_eq!(report.removed.entity, 5);
        assert!(sector.is_empty());
    }
}

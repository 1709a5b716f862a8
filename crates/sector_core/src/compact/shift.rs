//! # Shift Tables
//!
//! Per-slot left shifts for one compaction, filled from the delete scan.
//!
//! ```text
//! entity:  E0   E1*  E2   E3*  E4          (* = DELETED)
//! prefix:  0    0    1    1    2
//! shift:   0    R    1    R    2           (R = REMOVED)
//! ```
//!
//! Every child inherits the value of its owning entity, so one lookup per
//! slot tells the compactor whether the slot survives and where it lands.

use crate::scan::DeleteScan;
use crate::store::{flags, Family, FamilyCounts, IndexRange, Relocation, SectorBuffers, NULL_INDEX};

use super::linearize::linearize;

/// Shift value of a slot that does not survive compaction.
pub const REMOVED: u32 = u32::MAX;

/// One shift column per family.
#[derive(Clone, Debug, Default)]
pub struct ShiftTables {
    point: Vec<u32>,
    edge: Vec<u32>,
    hull: Vec<u32>,
    entity: Vec<u32>,
    hull_bone: Vec<u32>,
    entity_bone: Vec<u32>,
}

impl ShiftTables {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift column of one family.
    #[must_use]
    pub fn table(&self, family: Family) -> &[u32] {
        match family {
            Family::Point => &self.point,
            Family::Edge => &self.edge,
            Family::Hull => &self.hull,
            Family::Entity => &self.entity,
            Family::HullBone => &self.hull_bone,
            Family::EntityBone => &self.entity_bone,
        }
    }

    fn table_mut(&mut self, family: Family) -> &mut Vec<u32> {
        match family {
            Family::Point => &mut self.point,
            Family::Edge => &mut self.edge,
            Family::Hull => &mut self.hull,
            Family::Entity => &mut self.entity,
            Family::HullBone => &mut self.hull_bone,
            Family::EntityBone => &mut self.entity_bone,
        }
    }

    /// Sizes every column to the live counts and zeroes it.
    pub fn prepare(&mut self, counts: &FamilyCounts) {
        for family in Family::ALL {
            let table = self.table_mut(family);
            table.clear();
            table.resize(counts.get(family) as usize, 0);
        }
    }

    /// Fills every owned slot with its owner's shift, or [`REMOVED`].
    ///
    /// Walks the entities in slices of `slice`; each entity writes its own
    /// slot and every slot of its subtree.
    ///
    /// # Returns
    ///
    /// The number of dispatches issued.
    pub fn mark(
        &mut self,
        scan: &DeleteScan,
        buffers: &SectorBuffers,
        entity_count: u32,
        slice: usize,
    ) -> usize {
        let entity_flags = buffers.entities.flags.as_slice();
        let hull_tables = buffers.entities.hull_table.as_slice();
        let bone_tables = buffers.entities.bone_table.as_slice();

        linearize(entity_count as usize, slice, |offset, len| {
            for e in offset..offset + len {
                let deleted = flags::has(entity_flags[e], flags::entity::DELETED);
                let prefix = scan.prefix(e as u32);
                let shift = |family: Family| {
                    if deleted {
                        REMOVED
                    } else {
                        prefix.get(family)
                    }
                };

                self.entity[e] = shift(Family::Entity);
                fill(&mut self.entity_bone, bone_tables[e], shift(Family::EntityBone));

                let hulls = hull_tables[e];
                fill(&mut self.hull, hulls, shift(Family::Hull));
                for h in hulls.slots() {
                    fill(
                        &mut self.point,
                        buffers.hulls.point_table.as_slice()[h],
                        shift(Family::Point),
                    );
                    fill(
                        &mut self.edge,
                        buffers.hulls.edge_table.as_slice()[h],
                        shift(Family::Edge),
                    );
                    fill(
                        &mut self.hull_bone,
                        buffers.hulls.bone_table.as_slice()[h],
                        shift(Family::HullBone),
                    );
                }
            }
        })
    }
}

fn fill(table: &mut [u32], range: IndexRange, value: u32) {
    let slots = range.slots();
    let end = slots.end.min(table.len());
    let start = slots.start.min(end);
    table[start..end].fill(value);
}

/// Relocation that applies a compaction's shifts.
///
/// Single references subtract the referenced slot's own shift; references to
/// removed slots become [`NULL_INDEX`]. Ranges move by their owning entity's
/// scan prefix, which also places empty ranges.
#[derive(Clone, Copy, Debug)]
pub struct ShiftRelocation<'a> {
    shifts: &'a ShiftTables,
    scan: &'a DeleteScan,
}

impl<'a> ShiftRelocation<'a> {
    /// Binds filled shift tables to the scan they came from.
    #[must_use]
    pub const fn new(shifts: &'a ShiftTables, scan: &'a DeleteScan) -> Self {
        Self { shifts, scan }
    }
}

impl Relocation for ShiftRelocation<'_> {
    fn index(&self, family: Family, index: u32) -> u32 {
        match self.shifts.table(family).get(index as usize) {
            Some(&REMOVED) | None => NULL_INDEX,
            Some(&shift) => index - shift,
        }
    }

    fn range(&self, family: Family, range: IndexRange, owner: u32) -> IndexRange {
        range.shift_down(self.scan.prefix(owner).get(family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    /// Three entities, one hull each, two points per hull.
    fn three_entities() -> SectorBuffers {
        let mut buffers = SectorBuffers::new(&FamilyCounts {
            point: 6,
            hull: 3,
            entity: 3,
            ..FamilyCounts::ZERO
        });
        for e in 0..3u32 {
            buffers
                .entities
                .hull_table
                .set(e as usize, IndexRange::new(e, e + 1));
            buffers
                .hulls
                .point_table
                .set(e as usize, IndexRange::new(e * 2, e * 2 + 2));
        }
        buffers
    }

    #[test]
    fn test_mark_propagates_to_children() {
        let mut buffers = three_entities();
        buffers.entities.flags.set(1, flags::entity::DELETED);
        let counts = FamilyCounts {
            point: 6,
            hull: 3,
            entity: 3,
            ..FamilyCounts::ZERO
        };

        let mut scan = DeleteScan::new(ScanConfig::default()).unwrap();
        let _ = scan.run(&buffers, 3);
        let mut shifts = ShiftTables::new();
        shifts.prepare(&counts);
        let dispatches = shifts.mark(&scan, &buffers, 3, 2);

        assert_eq!(dispatches, 2);
        assert_eq!(shifts.table(Family::Entity), &[0, REMOVED, 1]);
        assert_eq!(shifts.table(Family::Hull), &[0, REMOVED, 1]);
        assert_eq!(shifts.table(Family::Point), &[0, 0, REMOVED, REMOVED, 2, 2]);
    }

    #[test]
    fn test_relocation_nulls_removed_targets() {
        let mut buffers = three_entities();
        buffers.entities.flags.set(0, flags::entity::DELETED);
        let mut scan = DeleteScan::new(ScanConfig::default()).unwrap();
        let _ = scan.run(&buffers, 3);
        let mut shifts = ShiftTables::new();
        shifts.prepare(&FamilyCounts {
            point: 6,
            hull: 3,
            entity: 3,
            ..FamilyCounts::ZERO
        });
        let _ = shifts.mark(&scan, &buffers, 3, 256);

        let reloc = ShiftRelocation::new(&shifts, &scan);
        assert_eq!(reloc.index(Family::Hull, 0), NULL_INDEX);
        assert_eq!(reloc.index(Family::Hull, 2), 1);
        assert_eq!(reloc.index(Family::Point, 5), 3);
        assert_eq!(
            reloc.range(Family::Point, IndexRange::new(4, 6), 2),
            IndexRange::new(2, 4)
        );
        assert_eq!(
            reloc.range(Family::EntityBone, IndexRange::empty_at(0), 2),
            IndexRange::empty_at(0)
        );
    }
}

//! Structural checks over a sector's live objects.
//!
//! Verified per tick by the runtime when enabled, and after every operation
//! in tests. Checks run in family order and stop at the first violation.

use crate::error::{SectorError, SectorResult};
use crate::store::{Family, FamilyBuffer, IndexRange, NULL_INDEX};

use super::SectorController;

/// Tracks the end of the previous non-empty sibling range.
struct RangeCursor {
    family: Family,
    field: &'static str,
    limit: u32,
    prev_end: u32,
}

impl RangeCursor {
    const fn new(family: Family, field: &'static str, limit: u32) -> Self {
        Self {
            family,
            field,
            limit,
            prev_end: 0,
        }
    }

    fn check(&mut self, slot: u32, range: IndexRange) -> SectorResult<()> {
        if range.end > self.limit {
            return Err(SectorError::DanglingReference {
                family: self.family,
                slot,
                field: self.field,
                value: range.end,
                limit: self.limit,
            });
        }
        if range.start > range.end {
            return Err(self.overlap(slot));
        }
        if !range.is_empty() {
            if range.start < self.prev_end {
                return Err(self.overlap(slot));
            }
            self.prev_end = range.end;
        }
        Ok(())
    }

    const fn overlap(&self, slot: u32) -> SectorError {
        SectorError::OverlappingRange {
            family: self.family,
            slot,
            field: self.field,
        }
    }
}

fn check_index(
    family: Family,
    slot: u32,
    field: &'static str,
    value: u32,
    limit: u32,
    optional: bool,
) -> SectorResult<()> {
    if (optional && value == NULL_INDEX) || value < limit {
        Ok(())
    } else {
        Err(SectorError::DanglingReference {
            family,
            slot,
            field,
            value,
            limit,
        })
    }
}

impl SectorController {
    /// Verifies every reference and ownership invariant of the live objects.
    ///
    /// - every single reference is below its target counter (or null where
    ///   optional)
    /// - sibling child ranges are ordered and disjoint
    /// - hulls and points point back at the parent whose range holds them
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify_integrity(&self) -> SectorResult<()> {
        let n = self.counts();
        let b = self.buffers();

        let mut hull_ranges = RangeCursor::new(Family::Entity, "hull_table", n.hull);
        let mut armature_ranges = RangeCursor::new(Family::Entity, "bone_table", n.entity_bone);
        for e in 0..n.entity {
            let entity = b.entities.read(e as usize);
            hull_ranges.check(e, entity.hull_table)?;
            armature_ranges.check(e, entity.bone_table)?;
            check_index(Family::Entity, e, "root_hull", entity.root_hull, n.hull, true)?;
            for h in entity.hull_table.start..entity.hull_table.end {
                let owner = b.hulls.entity_id.as_slice()[h as usize];
                if owner != e {
                    return Err(SectorError::OwnerMismatch {
                        family: Family::Hull,
                        slot: h,
                        expected: e,
                        found: owner,
                    });
                }
            }
        }

        let mut point_ranges = RangeCursor::new(Family::Hull, "point_table", n.point);
        let mut edge_ranges = RangeCursor::new(Family::Hull, "edge_table", n.edge);
        let mut bone_ranges = RangeCursor::new(Family::Hull, "bone_table", n.hull_bone);
        for h in 0..n.hull {
            let hull = b.hulls.read(h as usize);
            check_index(Family::Hull, h, "entity_id", hull.entity_id, n.entity, false)?;
            point_ranges.check(h, hull.point_table)?;
            edge_ranges.check(h, hull.edge_table)?;
            bone_ranges.check(h, hull.bone_table)?;
            for p in hull.point_table.start..hull.point_table.end {
                let owner = b.points.hull_index.as_slice()[p as usize];
                if owner != h {
                    return Err(SectorError::OwnerMismatch {
                        family: Family::Point,
                        slot: p,
                        expected: h,
                        found: owner,
                    });
                }
            }
        }

        for p in 0..n.point {
            let point = b.points.read(p as usize);
            check_index(Family::Point, p, "hull_index", point.hull_index, n.hull, false)?;
            for bone in point.bone_table {
                check_index(Family::Point, p, "bone_table", bone, n.hull_bone, true)?;
            }
        }

        for i in 0..n.edge {
            let edge = b.edges.read(i as usize);
            check_index(Family::Edge, i, "p1", edge.p1, n.point, false)?;
            check_index(Family::Edge, i, "p2", edge.p2, n.point, false)?;
        }

        for i in 0..n.hull_bone {
            let bind = b.hull_bones.bind_pose_id.as_slice()[i as usize];
            check_index(Family::HullBone, i, "bind_pose_id", bind, n.entity_bone, true)?;
        }

        for i in 0..n.entity_bone {
            let parent = b.entity_bones.parent_id.as_slice()[i as usize];
            check_index(Family::EntityBone, i, "parent_id", parent, n.entity_bone, true)?;
        }

        Ok(())
    }
}

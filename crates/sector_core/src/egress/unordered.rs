//! # Unordered Sector Output
//!
//! Extracts `SECTOR_OUT` entities and their subtrees into a zero-based region.
//!
//! ```text
//! source:   E0  E1* E2  E3*          (* = SECTOR_OUT)
//!                │       │
//!   claim ───────┴───┬───┘           one atomic claim per entity: its slot
//!                    ▼               and every child range at once
//! output:   E3' E1'                  order depends on claim order
//! ```
//!
//! Claims run in parallel and are serialized by a lock on the claim cursor.
//! Because each entity claims its whole subtree in one step, an entity that
//! lands before another also has all of its children placed before the
//! other's, so the output can be re-ingested directly.

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

use crate::config::transfer_capacity;
use crate::error::{SectorError, SectorResult};
use crate::sector::SectorController;
use crate::store::{
    flags, scatter_records, Family, FamilyBuffer, FamilyCounts, IndexRange, RecordScratch,
    Relocation, SectorBuffers, NULL_INDEX,
};

use super::counts::EgressCategory;

/// Forward and inverse slot maps of one family.
#[derive(Clone, Debug, Default)]
struct SlotMap {
    /// Source slot to destination slot.
    forward: Vec<u32>,
    /// Destination slot to source slot.
    inverse: Vec<u32>,
}

impl SlotMap {
    fn reset(&mut self, live: u32) {
        self.forward.clear();
        self.forward.resize(live as usize, NULL_INDEX);
        self.inverse.clear();
    }

    fn set(&mut self, source: usize, dest: u32) {
        self.forward[source] = dest;
        self.inverse[dest as usize] = source as u32;
    }
}

/// Old-to-new slot maps for one extraction.
#[derive(Clone, Debug, Default)]
pub struct EgressMaps {
    point: SlotMap,
    edge: SlotMap,
    hull: SlotMap,
    entity: SlotMap,
    hull_bone: SlotMap,
    entity_bone: SlotMap,
    /// Claim base of every extracted entity, indexed by its source slot.
    claims: Vec<FamilyCounts>,
    /// Where each extracted hull's children start, indexed by its source slot.
    hull_bases: Vec<FamilyCounts>,
}

impl EgressMaps {
    /// Destination slot of a source slot, or [`NULL_INDEX`] if it stays.
    #[must_use]
    pub fn map(&self, family: Family, slot: u32) -> u32 {
        self.table(family)
            .forward
            .get(slot as usize)
            .copied()
            .unwrap_or(NULL_INDEX)
    }

    /// Source slot of a destination slot, or [`NULL_INDEX`] past the output.
    #[must_use]
    pub fn source_of(&self, family: Family, slot: u32) -> u32 {
        self.table(family)
            .inverse
            .get(slot as usize)
            .copied()
            .unwrap_or(NULL_INDEX)
    }

    fn table(&self, family: Family) -> &SlotMap {
        match family {
            Family::Point => &self.point,
            Family::Edge => &self.edge,
            Family::Hull => &self.hull,
            Family::Entity => &self.entity,
            Family::HullBone => &self.hull_bone,
            Family::EntityBone => &self.entity_bone,
        }
    }

    fn table_mut(&mut self, family: Family) -> &mut SlotMap {
        match family {
            Family::Point => &mut self.point,
            Family::Edge => &mut self.edge,
            Family::Hull => &mut self.hull,
            Family::Entity => &mut self.entity,
            Family::HullBone => &mut self.hull_bone,
            Family::EntityBone => &mut self.entity_bone,
        }
    }

    fn reset(&mut self, live: &FamilyCounts) {
        for family in Family::ALL {
            self.table_mut(family).reset(live.get(family));
        }
        self.claims.clear();
        self.claims.resize(live.entity as usize, FamilyCounts::ZERO);
        self.hull_bases.clear();
        self.hull_bases.resize(live.hull as usize, FamilyCounts::ZERO);
    }

    fn size_output(&mut self, claimed: &FamilyCounts) {
        for family in Family::ALL {
            self.table_mut(family)
                .inverse
                .resize(claimed.get(family) as usize, NULL_INDEX);
        }
    }

    /// Maps every slot of `entity`'s subtree from its claim base.
    fn assign(&mut self, buffers: &SectorBuffers, entity: u32, base: FamilyCounts) {
        let e = entity as usize;
        self.claims[e] = base;
        self.entity.set(e, base.entity);

        let entity_bones = buffers.entities.bone_table.as_slice()[e];
        for (k, b) in entity_bones.slots().enumerate() {
            self.entity_bone.set(b, base.entity_bone + k as u32);
        }

        let mut next = base;
        for h in buffers.entities.hull_table.as_slice()[e].slots() {
            self.hull.set(h, next.hull);
            self.hull_bases[h] = next;
            next.hull += 1;
            for p in buffers.hulls.point_table.as_slice()[h].slots() {
                self.point.set(p, next.point);
                next.point += 1;
            }
            for i in buffers.hulls.edge_table.as_slice()[h].slots() {
                self.edge.set(i, next.edge);
                next.edge += 1;
            }
            for b in buffers.hulls.bone_table.as_slice()[h].slots() {
                self.hull_bone.set(b, next.hull_bone);
                next.hull_bone += 1;
            }
        }
    }
}

/// Relocation through egress maps.
///
/// Non-empty ranges keep their length and start at the mapped first child.
/// Empty ranges land where the owner's next child would have gone: the
/// entity's claim base, or for a hull, the running position after its
/// earlier siblings.
#[derive(Clone, Copy, Debug)]
pub struct MapRelocation<'a> {
    maps: &'a EgressMaps,
    hull: Option<u32>,
}

impl<'a> MapRelocation<'a> {
    /// Relocates through filled maps.
    #[must_use]
    pub const fn new(maps: &'a EgressMaps) -> Self {
        Self { maps, hull: None }
    }

    /// The same maps, placing empty ranges for the hull at source slot `hull`.
    #[must_use]
    pub const fn for_hull(self, hull: u32) -> Self {
        Self {
            maps: self.maps,
            hull: Some(hull),
        }
    }
}

impl Relocation for MapRelocation<'_> {
    fn index(&self, family: Family, index: u32) -> u32 {
        self.maps.map(family, index)
    }

    fn range(&self, family: Family, range: IndexRange, owner: u32) -> IndexRange {
        if range.is_empty() {
            let base = match self.hull {
                Some(hull) => self.maps.hull_bases.get(hull as usize),
                None => self.maps.claims.get(owner as usize),
            };
            return IndexRange::empty_at(base.map_or(0, |b| b.get(family)));
        }
        let start = self.maps.map(family, range.start);
        IndexRange::new(start, start + range.len())
    }
}

/// Owned copy of one tick's extracted region.
#[derive(Clone, Debug, PartialEq)]
pub struct EgressBatch {
    /// Buffers sized exactly to `counts`.
    pub buffers: SectorBuffers,
    /// Objects per family.
    pub counts: FamilyCounts,
}

impl EgressBatch {
    /// True when the batch holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_zero()
    }

    /// Raw column bytes of one family, in column declaration order.
    #[must_use]
    pub fn column_bytes(&self, family: Family) -> Vec<&[u8]> {
        self.buffers.family_bytes(family, self.counts.get(family))
    }
}

/// Destination of `SECTOR_OUT` extraction.
#[derive(Clone, Debug)]
pub struct UnorderedSectorOutput {
    buffers: SectorBuffers,
    counts: FamilyCounts,
    maps: EgressMaps,
    claims: Vec<(u32, FamilyCounts)>,
    scratch: RecordScratch,
}

impl Default for UnorderedSectorOutput {
    fn default() -> Self {
        Self::new(&transfer_capacity())
    }
}

impl UnorderedSectorOutput {
    /// Creates an empty output.
    #[must_use]
    pub fn new(capacity: &FamilyCounts) -> Self {
        Self {
            buffers: SectorBuffers::new(capacity),
            counts: FamilyCounts::ZERO,
            maps: EgressMaps::default(),
            claims: Vec::new(),
            scratch: RecordScratch::default(),
        }
    }

    /// Extracted objects per family.
    #[must_use]
    pub const fn counts(&self) -> FamilyCounts {
        self.counts
    }

    /// Extracted columns.
    #[must_use]
    pub const fn buffers(&self) -> &SectorBuffers {
        &self.buffers
    }

    /// Maps from the last extraction.
    #[must_use]
    pub const fn maps(&self) -> &EgressMaps {
        &self.maps
    }

    /// Empties the output.
    pub fn clear(&mut self) {
        self.counts = FamilyCounts::ZERO;
    }

    /// Moves every `SECTOR_OUT` entity and its subtree out of `source`.
    ///
    /// Replaces the previous contents. Extracted source entities are marked
    /// `DELETED`; the copies have `SECTOR_OUT` cleared.
    ///
    /// # Arguments
    ///
    /// * `source` - Active region
    /// * `expected` - Object counts from [`SectorController::count_egress`]
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::EgressCountMismatch`] if the claimed objects do
    /// not add up to `expected`. Nothing is copied or flagged in that case.
    pub fn egress(
        &mut self,
        source: &mut SectorController,
        expected: &FamilyCounts,
    ) -> SectorResult<FamilyCounts> {
        let live = source.counts();
        self.maps.reset(&live);
        self.counts = FamilyCounts::ZERO;

        let src = source.buffers();
        let entity_flags = &src.entities.flags.as_slice()[..live.entity as usize];

        self.claims.clear();
        let cursor = Mutex::new((FamilyCounts::ZERO, &mut self.claims));
        entity_flags
            .par_iter()
            .enumerate()
            .filter(|&(_, &f)| EgressCategory::classify(f) == Some(EgressCategory::SectorOut))
            .for_each(|(e, _)| {
                let subtree = src.subtree_counts(e);
                let mut guard = cursor.lock();
                let (next, claims) = &mut *guard;
                claims.push((e as u32, *next));
                *next += subtree;
            });

        let (claimed, _) = cursor.into_inner();
        if let Some(family) = Family::ALL
            .into_iter()
            .find(|&f| claimed.get(f) != expected.get(f))
        {
            return Err(SectorError::EgressCountMismatch {
                family,
                expected: expected.get(family),
                claimed: claimed.get(family),
            });
        }

        self.maps.size_output(&claimed);
        for &(entity, base) in &self.claims {
            self.maps.assign(src, entity, base);
        }

        self.buffers.ensure_capacity(&claimed);
        let maps = &self.maps;
        let reloc = MapRelocation::new(maps);
        let dst = &mut self.buffers;
        let scratch = &mut self.scratch;

        scatter_records(&mut dst.entities, &mut scratch.entities, 0, claimed.entity, |d| {
            let slot = maps.source_of(Family::Entity, d);
            let mut e = src.entities.read(slot as usize);
            e.relocate(&reloc, slot);
            e.flags &= !flags::entity::SECTOR_OUT;
            e
        });
        scatter_records(&mut dst.hulls, &mut scratch.hulls, 0, claimed.hull, |d| {
            let slot = maps.source_of(Family::Hull, d);
            let mut h = src.hulls.read(slot as usize);
            h.relocate(&reloc.for_hull(slot));
            h
        });
        scatter_records(&mut dst.points, &mut scratch.points, 0, claimed.point, |d| {
            let mut p = src.points.read(maps.source_of(Family::Point, d) as usize);
            p.relocate(&reloc);
            p
        });
        scatter_records(&mut dst.edges, &mut scratch.edges, 0, claimed.edge, |d| {
            let mut e = src.edges.read(maps.source_of(Family::Edge, d) as usize);
            e.relocate(&reloc);
            e
        });
        scatter_records(
            &mut dst.hull_bones,
            &mut scratch.hull_bones,
            0,
            claimed.hull_bone,
            |d| {
                let mut b = src.hull_bones.read(maps.source_of(Family::HullBone, d) as usize);
                b.relocate(&reloc);
                b
            },
        );
        scatter_records(
            &mut dst.entity_bones,
            &mut scratch.entity_bones,
            0,
            claimed.entity_bone,
            |d| {
                let mut b = src.entity_bones.read(maps.source_of(Family::EntityBone, d) as usize);
                b.relocate(&reloc);
                b
            },
        );
        self.counts = claimed;

        let entity_flags = source.buffers_mut().entities.flags.as_mut_slice();
        for &(entity, _) in &self.claims {
            entity_flags[entity as usize] |= flags::entity::DELETED;
        }

        debug!(
            entities = claimed.entity,
            hulls = claimed.hull,
            points = claimed.point,
            "extracted sector output"
        );

        Ok(claimed)
    }

    /// Owned copy of the extracted region.
    #[must_use]
    pub fn unload(&self) -> EgressBatch {
        EgressBatch {
            buffers: self.buffers.snapshot(&self.counts),
            counts: self.counts,
        }
    }
}

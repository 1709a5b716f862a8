//! # Ingress Merger
//!
//! Appends a staged region onto the end of an active region.
//!
//! ```text
//! target before:  [ live 0..N )
//! staged:         [ 0..K )            references are staging-local
//! target after:   [ live 0..N )[ staged + N ..N+K )
//! ```
//!
//! Every cross-reference in a staged object gains the base of the family it
//! points into. Bases are snapshotted once, before the first copy, so family
//! copy order does not matter.

use tracing::debug;

use crate::config::transfer_capacity;
use crate::sector::SectorController;
use crate::store::{
    scatter_records, Family, FamilyBuffer, FamilyCounts, IndexRange, RecordScratch, Relocation,
    SectorBuffers,
};

/// Relocation that adds a per-family base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetRelocation {
    base: FamilyCounts,
}

impl OffsetRelocation {
    /// Relocates into a region whose counters stood at `base`.
    #[must_use]
    pub const fn new(base: FamilyCounts) -> Self {
        Self { base }
    }
}

impl Relocation for OffsetRelocation {
    fn index(&self, family: Family, index: u32) -> u32 {
        index + self.base.get(family)
    }

    fn range(&self, family: Family, range: IndexRange, _owner: u32) -> IndexRange {
        range.offset(self.base.get(family))
    }
}

/// Copies `counts` objects from `source` onto the end of `target`.
///
/// `source` must be self-consistent and zero-based: every reference it holds
/// points inside `source` itself. Relocated records are staged in `scratch`.
///
/// # Returns
///
/// The target counters before the merge.
pub fn merge_region(
    source: &SectorBuffers,
    counts: &FamilyCounts,
    target: &mut SectorController,
    scratch: &mut RecordScratch,
) -> FamilyCounts {
    let base = target.counts();
    if counts.is_zero() {
        return base;
    }

    target.buffers_mut().ensure_capacity(&(base + *counts));
    let reloc = OffsetRelocation::new(base);
    let dst = target.buffers_mut();

    scatter_records(
        &mut dst.entities,
        &mut scratch.entities,
        base.entity,
        counts.entity,
        |j| {
            let mut e = source.entities.read(j as usize);
            e.relocate(&reloc, j);
            e
        },
    );
    scatter_records(&mut dst.hulls, &mut scratch.hulls, base.hull, counts.hull, |j| {
        let mut h = source.hulls.read(j as usize);
        h.relocate(&reloc);
        h
    });
    scatter_records(&mut dst.points, &mut scratch.points, base.point, counts.point, |j| {
        let mut p = source.points.read(j as usize);
        p.relocate(&reloc);
        p
    });
    scatter_records(&mut dst.edges, &mut scratch.edges, base.edge, counts.edge, |j| {
        let mut e = source.edges.read(j as usize);
        e.relocate(&reloc);
        e
    });
    scatter_records(
        &mut dst.hull_bones,
        &mut scratch.hull_bones,
        base.hull_bone,
        counts.hull_bone,
        |j| {
            let mut b = source.hull_bones.read(j as usize);
            b.relocate(&reloc);
            b
        },
    );
    scatter_records(
        &mut dst.entity_bones,
        &mut scratch.entity_bones,
        base.entity_bone,
        counts.entity_bone,
        |j| {
            let mut b = source.entity_bones.read(j as usize);
            b.relocate(&reloc);
            b
        },
    );

    target.expand(counts);

    debug!(
        entities = counts.entity,
        hulls = counts.hull,
        points = counts.point,
        base_entity = base.entity,
        "merged region"
    );

    base
}

/// Staging region for objects entering the active sector.
///
/// Loaders create objects here with staging-local indices, then the driver
/// merges the whole region at once.
#[derive(Clone, Debug)]
pub struct OrderedSectorInput {
    staging: SectorController,
    scratch: RecordScratch,
}

impl Default for OrderedSectorInput {
    fn default() -> Self {
        Self::new(&transfer_capacity())
    }
}

impl OrderedSectorInput {
    /// Creates an empty staging region.
    #[must_use]
    pub fn new(capacity: &FamilyCounts) -> Self {
        Self {
            staging: SectorController::new(capacity),
            scratch: RecordScratch::default(),
        }
    }

    /// The staging region, for creators.
    pub fn staging_mut(&mut self) -> &mut SectorController {
        &mut self.staging
    }

    /// The staging region.
    #[must_use]
    pub const fn staging(&self) -> &SectorController {
        &self.staging
    }

    /// Objects currently staged.
    #[must_use]
    pub const fn counts(&self) -> FamilyCounts {
        self.staging.counts()
    }

    /// Appends a self-consistent, zero-based region onto the staged objects.
    ///
    /// Used to re-ingest egress batches; the batch is rebased past whatever
    /// is already staged.
    pub fn absorb(&mut self, source: &SectorBuffers, counts: &FamilyCounts) {
        let _ = merge_region(source, counts, &mut self.staging, &mut self.scratch);
    }

    /// Moves every staged object into `target` and empties the staging region.
    ///
    /// # Returns
    ///
    /// The number of objects merged per family.
    pub fn merge_into(&mut self, target: &mut SectorController) -> FamilyCounts {
        let counts = self.staging.counts();
        let _ = merge_region(self.staging.buffers(), &counts, target, &mut self.scratch);
        self.staging.reset();
        counts
    }
}

//! # Delete Scan
//!
//! Turns per-entity `DELETED` flags into per-entity shift prefixes.
//!
//! Each entity contributes a count vector: what it owns if flagged, zero
//! otherwise. The exclusive prefix of that vector at entity `i` is how many
//! slots of each family the flagged entities before `i` free up. Children are
//! laid out in parent order, so that prefix is also the left shift of every
//! child of entity `i`.
//!
//! ## Lanes
//!
//! ```text
//! 2-wide: [ edges, hull_bones ]
//! 4-wide: [ points, hulls, entities, entity_bones ]
//! ```

use rayon::prelude::*;

use super::block::{BlockScanner, ScanPath};
use crate::config::ScanConfig;
use crate::error::SectorResult;
use crate::store::{flags, FamilyCounts, SectorBuffers};

const LANE2_EDGE: usize = 0;
const LANE2_HULL_BONE: usize = 1;

const LANE4_POINT: usize = 0;
const LANE4_HULL: usize = 1;
const LANE4_ENTITY: usize = 2;
const LANE4_ENTITY_BONE: usize = 3;

/// Packs a count vector into the two scan lanes.
#[inline]
#[must_use]
pub fn pack_lanes(counts: &FamilyCounts) -> ([u32; 2], [u32; 4]) {
    let mut lane2 = [0u32; 2];
    lane2[LANE2_EDGE] = counts.edge;
    lane2[LANE2_HULL_BONE] = counts.hull_bone;

    let mut lane4 = [0u32; 4];
    lane4[LANE4_POINT] = counts.point;
    lane4[LANE4_HULL] = counts.hull;
    lane4[LANE4_ENTITY] = counts.entity;
    lane4[LANE4_ENTITY_BONE] = counts.entity_bone;

    (lane2, lane4)
}

/// Unpacks the two scan lanes into a named count vector.
#[inline]
#[must_use]
pub fn unpack_lanes(lane2: &[u32; 2], lane4: &[u32; 4]) -> FamilyCounts {
    FamilyCounts {
        point: lane4[LANE4_POINT],
        edge: lane2[LANE2_EDGE],
        hull: lane4[LANE4_HULL],
        entity: lane4[LANE4_ENTITY],
        hull_bone: lane2[LANE2_HULL_BONE],
        entity_bone: lane4[LANE4_ENTITY_BONE],
    }
}

/// Summary of one delete scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteScanReport {
    /// Objects removed per family.
    pub removed: FamilyCounts,
    /// Strategy the scan took (identical for both lanes).
    pub path: ScanPath,
}

/// Delete scan engine.
///
/// Lane buffers are kept between ticks and only grow.
#[derive(Debug)]
pub struct DeleteScan {
    scanner: BlockScanner,
    lanes2: Vec<[u32; 2]>,
    lanes4: Vec<[u32; 4]>,
    scanned: usize,
}

impl DeleteScan {
    /// Creates a delete scan engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan configuration is invalid.
    pub fn new(config: ScanConfig) -> SectorResult<Self> {
        Ok(Self {
            scanner: BlockScanner::new(config)?,
            lanes2: Vec::new(),
            lanes4: Vec::new(),
            scanned: 0,
        })
    }

    /// The underlying scanner.
    #[must_use]
    pub const fn scanner(&self) -> &BlockScanner {
        &self.scanner
    }

    /// Scans the first `entity_count` entities.
    ///
    /// # Returns
    ///
    /// Removed counts per family and the strategy taken.
    pub fn run(&mut self, buffers: &SectorBuffers, entity_count: u32) -> DeleteScanReport {
        let n = entity_count as usize;
        if self.lanes2.len() < n {
            self.lanes2.resize(n, [0; 2]);
            self.lanes4.resize(n, [0; 4]);
        }
        self.scanned = n;

        let flag_column = &buffers.entities.flags.as_slice()[..n];
        self.lanes2[..n]
            .par_iter_mut()
            .zip(self.lanes4[..n].par_iter_mut())
            .enumerate()
            .for_each(|(entity, (lane2, lane4))| {
                let counts = if flags::has(flag_column[entity], flags::entity::DELETED) {
                    buffers.subtree_counts(entity)
                } else {
                    FamilyCounts::ZERO
                };
                (*lane2, *lane4) = pack_lanes(&counts);
            });

        let out2 = self.scanner.scan_exclusive(&mut self.lanes2[..n]);
        let out4 = self.scanner.scan_exclusive(&mut self.lanes4[..n]);
        debug_assert_eq!(out2.path, out4.path);

        DeleteScanReport {
            removed: unpack_lanes(&out2.total, &out4.total),
            path: out4.path,
        }
    }

    /// Exclusive prefix at `entity` from the last [`run`](Self::run).
    ///
    /// # Panics
    ///
    /// Panics if `entity` was not covered by the last scan.
    #[inline]
    #[must_use]
    pub fn prefix(&self, entity: u32) -> FamilyCounts {
        let e = entity as usize;
        assert!(e < self.scanned, "entity {e} outside last scan");
        unpack_lanes(&self.lanes2[e], &self.lanes4[e])
    }
}

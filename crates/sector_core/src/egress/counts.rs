//! Egress classification and counting.

use rayon::prelude::*;
use tracing::debug;

use crate::sector::SectorController;
use crate::store::{flags, FamilyCounts};

/// Why an entity leaves the active region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EgressCategory {
    /// Crossed the sector boundary; extracted with its whole subtree.
    SectorOut,
    /// Destroyed; reported as a broken object.
    Broken,
    /// Picked up; reported as a collected object.
    Collected,
}

impl EgressCategory {
    /// Classifies an entity by its flags.
    ///
    /// `COLLECTED` wins over `BROKEN`, which wins over `SECTOR_OUT`. Entities
    /// already marked `DELETED` never egress.
    #[must_use]
    pub const fn classify(entity_flags: u32) -> Option<Self> {
        if flags::has(entity_flags, flags::entity::DELETED) {
            None
        } else if flags::has(entity_flags, flags::entity::COLLECTED) {
            Some(Self::Collected)
        } else if flags::has(entity_flags, flags::entity::BROKEN) {
            Some(Self::Broken)
        } else if flags::has(entity_flags, flags::entity::SECTOR_OUT) {
            Some(Self::SectorOut)
        } else {
            None
        }
    }
}

/// Sizes of one tick's egress outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EgressCounts {
    /// Objects per family owned by `SECTOR_OUT` entities.
    pub objects: FamilyCounts,
    /// Entities reported as broken.
    pub broken: u32,
    /// Entities reported as collected.
    pub collected: u32,
}

impl EgressCounts {
    /// True when nothing leaves the region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_zero() && self.broken == 0 && self.collected == 0
    }
}

impl std::ops::Add for EgressCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            objects: self.objects + rhs.objects,
            broken: self.broken + rhs.broken,
            collected: self.collected + rhs.collected,
        }
    }
}

impl SectorController {
    /// Tallies everything that leaves the region this tick.
    ///
    /// Destination buffers are sized from the result before extraction.
    #[must_use]
    pub fn count_egress(&self) -> EgressCounts {
        let n = self.next_entity() as usize;
        let buffers = self.buffers();
        let entity_flags = &buffers.entities.flags.as_slice()[..n];

        let counts = entity_flags
            .par_iter()
            .enumerate()
            .map(|(e, &f)| match EgressCategory::classify(f) {
                Some(EgressCategory::SectorOut) => EgressCounts {
                    objects: buffers.subtree_counts(e),
                    ..EgressCounts::default()
                },
                Some(EgressCategory::Broken) => EgressCounts {
                    broken: 1,
                    ..EgressCounts::default()
                },
                Some(EgressCategory::Collected) => EgressCounts {
                    collected: 1,
                    ..EgressCounts::default()
                },
                None => EgressCounts::default(),
            })
            .reduce(EgressCounts::default, |a, b| a + b);

        debug!(
            entities = counts.objects.entity,
            broken = counts.broken,
            collected = counts.collected,
            "counted egress"
        );
        counts
    }
}

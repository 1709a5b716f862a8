//! Broken and collected object reports.
//!
//! Entities flagged `BROKEN` or `COLLECTED` leave the region without their
//! subtree. Gameplay only needs a short summary of each one, so a report
//! holds a few columns and the entity itself is marked `DELETED`.

use bytemuck::{Pod, Zeroable};

use crate::error::{SectorError, SectorResult};
use crate::sector::SectorController;
use crate::store::{flags, Family};

use super::counts::EgressCategory;

/// Summary of one destroyed entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BrokenObject {
    /// Position at the moment of destruction.
    pub position: [f32; 2],
    /// Gameplay type id.
    pub entity_type: u32,
    /// Model id.
    pub model_id: u32,
}

/// Summary of one picked-up entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct CollectedObject {
    /// Gameplay type id.
    pub entity_type: u32,
}

/// Destination of `BROKEN` entities.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrokenObjectBuffer {
    objects: Vec<BrokenObject>,
}

/// Destination of `COLLECTED` entities.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedObjectBuffer {
    objects: Vec<CollectedObject>,
}

/// Fails unless exactly `expected` entities fall in `category`.
fn check_category(
    source: &SectorController,
    category: EgressCategory,
    expected: u32,
) -> SectorResult<()> {
    let n = source.next_entity() as usize;
    let claimed = source.buffers().entities.flags.as_slice()[..n]
        .iter()
        .filter(|&&f| EgressCategory::classify(f) == Some(category))
        .count() as u32;
    if claimed == expected {
        Ok(())
    } else {
        Err(SectorError::EgressCountMismatch {
            family: Family::Entity,
            expected,
            claimed,
        })
    }
}

/// Visits every entity of `category` in slot order and marks it `DELETED`.
///
/// Nothing is visited or flagged unless exactly `expected` entities match.
fn drain_category<F>(
    source: &mut SectorController,
    category: EgressCategory,
    expected: u32,
    mut visit: F,
) -> SectorResult<u32>
where
    F: FnMut(&SectorController, usize),
{
    check_category(source, category, expected)?;

    for e in 0..source.next_entity() as usize {
        let f = source.buffers().entities.flags.as_slice()[e];
        if EgressCategory::classify(f) == Some(category) {
            visit(&*source, e);
            source.buffers_mut().entities.flags.as_mut_slice()[e] |= flags::entity::DELETED;
        }
    }
    Ok(expected)
}

impl BrokenObjectBuffer {
    /// Checks that exactly `expected` entities are `BROKEN`, touching nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::EgressCountMismatch`] otherwise.
    pub fn check(source: &SectorController, expected: u32) -> SectorResult<()> {
        check_category(source, EgressCategory::Broken, expected)
    }

    /// Reports every `BROKEN` entity and marks it `DELETED`.
    ///
    /// Replaces the previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::EgressCountMismatch`] if the number of broken
    /// entities differs from `expected`.
    pub fn extract(&mut self, source: &mut SectorController, expected: u32) -> SectorResult<u32> {
        self.objects.clear();
        let objects = &mut self.objects;
        drain_category(source, EgressCategory::Broken, expected, |sector, e| {
            let entities = &sector.buffers().entities;
            let [x, y, _, _] = entities.transform.as_slice()[e];
            objects.push(BrokenObject {
                position: [x, y],
                entity_type: entities.entity_type.as_slice()[e],
                model_id: entities.model_id.as_slice()[e],
            });
        })
    }

    /// Reported objects.
    #[must_use]
    pub fn objects(&self) -> &[BrokenObject] {
        &self.objects
    }

    /// Number of reported objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Empties the report.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Owned copy of the report.
    #[must_use]
    pub fn unload(&self) -> Vec<BrokenObject> {
        self.objects.clone()
    }

    /// Raw bytes of the report.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.objects)
    }
}

impl CollectedObjectBuffer {
    /// Checks that exactly `expected` entities are `COLLECTED`, touching
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::EgressCountMismatch`] otherwise.
    pub fn check(source: &SectorController, expected: u32) -> SectorResult<()> {
        check_category(source, EgressCategory::Collected, expected)
    }

    /// Reports every `COLLECTED` entity and marks it `DELETED`.
    ///
    /// Replaces the previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::EgressCountMismatch`] if the number of collected
    /// entities differs from `expected`.
    pub fn extract(&mut self, source: &mut SectorController, expected: u32) -> SectorResult<u32> {
        self.objects.clear();
        let objects = &mut self.objects;
        drain_category(source, EgressCategory::Collected, expected, |sector, e| {
            objects.push(CollectedObject {
                entity_type: sector.buffers().entities.entity_type.as_slice()[e],
            });
        })
    }

    /// Reported objects.
    #[must_use]
    pub fn objects(&self) -> &[CollectedObject] {
        &self.objects
    }

    /// Number of reported objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Empties the report.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Owned copy of the report.
    #[must_use]
    pub fn unload(&self) -> Vec<CollectedObject> {
        self.objects.clone()
    }
}

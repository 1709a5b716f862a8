//! # Sector Controller
//!
//! Owns one region's buffers and its six slot counters.
//!
//! Counters change in exactly three ways:
//!
//! ```text
//! create_*   counter += 1          (Object Creator)
//! compact    counter -= removed    (Compactor)
//! expand     counter += merged     (Ingress Merger, target side)
//! reset      counter  = 0          (Ingress Merger, staging side)
//! ```

use crate::error::{SectorError, SectorResult};
use crate::store::{
    flags, Edge, Entity, EntityBone, Family, FamilyBuffer, FamilyCounts, Hull, HullBone, Point,
    SectorBuffers,
};

/// Animation and motion state of one entity, as read and written by gameplay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntityInfo {
    /// Current position (read only; ignored on write).
    pub position: [f32; 2],
    /// Acceleration.
    pub accel: [f32; 2],
    /// Animation time per layer.
    pub anim_time: [f32; 4],
    /// Previous animation time per layer.
    pub prev_time: [f32; 4],
    /// Blend factor per layer.
    pub anim_blend: [f32; 4],
    /// Motion state counters.
    pub motion_state: [i16; 2],
    /// Active animation per layer.
    pub anim_layers: [i32; 4],
    /// Previous animation per layer.
    pub prev_layers: [i32; 4],
    /// Entity flag bits.
    pub flags: u32,
}

/// Buffers and counters of one region.
///
/// # Example
///
/// ```rust,ignore
/// let mut sector = SectorController::new(&config::core_capacity());
/// let entity = sector.create_entity(Entity::new(/* ... */));
/// sector.mark_deleted(entity)?;
/// ```
#[derive(Clone, Debug)]
pub struct SectorController {
    buffers: SectorBuffers,
    next: FamilyCounts,
}

impl SectorController {
    /// Creates an empty region.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Initial slots per family; buffers grow past this on demand
    #[must_use]
    pub fn new(capacity: &FamilyCounts) -> Self {
        Self {
            buffers: SectorBuffers::new(capacity),
            next: FamilyCounts::ZERO,
        }
    }

    /// Read access to every column.
    #[inline]
    #[must_use]
    pub const fn buffers(&self) -> &SectorBuffers {
        &self.buffers
    }

    /// Write access to every column.
    ///
    /// Callers may update attributes in place but must not move objects or
    /// point references past the live counters.
    #[inline]
    pub fn buffers_mut(&mut self) -> &mut SectorBuffers {
        &mut self.buffers
    }

    /// All six live counters.
    #[inline]
    #[must_use]
    pub const fn counts(&self) -> FamilyCounts {
        self.next
    }

    /// Next free point slot.
    #[inline]
    #[must_use]
    pub const fn next_point(&self) -> u32 {
        self.next.point
    }

    /// Next free edge slot.
    #[inline]
    #[must_use]
    pub const fn next_edge(&self) -> u32 {
        self.next.edge
    }

    /// Next free hull slot.
    #[inline]
    #[must_use]
    pub const fn next_hull(&self) -> u32 {
        self.next.hull
    }

    /// Next free entity slot.
    #[inline]
    #[must_use]
    pub const fn next_entity(&self) -> u32 {
        self.next.entity
    }

    /// Next free hull bone slot.
    #[inline]
    #[must_use]
    pub const fn next_hull_bone(&self) -> u32 {
        self.next.hull_bone
    }

    /// Next free entity bone slot.
    #[inline]
    #[must_use]
    pub const fn next_entity_bone(&self) -> u32 {
        self.next.entity_bone
    }

    /// True when the region holds no objects.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next.is_zero()
    }

    /// Zeroes every counter. Buffer capacity is kept.
    pub fn reset(&mut self) {
        self.next = FamilyCounts::ZERO;
    }

    /// Advances counters after objects were written past them.
    pub fn expand(&mut self, added: &FamilyCounts) {
        self.next += *added;
    }

    /// Retracts counters after compaction removed objects.
    pub fn compact(&mut self, removed: &FamilyCounts) {
        self.next -= *removed;
    }

    // ========================================================================
    // OBJECT CREATOR
    // ========================================================================

    /// Appends a point.
    ///
    /// # Returns
    ///
    /// The slot the point was written to.
    pub fn create_point(&mut self, point: Point) -> u32 {
        append(&mut self.buffers.points, &mut self.next.point, &point)
    }

    /// Appends an edge.
    pub fn create_edge(&mut self, edge: Edge) -> u32 {
        append(&mut self.buffers.edges, &mut self.next.edge, &edge)
    }

    /// Appends a hull.
    pub fn create_hull(&mut self, hull: Hull) -> u32 {
        append(&mut self.buffers.hulls, &mut self.next.hull, &hull)
    }

    /// Appends an entity.
    pub fn create_entity(&mut self, entity: Entity) -> u32 {
        append(&mut self.buffers.entities, &mut self.next.entity, &entity)
    }

    /// Appends a hull bone.
    pub fn create_hull_bone(&mut self, bone: HullBone) -> u32 {
        append(&mut self.buffers.hull_bones, &mut self.next.hull_bone, &bone)
    }

    /// Appends an entity bone.
    pub fn create_entity_bone(&mut self, bone: EntityBone) -> u32 {
        append(
            &mut self.buffers.entity_bones,
            &mut self.next.entity_bone,
            &bone,
        )
    }

    // ========================================================================
    // ENTITY ACCESSORS
    // ========================================================================

    fn check_entity(&self, entity: u32) -> SectorResult<usize> {
        if entity < self.next.entity {
            Ok(entity as usize)
        } else {
            Err(SectorError::IndexOutOfRange {
                family: Family::Entity,
                index: entity,
                count: self.next.entity,
            })
        }
    }

    /// Sets flag bits on a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn set_entity_flags(&mut self, entity: u32, mask: u32) -> SectorResult<()> {
        let slot = self.check_entity(entity)?;
        self.buffers.entities.flags.as_mut_slice()[slot] |= mask;
        Ok(())
    }

    /// Flags an entity and its subtree for removal by the next delete scan.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn mark_deleted(&mut self, entity: u32) -> SectorResult<()> {
        self.set_entity_flags(entity, flags::entity::DELETED)
    }

    /// Flags an entity as leaving the region; egress extracts it.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn mark_egress(&mut self, entity: u32) -> SectorResult<()> {
        self.set_entity_flags(entity, flags::entity::SECTOR_OUT)
    }

    /// Reads an entity's position.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn read_position(&self, entity: u32) -> SectorResult<[f32; 2]> {
        let slot = self.check_entity(entity)?;
        let [x, y, _, _] = self.buffers.entities.transform.as_slice()[slot];
        Ok([x, y])
    }

    /// Overwrites an entity's acceleration for this tick.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn update_accel(&mut self, entity: u32, accel: [f32; 2]) -> SectorResult<()> {
        let slot = self.check_entity(entity)?;
        self.buffers.entities.accel.as_mut_slice()[slot] = accel;
        Ok(())
    }

    /// Reads an entity's animation and motion state.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn read_entity_info(&self, entity: u32) -> SectorResult<EntityInfo> {
        let slot = self.check_entity(entity)?;
        let e = self.buffers.entities.read(slot);
        Ok(EntityInfo {
            position: [e.transform[0], e.transform[1]],
            accel: e.accel,
            anim_time: e.anim_time,
            prev_time: e.prev_time,
            anim_blend: e.anim_blend,
            motion_state: e.motion_state,
            anim_layers: e.anim_layers,
            prev_layers: e.prev_layers,
            flags: e.flags,
        })
    }

    /// Writes an entity's animation and motion state.
    ///
    /// The position in `info` is ignored; positions belong to the solver.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::IndexOutOfRange`] for a slot past the counter.
    pub fn write_entity_info(&mut self, entity: u32, info: &EntityInfo) -> SectorResult<()> {
        let slot = self.check_entity(entity)?;
        let entities = &mut self.buffers.entities;
        entities.accel.as_mut_slice()[slot] = info.accel;
        entities.anim_time.as_mut_slice()[slot] = info.anim_time;
        entities.prev_time.as_mut_slice()[slot] = info.prev_time;
        entities.anim_blend.as_mut_slice()[slot] = info.anim_blend;
        entities.motion_state.as_mut_slice()[slot] = info.motion_state;
        entities.anim_layers.as_mut_slice()[slot] = info.anim_layers;
        entities.prev_layers.as_mut_slice()[slot] = info.prev_layers;
        entities.flags.as_mut_slice()[slot] = info.flags;
        Ok(())
    }
}

/// Writes `record` at `*counter`, then advances the counter.
fn append<B: FamilyBuffer>(buffer: &mut B, counter: &mut u32, record: &B::Record) -> u32 {
    let slot = *counter;
    buffer.ensure_capacity(slot as usize + 1);
    buffer.write(slot as usize, record);
    *counter += 1;
    slot
}

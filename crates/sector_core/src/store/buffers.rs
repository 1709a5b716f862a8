//! # Family Buffers
//!
//! Structure-of-arrays storage for the six families.
//!
//! ```text
//! PointBuffers:  position[]  vertex_reference[]  hull_index[]  hit_count[]  flags[]  bone_table[]
//!                   P0 P1 P2 ...   (one column per attribute, shared slot number)
//! ```
//!
//! Kernels that move whole objects go through [`FamilyBuffer`], which gathers
//! a slot into a record and scatters a record back into a slot. Solver-style
//! code that touches one attribute uses the columns directly.

use rayon::prelude::*;

use super::column::Column;
use super::counts::{Family, FamilyCounts};
use super::records::{Edge, Entity, EntityBone, Hull, HullBone, IndexRange, Point};

/// Row-level access to one family's columns.
pub trait FamilyBuffer {
    /// Row type.
    type Record: Copy + Send + Sync;

    /// Which family this buffer stores.
    const FAMILY: Family;

    /// Allocated slots (identical across all columns).
    fn capacity(&self) -> usize;

    /// Grows every column to at least `required` slots.
    fn ensure_capacity(&mut self, required: usize);

    /// Gathers one slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is past capacity.
    fn read(&self, slot: usize) -> Self::Record;

    /// Scatters one record into a slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is past capacity.
    fn write(&mut self, slot: usize, record: &Self::Record);

    /// Copies the first `len` slots of every column from `other`.
    fn copy_prefix_from(&mut self, other: &Self, len: usize);

    /// Raw bytes of the first `len` slots of every column, in declaration order.
    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]>;
}

// ============================================================================
// POINTS
// ============================================================================

/// Point columns.
#[derive(Clone, Debug, PartialEq)]
pub struct PointBuffers {
    /// Current and previous position.
    pub position: Column<[f32; 4]>,
    /// Model vertex reference.
    pub vertex_reference: Column<u32>,
    /// Owning hull.
    pub hull_index: Column<u32>,
    /// Collision hits.
    pub hit_count: Column<u32>,
    /// Flag bits.
    pub flags: Column<u32>,
    /// Driving hull bones.
    pub bone_table: Column<[u32; 4]>,
}

impl PointBuffers {
    /// Creates point columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            position: Column::new(capacity),
            vertex_reference: Column::new(capacity),
            hull_index: Column::new(capacity),
            hit_count: Column::new(capacity),
            flags: Column::new(capacity),
            bone_table: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for PointBuffers {
    type Record = Point;
    const FAMILY: Family = Family::Point;

    fn capacity(&self) -> usize {
        self.position.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.position.ensure_capacity(required);
        self.vertex_reference.ensure_capacity(required);
        self.hull_index.ensure_capacity(required);
        self.hit_count.ensure_capacity(required);
        self.flags.ensure_capacity(required);
        self.bone_table.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> Point {
        Point {
            position: self.position.as_slice()[slot],
            vertex_reference: self.vertex_reference.as_slice()[slot],
            hull_index: self.hull_index.as_slice()[slot],
            hit_count: self.hit_count.as_slice()[slot],
            flags: self.flags.as_slice()[slot],
            bone_table: self.bone_table.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, p: &Point) {
        self.position.as_mut_slice()[slot] = p.position;
        self.vertex_reference.as_mut_slice()[slot] = p.vertex_reference;
        self.hull_index.as_mut_slice()[slot] = p.hull_index;
        self.hit_count.as_mut_slice()[slot] = p.hit_count;
        self.flags.as_mut_slice()[slot] = p.flags;
        self.bone_table.as_mut_slice()[slot] = p.bone_table;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.position.copy_prefix_from(&other.position, len);
        self.vertex_reference.copy_prefix_from(&other.vertex_reference, len);
        self.hull_index.copy_prefix_from(&other.hull_index, len);
        self.hit_count.copy_prefix_from(&other.hit_count, len);
        self.flags.copy_prefix_from(&other.flags, len);
        self.bone_table.copy_prefix_from(&other.bone_table, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.position.prefix_bytes(len),
            self.vertex_reference.prefix_bytes(len),
            self.hull_index.prefix_bytes(len),
            self.hit_count.prefix_bytes(len),
            self.flags.prefix_bytes(len),
            self.bone_table.prefix_bytes(len),
        ]
    }
}

// ============================================================================
// EDGES
// ============================================================================

/// Edge columns.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeBuffers {
    /// Endpoint pair (p1, p2).
    pub endpoints: Column<[u32; 2]>,
    /// Rest length.
    pub length: Column<f32>,
    /// Flag bits.
    pub flags: Column<u32>,
    /// Pin id.
    pub pin: Column<u32>,
}

impl EdgeBuffers {
    /// Creates edge columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            endpoints: Column::new(capacity),
            length: Column::new(capacity),
            flags: Column::new(capacity),
            pin: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for EdgeBuffers {
    type Record = Edge;
    const FAMILY: Family = Family::Edge;

    fn capacity(&self) -> usize {
        self.endpoints.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.endpoints.ensure_capacity(required);
        self.length.ensure_capacity(required);
        self.flags.ensure_capacity(required);
        self.pin.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> Edge {
        let [p1, p2] = self.endpoints.as_slice()[slot];
        Edge {
            p1,
            p2,
            length: self.length.as_slice()[slot],
            flags: self.flags.as_slice()[slot],
            pin: self.pin.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, e: &Edge) {
        self.endpoints.as_mut_slice()[slot] = [e.p1, e.p2];
        self.length.as_mut_slice()[slot] = e.length;
        self.flags.as_mut_slice()[slot] = e.flags;
        self.pin.as_mut_slice()[slot] = e.pin;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.endpoints.copy_prefix_from(&other.endpoints, len);
        self.length.copy_prefix_from(&other.length, len);
        self.flags.copy_prefix_from(&other.flags, len);
        self.pin.copy_prefix_from(&other.pin, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.endpoints.prefix_bytes(len),
            self.length.prefix_bytes(len),
            self.flags.prefix_bytes(len),
            self.pin.prefix_bytes(len),
        ]
    }
}

// ============================================================================
// HULLS
// ============================================================================

/// Hull columns.
#[derive(Clone, Debug, PartialEq)]
pub struct HullBuffers {
    /// Current and previous center.
    pub position: Column<[f32; 4]>,
    /// Scale.
    pub scale: Column<[f32; 2]>,
    /// Reference and current angle.
    pub rotation: Column<[f32; 2]>,
    /// Friction.
    pub friction: Column<f32>,
    /// Restitution.
    pub restitution: Column<f32>,
    /// Mesh id.
    pub mesh_id: Column<u32>,
    /// Texture uv offset.
    pub uv_offset: Column<u32>,
    /// Remaining integrity.
    pub integrity: Column<i32>,
    /// Flag bits.
    pub flags: Column<u32>,
    /// Owning entity.
    pub entity_id: Column<u32>,
    /// Owned points.
    pub point_table: Column<IndexRange>,
    /// Owned edges.
    pub edge_table: Column<IndexRange>,
    /// Owned hull bones.
    pub bone_table: Column<IndexRange>,
}

impl HullBuffers {
    /// Creates hull columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            position: Column::new(capacity),
            scale: Column::new(capacity),
            rotation: Column::new(capacity),
            friction: Column::new(capacity),
            restitution: Column::new(capacity),
            mesh_id: Column::new(capacity),
            uv_offset: Column::new(capacity),
            integrity: Column::new(capacity),
            flags: Column::new(capacity),
            entity_id: Column::new(capacity),
            point_table: Column::new(capacity),
            edge_table: Column::new(capacity),
            bone_table: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for HullBuffers {
    type Record = Hull;
    const FAMILY: Family = Family::Hull;

    fn capacity(&self) -> usize {
        self.position.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.position.ensure_capacity(required);
        self.scale.ensure_capacity(required);
        self.rotation.ensure_capacity(required);
        self.friction.ensure_capacity(required);
        self.restitution.ensure_capacity(required);
        self.mesh_id.ensure_capacity(required);
        self.uv_offset.ensure_capacity(required);
        self.integrity.ensure_capacity(required);
        self.flags.ensure_capacity(required);
        self.entity_id.ensure_capacity(required);
        self.point_table.ensure_capacity(required);
        self.edge_table.ensure_capacity(required);
        self.bone_table.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> Hull {
        Hull {
            position: self.position.as_slice()[slot],
            scale: self.scale.as_slice()[slot],
            rotation: self.rotation.as_slice()[slot],
            friction: self.friction.as_slice()[slot],
            restitution: self.restitution.as_slice()[slot],
            mesh_id: self.mesh_id.as_slice()[slot],
            uv_offset: self.uv_offset.as_slice()[slot],
            integrity: self.integrity.as_slice()[slot],
            flags: self.flags.as_slice()[slot],
            entity_id: self.entity_id.as_slice()[slot],
            point_table: self.point_table.as_slice()[slot],
            edge_table: self.edge_table.as_slice()[slot],
            bone_table: self.bone_table.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, h: &Hull) {
        self.position.as_mut_slice()[slot] = h.position;
        self.scale.as_mut_slice()[slot] = h.scale;
        self.rotation.as_mut_slice()[slot] = h.rotation;
        self.friction.as_mut_slice()[slot] = h.friction;
        self.restitution.as_mut_slice()[slot] = h.restitution;
        self.mesh_id.as_mut_slice()[slot] = h.mesh_id;
        self.uv_offset.as_mut_slice()[slot] = h.uv_offset;
        self.integrity.as_mut_slice()[slot] = h.integrity;
        self.flags.as_mut_slice()[slot] = h.flags;
        self.entity_id.as_mut_slice()[slot] = h.entity_id;
        self.point_table.as_mut_slice()[slot] = h.point_table;
        self.edge_table.as_mut_slice()[slot] = h.edge_table;
        self.bone_table.as_mut_slice()[slot] = h.bone_table;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.position.copy_prefix_from(&other.position, len);
        self.scale.copy_prefix_from(&other.scale, len);
        self.rotation.copy_prefix_from(&other.rotation, len);
        self.friction.copy_prefix_from(&other.friction, len);
        self.restitution.copy_prefix_from(&other.restitution, len);
        self.mesh_id.copy_prefix_from(&other.mesh_id, len);
        self.uv_offset.copy_prefix_from(&other.uv_offset, len);
        self.integrity.copy_prefix_from(&other.integrity, len);
        self.flags.copy_prefix_from(&other.flags, len);
        self.entity_id.copy_prefix_from(&other.entity_id, len);
        self.point_table.copy_prefix_from(&other.point_table, len);
        self.edge_table.copy_prefix_from(&other.edge_table, len);
        self.bone_table.copy_prefix_from(&other.bone_table, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.position.prefix_bytes(len),
            self.scale.prefix_bytes(len),
            self.rotation.prefix_bytes(len),
            self.friction.prefix_bytes(len),
            self.restitution.prefix_bytes(len),
            self.mesh_id.prefix_bytes(len),
            self.uv_offset.prefix_bytes(len),
            self.integrity.prefix_bytes(len),
            self.flags.prefix_bytes(len),
            self.entity_id.prefix_bytes(len),
            self.point_table.prefix_bytes(len),
            self.edge_table.prefix_bytes(len),
            self.bone_table.prefix_bytes(len),
        ]
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Entity columns.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityBuffers {
    /// Transform.
    pub transform: Column<[f32; 4]>,
    /// Acceleration.
    pub accel: Column<[f32; 2]>,
    /// Root hull.
    pub root_hull: Column<u32>,
    /// Model id.
    pub model_id: Column<u32>,
    /// Model transform id.
    pub model_transform_id: Column<u32>,
    /// Gameplay type.
    pub entity_type: Column<u32>,
    /// Flag bits.
    pub flags: Column<u32>,
    /// Mass.
    pub mass: Column<f32>,
    /// Active animation layers.
    pub anim_layers: Column<[i32; 4]>,
    /// Previous animation layers.
    pub prev_layers: Column<[i32; 4]>,
    /// Animation time.
    pub anim_time: Column<[f32; 4]>,
    /// Previous animation time.
    pub prev_time: Column<[f32; 4]>,
    /// Layer blend.
    pub anim_blend: Column<[f32; 4]>,
    /// Motion state.
    pub motion_state: Column<[i16; 2]>,
    /// Owned hulls.
    pub hull_table: Column<IndexRange>,
    /// Owned armature bones.
    pub bone_table: Column<IndexRange>,
}

impl EntityBuffers {
    /// Creates entity columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            transform: Column::new(capacity),
            accel: Column::new(capacity),
            root_hull: Column::new(capacity),
            model_id: Column::new(capacity),
            model_transform_id: Column::new(capacity),
            entity_type: Column::new(capacity),
            flags: Column::new(capacity),
            mass: Column::new(capacity),
            anim_layers: Column::new(capacity),
            prev_layers: Column::new(capacity),
            anim_time: Column::new(capacity),
            prev_time: Column::new(capacity),
            anim_blend: Column::new(capacity),
            motion_state: Column::new(capacity),
            hull_table: Column::new(capacity),
            bone_table: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for EntityBuffers {
    type Record = Entity;
    const FAMILY: Family = Family::Entity;

    fn capacity(&self) -> usize {
        self.transform.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.transform.ensure_capacity(required);
        self.accel.ensure_capacity(required);
        self.root_hull.ensure_capacity(required);
        self.model_id.ensure_capacity(required);
        self.model_transform_id.ensure_capacity(required);
        self.entity_type.ensure_capacity(required);
        self.flags.ensure_capacity(required);
        self.mass.ensure_capacity(required);
        self.anim_layers.ensure_capacity(required);
        self.prev_layers.ensure_capacity(required);
        self.anim_time.ensure_capacity(required);
        self.prev_time.ensure_capacity(required);
        self.anim_blend.ensure_capacity(required);
        self.motion_state.ensure_capacity(required);
        self.hull_table.ensure_capacity(required);
        self.bone_table.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> Entity {
        Entity {
            transform: self.transform.as_slice()[slot],
            accel: self.accel.as_slice()[slot],
            root_hull: self.root_hull.as_slice()[slot],
            model_id: self.model_id.as_slice()[slot],
            model_transform_id: self.model_transform_id.as_slice()[slot],
            entity_type: self.entity_type.as_slice()[slot],
            flags: self.flags.as_slice()[slot],
            mass: self.mass.as_slice()[slot],
            anim_layers: self.anim_layers.as_slice()[slot],
            prev_layers: self.prev_layers.as_slice()[slot],
            anim_time: self.anim_time.as_slice()[slot],
            prev_time: self.prev_time.as_slice()[slot],
            anim_blend: self.anim_blend.as_slice()[slot],
            motion_state: self.motion_state.as_slice()[slot],
            hull_table: self.hull_table.as_slice()[slot],
            bone_table: self.bone_table.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, e: &Entity) {
        self.transform.as_mut_slice()[slot] = e.transform;
        self.accel.as_mut_slice()[slot] = e.accel;
        self.root_hull.as_mut_slice()[slot] = e.root_hull;
        self.model_id.as_mut_slice()[slot] = e.model_id;
        self.model_transform_id.as_mut_slice()[slot] = e.model_transform_id;
        self.entity_type.as_mut_slice()[slot] = e.entity_type;
        self.flags.as_mut_slice()[slot] = e.flags;
        self.mass.as_mut_slice()[slot] = e.mass;
        self.anim_layers.as_mut_slice()[slot] = e.anim_layers;
        self.prev_layers.as_mut_slice()[slot] = e.prev_layers;
        self.anim_time.as_mut_slice()[slot] = e.anim_time;
        self.prev_time.as_mut_slice()[slot] = e.prev_time;
        self.anim_blend.as_mut_slice()[slot] = e.anim_blend;
        self.motion_state.as_mut_slice()[slot] = e.motion_state;
        self.hull_table.as_mut_slice()[slot] = e.hull_table;
        self.bone_table.as_mut_slice()[slot] = e.bone_table;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.transform.copy_prefix_from(&other.transform, len);
        self.accel.copy_prefix_from(&other.accel, len);
        self.root_hull.copy_prefix_from(&other.root_hull, len);
        self.model_id.copy_prefix_from(&other.model_id, len);
        self.model_transform_id.copy_prefix_from(&other.model_transform_id, len);
        self.entity_type.copy_prefix_from(&other.entity_type, len);
        self.flags.copy_prefix_from(&other.flags, len);
        self.mass.copy_prefix_from(&other.mass, len);
        self.anim_layers.copy_prefix_from(&other.anim_layers, len);
        self.prev_layers.copy_prefix_from(&other.prev_layers, len);
        self.anim_time.copy_prefix_from(&other.anim_time, len);
        self.prev_time.copy_prefix_from(&other.prev_time, len);
        self.anim_blend.copy_prefix_from(&other.anim_blend, len);
        self.motion_state.copy_prefix_from(&other.motion_state, len);
        self.hull_table.copy_prefix_from(&other.hull_table, len);
        self.bone_table.copy_prefix_from(&other.bone_table, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.transform.prefix_bytes(len),
            self.accel.prefix_bytes(len),
            self.root_hull.prefix_bytes(len),
            self.model_id.prefix_bytes(len),
            self.model_transform_id.prefix_bytes(len),
            self.entity_type.prefix_bytes(len),
            self.flags.prefix_bytes(len),
            self.mass.prefix_bytes(len),
            self.anim_layers.prefix_bytes(len),
            self.prev_layers.prefix_bytes(len),
            self.anim_time.prefix_bytes(len),
            self.prev_time.prefix_bytes(len),
            self.anim_blend.prefix_bytes(len),
            self.motion_state.prefix_bytes(len),
            self.hull_table.prefix_bytes(len),
            self.bone_table.prefix_bytes(len),
        ]
    }
}

// ============================================================================
// BONES
// ============================================================================

/// Hull bone columns.
#[derive(Clone, Debug, PartialEq)]
pub struct HullBoneBuffers {
    /// Bone instance transform.
    pub transform: Column<[f32; 16]>,
    /// Bind pose armature bone.
    pub bind_pose_id: Column<u32>,
    /// Inverse bind pose reference.
    pub inv_bind_pose_id: Column<u32>,
}

impl HullBoneBuffers {
    /// Creates hull bone columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            transform: Column::new(capacity),
            bind_pose_id: Column::new(capacity),
            inv_bind_pose_id: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for HullBoneBuffers {
    type Record = HullBone;
    const FAMILY: Family = Family::HullBone;

    fn capacity(&self) -> usize {
        self.transform.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.transform.ensure_capacity(required);
        self.bind_pose_id.ensure_capacity(required);
        self.inv_bind_pose_id.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> HullBone {
        HullBone {
            transform: self.transform.as_slice()[slot],
            bind_pose_id: self.bind_pose_id.as_slice()[slot],
            inv_bind_pose_id: self.inv_bind_pose_id.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, b: &HullBone) {
        self.transform.as_mut_slice()[slot] = b.transform;
        self.bind_pose_id.as_mut_slice()[slot] = b.bind_pose_id;
        self.inv_bind_pose_id.as_mut_slice()[slot] = b.inv_bind_pose_id;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.transform.copy_prefix_from(&other.transform, len);
        self.bind_pose_id.copy_prefix_from(&other.bind_pose_id, len);
        self.inv_bind_pose_id.copy_prefix_from(&other.inv_bind_pose_id, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.transform.prefix_bytes(len),
            self.bind_pose_id.prefix_bytes(len),
            self.inv_bind_pose_id.prefix_bytes(len),
        ]
    }
}

/// Entity bone columns.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityBoneBuffers {
    /// Armature bone transform.
    pub transform: Column<[f32; 16]>,
    /// Model bone reference.
    pub reference_id: Column<u32>,
    /// Parent bone.
    pub parent_id: Column<u32>,
}

impl EntityBoneBuffers {
    /// Creates entity bone columns.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            transform: Column::new(capacity),
            reference_id: Column::new(capacity),
            parent_id: Column::new(capacity),
        }
    }
}

impl FamilyBuffer for EntityBoneBuffers {
    type Record = EntityBone;
    const FAMILY: Family = Family::EntityBone;

    fn capacity(&self) -> usize {
        self.transform.capacity()
    }

    fn ensure_capacity(&mut self, required: usize) {
        self.transform.ensure_capacity(required);
        self.reference_id.ensure_capacity(required);
        self.parent_id.ensure_capacity(required);
    }

    fn read(&self, slot: usize) -> EntityBone {
        EntityBone {
            transform: self.transform.as_slice()[slot],
            reference_id: self.reference_id.as_slice()[slot],
            parent_id: self.parent_id.as_slice()[slot],
        }
    }

    fn write(&mut self, slot: usize, b: &EntityBone) {
        self.transform.as_mut_slice()[slot] = b.transform;
        self.reference_id.as_mut_slice()[slot] = b.reference_id;
        self.parent_id.as_mut_slice()[slot] = b.parent_id;
    }

    fn copy_prefix_from(&mut self, other: &Self, len: usize) {
        self.transform.copy_prefix_from(&other.transform, len);
        self.reference_id.copy_prefix_from(&other.reference_id, len);
        self.parent_id.copy_prefix_from(&other.parent_id, len);
    }

    fn prefix_bytes(&self, len: usize) -> Vec<&[u8]> {
        vec![
            self.transform.prefix_bytes(len),
            self.reference_id.prefix_bytes(len),
            self.parent_id.prefix_bytes(len),
        ]
    }
}

// ============================================================================
// SECTOR BUFFERS
// ============================================================================

/// All six families of one region.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorBuffers {
    /// Points.
    pub points: PointBuffers,
    /// Edges.
    pub edges: EdgeBuffers,
    /// Hulls.
    pub hulls: HullBuffers,
    /// Entities.
    pub entities: EntityBuffers,
    /// Hull bones.
    pub hull_bones: HullBoneBuffers,
    /// Entity bones.
    pub entity_bones: EntityBoneBuffers,
}

impl SectorBuffers {
    /// Creates buffers with the given initial capacity per family.
    #[must_use]
    pub fn new(capacity: &FamilyCounts) -> Self {
        Self {
            points: PointBuffers::new(capacity.point as usize),
            edges: EdgeBuffers::new(capacity.edge as usize),
            hulls: HullBuffers::new(capacity.hull as usize),
            entities: EntityBuffers::new(capacity.entity as usize),
            hull_bones: HullBoneBuffers::new(capacity.hull_bone as usize),
            entity_bones: EntityBoneBuffers::new(capacity.entity_bone as usize),
        }
    }

    /// Grows every family to at least the given slot counts.
    pub fn ensure_capacity(&mut self, required: &FamilyCounts) {
        self.points.ensure_capacity(required.point as usize);
        self.edges.ensure_capacity(required.edge as usize);
        self.hulls.ensure_capacity(required.hull as usize);
        self.entities.ensure_capacity(required.entity as usize);
        self.hull_bones.ensure_capacity(required.hull_bone as usize);
        self.entity_bones.ensure_capacity(required.entity_bone as usize);
    }

    /// Allocated slots per family.
    #[must_use]
    pub fn capacity(&self) -> FamilyCounts {
        FamilyCounts {
            point: self.points.capacity() as u32,
            edge: self.edges.capacity() as u32,
            hull: self.hulls.capacity() as u32,
            entity: self.entities.capacity() as u32,
            hull_bone: self.hull_bones.capacity() as u32,
            entity_bone: self.entity_bones.capacity() as u32,
        }
    }

    /// Copies the live prefix of every family from `other`.
    pub fn copy_prefix_from(&mut self, other: &Self, counts: &FamilyCounts) {
        self.points.copy_prefix_from(&other.points, counts.point as usize);
        self.edges.copy_prefix_from(&other.edges, counts.edge as usize);
        self.hulls.copy_prefix_from(&other.hulls, counts.hull as usize);
        self.entities.copy_prefix_from(&other.entities, counts.entity as usize);
        self.hull_bones
            .copy_prefix_from(&other.hull_bones, counts.hull_bone as usize);
        self.entity_bones
            .copy_prefix_from(&other.entity_bones, counts.entity_bone as usize);
    }

    /// Allocates exactly `counts` slots and copies the live prefix into them.
    #[must_use]
    pub fn snapshot(&self, counts: &FamilyCounts) -> Self {
        let mut copy = Self::new(counts);
        copy.copy_prefix_from(self, counts);
        copy
    }

    /// Counts everything one entity owns, including the entity itself.
    ///
    /// # Panics
    ///
    /// Panics if the entity or any of its hulls is past capacity.
    #[must_use]
    pub fn subtree_counts(&self, entity: usize) -> FamilyCounts {
        let hull_table = self.entities.hull_table.as_slice()[entity];
        let mut counts = FamilyCounts {
            hull: hull_table.len(),
            entity: 1,
            entity_bone: self.entities.bone_table.as_slice()[entity].len(),
            ..FamilyCounts::ZERO
        };
        for hull in hull_table.slots() {
            counts.point += self.hulls.point_table.as_slice()[hull].len();
            counts.edge += self.hulls.edge_table.as_slice()[hull].len();
            counts.hull_bone += self.hulls.bone_table.as_slice()[hull].len();
        }
        counts
    }

    /// Raw bytes of the live prefix of every column of one family.
    #[must_use]
    pub fn family_bytes(&self, family: Family, len: u32) -> Vec<&[u8]> {
        let len = len as usize;
        match family {
            Family::Point => self.points.prefix_bytes(len),
            Family::Edge => self.edges.prefix_bytes(len),
            Family::Hull => self.hulls.prefix_bytes(len),
            Family::Entity => self.entities.prefix_bytes(len),
            Family::HullBone => self.hull_bones.prefix_bytes(len),
            Family::EntityBone => self.entity_bones.prefix_bytes(len),
        }
    }
}

// ============================================================================
// RECORD SCRATCH
// ============================================================================

/// Reusable staging for whole-family copies, one vector per family.
///
/// Records are relocated in parallel into the scratch and then written out
/// in order. The vectors are cleared, never shrunk, so a region that copies
/// about the same amount every tick stops allocating.
#[derive(Clone, Debug, Default)]
pub struct RecordScratch {
    pub(crate) points: Vec<Point>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) hulls: Vec<Hull>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) hull_bones: Vec<HullBone>,
    pub(crate) entity_bones: Vec<EntityBone>,
}

impl RecordScratch {
    /// Records each family can stage without reallocating.
    #[must_use]
    pub fn capacity(&self) -> FamilyCounts {
        FamilyCounts {
            point: self.points.capacity() as u32,
            edge: self.edges.capacity() as u32,
            hull: self.hulls.capacity() as u32,
            entity: self.entities.capacity() as u32,
            hull_bone: self.hull_bones.capacity() as u32,
            entity_bone: self.entity_bones.capacity() as u32,
        }
    }
}

/// Builds `count` records in parallel into `scratch`, then writes record `j`
/// to slot `base + j` of `target`.
pub(crate) fn scatter_records<B, F>(
    target: &mut B,
    scratch: &mut Vec<B::Record>,
    base: u32,
    count: u32,
    build: F,
) where
    B: FamilyBuffer,
    F: Fn(u32) -> B::Record + Send + Sync,
{
    scratch.clear();
    scratch.par_extend((0..count).into_par_iter().map(build));
    for (j, record) in scratch.iter().enumerate() {
        target.write(base as usize + j, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::{IDENTITY_TRANSFORM, NULL_INDEX};

    #[test]
    fn test_point_round_trip_through_columns() {
        let mut points = PointBuffers::new(4);
        let p = Point::at_rest([1.0, 2.0], 3, 0, [0, NULL_INDEX, NULL_INDEX, NULL_INDEX], 5);
        points.write(2, &p);
        assert_eq!(points.read(2), p);
        assert_eq!(points.hull_index.get(2), Some(0));
    }

    #[test]
    fn test_edge_endpoints_column() {
        let mut edges = EdgeBuffers::new(2);
        edges.write(1, &Edge::new(4, 5, 1.5, 0, 0));
        assert_eq!(edges.endpoints.get(1), Some([4, 5]));
        assert_eq!(edges.read(1).p2, 5);
    }

    #[test]
    fn test_sector_ensure_capacity_grows_every_family() {
        let mut buffers = SectorBuffers::new(&FamilyCounts::ZERO);
        let need = FamilyCounts {
            point: 100,
            edge: 10,
            hull: 1,
            entity: 1,
            hull_bone: 3,
            entity_bone: 70,
        };
        buffers.ensure_capacity(&need);
        let cap = buffers.capacity();
        for family in Family::ALL {
            assert!(cap.get(family) >= need.get(family));
        }
    }

    #[test]
    fn test_subtree_counts() {
        let mut buffers = SectorBuffers::new(&FamilyCounts {
            point: 8,
            edge: 8,
            hull: 4,
            entity: 2,
            hull_bone: 4,
            entity_bone: 4,
        });
        buffers.entities.hull_table.set(1, IndexRange::new(1, 3));
        buffers.entities.bone_table.set(1, IndexRange::new(0, 2));
        buffers.hulls.point_table.set(1, IndexRange::new(0, 4));
        buffers.hulls.point_table.set(2, IndexRange::new(4, 7));
        buffers.hulls.edge_table.set(2, IndexRange::new(0, 3));
        buffers.hulls.bone_table.set(1, IndexRange::new(0, 1));

        let counts = buffers.subtree_counts(1);
        assert_eq!(
            counts,
            FamilyCounts {
                point: 7,
                edge: 3,
                hull: 2,
                entity: 1,
                hull_bone: 1,
                entity_bone: 2,
            }
        );
    }

    #[test]
    fn test_snapshot_is_exact() {
        let mut buffers = SectorBuffers::new(&FamilyCounts {
            entity_bone: 8,
            ..FamilyCounts::ZERO
        });
        buffers
            .entity_bones
            .write(0, &EntityBone::new(1, NULL_INDEX, IDENTITY_TRANSFORM));
        let counts = FamilyCounts {
            entity_bone: 1,
            ..FamilyCounts::ZERO
        };
        let snap = buffers.snapshot(&counts);
        assert_eq!(snap.capacity(), counts);
        assert_eq!(snap.entity_bones.read(0).reference_id, 1);
        assert_eq!(snap.family_bytes(Family::EntityBone, 1)[0].len(), 64);
    }
}

//! # Object Records
//!
//! A record is one row of a family, gathered from its columns. Creators take
//! records, kernels read a record, relocate its references, and write it back.
//!
//! ## Reference Fields
//!
//! ```text
//! Entity ──hull_table──▶ Hull ──point_table──▶ Point ──bone_table──▶ HullBone
//!   │  └──root_hull───▶   │  ├──edge_table───▶ Edge ──p1/p2──▶ Point
//!   │                     │  ├──bone_table───▶ HullBone ──bind_pose──▶ EntityBone
//!   │                     │  └──entity_id────▶ Entity
//!   └──bone_table──▶ EntityBone ──parent_id──▶ EntityBone
//! ```
//!
//! Every arrow is rewritten by [`Relocation`] when objects move. Opaque ids
//! (vertex reference, mesh id, edge pin, inverse bind pose, bone reference)
//! never move.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use super::counts::Family;

/// Sentinel for an absent single reference.
pub const NULL_INDEX: u32 = u32::MAX;

/// Integrity a freshly created hull starts with.
pub const DEFAULT_HULL_INTEGRITY: i32 = 100;

/// Half-open `[start, end)` range into a child family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct IndexRange {
    /// First child slot.
    pub start: u32,
    /// One past the last child slot.
    pub end: u32,
}

impl IndexRange {
    /// Creates a range.
    #[inline]
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// An empty range positioned at `at`.
    #[inline]
    #[must_use]
    pub const fn empty_at(at: u32) -> Self {
        Self { start: at, end: at }
    }

    /// Number of children in the range.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// True when the range holds no children.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when `index` lies inside the range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, index: u32) -> bool {
        index >= self.start && index < self.end
    }

    /// Moves the range right by `delta`.
    #[inline]
    #[must_use]
    pub const fn offset(self, delta: u32) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Moves the range left by `delta`.
    #[inline]
    #[must_use]
    pub const fn shift_down(self, delta: u32) -> Self {
        Self {
            start: self.start.saturating_sub(delta),
            end: self.end.saturating_sub(delta),
        }
    }

    /// Slot indices covered by the range.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> Range<usize> {
        self.start as usize..self.end.max(self.start) as usize
    }
}

/// Rewrites references when objects change slots.
///
/// Compaction subtracts shifts, ingress adds bases, egress looks indices up in
/// old-to-new maps. Records call into this trait for each reference field they
/// carry; the implementation decides how the referenced family moved.
pub trait Relocation: Sync {
    /// New slot for a single reference into `family`.
    ///
    /// Never called with [`NULL_INDEX`].
    fn index(&self, family: Family, index: u32) -> u32;

    /// New position of a child range of `family`.
    ///
    /// `owner` is the pre-relocation index of the entity at the root of the
    /// subtree the range belongs to. All descendants of one entity move by the
    /// same amount per family, so the owner also places empty ranges.
    fn range(&self, family: Family, range: IndexRange, owner: u32) -> IndexRange;
}

/// Relocates an optional reference, keeping the sentinel.
#[inline]
pub fn relocate_optional<R: Relocation + ?Sized>(reloc: &R, family: Family, index: u32) -> u32 {
    if index == NULL_INDEX {
        NULL_INDEX
    } else {
        reloc.index(family, index)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Current position (x, y) followed by the previous position.
    pub position: [f32; 4],
    /// Index of the model vertex this point was built from.
    pub vertex_reference: u32,
    /// Owning hull.
    pub hull_index: u32,
    /// Collision hits this tick.
    pub hit_count: u32,
    /// Point flag bits.
    pub flags: u32,
    /// Up to four driving hull bones; unused entries hold [`NULL_INDEX`].
    pub bone_table: [u32; 4],
}

impl Point {
    /// Creates a point at rest: the previous position equals the current one.
    #[must_use]
    pub const fn at_rest(
        position: [f32; 2],
        vertex_reference: u32,
        hull_index: u32,
        bone_table: [u32; 4],
        flags: u32,
    ) -> Self {
        Self {
            position: [position[0], position[1], position[0], position[1]],
            vertex_reference,
            hull_index,
            hit_count: 0,
            flags,
            bone_table,
        }
    }

    /// Rewrites the hull and bone references.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R) {
        self.hull_index = reloc.index(Family::Hull, self.hull_index);
        for bone in &mut self.bone_table {
            *bone = relocate_optional(reloc, Family::HullBone, *bone);
        }
    }
}

/// One distance constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// First endpoint.
    pub p1: u32,
    /// Second endpoint.
    pub p2: u32,
    /// Rest length.
    pub length: f32,
    /// Edge flag bits.
    pub flags: u32,
    /// Pin id, opaque to the store.
    pub pin: u32,
}

impl Edge {
    /// Creates an edge.
    #[must_use]
    pub const fn new(p1: u32, p2: u32, length: f32, flags: u32, pin: u32) -> Self {
        Self {
            p1,
            p2,
            length,
            flags,
            pin,
        }
    }

    /// Rewrites both endpoints.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R) {
        self.p1 = reloc.index(Family::Point, self.p1);
        self.p2 = reloc.index(Family::Point, self.p2);
    }
}

/// One convex body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hull {
    /// Center (x, y) followed by the previous center.
    pub position: [f32; 4],
    /// Scale (x, y).
    pub scale: [f32; 2],
    /// Reference angle and current angle.
    pub rotation: [f32; 2],
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution coefficient.
    pub restitution: f32,
    /// Mesh id, opaque to the store.
    pub mesh_id: u32,
    /// Texture uv offset.
    pub uv_offset: u32,
    /// Remaining integrity.
    pub integrity: i32,
    /// Hull flag bits.
    pub flags: u32,
    /// Owning entity.
    pub entity_id: u32,
    /// Owned points.
    pub point_table: IndexRange,
    /// Owned edges.
    pub edge_table: IndexRange,
    /// Owned hull bones.
    pub bone_table: IndexRange,
}

impl Hull {
    /// Creates a hull at rest with full integrity.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn at_rest(
        mesh_id: u32,
        position: [f32; 2],
        scale: [f32; 2],
        rotation: [f32; 2],
        point_table: IndexRange,
        edge_table: IndexRange,
        bone_table: IndexRange,
        friction: f32,
        restitution: f32,
        entity_id: u32,
        uv_offset: u32,
        flags: u32,
    ) -> Self {
        Self {
            position: [position[0], position[1], position[0], position[1]],
            scale,
            rotation,
            friction,
            restitution,
            mesh_id,
            uv_offset,
            integrity: DEFAULT_HULL_INTEGRITY,
            flags,
            entity_id,
            point_table,
            edge_table,
            bone_table,
        }
    }

    /// Rewrites the child ranges and the owning entity.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R) {
        let owner = self.entity_id;
        self.point_table = reloc.range(Family::Point, self.point_table, owner);
        self.edge_table = reloc.range(Family::Edge, self.edge_table, owner);
        self.bone_table = reloc.range(Family::HullBone, self.bone_table, owner);
        self.entity_id = reloc.index(Family::Entity, owner);
    }
}

/// One top-level object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    /// Transform (x, y, z, w).
    pub transform: [f32; 4],
    /// Acceleration applied this tick.
    pub accel: [f32; 2],
    /// Hull used as the positional anchor.
    pub root_hull: u32,
    /// Model id, opaque to the store.
    pub model_id: u32,
    /// Model transform id, opaque to the store.
    pub model_transform_id: u32,
    /// Gameplay type id.
    pub entity_type: u32,
    /// Entity flag bits.
    pub flags: u32,
    /// Total mass.
    pub mass: f32,
    /// Active animation per layer.
    pub anim_layers: [i32; 4],
    /// Previous animation per layer.
    pub prev_layers: [i32; 4],
    /// Animation time per layer.
    pub anim_time: [f32; 4],
    /// Previous animation time per layer.
    pub prev_time: [f32; 4],
    /// Blend factor per layer.
    pub anim_blend: [f32; 4],
    /// Motion state counters.
    pub motion_state: [i16; 2],
    /// Owned hulls.
    pub hull_table: IndexRange,
    /// Owned armature bones.
    pub bone_table: IndexRange,
}

impl Entity {
    /// Creates an entity with its first animation layer set and nothing blended.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        transform: [f32; 4],
        hull_table: IndexRange,
        bone_table: IndexRange,
        mass: f32,
        anim_index: i32,
        anim_time: f32,
        root_hull: u32,
        model_id: u32,
        model_transform_id: u32,
        entity_type: u32,
        flags: u32,
    ) -> Self {
        Self {
            transform,
            accel: [0.0; 2],
            root_hull,
            model_id,
            model_transform_id,
            entity_type,
            flags,
            mass,
            anim_layers: [anim_index, 0, 0, 0],
            prev_layers: [-1; 4],
            anim_time: [anim_time, 0.0, 0.0, 0.0],
            prev_time: [0.0; 4],
            anim_blend: [0.0; 4],
            motion_state: [0; 2],
            hull_table,
            bone_table,
        }
    }

    /// Rewrites the child ranges and the root hull.
    ///
    /// `own_index` is this entity's slot before relocation.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R, own_index: u32) {
        self.hull_table = reloc.range(Family::Hull, self.hull_table, own_index);
        self.bone_table = reloc.range(Family::EntityBone, self.bone_table, own_index);
        self.root_hull = relocate_optional(reloc, Family::Hull, self.root_hull);
    }
}

/// One hull bone instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HullBone {
    /// Column-major 4x4 bone transform.
    pub transform: [f32; 16],
    /// Armature bone providing the bind pose.
    pub bind_pose_id: u32,
    /// Inverse bind pose reference, opaque to the store.
    pub inv_bind_pose_id: u32,
}

impl HullBone {
    /// Creates a hull bone.
    #[must_use]
    pub const fn new(transform: [f32; 16], bind_pose_id: u32, inv_bind_pose_id: u32) -> Self {
        Self {
            transform,
            bind_pose_id,
            inv_bind_pose_id,
        }
    }

    /// Rewrites the bind pose reference.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R) {
        self.bind_pose_id = relocate_optional(reloc, Family::EntityBone, self.bind_pose_id);
    }
}

/// One armature bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityBone {
    /// Column-major 4x4 bone transform.
    pub transform: [f32; 16],
    /// Model bone reference, opaque to the store.
    pub reference_id: u32,
    /// Parent bone, or [`NULL_INDEX`] for the root.
    pub parent_id: u32,
}

impl EntityBone {
    /// Creates an armature bone.
    #[must_use]
    pub const fn new(reference_id: u32, parent_id: u32, transform: [f32; 16]) -> Self {
        Self {
            transform,
            reference_id,
            parent_id,
        }
    }

    /// Rewrites the parent reference.
    pub fn relocate<R: Relocation + ?Sized>(&mut self, reloc: &R) {
        self.parent_id = relocate_optional(reloc, Family::EntityBone, self.parent_id);
    }
}

/// Identity 4x4 transform.
pub const IDENTITY_TRANSFORM: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

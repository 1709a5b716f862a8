//! # Family Identifiers and Per-Family Counts
//!
//! Every aggregate that spans the six families (live counters, removed
//! counts, merge bases, egress sizes) is a [`FamilyCounts`]. Fields are named,
//! never positional, so a count can not be consumed against the wrong family.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// The six object families stored in a sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// Simulation points (verlet particles).
    Point,
    /// Distance constraints between two points.
    Edge,
    /// Convex bodies built from points and edges.
    Hull,
    /// Top-level objects that own hulls and an armature.
    Entity,
    /// Per-hull bone instances.
    HullBone,
    /// Per-entity armature bones.
    EntityBone,
}

impl Family {
    /// All families, parents before children.
    pub const ALL: [Family; 6] = [
        Family::Entity,
        Family::Hull,
        Family::Point,
        Family::Edge,
        Family::HullBone,
        Family::EntityBone,
    ];

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Family::Point => "point",
            Family::Edge => "edge",
            Family::Hull => "hull",
            Family::Entity => "entity",
            Family::HullBone => "hull_bone",
            Family::EntityBone => "entity_bone",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `u32` per family.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
#[serde(default)]
pub struct FamilyCounts {
    /// Point count.
    pub point: u32,
    /// Edge count.
    pub edge: u32,
    /// Hull count.
    pub hull: u32,
    /// Entity count.
    pub entity: u32,
    /// Hull bone count.
    pub hull_bone: u32,
    /// Entity bone count.
    pub entity_bone: u32,
}

impl FamilyCounts {
    /// All counts zero.
    pub const ZERO: Self = Self {
        point: 0,
        edge: 0,
        hull: 0,
        entity: 0,
        hull_bone: 0,
        entity_bone: 0,
    };

    /// Returns the count for one family.
    #[inline]
    #[must_use]
    pub const fn get(&self, family: Family) -> u32 {
        match family {
            Family::Point => self.point,
            Family::Edge => self.edge,
            Family::Hull => self.hull,
            Family::Entity => self.entity,
            Family::HullBone => self.hull_bone,
            Family::EntityBone => self.entity_bone,
        }
    }

    /// Returns a mutable reference to the count for one family.
    #[inline]
    pub fn get_mut(&mut self, family: Family) -> &mut u32 {
        match family {
            Family::Point => &mut self.point,
            Family::Edge => &mut self.edge,
            Family::Hull => &mut self.hull,
            Family::Entity => &mut self.entity,
            Family::HullBone => &mut self.hull_bone,
            Family::EntityBone => &mut self.entity_bone,
        }
    }

    /// True when every family count is zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Sum over all families.
    #[must_use]
    pub fn total(&self) -> u64 {
        Family::ALL.iter().map(|&f| u64::from(self.get(f))).sum()
    }
}

impl Add for FamilyCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for FamilyCounts {
    fn add_assign(&mut self, rhs: Self) {
        for family in Family::ALL {
            *self.get_mut(family) += rhs.get(family);
        }
    }
}

impl Sub for FamilyCounts {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl SubAssign for FamilyCounts {
    fn sub_assign(&mut self, rhs: Self) {
        for family in Family::ALL {
            *self.get_mut(family) -= rhs.get(family);
        }
    }
}

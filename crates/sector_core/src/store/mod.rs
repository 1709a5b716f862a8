//! # Object Store
//!
//! Structure-of-arrays buffers for the six object families.
//!
//! ## Design Principles
//!
//! 1. **Dense** - Live objects occupy slots `0..counter` with no holes
//! 2. **Ranges, not pointers** - Parents own `[start, end)` ranges of children
//! 3. **Hierarchical** - No child belongs to two parents, and child ranges are
//!    laid out in parent order

mod buffers;
mod column;
mod counts;
pub mod flags;
mod records;

pub use buffers::{
    EdgeBuffers, EntityBoneBuffers, EntityBuffers, FamilyBuffer, HullBoneBuffers, HullBuffers,
    PointBuffers, RecordScratch, SectorBuffers,
};
pub(crate) use buffers::scatter_records;
pub use column::{Column, MIN_COLUMN_CAPACITY};
pub use counts::{Family, FamilyCounts};
pub use records::{
    relocate_optional, Edge, Entity, EntityBone, Hull, HullBone, IndexRange, Point, Relocation,
    DEFAULT_HULL_INTEGRITY, IDENTITY_TRANSFORM, NULL_INDEX,
};

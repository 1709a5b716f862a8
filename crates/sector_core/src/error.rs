//! # Sector Error Types
//!
//! Everything that can go wrong in the sector core.
//!
//! Hot-path operations (create, scan, compact, merge) are infallible by
//! contract: capacity growth aborts the process on exhaustion and ordering
//! misuse is prevented by the single-threaded driver. The errors below cover
//! construction-time validation, entity accessors, egress sizing, and the
//! explicit integrity diagnostic.

use thiserror::Error;

use crate::store::Family;

/// Errors that can occur in the sector core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectorError {
    /// Scan block size must be a power of two no smaller than 2.
    #[error("invalid scan block size {0}: must be a power of two >= 2")]
    InvalidBlockSize(usize),

    /// Dispatch slices must hold at least one slot.
    #[error("invalid dispatch slice size: must be greater than zero")]
    InvalidSliceSize,

    /// An accessor targeted a slot at or past the family counter.
    #[error("{family} index {index} out of range (live count {count})")]
    IndexOutOfRange {
        /// Family the index belongs to.
        family: Family,
        /// The offending index.
        index: u32,
        /// The live counter of that family.
        count: u32,
    },

    /// Egress was issued with counts that disagree with the flagged objects.
    #[error("egress count mismatch for {family}: expected {expected}, claimed {claimed}")]
    EgressCountMismatch {
        /// Family whose count disagreed.
        family: Family,
        /// Count supplied by the caller.
        expected: u32,
        /// Count actually claimed during extraction.
        claimed: u32,
    },

    /// A reference field points at or past the counter of its target family.
    #[error("{family}[{slot}].{field} = {value} dangles (target live count {limit})")]
    DanglingReference {
        /// Family holding the field.
        family: Family,
        /// Slot holding the field.
        slot: u32,
        /// Field name.
        field: &'static str,
        /// The stored value.
        value: u32,
        /// Counter of the referenced family.
        limit: u32,
    },

    /// Two parents claim overlapping or out-of-order child ranges.
    #[error("{family}[{slot}].{field} overlaps or precedes the previous sibling range")]
    OverlappingRange {
        /// Family holding the range.
        family: Family,
        /// Slot holding the range.
        slot: u32,
        /// Field name.
        field: &'static str,
    },

    /// A child does not point back at the parent that owns it.
    #[error("{family}[{slot}] is owned by {expected} but records {found}")]
    OwnerMismatch {
        /// Family of the child.
        family: Family,
        /// Slot of the child.
        slot: u32,
        /// Index of the owning parent.
        expected: u32,
        /// Back-reference stored in the child.
        found: u32,
    },
}

/// Result type for sector operations.
pub type SectorResult<T> = Result<T, SectorError>;

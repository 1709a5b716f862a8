//! # Compactor
//!
//! In-place removal of deleted entities and their subtrees.

mod compactor;
mod linearize;
mod shift;

pub use compactor::SectorCompactor;
pub use linearize::linearize;
pub use shift::{ShiftRelocation, ShiftTables, REMOVED};

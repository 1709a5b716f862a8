//! # Egress Extractor
//!
//! Moves objects out of the active region.
//!
//! ## Tick Flow
//!
//! ```text
//! count_egress()            one parallel pass over entity flags
//!       │
//!       ▼                   sizes read back on the driver
//! UnorderedSectorOutput     SECTOR_OUT subtrees ──▶ zero-based region
//! BrokenObjectBuffer        BROKEN     ──▶ position, type, model
//! CollectedObjectBuffer     COLLECTED  ──▶ type
//!       │
//!       ▼                   sources flagged DELETED
//! SectorCompactor           removes them from the active region
//! ```

mod broken;
mod counts;
mod unordered;

pub use broken::{BrokenObject, BrokenObjectBuffer, CollectedObject, CollectedObjectBuffer};
pub use counts::{EgressCategory, EgressCounts};
pub use unordered::{EgressBatch, EgressMaps, MapRelocation, UnorderedSectorOutput};

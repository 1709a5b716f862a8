//! # Sector Core
//!
//! Object lifecycle and index compaction for a dense structure-of-arrays
//! simulation store:
//! - Six object families in columnar buffers, linked by index ranges
//! - Append-only creation, flag-driven deletion
//! - Parallel prefix-scan compaction with cascading reference rewrite
//!
//! ## Architecture Rules
//!
//! 1. **Dense** - Live objects of a family occupy slots `0..counter`
//! 2. **Parent order** - Child ranges are laid out in the order of their parents
//! 3. **One driver** - Every mutation of a region runs on one thread, in order;
//!    kernels parallelize internally
//!
//! ## Tick
//!
//! ```text
//! create_*  ──▶  mark_deleted / mark_egress
//!                        │
//!          count_egress ─┴─▶ egress ──▶ delete_and_compact ──▶ merge_into
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sector_core::{SectorController, SectorCompactor, config};
//!
//! let mut sector = SectorController::new(&config::core_capacity());
//! let mut compactor = SectorCompactor::new(Default::default(), Default::default())?;
//! // ... create objects, flag some for deletion ...
//! let report = compactor.delete_and_compact(&mut sector);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod compact;
pub mod config;
pub mod egress;
pub mod error;
pub mod ingress;
pub mod scan;
pub mod sector;
pub mod store;
pub mod sync;

pub use compact::SectorCompactor;
pub use config::{CompactConfig, ScanConfig};
pub use egress::{
    BrokenObject, BrokenObjectBuffer, CollectedObject, CollectedObjectBuffer, EgressBatch,
    EgressCategory, EgressCounts, UnorderedSectorOutput,
};
pub use error::{SectorError, SectorResult};
pub use ingress::{merge_region, OrderedSectorInput};
pub use scan::{DeleteScan, DeleteScanReport, ScanPath};
pub use sector::{EntityInfo, SectorController};
pub use store::{
    flags, Edge, Entity, EntityBone, Family, FamilyBuffer, FamilyCounts, Hull, HullBone,
    IndexRange, Point, SectorBuffers, NULL_INDEX,
};
pub use sync::{Flippable, RenderMirror, SharedRenderMirror};

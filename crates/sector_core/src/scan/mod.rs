//! # Delete-Scan Engine
//!
//! Parallel exclusive prefix sums over the entity axis.
//!
//! The scan never moves data. It answers two questions for the compactor:
//! how far does every surviving slot move left, and how many slots of each
//! family disappear in total.

mod block;
mod delete;

pub use block::{BlockScanner, ScanOutcome, ScanPath};
pub use delete::{pack_lanes, unpack_lanes, DeleteScan, DeleteScanReport};

//! # Sector Controller
//!
//! One region of the world: its buffers, its counters, and the creators and
//! accessors gameplay uses on them.

mod controller;
mod integrity;

pub use controller::{EntityInfo, SectorController};

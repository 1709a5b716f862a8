//! # Sector Runtime
//!
//! Drives one active region through its tick and connects it to the world:
//! - Engine configuration from TOML
//! - Core memory: egress, compaction, ingress and the three swaps
//! - Bounded loader / unloader channels
//! - Tick timing statistics
//!
//! ## Threading
//!
//! ```text
//! loader thread ──▶ [loader channel] ──┐
//!                                      ▼
//!                         driver thread: CoreMemory::tick()
//!                                      │
//! unloader thread ◀── [unloader chan] ─┤
//!                                      ▼
//! render thread ◀──── RwLock<RenderMirror> (refreshed between ticks)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sector_runtime::{CoreMemory, EngineConfig};
//!
//! let mut core = CoreMemory::new(EngineConfig::load("sector_engine.toml")?)?;
//! let streaming = core.connect_streaming();
//! loop {
//!     // ... create objects, set flags through core.sector_mut() ...
//!     let stats = core.tick()?;
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod core_memory;
pub mod error;
pub mod streaming;
pub mod tick;

pub use config::{CapacityConfig, ConfigError, EngineConfig, RuntimeConfig};
pub use core_memory::CoreMemory;
pub use error::{RuntimeError, RuntimeResult};
pub use streaming::{batch_channel, BatchReceiver, BatchSender, EgressBundle, StreamingHandles};
pub use tick::{TickStats, TickStatsAccumulator};

//! # Tick Synchronization
//!
//! Hand-off primitives between the driver thread and its consumers.
//!
//! ```text
//! Tick N:
//!   driver writes egress into the FRONT side
//!   consumer unloads the BACK side (tick N-1's output)
//!
//! Between ticks:
//!   flip ─▶ front and back trade places
//!   render mirror refreshed under a write lock
//! ```

mod flippable;
mod render_mirror;

pub use flippable::Flippable;
pub use render_mirror::{RenderMirror, SharedRenderMirror};

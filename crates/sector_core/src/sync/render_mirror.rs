//! Tick-stable copy of a region for the render thread.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::sector::SectorController;
use crate::store::{FamilyCounts, SectorBuffers};

/// Render mirror shared between the driver and render readers.
pub type SharedRenderMirror = Arc<RwLock<RenderMirror>>;

/// Copy of every live column plus the counts, refreshed between ticks.
#[derive(Clone, Debug)]
pub struct RenderMirror {
    buffers: SectorBuffers,
    counts: FamilyCounts,
    tick: u64,
}

impl RenderMirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new(capacity: &FamilyCounts) -> Self {
        Self {
            buffers: SectorBuffers::new(capacity),
            counts: FamilyCounts::ZERO,
            tick: 0,
        }
    }

    /// Wraps a new mirror for sharing.
    #[must_use]
    pub fn shared(capacity: &FamilyCounts) -> SharedRenderMirror {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Copies the live prefix of every family from `sector`.
    pub fn refresh(&mut self, sector: &SectorController, tick: u64) {
        self.counts = sector.counts();
        self.buffers.ensure_capacity(&self.counts);
        self.buffers.copy_prefix_from(sector.buffers(), &self.counts);
        self.tick = tick;
    }

    /// Mirrored columns. Only slots below [`counts`](Self::counts) are live.
    #[must_use]
    pub const fn buffers(&self) -> &SectorBuffers {
        &self.buffers
    }

    /// Live counts at the last refresh.
    #[must_use]
    pub const fn counts(&self) -> FamilyCounts {
        self.counts
    }

    /// Tick of the last refresh.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

//! # Core Memory
//!
//! Owns the active region and drives it through one tick:
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. EGRESS                                                           │
//! │    ├─ count_egress (one read-back sizes the outputs)                │
//! │    ├─ SECTOR_OUT subtrees ──▶ sector output (front)                 │
//! │    └─ BROKEN / COLLECTED  ──▶ report buffers (front)                │
//! │                                                                     │
//! │ 2. COMPACT                                                          │
//! │    └─ delete scan + in-place compaction (skipped if nothing flagged)│
//! │                                                                     │
//! │ 3. SWAP INGRESS                                                     │
//! │    ├─ absorb loader batches into staging                            │
//! │    └─ merge staging onto the active region                          │
//! │                                                                     │
//! │ 4. SWAP EGRESS                                                      │
//! │    ├─ flip the three outputs, publish their counts                  │
//! │    └─ unload the back sides to the unloader channel                 │
//! │                                                                     │
//! │ 5. SWAP RENDER                                                      │
//! │    └─ refresh the render mirror under its write lock                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gameplay creates and flags objects between ticks through
//! [`sector_mut`](CoreMemory::sector_mut) and [`staging_mut`](CoreMemory::staging_mut).

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use sector_core::{
    BrokenObject, BrokenObjectBuffer, CollectedObject, CollectedObjectBuffer, DeleteScanReport,
    EgressBatch, EgressCounts, FamilyCounts, Flippable, OrderedSectorInput, RenderMirror,
    SectorCompactor, SectorController, SharedRenderMirror, UnorderedSectorOutput,
};

use crate::config::EngineConfig;
use crate::error::RuntimeResult;
use crate::streaming::{batch_channel, BatchReceiver, BatchSender, EgressBundle, StreamingHandles};
use crate::tick::{elapsed_us, TickStats, TickStatsAccumulator};

/// The active region and everything that feeds or drains it.
#[derive(Debug)]
pub struct CoreMemory {
    config: EngineConfig,
    sector: SectorController,
    compactor: SectorCompactor,
    input: OrderedSectorInput,
    sector_output: Flippable<UnorderedSectorOutput>,
    broken_output: Flippable<BrokenObjectBuffer>,
    collected_output: Flippable<CollectedObjectBuffer>,
    /// Counts extracted into the front sides, not yet flipped.
    pending_egress: EgressCounts,
    /// Counts of the back sides.
    last_egress: EgressCounts,
    mirror: SharedRenderMirror,
    loader: Option<BatchReceiver<EgressBatch>>,
    unloader: Option<BatchSender<EgressBundle>>,
    tick: u64,
    stats: TickStatsAccumulator,
}

impl CoreMemory {
    /// Creates an empty core from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`EngineConfig::validate`] error if the config is invalid.
    pub fn new(config: EngineConfig) -> RuntimeResult<Self> {
        config.validate()?;
        let capacity = config.capacity;

        Ok(Self {
            config,
            sector: SectorController::new(&capacity.core),
            compactor: SectorCompactor::new(config.scan, config.compact)?,
            input: OrderedSectorInput::new(&capacity.transfer),
            sector_output: Flippable::splat(UnorderedSectorOutput::new(&capacity.transfer)),
            broken_output: Flippable::default(),
            collected_output: Flippable::default(),
            pending_egress: EgressCounts::default(),
            last_egress: EgressCounts::default(),
            mirror: RenderMirror::shared(&capacity.core),
            loader: None,
            unloader: None,
            tick: 0,
            stats: TickStatsAccumulator::new(config.runtime.tick_budget_us),
        })
    }

    /// Opens the loader and unloader channels and returns their far ends.
    ///
    /// Replaces any channels opened before.
    #[must_use]
    pub fn connect_streaming(&mut self) -> StreamingHandles {
        let capacity = self.config.runtime.channel_capacity;
        let (loader_tx, loader_rx) = batch_channel("loader", capacity);
        let (unloader_tx, unloader_rx) = batch_channel("unloader", capacity);
        self.loader = Some(loader_rx);
        self.unloader = Some(unloader_tx);
        StreamingHandles {
            loader: loader_tx,
            unloader: unloader_rx,
        }
    }

    /// Runs one full tick.
    ///
    /// # Errors
    ///
    /// Returns an error if egress sizing disagrees with extraction or the
    /// unloader channel was dropped. A failed integrity check is logged, not
    /// returned.
    pub fn tick(&mut self) -> RuntimeResult<TickStats> {
        let start = Instant::now();
        let mut stats = TickStats {
            tick: self.tick,
            ..TickStats::default()
        };

        let t = Instant::now();
        stats.egress = self.process_egress()?;
        stats.egress_us = elapsed_us(t);

        let t = Instant::now();
        let report = self.process_compaction();
        stats.removed = report.removed;
        stats.scan_path = Some(report.path);
        stats.compact_us = elapsed_us(t);

        let t = Instant::now();
        stats.merged = self.swap_ingress();
        stats.ingress_us = elapsed_us(t);

        let t = Instant::now();
        let _ = self.swap_egress_buffers()?;
        stats.swap_us = elapsed_us(t);

        let t = Instant::now();
        self.swap_render();
        stats.render_us = elapsed_us(t);

        if self.config.runtime.verify_integrity {
            if let Err(err) = self.sector.verify_integrity() {
                warn!(tick = self.tick, %err, "integrity check failed");
            }
        }

        stats.total_us = elapsed_us(start);
        if self.stats.record(&stats) {
            warn!(
                tick = self.tick,
                total_us = stats.total_us,
                budget_us = self.stats.budget_us,
                "tick exceeded budget"
            );
        }

        self.tick += 1;
        Ok(stats)
    }

    /// Extracts everything flagged to leave into the front outputs.
    ///
    /// # Errors
    ///
    /// Returns [`sector_core::SectorError::EgressCountMismatch`] if an
    /// extraction disagrees with the count pass. No entity is flagged
    /// `DELETED` in that case.
    pub fn process_egress(&mut self) -> RuntimeResult<EgressCounts> {
        let counts = self.sector.count_egress();
        if counts.is_empty() {
            return Ok(counts);
        }
        self.extract_egress(&counts)?;
        Ok(counts)
    }

    fn extract_egress(&mut self, counts: &EgressCounts) -> RuntimeResult<()> {
        BrokenObjectBuffer::check(&self.sector, counts.broken)?;
        CollectedObjectBuffer::check(&self.sector, counts.collected)?;

        let _ = self
            .sector_output
            .front_mut()
            .egress(&mut self.sector, &counts.objects)?;
        let _ = self
            .broken_output
            .front_mut()
            .extract(&mut self.sector, counts.broken)?;
        let _ = self
            .collected_output
            .front_mut()
            .extract(&mut self.sector, counts.collected)?;

        self.pending_egress = *counts;
        Ok(())
    }

    /// Removes every `DELETED` entity and its subtree.
    pub fn process_compaction(&mut self) -> DeleteScanReport {
        self.compactor.delete_and_compact(&mut self.sector)
    }

    /// Absorbs queued loader batches into staging, then merges staging.
    ///
    /// # Returns
    ///
    /// Objects merged per family.
    pub fn swap_ingress(&mut self) -> FamilyCounts {
        if let Some(loader) = &self.loader {
            for batch in loader.drain() {
                self.input.absorb(&batch.buffers, &batch.counts);
            }
        }
        self.input.merge_into(&mut self.sector)
    }

    /// Flips the egress outputs and publishes their counts.
    ///
    /// When an unloader is connected and anything left the region, the back
    /// sides are sent as one bundle.
    ///
    /// # Returns
    ///
    /// Counts of the new back sides.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Disconnected`] if the unloader was dropped.
    pub fn swap_egress_buffers(&mut self) -> RuntimeResult<EgressCounts> {
        self.sector_output.flip();
        self.broken_output.flip();
        self.collected_output.flip();
        self.sector_output.front_mut().clear();
        self.broken_output.front_mut().clear();
        self.collected_output.front_mut().clear();

        self.last_egress = std::mem::take(&mut self.pending_egress);

        if let Some(unloader) = &self.unloader {
            if !self.last_egress.is_empty() {
                unloader.send(EgressBundle {
                    tick: self.tick,
                    counts: self.last_egress,
                    sector: self.unload_sector(),
                    broken: self.unload_broken(),
                    collected: self.unload_collected(),
                })?;
            }
        }

        debug!(
            tick = self.tick,
            entities = self.last_egress.objects.entity,
            broken = self.last_egress.broken,
            collected = self.last_egress.collected,
            "swapped egress"
        );
        Ok(self.last_egress)
    }

    /// Copies the active region into the render mirror.
    pub fn swap_render(&mut self) {
        self.mirror.write().refresh(&self.sector, self.tick);
    }

    /// Counts published by the last egress swap.
    #[must_use]
    pub const fn last_egress_counts(&self) -> EgressCounts {
        self.last_egress
    }

    /// Owned copy of the last flipped sector output.
    #[must_use]
    pub fn unload_sector(&self) -> EgressBatch {
        self.sector_output.back().unload()
    }

    /// Owned copy of the last flipped broken reports.
    #[must_use]
    pub fn unload_broken(&self) -> Vec<BrokenObject> {
        self.broken_output.back().unload()
    }

    /// Owned copy of the last flipped collected reports.
    #[must_use]
    pub fn unload_collected(&self) -> Vec<CollectedObject> {
        self.collected_output.back().unload()
    }

    /// The active region.
    #[must_use]
    pub const fn sector(&self) -> &SectorController {
        &self.sector
    }

    /// The active region, for creators, flag setters and entity accessors.
    pub fn sector_mut(&mut self) -> &mut SectorController {
        &mut self.sector
    }

    /// Staging region merged at the next ingress swap.
    pub fn staging_mut(&mut self) -> &mut SectorController {
        self.input.staging_mut()
    }

    /// Handle readers clone to see the render mirror.
    #[must_use]
    pub fn render_mirror(&self) -> SharedRenderMirror {
        Arc::clone(&self.mirror)
    }

    /// Ticks run so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Accumulated tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStatsAccumulator {
        &self.stats
    }

    /// The configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sector_core::{flags, Edge, Entity, FamilyBuffer, Hull, IndexRange, Point, NULL_INDEX};

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.capacity.core = FamilyCounts::ZERO;
        config.capacity.transfer = FamilyCounts::ZERO;
        config.runtime.verify_integrity = true;
        config
    }

    /// One entity owning 1 hull, 2 points and 1 edge.
    fn spawn(sector: &mut SectorController, x: f32, entity_type: u32) -> u32 {
        let entity = sector.next_entity();
        let hull = sector.next_hull();
        let p0 = sector.create_point(Point::at_rest([x, 0.0], 0, hull, [NULL_INDEX; 4], 0));
        let p1 = sector.create_point(Point::at_rest([x, 1.0], 1, hull, [NULL_INDEX; 4], 0));
        let edge = sector.create_edge(Edge::new(p0, p1, 1.0, 0, 0));
        let _ = sector.create_hull(Hull::at_rest(
            0,
            [x, 0.5],
            [1.0, 1.0],
            [0.0, 0.0],
            IndexRange::new(p0, p1 + 1),
            IndexRange::new(edge, edge + 1),
            IndexRange::empty_at(sector.next_hull_bone()),
            0.5,
            0.0,
            entity,
            0,
            0,
        ));
        sector.create_entity(Entity::new(
            [x, 2.0, 0.0, 0.0],
            IndexRange::new(hull, hull + 1),
            IndexRange::empty_at(sector.next_entity_bone()),
            1.0,
            0,
            0.0,
            hull,
            11,
            0,
            entity_type,
            0,
        ))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.scan.block_size = 3;
        assert!(CoreMemory::new(config).is_err());
    }

    #[test]
    fn test_bad_report_count_flags_nothing() {
        let mut core = CoreMemory::new(small_config()).unwrap();
        spawn(core.sector_mut(), 0.0, 0);
        spawn(core.sector_mut(), 1.0, 0);
        core.sector_mut().mark_egress(0).unwrap();
        core.sector_mut()
            .set_entity_flags(1, flags::entity::BROKEN)
            .unwrap();

        let mut counts = core.sector().count_egress();
        counts.broken += 1;
        assert!(core.extract_egress(&counts).is_err());

        let entity_flags = core.sector().buffers().entities.flags.as_slice();
        assert!(!flags::has(entity_flags[0], flags::entity::DELETED));
        assert!(!flags::has(entity_flags[1], flags::entity::DELETED));
        assert!(core.pending_egress.is_empty());

        let stats = core.tick().unwrap();
        assert_eq!(stats.egress.objects.entity, 1);
        assert_eq!(stats.egress.broken, 1);
        assert_eq!(core.last_egress_counts(), stats.egress);
        assert_eq!(core.unload_broken().len(), 1);
        assert_eq!(core.sector().next_entity(), 0);
    }

    #[test]
    fn test_tick_without_flags_keeps_region() {
        let mut core = CoreMemory::new(small_config()).unwrap();
        for i in 0..4 {
            spawn(core.sector_mut(), i as f32, 0);
        }
        let stats = core.tick().unwrap();
        assert!(stats.removed.is_zero());
        assert!(stats.egress.is_empty());
        assert_eq!(core.sector().next_entity(), 4);
        assert_eq!(core.tick_count(), 1);
        assert_eq!(core.render_mirror().read().counts().entity, 4);
    }

    #[test]
    fn test_broken_and_collected_are_reported_and_removed() {
        let mut core = CoreMemory::new(small_config()).unwrap();
        for i in 0..4 {
            spawn(core.sector_mut(), i as f32, 100 + i);
        }
        let sector = core.sector_mut();
        sector.set_entity_flags(1, flags::entity::BROKEN).unwrap();
        sector.set_entity_flags(2, flags::entity::COLLECTED).unwrap();
        sector
            .set_entity_flags(3, flags::entity::BROKEN | flags::entity::COLLECTED)
            .unwrap();

        let stats = core.tick().unwrap();
        assert_eq!(stats.egress.broken, 1);
        assert_eq!(stats.egress.collected, 2);
        assert_eq!(stats.removed.entity, 3);
        assert_eq!(core.sector().next_entity(), 1);
        assert_eq!(core.sector().next_point(), 2);

        let broken = core.unload_broken();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].position, [1.0, 2.0]);
        assert_eq!(broken[0].entity_type, 101);
        assert_eq!(broken[0].model_id, 11);

        let collected: Vec<u32> = core
            .unload_collected()
            .iter()
            .map(|c| c.entity_type)
            .collect();
        assert_eq!(collected, vec![102, 103]);
        assert_eq!(core.last_egress_counts(), stats.egress);
    }

    #[test]
    fn test_back_side_is_cleared_after_quiet_tick() {
        let mut core = CoreMemory::new(small_config()).unwrap();
        spawn(core.sector_mut(), 0.0, 0);
        spawn(core.sector_mut(), 1.0, 0);
        core.sector_mut().mark_egress(0).unwrap();

        core.tick().unwrap();
        assert_eq!(core.unload_sector().counts.entity, 1);

        core.tick().unwrap();
        assert!(core.unload_sector().is_empty());
        assert!(core.last_egress_counts().is_empty());
    }

    #[test]
    fn test_staged_objects_merge_on_tick() {
        let mut core = CoreMemory::new(small_config()).unwrap();
        spawn(core.sector_mut(), 0.0, 0);
        spawn(core.staging_mut(), 5.0, 0);
        spawn(core.staging_mut(), 6.0, 0);

        let stats = core.tick().unwrap();
        assert_eq!(stats.merged.entity, 2);
        assert_eq!(core.sector().next_entity(), 3);
        assert_eq!(core.sector().buffers().hulls.read(2).entity_id, 2);
        assert_eq!(core.sector().verify_integrity(), Ok(()));
    }
}

//! # Tick Statistics

use std::time::Instant;

use tracing::info;

use sector_core::{EgressCounts, FamilyCounts, ScanPath};

use crate::config::DEFAULT_TICK_BUDGET_US;

/// Timing and sizes of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tick number.
    pub tick: u64,
    /// Whole tick in microseconds.
    pub total_us: u64,
    /// Egress counting and extraction.
    pub egress_us: u64,
    /// Delete scan and compaction.
    pub compact_us: u64,
    /// Staging absorb and merge.
    pub ingress_us: u64,
    /// Egress flip and unload.
    pub swap_us: u64,
    /// Render mirror refresh.
    pub render_us: u64,
    /// What left the region.
    pub egress: EgressCounts,
    /// Objects removed by compaction.
    pub removed: FamilyCounts,
    /// Objects merged in from staging.
    pub merged: FamilyCounts,
    /// Scan strategy of this tick's delete scan.
    pub scan_path: Option<ScanPath>,
}

/// Microseconds since `start`.
#[inline]
pub(crate) fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

/// Running totals over many ticks.
#[derive(Clone, Debug)]
pub struct TickStatsAccumulator {
    /// Ticks recorded.
    pub ticks_recorded: u64,
    /// Sum of total tick times.
    pub total_us_sum: u64,
    /// Sum of egress times.
    pub egress_us_sum: u64,
    /// Sum of compaction times.
    pub compact_us_sum: u64,
    /// Sum of ingress times.
    pub ingress_us_sum: u64,
    /// Fastest tick.
    pub min_tick_us: u64,
    /// Slowest tick.
    pub max_tick_us: u64,
    /// Ticks slower than the budget.
    pub ticks_over_budget: u64,
    /// Budget in microseconds.
    pub budget_us: u64,
    /// Objects removed across all ticks.
    pub removed: FamilyCounts,
    /// Objects merged across all ticks.
    pub merged: FamilyCounts,
}

impl TickStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new(budget_us: u64) -> Self {
        Self {
            ticks_recorded: 0,
            total_us_sum: 0,
            egress_us_sum: 0,
            compact_us_sum: 0,
            ingress_us_sum: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            ticks_over_budget: 0,
            budget_us,
            removed: FamilyCounts::ZERO,
            merged: FamilyCounts::ZERO,
        }
    }

    /// Records one tick.
    ///
    /// # Returns
    ///
    /// True if the tick went over budget.
    pub fn record(&mut self, stats: &TickStats) -> bool {
        self.ticks_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.egress_us_sum += stats.egress_us;
        self.compact_us_sum += stats.compact_us;
        self.ingress_us_sum += stats.ingress_us;
        self.min_tick_us = self.min_tick_us.min(stats.total_us);
        self.max_tick_us = self.max_tick_us.max(stats.total_us);
        self.removed += stats.removed;
        self.merged += stats.merged;

        let over = stats.total_us > self.budget_us;
        if over {
            self.ticks_over_budget += 1;
        }
        over
    }

    /// Average tick time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_tick_ms(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.ticks_recorded as f64) / 1000.0
    }

    /// Share of ticks over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        self.ticks_over_budget as f64 / self.ticks_recorded as f64
    }

    /// Logs a summary at `info` level.
    pub fn log_summary(&self) {
        info!(
            ticks = self.ticks_recorded,
            avg_ms = self.avg_tick_ms(),
            min_us = self.min_tick_us,
            max_us = self.max_tick_us,
            over_budget = self.ticks_over_budget,
            removed_entities = self.removed.entity,
            merged_entities = self.merged.entity,
            "tick summary"
        );
    }
}

impl Default for TickStatsAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_BUDGET_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulator() {
        let acc = TickStatsAccumulator::default();
        assert!(acc.avg_tick_ms().abs() < f64::EPSILON);
        assert!(acc.over_budget_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_tracks_budget_and_extremes() {
        let mut acc = TickStatsAccumulator::new(1_000);
        let fast = TickStats {
            total_us: 500,
            removed: FamilyCounts {
                entity: 2,
                ..FamilyCounts::ZERO
            },
            ..TickStats::default()
        };
        let slow = TickStats {
            total_us: 1_500,
            ..TickStats::default()
        };

        assert!(!acc.record(&fast));
        assert!(acc.record(&slow));

        assert_eq!(acc.ticks_recorded, 2);
        assert_eq!(acc.min_tick_us, 500);
        assert_eq!(acc.max_tick_us, 1_500);
        assert_eq!(acc.ticks_over_budget, 1);
        assert_eq!(acc.removed.entity, 2);
        assert!((acc.avg_tick_ms() - 1.0).abs() < f64::EPSILON);
        assert!((acc.over_budget_ratio() - 0.5).abs() < f64::EPSILON);
    }
}

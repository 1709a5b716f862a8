//! # Dispatch Configuration
//!
//! Sizes that shape how kernels are issued. Loaded once at startup.

use serde::{Deserialize, Serialize};

use crate::error::{SectorError, SectorResult};
use crate::store::FamilyCounts;

/// Default number of elements one scan block reduces locally.
pub const DEFAULT_SCAN_BLOCK_SIZE: usize = 256;

/// Default number of slots one linearized dispatch slice covers.
pub const DEFAULT_DISPATCH_SLICE: usize = 256;

/// Prefix scan configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Elements per scan block. Must be a power of two >= 2.
    pub block_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_SCAN_BLOCK_SIZE,
        }
    }
}

impl ScanConfig {
    /// Checks the block size.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::InvalidBlockSize`] if the size is not a power of
    /// two or is smaller than 2.
    pub fn validate(&self) -> SectorResult<()> {
        if self.block_size < 2 || !self.block_size.is_power_of_two() {
            return Err(SectorError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }
}

/// Compaction and copy dispatch configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactConfig {
    /// Slots per linearized dispatch slice (the device work group cap).
    pub slice_size: usize,
}

impl Default for CompactConfig {
    fn default() -> Self {
        Self {
            slice_size: DEFAULT_DISPATCH_SLICE,
        }
    }
}

impl CompactConfig {
    /// Checks the slice size.
    ///
    /// # Errors
    ///
    /// Returns [`SectorError::InvalidSliceSize`] if the slice is empty.
    pub fn validate(&self) -> SectorResult<()> {
        if self.slice_size == 0 {
            return Err(SectorError::InvalidSliceSize);
        }
        Ok(())
    }
}

/// Initial capacity of the active region.
#[must_use]
pub const fn core_capacity() -> FamilyCounts {
    FamilyCounts {
        point: 50_000,
        edge: 24_000,
        hull: 10_000,
        entity: 10_000,
        hull_bone: 10_000,
        entity_bone: 10_000,
    }
}

/// Initial capacity of staging and egress regions.
#[must_use]
pub const fn transfer_capacity() -> FamilyCounts {
    FamilyCounts {
        point: 5_000,
        edge: 2_400,
        hull: 1_000,
        entity: 1_000,
        hull_bone: 1_000,
        entity_bone: 1_000,
    }
}

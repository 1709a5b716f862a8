//! # Block Prefix Scan
//!
//! Exclusive prefix sum over fixed-width `u32` lanes.
//!
//! ```text
//! len <= block:   [ scan block ]                                  single dispatch
//!
//! len >  block:   [ scan b0 ][ scan b1 ][ scan b2 ] ...           per-block local scans
//!                      │          │          │
//!                      ▼          ▼          ▼
//!                 partials = [ t0, t1, t2, ... ]  ──▶ scan (recursive)
//!                      │          │          │
//!                      ▼          ▼          ▼
//!                 [ +base0  ][ +base1  ][ +base2  ] ...           complete pass
//! ```
//!
//! Every lane of a vector is scanned independently, so several counters can
//! share one pass.

use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::error::SectorResult;

/// Which strategy a scan took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPath {
    /// The input fit in one block.
    SingleBlock,
    /// The input spanned several blocks.
    MultiBlock {
        /// Number of top-level blocks.
        blocks: usize,
    },
}

/// Result of one exclusive scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOutcome<const N: usize> {
    /// Sum of every input element, per lane.
    pub total: [u32; N],
    /// Strategy used.
    pub path: ScanPath,
}

/// Exclusive block scanner.
#[derive(Clone, Copy, Debug)]
pub struct BlockScanner {
    block_size: usize,
}

impl BlockScanner {
    /// Creates a scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured block size is invalid.
    pub fn new(config: ScanConfig) -> SectorResult<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
        })
    }

    /// Elements per block.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Strategy a scan of `len` elements takes.
    #[inline]
    #[must_use]
    pub fn path_for(&self, len: usize) -> ScanPath {
        if len <= self.block_size {
            ScanPath::SingleBlock
        } else {
            ScanPath::MultiBlock {
                blocks: len.div_ceil(self.block_size),
            }
        }
    }

    /// Replaces every element with the sum of all elements before it.
    ///
    /// # Returns
    ///
    /// The per-lane total of the input and the strategy taken.
    pub fn scan_exclusive<const N: usize>(&self, data: &mut [[u32; N]]) -> ScanOutcome<N> {
        let path = self.path_for(data.len());
        if path == ScanPath::SingleBlock {
            return ScanOutcome {
                total: scan_block(data),
                path,
            };
        }

        let mut partials: Vec<[u32; N]> = data
            .par_chunks_mut(self.block_size)
            .map(scan_block::<N>)
            .collect();

        let inner = self.scan_exclusive(&mut partials);

        data.par_chunks_mut(self.block_size)
            .zip(partials.par_iter())
            .for_each(|(block, base)| {
                for value in block {
                    add_lanes(value, base);
                }
            });

        ScanOutcome {
            total: inner.total,
            path,
        }
    }
}

/// Sequential exclusive scan of one block, returning its total.
fn scan_block<const N: usize>(block: &mut [[u32; N]]) -> [u32; N] {
    let mut running = [0u32; N];
    for value in block.iter_mut() {
        let current = *value;
        *value = running;
        add_lanes(&mut running, &current);
    }
    running
}

#[inline]
fn add_lanes<const N: usize>(into: &mut [u32; N], from: &[u32; N]) {
    for (a, b) in into.iter_mut().zip(from) {
        *a += *b;
    }
}

//! # Streaming Channels
//!
//! Bounded hand-off between the core driver and world streaming.
//!
//! ```text
//! ┌──────────┐  EgressBatch   ┌────────────┐  EgressBundle  ┌────────────┐
//! │  Loader  │───────────────>│ CoreMemory │───────────────>│  Unloader  │
//! └──────────┘                └────────────┘                └────────────┘
//! ```
//!
//! Loaders send zero-based regions, the same shape egress produces, so an
//! unloaded batch can be sent straight back in.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use tracing::warn;

use sector_core::{BrokenObject, CollectedObject, EgressBatch, EgressCounts};

use crate::error::{RuntimeError, RuntimeResult};

/// Everything that left the active region in one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct EgressBundle {
    /// Tick that produced the bundle.
    pub tick: u64,
    /// Sizes of the three parts.
    pub counts: EgressCounts,
    /// Extracted `SECTOR_OUT` subtrees.
    pub sector: EgressBatch,
    /// Reports for `BROKEN` entities.
    pub broken: Vec<BrokenObject>,
    /// Reports for `COLLECTED` entities.
    pub collected: Vec<CollectedObject>,
}

impl EgressBundle {
    /// True when nothing left the region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Sending end of a streaming channel.
#[derive(Debug)]
pub struct BatchSender<T> {
    sender: Sender<T>,
    channel: &'static str,
}

impl<T> Clone for BatchSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            channel: self.channel,
        }
    }
}

impl<T> BatchSender<T> {
    /// Sends, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Disconnected`] if the receiver was dropped.
    pub fn send(&self, batch: T) -> RuntimeResult<()> {
        self.sender
            .send(batch)
            .map_err(|_| RuntimeError::Disconnected(self.channel))
    }

    /// Sends without blocking.
    ///
    /// # Returns
    ///
    /// `None` if the batch was queued, or the batch itself if the channel is
    /// full.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Disconnected`] if the receiver was dropped.
    pub fn try_send(&self, batch: T) -> RuntimeResult<Option<T>> {
        match self.sender.try_send(batch) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(batch)) => {
                warn!(channel = self.channel, "streaming channel full");
                Ok(Some(batch))
            }
            Err(TrySendError::Disconnected(_)) => Err(RuntimeError::Disconnected(self.channel)),
        }
    }
}

/// Receiving end of a streaming channel.
#[derive(Debug)]
pub struct BatchReceiver<T> {
    receiver: Receiver<T>,
    channel: &'static str,
}

impl<T> BatchReceiver<T> {
    /// Takes every batch queued right now.
    #[must_use]
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Takes one batch if one is queued.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Disconnected`] once the channel is empty and
    /// every sender was dropped.
    pub fn try_recv(&self) -> RuntimeResult<Option<T>> {
        match self.receiver.try_recv() {
            Ok(batch) => Ok(Some(batch)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RuntimeError::Disconnected(self.channel)),
        }
    }

    /// Waits up to `timeout` for one batch.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Disconnected`] once the channel is empty and
    /// every sender was dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> RuntimeResult<Option<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(RuntimeError::Disconnected(self.channel)),
        }
    }

    /// Batches waiting.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Creates a bounded channel named `channel` in errors and logs.
#[must_use]
pub fn batch_channel<T>(
    channel: &'static str,
    capacity: usize,
) -> (BatchSender<T>, BatchReceiver<T>) {
    let (sender, receiver) = bounded(capacity);
    (
        BatchSender { sender, channel },
        BatchReceiver { receiver, channel },
    )
}

/// The world-streaming ends of a core's channels.
#[derive(Debug)]
pub struct StreamingHandles {
    /// Regions to merge into the active region.
    pub loader: BatchSender<EgressBatch>,
    /// Everything that left the active region, one bundle per tick.
    pub unloader: BatchReceiver<EgressBundle>,
}

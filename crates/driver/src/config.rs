use std::time::Duration;

use alloy_primitives::Address;
use batchd_config::Opts;
use batchd_primitives::blob::MAX_BLOB_DATA_SIZE;
use derive_more::derive::{Deref, DerefMut};

use crate::channel::ChannelSettings;

/// The maximum number of frames a single blob transaction can carry,
/// one blob per frame.
const MAX_FRAMES_PER_BLOB_TX: usize = 6;

/// The runtime configuration of the batch submitter.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct BatcherConfig {
    /// CLI options that can be accessed as dereferenced fields.
    #[deref]
    #[deref_mut]
    pub opts: Opts,
}

impl BatcherConfig {
    /// Creates a new [`BatcherConfig`] from the given [`Opts`].
    pub const fn new(opts: Opts) -> Self {
        Self { opts }
    }

    /// How often the driver polls the sequencer for new blocks.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.opts.batcher.poll_interval_secs)
    }

    /// The timeout applied to every single RPC request.
    pub const fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.opts.batcher.network_timeout_secs)
    }

    /// The maximum number of batch transactions in flight at once.
    pub const fn max_pending_transactions(&self) -> usize {
        self.opts.batcher.max_pending_transactions
    }

    /// How often the tx manager polls for a submitted transaction's receipt.
    pub const fn receipt_poll_interval(&self) -> Duration {
        Duration::from_secs(self.opts.batcher.receipt_poll_secs)
    }

    /// How long the tx manager waits for a submitted transaction to land.
    pub const fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.opts.batcher.receipt_timeout_secs)
    }

    /// Whether batch data is submitted as blob transactions.
    pub const fn use_blobs(&self) -> bool {
        self.opts.batcher.use_blobs
    }

    /// The L1 address that receives batch submission transactions.
    pub const fn batch_inbox_address(&self) -> Address {
        self.opts.rollup.batch_inbox_address
    }

    /// The channel manager settings derived from the options.
    ///
    /// The frame size is clamped to the blob capacity so that one frame always
    /// fits one blob; calldata mode restricts every unit to a single frame.
    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            max_frame_size: self.opts.batcher.max_frame_size.min(MAX_BLOB_DATA_SIZE),
            max_frames_per_tx: if self.use_blobs() { MAX_FRAMES_PER_BLOB_TX } else { 1 },
        }
    }
}

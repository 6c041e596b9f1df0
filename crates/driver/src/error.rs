use batchd_clients::ClientError;
use batchd_primitives::blob::BlobError;
use thiserror::Error;

/// Errors surfaced by the batch submitter lifecycle and its tick operations.
///
/// None of these halt the driver loop once it has started: a failing tick is
/// logged and retried on the next poll.
#[derive(Debug, Error)]
pub enum BatcherError {
    #[error("batcher is already running")]
    AlreadyRunning,
    #[error("batcher is not running")]
    NotRunning,
    #[error("empty sync status")]
    EmptySyncStatus,
    #[error("L2 safe head ahead of L2 unsafe head")]
    SafeAheadOfUnsafe,
    #[error("nothing to ingest: start number {start} is >= end number {end}")]
    InvalidRange {
        /// The resolved range start.
        start: u64,
        /// The resolved range end.
        end: u64,
    },
    #[error("shutdown requested while ingesting blocks")]
    ShuttingDown,
    #[error("kill requested while publishing")]
    Killed,
    #[error("request timed out: {0}")]
    Timeout(&'static str),
    #[error("could not create blob tx candidate: {0}")]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors surfaced by the channel manager contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The appended block does not extend the manager's last known block.
    #[error("L2 reorg detected while appending block")]
    Reorg,
    /// The manager was closed while submittable data remains.
    #[error("channel manager closed with pending data remaining")]
    PendingAfterClose,
    /// A block was appended after the manager was closed.
    #[error("channel manager is closed")]
    Closed,
}

impl BatcherError {
    /// Returns `true` if this error is a channel manager reorg.
    pub const fn is_reorg(&self) -> bool {
        matches!(self, Self::Channel(ChannelError::Reorg))
    }
}

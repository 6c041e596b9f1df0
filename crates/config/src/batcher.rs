use clap::Parser;

/// Batch-submission configuration options
#[derive(Debug, Clone, Parser)]
pub struct BatcherOpts {
    /// How often to poll the sequencer for new blocks (in seconds)
    #[clap(long = "batcher.poll-interval", env = "BATCHD_POLL_INTERVAL", default_value_t = 6)]
    pub poll_interval_secs: u64,
    /// The timeout applied to every single RPC request (in seconds)
    #[clap(long = "batcher.network-timeout", env = "BATCHD_NETWORK_TIMEOUT", default_value_t = 10)]
    pub network_timeout_secs: u64,
    /// The maximum number of batch transactions in flight at once.
    /// Submission blocks while the cap is reached.
    #[clap(
        long = "batcher.max-pending-transactions",
        env = "BATCHD_MAX_PENDING_TRANSACTIONS",
        default_value_t = 1
    )]
    pub max_pending_transactions: usize,
    /// Whether to submit batch data as EIP-4844 blob transactions
    #[clap(long = "batcher.use-blobs", env = "BATCHD_USE_BLOBS", default_value_t = false)]
    pub use_blobs: bool,
    /// The maximum size of a single channel frame, in bytes
    #[clap(long = "batcher.max-frame-size", env = "BATCHD_MAX_FRAME_SIZE", default_value_t = 120_000)]
    pub max_frame_size: usize,
    /// How often to poll for the receipt of a submitted transaction (in seconds)
    #[clap(long = "batcher.receipt-poll-interval", env = "BATCHD_RECEIPT_POLL_INTERVAL", default_value_t = 3)]
    pub receipt_poll_secs: u64,
    /// How long to wait for a submitted transaction to land before giving up (in seconds)
    #[clap(long = "batcher.receipt-timeout", env = "BATCHD_RECEIPT_TIMEOUT", default_value_t = 120)]
    pub receipt_timeout_secs: u64,
}

use metrics::{counter, gauge, histogram};

#[derive(Debug, Clone, Copy)]
pub(crate) struct BatcherMetrics;

impl BatcherMetrics {
    // ============= CHAIN STATE ================ //

    /// Sets the highest L2 block loaded into the channel manager.
    pub(crate) fn record_l2_blocks_loaded(block_number: u64) {
        counter!("batcher_l2_blocks_loaded").absolute(block_number);
    }

    /// Sets the most recently observed L1 tip.
    pub(crate) fn record_latest_l1_block(block_number: u64) {
        counter!("batcher_latest_l1_block").absolute(block_number);
    }

    /// Increments the amount of L2 reorgs observed during ingestion.
    pub(crate) fn increment_reorgs(block_number: u64) {
        counter!("batcher_l2_reorgs", "block_number" => block_number.to_string()).increment(1);
    }

    // ============= SUBMISSIONS ================ //

    /// Increments the amount of batch transactions confirmed on L1.
    pub(crate) fn increment_confirmed_txs() {
        counter!("batcher_confirmed_txs").increment(1);
    }

    /// Increments the amount of batch transactions that failed to send, by reason.
    pub(crate) fn increment_failed_txs(reason: String) {
        counter!("batcher_failed_txs", "reason" => reason).increment(1);
    }

    /// Increments the amount of failed alt-DA stores, by reason.
    pub(crate) fn increment_altda_put_failures(reason: String) {
        counter!("batcher_altda_put_failures", "reason" => reason).increment(1);
    }

    /// Records the number of data bytes used in the final blob of a candidate.
    pub(crate) fn record_blob_used_bytes(value: usize) {
        histogram!("batcher_blob_used_bytes").record(value as f64);
    }

    // ============= CHANNEL MANAGER ================ //

    /// Sets the number of L2 blocks buffered and not yet framed.
    pub(crate) fn set_buffered_blocks(count: usize) {
        gauge!("batcher_buffered_blocks").set(count as f64);
    }

    /// Sets the number of frames ready for submission.
    pub(crate) fn set_ready_frames(count: usize) {
        gauge!("batcher_ready_frames").set(count as f64);
    }

    /// Sets the number of units emitted and awaiting an outcome.
    pub(crate) fn set_pending_units(count: usize) {
        gauge!("batcher_pending_units").set(count as f64);
    }

    // ============= LIFECYCLE ================ //

    /// Sets whether the driver loop is currently running.
    pub(crate) fn set_running(running: bool) {
        gauge!("batcher_running").set(if running { 1.0 } else { 0.0 });
    }
}

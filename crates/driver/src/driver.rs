use std::sync::Arc;

use alloy::rpc::types::TransactionReceipt;
use alloy_primitives::Bytes;
use batchd_clients::{
    TxCandidate,
    traits::{AltDaProvider, EndpointProvider, L1Client, TxManager},
};
use batchd_primitives::{
    eth::{BlockId, L1BlockRef},
    summary::Summary,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::{MissedTickBehavior, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    channel::{ChannelManager, TxData},
    config::BatcherConfig,
    error::{BatcherError, ChannelError},
    metrics::BatcherMetrics,
    queue::{TxQueue, TxReceipt},
};

/// Transaction base cost and per-byte calldata costs (EIP-2028).
const TX_GAS: u64 = 21_000;
const TX_DATA_ZERO_GAS: u64 = 4;
const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// The collection of collaborators and configuration the driver operates on.
#[derive(Clone)]
pub struct DriverSetup {
    /// The runtime configuration.
    pub cfg: BatcherConfig,
    /// Client used to read the L1 tip.
    pub l1_client: Arc<dyn L1Client>,
    /// Provider of the currently-active L2 execution and rollup clients.
    pub endpoints: Arc<dyn EndpointProvider>,
    /// The manager that signs, broadcasts and confirms L1 transactions.
    pub txmgr: Arc<dyn TxManager>,
    /// The optional alt-DA provider for calldata batches.
    pub altda: Option<Arc<dyn AltDaProvider>>,
}

/// The lifecycle state guarded by the driver mutex.
#[derive(Debug, Default)]
struct Lifecycle {
    running: bool,
    shutdown: CancellationToken,
    kill: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

/// The state owned by a single run of the driver loop.
///
/// Bookmarks are only ever touched from the loop task; the channel manager is
/// the one piece of state shared with the receipt fan-in.
struct LoopState {
    shutdown: CancellationToken,
    kill: CancellationToken,
    queue: TxQueue,
    receipts_tx: mpsc::Sender<TxReceipt>,
    /// The highest L2 block ingested into the channel manager. `None` means
    /// uninitialized or reorg-invalidated; the next tick rebinds it to the
    /// safe head.
    last_stored_block: Option<BlockId>,
    /// The most recently observed L1 tip.
    last_l1_tip: Option<L1BlockRef>,
}

/// A service responsible for submitting batches of L2 blocks to the L1 batch
/// inbox for data availability.
///
/// The driver tails the sequencer's unsafe chain on a poll interval, appends
/// new blocks to the channel manager, and drains ready channel data into a
/// bounded submission queue as either calldata or blob transactions.
pub struct BatchSubmitter {
    setup: DriverSetup,
    state: Arc<ChannelManager>,
    lifecycle: Mutex<Lifecycle>,
}

impl BatchSubmitter {
    /// Initializes the driver from a preconfigured [`DriverSetup`].
    pub fn new(setup: DriverSetup) -> Self {
        let state = Arc::new(ChannelManager::new(setup.cfg.channel_settings()));
        Self { setup, state, lifecycle: Mutex::new(Lifecycle::default()) }
    }

    /// Starts the driver loop.
    ///
    /// Returns [`BatcherError::AlreadyRunning`] if the loop is active.
    pub async fn start(self: &Arc<Self>) -> Result<(), BatcherError> {
        info!("Starting batch submitter");

        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.running {
            return Err(BatcherError::AlreadyRunning);
        }
        lifecycle.running = true;

        let shutdown = CancellationToken::new();
        let kill = CancellationToken::new();
        lifecycle.shutdown = shutdown.clone();
        lifecycle.kill = kill.clone();

        self.state.clear();

        let driver = Arc::clone(self);
        lifecycle.worker = Some(tokio::spawn(async move { driver.run_loop(shutdown, kill).await }));
        BatcherMetrics::set_running(true);

        info!("Batch submitter started");
        Ok(())
    }

    /// Stops the driver loop, blocking until the final drain completes and
    /// the worker joins. Cancelling `ctx` force-kills outstanding submissions
    /// instead of waiting for them.
    ///
    /// Returns [`BatcherError::NotRunning`] if the loop is not active.
    pub async fn stop(&self, ctx: CancellationToken) -> Result<(), BatcherError> {
        info!("Stopping batch submitter");

        let mut lifecycle = self.lifecycle.lock().await;
        if !lifecycle.running {
            return Err(BatcherError::NotRunning);
        }
        lifecycle.running = false;

        // Fire the kill scope early if the caller context is cancelled before
        // the drain finishes.
        let kill = lifecycle.kill.clone();
        let watcher = tokio::spawn({
            let kill = kill.clone();
            async move {
                ctx.cancelled().await;
                kill.cancel();
            }
        });

        lifecycle.shutdown.cancel();
        if let Some(worker) = lifecycle.worker.take() {
            let _ = worker.await;
        }
        kill.cancel();
        watcher.abort();
        BatcherMetrics::set_running(false);

        info!("Batch submitter stopped");
        Ok(())
    }

    /// Like [`Self::stop`], but treats a driver that is not running as
    /// already stopped.
    pub async fn stop_if_running(&self, ctx: CancellationToken) -> Result<(), BatcherError> {
        match self.stop(ctx).await {
            Err(BatcherError::NotRunning) => Ok(()),
            other => other,
        }
    }

    /// Returns whether the driver loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.running
    }

    /// The main driver loop: ingests new L2 blocks on every tick and drains
    /// ready channel data into the submission queue, until shutdown.
    async fn run_loop(&self, shutdown: CancellationToken, kill: CancellationToken) {
        let (receipts_tx, mut receipts_rx) =
            mpsc::channel::<TxReceipt>(self.setup.cfg.max_pending_transactions().max(1));
        let queue = TxQueue::new(
            kill.clone(),
            Arc::clone(&self.setup.txmgr),
            self.setup.cfg.max_pending_transactions(),
        );

        // Receipt fan-in: a single consumer that turns submission outcomes
        // into channel manager calls, for the lifetime of this loop.
        let fanin_done = CancellationToken::new();
        let fanin = tokio::spawn({
            let state = Arc::clone(&self.state);
            let done = fanin_done.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;
                        Some(receipt) = receipts_rx.recv() => handle_receipt(&state, receipt),
                        () = done.cancelled() => {
                            debug!("Receipt processing loop done");
                            return;
                        }
                    }
                }
            }
        });

        let mut ls = LoopState {
            shutdown,
            kill,
            queue,
            receipts_tx,
            last_stored_block: None,
            last_l1_tip: None,
        };

        let mut ticker = tokio::time::interval(self.setup.cfg.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.load_blocks_into_state(&mut ls).await {
                        Err(err) if err.is_reorg() => {
                            // On a reorg, publish all pending state and wait
                            // for every outcome before resetting the manager.
                            self.close_channel_manager("an L2 reorg");
                            self.publish_and_wait(&mut ls).await;
                            self.state.clear();
                            continue;
                        }
                        // A failed ingestion aborts the batch, not the drain;
                        // whatever is ready can still be published.
                        Err(_) | Ok(()) => {}
                    }
                    self.publish_state_to_l1(&mut ls).await;
                }
                () = ls.shutdown.cancelled() => {
                    if self.setup.txmgr.is_closed() {
                        info!("Tx manager is closed, remaining channel data won't be sent");
                        break;
                    }
                    // Terminate the unfinished channel so its data gets submitted.
                    self.close_channel_manager("shutdown");
                    self.publish_and_wait(&mut ls).await;
                    info!("Finished publishing all remaining channel data");
                    break;
                }
            }
        }

        fanin_done.cancel();
        let _ = fanin.await;
    }

    /// Closes the channel manager, tolerating the pending-data warning.
    fn close_channel_manager(&self, reason: &str) {
        match self.state.close() {
            Ok(()) => {}
            Err(ChannelError::PendingAfterClose) => {
                warn!("Closed channel manager to handle {reason} with pending data remaining - submitting");
            }
            Err(err) => error!(%err, "Error closing the channel manager to handle {reason}"),
        }
    }

    /// Loads all blocks between the local bookmark and the sequencer's unsafe
    /// head into the channel manager.
    ///
    /// On a reorg the bookmark is reset but the manager state is kept, so it
    /// can still be flushed to L1.
    async fn load_blocks_into_state(&self, ls: &mut LoopState) -> Result<(), BatcherError> {
        let (start, end) = self.calculate_l2_block_range(ls).await.inspect_err(|err| {
            warn!(%err, "Error calculating L2 block range");
        })?;
        if start.number >= end.number {
            return Err(BatcherError::InvalidRange { start: start.number, end: end.number });
        }

        let mut latest: Option<BlockId> = None;
        for number in start.number + 1..=end.number {
            let loaded = tokio::select! {
                biased;
                () = ls.shutdown.cancelled() => return Err(BatcherError::ShuttingDown),
                loaded = self.load_block_into_state(number) => loaded,
            };

            match loaded {
                Err(err) if err.is_reorg() => {
                    warn!(block_number = number, "Found L2 reorg");
                    BatcherMetrics::increment_reorgs(number);
                    ls.last_stored_block = None;
                    return Err(err);
                }
                Err(err) => {
                    warn!(%err, "Failed to load block into state");
                    return Err(err);
                }
                Ok(id) => {
                    ls.last_stored_block = Some(id);
                    latest = Some(id);
                }
            }
        }

        if let Some(latest) = latest {
            BatcherMetrics::record_l2_blocks_loaded(latest.number);
        }
        Ok(())
    }

    /// Fetches and stores a single L2 block into the channel manager.
    async fn load_block_into_state(&self, block_number: u64) -> Result<BlockId, BatcherError> {
        let l2_client = self.setup.endpoints.l2_client();
        let block = match timeout(
            self.setup.cfg.network_timeout(),
            l2_client.block_by_number(block_number),
        )
        .await
        {
            Err(_) => {
                self.setup.endpoints.rotate();
                return Err(BatcherError::Timeout("L2 block fetch"));
            }
            Ok(Err(err)) => {
                self.setup.endpoints.rotate();
                return Err(err.into());
            }
            Ok(Ok(block)) => block,
        };

        self.state.add_l2_block(&block)?;

        let id = BlockId::new(block.header.hash, block.header.number);
        info!(
            block = %id,
            tx_count = block.transactions.len(),
            time = block.header.timestamp,
            "Added L2 block to local state"
        );
        Ok(id)
    }

    /// Determines the exclusive range `(start, end]` of L2 blocks that should
    /// be loaded into the channel manager, initializing or snapping the local
    /// bookmark to the safe head where needed.
    async fn calculate_l2_block_range(
        &self,
        ls: &mut LoopState,
    ) -> Result<(BlockId, BlockId), BatcherError> {
        let rollup_client = self.setup.endpoints.rollup_client();
        let status =
            match timeout(self.setup.cfg.network_timeout(), rollup_client.sync_status()).await {
                Err(_) => {
                    self.setup.endpoints.rotate();
                    return Err(BatcherError::Timeout("sync status"));
                }
                Ok(Err(err)) => {
                    self.setup.endpoints.rotate();
                    return Err(err.into());
                }
                Ok(Ok(status)) => status,
            };

        if status.head_l1 == L1BlockRef::default() {
            return Err(BatcherError::EmptySyncStatus);
        }

        // Initialize the bookmark on startup, or snap it forward when it
        // lagged behind the safe head: the rollup node processed batches that
        // were submitted before this instance came alive.
        let last_stored = match ls.last_stored_block {
            None => {
                info!(status = %status.summary(), "Starting batch submitter work at safe head");
                status.safe_l2.id()
            }
            Some(last) if last.number < status.safe_l2.number => {
                warn!(
                    last = %last,
                    safe = %status.safe_l2.id(),
                    "Last submitted block lagged behind L2 safe head; continuing from the safe head"
                );
                status.safe_l2.id()
            }
            Some(last) => last,
        };
        ls.last_stored_block = Some(last_stored);

        // Defensive: a sequencer reporting its safe head at or above the
        // unsafe head has nothing submittable.
        if status.safe_l2.number >= status.unsafe_l2.number {
            return Err(BatcherError::SafeAheadOfUnsafe);
        }

        Ok((last_stored, status.unsafe_l2.id()))
    }

    /// Queues up all ready channel data for publishing to the L1, returning
    /// when there is no more data to queue or when an error occurred.
    async fn publish_state_to_l1(&self, ls: &mut LoopState) {
        loop {
            if self.setup.txmgr.is_closed() {
                info!("Tx manager is closed, aborting state publishing");
                return;
            }
            match self.publish_tx_to_l1(ls).await {
                Ok(true) => {}
                Ok(false) => return,
                Err(err) => {
                    error!(%err, "Error publishing batch transaction to L1");
                    return;
                }
            }
        }
    }

    /// Publishes all ready channel data, then blocks until every outstanding
    /// submission has produced an outcome - unless the tx manager is closed,
    /// in which case nothing would drain the queue.
    async fn publish_and_wait(&self, ls: &mut LoopState) {
        self.publish_state_to_l1(ls).await;
        if self.setup.txmgr.is_closed() {
            info!("Tx manager is closed, remaining channel data won't be sent");
        } else {
            ls.queue.wait().await;
        }
    }

    /// Queues a single batch transaction for publishing.
    ///
    /// Returns `Ok(false)` when the tick is done: no data is ready, or the
    /// current unit was diverted (alt-DA failure) and retries on the next poll.
    async fn publish_tx_to_l1(&self, ls: &mut LoopState) -> Result<bool, BatcherError> {
        let l1_tip = tokio::select! {
            biased;
            () = ls.kill.cancelled() => return Err(BatcherError::Killed),
            l1_tip = self.l1_tip() => l1_tip,
        }
        .inspect_err(|err| error!(%err, "Failed to query L1 tip"))?;
        self.record_l1_tip(ls, l1_tip);

        let Some(txdata) = self.state.tx_data(l1_tip.id())? else {
            trace!("No transaction data available");
            return Ok(false);
        };

        self.send_transaction(txdata, ls).await
    }

    /// Converts a unit of channel data into an L1 transaction candidate and
    /// hands it to the submission queue, blocking while the in-flight cap is
    /// reached.
    ///
    /// Returns `Ok(false)` when the unit was marked failed instead of queued.
    async fn send_transaction(
        &self,
        txdata: TxData,
        ls: &mut LoopState,
    ) -> Result<bool, BatcherError> {
        let mut candidate = if self.setup.cfg.use_blobs() {
            // We do not fall back to a calldata tx here: the chain is tuned
            // for blob fees, and a failing blob rendering means a serious bug
            // or configuration issue.
            self.blob_tx_candidate(&txdata)?
        } else {
            let frames = txdata.frame_count();
            assert!(frames == 1, "unexpected number of frames in calldata transaction: {frames}");

            let mut data = txdata.call_data();
            if let Some(altda) = &self.setup.altda {
                let stored = tokio::select! {
                    biased;
                    () = ls.kill.cancelled() => Err(batchd_clients::ClientError::Closed),
                    stored = altda.set_input(data.clone()) => stored,
                };
                match stored {
                    Ok(commitment) => data = commitment.encode(),
                    Err(err) => {
                        error!(%err, "Failed to post input to alt-DA provider");
                        BatcherMetrics::increment_altda_put_failures(err.to_string());
                        // Mark the unit failed so the frame is requeued and
                        // retried on the next poll.
                        record_failed_tx(&self.state, &txdata, &err);
                        return Ok(false);
                    }
                }
            }
            self.calldata_tx_candidate(data)
        };

        // Pin the intrinsic gas lower bound when it can be computed; a zero
        // gas limit lets the tx manager estimate instead.
        match intrinsic_gas(&candidate.tx_data) {
            Some(gas) => candidate.gas_limit = gas,
            None => error!(unit = %txdata.id(), "Failed to calculate intrinsic gas"),
        }

        ls.queue.send(txdata, candidate, &ls.receipts_tx).await;
        Ok(true)
    }

    /// Builds a blob transaction candidate carrying one blob per frame and an
    /// empty calldata payload.
    fn blob_tx_candidate(&self, txdata: &TxData) -> Result<TxCandidate, BatcherError> {
        let blobs = txdata.blobs()?;
        let last_size = txdata.last_frame_len();

        info!(
            size = txdata.len(),
            last_size,
            num_blobs = blobs.len(),
            "Building blob transaction candidate"
        );
        BatcherMetrics::record_blob_used_bytes(last_size);

        Ok(TxCandidate {
            to: self.setup.cfg.batch_inbox_address(),
            tx_data: Bytes::new(),
            blobs,
            gas_limit: 0,
        })
    }

    /// Builds a calldata transaction candidate carrying the given payload.
    fn calldata_tx_candidate(&self, data: Bytes) -> TxCandidate {
        info!(size = data.len(), "Building calldata transaction candidate");
        TxCandidate {
            to: self.setup.cfg.batch_inbox_address(),
            tx_data: data,
            blobs: vec![],
            gas_limit: 0,
        }
    }

    /// Reads the current L1 tip as an [`L1BlockRef`].
    async fn l1_tip(&self) -> Result<L1BlockRef, BatcherError> {
        let header =
            match timeout(self.setup.cfg.network_timeout(), self.setup.l1_client.header_by_number(None))
                .await
            {
                Err(_) => return Err(BatcherError::Timeout("L1 tip query")),
                Ok(header) => header?,
            };

        Ok(L1BlockRef {
            hash: header.hash,
            number: header.inner.number,
            parent_hash: header.inner.parent_hash,
            timestamp: header.inner.timestamp,
        })
    }

    /// Updates the L1 tip bookmark, emitting the tip metric only on change.
    /// Returns whether the tip changed.
    fn record_l1_tip(&self, ls: &mut LoopState, l1_tip: L1BlockRef) -> bool {
        if ls.last_l1_tip == Some(l1_tip) {
            return false;
        }
        ls.last_l1_tip = Some(l1_tip);
        BatcherMetrics::record_latest_l1_block(l1_tip.number);
        true
    }
}

/// Dispatches a submission outcome to the channel manager.
fn handle_receipt(state: &ChannelManager, receipt: TxReceipt) {
    match receipt.result {
        Ok(l1_receipt) => record_confirmed_tx(state, &receipt.id, &l1_receipt),
        Err(err) => record_failed_tx(state, &receipt.id, &err),
    }
}

/// Marks a unit as failed so the channel manager requeues its frames.
fn record_failed_tx(state: &ChannelManager, txdata: &TxData, err: &dyn std::fmt::Display) {
    warn!(tx = %txdata.summary(), %err, "Transaction failed to send");
    BatcherMetrics::increment_failed_txs(err.to_string());
    state.tx_failed(&txdata.id());
}

/// Marks a unit as confirmed in the L1 block of its receipt.
fn record_confirmed_tx(state: &ChannelManager, txdata: &TxData, receipt: &TransactionReceipt) {
    let l1_block = receipt_block_id(receipt);
    info!(tx = %txdata.summary(), tx_hash = %receipt.transaction_hash, block = %l1_block, "Transaction confirmed");
    BatcherMetrics::increment_confirmed_txs();
    state.tx_confirmed(&txdata.id(), l1_block);
}

/// The id of the L1 block a receipt was included in.
fn receipt_block_id(receipt: &TransactionReceipt) -> BlockId {
    BlockId::new(
        receipt.block_hash.unwrap_or_default(),
        receipt.block_number.unwrap_or_default(),
    )
}

/// The intrinsic gas lower bound of a calldata payload, `None` on overflow.
fn intrinsic_gas(data: &[u8]) -> Option<u64> {
    let zero_bytes = data.iter().filter(|byte| **byte == 0).count() as u64;
    let non_zero_bytes = data.len() as u64 - zero_bytes;

    TX_GAS
        .checked_add(zero_bytes.checked_mul(TX_DATA_ZERO_GAS)?)?
        .checked_add(non_zero_bytes.checked_mul(TX_DATA_NON_ZERO_GAS)?)
}

use std::{fmt, sync::Arc};

use alloy::rpc::types::TransactionReceipt;
use batchd_clients::{ClientError, ClientResult, TxCandidate, traits::TxManager};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::channel::TxData;

/// The outcome of a queued submission, correlated by the original unit.
#[derive(Debug)]
pub struct TxReceipt {
    /// The unit that was submitted.
    pub id: TxData,
    /// The L1 receipt, or the error the submission failed with.
    pub result: ClientResult<TransactionReceipt>,
}

/// A bounded queue of concurrent L1 submissions.
///
/// [`TxQueue::send`] blocks while the configured number of submissions is in
/// flight, which provides natural backpressure into the driver loop. Every
/// accepted candidate yields exactly one [`TxReceipt`] on the receipts
/// channel, unless the kill token fires first.
pub struct TxQueue {
    txmgr: Arc<dyn TxManager>,
    permits: Arc<Semaphore>,
    max_pending: usize,
    kill: CancellationToken,
}

impl fmt::Debug for TxQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxQueue")
            .field("permits", &self.permits)
            .field("max_pending", &self.max_pending)
            .field("kill", &self.kill)
            .finish()
    }
}

impl TxQueue {
    /// Creates a new queue over the given transaction manager, allowing at
    /// most `max_pending` concurrent submissions.
    pub fn new(kill: CancellationToken, txmgr: Arc<dyn TxManager>, max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self { txmgr, permits: Arc::new(Semaphore::new(max_pending)), max_pending, kill }
    }

    /// Queues a candidate for submission, blocking while the in-flight cap is
    /// reached. The submission itself runs in a background task; its outcome
    /// arrives on `receipts_tx` with the given unit as the correlation token.
    pub async fn send(&self, id: TxData, candidate: TxCandidate, receipts_tx: &mpsc::Sender<TxReceipt>) {
        let permit = tokio::select! {
            biased;
            () = self.kill.cancelled() => {
                debug!("Kill requested while waiting for a submission slot");
                let _ = receipts_tx.send(TxReceipt { id, result: Err(ClientError::Closed) }).await;
                return;
            }
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.expect("submission semaphore never closed")
            }
        };

        let txmgr = Arc::clone(&self.txmgr);
        let kill = self.kill.clone();
        let receipts_tx = receipts_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = kill.cancelled() => Err(ClientError::Closed),
                result = txmgr.send(candidate) => result,
            };

            // The receiver may already be gone when the driver loop has
            // exited; the outcome is dropped in that case.
            let _ = receipts_tx.send(TxReceipt { id, result }).await;
            drop(permit);
        });
    }

    /// Blocks until every queued submission has completed.
    pub async fn wait(&self) {
        let _all = self
            .permits
            .acquire_many(self.max_pending as u32)
            .await
            .expect("submission semaphore never closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy_primitives::B256;
    use async_trait::async_trait;
    use batchd_clients::traits::OpBlock;
    use tokio::sync::Notify;

    use super::*;
    use crate::channel::{ChannelManager, ChannelSettings};

    /// A manager that holds every submission until released.
    #[derive(Default)]
    struct GatedTxManager {
        in_flight: AtomicUsize,
        total: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl TxManager for GatedTxManager {
        async fn send(&self, _candidate: TxCandidate) -> ClientResult<TransactionReceipt> {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(ClientError::Custom("gated manager never lands".to_owned()))
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn close(&self) {}
    }

    fn test_unit(seed: u8) -> TxData {
        let manager = ChannelManager::new(ChannelSettings { max_frame_size: 1024, max_frames_per_tx: 1 });
        let block = OpBlock {
            header: alloy::rpc::types::Header {
                hash: B256::repeat_byte(seed),
                inner: alloy::consensus::Header { number: seed as u64, ..Default::default() },
                total_difficulty: None,
                size: None,
            },
            uncles: vec![],
            transactions: alloy::rpc::types::BlockTransactions::Full(vec![]),
            withdrawals: None,
        };
        manager.add_l2_block(&block).unwrap();
        manager.tx_data(Default::default()).unwrap().expect("unit ready")
    }

    #[tokio::test]
    async fn sends_block_at_the_in_flight_cap() {
        let txmgr = Arc::new(GatedTxManager::default());
        let queue = TxQueue::new(CancellationToken::new(), Arc::clone(&txmgr) as _, 2);
        let (receipts_tx, mut receipts_rx) = mpsc::channel(8);

        queue.send(test_unit(1), TxCandidate::default(), &receipts_tx).await;
        queue.send(test_unit(2), TxCandidate::default(), &receipts_tx).await;
        while txmgr.in_flight.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        // The third send must not acquire a slot while two are in flight.
        let third = queue.send(test_unit(3), TxCandidate::default(), &receipts_tx);
        tokio::select! {
            () = third => panic!("third send acquired a slot beyond the cap"),
            () = tokio::task::yield_now() => {}
        }
        assert_eq!(txmgr.in_flight.load(Ordering::SeqCst), 2);

        // Releasing one submission frees a slot for the third.
        txmgr.release.notify_one();
        let _ = receipts_rx.recv().await.expect("first outcome");
        queue.send(test_unit(3), TxCandidate::default(), &receipts_tx).await;
        while txmgr.total.load(Ordering::SeqCst) < 3 {
            tokio::task::yield_now().await;
        }

        txmgr.release.notify_waiters();
    }

    #[tokio::test]
    async fn every_send_yields_exactly_one_receipt() {
        let txmgr = Arc::new(GatedTxManager::default());
        let queue = TxQueue::new(CancellationToken::new(), Arc::clone(&txmgr) as _, 4);
        let (receipts_tx, mut receipts_rx) = mpsc::channel(8);

        let units = [test_unit(1), test_unit(2), test_unit(3)];
        for unit in units.clone() {
            queue.send(unit, TxCandidate::default(), &receipts_tx).await;
        }
        while txmgr.in_flight.load(Ordering::SeqCst) < units.len() {
            tokio::task::yield_now().await;
        }
        txmgr.release.notify_waiters();

        let mut seen = vec![];
        for _ in 0..units.len() {
            seen.push(receipts_rx.recv().await.expect("receipt").id.id());
        }
        for unit in &units {
            assert_eq!(seen.iter().filter(|id| **id == unit.id()).count(), 1);
        }
    }

    #[tokio::test]
    async fn kill_unblocks_in_flight_sends() {
        let kill = CancellationToken::new();
        let txmgr = Arc::new(GatedTxManager::default());
        let queue = TxQueue::new(kill.clone(), Arc::clone(&txmgr) as _, 1);
        let (receipts_tx, mut receipts_rx) = mpsc::channel(8);

        queue.send(test_unit(1), TxCandidate::default(), &receipts_tx).await;
        kill.cancel();

        let receipt = receipts_rx.recv().await.expect("aborted outcome");
        assert!(matches!(receipt.result, Err(ClientError::Closed)));

        // With the kill token fired, further sends fail fast and wait returns.
        queue.send(test_unit(2), TxCandidate::default(), &receipts_tx).await;
        let receipt = receipts_rx.recv().await.expect("refused outcome");
        assert!(matches!(receipt.result, Err(ClientError::Closed)));
        queue.wait().await;
    }
}

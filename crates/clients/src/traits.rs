use std::sync::Arc;

use alloy::rpc::types::{Header, TransactionReceipt};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use batchd_primitives::eth::SyncStatus;

use crate::{altda::Commitment, error::ClientResult, txmgr::TxCandidate};

/// An L2 block with OP-stack transactions, deposit transactions included.
pub type OpBlock = alloy::rpc::types::Block<op_alloy_rpc_types::Transaction>;

/// A client that can read L1 chain data.
#[async_trait]
pub trait L1Client: Send + Sync {
    /// Returns the header of the given L1 block, or the chain tip when `None`.
    async fn header_by_number(&self, number: Option<u64>) -> ClientResult<Header>;
}

/// A client that can read L2 chain data.
#[async_trait]
pub trait L2Client: Send + Sync {
    /// Returns the L2 block with the given number, with full transactions.
    async fn block_by_number(&self, number: u64) -> ClientResult<OpBlock>;
}

/// A client connected to the sequencer's rollup node.
#[async_trait]
pub trait RollupClient: Send + Sync {
    /// Returns the current sync status of the rollup node.
    async fn sync_status(&self) -> ClientResult<SyncStatus>;
}

/// A manager that signs, broadcasts and confirms L1 transactions.
#[async_trait]
pub trait TxManager: Send + Sync {
    /// Submits a single candidate and waits for its receipt.
    async fn send(&self, candidate: TxCandidate) -> ClientResult<TransactionReceipt>;

    /// Returns `true` once the manager refuses new work.
    fn is_closed(&self) -> bool;

    /// Stops accepting new transactions. In-flight submissions are unaffected.
    fn close(&self);
}

/// An off-chain data-availability provider.
#[async_trait]
pub trait AltDaProvider: Send + Sync {
    /// Stores `data` with the provider and returns the commitment to be
    /// posted on L1 in its place.
    async fn set_input(&self, data: Bytes) -> ClientResult<Commitment>;
}

/// Lazy accessor for the currently-active L2 endpoints.
///
/// The returned clients may be rebound between calls when the provider fails
/// over to another endpoint; callers must not cache them across operations.
pub trait EndpointProvider: Send + Sync {
    /// The active L2 execution client.
    fn l2_client(&self) -> Arc<dyn L2Client>;

    /// The active rollup node client.
    fn rollup_client(&self) -> Arc<dyn RollupClient>;

    /// Advances to the next configured endpoint pair.
    fn rotate(&self);
}

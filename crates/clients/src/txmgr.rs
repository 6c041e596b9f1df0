use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use alloy::{
    consensus::BlobTransactionSidecar,
    eips::eip4844::{Blob, env_settings::EnvKzgSettings},
    network::{EthereumWallet, TransactionBuilder, TransactionBuilder4844},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    traits::TxManager,
};

/// A candidate L1 transaction, assembled by the driver and completed
/// (nonce, fees, signature) by the transaction manager.
#[derive(Debug, Clone, Default)]
pub struct TxCandidate {
    /// The recipient address (the batch inbox).
    pub to: Address,
    /// The calldata payload. Empty for blob transactions.
    pub tx_data: Bytes,
    /// The blob payload. Empty for calldata transactions.
    pub blobs: Vec<Blob>,
    /// The gas limit to use. Zero lets the manager estimate.
    pub gas_limit: u64,
}

/// A [`TxManager`] that fills, signs and broadcasts one transaction per
/// candidate and polls for its receipt.
///
/// There is intentionally no replacement or fee escalation here: a candidate
/// that does not land within the receipt timeout is reported as failed, and
/// the channel manager requeues its data.
#[derive(Debug)]
pub struct SimpleTxManager {
    provider: DynProvider,
    chain_id: u64,
    receipt_poll: Duration,
    receipt_timeout: Duration,
    closed: AtomicBool,
}

impl SimpleTxManager {
    /// Creates a new manager that signs with the given key and broadcasts to
    /// the given L1 endpoint.
    pub fn new(
        l1_url: Url,
        signer: PrivateKeySigner,
        chain_id: u64,
        receipt_poll: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(l1_url).erased();

        Self { provider, chain_id, receipt_poll, receipt_timeout, closed: AtomicBool::new(false) }
    }

    /// Builds the transaction request for the given candidate.
    fn build_request(&self, candidate: TxCandidate) -> ClientResult<TransactionRequest> {
        let mut tx_req =
            TransactionRequest::default().with_to(candidate.to).with_chain_id(self.chain_id);

        if candidate.gas_limit > 0 {
            tx_req.set_gas_limit(candidate.gas_limit);
        }

        if candidate.blobs.is_empty() {
            tx_req.set_input(candidate.tx_data);
        } else {
            tx_req = tx_req.with_blob_sidecar(sidecar_from_blobs(&candidate.blobs)?);
        }

        Ok(tx_req)
    }
}

#[async_trait]
impl TxManager for SimpleTxManager {
    async fn send(&self, candidate: TxCandidate) -> ClientResult<TransactionReceipt> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let tx_req = self.build_request(candidate)?;

        // The provider's filler stack completes the nonce, fees and signature
        // before broadcasting.
        let pending = self.provider.send_transaction(tx_req).await?;
        let hash = *pending.tx_hash();
        info!(%hash, "Batch transaction broadcast");

        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                debug!(%hash, block_number = receipt.block_number, "Batch transaction landed");
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ClientError::ReceiptTimeout(hash));
            }
            sleep(self.receipt_poll).await;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// Computes the KZG commitments and proofs for the given blobs and bundles
/// them into a transaction sidecar.
fn sidecar_from_blobs(blobs: &[Blob]) -> ClientResult<BlobTransactionSidecar> {
    let kzg_settings = EnvKzgSettings::Default.get();

    let mut kzg_blobs = Vec::with_capacity(blobs.len());
    let mut commitments = Vec::with_capacity(blobs.len());
    let mut proofs = Vec::with_capacity(blobs.len());

    for blob in blobs {
        let kzg_blob = c_kzg::Blob::from(blob.0);
        let commitment = kzg_settings.blob_to_kzg_commitment(&kzg_blob)?.to_bytes();
        let proof = kzg_settings.compute_blob_kzg_proof(&kzg_blob, &commitment)?.to_bytes();
        kzg_blobs.push(kzg_blob);
        commitments.push(commitment);
        proofs.push(proof);
    }

    Ok(BlobTransactionSidecar::from_kzg(kzg_blobs, commitments, proofs))
}

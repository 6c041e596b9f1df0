use std::time::Duration;

use alloy::{
    rpc::{
        client::{ClientBuilder, RpcClient},
        types::{BlockNumberOrTag, Header},
    },
    transports::{
        TransportErrorKind, TransportResult,
        http::{Http, reqwest::Client},
    },
};
use async_trait::async_trait;
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    traits::{L1Client, L2Client, OpBlock},
};

/// An HTTP-based JSON-RPC execution client.
///
/// Used both for the L1 chain (header reads) and for the L2 chain
/// (full block reads during ingestion).
#[derive(Clone, Debug)]
pub struct ExecutionClient {
    /// The custom RPC client that allows us to extend the provider with raw requests.
    rpc: RpcClient,
}

impl ExecutionClient {
    /// Create a new [`ExecutionClient`] for the given HTTP URL. All requests
    /// carry the given transport-level timeout.
    pub fn new(http_url: Url, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let http = Http::with_client(client, http_url);
        let rpc = ClientBuilder::default().transport(http, false);

        Ok(Self { rpc })
    }

    /// Get the header of the block with the given number. If `None`, the latest block is returned.
    pub async fn get_header(&self, block_number: Option<u64>) -> TransportResult<Header> {
        let tag = block_number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);

        let header: Option<Header> = self.rpc.request("eth_getHeaderByNumber", vec![tag]).await?;
        header.ok_or_else(|| TransportErrorKind::custom_str(&format!("Header not found: {}", tag)))
    }

    /// Get the block with the given number, including full transactions.
    pub async fn get_block(&self, block_number: u64) -> TransportResult<Option<OpBlock>> {
        let tag = BlockNumberOrTag::Number(block_number);

        self.rpc.request("eth_getBlockByNumber", (tag, true)).await
    }
}

#[async_trait]
impl L1Client for ExecutionClient {
    async fn header_by_number(&self, number: Option<u64>) -> ClientResult<Header> {
        Ok(self.get_header(number).await?)
    }
}

#[async_trait]
impl L2Client for ExecutionClient {
    async fn block_by_number(&self, number: u64) -> ClientResult<OpBlock> {
        self.get_block(number).await?.ok_or(ClientError::EmptyResponse("L2 block not found"))
    }
}

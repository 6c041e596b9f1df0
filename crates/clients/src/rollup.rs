use std::time::Duration;

use alloy::{
    providers::{Provider, RootProvider},
    rpc::client::RpcClient,
    transports::http::{Http, reqwest::Client},
};
use async_trait::async_trait;
use batchd_primitives::eth::SyncStatus;
use url::Url;

use crate::{error::ClientResult, traits::RollupClient};

/// A client connected to an OP-stack rollup node.
#[derive(Clone, Debug)]
pub struct RollupNodeClient {
    /// The underlying HTTP provider.
    provider: RootProvider,
}

impl RollupNodeClient {
    /// Create a new [`RollupNodeClient`] for the given HTTP URL. All requests
    /// carry the given transport-level timeout.
    pub fn new(http_url: Url, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let http = Http::with_client(client, http_url);
        let rpc = RpcClient::new(http, false);

        Ok(Self { provider: RootProvider::new(rpc) })
    }
}

#[async_trait]
impl RollupClient for RollupNodeClient {
    async fn sync_status(&self) -> ClientResult<SyncStatus> {
        Ok(self.provider.raw_request::<_, SyncStatus>("optimism_syncStatus".into(), ()).await?)
    }
}

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tracing::warn;
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    execution::ExecutionClient,
    rollup::RollupNodeClient,
    traits::{EndpointProvider, L2Client, RollupClient},
};

/// An [`EndpointProvider`] that rotates through a fixed list of L2 execution
/// and rollup node endpoints.
///
/// The active index is advanced by [`EndpointProvider::rotate`]; accessors
/// always return the client at the current index, so callers that re-fetch
/// their client per operation transparently pick up a failover.
pub struct RotatingEndpointProvider {
    l2_clients: Vec<Arc<dyn L2Client>>,
    rollup_clients: Vec<Arc<dyn RollupClient>>,
    active: AtomicUsize,
}

impl fmt::Debug for RotatingEndpointProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingEndpointProvider")
            .field("l2_clients", &self.l2_clients.len())
            .field("rollup_clients", &self.rollup_clients.len())
            .field("active", &self.active)
            .finish()
    }
}

impl RotatingEndpointProvider {
    /// Creates a provider over the given endpoint URLs. Both lists must be
    /// non-empty; they do not need to be the same length.
    pub fn new(l2_urls: &[Url], rollup_urls: &[Url], timeout: Duration) -> ClientResult<Self> {
        if l2_urls.is_empty() || rollup_urls.is_empty() {
            return Err(ClientError::Custom(
                "at least one L2 execution and one rollup endpoint are required".to_owned(),
            ));
        }

        let l2_clients = l2_urls
            .iter()
            .map(|url| {
                ExecutionClient::new(url.clone(), timeout)
                    .map(|client| Arc::new(client) as Arc<dyn L2Client>)
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let rollup_clients = rollup_urls
            .iter()
            .map(|url| {
                RollupNodeClient::new(url.clone(), timeout)
                    .map(|client| Arc::new(client) as Arc<dyn RollupClient>)
            })
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(Self { l2_clients, rollup_clients, active: AtomicUsize::new(0) })
    }
}

impl EndpointProvider for RotatingEndpointProvider {
    fn l2_client(&self) -> Arc<dyn L2Client> {
        let active = self.active.load(Ordering::Relaxed);
        Arc::clone(&self.l2_clients[active % self.l2_clients.len()])
    }

    fn rollup_client(&self) -> Arc<dyn RollupClient> {
        let active = self.active.load(Ordering::Relaxed);
        Arc::clone(&self.rollup_clients[active % self.rollup_clients.len()])
    }

    fn rotate(&self) {
        let previous = self.active.fetch_add(1, Ordering::Relaxed);
        warn!(from = previous, to = previous + 1, "Rotating to next L2 endpoint pair");
    }
}

use std::time::Duration;

use alloy_primitives::{B256, Bytes, keccak256};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    traits::AltDaProvider,
};

/// The commitment type byte for keccak256 commitments.
const KECCAK256_COMMITMENT_TYPE: u8 = 0;

/// A commitment to data stored with an alt-DA provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    /// A plain keccak256 hash of the stored data.
    Keccak256(B256),
}

impl Commitment {
    /// Computes the keccak256 commitment of the given data.
    pub fn keccak256(data: &[u8]) -> Self {
        Self::Keccak256(keccak256(data))
    }

    /// The canonical byte encoding: the commitment type byte followed by the
    /// commitment payload. This is the exact payload posted on L1.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Keccak256(hash) => {
                let mut out = Vec::with_capacity(1 + hash.len());
                out.push(KECCAK256_COMMITMENT_TYPE);
                out.extend_from_slice(hash.as_slice());
                out.into()
            }
        }
    }

    /// Parses a commitment from its canonical encoding.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes.split_first()? {
            (&KECCAK256_COMMITMENT_TYPE, payload) => {
                Some(Self::Keccak256(B256::try_from(payload).ok()?))
            }
            _ => None,
        }
    }
}

/// An [`AltDaProvider`] backed by an HTTP DA server.
///
/// The server stores raw bytes under their commitment; only the commitment is
/// posted on L1, and the derivation pipeline reads the data back by commitment.
#[derive(Debug, Clone)]
pub struct HttpAltDaClient {
    client: reqwest::Client,
    server_url: Url,
}

impl HttpAltDaClient {
    /// Creates a new client for the given DA server URL.
    pub fn new(server_url: Url, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, server_url })
    }
}

#[async_trait]
impl AltDaProvider for HttpAltDaClient {
    async fn set_input(&self, data: Bytes) -> ClientResult<Commitment> {
        let url = self
            .server_url
            .join("put/")
            .map_err(|e| ClientError::Custom(format!("invalid DA server URL: {e}")))?;

        let response =
            self.client.post(url).body(data.to_vec()).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        let commitment = Commitment::decode(&body)
            .ok_or(ClientError::EmptyResponse("malformed commitment from DA server"))?;
        debug!(size = data.len(), ?commitment, "Stored input with DA server");

        Ok(commitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_encoding_roundtrips() {
        let commitment = Commitment::keccak256(b"some channel frame");
        let encoded = commitment.encode();

        assert_eq!(encoded.len(), 33);
        assert_eq!(encoded[0], KECCAK256_COMMITMENT_TYPE);
        assert_eq!(Commitment::decode(&encoded), Some(commitment));
    }

    #[test]
    fn unknown_commitment_type_is_rejected() {
        let mut encoded = Commitment::keccak256(b"data").encode().to_vec();
        encoded[0] = 0x7f;
        assert_eq!(Commitment::decode(&encoded), None);
    }
}

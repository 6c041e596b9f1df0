use alloy::transports::{RpcError, TransportErrorKind};
use alloy_primitives::B256;
use thiserror::Error;

/// The result type of all client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// An error that can occur while talking to an external endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("KZG error: {0}")]
    Kzg(#[from] c_kzg::Error),
    #[error("empty response: {0}")]
    EmptyResponse(&'static str),
    #[error("transaction {0} did not land within the receipt timeout")]
    ReceiptTimeout(B256),
    #[error("transaction manager is closed")]
    Closed,
    #[error("{0}")]
    Custom(String),
}

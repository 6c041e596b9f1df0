#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Various extensible API client connections

/// Client errors shared across connections
pub mod error;
pub use error::{ClientError, ClientResult};

/// The client contracts consumed by the driver
pub mod traits;
pub use traits::{AltDaProvider, EndpointProvider, L1Client, L2Client, RollupClient, TxManager};

/// Execution layer client connection
pub mod execution;

/// Rollup node client connection
pub mod rollup;

/// Endpoint failover rotation
pub mod endpoints;

/// L1 transaction manager
pub mod txmgr;
pub use txmgr::TxCandidate;

/// Alt-DA server client connection
pub mod altda;
pub use altda::Commitment;

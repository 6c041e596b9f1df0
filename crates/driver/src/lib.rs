#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! The batchd driver: tails the sequencer's unsafe chain, packages new L2
//! blocks into channel frames, and submits them to the L1 batch inbox.

mod driver;
pub use driver::{BatchSubmitter, DriverSetup};

mod channel;
pub use channel::{ChannelId, ChannelManager, ChannelSettings, Frame, FrameId, TxData, TxId};

mod queue;
pub use queue::{TxQueue, TxReceipt};

mod config;
pub use config::BatcherConfig;

mod error;
pub use error::{BatcherError, ChannelError};

mod metrics;

use alloy_primitives::Address;
use clap::Parser;
use url::Url;

/// L1-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct L1Opts {
    /// The URL of the L1 execution client HTTP connection
    #[clap(long = "l1.el-url", env = "BATCHD_L1_EXECUTION_URL", id = "l1-el-url")]
    pub el_url: Url,
}

/// L2-related configuration options.
///
/// More than one endpoint can be given for both the execution client and the
/// rollup node; the driver rotates to the next pair when the active one fails.
#[derive(Debug, Clone, Parser)]
pub struct L2Opts {
    /// The URLs of the L2 execution client HTTP connections (comma-separated)
    #[clap(
        long = "l2.el-urls",
        env = "BATCHD_L2_EXECUTION_URLS",
        id = "l2-el-urls",
        value_delimiter = ','
    )]
    pub el_urls: Vec<Url>,
    /// The URLs of the L2 rollup node HTTP connections (comma-separated)
    #[clap(
        long = "l2.rollup-urls",
        env = "BATCHD_L2_ROLLUP_URLS",
        id = "l2-rollup-urls",
        value_delimiter = ','
    )]
    pub rollup_urls: Vec<Url>,
}

/// The immutable rollup configuration the driver submits against.
#[derive(Debug, Clone, Parser)]
pub struct RollupOpts {
    /// The L1 address that receives batch submission transactions
    #[clap(long = "rollup.batch-inbox", env = "BATCHD_BATCH_INBOX_ADDRESS")]
    pub batch_inbox_address: Address,
    /// The chain id of the L1 chain
    #[clap(long = "rollup.l1-chain-id", env = "BATCHD_L1_CHAIN_ID")]
    pub l1_chain_id: u64,
}

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;

/// Operator-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct OperatorOpts {
    /// The private key that signs batch submission transactions
    #[clap(long = "operator.private-key", env = "BATCHD_OPERATOR_PRIVATE_KEY")]
    pub private_key: PrivateKeySigner,
}

use clap::Parser;
use url::Url;

/// Alternative data-availability configuration options.
///
/// When enabled, calldata batch transactions carry a DA commitment instead of
/// the raw frame bytes, which are stored with the DA server out of band.
#[derive(Debug, Clone, Parser)]
pub struct AltDaOpts {
    /// Whether to route calldata batches through the alt-DA server
    #[clap(long = "altda.enabled", env = "BATCHD_ALTDA_ENABLED", default_value_t = false)]
    pub enabled: bool,
    /// The URL of the alt-DA server HTTP connection
    #[clap(long = "altda.server-url", env = "BATCHD_ALTDA_SERVER_URL", required_if_eq("enabled", "true"))]
    pub server_url: Option<Url>,
}

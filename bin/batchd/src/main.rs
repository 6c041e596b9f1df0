#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Batch submission driver for OP Stack rollups.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use batchd_clients::{
    altda::HttpAltDaClient, endpoints::RotatingEndpointProvider, execution::ExecutionClient,
    traits::AltDaProvider, txmgr::SimpleTxManager,
};
use batchd_config::Opts;
use batchd_driver::{BatchSubmitter, BatcherConfig, DriverSetup};
use batchd_primitives::shutdown::ShutdownSignal;

mod allocator;
use allocator::{Allocator, new_allocator};

#[global_allocator]
static ALLOC: Allocator = new_allocator();

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        // Try from custom env file, and abort if it fails
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try from default .env file, and ignore if it fails. It might
        // be that the user isn't using it.
        dotenvy::dotenv().ok();
    }

    let opts = Opts::parse();

    let tracer_provider = opts.telemetry.setup(&opts.instance_name)?;

    info!("📦 batchd starting...");

    let cfg = BatcherConfig::new(opts.clone());
    let network_timeout = cfg.network_timeout();

    let l1_client = Arc::new(ExecutionClient::new(opts.l1.el_url.clone(), network_timeout)?);
    let endpoints = Arc::new(RotatingEndpointProvider::new(
        &opts.l2.el_urls,
        &opts.l2.rollup_urls,
        network_timeout,
    )?);
    let txmgr = Arc::new(SimpleTxManager::new(
        opts.l1.el_url.clone(),
        opts.operator.private_key.clone(),
        opts.rollup.l1_chain_id,
        cfg.receipt_poll_interval(),
        cfg.receipt_timeout(),
    ));
    let altda = match (opts.altda.enabled, &opts.altda.server_url) {
        (true, Some(url)) => {
            let client = HttpAltDaClient::new(url.clone(), network_timeout)?;
            Some(Arc::new(client) as Arc<dyn AltDaProvider>)
        }
        _ => None,
    };

    let submitter = Arc::new(BatchSubmitter::new(DriverSetup {
        cfg,
        l1_client: l1_client as _,
        endpoints: endpoints as _,
        txmgr: txmgr as _,
        altda,
    }));
    submitter.start().await?;

    ShutdownSignal::new().wait().await;
    info!("👋 batchd shutting down...");

    // A second signal while draining force-kills outstanding submissions.
    let stop_ctx = CancellationToken::new();
    tokio::spawn({
        let stop_ctx = stop_ctx.clone();
        async move {
            ShutdownSignal::new().wait().await;
            stop_ctx.cancel();
        }
    });

    submitter.stop_if_running(stop_ctx).await?;
    tracer_provider.shutdown();

    Ok(())
}

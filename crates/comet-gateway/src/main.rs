//! Comet gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p comet-gateway
//! ```
//!
//! Configuration is loaded from `config/comet.yaml` (or `COMET_CONFIG`) and
//! `COMET_*` environment variables.

use anyhow::Context;
use comet_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use comet_gateway::auth::StaticAuthorizer;
use comet_gateway::{shutdown_signal, Gateway};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "gateway failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::from(&config.log)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        node = config.node.id,
        zones = config.zone.zone_num,
        "Starting comet gateway"
    );

    let authorizer = Arc::new(StaticAuthorizer::from_config(&config));
    let gateway = Gateway::bind(&config, authorizer)
        .await
        .context("binding listeners")?;

    gateway.run_until(shutdown_signal()).await;
    info!("Shutdown complete");
    Ok(())
}

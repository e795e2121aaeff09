//! # shard_app
//!
//! Runs one shard of the game world.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line and load the [`ShardConfig`] (`--config`, else
//!    `SHARD_CONFIG`, else built-in defaults).
//! 2. Build the sector and the command service over the wall clock.
//! 3. Start the combat timer.
//! 4. Run until Ctrl-C, then stop every timer and pending completion.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shard_net::HttpShardClient;
use shard_sim::{ShardConfig, ShardService, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shard_app", about = "Persistent space strategy shard")]
struct Args {
    /// Path to a JSON shard configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the shard name from the configuration
    #[arg(short, long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shard_app=info,shard_sim=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ShardConfig::load(args.config.as_deref()).context("loading shard configuration")?;
    if let Some(name) = args.name {
        config = config.with_name(name);
    }
    for (name, endpoint) in config.wormholes.iter() {
        info!(shard = name, system = %endpoint.system, uri = %endpoint.base_uri, "wormhole configured");
    }

    let service = ShardService::new(
        &config,
        Arc::new(SystemClock::new()),
        Arc::new(HttpShardClient::new()),
    );
    if !service.start_combat() {
        warn!("no weapon can fire, combat disabled");
    }
    info!(shard = %service.name(), "shard running");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    service.shutdown();
    Ok(())
}

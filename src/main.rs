//! Gateway binary: load config, wire collaborators, serve.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use miner_gateway::config::{load_config, GatewayConfig};
use miner_gateway::http::GatewayServer;
use miner_gateway::miner::{spawn_best_deadline_scorer, MinerState, MiningInfo, SubmissionPipeline};
use miner_gateway::observability::{logging, metrics};
use miner_gateway::wallet::spawn_block_watcher;

/// Mining gateway for downstream proof-of-capacity miners.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Wallet poll cadence for new blocks.
const BLOCK_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        pool = config.upstreams.pool.is_some(),
        wallet = config.upstreams.wallet.is_some(),
        "miner-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Could not parse metrics address"
            ),
        }
    }

    let miner = MinerState::new(MiningInfo::from(&config.mining));
    let (pipeline, jobs) = SubmissionPipeline::channel();
    spawn_best_deadline_scorer(jobs, miner.clone());

    let server = GatewayServer::new(&config, miner.clone(), pipeline)?;

    let state = server.state();
    spawn_block_watcher(
        state.wallet.clone(),
        miner,
        state.accounts.clone(),
        state.connections.clone(),
        BLOCK_POLL_INTERVAL,
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

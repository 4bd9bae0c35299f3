//! triadd: the Triad scoring daemon.
//!
//! Serves the active model over HTTP: health and readiness probes, model
//! metadata and hot reload, and `/predict`.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use triad::server::{self, Config};

/// Triad daemon: deterministic risk scoring service.
#[derive(Parser)]
#[command(name = "triadd")]
#[command(version = triad::long_version())]
#[command(about = "Triad risk scoring daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    server::logging::init_tracing(config.logging.json)?;

    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| triad::TriadError::Configuration(format!("Invalid address: {e}")))?;

    let state = server::build_state(&config).await?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = %triad::version_string(),
        %addr,
        model_loaded = state.registry.is_loaded(),
        "triadd starting"
    );

    server::serve(listener, state, server::shutdown_signal()).await?;

    info!("triadd stopped");
    Ok(())
}

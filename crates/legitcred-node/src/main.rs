//! LegitCred Node: entry point.
//!
//! Starts the credential indexing node with configuration from a TOML file or
//! defaults.

mod api;
mod commands;
mod config;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::LegitcredConfig;
use node::LegitcredNode;

/// LegitCred Node
#[derive(Parser, Debug)]
#[command(name = "legitcred-node", version, about = "LegitCred credential indexing node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "legitcred.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the signer JSON-RPC endpoint (enables issuance).
    #[arg(long)]
    signer_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(config: &LegitcredConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = LegitcredConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = LegitcredConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(signer_url) = args.signer_url {
        config.signer.rpc_url = Some(signer_url);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config);

    tracing::info!("LegitCred Node v{}", env!("CARGO_PKG_VERSION"));

    // Create and start the node
    let mut node = LegitcredNode::new(config)?;
    node.start().await?;

    // Set up graceful shutdown on SIGINT
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node event loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("LegitCred node exited cleanly");
    Ok(())
}

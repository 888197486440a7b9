//! LegitCred CLI: command-line interface for a LegitCred node.
//!
//! Subcommands: init, status, list, show, orgs, sync, mint.

mod commands;

use clap::{Parser, Subcommand};

/// LegitCred: on-chain credential index and issuance.
#[derive(Parser, Debug)]
#[command(name = "legitcred", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default node configuration.
    Init(commands::init::InitArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// List credentials visible to a holder or an admin.
    List(commands::list::ListArgs),
    /// Show one credential by token id.
    Show(commands::show::ShowArgs),
    /// List issuing organizations.
    Orgs(commands::orgs::OrgsArgs),
    /// Trigger a full synchronization pass.
    Sync(commands::sync::SyncArgs),
    /// Mint a credential to a recipient.
    Mint(commands::mint::MintArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Status(args) => commands::status::run(args).await,
        Commands::List(args) => commands::list::run(args).await,
        Commands::Show(args) => commands::show::run(args).await,
        Commands::Orgs(args) => commands::orgs::run(args).await,
        Commands::Sync(args) => commands::sync::run(args).await,
        Commands::Mint(args) => commands::mint::run(args).await,
    }
}

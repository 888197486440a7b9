//! `legitcred status`: query the status of a running node.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct Session {
    status: String,
    error: Option<String>,
    pass: u64,
    skipped: usize,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    contract: String,
    chain_id: String,
    session: Session,
    credential_count: usize,
    organization_count: usize,
    issuance_enabled: bool,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/status", args.endpoint);

    match reqwest::get(&url).await {
        Ok(r) if r.status().is_success() => {
            let status: StatusResponse = r.json().await?;
            println!("Node Status:");
            println!("  Version:        {}", status.version);
            println!("  Uptime:         {}s", status.uptime_secs);
            println!("  Contract:       {}", status.contract);
            println!("  Chain:          {}", status.chain_id);
            println!("  Issuance:       {}", if status.issuance_enabled { "enabled" } else { "disabled" });
            println!("  Sync:           {} (pass {})", status.session.status, status.session.pass);
            if status.session.skipped > 0 {
                println!("  Skipped tokens: {}", status.session.skipped);
            }
            if let Some(error) = status.session.error {
                println!("  Last error:     {}", error);
            }
            println!("  Credentials:    {}", status.credential_count);
            println!("  Organizations:  {}", status.organization_count);
        }
        Ok(r) => return Err(super::fail("status", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

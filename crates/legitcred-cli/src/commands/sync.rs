//! `legitcred sync`: trigger a full synchronization pass.

use clap::Args;
use serde::Deserialize;

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct Skipped {
    token_id: u64,
    reason: String,
}

#[derive(Deserialize)]
struct SyncSummary {
    total_supply: u64,
    records: usize,
    organizations: usize,
    skipped: Vec<Skipped>,
}

pub async fn run(args: &SyncArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/sync", args.endpoint);

    let client = reqwest::Client::new();
    match client.post(&url).send().await {
        Ok(r) if r.status().is_success() => {
            let summary: SyncSummary = r.json().await?;
            println!("Sync complete:");
            println!("  Total supply:   {}", summary.total_supply);
            println!("  Indexed:        {}", summary.records);
            println!("  Organizations:  {}", summary.organizations);
            if !summary.skipped.is_empty() {
                println!("  Skipped:");
                for skipped in &summary.skipped {
                    println!("    #{}: {}", skipped.token_id, skipped.reason);
                }
            }
        }
        Ok(r) => return Err(super::fail("sync", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

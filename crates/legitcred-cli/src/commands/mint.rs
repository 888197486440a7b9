//! `legitcred mint`: mint a credential to a recipient.

use clap::Args;
use serde::{Deserialize, Serialize};

use super::DEFAULT_ENDPOINT;

#[derive(Args, Debug)]
pub struct MintArgs {
    /// Recipient ledger address.
    #[arg(short, long)]
    pub recipient: String,

    /// Content id of the metadata document.
    #[arg(short, long)]
    pub metadata: String,

    /// Content id of the rendered certificate.
    #[arg(short, long)]
    pub artifact: String,

    /// Add the minted credential to the index right away.
    #[arg(long)]
    pub index: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Serialize)]
struct MintRequest<'a> {
    recipient: &'a str,
    metadata_cid: &'a str,
    artifact_cid: &'a str,
    index: bool,
}

#[derive(Deserialize)]
struct MintResponse {
    token_id: u64,
    tx_hash: String,
    recipient: String,
    indexed: bool,
    index_error: Option<String>,
}

pub async fn run(args: &MintArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/credentials/mint", args.endpoint);
    let body = MintRequest {
        recipient: &args.recipient,
        metadata_cid: &args.metadata,
        artifact_cid: &args.artifact,
        index: args.index,
    };

    let client = reqwest::Client::new();
    match client.post(&url).json(&body).send().await {
        Ok(r) if r.status().is_success() => {
            let data: MintResponse = r.json().await?;
            println!("Credential minted!");
            println!("  Token ID:   {}", data.token_id);
            println!("  Recipient:  {}", data.recipient);
            println!("  Tx:         {}", data.tx_hash);
            if data.indexed {
                println!("  Indexed:    yes");
            } else if let Some(err) = data.index_error {
                println!("  Indexed:    no ({})", err);
            }
        }
        Ok(r) => return Err(super::fail("mint", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

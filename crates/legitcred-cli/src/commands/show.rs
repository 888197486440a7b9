//! `legitcred show`: show one credential by token id.

use clap::Args;

use super::{Credential, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Token id of the credential.
    pub token_id: u64,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &ShowArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/credentials/{}", args.endpoint, args.token_id);

    match reqwest::get(&url).await {
        Ok(r) if r.status().is_success() => {
            let credential: Credential = r.json().await?;
            println!("Credential #{}", credential.token_id);
            println!("  Owner:         {}", credential.owner);
            println!(
                "  Organization:  {}",
                credential.organization.as_deref().unwrap_or("-")
            );
            println!("  Metadata CID:  {}", credential.content_id);
            println!("  Artifact CID:  {}", credential.artifact_id);
            println!("  Metadata:");
            println!("{}", serde_json::to_string_pretty(&credential.metadata)?);
        }
        Ok(r) if r.status() == reqwest::StatusCode::NOT_FOUND => {
            anyhow::bail!("credential {} is not in the index", args.token_id);
        }
        Ok(r) => return Err(super::fail("lookup", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

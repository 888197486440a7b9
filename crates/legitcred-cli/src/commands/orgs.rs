//! `legitcred orgs`: list issuing organizations.

use clap::Args;
use serde::Deserialize;

use super::{CredentialsResponse, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct OrgsArgs {
    /// Show the credentials of this organization instead.
    #[arg(short, long)]
    pub organization: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct OrganizationsResponse {
    organizations: Vec<String>,
    count: usize,
}

pub async fn run(args: &OrgsArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    if let Some(org) = &args.organization {
        let url = format!("{}/api/v1/organizations/{}/credentials", args.endpoint, org);
        match client.get(&url).send().await {
            Ok(r) if r.status().is_success() => {
                let data: CredentialsResponse = r.json().await?;
                for credential in &data.credentials {
                    println!("{}", super::summary_line(credential));
                }
                println!("{} credential(s) issued by {}", data.count, org);
            }
            Ok(r) => return Err(super::fail("listing", r).await),
            Err(e) => super::unreachable(&args.endpoint, &e),
        }
        return Ok(());
    }

    let url = format!("{}/api/v1/organizations", args.endpoint);
    match client.get(&url).send().await {
        Ok(r) if r.status().is_success() => {
            let data: OrganizationsResponse = r.json().await?;
            for org in &data.organizations {
                println!("  {}", org);
            }
            println!("{} organization(s)", data.count);
        }
        Ok(r) => return Err(super::fail("listing", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

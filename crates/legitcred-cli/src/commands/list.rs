//! `legitcred list`: list credentials visible to a holder or an admin.

use clap::Args;

use super::{CredentialsResponse, DEFAULT_ENDPOINT};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Holder address whose credentials to list.
    #[arg(short, long)]
    pub owner: Option<String>,

    /// List every credential (admin view).
    #[arg(long, conflicts_with = "owner")]
    pub admin: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

pub async fn run(args: &ListArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/credentials", args.endpoint);
    let mut query: Vec<(&str, &str)> = Vec::new();
    if args.admin {
        query.push(("role", "admin"));
    }
    if let Some(owner) = &args.owner {
        query.push(("owner", owner.as_str()));
    }

    let client = reqwest::Client::new();
    match client.get(&url).query(&query).send().await {
        Ok(r) if r.status().is_success() => {
            let data: CredentialsResponse = r.json().await?;
            if data.count == 0 {
                println!("No credentials found.");
            } else {
                for credential in &data.credentials {
                    println!("{}", super::summary_line(credential));
                }
                println!();
                println!("{} credential(s)", data.count);
            }
        }
        Ok(r) => return Err(super::fail("listing", r).await),
        Err(e) => super::unreachable(&args.endpoint, &e),
    }

    Ok(())
}

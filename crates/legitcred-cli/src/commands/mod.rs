pub mod init;
pub mod list;
pub mod mint;
pub mod orgs;
pub mod show;
pub mod status;
pub mod sync;

use serde::Deserialize;

/// Default API endpoint of a local node.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8645";

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A credential as returned by the node.
#[derive(Deserialize)]
pub struct Credential {
    pub token_id: u64,
    pub owner: String,
    pub content_id: String,
    pub artifact_id: String,
    pub metadata: serde_json::Value,
    pub organization: Option<String>,
}

#[derive(Deserialize)]
pub struct CredentialsResponse {
    pub credentials: Vec<Credential>,
    pub count: usize,
}

/// One-line summary of a credential for listings.
pub fn summary_line(credential: &Credential) -> String {
    let name = credential
        .metadata
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("(unnamed)");
    format!(
        "#{:<5} {:<32} {:<24} {}",
        credential.token_id,
        name,
        credential.organization.as_deref().unwrap_or("-"),
        credential.owner
    )
}

/// Turn a non-success response into an error carrying the node's message.
pub async fn fail(action: &str, resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => anyhow::anyhow!("{} failed (HTTP {}): {}", action, status, err.error),
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", action, status),
    }
}

pub fn unreachable(endpoint: &str, err: &reqwest::Error) {
    println!("Could not reach node at {}", endpoint);
    println!("  Error: {}", err);
    println!();
    println!("Is the node running? Start it with: legitcred-node");
}

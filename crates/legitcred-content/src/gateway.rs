use std::time::Duration;

use async_trait::async_trait;

use legitcred_core::ContentId;

use crate::error::ResolutionError;
use crate::traits::ContentResolver;

/// Settings for [`GatewayResolver`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL, e.g. `https://ipfs.io`.
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Resolves documents through an HTTP gateway at `{base}/ipfs/{cid}`.
pub struct GatewayResolver {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayResolver {
    pub fn new(config: GatewayConfig) -> Result<Self, ResolutionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResolutionError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, content_id: &ContentId) -> String {
        format!("{}/ipfs/{}", self.base_url, content_id)
    }
}

#[async_trait]
impl ContentResolver for GatewayResolver {
    async fn resolve(&self, content_id: &ContentId) -> Result<serde_json::Value, ResolutionError> {
        let url = self.url_for(content_id);
        tracing::trace!(url = %url, "resolving content");

        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ResolutionError::Timeout(content_id.to_string())
            } else {
                ResolutionError::Unavailable(format!("{}: {}", content_id, e))
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolutionError::NotFound(content_id.to_string()));
        }
        if !status.is_success() {
            return Err(ResolutionError::Status {
                content_id: content_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ResolutionError::Timeout(content_id.to_string())
            } else {
                ResolutionError::Unavailable(format!("{}: {}", content_id, e))
            }
        })?;

        let document: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| ResolutionError::Malformed {
                content_id: content_id.to_string(),
                reason: e.to_string(),
            })?;
        if !document.is_object() {
            return Err(ResolutionError::Malformed {
                content_id: content_id.to_string(),
                reason: "document is not a JSON object".into(),
            });
        }
        Ok(document)
    }
}

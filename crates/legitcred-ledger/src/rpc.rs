//! Thin JSON-RPC 2.0 transport over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{LedgerError, SignerError};

/// Why a JSON-RPC call did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcFailure {
    /// The request never got a usable HTTP answer (refused, timed out, 5xx).
    #[error("transport: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// The answer was not a JSON-RPC response.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<RpcFailure> for LedgerError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Transport(msg) => LedgerError::Connectivity(msg),
            RpcFailure::Rpc { code, message, .. } => LedgerError::Rpc { code, message },
            RpcFailure::Malformed(msg) => LedgerError::Decode(msg),
        }
    }
}

impl From<RpcFailure> for SignerError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Transport(msg) => SignerError::Transport(msg),
            RpcFailure::Rpc { code, message, .. } => SignerError::from_rpc(code, message),
            RpcFailure::Malformed(msg) => SignerError::Malformed(msg),
        }
    }
}

/// A JSON-RPC endpoint.
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcFailure::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one call and return its `result` (which may be `null`).
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        tracing::trace!(method, id, url = %self.url, "json-rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcFailure::Transport(format!("{}: request timed out", method))
                } else {
                    RpcFailure::Transport(format!("{}: {}", method, e))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RpcFailure::Transport(format!("{}: failed to read body: {}", method, e)))?;

        let json: serde_json::Value = match serde_json::from_str(&text) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(RpcFailure::Transport(format!("{}: HTTP {}", method, status)))
            }
            Err(e) => {
                return Err(RpcFailure::Malformed(format!(
                    "{}: invalid JSON response: {}",
                    method, e
                )))
            }
        };

        // Some gateways return JSON-RPC errors with a non-2xx status.
        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error")
                .to_string();
            let data = error.get("data").map(|d| match d.as_str() {
                Some(s) => s.to_string(),
                None => d.to_string(),
            });
            return Err(RpcFailure::Rpc {
                code,
                message,
                data,
            });
        }

        if !status.is_success() {
            return Err(RpcFailure::Transport(format!("{}: HTTP {}", method, status)));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcFailure::Malformed(format!("{}: response has no result", method)))
    }
}

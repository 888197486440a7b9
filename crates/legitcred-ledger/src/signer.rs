use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SignerError;
use crate::rpc::JsonRpcClient;
use crate::traits::Signer;

/// A signer reached over JSON-RPC, typically a node or signing proxy that
/// holds unlocked accounts and speaks the wallet methods.
pub struct RpcSigner {
    rpc: JsonRpcClient,
}

impl RpcSigner {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SignerError> {
        let rpc = JsonRpcClient::new(url, timeout)?;
        tracing::info!(url = %rpc.url(), "rpc signer configured");
        Ok(Self { rpc })
    }
}

#[async_trait]
impl Signer for RpcSigner {
    async fn request(&self, method: &str, params: Value) -> Result<Value, SignerError> {
        self.rpc.call(method, params).await.map_err(SignerError::from)
    }
}

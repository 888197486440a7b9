//! JSON-RPC implementation of [`LedgerClient`].
//!
//! Reads go through `eth_call` against the credential contract. Writes are
//! never signed here: the mint transaction is handed to a [`Signer`] and the
//! client only polls for the receipt afterwards.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use legitcred_core::{Address, MetadataPointer, TokenId};

use crate::abi;
use crate::error::LedgerError;
use crate::rpc::{JsonRpcClient, RpcFailure};
use crate::traits::{LedgerClient, Signer};
use crate::types::{LogEntry, PendingTx, TransactionRequest, TxHash, TxReceipt};

/// Consecutive transport failures tolerated while polling for a receipt.
const MAX_POLL_FAILURES: u32 = 5;

/// JSON-RPC error code used by execution clients for reverted calls.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Connection settings for [`RpcLedgerClient`].
#[derive(Debug, Clone)]
pub struct RpcLedgerConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub request_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl RpcLedgerConfig {
    pub fn new(rpc_url: impl Into<String>, contract_address: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Ledger client backed by an Ethereum JSON-RPC endpoint.
pub struct RpcLedgerClient {
    rpc: JsonRpcClient,
    config: RpcLedgerConfig,
}

impl RpcLedgerClient {
    pub fn new(config: RpcLedgerConfig) -> Result<Self, LedgerError> {
        let rpc = JsonRpcClient::new(config.rpc_url.clone(), config.request_timeout)?;
        tracing::info!(
            rpc_url = %config.rpc_url,
            contract = %config.contract_address,
            "ledger client configured"
        );
        Ok(Self { rpc, config })
    }

    /// Read-only contract call. Reverts and empty return data mean the
    /// requested item does not exist.
    async fn call_contract(&self, data: Vec<u8>, what: &str) -> Result<Vec<u8>, LedgerError> {
        let params = serde_json::json!([
            {
                "to": self.config.contract_address.to_lowercase_hex(),
                "data": abi::to_hex(&data),
            },
            "latest"
        ]);

        let result = self.rpc.call("eth_call", params).await.map_err(|failure| match failure {
            RpcFailure::Rpc { code, message, .. }
                if code == EXECUTION_REVERTED_CODE || message.to_lowercase().contains("revert") =>
            {
                LedgerError::NotFound(format!("{} reverted: {}", what, message))
            }
            other => other.into(),
        })?;

        let hex = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode(format!("{}: eth_call returned {}", what, result)))?;
        let bytes = abi::from_hex(hex)?;
        if bytes.is_empty() {
            return Err(LedgerError::NotFound(format!("{}: empty return data", what)));
        }
        Ok(bytes)
    }

    async fn fetch_receipt(&self, hash: &TxHash) -> Result<Option<TxReceipt>, LedgerError> {
        let value = self
            .rpc
            .call("eth_getTransactionReceipt", serde_json::json!([hash.as_str()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("invalid receipt: {}", e)))?;
        raw.into_receipt().map(Some)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn total_supply(&self) -> Result<u64, LedgerError> {
        let data = self
            .call_contract(abi::encode_call(abi::TOTAL_SUPPLY, &[]), "totalSupply")
            .await?;
        abi::decode_u64(&data)
    }

    async fn metadata_pointer(&self, token_id: TokenId) -> Result<String, LedgerError> {
        let what = format!("getMetaData({})", token_id);
        let data = self
            .call_contract(abi::encode_token_call(abi::GET_META_DATA, token_id), &what)
            .await?;
        abi::decode_string(&data)
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError> {
        let what = format!("ownerOf({})", token_id);
        let data = self
            .call_contract(abi::encode_token_call(abi::OWNER_OF, token_id), &what)
            .await?;
        abi::decode_address(&data)
    }

    async fn submit_mint(
        &self,
        signer: &dyn Signer,
        recipient: &Address,
        pointer: &MetadataPointer,
    ) -> Result<PendingTx, LedgerError> {
        let from = signer.address().await?;
        let tx = TransactionRequest {
            from,
            to: self.config.contract_address,
            data: abi::encode_mint(recipient, &pointer.encode()),
        };
        let hash = signer.send_transaction(&tx).await?;

        tracing::info!(tx = %hash, from = %from, recipient = %recipient, "mint submitted");

        Ok(PendingTx {
            hash,
            from,
            submitted_at: Utc::now(),
        })
    }

    /// Poll for the receipt every `poll_interval`.
    ///
    /// This is the only place the client retries a connectivity error: the
    /// mint is already on its way, so up to `MAX_POLL_FAILURES` consecutive
    /// transport failures are absorbed before the last one is returned.
    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError> {
        let mut failures = 0u32;
        loop {
            match self.fetch_receipt(&pending.hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.success {
                        return Err(LedgerError::Reverted(pending.hash.to_string()));
                    }
                    tracing::info!(
                        tx = %pending.hash,
                        block = receipt.block_number,
                        "transaction confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(None) => {
                    failures = 0;
                    tracing::debug!(tx = %pending.hash, "receipt not yet available");
                }
                Err(e) if e.is_retryable() && failures < MAX_POLL_FAILURES => {
                    failures += 1;
                    tracing::warn!(tx = %pending.hash, error = %e, attempt = failures, "receipt poll failed");
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn contract_address(&self) -> Address {
        self.config.contract_address
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<TxReceipt, LedgerError> {
        let hash = TxHash::parse(&self.transaction_hash).ok_or_else(|| {
            LedgerError::Decode(format!("invalid transaction hash {}", self.transaction_hash))
        })?;
        let block_number = match self.block_number.as_deref() {
            Some(raw) => abi::parse_quantity(raw)?,
            None => 0,
        };
        // pre-Byzantium receipts carry no status; treat them as successful
        let success = match self.status.as_deref() {
            Some(raw) => abi::parse_quantity(raw)? == 1,
            None => true,
        };
        let logs = self
            .logs
            .into_iter()
            .map(RawLog::into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TxReceipt {
            hash,
            block_number,
            success,
            logs,
        })
    }
}

impl RawLog {
    fn into_entry(self) -> Result<LogEntry, LedgerError> {
        let address = Address::parse(&self.address)
            .map_err(|e| LedgerError::Decode(format!("invalid log address: {}", e)))?;
        let topics = self
            .topics
            .iter()
            .map(|t| abi::parse_word(t))
            .collect::<Result<Vec<_>, _>>()?;
        let data = if self.data.is_empty() {
            Vec::new()
        } else {
            abi::from_hex(&self.data)?
        };
        Ok(LogEntry {
            address,
            topics,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_receipt_parsing() {
        let json = serde_json::json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x1",
            "logs": [{
                "address": format!("0x{}", "c0".repeat(20)),
                "topics": [
                    abi::to_hex(&abi::event_topic(abi::TRANSFER_EVENT)),
                    abi::to_hex(&abi::encode_address(&Address::ZERO)),
                    abi::to_hex(&abi::encode_address(&Address::from_bytes([1u8; 20]))),
                    abi::to_hex(&abi::encode_u64(6)),
                ],
                "data": "0x"
            }]
        });
        let raw: RawReceipt = serde_json::from_value(json).unwrap();
        let receipt = raw.into_receipt().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, 16);
        let contract = Address::from_bytes([0xc0; 20]);
        assert_eq!(receipt.minted_token_id(&contract).unwrap().value(), 6);
    }

    #[test]
    fn test_failed_status() {
        let json = serde_json::json!({
            "transactionHash": format!("0x{}", "22".repeat(32)),
            "blockNumber": "0x1",
            "status": "0x0",
            "logs": []
        });
        let raw: RawReceipt = serde_json::from_value(json).unwrap();
        assert!(!raw.into_receipt().unwrap().success);
    }

    #[test]
    fn test_config_defaults() {
        let config = RpcLedgerConfig::new("http://localhost:8545", Address::ZERO);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }
}

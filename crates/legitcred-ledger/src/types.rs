use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use legitcred_core::{Address, TokenId};

use crate::abi;

/// Hash of a submitted transaction (`0x` + 64 hex, lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix("0x")?;
        if body.len() != 64 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(abi::to_hex(&bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An unsigned contract call handed to a signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    /// JSON-RPC form for `eth_sendTransaction`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": self.from.to_lowercase_hex(),
            "to": self.to.to_lowercase_hex(),
            "data": abi::to_hex(&self.data),
        })
    }
}

/// A transaction accepted by the signer but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub from: Address,
    pub submitted_at: DateTime<Utc>,
}

/// One log emitted by a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// Decoded ERC-721 `Transfer` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
}

impl TransferEvent {
    /// Transfers out of the zero address are mints.
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub logs: Vec<LogEntry>,
}

impl TxReceipt {
    /// All transfer events emitted by `contract`, in log order.
    pub fn transfer_events(&self, contract: &Address) -> Vec<TransferEvent> {
        self.logs
            .iter()
            .filter(|log| &log.address == contract)
            .filter_map(abi::decode_transfer)
            .collect()
    }

    /// Token id assigned by the first mint transfer emitted by `contract`.
    pub fn minted_token_id(&self, contract: &Address) -> Option<TokenId> {
        self.transfer_events(contract)
            .into_iter()
            .find(TransferEvent::is_mint)
            .map(|event| event.token_id)
    }
}

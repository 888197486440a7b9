use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Native currency of a ledger network, as registered with a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Identity of the ledger network credentials are issued on.
///
/// Used both to check which network a signer is on and to register the
/// network with a signer that does not know it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Hex chain id, e.g. `0xaa36a7`.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    /// Display name.
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    /// Public RPC endpoints for the network.
    #[serde(default = "default_rpc_urls")]
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_block_explorer_urls")]
    pub block_explorer_urls: Vec<String>,
    // tables serialize after plain values in TOML
    #[serde(default = "default_native_currency")]
    pub native_currency: NativeCurrency,
}

fn default_chain_id() -> String {
    "0xaa36a7".into()
}
fn default_chain_name() -> String {
    "Sepolia Test Network".into()
}
fn default_rpc_urls() -> Vec<String> {
    vec!["https://rpc.sepolia.org".into()]
}
fn default_native_currency() -> NativeCurrency {
    NativeCurrency {
        name: "SepoliaETH".into(),
        symbol: "ETH".into(),
        decimals: 18,
    }
}
fn default_block_explorer_urls() -> Vec<String> {
    vec!["https://sepolia.etherscan.io".into()]
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            rpc_urls: default_rpc_urls(),
            block_explorer_urls: default_block_explorer_urls(),
            native_currency: default_native_currency(),
        }
    }
}

impl NetworkParams {
    /// Numeric chain id.
    pub fn chain_id_value(&self) -> Result<u64, CoreError> {
        parse_chain_id(&self.chain_id)
    }

    /// Whether `other` (hex, any case) names this network.
    pub fn matches_chain(&self, other: &str) -> bool {
        match (self.chain_id_value(), parse_chain_id(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Parameters in the shape wallets expect for `wallet_addEthereumChain`.
    pub fn to_wallet_params(&self) -> serde_json::Value {
        serde_json::json!({
            "chainId": self.chain_id,
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "blockExplorerUrls": self.block_explorer_urls,
        })
    }
}

/// Parse a `0x`-prefixed hex chain id.
pub fn parse_chain_id(raw: &str) -> Result<u64, CoreError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CoreError::Validation(format!("chain id must be 0x-prefixed hex: {}", raw)))?;
    u64::from_str_radix(body, 16)
        .map_err(|_| CoreError::Validation(format!("invalid chain id: {}", raw)))
}

/// Tuning for full synchronization passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Upper bound on token resolutions in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

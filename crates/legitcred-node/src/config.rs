//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use legitcred_core::{NetworkParams, SyncSettings};

/// Full configuration for the LegitCred node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LegitcredConfig {
    /// Ledger RPC and contract settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Content gateway settings.
    #[serde(default)]
    pub content: ContentConfig,

    /// Synchronization settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Network the signer must be on for issuance.
    #[serde(default)]
    pub network: NetworkParams,

    /// Signer settings. Issuance is disabled without a signer URL.
    #[serde(default)]
    pub signer: SignerConfig,

    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint used for reads and receipt polling.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Address of the credential contract.
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Receipt polling interval while waiting for a mint.
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Content-addressed gateway base URL.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_content_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper bound on token resolutions in flight during a pass.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Run a full pass as soon as the node starts.
    #[serde(default = "default_true")]
    pub sync_on_start: bool,
    /// Seconds between automatic passes; 0 disables them.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// JSON-RPC endpoint of a signer holding the issuing account.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Read the owner back after each mint.
    #[serde(default = "default_true")]
    pub verify_owner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_rpc_url() -> String {
    "https://rpc.sepolia.org".into()
}
fn default_contract_address() -> String {
    "0x23cb9cc6125dd5b83e5b8d94d7c45d0b123e0a0a".into()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_confirmation_poll_ms() -> u64 {
    2000
}
fn default_gateway_url() -> String {
    "https://ipfs.io".into()
}
fn default_content_timeout_secs() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    SyncSettings::default().max_concurrency
}
fn default_true() -> bool {
    true
}
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    8645
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: default_contract_address(),
            request_timeout_secs: default_request_timeout_secs(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            timeout_secs: default_content_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            sync_on_start: true,
            refresh_interval_secs: 0,
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            verify_owner: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }
}

impl SyncConfig {
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            max_concurrency: self.max_concurrency,
        }
    }

    /// Period of automatic passes, if enabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

impl LegitcredConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: LegitcredConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LegitcredConfig::default();
        assert_eq!(config.api.port, 8645);
        assert_eq!(config.sync.max_concurrency, 8);
        assert!(config.sync.sync_on_start);
        assert!(config.sync.refresh_interval().is_none());
        assert!(config.signer.rpc_url.is_none());
        assert!(config.signer.verify_owner);
        assert_eq!(config.network.chain_id, "0xaa36a7");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = LegitcredConfig::default();
        config.signer.rpc_url = Some("http://127.0.0.1:8545".into());
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: LegitcredConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.api.port, config.api.port);
        assert_eq!(decoded.signer.rpc_url, config.signer.rpc_url);
        assert_eq!(decoded.network, config.network);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = LegitcredConfig::load(Path::new("/nonexistent/legitcred.toml")).unwrap();
        assert_eq!(config.ledger.rpc_url, "https://rpc.sepolia.org");
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[sync]
max_concurrency = 3
refresh_interval_secs = 60

[network]
chain_id = "0x1"
chain_name = "Ethereum Mainnet"
"#;
        let config: LegitcredConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sync.settings().max_concurrency, 3);
        assert_eq!(config.sync.refresh_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.network.chain_id, "0x1");
        // Defaults for unspecified
        assert_eq!(config.network.native_currency.decimals, 18);
        assert!(config.sync.sync_on_start);
        assert_eq!(config.ledger.poll_interval(), Duration::from_millis(2000));
    }
}

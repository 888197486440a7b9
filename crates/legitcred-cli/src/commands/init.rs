//! `legitcred init`: write a default node configuration.

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

const DEFAULT_CONFIG: &str = r#"# LegitCred Node Configuration

[ledger]
rpc_url = "https://rpc.sepolia.org"
contract_address = "0x23cb9cc6125dd5b83e5b8d94d7c45d0b123e0a0a"
request_timeout_secs = 30
confirmation_poll_ms = 2000

[content]
gateway_url = "https://ipfs.io"
timeout_secs = 30

[sync]
max_concurrency = 8
sync_on_start = true
refresh_interval_secs = 0

[network]
chain_id = "0xaa36a7"
chain_name = "Sepolia Test Network"
rpc_urls = ["https://rpc.sepolia.org"]
block_explorer_urls = ["https://sepolia.etherscan.io"]

[network.native_currency]
name = "SepoliaETH"
symbol = "ETH"
decimals = 18

[signer]
# JSON-RPC endpoint of a signer holding the issuing account; issuance is
# disabled while unset.
# rpc_url = "http://127.0.0.1:8545"
verify_owner = true

[api]
listen_addr = "127.0.0.1"
port = 8645

[logging]
level = "info"
format = "text"
"#;

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("legitcred.toml");

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    std::fs::create_dir_all(&args.dir)?;
    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Initialized LegitCred node at {}", config_path.display());
    println!("Edit legitcred.toml to customize your configuration.");
    println!("Run 'legitcred-node' to start the node.");

    Ok(())
}

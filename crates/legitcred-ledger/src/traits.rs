use async_trait::async_trait;
use serde_json::Value;

use legitcred_core::{Address, MetadataPointer, NetworkParams, TokenId};

use crate::error::{LedgerError, SignerError};
use crate::types::{PendingTx, TransactionRequest, TxHash, TxReceipt};

/// Read and write access to the credential contract.
///
/// Implementations must be safe to call concurrently; the synchronizer fans
/// out per-token reads.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Number of credentials ever minted. Ids are `1..=total_supply`.
    async fn total_supply(&self) -> Result<u64, LedgerError>;

    /// Raw on-chain pointer string for `token_id`.
    async fn metadata_pointer(&self, token_id: TokenId) -> Result<String, LedgerError>;

    /// Current owner of `token_id`.
    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError>;

    /// Ask `signer` to send a mint of `pointer` to `recipient`.
    async fn submit_mint(
        &self,
        signer: &dyn Signer,
        recipient: &Address,
        pointer: &MetadataPointer,
    ) -> Result<PendingTx, LedgerError>;

    /// Wait until `pending` is included, returning its receipt.
    ///
    /// A reverted transaction is reported as [`LedgerError::Reverted`].
    /// The write is already submitted, so a poll that hits a transport error
    /// may be repeated; reads elsewhere surface connectivity errors at once.
    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError>;

    /// Address of the credential contract.
    fn contract_address(&self) -> Address;
}

/// An account-holder capability that can sign and submit transactions.
///
/// Only [`Signer::request`] is required; the typed methods are the wallet
/// protocol calls built on top of it.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Raw wallet request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, SignerError>;

    /// Hex chain id the signer is currently on.
    async fn chain_id(&self) -> Result<String, SignerError> {
        let value = self.request("eth_chainId", Value::Array(vec![])).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| SignerError::Malformed(format!("eth_chainId returned {}", value)))
    }

    /// Accounts already exposed, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, SignerError> {
        let value = self.request("eth_accounts", Value::Array(vec![])).await?;
        parse_accounts(&value)
    }

    /// Accounts after asking the holder to connect.
    async fn request_accounts(&self) -> Result<Vec<Address>, SignerError> {
        let value = self
            .request("eth_requestAccounts", Value::Array(vec![]))
            .await?;
        parse_accounts(&value)
    }

    /// The active account, connecting first if none is exposed.
    async fn address(&self) -> Result<Address, SignerError> {
        if let Some(first) = self.accounts().await?.into_iter().next() {
            return Ok(first);
        }
        self.request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(SignerError::NoAccount)
    }

    /// Re-prompt the holder for account access, then read the granted accounts.
    async fn request_permissions(&self) -> Result<Vec<Address>, SignerError> {
        self.request(
            "wallet_requestPermissions",
            serde_json::json!([{ "eth_accounts": {} }]),
        )
        .await?;
        self.request_accounts().await
    }

    async fn switch_chain(&self, chain_id: &str) -> Result<(), SignerError> {
        self.request(
            "wallet_switchEthereumChain",
            serde_json::json!([{ "chainId": chain_id }]),
        )
        .await
        .map(|_| ())
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), SignerError> {
        self.request(
            "wallet_addEthereumChain",
            Value::Array(vec![params.to_wallet_params()]),
        )
        .await
        .map(|_| ())
    }

    /// Sign and broadcast `tx`, returning its hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, SignerError> {
        let value = self
            .request("eth_sendTransaction", Value::Array(vec![tx.to_json()]))
            .await?;
        value
            .as_str()
            .and_then(TxHash::parse)
            .ok_or_else(|| SignerError::Malformed(format!("eth_sendTransaction returned {}", value)))
    }
}

fn parse_accounts(value: &Value) -> Result<Vec<Address>, SignerError> {
    let items = value
        .as_array()
        .ok_or_else(|| SignerError::Malformed(format!("expected account list, got {}", value)))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| SignerError::Malformed(format!("account is not a string: {}", item)))
                .and_then(|s| {
                    Address::parse(s).map_err(|e| SignerError::Malformed(e.to_string()))
                })
        })
        .collect()
}

//! Credential issuance: validate, align the signer's network, mint, confirm
//! and extract the new token id.
//!
//! The pipeline performs exactly one ledger write and never touches the
//! index. Callers decide whether to insert the new record or resync.

use std::sync::Arc;

use serde::Serialize;

use legitcred_core::{Address, MintRequest, NetworkParams, TokenId};
use legitcred_ledger::{LedgerClient, Signer, SignerError, TxHash};

use crate::error::IssuanceError;

/// Result of a confirmed mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintOutcome {
    pub token_id: TokenId,
    pub tx_hash: TxHash,
    pub recipient: Address,
    /// Owner read back after confirmation, when verification is enabled.
    pub confirmed_owner: Option<Address>,
}

pub struct IssuancePipeline {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn Signer>,
    network: NetworkParams,
    verify_owner: bool,
}

impl IssuancePipeline {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn Signer>,
        network: NetworkParams,
    ) -> Self {
        Self {
            ledger,
            signer,
            network,
            verify_owner: true,
        }
    }

    /// Enable or disable the post-mint owner read.
    pub fn with_owner_verification(mut self, verify: bool) -> Self {
        self.verify_owner = verify;
        self
    }

    pub fn network(&self) -> &NetworkParams {
        &self.network
    }

    /// Mint one credential and wait for its confirmation.
    pub async fn mint_credential(&self, request: &MintRequest) -> Result<MintOutcome, IssuanceError> {
        let recipient = Address::parse(&request.recipient)?;
        if recipient == Address::ZERO {
            return Err(IssuanceError::Validation(
                "cannot mint to the zero address".into(),
            ));
        }
        let pointer = request.pointer()?;

        self.ensure_network().await?;

        tracing::info!(recipient = %recipient, pointer = %pointer, "minting credential");
        let pending = self
            .ledger
            .submit_mint(self.signer.as_ref(), &recipient, &pointer)
            .await?;
        let receipt = self.ledger.wait_for_confirmation(&pending).await?;

        let token_id = receipt
            .minted_token_id(&self.ledger.contract_address())
            .ok_or_else(|| {
                tracing::error!(tx = %pending.hash, "mint confirmed but no transfer event found");
                IssuanceError::EventNotFound(pending.hash.to_string())
            })?;

        let confirmed_owner = if self.verify_owner {
            let owner = self.ledger.owner_of(token_id).await?;
            if owner != recipient {
                return Err(IssuanceError::OwnerMismatch {
                    token_id: token_id.value(),
                    expected: recipient.to_checksum(),
                    actual: owner.to_checksum(),
                });
            }
            Some(owner)
        } else {
            None
        };

        tracing::info!(token_id = %token_id, tx = %pending.hash, recipient = %recipient, "credential minted");

        Ok(MintOutcome {
            token_id,
            tx_hash: pending.hash,
            recipient,
            confirmed_owner,
        })
    }

    /// Move the signer onto the configured network, registering the network
    /// with the signer first if it does not know it.
    pub async fn ensure_network(&self) -> Result<(), IssuanceError> {
        let required = self.network.chain_id.as_str();
        let current = self.signer.chain_id().await?;
        if self.network.matches_chain(&current) {
            return Ok(());
        }

        tracing::info!(current = %current, required, "switching signer network");
        match self.signer.switch_chain(required).await {
            Ok(()) => {}
            Err(SignerError::UnrecognizedChain(_)) => {
                tracing::info!(required, chain_name = %self.network.chain_name, "registering network with signer");
                self.signer
                    .add_chain(&self.network)
                    .await
                    .map_err(|e| self.mismatch(e.to_string()))?;
                self.signer
                    .switch_chain(required)
                    .await
                    .map_err(|e| self.mismatch(e.to_string()))?;
            }
            Err(e) => return Err(self.mismatch(e.to_string())),
        }

        let now = self.signer.chain_id().await?;
        if !self.network.matches_chain(&now) {
            return Err(self.mismatch(format!("signer still reports chain {}", now)));
        }
        Ok(())
    }

    fn mismatch(&self, detail: String) -> IssuanceError {
        IssuanceError::NetworkMismatch {
            required: self.network.chain_id.clone(),
            detail,
        }
    }
}

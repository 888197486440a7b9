//! Integration test: issuing a credential and reading it back through the
//! ledger and the index.

use std::sync::Arc;

use async_trait::async_trait;

use legitcred_core::{Address, MetadataPointer, MintRequest, TokenId};
use legitcred_index::{IssuanceError, IssuancePipeline};
use legitcred_integration_tests::{holder, World, RECIPIENT};
use legitcred_ledger::{
    LedgerClient, LedgerError, MemoryLedger, MemorySigner, PendingTx, Signer, TxReceipt,
};

/// Delegates to a memory ledger but reports a fixed owner for every token.
struct MisreportingLedger {
    inner: Arc<MemoryLedger>,
    owner: Address,
}

#[async_trait]
impl LedgerClient for MisreportingLedger {
    async fn total_supply(&self) -> Result<u64, LedgerError> {
        self.inner.total_supply().await
    }

    async fn metadata_pointer(&self, token_id: TokenId) -> Result<String, LedgerError> {
        self.inner.metadata_pointer(token_id).await
    }

    async fn owner_of(&self, _token_id: TokenId) -> Result<Address, LedgerError> {
        Ok(self.owner)
    }

    async fn submit_mint(
        &self,
        signer: &dyn Signer,
        recipient: &Address,
        pointer: &MetadataPointer,
    ) -> Result<PendingTx, LedgerError> {
        self.inner.submit_mint(signer, recipient, pointer).await
    }

    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, LedgerError> {
        self.inner.wait_for_confirmation(pending).await
    }

    fn contract_address(&self) -> Address {
        self.inner.contract_address()
    }
}

#[tokio::test]
async fn test_mint_after_existing_supply() {
    let world = World::new();
    for i in 0..5u8 {
        world.issue(holder(i + 1), "Acme");
    }
    let (pipeline, _signer) = world.pipeline();

    let outcome = pipeline
        .mint_credential(&MintRequest::new(RECIPIENT, "doc6", "art6"))
        .await
        .unwrap();

    assert_eq!(outcome.token_id.value(), 6);
    assert_eq!(world.ledger.total_supply().await.unwrap(), 6);
    let owner = world.ledger.owner_of(outcome.token_id).await.unwrap();
    assert_eq!(owner, Address::parse(RECIPIENT).unwrap());
    assert_eq!(outcome.confirmed_owner, Some(owner));
    assert_eq!(
        world.ledger.metadata_pointer(outcome.token_id).await.unwrap(),
        "doc6,art6"
    );
}

#[tokio::test]
async fn test_malformed_recipient_touches_nothing() {
    let world = World::new();
    let (pipeline, signer) = world.pipeline();

    let err = pipeline
        .mint_credential(&MintRequest::new("0x1234", "doc", "art"))
        .await
        .unwrap_err();

    assert!(matches!(err, IssuanceError::Validation(_)));
    assert_eq!(world.ledger.call_count(), 0);
    assert!(signer.requests().is_empty());
}

#[tokio::test]
async fn test_empty_content_id_is_rejected() {
    let world = World::new();
    let (pipeline, signer) = world.pipeline();

    let err = pipeline
        .mint_credential(&MintRequest::new(RECIPIENT, "  ", "art"))
        .await
        .unwrap_err();

    assert!(matches!(err, IssuanceError::Validation(_)));
    assert_eq!(world.ledger.token_count(), 0);
    assert!(signer.requests().is_empty());
}

#[tokio::test]
async fn test_owner_mismatch_is_reported() {
    let world = World::new();
    let ledger = Arc::new(MisreportingLedger {
        inner: world.ledger.clone(),
        owner: holder(0x77),
    });
    let signer = Arc::new(MemorySigner::new(holder(0xaa), "0xaa36a7"));
    let pipeline = IssuancePipeline::new(
        ledger as Arc<dyn LedgerClient>,
        signer as Arc<dyn Signer>,
        Default::default(),
    );

    let err = pipeline
        .mint_credential(&MintRequest::new(RECIPIENT, "doc", "art"))
        .await
        .unwrap_err();

    match err {
        IssuanceError::OwnerMismatch { token_id, actual, .. } => {
            assert_eq!(token_id, 1);
            assert_eq!(actual, holder(0x77).to_checksum());
        }
        other => panic!("expected owner mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_network_switch_precedes_mint() {
    let world = World::new();
    let signer = Arc::new(MemorySigner::new(holder(0xaa), "0x1"));
    let pipeline = IssuancePipeline::new(
        world.ledger.clone() as Arc<dyn LedgerClient>,
        signer.clone() as Arc<dyn Signer>,
        Default::default(),
    );

    pipeline
        .mint_credential(&MintRequest::new(RECIPIENT, "doc", "art"))
        .await
        .unwrap();

    assert_eq!(signer.current_chain(), "0xaa36a7");
    let requests = signer.requests();
    let added = requests
        .iter()
        .position(|m| m == "wallet_addEthereumChain")
        .unwrap();
    let sent = requests
        .iter()
        .position(|m| m == "eth_sendTransaction")
        .unwrap();
    assert!(added < sent);
}

#[tokio::test]
async fn test_minted_credential_is_indexed() {
    let world = World::new();
    world.issue(holder(1), "Acme");
    world.synchronizer.sync_into(&world.index).await.unwrap();
    let (pipeline, _signer) = world.pipeline();

    world
        .resolver
        .insert("fresh", serde_json::json!({ "organization": "Initech" }));
    let outcome = pipeline
        .mint_credential(&MintRequest::new(RECIPIENT, "fresh", "artifact"))
        .await
        .unwrap();

    let record = world
        .synchronizer
        .resolve_token(outcome.token_id)
        .await
        .unwrap();
    world.index.insert_or_refresh(record);

    assert_eq!(world.index.len(), 2);
    assert_eq!(world.index.list_by_owner(Some(RECIPIENT)).len(), 1);
    assert!(world.index.list_organizations().contains("Initech"));

    // a later full pass agrees with the incremental insert
    world.synchronizer.sync_into(&world.index).await.unwrap();
    assert_eq!(world.index.len(), 2);
    assert!(world.index.get(outcome.token_id).unwrap().is_owned_by(RECIPIENT));
}

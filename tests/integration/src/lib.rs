//! Fixtures shared by the cross-crate tests.

use std::sync::Arc;

use serde_json::json;

use legitcred_content::{ContentResolver, MemoryResolver};
use legitcred_core::{Address, NetworkParams, SyncSettings, TokenId};
use legitcred_index::{CredentialIndex, FanoutSynchronizer, IssuancePipeline};
use legitcred_ledger::{LedgerClient, MemoryLedger, MemorySigner, Signer};

pub const CONTRACT: [u8; 20] = [0xc0; 20];
pub const ISSUER: [u8; 20] = [0xaa; 20];

/// A recipient written in mixed-case checksum form.
pub const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// In-memory ledger and content store wired to a synchronizer and an index.
pub struct World {
    pub ledger: Arc<MemoryLedger>,
    pub resolver: Arc<MemoryResolver>,
    pub index: CredentialIndex,
    pub synchronizer: FanoutSynchronizer,
}

impl World {
    pub fn new() -> Self {
        Self::with_concurrency(4)
    }

    pub fn with_concurrency(max_concurrency: usize) -> Self {
        let ledger = Arc::new(MemoryLedger::new(Address::from_bytes(CONTRACT)));
        let resolver = Arc::new(MemoryResolver::new());
        let synchronizer = FanoutSynchronizer::new(
            ledger.clone() as Arc<dyn LedgerClient>,
            resolver.clone() as Arc<dyn ContentResolver>,
            &SyncSettings { max_concurrency },
        );
        Self {
            ledger,
            resolver,
            index: CredentialIndex::new(),
            synchronizer,
        }
    }

    /// Seed a token owned by `owner` whose document names `organization`.
    pub fn issue(&self, owner: Address, organization: &str) -> TokenId {
        let next = self.ledger.token_count() + 1;
        let content_id = format!("doc{}", next);
        self.resolver
            .insert(content_id.clone(), json!({ "organization": organization, "title": format!("Credential {}", next) }));
        self.ledger.seed(owner, format!("{},art{}", content_id, next))
    }

    /// A pipeline minting through a signer already on the default network.
    pub fn pipeline(&self) -> (IssuancePipeline, Arc<MemorySigner>) {
        let network = NetworkParams::default();
        let signer = Arc::new(MemorySigner::new(Address::from_bytes(ISSUER), &network.chain_id));
        let pipeline = IssuancePipeline::new(
            self.ledger.clone() as Arc<dyn LedgerClient>,
            signer.clone() as Arc<dyn Signer>,
            network,
        );
        (pipeline, signer)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner address made from a single repeated byte.
pub fn holder(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

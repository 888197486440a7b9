//! Full-pass reconstruction of the credential set from the ledger.
//!
//! A pass reads the total supply, then resolves every token id `1..=N` with
//! at most `max_concurrency` resolutions in flight. Each resolution reads the
//! on-chain pointer and then fetches the metadata document and the current
//! owner concurrently. A token whose resolution fails is logged and skipped;
//! only a failed total-supply read aborts the pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use legitcred_content::ContentResolver;
use legitcred_core::{CredentialRecord, MetadataPointer, SyncSettings, TokenId};
use legitcred_ledger::LedgerClient;

use crate::error::SyncError;
use crate::index::CredentialIndex;

/// A token left out of a pass and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedToken {
    pub token_id: TokenId,
    pub reason: String,
}

/// Result of one full pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub total_supply: u64,
    /// Resolved records, ascending by token id.
    pub records: Vec<CredentialRecord>,
    pub organizations: BTreeSet<String>,
    /// Tokens that could not be resolved, ascending by token id.
    pub skipped: Vec<SkippedToken>,
}

impl SyncReport {
    /// Whether every token in `1..=total_supply` was resolved.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Rebuilds the credential set from the ledger and content store.
pub struct FanoutSynchronizer {
    ledger: Arc<dyn LedgerClient>,
    resolver: Arc<dyn ContentResolver>,
    max_concurrency: usize,
}

impl FanoutSynchronizer {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        resolver: Arc<dyn ContentResolver>,
        settings: &SyncSettings,
    ) -> Self {
        Self {
            ledger,
            resolver,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run one pass without touching any index.
    pub async fn run_full_sync(&self) -> Result<SyncReport, SyncError> {
        let total_supply = self
            .ledger
            .total_supply()
            .await
            .map_err(SyncError::TotalSupply)?;

        tracing::info!(
            total_supply,
            max_concurrency = self.max_concurrency,
            "sync pass started"
        );

        let outcomes: Vec<(TokenId, Result<CredentialRecord, SyncError>)> =
            stream::iter(TokenId::range(total_supply))
                .map(|token_id| async move { (token_id, self.resolve_token(token_id).await) })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (token_id, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(token_id = %token_id, error = %e, "skipping token");
                    skipped.push(SkippedToken {
                        token_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        records.sort_by_key(|r| r.token_id);
        skipped.sort_by_key(|s| s.token_id);

        let organizations: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.organization.clone())
            .collect();

        tracing::info!(
            total_supply,
            records = records.len(),
            skipped = skipped.len(),
            organizations = organizations.len(),
            "sync pass finished"
        );

        Ok(SyncReport {
            total_supply,
            records,
            organizations,
            skipped,
        })
    }

    /// Resolve a single token into a record.
    pub async fn resolve_token(&self, token_id: TokenId) -> Result<CredentialRecord, SyncError> {
        let raw = self.ledger.metadata_pointer(token_id).await?;
        let pointer = MetadataPointer::parse(&raw)?;

        let (metadata, owner) = tokio::try_join!(
            async {
                self.resolver
                    .resolve(&pointer.content_id)
                    .await
                    .map_err(SyncError::from)
            },
            async { self.ledger.owner_of(token_id).await.map_err(SyncError::from) },
        )?;

        Ok(CredentialRecord::assemble(token_id, pointer, metadata, &owner))
    }

    /// Run one pass through `index`'s pass protocol.
    pub async fn sync_into(&self, index: &CredentialIndex) -> Result<SyncReport, SyncError> {
        let ticket = index.begin_pass();
        match self.run_full_sync().await {
            Ok(report) => {
                index.publish(&ticket, &report);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(pass = ticket.pass(), error = %e, "sync pass failed");
                index.fail_pass(&ticket, e.to_string());
                Err(e)
            }
        }
    }
}

//! Queryable in-memory credential index.
//!
//! Records and the organization set are replaced as one batch per pass under
//! a single write lock, so readers see either the previous pass or the new
//! one, never a mix. Passes are numbered; only the most recently begun pass
//! may publish or fail the session.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use legitcred_core::{normalize_address, CredentialRecord, Principal, Role, SyncSession, TokenId};

use crate::synchronizer::SyncReport;

/// Handle for one begun pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassTicket {
    pass: u64,
}

impl PassTicket {
    pub fn pass(&self) -> u64 {
        self.pass
    }
}

#[derive(Debug, Default)]
struct IndexState {
    records: BTreeMap<TokenId, CredentialRecord>,
    organizations: BTreeSet<String>,
    session: SyncSession,
    latest_pass: u64,
    /// Pass that was current when a record arrived through `insert_or_refresh`.
    direct_inserts: BTreeMap<TokenId, u64>,
}

impl IndexState {
    fn recompute_organizations(&mut self) {
        self.organizations = self
            .records
            .values()
            .filter_map(|r| r.organization.clone())
            .collect();
    }
}

/// The credential index.
#[derive(Debug, Default)]
pub struct CredentialIndex {
    state: RwLock<IndexState>,
}

impl CredentialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new pass, superseding any pass still running.
    pub fn begin_pass(&self) -> PassTicket {
        let mut state = self.write();
        state.latest_pass += 1;
        let pass = state.latest_pass;
        if let Err(e) = state.session.start(pass) {
            tracing::warn!(pass, error = %e, "sync session refused start");
        }
        tracing::debug!(pass, "sync pass begun");
        PassTicket { pass }
    }

    /// Atomically replace the index contents with `report`.
    ///
    /// Records inserted with [`insert_or_refresh`](Self::insert_or_refresh)
    /// after this pass began survive when the report does not cover them.
    ///
    /// Returns `false` and leaves the index untouched when `ticket` has been
    /// superseded or already finished.
    pub fn publish(&self, ticket: &PassTicket, report: &SyncReport) -> bool {
        let mut state = self.write();
        if ticket.pass != state.latest_pass {
            tracing::debug!(
                pass = ticket.pass,
                latest = state.latest_pass,
                "discarding superseded sync result"
            );
            return false;
        }
        // Direct inserts made since this pass began are newer than anything
        // the pass read; keep those the report does not cover.
        let mut records: BTreeMap<TokenId, CredentialRecord> = report
            .records
            .iter()
            .map(|r| (r.token_id, r.clone()))
            .collect();
        let mut carried = BTreeMap::new();
        for (token_id, inserted_in) in &state.direct_inserts {
            if *inserted_in < ticket.pass || records.contains_key(token_id) {
                continue;
            }
            if let Some(record) = state.records.get(token_id) {
                records.insert(*token_id, record.clone());
                carried.insert(*token_id, *inserted_in);
            }
        }

        if let Err(e) = state.session.succeed(records.len(), report.skipped.len()) {
            tracing::debug!(pass = ticket.pass, error = %e, "discarding sync result");
            return false;
        }

        if !carried.is_empty() {
            tracing::debug!(
                pass = ticket.pass,
                carried = carried.len(),
                "kept records inserted during the pass"
            );
        }
        state.records = records;
        state.direct_inserts = carried;
        state.recompute_organizations();

        tracing::info!(
            pass = ticket.pass,
            records = state.records.len(),
            skipped = report.skipped.len(),
            "index published"
        );
        true
    }

    /// Mark the pass failed. Previously published records stay visible.
    pub fn fail_pass(&self, ticket: &PassTicket, message: impl Into<String>) -> bool {
        let mut state = self.write();
        if ticket.pass != state.latest_pass {
            tracing::debug!(
                pass = ticket.pass,
                latest = state.latest_pass,
                "discarding superseded sync failure"
            );
            return false;
        }
        match state.session.fail(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(pass = ticket.pass, error = %e, "discarding sync failure");
                false
            }
        }
    }

    /// Add or replace one record outside a full pass.
    pub fn insert_or_refresh(&self, record: CredentialRecord) {
        let mut state = self.write();
        tracing::debug!(token_id = %record.token_id, "index record refreshed");
        let pass = state.latest_pass;
        state.direct_inserts.insert(record.token_id, pass);
        state.records.insert(record.token_id, record);
        state.recompute_organizations();
    }

    /// Records owned by `address`, compared case-insensitively. An absent or
    /// blank address matches nothing.
    pub fn list_by_owner(&self, address: Option<&str>) -> Vec<CredentialRecord> {
        let wanted = match address.map(normalize_address) {
            Some(a) if !a.is_empty() => a,
            _ => return Vec::new(),
        };
        self.read()
            .records
            .values()
            .filter(|r| normalize_address(&r.owner) == wanted)
            .cloned()
            .collect()
    }

    /// Records `principal` may see: everything for an admin, owned records
    /// for a holder.
    pub fn list_visible(&self, principal: &Principal) -> Vec<CredentialRecord> {
        match principal.role {
            Role::Admin => self.list_all(),
            Role::Holder => self.list_by_owner(principal.address.as_deref()),
        }
    }

    pub fn list_all(&self) -> Vec<CredentialRecord> {
        self.read().records.values().cloned().collect()
    }

    pub fn list_by_organization(&self, organization: &str) -> Vec<CredentialRecord> {
        let wanted = organization.trim();
        self.read()
            .records
            .values()
            .filter(|r| r.organization.as_deref() == Some(wanted))
            .cloned()
            .collect()
    }

    pub fn get(&self, token_id: TokenId) -> Option<CredentialRecord> {
        self.read().records.get(&token_id).cloned()
    }

    pub fn list_organizations(&self) -> BTreeSet<String> {
        self.read().organizations.clone()
    }

    pub fn session(&self) -> SyncSession {
        self.read().session.clone()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }
}

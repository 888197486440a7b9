//! Commands dispatched from the HTTP API to the node event loop.

use serde::Serialize;
use tokio::sync::oneshot;

use legitcred_core::MintRequest;
use legitcred_index::{IssuanceError, MintOutcome, SkippedToken, SyncError};

/// A command sent from the HTTP API to the node's main event loop.
pub enum NodeCommand {
    /// Run a full synchronization pass.
    Sync {
        reply: oneshot::Sender<Result<SyncSummary, CommandError>>,
    },
    /// Mint a credential, optionally indexing it right away.
    Mint {
        request: MintRequest,
        index: bool,
        reply: oneshot::Sender<Result<MintResponse, CommandError>>,
    },
}

/// Why a command failed, classified for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<SyncError> for CommandError {
    fn from(err: SyncError) -> Self {
        CommandError::Upstream(err.to_string())
    }
}

impl From<IssuanceError> for CommandError {
    fn from(err: IssuanceError) -> Self {
        match err {
            IssuanceError::Validation(_) => CommandError::Invalid(err.to_string()),
            IssuanceError::NetworkMismatch { .. } => CommandError::Conflict(err.to_string()),
            other => CommandError::Upstream(other.to_string()),
        }
    }
}

/// Response after a manual sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub total_supply: u64,
    pub records: usize,
    pub organizations: usize,
    pub skipped: Vec<SkippedToken>,
}

/// Response after a mint.
#[derive(Debug, Clone, Serialize)]
pub struct MintResponse {
    #[serde(flatten)]
    pub outcome: MintOutcome,
    /// Whether the new record was inserted into the index.
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
}

use crate::sync_state::{SyncEvent, SyncStatus};

/// Core errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid sync transition from {from} on {event}")]
    InvalidSyncTransition { from: SyncStatus, event: SyncEvent },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

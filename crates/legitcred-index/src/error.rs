use legitcred_content::ResolutionError;
use legitcred_core::CoreError;
use legitcred_ledger::{LedgerError, SignerError};

/// Errors raised while synchronizing the index.
///
/// Only [`SyncError::TotalSupply`] aborts a pass; the other variants describe
/// why a single token was skipped.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read total supply: {0}")]
    TotalSupply(#[source] LedgerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("invalid metadata pointer: {0}")]
    Pointer(#[from] CoreError),
}

/// Errors raised by the issuance pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Malformed request, rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The signer could not be moved onto the required network.
    #[error("signer is not on network {required}: {detail}")]
    NetworkMismatch { required: String, detail: String },

    /// The mint was confirmed but its token id could not be determined.
    #[error("transaction {0} confirmed without a mint transfer event")]
    EventNotFound(String),

    #[error("token {token_id} is owned by {actual}, expected {expected}")]
    OwnerMismatch {
        token_id: u64,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl From<CoreError> for IssuanceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => IssuanceError::Validation(msg),
            other => IssuanceError::Validation(other.to_string()),
        }
    }
}

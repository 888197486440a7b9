use legitcred_core::CoreError;

/// Ledger client errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The chain gateway could not be reached. Callers may retry.
    #[error("ledger unreachable: {0}")]
    Connectivity(String),

    /// The token (or its data) does not exist on the ledger.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before anything was sent.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed ledger response: {0}")]
    Decode(String),

    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
}

impl LedgerError {
    /// Whether the failure is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Whether the failure means the token or its data is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => LedgerError::NotFound(msg),
            CoreError::Validation(msg) => LedgerError::Validation(msg),
            other => LedgerError::Validation(other.to_string()),
        }
    }
}

/// Errors reported by a signer (wallet) capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The signer does not know the requested chain and it must be added first.
    #[error("chain is not registered with the signer: {0}")]
    UnrecognizedChain(String),

    /// The account holder refused the request.
    #[error("request rejected by signer: {0}")]
    Rejected(String),

    #[error("signer exposes no account")]
    NoAccount,

    #[error("signer unreachable: {0}")]
    Transport(String),

    #[error("signer rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed signer response: {0}")]
    Malformed(String),
}

impl SignerError {
    /// Wallet error code for a chain that has not been added.
    pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
    /// Wallet error code for a request the user declined.
    pub const USER_REJECTED_CODE: i64 = 4001;

    /// Classify a wallet JSON-RPC error.
    pub fn from_rpc(code: i64, message: String) -> Self {
        match code {
            Self::UNRECOGNIZED_CHAIN_CODE => SignerError::UnrecognizedChain(message),
            Self::USER_REJECTED_CODE => SignerError::Rejected(message),
            _ => SignerError::Rpc { code, message },
        }
    }
}

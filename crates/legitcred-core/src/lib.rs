//! LegitCred Core: fundamental types, errors, and configuration for the
//! LegitCred credential indexing and issuance engine.

pub mod config;
pub mod error;
pub mod sync_state;
pub mod types;

pub use config::{parse_chain_id, NativeCurrency, NetworkParams, SyncSettings};
pub use error::CoreError;
pub use sync_state::{SyncEvent, SyncSession, SyncStateMachine, SyncStatus};
pub use types::{
    normalize_address, Address, ContentId, CredentialRecord, MetadataPointer, MintRequest,
    Principal, Role, TokenId, POINTER_DELIMITER,
};

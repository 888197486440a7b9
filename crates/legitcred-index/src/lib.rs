//! Credential indexing and issuance.
//!
//! The [`FanoutSynchronizer`] rebuilds the [`CredentialIndex`] from the ledger
//! in full passes; the [`IssuancePipeline`] mints new credentials through a
//! signer.

pub mod error;
pub mod index;
pub mod issuance;
pub mod synchronizer;

pub use error::{IssuanceError, SyncError};
pub use index::{CredentialIndex, PassTicket};
pub use issuance::{IssuancePipeline, MintOutcome};
pub use synchronizer::{FanoutSynchronizer, SkippedToken, SyncReport};

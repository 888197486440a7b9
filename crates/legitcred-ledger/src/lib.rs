//! LegitCred Ledger Layer
//!
//! Read/write gateway to the credential contract: total supply, metadata
//! pointers, ownership, and mint submission. Writes are signed by an
//! externally supplied [`Signer`]; this crate never holds private keys.

pub mod abi;
pub mod adapters;
pub mod client;
pub mod error;
pub mod rpc;
pub mod signer;
pub mod traits;
pub mod types;

pub use adapters::memory::{MemoryLedger, MemorySigner};
pub use client::{RpcLedgerClient, RpcLedgerConfig};
pub use error::{LedgerError, SignerError};
pub use signer::RpcSigner;
pub use traits::{LedgerClient, Signer};
pub use types::{LogEntry, PendingTx, TransactionRequest, TransferEvent, TxHash, TxReceipt};

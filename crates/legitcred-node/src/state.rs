//! Shared node state for cross-task communication.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use legitcred_index::CredentialIndex;

use crate::commands::NodeCommand;

/// Shared state for the running node, accessible from HTTP handlers.
pub struct NodeState {
    /// When the node started.
    pub start_time: Instant,
    /// The credential index; handlers read it directly.
    pub index: Arc<CredentialIndex>,
    /// Checksummed address of the credential contract.
    pub contract: String,
    /// Chain id issuance requires.
    pub chain_id: String,
    /// Whether a signer is configured.
    pub issuance_enabled: bool,
    /// Channel to send commands to the event loop.
    pub command_tx: mpsc::Sender<NodeCommand>,
}

impl NodeState {
    pub fn new(
        index: Arc<CredentialIndex>,
        contract: String,
        chain_id: String,
        issuance_enabled: bool,
        command_tx: mpsc::Sender<NodeCommand>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            index,
            contract,
            chain_id,
            issuance_enabled,
            command_tx,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

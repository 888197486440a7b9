use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Status of the index's synchronization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No pass has been started yet.
    Idle,
    /// A pass is in flight.
    Loading,
    /// The latest pass returned. Some tokens may have been skipped.
    Succeeded,
    /// The latest pass could not read the total supply.
    Failed,
}

impl SyncStatus {
    /// Whether a pass is currently running.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Events that drive the sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncEvent {
    /// A pass was started (initial load or manual refresh).
    Start,
    /// The synchronizer returned a batch.
    Complete,
    /// The total-supply read failed.
    Fail,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::Complete => write!(f, "Complete"),
            Self::Fail => write!(f, "Fail"),
        }
    }
}

/// Sync session transitions.
///
/// Valid transitions:
/// - Idle → Loading (Start)
/// - Loading → Loading (Start, a newer pass supersedes the running one)
/// - Loading → Succeeded (Complete)
/// - Loading → Failed (Fail)
/// - Succeeded → Loading (Start)
/// - Failed → Loading (Start)
pub struct SyncStateMachine;

impl SyncStateMachine {
    pub fn transition(current: SyncStatus, event: SyncEvent) -> Result<SyncStatus, CoreError> {
        let next = match (current, event) {
            (_, SyncEvent::Start) => SyncStatus::Loading,
            (SyncStatus::Loading, SyncEvent::Complete) => SyncStatus::Succeeded,
            (SyncStatus::Loading, SyncEvent::Fail) => SyncStatus::Failed,
            _ => {
                return Err(CoreError::InvalidSyncTransition {
                    from: current,
                    event,
                })
            }
        };

        tracing::debug!(from = %current, to = %next, event = %event, "sync session transition");

        Ok(next)
    }

    pub fn can_transition(current: SyncStatus, event: SyncEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

/// Observable state of the index's synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSession {
    pub status: SyncStatus,
    /// Aggregate error message of the last failed pass.
    pub error: Option<String>,
    /// Sequence number of the pass this session describes (0 before the first).
    pub pass: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Records published by the last successful pass.
    pub record_count: usize,
    /// Tokens the last successful pass had to skip.
    pub skipped: usize,
}

impl SyncSession {
    pub fn new() -> Self {
        Self {
            status: SyncStatus::Idle,
            error: None,
            pass: 0,
            started_at: None,
            finished_at: None,
            record_count: 0,
            skipped: 0,
        }
    }

    /// Enter `loading` for pass `pass`.
    pub fn start(&mut self, pass: u64) -> Result<(), CoreError> {
        self.status = SyncStateMachine::transition(self.status, SyncEvent::Start)?;
        self.pass = pass;
        self.error = None;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        Ok(())
    }

    /// Enter `succeeded`, recording how much of the ledger was covered.
    pub fn succeed(&mut self, record_count: usize, skipped: usize) -> Result<(), CoreError> {
        self.status = SyncStateMachine::transition(self.status, SyncEvent::Complete)?;
        self.record_count = record_count;
        self.skipped = skipped;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Enter `failed` with an aggregate message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.status = SyncStateMachine::transition(self.status, SyncEvent::Fail)?;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Whether the last pass covered every token.
    pub fn is_complete(&self) -> bool {
        self.status == SyncStatus::Succeeded && self.skipped == 0
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

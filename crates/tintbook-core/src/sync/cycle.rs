//! State machine for a single save cycle.

use super::{ApiError, ApiResult, SyncError};

/// How many times a version conflict is retried within one cycle.
pub const MAX_CONFLICT_RETRIES: u8 = 1;

/// Where a save cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    /// Local changes not yet sent.
    Dirty,
    /// A save request is in flight.
    Syncing,
    /// A conflict was answered; the next attempt uses the server's version.
    ConflictRetry { server_version: u64 },
    Done { version: u64 },
    Failed,
}

/// Final result of a save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server stored the save.
    Synced { version: u64, retried: bool },
    /// A transient failure; the image should be retried later.
    Pending(ApiError),
    /// Terminal for this cycle.
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// What the driver should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send the save again carrying `version`.
    Retry { version: u64 },
    Finished(SyncOutcome),
}

/// Drives `Idle → Dirty → Syncing → {Done | ConflictRetry → Done | Failed}`.
#[derive(Debug, Clone)]
pub struct SaveCycle {
    state: SyncState,
    /// Latest version known to this cycle.
    version: u64,
    conflicts: u8,
}

impl SaveCycle {
    pub fn new(version: u64) -> Self {
        Self {
            state: SyncState::Idle,
            version,
            conflicts: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Latest version known: the stored one after success, the server's after a conflict.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record that there are local changes to send.
    pub fn mark_dirty(&mut self) {
        self.state = SyncState::Dirty;
        self.conflicts = 0;
    }

    /// Begin an attempt and return the version to send.
    pub fn start(&mut self) -> u64 {
        debug_assert!(matches!(self.state, SyncState::Dirty | SyncState::ConflictRetry { .. }));
        self.state = SyncState::Syncing;
        self.version
    }

    /// Feed the server's answer to the current attempt.
    pub fn on_response(&mut self, result: ApiResult<u64>) -> Step {
        debug_assert_eq!(self.state, SyncState::Syncing);
        match result {
            Ok(version) => {
                self.version = version;
                self.state = SyncState::Done { version };
                Step::Finished(SyncOutcome::Synced {
                    version,
                    retried: self.conflicts > 0,
                })
            }
            Err(ApiError::Conflict { current_version }) => {
                self.version = current_version;
                if self.conflicts < MAX_CONFLICT_RETRIES {
                    self.conflicts += 1;
                    self.state = SyncState::ConflictRetry {
                        server_version: current_version,
                    };
                    Step::Retry {
                        version: current_version,
                    }
                } else {
                    self.state = SyncState::Failed;
                    Step::Finished(SyncOutcome::Failed(SyncError::ConflictAfterRetry { current_version }))
                }
            }
            Err(e) if e.is_transient() => {
                self.state = SyncState::Failed;
                Step::Finished(SyncOutcome::Pending(e))
            }
            Err(e) => {
                self.state = SyncState::Failed;
                Step::Finished(SyncOutcome::Failed(SyncError::Rejected(e)))
            }
        }
    }
}

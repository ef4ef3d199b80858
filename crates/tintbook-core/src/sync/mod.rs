//! Reconciling local progress with the server's canonical record.
//!
//! Saves use an optimistic version lock: the client echoes the last version
//! it saw, a mismatch is answered with the server's current version, and the
//! client retries exactly once with that version. Transient failures leave
//! the image flagged as pending for a later sweep.

mod client;
mod cycle;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod http;

pub use client::{LoadOrigin, LoadedProgress, SaveReport, SweepReport, SyncClient};
pub use cycle::{MAX_CONFLICT_RETRIES, SaveCycle, Step, SyncOutcome, SyncState};
pub use memory::MemoryProgressApi;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpProgressApi;

use crate::progress::{LoadResponse, SaveRequest};
use crate::storage::BoxFuture;
use thiserror::Error;

/// Failures reported by a progress API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server has no record; this is authoritative, not a transport error.
    #[error("No progress on server")]
    NotFound,
    #[error("Version conflict, server is at {current_version}")]
    Conflict { current_version: u64 },
    #[error("Not authorized")]
    Unauthorized,
    #[error("Rejected by server: {0}")]
    Rejected(String),
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid API configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether retrying later may succeed without any change on our side.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Server { .. } | ApiError::Network(_))
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Terminal failures of one save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Version conflict persisted after retry, server is at {current_version}")]
    ConflictAfterRetry { current_version: u64 },
    #[error("Save rejected: {0}")]
    Rejected(ApiError),
}

/// Remote progress backend.
///
/// `user_id` is the already-resolved identity of the caller; transports
/// forward it as their credential.
pub trait ProgressApi: Send + Sync {
    /// Replace the record, returning the newly stored version.
    fn save(&self, user_id: &str, request: &SaveRequest) -> BoxFuture<'_, ApiResult<u64>>;

    /// Fetch the record for an image.
    fn load(&self, user_id: &str, image_id: &str) -> BoxFuture<'_, ApiResult<LoadResponse>>;
}

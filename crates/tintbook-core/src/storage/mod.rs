//! Local, device-side persistence of coloring progress.
//!
//! The local store is the user-visible source of truth for "my drawing is
//! safe": writes to it never depend on the network. Besides one entry per
//! (user, coloring image) it keeps, per user, a bounded list of recently
//! saved images and the set of images whose latest save has not yet reached
//! the server.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{AutosaveTimer, DEFAULT_AUTOSAVE_DELAY_MS};
pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

use crate::action::ActionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Default cap on the recently-saved index.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No local progress for {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Identifies one user's progress on one coloring image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub user_id: String,
    pub image_id: String,
}

impl ProgressKey {
    pub fn new(user_id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            image_id: image_id.into(),
        }
    }
}

impl std::fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.image_id)
    }
}

/// A locally cached progress entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProgress {
    pub actions: Vec<ActionRecord>,
    /// Last server version this device observed.
    pub version: u64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_data_url: Option<String>,
    /// Unix milliseconds of the local write.
    pub saved_at: u64,
}

/// Per-user bookkeeping kept next to the entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct UserIndex {
    /// Most recently saved first.
    pub recent: Vec<String>,
    pub pending: BTreeSet<String>,
}

impl UserIndex {
    /// Move `image_id` to the front of the recent list, evicting the oldest
    /// entries beyond `limit`.
    pub fn touch_recent(&mut self, image_id: &str, limit: usize) {
        self.recent.retain(|id| id != image_id);
        self.recent.insert(0, image_id.to_string());
        self.recent.truncate(limit);
    }

    pub fn forget(&mut self, image_id: &str) {
        self.recent.retain(|id| id != image_id);
        self.pending.remove(image_id);
    }
}

/// Trait for local progress backends.
///
/// Implementations can keep entries in memory or on the filesystem.
pub trait LocalStore: Send + Sync {
    /// Save an entry and record it as the most recent image for its user.
    fn save(&self, key: &ProgressKey, entry: &LocalProgress) -> BoxFuture<'_, StorageResult<()>>;

    /// Load an entry.
    fn load(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<LocalProgress>>;

    /// Delete an entry along with its recent and pending markers.
    fn delete(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>>;

    /// Recently saved image ids for a user, newest first.
    fn recent(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Flag an image whose latest save has not reached the server.
    fn mark_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>>;

    /// Clear the pending flag after a successful sync.
    fn clear_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>>;

    /// Image ids flagged as pending for a user.
    fn pending(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>>;
}

#[cfg(test)]
pub(crate) mod test_util {
    /// Simple blocking executor for the boxed futures in tests.
    pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }
}

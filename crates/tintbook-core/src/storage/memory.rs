//! In-memory local store.

use super::{BoxFuture, LocalProgress, LocalStore, ProgressKey, StorageError, StorageResult, UserIndex, DEFAULT_RECENT_LIMIT};
use crate::config::SyncConfig;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store for testing and ephemeral sessions.
pub struct MemoryStore {
    entries: RwLock<HashMap<ProgressKey, LocalProgress>>,
    indexes: RwLock<HashMap<String, UserIndex>>,
    recent_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_recent_limit(DEFAULT_RECENT_LIMIT)
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with limits taken from `config`.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::with_recent_limit(config.recent_limit)
    }

    pub fn with_recent_limit(recent_limit: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            recent_limit,
        }
    }

    fn with_index<T>(&self, user_id: &str, f: impl FnOnce(&mut UserIndex) -> T) -> StorageResult<T> {
        let mut indexes = self.indexes.write().map_err(lock_error)?;
        Ok(f(indexes.entry(user_id.to_string()).or_default()))
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl LocalStore for MemoryStore {
    fn save(&self, key: &ProgressKey, entry: &LocalProgress) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        let entry = entry.clone();
        Box::pin(async move {
            self.entries.write().map_err(lock_error)?.insert(key.clone(), entry);
            self.with_index(&key.user_id, |index| index.touch_recent(&key.image_id, self.recent_limit))
        })
    }

    fn load(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<LocalProgress>> {
        let key = key.clone();
        Box::pin(async move {
            let entries = self.entries.read().map_err(lock_error)?;
            entries
                .get(&key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        })
    }

    fn delete(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            self.entries.write().map_err(lock_error)?.remove(&key);
            self.with_index(&key.user_id, |index| index.forget(&key.image_id))
        })
    }

    fn recent(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let user_id = user_id.to_string();
        Box::pin(async move { self.with_index(&user_id, |index| index.recent.clone()) })
    }

    fn mark_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            self.with_index(&key.user_id, |index| {
                index.pending.insert(key.image_id.clone());
            })
        })
    }

    fn clear_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            self.with_index(&key.user_id, |index| {
                index.pending.remove(&key.image_id);
            })
        })
    }

    fn pending(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let user_id = user_id.to_string();
        Box::pin(async move { self.with_index(&user_id, |index| index.pending.iter().cloned().collect()) })
    }
}

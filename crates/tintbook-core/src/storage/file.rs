//! File-based local store for native platforms.

use super::{BoxFuture, LocalProgress, LocalStore, ProgressKey, StorageError, StorageResult, UserIndex, DEFAULT_RECENT_LIMIT};
use crate::config::SyncConfig;
use serde::Serialize;
use std::fmt::Write as _;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name of the per-user index; entries live in a sibling directory.
const INDEX_FILE: &str = "index.json";

/// File-based local store.
///
/// Layout: `<base>/<user>/entries/<image>.json` per entry plus `<base>/<user>/index.json`
/// holding the recent and pending lists.
pub struct FileStore {
    /// Base directory for progress files.
    base_path: PathBuf,
    recent_limit: usize,
    /// Serializes read-modify-write of index files.
    index_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new file store with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self {
            base_path,
            recent_limit: DEFAULT_RECENT_LIMIT,
            index_lock: Mutex::new(()),
        })
    }

    /// Create a file store in the default location.
    ///
    /// On Unix: `~/.local/share/tintbook/progress/`
    /// On Windows: `%LOCALAPPDATA%\tintbook\progress\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("tintbook").join("progress"))
    }

    /// Create a file store under `base_path` with limits taken from `config`.
    pub fn from_config(base_path: PathBuf, config: &SyncConfig) -> StorageResult<Self> {
        Ok(Self::new(base_path)?.with_recent_limit(config.recent_limit))
    }

    pub fn with_recent_limit(mut self, recent_limit: usize) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_path.join(encode_file_name(user_id))
    }

    fn entry_path(&self, key: &ProgressKey) -> PathBuf {
        self.user_dir(&key.user_id)
            .join("entries")
            .join(format!("{}.json", encode_file_name(&key.image_id)))
    }

    fn index_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(INDEX_FILE)
    }

    fn update_index<T>(&self, user_id: &str, f: impl FnOnce(&mut UserIndex) -> T) -> StorageResult<T> {
        let _guard = self
            .index_lock
            .lock()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        let path = self.index_path(user_id);
        let mut index: UserIndex = if path.exists() { read_json(&path)? } else { UserIndex::default() };
        let result = f(&mut index);
        write_json(&path, &index)?;
        Ok(result)
    }

    fn read_index(&self, user_id: &str) -> StorageResult<UserIndex> {
        let path = self.index_path(user_id);
        if path.exists() { read_json(&path) } else { Ok(UserIndex::default()) }
    }
}

/// Encode an id as a file name.
///
/// Lowercase ASCII letters, digits, `-` and `_` pass through; every other
/// byte becomes `%XX`. The mapping is injective, so distinct ids never share
/// a file, and uppercase is escaped so case-insensitive file systems cannot
/// merge ids either.
fn encode_file_name(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
    out
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let json = serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;

    // Write to a sibling temp file first so a crash never leaves a torn entry.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::Io(format!("Failed to replace {}: {}", path.display(), e)))
}

impl LocalStore for FileStore {
    fn save(&self, key: &ProgressKey, entry: &LocalProgress) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.entry_path(key);
        let key = key.clone();
        let result = write_json(&path, entry);

        Box::pin(async move {
            result?;
            self.update_index(&key.user_id, |index| index.touch_recent(&key.image_id, self.recent_limit))
        })
    }

    fn load(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<LocalProgress>> {
        let path = self.entry_path(key);
        let key = key.clone();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(key.to_string()));
            }
            read_json(&path)
        })
    }

    fn delete(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.entry_path(key);
        let key = key.clone();

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            self.update_index(&key.user_id, |index| index.forget(&key.image_id))
        })
    }

    fn recent(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let user_id = user_id.to_string();
        Box::pin(async move { Ok(self.read_index(&user_id)?.recent) })
    }

    fn mark_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            self.update_index(&key.user_id, |index| {
                index.pending.insert(key.image_id.clone());
            })
        })
    }

    fn clear_pending(&self, key: &ProgressKey) -> BoxFuture<'_, StorageResult<()>> {
        let key = key.clone();
        Box::pin(async move {
            self.update_index(&key.user_id, |index| {
                index.pending.remove(&key.image_id);
            })
        })
    }

    fn pending(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let user_id = user_id.to_string();
        Box::pin(async move { Ok(self.read_index(&user_id)?.pending.into_iter().collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::block_on;
    use tempfile::tempdir;

    fn entry(version: u64) -> LocalProgress {
        LocalProgress {
            actions: Vec::new(),
            version,
            canvas_width: 1024.0,
            canvas_height: 768.0,
            preview_data_url: Some("data:image/png;base64,AAAA".to_string()),
            saved_at: 42,
        }
    }

    #[test]
    fn test_file_store_save_load() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let key = ProgressKey::new("kid", "castle");

        block_on(store.save(&key, &entry(4))).unwrap();
        let loaded = block_on(store.load(&key)).unwrap();

        assert_eq!(loaded, entry(4));
    }

    #[test]
    fn test_file_store_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(store.load(&ProgressKey::new("kid", "nonexistent")));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_store_recent_and_pending_persist() {
        let dir = tempdir().unwrap();
        let key = ProgressKey::new("kid", "castle");
        {
            let store = FileStore::new(dir.path().to_path_buf()).unwrap().with_recent_limit(2);
            for id in ["a", "b", "castle"] {
                block_on(store.save(&ProgressKey::new("kid", id), &entry(1))).unwrap();
            }
            block_on(store.mark_pending(&key)).unwrap();
        }

        let reopened = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(block_on(reopened.recent("kid")).unwrap(), vec!["castle", "b"]);
        assert_eq!(block_on(reopened.pending("kid")).unwrap(), vec!["castle"]);

        block_on(reopened.clear_pending(&key)).unwrap();
        assert!(block_on(reopened.pending("kid")).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_delete() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let key = ProgressKey::new("kid", "castle");

        block_on(store.save(&key, &entry(1))).unwrap();
        block_on(store.delete(&key)).unwrap();

        assert!(block_on(store.load(&key)).is_err());
        assert!(block_on(store.recent("kid")).unwrap().is_empty());
    }

    #[test]
    fn test_file_names_are_distinct_per_id() {
        let ids = ["a.b", "a_b", "a/b", "a%2Eb", "A_b", "a b", "ä", "", "castle"];
        let names: std::collections::HashSet<String> = ids.iter().map(|id| encode_file_name(id)).collect();
        assert_eq!(names.len(), ids.len());
        assert_eq!(encode_file_name("castle-2_b"), "castle-2_b");
        assert_eq!(encode_file_name("a.b"), "a%2Eb");

        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let dotted = ProgressKey::new("kid", "a.b");
        let underscored = ProgressKey::new("kid", "a_b");
        block_on(store.save(&dotted, &entry(1))).unwrap();
        block_on(store.save(&underscored, &entry(2))).unwrap();

        assert_eq!(block_on(store.load(&dotted)).unwrap().version, 1);
        assert_eq!(block_on(store.load(&underscored)).unwrap().version, 2);
        block_on(store.delete(&dotted)).unwrap();
        assert_eq!(block_on(store.load(&underscored)).unwrap().version, 2);
    }

    #[test]
    fn test_recent_limit_from_config() {
        let dir = tempdir().unwrap();
        let config = SyncConfig {
            recent_limit: 1,
            ..SyncConfig::default()
        };
        let store = FileStore::from_config(dir.path().to_path_buf(), &config).unwrap();
        block_on(store.save(&ProgressKey::new("kid", "a"), &entry(1))).unwrap();
        block_on(store.save(&ProgressKey::new("kid", "b"), &entry(1))).unwrap();

        assert_eq!(block_on(store.recent("kid")).unwrap(), vec!["b"]);
    }

    #[test]
    fn test_file_store_keeps_ids_inside_base() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let key = ProgressKey::new("user@example.com", "../escape/attempt");

        block_on(store.save(&key, &entry(2))).unwrap();
        let loaded = block_on(store.load(&key)).unwrap();
        assert_eq!(loaded.version, 2);

        for file in walk(dir.path()) {
            assert!(file.starts_with(dir.path()));
        }
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path);
            }
        }
        out
    }
}

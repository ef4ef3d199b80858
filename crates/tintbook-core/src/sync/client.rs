//! Local-first persistence with optimistic server sync.

use super::cycle::{SaveCycle, Step, SyncOutcome};
use super::{ApiError, ProgressApi, SyncError};
use crate::action::{Action, decode_actions, now_millis};
use crate::normalize::normalize_actions;
use crate::progress::SaveRequest;
use crate::storage::{LocalProgress, LocalStore, ProgressKey, StorageError, StorageResult};
use kurbo::Size;
use std::sync::Arc;

/// Where loaded progress came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Server,
    LocalCache,
    /// Nothing saved anywhere.
    Empty,
}

/// Progress ready to replay on a canvas.
#[derive(Debug, Clone)]
pub struct LoadedProgress {
    /// Decoded actions, already normalized to the requested canvas size.
    pub actions: Vec<Action>,
    pub version: u64,
    pub origin: LoadOrigin,
    /// Records dropped because they could not be decoded.
    pub dropped: usize,
}

impl LoadedProgress {
    fn empty() -> Self {
        Self {
            actions: Vec::new(),
            version: 0,
            origin: LoadOrigin::Empty,
            dropped: 0,
        }
    }
}

/// Result of pushing one entry to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub outcome: SyncOutcome,
    /// Version the device should use for its next save.
    pub version: u64,
}

/// Tally of a pending-sync sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub synced: usize,
    pub still_pending: usize,
    pub failed: usize,
}

/// Owns the local store and the remote API for one device.
pub struct SyncClient<S: LocalStore, A: ProgressApi> {
    store: Arc<S>,
    api: Arc<A>,
}

impl<S: LocalStore, A: ProgressApi> Clone for SyncClient<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            api: self.api.clone(),
        }
    }
}

impl<S: LocalStore, A: ProgressApi> SyncClient<S, A> {
    pub fn new(store: Arc<S>, api: Arc<A>) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Write locally, then push to the server.
    ///
    /// Only a local write failure is an error; server trouble is reported in
    /// the returned [`SaveReport`].
    pub async fn save(&self, key: &ProgressKey, entry: &LocalProgress) -> StorageResult<SaveReport> {
        self.store.save(key, entry).await?;
        Ok(self.push(key, entry).await)
    }

    /// Send a locally saved entry to the server.
    ///
    /// A conflict is retried once with the server's version. Transient
    /// failures flag the image as pending; success clears the flag.
    pub async fn push(&self, key: &ProgressKey, entry: &LocalProgress) -> SaveReport {
        let mut request = SaveRequest {
            coloring_image_id: key.image_id.clone(),
            actions: entry.actions.clone(),
            version: entry.version,
            canvas_width: entry.canvas_width,
            canvas_height: entry.canvas_height,
            preview_data_url: entry.preview_data_url.clone(),
        };

        let mut cycle = SaveCycle::new(entry.version);
        cycle.mark_dirty();
        let outcome = loop {
            request.version = cycle.start();
            let result = self.api.save(&key.user_id, &request).await;
            match cycle.on_response(result) {
                Step::Retry { version } => {
                    log::info!("Version conflict on {}, retrying at server version {}", key, version);
                    self.adopt_version(key, version).await;
                }
                Step::Finished(outcome) => break outcome,
            }
        };

        match &outcome {
            SyncOutcome::Synced { version, .. } => {
                log::debug!("Synced {} at version {}", key, version);
                self.adopt_version(key, *version).await;
                if let Err(e) = self.store.clear_pending(key).await {
                    log::warn!("Failed to clear pending flag for {}: {}", key, e);
                }
            }
            SyncOutcome::Pending(e) => {
                log::info!("Sync of {} deferred: {}", key, e);
                if let Err(e) = self.store.mark_pending(key).await {
                    log::warn!("Failed to flag {} as pending: {}", key, e);
                }
            }
            SyncOutcome::Failed(e) => {
                log::warn!("Sync of {} failed: {}", key, e);
                if let SyncError::ConflictAfterRetry { current_version } = e {
                    self.adopt_version(key, *current_version).await;
                }
            }
        }

        SaveReport {
            outcome,
            version: cycle.version(),
        }
    }

    /// Load progress for an image, normalized to `canvas`.
    ///
    /// The server is asked first and is authoritative: a hit replaces the
    /// local entry and clears its pending flag, and a 404 deletes the local
    /// entry along with its flags. Transport and auth failures fall back to
    /// the local entry.
    pub async fn load(&self, key: &ProgressKey, canvas: Size) -> LoadedProgress {
        let local = match self.store.load(key).await {
            Ok(entry) => Some(entry),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => {
                log::warn!("Failed to read local progress for {}: {}", key, e);
                None
            }
        };

        match self.api.load(&key.user_id, &key.image_id).await {
            Ok(remote) => {
                let entry = LocalProgress {
                    actions: remote.actions,
                    version: remote.version,
                    canvas_width: remote.canvas_width,
                    canvas_height: remote.canvas_height,
                    preview_data_url: local.and_then(|l| l.preview_data_url),
                    saved_at: now_millis(),
                };
                if let Err(e) = self.store.save(key, &entry).await {
                    log::warn!("Failed to cache server progress for {}: {}", key, e);
                }
                if let Err(e) = self.store.clear_pending(key).await {
                    log::warn!("Failed to clear pending flag for {}: {}", key, e);
                }
                Self::replayable(&entry, LoadOrigin::Server, canvas)
            }
            Err(ApiError::NotFound) => {
                if local.is_some() {
                    log::info!("Server has no progress for {}, clearing local copy", key);
                }
                if let Err(e) = self.store.delete(key).await {
                    log::warn!("Failed to clear local progress for {}: {}", key, e);
                }
                LoadedProgress::empty()
            }
            Err(e) => {
                log::info!("Loading {} from local cache: {}", key, e);
                match local {
                    Some(entry) => Self::replayable(&entry, LoadOrigin::LocalCache, canvas),
                    None => LoadedProgress::empty(),
                }
            }
        }
    }

    /// Retry every pending image of a user. Flags clear only on success.
    pub async fn sync_pending(&self, user_id: &str) -> SweepReport {
        let mut report = SweepReport::default();
        let ids = match self.store.pending(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!("Failed to list pending syncs for {}: {}", user_id, e);
                return report;
            }
        };

        for image_id in ids {
            let key = ProgressKey::new(user_id, image_id);
            let entry = match self.store.load(&key).await {
                Ok(entry) => entry,
                Err(StorageError::NotFound(_)) => {
                    // Nothing left to send.
                    if let Err(e) = self.store.clear_pending(&key).await {
                        log::warn!("Failed to clear pending flag for {}: {}", key, e);
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("Skipping pending {}: {}", key, e);
                    report.still_pending += 1;
                    continue;
                }
            };

            report.attempted += 1;
            match self.push(&key, &entry).await.outcome {
                SyncOutcome::Synced { .. } => report.synced += 1,
                SyncOutcome::Pending(_) => report.still_pending += 1,
                SyncOutcome::Failed(_) => report.failed += 1,
            }
        }

        if report.attempted > 0 {
            log::info!(
                "Pending sweep for {}: {} synced, {} still pending, {} failed",
                user_id,
                report.synced,
                report.still_pending,
                report.failed
            );
        }
        report
    }

    /// Record a newly observed server version on the local entry.
    async fn adopt_version(&self, key: &ProgressKey, version: u64) {
        let result = async {
            let mut entry = self.store.load(key).await?;
            if entry.version != version {
                entry.version = version;
                self.store.save(key, &entry).await?;
            }
            Ok::<_, StorageError>(())
        };
        if let Err(e) = result.await {
            log::warn!("Failed to record version {} for {}: {}", version, key, e);
        }
    }

    fn replayable(entry: &LocalProgress, origin: LoadOrigin, canvas: Size) -> LoadedProgress {
        let mut actions = decode_actions(&entry.actions);
        let dropped = entry.actions.len() - actions.len();
        normalize_actions(&mut actions, canvas);
        LoadedProgress {
            actions,
            version: entry.version,
            origin,
            dropped,
        }
    }
}

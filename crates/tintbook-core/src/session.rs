//! One user's coloring session on one image.
//!
//! The session owns the history, the autosave debounce and the last server
//! version it has seen. Editing is synchronous; saving is handed to the host
//! as a [`SaveJob`] it can run in the background.

use crate::action::{Action, Fill, MagicFill, encode_actions, now_millis};
use crate::config::SyncConfig;
use crate::fill::{FillEngine, FillOptions};
use crate::history::History;
use crate::normalize::ScaleFactors;
use crate::preview::try_capture_preview;
use crate::storage::{AutosaveTimer, LocalProgress, LocalStore, ProgressKey, StorageResult};
use crate::sync::{LoadOrigin, ProgressApi, SaveReport, SyncClient};
use image::RgbaImage;
use kurbo::{Point, Size};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Editing state and save scheduling for one (user, image) pair.
pub struct ColoringSession<S: LocalStore, A: ProgressApi> {
    key: ProgressKey,
    /// Coordinate space actions are authored in.
    canvas: Size,
    history: History,
    /// Last server version observed, shared with running save jobs.
    version: Arc<AtomicU64>,
    dirty: Arc<AtomicBool>,
    autosave: AutosaveTimer,
    client: SyncClient<S, A>,
    engine: FillEngine,
}

impl<S: LocalStore, A: ProgressApi> ColoringSession<S, A> {
    pub fn new(client: SyncClient<S, A>, key: ProgressKey, canvas: Size) -> Self {
        Self {
            key,
            canvas,
            history: History::new(),
            version: Arc::new(AtomicU64::new(0)),
            dirty: Arc::new(AtomicBool::new(false)),
            autosave: AutosaveTimer::default(),
            client,
            engine: FillEngine::default(),
        }
    }

    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.autosave = AutosaveTimer::new(config.autosave_delay());
        self
    }

    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave = AutosaveTimer::new(delay);
        self
    }

    pub fn with_fill_options(mut self, options: FillOptions) -> Self {
        self.engine = FillEngine::new(options);
        self
    }

    /// Replace the history with saved progress, normalized to this canvas.
    pub async fn load(&mut self) -> LoadOrigin {
        let loaded = self.client.load(&self.key, self.canvas).await;
        if loaded.dropped > 0 {
            log::warn!("Dropped {} unreadable actions loading {}", loaded.dropped, self.key);
        }
        log::info!(
            "Loaded {} actions for {} from {:?} at version {}",
            loaded.actions.len(),
            self.key,
            loaded.origin,
            loaded.version
        );
        self.history = History::from_actions(loaded.actions);
        self.version.store(loaded.version, Ordering::SeqCst);
        self.dirty.store(false, Ordering::SeqCst);
        self.autosave.cancel();
        loaded.origin
    }

    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn client(&self) -> &SyncClient<S, A> {
        &self.client
    }

    /// Last server version this session has seen.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Whether there are changes no save job has picked up yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn autosave_scheduled(&self) -> bool {
        self.autosave.is_scheduled()
    }

    pub fn add_action(&mut self, action: Action, now: Instant) {
        self.history.add(action);
        self.changed(now);
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        let moved = self.history.undo();
        if moved {
            self.changed(now);
        }
        moved
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        let moved = self.history.redo();
        if moved {
            self.changed(now);
        }
        moved
    }

    pub fn reset(&mut self, now: Instant) {
        self.history.reset();
        self.changed(now);
    }

    /// Bucket-fill `drawing` with `fill.at` given in canvas space.
    ///
    /// The fill is recorded only if it painted something; an invalid seed
    /// leaves both the raster and the history untouched.
    pub fn apply_fill(&mut self, drawing: &mut RgbaImage, line_art: &RgbaImage, fill: Fill, now: Instant) -> bool {
        let raster = Size::new(drawing.width() as f64, drawing.height() as f64);
        let pixel_fill = Fill {
            at: self.canvas_to_raster(fill.at, raster),
            ..fill.clone()
        };
        if !self.engine.fill(drawing, line_art, &pixel_fill) {
            return false;
        }
        self.add_action(Action::fill(fill, self.canvas), now);
        true
    }

    /// Apply a magic fill whose seeds are in `drawing`'s pixel space.
    ///
    /// Recorded as one action, sourced in raster space, if any entry filled.
    pub fn apply_magic_fill(
        &mut self,
        drawing: &mut RgbaImage,
        line_art: &RgbaImage,
        magic: MagicFill,
        now: Instant,
    ) -> usize {
        let filled = self.engine.apply_magic_fill(drawing, line_art, &magic);
        if filled > 0 {
            let raster = Size::new(drawing.width() as f64, drawing.height() as f64);
            self.add_action(Action::magic_fill(magic, raster), now);
        }
        filled
    }

    /// Poll the debounce timer. Returns a save job once it comes due.
    pub fn tick(&mut self, now: Instant, preview: Option<&RgbaImage>) -> Option<SaveJob<S, A>> {
        if self.autosave.fire(now) {
            self.take_job(preview)
        } else {
            None
        }
    }

    /// Save right away, superseding any scheduled autosave.
    pub fn flush(&mut self, preview: Option<&RgbaImage>) -> Option<SaveJob<S, A>> {
        self.autosave.cancel();
        self.take_job(preview)
    }

    /// The session is going away: cancel the debounce and flush.
    pub fn teardown(&mut self, preview: Option<&RgbaImage>) -> Option<SaveJob<S, A>> {
        log::debug!("Tearing down session for {}", self.key);
        self.flush(preview)
    }

    /// Snapshot the visible history for saving.
    pub fn snapshot(&self, preview: Option<&RgbaImage>) -> Option<LocalProgress> {
        let actions = match encode_actions(self.history.visible()) {
            Ok(actions) => actions,
            Err(e) => {
                log::error!("Failed to encode actions for {}: {}", self.key, e);
                return None;
            }
        };
        Some(LocalProgress {
            actions,
            version: self.version(),
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
            preview_data_url: try_capture_preview(preview),
            saved_at: now_millis(),
        })
    }

    fn take_job(&mut self, preview: Option<&RgbaImage>) -> Option<SaveJob<S, A>> {
        if !self.is_dirty() {
            return None;
        }
        let entry = self.snapshot(preview)?;
        self.dirty.store(false, Ordering::SeqCst);
        Some(SaveJob {
            client: self.client.clone(),
            key: self.key.clone(),
            entry,
            version: self.version.clone(),
            dirty: self.dirty.clone(),
        })
    }

    fn changed(&mut self, now: Instant) {
        self.dirty.store(true, Ordering::SeqCst);
        self.autosave.touch(now);
    }

    fn canvas_to_raster(&self, at: Point, raster: Size) -> Point {
        match ScaleFactors::between(self.canvas, raster) {
            Some(scale) => scale.point(at),
            None => at,
        }
    }
}

/// A snapshot on its way to local storage and then the server.
pub struct SaveJob<S: LocalStore, A: ProgressApi> {
    client: SyncClient<S, A>,
    key: ProgressKey,
    entry: LocalProgress,
    version: Arc<AtomicU64>,
    dirty: Arc<AtomicBool>,
}

impl<S: LocalStore, A: ProgressApi> SaveJob<S, A> {
    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    pub fn entry(&self) -> &LocalProgress {
        &self.entry
    }

    /// Write locally, then sync. Server trouble never fails the job; a local
    /// write failure does, and marks the session dirty again.
    pub async fn run(self) -> StorageResult<SaveReport> {
        match self.client.save(&self.key, &self.entry).await {
            Ok(report) => {
                self.version.fetch_max(report.version, Ordering::SeqCst);
                Ok(report)
            }
            Err(e) => {
                log::error!("Local save of {} failed: {}", self.key, e);
                self.dirty.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

//! In-process progress API with the server's versioning rules.

use super::{ApiError, ApiResult, ProgressApi};
use crate::action::now_millis;
use crate::progress::{LoadResponse, ProgressRecord, SaveRejected, SaveRequest, apply_save};
use crate::storage::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type RecordKey = (String, String);

/// Progress API backed by a map, for tests and offline demos.
///
/// Failures can be scripted with [`fail_next`](Self::fail_next); each
/// scripted error is returned by the next call, save or load, in order.
#[derive(Default)]
pub struct MemoryProgressApi {
    records: Mutex<HashMap<RecordKey, ProgressRecord>>,
    failures: Mutex<VecDeque<ApiError>>,
    saves: AtomicUsize,
}

impl MemoryProgressApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next call.
    pub fn fail_next(&self, error: ApiError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// Current stored record, if any.
    pub fn record(&self, user_id: &str, image_id: &str) -> Option<ProgressRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(&(user_id.to_string(), image_id.to_string())).cloned())
    }

    /// Seed a stored record, as if another device had saved it.
    pub fn insert(&self, user_id: &str, image_id: &str, record: ProgressRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert((user_id.to_string(), image_id.to_string()), record);
        }
    }

    /// Number of save requests received.
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self) -> Option<ApiError> {
        self.failures.lock().ok().and_then(|mut failures| failures.pop_front())
    }

    fn lock_records(&self) -> ApiResult<std::sync::MutexGuard<'_, HashMap<RecordKey, ProgressRecord>>> {
        self.records.lock().map_err(|e| ApiError::Server {
            status: 500,
            message: format!("Lock error: {}", e),
        })
    }
}

impl ProgressApi for MemoryProgressApi {
    fn save(&self, user_id: &str, request: &SaveRequest) -> BoxFuture<'_, ApiResult<u64>> {
        let key = (user_id.to_string(), request.coloring_image_id.clone());
        let request = request.clone();
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.scripted_failure() {
                return Err(error);
            }
            if key.0.is_empty() {
                return Err(ApiError::Unauthorized);
            }

            let mut records = self.lock_records()?;
            let mut slot = records.remove(&key);
            let result = apply_save(&mut slot, request, now_millis());
            if let Some(record) = slot {
                records.insert(key, record);
            }
            result.map_err(|rejected| match rejected {
                SaveRejected::Conflict { current_version } => ApiError::Conflict { current_version },
                SaveRejected::VersionOverflow { .. } => ApiError::Rejected(rejected.to_string()),
            })
        })
    }

    fn load(&self, user_id: &str, image_id: &str) -> BoxFuture<'_, ApiResult<LoadResponse>> {
        let key = (user_id.to_string(), image_id.to_string());
        Box::pin(async move {
            if let Some(error) = self.scripted_failure() {
                return Err(error);
            }
            if key.0.is_empty() {
                return Err(ApiError::Unauthorized);
            }
            self.lock_records()?
                .get(&key)
                .map(ProgressRecord::to_load_response)
                .ok_or(ApiError::NotFound)
        })
    }
}

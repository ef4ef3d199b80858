//! Tintbook progress server
//!
//! Keeps the canonical progress record per (user, coloring image) behind an
//! optimistic version lock.
//!
//! ## Endpoints
//!
//! ```text
//! PUT    /api/progress/{coloringImageId}   save, 200 { version } | 409 { currentVersion }
//! GET    /api/progress/{coloringImageId}   load, 200 { actions, version, canvasWidth, canvasHeight } | 404
//! DELETE /api/progress/{coloringImageId}   204 | 404
//! GET    /health
//! ```
//!
//! Every progress route needs `Authorization: Bearer <userId>`.

pub mod auth;
pub mod config;
pub mod error;

use auth::UserId;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use dashmap::DashMap;
use error::{ServerError, ServerResult};
use std::sync::Arc;
use tintbook_core::action::now_millis;
use tintbook_core::progress::{LoadResponse, ProgressRecord, SaveRejected, SaveRequest, SaveResponse, apply_save};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

type RecordKey = (String, String);

/// Shared application state
#[derive(Default)]
pub struct AppState {
    /// Records by (user id, coloring image id). A slot is only ever `None`
    /// while a first save is being applied under the entry lock.
    records: DashMap<RecordKey, Option<ProgressRecord>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a save under the record's entry lock.
    pub fn save(&self, user_id: &str, request: SaveRequest) -> Result<u64, SaveRejected> {
        let key = (user_id.to_string(), request.coloring_image_id.clone());
        let mut slot = self.records.entry(key).or_default();
        apply_save(&mut slot, request, now_millis())
    }

    pub fn load(&self, user_id: &str, image_id: &str) -> Option<LoadResponse> {
        let key = (user_id.to_string(), image_id.to_string());
        self.records
            .get(&key)
            .and_then(|slot| slot.value().as_ref().map(ProgressRecord::to_load_response))
    }

    /// Remove a record. Returns whether one existed.
    pub fn delete(&self, user_id: &str, image_id: &str) -> bool {
        let key = (user_id.to_string(), image_id.to_string());
        self.records.remove(&key).and_then(|(_, slot)| slot).is_some()
    }
}

/// Build the router over `state`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/progress/{image_id}",
            get(load_progress).put(save_progress).delete(delete_progress),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn save_progress(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Path(image_id): Path<String>,
    Json(request): Json<SaveRequest>,
) -> ServerResult<Json<SaveResponse>> {
    if request.coloring_image_id != image_id {
        return Err(ServerError::BadRequest(format!(
            "Body is for {}, path is for {}",
            request.coloring_image_id, image_id
        )));
    }

    let sent = request.version;
    let actions = request.actions.len();
    match state.save(&user_id, request) {
        Ok(version) => {
            info!("Saved {}/{} at version {} ({} actions)", user_id, image_id, version, actions);
            Ok(Json(SaveResponse { version }))
        }
        Err(SaveRejected::Conflict { current_version }) => {
            debug!(
                "Rejected {}/{} at version {}, current is {}",
                user_id, image_id, sent, current_version
            );
            Err(ServerError::Conflict { current_version })
        }
        Err(rejected @ SaveRejected::VersionOverflow { .. }) => {
            debug!("Rejected {}/{}: {}", user_id, image_id, rejected);
            Err(ServerError::BadRequest(rejected.to_string()))
        }
    }
}

async fn load_progress(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Path(image_id): Path<String>,
) -> ServerResult<Json<LoadResponse>> {
    state
        .load(&user_id, &image_id)
        .map(Json)
        .ok_or(ServerError::NotFound(image_id))
}

async fn delete_progress(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Path(image_id): Path<String>,
) -> ServerResult<StatusCode> {
    if state.delete(&user_id, &image_id) {
        info!("Deleted {}/{}", user_id, image_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(image_id))
    }
}

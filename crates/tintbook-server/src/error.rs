//! Handler errors and their HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tintbook_core::progress::{ConflictResponse, ErrorResponse};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Missing or malformed bearer token")]
    Unauthorized,
    #[error("No progress for {0}")]
    NotFound(String),
    #[error("Version conflict, server is at {current_version}")]
    Conflict { current_version: u64 },
    #[error("{0}")]
    BadRequest(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Conflict { current_version } => {
                let body = ConflictResponse {
                    current_version: *current_version,
                };
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse { error: self.to_string() };
        (status, Json(body)).into_response()
    }
}

//! HTTP transport for the progress API.

use super::{ApiError, ApiResult, ProgressApi};
use crate::config::SyncConfig;
use crate::progress::{ConflictResponse, ErrorResponse, LoadResponse, SaveRequest, SaveResponse};
use crate::storage::BoxFuture;
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

/// Progress API client speaking JSON over HTTP.
///
/// `PUT {base}/api/progress/{image}` saves, `GET` loads; the user id travels
/// as a bearer token.
pub struct HttpProgressApi {
    client: Client,
    base_url: Url,
}

impl HttpProgressApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Config(format!("{}: {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &SyncConfig) -> ApiResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }

    fn progress_url(&self, image_id: &str) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "progress", image_id]);
        Ok(url)
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

/// Map a non-success, non-conflict response onto the error taxonomy.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body),
        Err(e) => e.to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
        },
        _ => ApiError::Rejected(message),
    }
}

impl ProgressApi for HttpProgressApi {
    fn save(&self, user_id: &str, request: &SaveRequest) -> BoxFuture<'_, ApiResult<u64>> {
        let url = self.progress_url(&request.coloring_image_id);
        let token = user_id.to_string();
        let body = request.clone();

        Box::pin(async move {
            let response = self
                .client
                .put(url?)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
                .map_err(network_error)?;

            match response.status() {
                s if s.is_success() => {
                    let saved: SaveResponse = response.json().await.map_err(network_error)?;
                    Ok(saved.version)
                }
                StatusCode::CONFLICT => {
                    let conflict: ConflictResponse = response.json().await.map_err(network_error)?;
                    Err(ApiError::Conflict {
                        current_version: conflict.current_version,
                    })
                }
                _ => Err(error_from_response(response).await),
            }
        })
    }

    fn load(&self, user_id: &str, image_id: &str) -> BoxFuture<'_, ApiResult<LoadResponse>> {
        let url = self.progress_url(image_id);
        let token = user_id.to_string();

        Box::pin(async move {
            let response = self
                .client
                .get(url?)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(network_error)?;

            if response.status().is_success() {
                response.json().await.map_err(network_error)
            } else {
                Err(error_from_response(response).await)
            }
        })
    }
}

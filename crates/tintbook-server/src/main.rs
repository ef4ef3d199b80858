//! Tintbook progress server binary.

use std::sync::Arc;
use tintbook_server::config::ServerConfig;
use tintbook_server::{AppState, app};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tintbook_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new());

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Tintbook progress server listening on {}", config.bind);
    info!("Progress endpoint: http://{}/api/progress/{{coloringImageId}}", config.bind);

    axum::serve(listener, app(state)).await
}

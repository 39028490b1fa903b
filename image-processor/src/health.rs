//! Health check server running next to the event consumer

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default port of the health server
pub const DEFAULT_HEALTH_PORT: u16 = 8002;

/// Liveness endpoint of the image processor
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "image-processor",
            "semver": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Router serving `GET /health`
#[must_use]
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Start the health check HTTP server
///
/// # Errors
///
/// Returns an error if `PORT` is malformed or the server fails to bind to the address
pub async fn start_health_server(shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(DEFAULT_HEALTH_PORT), |p| p.parse())?,
    ));
    let listener = TcpListener::bind(addr).await?;
    info!("Health check server listening on {}", addr);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    Ok(())
}

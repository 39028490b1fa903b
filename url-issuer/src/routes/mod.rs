mod health;
/// Presigned URL endpoints
pub mod urls;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::types::AppError;

/// Creates the router with all handler routes
#[must_use]
pub fn handler() -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route(
            "/generate-upload-url",
            post(urls::generate_upload_url).options(urls::preflight),
        )
        .route(
            "/get-processed-image-url",
            get(urls::get_processed_image_url).options(urls::preflight),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::route_not_found()
}

async fn method_not_allowed() -> AppError {
    AppError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        "Method Not Allowed",
    )
}

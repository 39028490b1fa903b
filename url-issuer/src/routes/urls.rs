use std::sync::Arc;

use axum::{Extension, Json};
use image_storage::object_store::PresignedUrl;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    issuer::{DownloadUrlRequest, UploadUrlRequest, UrlIssuer},
    types::{AppError, JsonBody, QueryParams},
};

/// Body returned by both URL endpoints
#[derive(Debug, Serialize)]
pub struct UrlResponse {
    /// Presigned URL
    pub url: String,
    /// Expiry as an RFC 3339 UTC timestamp
    pub expires_at: String,
}

impl From<PresignedUrl> for UrlResponse {
    fn from(presigned: PresignedUrl) -> Self {
        Self {
            url: presigned.url,
            expires_at: presigned.expires_at.to_rfc3339(),
        }
    }
}

/// `POST /generate-upload-url`: URL for one upload of `filename` with `contentType`
#[instrument(skip(issuer, payload))]
pub async fn generate_upload_url(
    Extension(issuer): Extension<Arc<UrlIssuer>>,
    JsonBody(payload): JsonBody<UploadUrlRequest>,
) -> Result<Json<UrlResponse>, AppError> {
    let presigned = issuer
        .issue_upload_url(&payload)
        .await
        .map_err(|e| AppError::from_issuer(e, "Could not generate upload URL"))?;

    Ok(Json(presigned.into()))
}

/// `GET /get-processed-image-url?filename=`: URL for one download of an existing derived image
#[instrument(skip(issuer, query))]
pub async fn get_processed_image_url(
    Extension(issuer): Extension<Arc<UrlIssuer>>,
    QueryParams(query): QueryParams<DownloadUrlRequest>,
) -> Result<Json<UrlResponse>, AppError> {
    let presigned = issuer
        .issue_download_url(&query)
        .await
        .map_err(|e| AppError::from_issuer(e, "Could not generate URL"))?;

    Ok(Json(presigned.into()))
}

/// CORS preflight; the CORS headers themselves are added by the router
pub async fn preflight() -> Json<Value> {
    Json(json!({}))
}

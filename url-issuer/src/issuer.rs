//! Presigned URL issuing
//!
//! Both operations are read-only against the stores: the upload URL is minted without any
//! existence check (overwrites are allowed), the download URL only after a HEAD confirms the
//! derived image exists.

use std::sync::Arc;
use std::time::Duration;

use image_storage::{
    environment::ServiceConfig,
    object_store::{ObjectStore, ObjectStoreError, PresignedUrl, SignedMethod},
};
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use validator::Validate;

/// Result type for URL issuing
pub type IssuerResult<T> = Result<T, IssuerError>;

/// Errors that can occur while issuing a URL
#[derive(Error, Debug)]
pub enum IssuerError {
    /// Caller-supplied input is missing or empty
    #[error("{0}")]
    Validation(&'static str),

    /// The requested derived image does not exist
    #[error("File not found")]
    NotFound,

    /// The object store failed
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

/// Body of `POST /generate-upload-url`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UploadUrlRequest {
    /// Object key to upload to
    #[serde(default)]
    #[validate(length(min = 1))]
    pub filename: String,
    /// Content type the upload must be sent with
    #[serde(default, rename = "contentType")]
    #[validate(length(min = 1))]
    pub content_type: String,
}

/// Query of `GET /get-processed-image-url`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DownloadUrlRequest {
    /// Key of the derived image
    #[serde(default)]
    #[validate(length(min = 1))]
    pub filename: String,
}

/// Mints presigned upload and download URLs
pub struct UrlIssuer {
    object_store: Arc<dyn ObjectStore>,
    upload_container: String,
    processed_container: String,
    url_ttl: Duration,
}

impl UrlIssuer {
    /// Message returned when an upload request lacks a field
    pub const MISSING_UPLOAD_FIELDS: &'static str = "Missing filename or contentType";
    /// Message returned when a download request lacks a filename
    pub const MISSING_FILENAME: &'static str = "Missing filename";

    /// Creates an issuer for the configured buckets and URL lifetime
    #[must_use]
    pub fn new(object_store: Arc<dyn ObjectStore>, config: &ServiceConfig) -> Self {
        Self {
            object_store,
            upload_container: config.upload_container.clone(),
            processed_container: config.processed_container.clone(),
            url_ttl: config.url_ttl(),
        }
    }

    /// Mints a URL authorizing one PUT of `filename` into the upload bucket
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::Validation` if `filename` or `content_type` is empty
    /// Returns `IssuerError::Store` if signing fails
    #[instrument(skip(self), fields(filename = %request.filename))]
    pub async fn issue_upload_url(&self, request: &UploadUrlRequest) -> IssuerResult<PresignedUrl> {
        request
            .validate()
            .map_err(|_| IssuerError::Validation(Self::MISSING_UPLOAD_FIELDS))?;

        let url = self
            .object_store
            .sign_url(
                SignedMethod::Put,
                &self.upload_container,
                &request.filename,
                Some(&request.content_type),
                self.url_ttl,
            )
            .await?;

        counter!("url_issuer.urls_issued", "operation" => "upload").increment(1);
        Ok(url)
    }

    /// Mints a URL authorizing one GET of `filename` from the processed bucket
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::Validation` if `filename` is empty
    /// Returns `IssuerError::NotFound` if the derived image does not exist
    /// Returns `IssuerError::Store` if the existence check or signing fails
    #[instrument(skip(self), fields(filename = %request.filename))]
    pub async fn issue_download_url(
        &self,
        request: &DownloadUrlRequest,
    ) -> IssuerResult<PresignedUrl> {
        request
            .validate()
            .map_err(|_| IssuerError::Validation(Self::MISSING_FILENAME))?;

        let exists = self
            .object_store
            .head(&self.processed_container, &request.filename)
            .await?;
        if !exists {
            debug!("Derived image not found");
            return Err(IssuerError::NotFound);
        }

        let url = self
            .object_store
            .sign_url(
                SignedMethod::Get,
                &self.processed_container,
                &request.filename,
                None,
                self.url_ttl,
            )
            .await?;

        counter!("url_issuer.urls_issued", "operation" => "download").increment(1);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use image_storage::object_store::{InMemoryObjectStore, ObjectOperation};
    use pretty_assertions::assert_eq;

    use super::*;

    fn issuer() -> (Arc<InMemoryObjectStore>, UrlIssuer) {
        let store = Arc::new(InMemoryObjectStore::new());
        let issuer = UrlIssuer::new(store.clone(), &ServiceConfig::default());
        (store, issuer)
    }

    fn upload(filename: &str, content_type: &str) -> UploadUrlRequest {
        UploadUrlRequest {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_url_binds_bucket_key_and_content_type() {
        let (store, issuer) = issuer();

        let url = issuer
            .issue_upload_url(&upload("cat.png", "image/png"))
            .await
            .unwrap();

        assert!(url.url.contains("uploaded-images/cat.png"));
        let signed = store.signed_urls();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].method, SignedMethod::Put);
        assert_eq!(signed[0].container, "uploaded-images");
        assert_eq!(signed[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(signed[0].ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_upload_url_requires_both_fields() {
        let (store, issuer) = issuer();

        for request in [upload("", "image/png"), upload("cat.png", ""), upload("", "")] {
            let result = issuer.issue_upload_url(&request).await;
            assert!(matches!(
                result,
                Err(IssuerError::Validation(UrlIssuer::MISSING_UPLOAD_FIELDS))
            ));
        }
        assert!(store.signed_urls().is_empty());
    }

    #[tokio::test]
    async fn test_download_url_requires_existing_object() {
        let (store, issuer) = issuer();
        let request = DownloadUrlRequest {
            filename: "processed-cat.png".to_string(),
        };

        let missing = issuer.issue_download_url(&request).await;
        assert!(matches!(missing, Err(IssuerError::NotFound)));
        assert!(store.signed_urls().is_empty());

        store.insert("processed-images", "processed-cat.png", vec![1, 2, 3]);
        issuer.issue_download_url(&request).await.unwrap();

        let signed = store.signed_urls();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].method, SignedMethod::Get);
        assert_eq!(signed[0].container, "processed-images");
        assert_eq!(signed[0].content_type, None);
    }

    #[tokio::test]
    async fn test_download_store_failure_is_not_not_found() {
        let (store, issuer) = issuer();
        store.fail_on(ObjectOperation::Head, "processed-cat.png");

        let result = issuer
            .issue_download_url(&DownloadUrlRequest {
                filename: "processed-cat.png".to_string(),
            })
            .await;

        assert!(matches!(result, Err(IssuerError::Store(_))));
    }
}

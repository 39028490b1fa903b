use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client as S3Client};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ObjectStore, ObjectStoreError, ObjectStoreResult, PresignedUrl, SignedMethod};

/// S3-backed object store
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
}

impl S3ObjectStore {
    /// Creates a new S3 object store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, container: &str, key: &str) -> ObjectStoreResult<Vec<u8>> {
        let output = self
            .s3_client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await?;

        let body = output.body.collect().await.map_err(|e| {
            ObjectStoreError::S3Error(format!("Failed to read object body: {e}"))
        })?;

        Ok(body.into_bytes().to_vec())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        debug!(container, key, size = body.len(), "Writing object");

        self.s3_client
            .put_object()
            .bucket(container)
            .key(key)
            .set_content_type(content_type.map(ToString::to_string))
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(())
    }

    async fn head(&self, container: &str, key: &str) -> ObjectStoreResult<bool> {
        let result = self
            .s3_client
            .head_object()
            .bucket(container)
            .key(key)
            .send()
            .await;

        match result.map_err(ObjectStoreError::from) {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn sign_url(
        &self,
        method: SignedMethod,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> ObjectStoreResult<PresignedUrl> {
        let presigned_config = PresigningConfig::expires_in(ttl).map_err(|e| {
            ObjectStoreError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned_request = match method {
            SignedMethod::Put => self
                .s3_client
                .put_object()
                .bucket(container)
                .key(key)
                .set_content_type(content_type.map(ToString::to_string))
                .presigned(presigned_config)
                .await
                .map_err(|e| e.to_string()),
            SignedMethod::Get => self
                .s3_client
                .get_object()
                .bucket(container)
                .key(key)
                .presigned(presigned_config)
                .await
                .map_err(|e| e.to_string()),
        }
        .map_err(|e| ObjectStoreError::S3Error(format!("Failed to generate presigned URL: {e}")))?;

        let expires_at: DateTime<Utc> = Utc::now() + ttl;

        debug!(%method, container, key, %expires_at, "Generated presigned URL");

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at,
        })
    }
}

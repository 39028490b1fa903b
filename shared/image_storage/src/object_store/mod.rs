//! Object storage integration
//!
//! The [`ObjectStore`] trait is the narrow capability both services consume: fetch, write and
//! probe objects identified by `(container, key)`, and sign time-boxed URLs for a single GET or
//! PUT. [`S3ObjectStore`] is the production implementation.

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod s3;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strum::Display;

pub use error::{ObjectStoreError, ObjectStoreResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryObjectStore, ObjectOperation, SignedUrlRecord};
pub use s3::S3ObjectStore;

/// HTTP method a presigned URL authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SignedMethod {
    /// Download the object
    Get,
    /// Upload the object
    Put,
}

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL
    pub url: String,
    /// UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Capability interface over a binary object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads the full body of an object
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError::NotFound` if the object does not exist
    async fn get(&self, container: &str, key: &str) -> ObjectStoreResult<Vec<u8>>;

    /// Writes an object, replacing any existing object under the same key
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError` if the write is rejected
    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()>;

    /// Checks if an object exists
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if object exists
    /// * `Ok(false)` if object does not exist
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError` for any other store failure
    async fn head(&self, container: &str, key: &str) -> ObjectStoreResult<bool>;

    /// Signs a URL authorizing a single `method` request against the object
    ///
    /// Signing is local work and never performs a network round trip.
    ///
    /// # Errors
    ///
    /// Returns `ObjectStoreError::ConfigError` if `ttl` is not an accepted lifetime
    async fn sign_url(
        &self,
        method: SignedMethod,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> ObjectStoreResult<PresignedUrl>;
}

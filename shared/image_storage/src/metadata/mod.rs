//! Image metadata storage integration using Dynamo DB
//!
//! One [`ImageRecord`] is written per successfully processed upload. Records are keyed by
//! `image_key` (partition key) and `timestamp` (sort key) and are never updated in place.

mod dynamodb;
mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use dynamodb::DynamoMetadataStore;
pub use error::{MetadataStoreError, MetadataStoreResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryMetadataStore;

/// Attribute names for the image metadata table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ImageRecordAttribute {
    /// Original object key (Partition Key)
    ImageKey,
    /// ISO-8601 processing time (Sort Key)
    Timestamp,
}

/// Provenance record for one processed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Original object key (Partition Key)
    pub image_key: String,
    /// ISO-8601 processing time (Sort Key)
    pub timestamp: String,
    /// Bucket the upload landed in
    pub original_bucket: String,
    /// Key of the upload
    pub original_key: String,
    /// Bucket holding the derived image
    pub processed_bucket: String,
    /// Key of the derived image
    pub processed_key: String,
    /// Size of the upload in bytes
    pub original_size_bytes: u64,
    /// Size of the derived image in bytes
    pub processed_size_bytes: u64,
    /// Upload dimensions as `WxH`
    pub original_dimensions: String,
    /// Derived image dimensions as `WxH`
    pub processed_dimensions: String,
}

/// Capability interface over the image metadata store
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Writes a record, overwriting any record with the same key pair
    ///
    /// # Errors
    ///
    /// Returns `MetadataStoreError` if the write fails
    async fn put(&self, record: &ImageRecord) -> MetadataStoreResult<()>;

    /// Reads the record stored under `(image_key, timestamp)`
    ///
    /// # Errors
    ///
    /// Returns `MetadataStoreError` if the read fails
    async fn get(&self, image_key: &str, timestamp: &str)
        -> MetadataStoreResult<Option<ImageRecord>>;

    /// Lists every record for an image, oldest first
    ///
    /// # Errors
    ///
    /// Returns `MetadataStoreError` if the query fails
    async fn list_for_image(&self, image_key: &str) -> MetadataStoreResult<Vec<ImageRecord>>;
}

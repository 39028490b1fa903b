use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{ImageRecord, MetadataStore, MetadataStoreError, MetadataStoreResult};

/// Metadata store kept in process memory, ordered by `(image_key, timestamp)`
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: Mutex<BTreeMap<(String, String), ImageRecord>>,
    failing_keys: Mutex<HashSet<String>>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `put` for `image_key` fail with `MetadataStoreError::Unavailable`
    pub fn fail_puts_for(&self, image_key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(image_key.to_string());
    }

    /// Every stored record in key order
    #[must_use]
    pub fn records(&self) -> Vec<ImageRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no record has been stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put(&self, record: &ImageRecord) -> MetadataStoreResult<()> {
        let failing = self
            .failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&record.image_key);
        if failing {
            return Err(MetadataStoreError::Unavailable(format!(
                "injected put failure for {}",
                record.image_key
            )));
        }

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (record.image_key.clone(), record.timestamp.clone()),
                record.clone(),
            );
        Ok(())
    }

    async fn get(
        &self,
        image_key: &str,
        timestamp: &str,
    ) -> MetadataStoreResult<Option<ImageRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(image_key.to_string(), timestamp.to_string()))
            .cloned())
    }

    async fn list_for_image(&self, image_key: &str) -> MetadataStoreResult<Vec<ImageRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| record.image_key == image_key)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(image_key: &str, timestamp: &str) -> ImageRecord {
        ImageRecord {
            image_key: image_key.to_string(),
            timestamp: timestamp.to_string(),
            original_bucket: "uploads".to_string(),
            original_key: image_key.to_string(),
            processed_bucket: "processed".to_string(),
            processed_key: format!("processed-{image_key}"),
            original_size_bytes: 1000,
            processed_size_bytes: 400,
            original_dimensions: "100x100".to_string(),
            processed_dimensions: "50x50".to_string(),
        }
    }

    #[tokio::test]
    async fn test_round_trip_by_key_pair() {
        let store = InMemoryMetadataStore::new();
        let written = record("a.png", "2025-09-10T12:00:00.000000Z");

        store.put(&written).await.unwrap();

        let read = store
            .get("a.png", "2025-09-10T12:00:00.000000Z")
            .await
            .unwrap();
        assert_eq!(read, Some(written));
        assert_eq!(store.get("a.png", "other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_for_image_is_ordered_by_timestamp() {
        let store = InMemoryMetadataStore::new();
        store.put(&record("a.png", "2025-09-10T12:00:02Z")).await.unwrap();
        store.put(&record("b.png", "2025-09-10T12:00:01Z")).await.unwrap();
        store.put(&record("a.png", "2025-09-10T12:00:01Z")).await.unwrap();

        let timestamps: Vec<String> = store
            .list_for_image("a.png")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.timestamp)
            .collect();

        assert_eq!(
            timestamps,
            vec!["2025-09-10T12:00:01Z", "2025-09-10T12:00:02Z"]
        );
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let store = InMemoryMetadataStore::new();
        store.fail_puts_for("a.png");

        assert!(store.put(&record("a.png", "t")).await.is_err());
        assert!(store.put(&record("b.png", "t")).await.is_ok());
        assert_eq!(store.len(), 1);
    }
}

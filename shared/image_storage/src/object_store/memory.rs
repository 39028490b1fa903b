use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{ObjectStore, ObjectStoreError, ObjectStoreResult, PresignedUrl, SignedMethod};

/// Operation on the in-memory store that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectOperation {
    /// `ObjectStore::get`
    Get,
    /// `ObjectStore::put`
    Put,
    /// `ObjectStore::head`
    Head,
    /// `ObjectStore::sign_url`
    Sign,
}

/// A URL minted by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrlRecord {
    /// Authorized method
    pub method: SignedMethod,
    /// Container the URL points into
    pub container: String,
    /// Object key
    pub key: String,
    /// Content type bound into the signature
    pub content_type: Option<String>,
    /// Requested lifetime
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: Option<String>,
}

type ObjectKey = (String, String);

/// Object store kept in process memory
///
/// Every operation can be made to fail for a given key with [`InMemoryObjectStore::fail_on`],
/// which surfaces as `ObjectStoreError::UpstreamError`.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<ObjectKey, StoredObject>>,
    failures: Mutex<HashSet<(ObjectOperation, String)>>,
    signed_urls: Mutex<Vec<SignedUrlRecord>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without going through `put`
    pub fn insert(&self, container: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (container.to_string(), key.to_string()),
                StoredObject {
                    body,
                    content_type: None,
                },
            );
    }

    /// Makes `operation` fail for every request on `key`
    pub fn fail_on(&self, operation: ObjectOperation, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((operation, key.to_string()));
    }

    /// Returns a copy of the object body if present
    #[must_use]
    pub fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(container.to_string(), key.to_string()))
            .map(|object| object.body.clone())
    }

    /// Returns the content type the object was written with
    #[must_use]
    pub fn content_type(&self, container: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(container.to_string(), key.to_string()))
            .and_then(|object| object.content_type.clone())
    }

    /// Lists the keys held in a container, in key order
    #[must_use]
    pub fn keys(&self, container: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Every URL minted so far, in signing order
    #[must_use]
    pub fn signed_urls(&self) -> Vec<SignedUrlRecord> {
        self.signed_urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check(&self, operation: ObjectOperation, key: &str) -> ObjectStoreResult<()> {
        let failing = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(operation, key.to_string()));

        if failing {
            Err(ObjectStoreError::UpstreamError(format!(
                "injected {operation:?} failure for {key}"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, container: &str, key: &str) -> ObjectStoreResult<Vec<u8>> {
        self.check(ObjectOperation::Get, key)?;
        self.object(container, key).ok_or(ObjectStoreError::NotFound)
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        self.check(ObjectOperation::Put, key)?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (container.to_string(), key.to_string()),
                StoredObject {
                    body,
                    content_type: content_type.map(ToString::to_string),
                },
            );
        Ok(())
    }

    async fn head(&self, container: &str, key: &str) -> ObjectStoreResult<bool> {
        self.check(ObjectOperation::Head, key)?;
        Ok(self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(container.to_string(), key.to_string())))
    }

    async fn sign_url(
        &self,
        method: SignedMethod,
        container: &str,
        key: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> ObjectStoreResult<PresignedUrl> {
        self.check(ObjectOperation::Sign, key)?;

        let expires_at = Utc::now() + ttl;
        self.signed_urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SignedUrlRecord {
                method,
                container: container.to_string(),
                key: key.to_string(),
                content_type: content_type.map(ToString::to_string),
                ttl,
            });

        Ok(PresignedUrl {
            url: format!(
                "memory://{container}/{key}?method={method}&expires={}",
                expires_at.timestamp()
            ),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryObjectStore::new();

        store
            .put("bucket", "a.jpg", vec![1, 2, 3], Some("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(store.get("bucket", "a.jpg").await.unwrap(), vec![1, 2, 3]);
        assert!(store.head("bucket", "a.jpg").await.unwrap());
        assert_eq!(
            store.content_type("bucket", "a.jpg").as_deref(),
            Some("image/jpeg")
        );
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = InMemoryObjectStore::new();
        store.insert("bucket", "a.jpg", vec![1]);

        assert!(store.get("other", "a.jpg").await.unwrap_err().is_not_found());
        assert!(!store.head("bucket", "b.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failure_only_hits_target_key() {
        let store = InMemoryObjectStore::new();
        store.insert("bucket", "a.jpg", vec![1]);
        store.insert("bucket", "b.jpg", vec![2]);
        store.fail_on(ObjectOperation::Get, "a.jpg");

        assert!(matches!(
            store.get("bucket", "a.jpg").await,
            Err(ObjectStoreError::UpstreamError(_))
        ));
        assert_eq!(store.get("bucket", "b.jpg").await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_sign_url_records_request() {
        let store = InMemoryObjectStore::new();

        let url = store
            .sign_url(
                SignedMethod::Put,
                "uploads",
                "photo.jpg",
                Some("image/jpeg"),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        assert!(url.url.starts_with("memory://uploads/photo.jpg?method=PUT"));
        assert_eq!(
            store.signed_urls(),
            vec![SignedUrlRecord {
                method: SignedMethod::Put,
                container: "uploads".to_string(),
                key: "photo.jpg".to_string(),
                content_type: Some("image/jpeg".to_string()),
                ttl: Duration::from_secs(3600),
            }]
        );
    }
}

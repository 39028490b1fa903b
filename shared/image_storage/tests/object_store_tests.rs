//! S3 object store tests against LocalStack
//!
//! Run with `cargo test -- --ignored` while LocalStack is listening on port 4566.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use image_storage::object_store::{ObjectStore, ObjectStoreError, S3ObjectStore, SignedMethod};
use uuid::Uuid;

struct TestContext {
    store: S3ObjectStore,
    bucket: String,
}

async fn setup_test() -> TestContext {
    let config = common::localstack_config().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .force_path_style(true)
        .build();
    let s3_client = Arc::new(S3Client::from_conf(s3_config));

    let bucket = format!("test-images-{}", Uuid::new_v4());
    s3_client
        .create_bucket()
        .bucket(&bucket)
        .send()
        .await
        .expect("Failed to create test bucket");

    TestContext {
        store: S3ObjectStore::new(s3_client),
        bucket,
    }
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_put_get_head() {
    let context = setup_test().await;

    context
        .store
        .put(&context.bucket, "a.jpg", vec![1, 2, 3], Some("image/jpeg"))
        .await
        .expect("Failed to put object");

    let body = context
        .store
        .get(&context.bucket, "a.jpg")
        .await
        .expect("Failed to get object");
    assert_eq!(body, vec![1, 2, 3]);

    assert!(context.store.head(&context.bucket, "a.jpg").await.unwrap());
    assert!(!context.store.head(&context.bucket, "b.jpg").await.unwrap());
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_get_missing_object_is_not_found() {
    let context = setup_test().await;

    let result = context.store.get(&context.bucket, "missing.jpg").await;

    assert!(matches!(result, Err(ObjectStoreError::NotFound)));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_presigned_urls_carry_expiry() {
    let context = setup_test().await;

    let upload = context
        .store
        .sign_url(
            SignedMethod::Put,
            &context.bucket,
            "photo.jpg",
            Some("image/jpeg"),
            Duration::from_secs(3600),
        )
        .await
        .expect("Failed to sign upload URL");
    assert!(upload.url.contains("localhost:4566"));
    assert!(upload.url.contains("X-Amz-Expires=3600"));

    let download = context
        .store
        .sign_url(
            SignedMethod::Get,
            &context.bucket,
            "photo.jpg",
            None,
            Duration::from_secs(3600),
        )
        .await
        .expect("Failed to sign download URL");
    assert!(download.url.contains("photo.jpg"));
}

// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_processor::{
    event::{NotificationBatch, NotificationRecord},
    pipeline::IngestionPipeline,
    transform::TransformEngine,
};
use image_storage::{metadata::InMemoryMetadataStore, object_store::InMemoryObjectStore};

pub const UPLOAD_BUCKET: &str = "uploaded-images";
pub const PROCESSED_BUCKET: &str = "processed-images";

/// In-memory stores wired into a pipeline
pub struct TestContext {
    pub objects: Arc<InMemoryObjectStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub pipeline: IngestionPipeline,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_concurrency(1)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        let objects = Arc::new(InMemoryObjectStore::new());
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let pipeline = IngestionPipeline::new(
            objects.clone(),
            metadata.clone(),
            TransformEngine::default(),
            PROCESSED_BUCKET.to_string(),
        )
        .with_concurrency(concurrency);

        Self {
            objects,
            metadata,
            pipeline,
        }
    }

    /// Seeds an upload and returns its notification
    pub fn upload(&self, key: &str, bytes: Vec<u8>) -> NotificationRecord {
        let size = bytes.len() as u64;
        self.objects.insert(UPLOAD_BUCKET, key, bytes);
        NotificationRecord {
            bucket: UPLOAD_BUCKET.to_string(),
            key: key.to_string(),
            size,
        }
    }
}

/// Encodes a patterned RGB image of the given size
pub fn test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, format)
        .unwrap();
    cursor.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    test_image(width, height, ImageFormat::Png)
}

pub fn batch(records: Vec<NotificationRecord>) -> NotificationBatch {
    NotificationBatch { records }
}

/// Dimensions of an encoded image
pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
}

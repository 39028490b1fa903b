//! Ingestion pipeline
//!
//! Each notification runs through `fetch -> transform -> store -> record` and ends as either
//! [`NotificationOutcome::Completed`] or [`NotificationOutcome::Skipped`]. A skipped notification
//! never affects its siblings: the batch driver keeps going and reports every outcome.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use futures::{stream, FutureExt, StreamExt};
use image_storage::{
    metadata::{ImageRecord, MetadataStore},
    object_store::ObjectStore,
};
use metrics::counter;
use strum::Display;
use tracing::{error, info, instrument};

use crate::event::{NotificationBatch, NotificationRecord};
use crate::transform::{TransformEngine, TransformOutput};

/// Prefix of every derived object key
pub const DERIVED_KEY_PREFIX: &str = "processed-";

/// Why a notification was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Source object could not be read
    FetchError,
    /// Source object is not a usable image
    TransformError,
    /// Derived image could not be written
    StoreError,
    /// Metadata record could not be written
    RecordError,
    /// Processing panicked
    UnexpectedError,
}

impl SkipReason {
    /// Pipeline step the notification stopped at
    #[must_use]
    pub const fn step(self) -> &'static str {
        match self {
            Self::FetchError => "fetch",
            Self::TransformError => "transform",
            Self::StoreError => "store",
            Self::RecordError => "record",
            Self::UnexpectedError => "unexpected",
        }
    }
}

/// Terminal state of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Derived image and metadata record were both written
    Completed(ImageRecord),
    /// Processing stopped early
    Skipped {
        /// Step that failed
        reason: SkipReason,
        /// Operator-facing error text
        detail: String,
    },
}

impl NotificationOutcome {
    /// Whether the notification completed
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The skip reason, if skipped
    #[must_use]
    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Completed(_) => None,
            Self::Skipped { reason, .. } => Some(*reason),
        }
    }
}

/// Outcomes of one batch, in delivery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One outcome per notification
    pub outcomes: Vec<NotificationOutcome>,
}

impl BatchReport {
    /// Number of completed notifications
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    /// Number of skipped notifications
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.completed()
    }

    /// Records written by this batch, in delivery order
    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            NotificationOutcome::Completed(record) => Some(record),
            NotificationOutcome::Skipped { .. } => None,
        })
    }
}

struct StepFailure {
    reason: SkipReason,
    detail: String,
}

impl StepFailure {
    fn new(reason: SkipReason, error: &impl std::fmt::Display) -> Self {
        Self {
            reason,
            detail: error.to_string(),
        }
    }
}

/// Derives the destination key: `processed-` followed by the basename of `source_key`
///
/// Keys sharing a basename map to the same destination; the later write wins.
#[must_use]
pub fn derived_key(source_key: &str) -> String {
    let basename = source_key
        .rsplit_once('/')
        .map_or(source_key, |(_, name)| name);
    format!("{DERIVED_KEY_PREFIX}{basename}")
}

/// Drives notifications through fetch, transform, store and record
pub struct IngestionPipeline {
    object_store: Arc<dyn ObjectStore>,
    metadata_store: Arc<dyn MetadataStore>,
    engine: TransformEngine,
    processed_container: String,
    concurrency: usize,
}

impl IngestionPipeline {
    /// Creates a sequential pipeline
    ///
    /// # Arguments
    ///
    /// * `object_store` - Store holding both uploads and derived images
    /// * `metadata_store` - Store receiving one record per completed notification
    /// * `engine` - Transform policy
    /// * `processed_container` - Bucket derived images are written to
    #[must_use]
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        metadata_store: Arc<dyn MetadataStore>,
        engine: TransformEngine,
        processed_container: String,
    ) -> Self {
        Self {
            object_store,
            metadata_store,
            engine,
            processed_container,
            concurrency: 1,
        }
    }

    /// Processes up to `concurrency` notifications of a batch at once
    ///
    /// Outcomes are still reported in delivery order. Values below 1 mean sequential.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Processes every notification of a batch
    ///
    /// Never fails: per-notification errors are reported as skipped outcomes.
    pub async fn process_batch(&self, batch: &NotificationBatch) -> BatchReport {
        let outcomes: Vec<NotificationOutcome> = stream::iter(&batch.records)
            .map(|notification| self.process_notification(notification))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = BatchReport { outcomes };
        info!(
            total = report.outcomes.len(),
            completed = report.completed(),
            skipped = report.skipped(),
            "Processed notification batch"
        );
        report
    }

    /// Processes a single notification
    ///
    /// Step failures and panics are logged and returned as [`NotificationOutcome::Skipped`].
    #[instrument(skip_all, fields(bucket = %notification.bucket, key = %notification.key))]
    pub async fn process_notification(&self, notification: &NotificationRecord) -> NotificationOutcome {
        let result = AssertUnwindSafe(self.run_steps(notification))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(record)) => {
                info!(
                    processed_key = %record.processed_key,
                    processed_dimensions = %record.processed_dimensions,
                    "Processed image"
                );
                counter!("image_pipeline.notifications", "outcome" => "completed").increment(1);
                NotificationOutcome::Completed(record)
            }
            Ok(Err(failure)) => {
                error!(
                    bucket = %notification.bucket,
                    key = %notification.key,
                    step = failure.reason.step(),
                    error = %failure.detail,
                    "Pipeline step failed, skipping notification"
                );
                Self::skipped(failure.reason, failure.detail)
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!(
                    bucket = %notification.bucket,
                    key = %notification.key,
                    step = SkipReason::UnexpectedError.step(),
                    error = %detail,
                    fault = "panic",
                    "Unexpected fault while processing notification"
                );
                Self::skipped(SkipReason::UnexpectedError, detail)
            }
        }
    }

    fn skipped(reason: SkipReason, detail: String) -> NotificationOutcome {
        counter!(
            "image_pipeline.notifications",
            "outcome" => "skipped",
            "step" => reason.step()
        )
        .increment(1);
        NotificationOutcome::Skipped { reason, detail }
    }

    async fn run_steps(&self, notification: &NotificationRecord) -> Result<ImageRecord, StepFailure> {
        // Fetch
        let raw = self
            .object_store
            .get(&notification.bucket, &notification.key)
            .await
            .map_err(|e| StepFailure::new(SkipReason::FetchError, &e))?;
        let original_size_bytes = byte_len(&raw);

        // Transform, off the async workers; the source buffer is dropped with the closure
        let engine = self.engine;
        let TransformOutput {
            bytes,
            original,
            derived,
        } = tokio::task::spawn_blocking(move || engine.transform(&raw))
            .await
            .map_err(|join_error| {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                StepFailure::new(SkipReason::UnexpectedError, &join_error)
            })?
            .map_err(|e| StepFailure::new(SkipReason::TransformError, &e))?;
        let processed_size_bytes = byte_len(&bytes);

        // Store
        let processed_key = derived_key(&notification.key);
        self.object_store
            .put(
                &self.processed_container,
                &processed_key,
                bytes,
                Some(TransformEngine::OUTPUT_CONTENT_TYPE),
            )
            .await
            .map_err(|e| StepFailure::new(SkipReason::StoreError, &e))?;

        // Record
        let record = ImageRecord {
            image_key: notification.key.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            original_bucket: notification.bucket.clone(),
            original_key: notification.key.clone(),
            processed_bucket: self.processed_container.clone(),
            processed_key,
            original_size_bytes,
            processed_size_bytes,
            original_dimensions: original.to_string(),
            processed_dimensions: derived.to_string(),
        };
        self.metadata_store
            .put(&record)
            .await
            .map_err(|e| StepFailure::new(SkipReason::RecordError, &e))?;

        Ok(record)
    }
}

fn byte_len(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

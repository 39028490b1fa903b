//! Object-created notifications
//!
//! Trigger payloads are validated here, at the boundary, into a [`NotificationBatch`]. Two
//! shapes are accepted:
//!
//! * the plain batch shape `{"records": [{"bucket", "key", "size"}]}`
//! * the S3 event notification envelope delivered by bucket notifications, including the
//!   `s3:TestEvent` S3 sends when a notification target is configured

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use validator::{Validate, ValidationErrors};

/// Result type for payload parsing
pub type EventResult<T> = Result<T, EventError>;

/// Errors that can occur while parsing a trigger payload
#[derive(Error, Debug)]
pub enum EventError {
    /// Payload is not one of the accepted shapes
    #[error("Invalid notification payload: {0}")]
    InvalidPayload(String),

    /// A record is missing its bucket or key
    #[error("Invalid notification record: {0}")]
    MissingField(#[from] ValidationErrors),
}

/// A single "object created" notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NotificationRecord {
    /// Source bucket
    #[validate(length(min = 1, message = "missing_bucket"))]
    pub bucket: String,
    /// Source object key, already decoded
    #[validate(length(min = 1, message = "missing_key"))]
    pub key: String,
    /// Object size in bytes as reported by the trigger
    #[serde(default)]
    pub size: u64,
}

/// Ordered notifications delivered in one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NotificationBatch {
    /// Notifications in delivery order
    #[validate(nested)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records")]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct S3TestEvent {
    #[serde(rename = "Event")]
    event: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TriggerPayload {
    S3(S3Event),
    Batch(NotificationBatch),
    Test(S3TestEvent),
}

impl S3EventRecord {
    fn is_object_created(&self) -> bool {
        self.event_name
            .as_deref()
            .is_none_or(|name| name.starts_with("ObjectCreated:"))
    }
}

impl From<S3EventRecord> for NotificationRecord {
    fn from(record: S3EventRecord) -> Self {
        Self {
            bucket: record.s3.bucket.name,
            key: decode_object_key(&record.s3.object.key),
            size: record.s3.object.size,
        }
    }
}

/// Decodes an S3 event object key (form-url-encoded: `+` for space, `%XX` escapes)
#[must_use]
pub fn decode_object_key(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

impl NotificationBatch {
    /// Parses and validates a trigger payload
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidPayload` if the JSON matches no accepted shape
    /// Returns `EventError::MissingField` if any record has an empty bucket or key
    pub fn from_json(body: &str) -> EventResult<Self> {
        let payload: TriggerPayload = serde_json::from_str(body)
            .map_err(|e| EventError::InvalidPayload(e.to_string()))?;

        let batch = match payload {
            TriggerPayload::S3(event) => Self {
                records: event
                    .records
                    .into_iter()
                    .filter(|record| {
                        let created = record.is_object_created();
                        if !created {
                            debug!(event_name = ?record.event_name, "Dropping non-create event");
                        }
                        created
                    })
                    .map(NotificationRecord::from)
                    .collect(),
            },
            TriggerPayload::Batch(batch) => batch,
            TriggerPayload::Test(test) => {
                debug!(event = %test.event, "Received S3 test event");
                Self::default()
            }
        };

        batch.validate()?;
        Ok(batch)
    }
}

//! SQS queue carrying object-created event notifications
//!
//! Message bodies are kept raw; turning them into a batch is the consumer's job so a malformed
//! body can be logged and acknowledged instead of silently redelivered.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use tracing::warn;

pub use error::{QueueError, QueueResult};

/// A received message with its metadata
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Raw message body
    pub body: String,
    /// Receipt handle for acknowledging the message
    pub receipt_handle: String,
    /// Message ID
    pub message_id: String,
}

/// Configuration for queue operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Queue URL
    pub queue_url: String,
    /// Maximum number of messages to retrieve per poll
    pub default_max_messages: i32,
    /// Visibility timeout for received messages (in seconds)
    pub default_visibility_timeout: i32,
    /// Wait time for long polling (in seconds)
    pub default_wait_time_seconds: i32,
}

/// Source of raw notification messages
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Long-polls the next messages
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the poll operation fails
    async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage>>;

    /// Acknowledges a message so it is not redelivered
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the acknowledgment fails
    async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()>;
}

/// Queue of S3 event notifications
pub struct EventQueue {
    sqs_client: Arc<SqsClient>,
    config: QueueConfig,
}

impl EventQueue {
    /// Creates a new event queue
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `config` - Queue configuration including URL and polling parameters
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>, config: QueueConfig) -> Self {
        Self { sqs_client, config }
    }
}

#[async_trait]
impl MessageQueue for EventQueue {
    /// Messages without a body, receipt handle or ID are dropped.
    async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(self.config.default_max_messages)
            .visibility_timeout(self.config.default_visibility_timeout)
            .wait_time_seconds(self.config.default_wait_time_seconds)
            .send()
            .await?;

        let messages = result
            .messages()
            .iter()
            .filter_map(|msg| {
                match (msg.body(), msg.receipt_handle(), msg.message_id()) {
                    (Some(body), Some(receipt_handle), Some(message_id)) => Some(QueueMessage {
                        body: body.to_string(),
                        receipt_handle: receipt_handle.to_string(),
                        message_id: message_id.to_string(),
                    }),
                    _ => {
                        warn!(message_id = ?msg.message_id(), "Dropping incomplete SQS message");
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    /// Deletes the message from the queue
    async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}

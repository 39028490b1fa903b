//! Event consumer
//!
//! Long-polls the event queue and runs each message through the pipeline. Every message is
//! acknowledged once its batch returns, whatever the per-notification outcomes were. A failed
//! acknowledgment is logged and does not hold back the rest of the poll.

use std::sync::Arc;

use anyhow::Context;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::event::{EventResult, NotificationBatch};
use crate::pipeline::{BatchReport, IngestionPipeline};
use crate::queue::{MessageQueue, QueueMessage};

/// Parses a trigger payload and processes the resulting batch
///
/// # Errors
///
/// Returns `EventError` if the payload fails boundary validation; nothing is processed then
pub async fn process_payload(pipeline: &IngestionPipeline, body: &str) -> EventResult<BatchReport> {
    let batch = NotificationBatch::from_json(body)?;
    Ok(pipeline.process_batch(&batch).await)
}

/// Polls the event queue until shutdown
pub struct EventConsumer {
    queue: Arc<dyn MessageQueue>,
    pipeline: Arc<IngestionPipeline>,
    shutdown: CancellationToken,
}

impl EventConsumer {
    /// Creates a new `EventConsumer`
    #[must_use]
    pub const fn new(
        queue: Arc<dyn MessageQueue>,
        pipeline: Arc<IngestionPipeline>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            pipeline,
            shutdown,
        }
    }

    /// Runs the poll loop until the shutdown token is cancelled
    pub async fn start(self) {
        info!("Starting EventConsumer");

        // Poll queue until shutdown
        while !self.shutdown.is_cancelled() {
            tokio::select! {
                result = self.poll_once() => match result {
                    Ok(()) => {}
                    Err(e) => {
                        error!(error = ?e, "Failed to poll messages");
                    }
                },
                () = self.shutdown.cancelled() => {
                    info!("Queue poller shutting down");
                    break;
                }
            }
        }

        info!("EventConsumer shutdown complete");
    }

    async fn poll_once(&self) -> anyhow::Result<()> {
        let messages = self
            .queue
            .poll_messages()
            .await
            .context("Failed to poll messages")?;

        for message in messages {
            if let Err(e) = self.process_and_ack(message).await {
                error!(error = ?e, "Message will be redelivered");
                counter!("image_pipeline.ack_failures").increment(1);
            }
        }

        Ok(())
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn process_and_ack(&self, message: QueueMessage) -> anyhow::Result<()> {
        match process_payload(&self.pipeline, &message.body).await {
            Ok(report) => {
                info!(
                    completed = report.completed(),
                    skipped = report.skipped(),
                    "Batch processed, acknowledging message"
                );
            }
            Err(e) => {
                error!(error = %e, "Invalid notification payload, acknowledging message");
                counter!("image_pipeline.invalid_payloads").increment(1);
            }
        }

        self.queue
            .ack_message(&message.receipt_handle)
            .await
            .context("Failed to acknowledge message")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use aws_sdk_sqs::error::SdkError;
    use image_storage::{
        environment::ServiceConfig, metadata::InMemoryMetadataStore,
        object_store::InMemoryObjectStore,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::queue::{QueueError, QueueResult};
    use crate::transform::TransformEngine;

    /// Queue that hands out fixed messages and fails chosen acknowledgments
    struct ScriptedQueue {
        messages: Vec<QueueMessage>,
        failing_handle: &'static str,
        acked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageQueue for ScriptedQueue {
        async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage>> {
            Ok(self.messages.clone())
        }

        async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()> {
            self.acked.lock().unwrap().push(receipt_handle.to_string());
            if receipt_handle == self.failing_handle {
                return Err(QueueError::DeleteMessage(SdkError::timeout_error(
                    "delete timed out",
                )));
            }
            Ok(())
        }
    }

    fn message(n: usize) -> QueueMessage {
        QueueMessage {
            body: r#"{"records": []}"#.to_string(),
            receipt_handle: format!("handle-{n}"),
            message_id: format!("id-{n}"),
        }
    }

    #[tokio::test]
    async fn test_failed_ack_does_not_abandon_remaining_messages() {
        let queue = Arc::new(ScriptedQueue {
            messages: (1..=3).map(message).collect(),
            failing_handle: "handle-1",
            acked: Mutex::new(Vec::new()),
        });
        let config = ServiceConfig::default();
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryMetadataStore::new()),
            TransformEngine::from_config(&config),
            config.processed_container,
        ));
        let consumer = EventConsumer::new(queue.clone(), pipeline, CancellationToken::new());

        consumer.poll_once().await.unwrap();

        assert_eq!(
            *queue.acked.lock().unwrap(),
            vec!["handle-1", "handle-2", "handle-3"]
        );
    }
}

use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::Client as SqsClient;
use datadog_tracing::axum::shutdown_signal;
use image_processor::{
    config::ConsumerConfig, consumer::EventConsumer, health, pipeline::IngestionPipeline,
    queue::EventQueue, transform::TransformEngine,
};
use image_storage::{
    environment::{Environment, ServiceConfig, ServiceRole},
    metadata::DynamoMetadataStore,
    object_store::S3ObjectStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env()?;

    // Datadog exports traces when an agent is reachable, otherwise log to stdout
    // Use JSON format for staging/production, regular format for development
    let datadog = if std::env::var("DD_AGENT_HOST").is_ok() {
        Some(datadog_tracing::init()?)
    } else {
        if environment.json_logs() {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        } else {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
        None
    };

    info!("Starting Image Processor in {} environment", environment);

    let service_config = ServiceConfig::from_env(&environment, ServiceRole::ImageProcessor)?;
    let consumer_config = ConsumerConfig::from_env(&environment)?;

    let aws_config = environment.aws_config().await;
    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let dynamodb_client = Arc::new(DynamoDbClient::new(&aws_config));
    let sqs_client = Arc::new(SqsClient::new(&aws_config));

    let pipeline = Arc::new(
        IngestionPipeline::new(
            Arc::new(S3ObjectStore::new(s3_client)),
            Arc::new(DynamoMetadataStore::new(
                dynamodb_client,
                service_config.metadata_table_name.clone(),
            )),
            TransformEngine::from_config(&service_config),
            service_config.processed_container.clone(),
        )
        .with_concurrency(consumer_config.concurrency),
    );
    let queue = Arc::new(EventQueue::new(sqs_client, consumer_config.queue));

    info!("✅ Initialized ingestion pipeline");

    // Single shutdown token for everything
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down Image Processor...");
        signal_token.cancel();
    });

    let health_handle = {
        let token = shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = health::start_health_server(token.clone()).await {
                error!("Health server error: {}", e);
                token.cancel();
            }
        })
    };

    // Runs until shutdown
    EventConsumer::new(queue, pipeline, shutdown_token).start().await;

    health_handle.await.ok();

    // Ensure the tracer is properly shut down
    if let Some((_guard, tracer_shutdown)) = datadog {
        tracer_shutdown.shutdown();
    }

    info!("✅ Image Processor shutdown complete");

    Ok(())
}

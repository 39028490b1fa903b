use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use image_storage::{
    environment::{Environment, ServiceConfig, ServiceRole},
    object_store::S3ObjectStore,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use url_issuer::{issuer::UrlIssuer, server};

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

    info!("Starting URL Issuer in {} environment", environment);

    // Refuse to start on a bad configuration
    let service_config = ServiceConfig::from_env(&environment, ServiceRole::UrlIssuer)?;

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let issuer = Arc::new(UrlIssuer::new(
        Arc::new(S3ObjectStore::new(s3_client)),
        &service_config,
    ));

    let result = server::start(issuer).await;

    // Ensure the tracer is properly shut down
    if let Some((_guard, tracer_shutdown)) = datadog {
        tracer_shutdown.shutdown();
    }

    result
}

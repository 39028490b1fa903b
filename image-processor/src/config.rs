//! Consumer configuration

use image_storage::environment::{parsed_var, ConfigError, ConfigResult, Environment};

use crate::queue::QueueConfig;

const LOCAL_QUEUE_URL: &str = "http://localhost:4566/000000000000/image-events";

/// SQS polling and in-batch concurrency settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Queue receiving the upload bucket's event notifications
    pub queue: QueueConfig,
    /// Notifications of one batch processed at once
    pub concurrency: usize,
}

impl ConsumerConfig {
    /// Loads the consumer configuration for the given environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` if `IMAGE_EVENTS_QUEUE_URL` is missing outside development
    /// Returns `ConfigError::InvalidValue` if `PIPELINE_CONCURRENCY` is malformed or zero
    pub fn from_env(environment: &Environment) -> ConfigResult<Self> {
        let queue_url = environment.required_var("IMAGE_EVENTS_QUEUE_URL", LOCAL_QUEUE_URL)?;

        let concurrency: usize = parsed_var("PIPELINE_CONCURRENCY", 1)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "PIPELINE_CONCURRENCY",
                value: concurrency.to_string(),
            });
        }

        Ok(Self {
            queue: QueueConfig {
                queue_url,
                default_max_messages: 10,
                default_visibility_timeout: 60,
                default_wait_time_seconds: 20,
            },
            concurrency,
        })
    }
}

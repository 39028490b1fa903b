//! Environment configuration for different deployment stages

use std::env;
use std::str::FromStr;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use thiserror::Error;

const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Longest lifetime S3 accepts for a presigned URL (7 days)
pub const MAX_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `APP_ENV` holds an unknown stage
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// A required variable is not set
    #[error("{0} environment variable is not set")]
    MissingVariable(&'static str),

    /// A variable is set but cannot be used
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Raw value found in the environment
        value: String,
    },
}

/// Application environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvironment` if `APP_ENV` contains an invalid value
    pub fn from_env() -> ConfigResult<Self> {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(ConfigError::InvalidEnvironment(env)),
        }
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub fn override_aws_endpoint_url(&self) -> Option<String> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some(
                env::var("AWS_ENDPOINT_URL").unwrap_or_else(|_| LOCALSTACK_ENDPOINT.to_string()),
            ),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Reads a required string variable, falling back to `dev_default` in development
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` if the variable is unset or blank outside development
    pub fn required_var(&self, name: &'static str, dev_default: &str) -> ConfigResult<String> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => match self {
                Self::Development => Ok(dev_default.to_string()),
                Self::Production | Self::Staging => Err(ConfigError::MissingVariable(name)),
            },
        }
    }
}

/// Reads an optional variable and parses it, using `default` when unset
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when the variable is set but does not parse
pub fn parsed_var<T: FromStr>(name: &'static str, default: T) -> ConfigResult<T> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::InvalidValue { name, value })
        }
        Err(_) => Ok(default),
    }
}

/// Service a configuration is loaded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceRole {
    /// Queue-driven worker writing derived images and their records
    ImageProcessor,
    /// HTTP service minting presigned URLs
    UrlIssuer,
}

impl ServiceRole {
    /// Variables the service cannot run without outside development
    #[must_use]
    pub const fn required_vars(self) -> &'static [&'static str] {
        match self {
            Self::ImageProcessor => &["PROCESSED_BUCKET", "METADATA_TABLE"],
            Self::UrlIssuer => &["UPLOAD_BUCKET", "PROCESSED_BUCKET"],
        }
    }

    fn string_var(
        self,
        environment: &Environment,
        name: &'static str,
        default: &str,
    ) -> ConfigResult<String> {
        if self.required_vars().contains(&name) {
            return environment.required_var(name, default);
        }

        Ok(env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }
}

/// Service configuration shared by the image processor and the URL issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bucket receiving client uploads
    pub upload_container: String,
    /// Bucket holding derived images
    pub processed_container: String,
    /// Dynamo DB table holding image records
    pub metadata_table_name: String,
    /// Lifetime of issued presigned URLs
    pub url_ttl_seconds: u64,
    /// Divisor applied to both image axes
    pub resize_factor: u32,
    /// JPEG quality on a 1-100 scale
    pub jpeg_quality: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_container: "uploaded-images".to_string(),
            processed_container: "processed-images".to_string(),
            metadata_table_name: "image-metadata".to_string(),
            url_ttl_seconds: 3600,
            resize_factor: 2,
            jpeg_quality: 70,
        }
    }
}

impl ServiceConfig {
    /// Loads the configuration of `role` for the given environment
    ///
    /// Only the bucket and table names `role` uses are required; the others fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` if a name `role` requires is missing outside development
    /// Returns `ConfigError::InvalidValue` if a numeric setting is malformed or out of range
    pub fn from_env(environment: &Environment, role: ServiceRole) -> ConfigResult<Self> {
        let defaults = Self::default();

        let config = Self {
            upload_container: role.string_var(
                environment,
                "UPLOAD_BUCKET",
                &defaults.upload_container,
            )?,
            processed_container: role.string_var(
                environment,
                "PROCESSED_BUCKET",
                &defaults.processed_container,
            )?,
            metadata_table_name: role.string_var(
                environment,
                "METADATA_TABLE",
                &defaults.metadata_table_name,
            )?,
            url_ttl_seconds: parsed_var("PRESIGNED_URL_EXPIRY_SECS", defaults.url_ttl_seconds)?,
            resize_factor: parsed_var("RESIZE_FACTOR", defaults.resize_factor)?,
            jpeg_quality: parsed_var("JPEG_QUALITY", defaults.jpeg_quality)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the numeric settings are in range
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending setting
    pub fn validate(&self) -> ConfigResult<()> {
        if self.url_ttl_seconds == 0 || self.url_ttl_seconds > MAX_URL_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                name: "PRESIGNED_URL_EXPIRY_SECS",
                value: self.url_ttl_seconds.to_string(),
            });
        }
        if self.resize_factor == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RESIZE_FACTOR",
                value: self.resize_factor.to_string(),
            });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                name: "JPEG_QUALITY",
                value: self.jpeg_quality.to_string(),
            });
        }
        Ok(())
    }

    /// Presigned URL lifetime as a `Duration`
    #[must_use]
    pub const fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_seconds)
    }
}

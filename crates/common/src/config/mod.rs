//! Configuration management for Caselink services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use crate::retry::RetryPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Queue configuration (SQS)
    #[serde(default)]
    pub queue: QueueConfig,

    /// Citation pipeline configuration
    #[serde(default)]
    pub citations: CitationsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// SQS queue carrying citation linking jobs
    pub citation_queue_url: Option<String>,

    /// SQS queue receiving search index requests
    pub index_queue_url: Option<String>,

    /// Dead letter queue URL
    pub dlq_url: Option<String>,

    /// Maximum messages to receive per poll
    #[serde(default = "default_queue_batch_size")]
    pub batch_size: u32,

    /// Long polling timeout in seconds
    #[serde(default = "default_queue_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Visibility timeout in seconds
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CitationsConfig {
    /// Maximum reporter distance (exclusive) for two citations to be parallel
    #[serde(default = "default_parallel_distance")]
    pub parallel_distance: usize,

    /// Attempts per document when the match backend is not ready
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Documents linked concurrently by one worker
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Reporter abbreviations recognized in addition to the built-in list
    #[serde(default)]
    pub extra_reporters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_queue_batch_size() -> u32 { 10 }
fn default_queue_poll_timeout() -> u64 { 20 }
fn default_visibility_timeout() -> u64 { 300 }
fn default_parallel_distance() -> usize { 4 }
fn default_retry_max_attempts() -> u32 { 5 }
fn default_retry_delay() -> u64 { 2 }
fn default_concurrency() -> usize { 4 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "caselink-citations".to_string() }

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            citation_queue_url: None,
            index_queue_url: None,
            dlq_url: None,
            batch_size: default_queue_batch_size(),
            poll_timeout_secs: default_queue_poll_timeout(),
            visibility_timeout_secs: default_visibility_timeout(),
        }
    }
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            parallel_distance: default_parallel_distance(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            concurrency: default_concurrency(),
            extra_reporters: Vec::new(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl CitationsConfig {
    /// Retry policy applied to each document
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_secs(self.retry_delay_secs),
        )
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__CITATIONS__PARALLEL_DISTANCE=4
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/caselink".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            queue: QueueConfig::default(),
            citations: CitationsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

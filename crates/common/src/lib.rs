//! Caselink Common Library
//!
//! Shared code for the Caselink citation services including:
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - SQS queue integration
//! - Bounded retry policy
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod queue;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use retry::RetryPolicy;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

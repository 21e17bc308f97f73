//! Error types for Caselink services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Error codes for queue and log consumers
//! - Retryability classification for background jobs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    QueueError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::QueueError => 8005,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Queue error: {message}")]
    QueueError { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::QueueError { .. } => ErrorCode::QueueError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the failure is caused by an unavailable backend and the
    /// operation may succeed if attempted again
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::DatabaseConnection { .. } => true,
            AppError::Database(err) => is_transient_db_error(err),
            _ => false,
        }
    }
}

/// Connection acquisition and connection runtime failures are transient;
/// query, constraint and decoding errors are not.
pub fn is_transient_db_error(err: &sea_orm::DbErr) -> bool {
    matches!(
        err,
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_)
    )
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::Configuration {
            message: "missing database.url".into(),
        };
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
        assert_eq!(err.code().as_code(), 9002);
        assert_eq!(err.to_string(), "Configuration error: missing database.url");
    }

    #[test]
    fn test_connection_errors_are_transient() {
        let err = AppError::DatabaseConnection {
            message: "pool timed out".into(),
        };
        assert!(err.is_transient());

        let err = AppError::Database(sea_orm::DbErr::ConnectionAcquire(
            sea_orm::ConnAcquireErr::Timeout,
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_query_errors_are_permanent() {
        let err = AppError::Database(sea_orm::DbErr::RecordNotFound("opinions".into()));
        assert!(!err.is_transient());

        let err = AppError::QueueError {
            message: "queue gone".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.code(), ErrorCode::QueueError);
    }
}

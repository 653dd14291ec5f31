//! Error types for health check operations

use thiserror::Error;

/// Result type for health check operations
pub type Result<T> = std::result::Result<T, HealthCheckError>;

/// Errors that can occur during health checks
#[derive(Debug, Error)]
pub enum HealthCheckError {
    /// Database connection or query failure
    #[error("Database health check failed: {0}")]
    Database(String),

    /// Object storage unreachable
    #[error("Storage health check failed: {0}")]
    Storage(String),
}

impl HealthCheckError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

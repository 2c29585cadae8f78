//! Database Error Types
//!
//! Error types for the storage layer: connection, schema installation,
//! migration and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Validation of hierarchy rules happens above this layer; these errors
/// only describe storage failures.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to install or upgrade the hierarchy schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A uniqueness or NOT NULL constraint rejected a write
    #[error("Integrity constraint violated: {context}")]
    IntegrityViolation { context: String },

    /// Configured table or column name is not a plain identifier
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Stored value cannot be represented in the model
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Map a failed write, separating constraint violations from other failures
    pub fn from_write(context: &str, source: libsql::Error) -> Self {
        let message = source.to_string();
        if message.contains("constraint failed") {
            Self::IntegrityViolation {
                context: format!("{}: {}", context, message),
            }
        } else {
            Self::sql_execution(format!("{}: {}", context, message))
        }
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }
}

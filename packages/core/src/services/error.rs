//! Service Layer Error Types
//!
//! Errors surfaced by hierarchy mutations and session queries. Lower-layer
//! errors are wrapped so callers can still branch on validation failures.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Hierarchy service errors
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Parent assignment rejected before any write
    #[error("Hierarchy validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl HierarchyError {
    /// The validation failure, when this is one
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::ValidationFailed(err) => Some(err),
            _ => None,
        }
    }

    /// Field-level message for the host's edit form
    ///
    /// Only validation failures belong to a form field.
    pub fn field_message(&self) -> Option<(&'static str, &'static str)> {
        self.validation()
            .map(|err| (err.field(), err.public_message()))
    }
}

//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use std::fmt;

#[derive(Debug)]
pub enum CirculationError {
    /// Entity does not exist, or is not visible to the caller
    NotFound,
    /// Malformed input, rejected before any transaction is opened
    Validation(String),
    /// Business rule rejection; the transaction rolled back cleanly
    Rejected(String),
    /// Database/persistence error
    Database(String),
}

impl fmt::Display for CirculationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CirculationError::NotFound => write!(f, "Resource not found"),
            CirculationError::Validation(msg) => write!(f, "Validation error: {}", msg),
            CirculationError::Rejected(msg) => write!(f, "{}", msg),
            CirculationError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for CirculationError {}

// Conversion from SeaORM errors. Services that can lose a race on a partial
// unique index remap the violation to the matching Rejected variant.
impl From<sea_orm::DbErr> for CirculationError {
    fn from(e: sea_orm::DbErr) -> Self {
        CirculationError::Database(e.to_string())
    }
}

impl CirculationError {
    /// True when the underlying store reported a unique-constraint hit.
    pub fn is_unique_violation(e: &sea_orm::DbErr) -> bool {
        matches!(
            e.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        )
    }
}

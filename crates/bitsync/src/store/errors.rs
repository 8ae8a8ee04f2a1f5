use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during document store operations.
///
/// A missing record is not an error: point lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A required argument was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

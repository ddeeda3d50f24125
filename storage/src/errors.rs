// storage/src/errors.rs

pub use thiserror::Error;

/// A type alias for a `Result` that returns a `StorageError` on failure.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("prescription with id {0} was not found")]
    NotFound(i64),
}

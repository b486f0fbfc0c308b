//! Error types for the memory crate.

use thiserror::Error;

/// Errors that can occur in the memory crate.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid query or parameters.
    #[error("Query error: {0}")]
    Query(String),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data or state.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The store was created for a different embedding size.
    #[error("Embedding dimension mismatch: store has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

//! Storage port error types.

/// Errors surfaced by the persistence ports.
///
/// These are infrastructure failures, not domain outcomes: a failed CAS is
/// reported through `SaveIfRevision`'s `applied: bool` return, not as an
/// error variant here.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record or key was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store rejected or failed the operation.
    #[error("storage error: {0}")]
    Internal(String),

    /// Serialization or deserialization of a stored record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace, scope, or key is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for persistence port operations.
pub type StorageResult<T> = Result<T, StorageError>;

//! Native pipeline store error types.

use ashfox_storage::StorageError;

/// Errors the native pipeline store can return.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The distributed pipeline lock could not be acquired before the
    /// configured timeout elapsed.
    #[error("lock_acquire_timeout: could not acquire pipeline lock for workspace {workspace_id}")]
    LockAcquireTimeout {
        /// The workspace whose lock was contended.
        workspace_id: String,
    },

    /// The state record changed between read and write (CAS mismatch).
    #[error("state_conflict: pipeline state changed concurrently for workspace {workspace_id}")]
    StateConflict {
        /// The workspace whose state record lost the race.
        workspace_id: String,
    },

    /// The named job does not exist.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The operation is not valid for the job's current status.
    #[error("invalid job transition: {0}")]
    InvalidTransition(String),

    /// The job payload failed kind-specific validation.
    #[error("{0}")]
    InvalidPayload(String),

    /// A lower-level persistence port failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The pipeline state record could not be (de)serialized.
    #[error("pipeline state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for native pipeline store operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

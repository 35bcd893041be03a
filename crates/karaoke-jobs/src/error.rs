//! Error types for job orchestration.

use thiserror::Error;

use crate::job::JobStatus;
use crate::stage::StageError;

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors surfaced by the job store and the submission/query service.
#[derive(Debug, Error)]
pub enum JobError {
    /// Unknown job, or an artifact missing from disk.
    #[error("{0}")]
    NotFound(String),

    /// A job with this identifier already exists.
    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    /// The artifact was requested before the job finished.
    #[error("{0}")]
    Conflict(String),

    /// The job ended in the error state; carries the recorded diagnostic.
    #[error("{0}")]
    Failed(String),

    /// Malformed request.
    #[error("{0}")]
    Validation(String),

    /// Required server configuration is absent.
    #[error("{0}")]
    Configuration(String),

    /// A status change that would break the job state machine.
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// An external tool invocation failed outside a pipeline run.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

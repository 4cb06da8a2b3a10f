use thiserror::Error;

use crate::types::job::JobId;
use crate::types::states::JobStatus;

/// Failures reported by the job queue. None of these leave a queue partly
/// updated.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum QueueError {
    /// No claimable job currently exists.
    #[error("no jobs in queue")]
    QueueEmpty,

    #[error("unable to find job {id}")]
    NotFound { id: JobId },

    /// The change breaks the lifecycle, or the caller doesn't hold the job.
    #[error("job {id} cannot move from {from} to {to}")]
    TransitionNotAllowed {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("invalid input: {value:?}")]
    InvalidInput { value: String },

    /// A caller-assigned ID is already taken.
    #[error("job id {id} is already in use")]
    IdInUse { id: JobId },

    /// Every ID above the highest one in use is taken.
    #[error("no job ids left to assign")]
    IdsExhausted,
}

pub type Result<T> = std::result::Result<T, QueueError>;

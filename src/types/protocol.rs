use tracing::error;

use super::job::{Job, JobId, JobType};
use super::serialisable::WireSerialisable;
use crate::error::QueueError;

/// A command sent by the client to the server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Submits a new job of the given type. Replies `INSERTED <id>`.
    ///
    /// On the wire: `enqueue <type>`
    Enqueue { job_type: JobType },
    /// Claims the next available job for `consumer`, preferring time-critical
    /// work. Replies `RESERVED` with the job, or `QUEUE_EMPTY`.
    ///
    /// On the wire: `dequeue <consumer>`
    Dequeue { consumer: String },
    /// Marks a job claimed by `consumer` as done. Replies `CONCLUDED`,
    /// `NOT_FOUND`, or `NOT_ALLOWED` if the job isn't in progress or is held
    /// by someone else.
    ///
    /// On the wire: `conclude <id> <consumer>`
    Conclude { id: JobId, consumer: String },
    /// Cancels a queued or in-progress job. Replies `CANCELLED`, `NOT_FOUND`
    /// or `NOT_ALLOWED`.
    ///
    /// On the wire: `cancel <id>`
    Cancel { id: JobId },
    /// Looks up a job regardless of its state. Replies `FOUND` with the job,
    /// or `NOT_FOUND`.
    ///
    /// On the wire: `status <id>`
    Status { id: JobId },
    /// Requests that the server close this connection.
    ///
    /// On the wire: `quit`
    Quit,
}

/// All possible responses to a `Command`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// Indicates a server bug. Can be sent in response to any command.
    ///
    /// On the wire: `INTERNAL_ERROR`.
    InternalError,
    /// In response to an `enqueue`, indicates a job was created with the given
    /// ID.
    ///
    /// On the wire: `INSERTED <id>`.
    Inserted { id: JobId },
    /// In response to a `dequeue`, carries the job just claimed.
    ///
    /// On the wire: `RESERVED <n_bytes>` plus the job as JSON.
    Reserved { job: Job },
    /// In response to a `dequeue`, indicates no job is currently claimable.
    ///
    /// On the wire: `QUEUE_EMPTY`.
    QueueEmpty,
    /// On the wire: `CONCLUDED`.
    Concluded,
    /// On the wire: `CANCELLED`.
    Cancelled,
    /// In response to a `status`, carries the job.
    ///
    /// On the wire: `FOUND <n_bytes>` plus the job as JSON.
    Found { job: Job },
    /// The job ID isn't known to the server.
    ///
    /// On the wire: `NOT_FOUND`.
    NotFound,
    /// The job's state, or who holds it, forbids the requested change.
    ///
    /// On the wire: `NOT_ALLOWED`.
    NotAllowed,
    /// A value in the command was well-formed but not recognised, such as an
    /// unknown job type.
    ///
    /// On the wire: `INVALID_INPUT`.
    InvalidInput,
}

impl From<QueueError> for Response {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::QueueEmpty => Response::QueueEmpty,
            QueueError::NotFound { .. } => Response::NotFound,
            QueueError::TransitionNotAllowed { .. } => Response::NotAllowed,
            QueueError::InvalidInput { .. } => Response::InvalidInput,
            QueueError::IdInUse { .. } | QueueError::IdsExhausted => {
                Response::InternalError
            },
        }
    }
}

/// Frames `job` as `<tag> <n_bytes>\r\n<json>\r\n`.
fn with_job_body(tag: &str, job: &Job) -> Vec<u8> {
    match serde_json::to_vec(job) {
        Ok(data) => [
            format!("{tag} {}\r\n", data.len()).into_bytes(),
            data,
            b"\r\n".to_vec(),
        ]
        .concat(),
        Err(error) => {
            error!(%error, id = job.id, "failed to encode job");
            b"INTERNAL_ERROR\r\n".to_vec()
        },
    }
}

impl WireSerialisable for Response {
    fn serialise_wire(&self) -> Vec<u8> {
        use Response::*;

        match self {
            InternalError => b"INTERNAL_ERROR\r\n".to_vec(),
            Inserted { id } => format!("INSERTED {id}\r\n").into(),
            Reserved { job } => with_job_body("RESERVED", job),
            QueueEmpty => b"QUEUE_EMPTY\r\n".to_vec(),
            Concluded => b"CONCLUDED\r\n".to_vec(),
            Cancelled => b"CANCELLED\r\n".to_vec(),
            Found { job } => with_job_body("FOUND", job),
            NotFound => b"NOT_FOUND\r\n".to_vec(),
            NotAllowed => b"NOT_ALLOWED\r\n".to_vec(),
            InvalidInput => b"INVALID_INPUT\r\n".to_vec(),
        }
    }
}

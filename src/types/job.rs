use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::states::JobStatus;
use crate::error::QueueError;

/// Identifies a job across the whole system. Zero is never assigned, and
/// marks a job that has yet to be given an ID.
pub type JobId = u64;

/// Determines which priority level a job is routed to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    TimeCritical,
    NotTimeCritical,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::TimeCritical => "TIME_CRITICAL",
            JobType::NotTimeCritical => "NOT_TIME_CRITICAL",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&[u8]> for JobType {
    type Error = QueueError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            b"TIME_CRITICAL" => Ok(JobType::TimeCritical),
            b"NOT_TIME_CRITICAL" => Ok(JobType::NotTimeCritical),
            _ => Err(QueueError::InvalidInput {
                value: String::from_utf8_lossy(value).into_owned(),
            }),
        }
    }
}

impl FromStr for JobType {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.as_bytes().try_into()
    }
}

/// A unit of work. Only the status and claimant ever change once the job has
/// been enqueued.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Job {
    #[serde(rename = "ID")]
    pub id: JobId,
    #[serde(rename = "Type")]
    pub job_type: JobType,
    #[serde(rename = "Status")]
    pub status: JobStatus,
    /// The consumer that claimed this job, set by a successful dequeue.
    #[serde(rename = "ConsumerID", skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<String>,
}

impl Job {
    /// Creates an unclaimed, queued job that has yet to be assigned an ID.
    pub fn new(job_type: JobType) -> Self {
        Self {
            id: 0,
            job_type,
            status: JobStatus::Queued,
            consumer_id: None,
        }
    }

    /// As `new`, but with an ID chosen by the caller.
    pub fn with_id(id: JobId, job_type: JobType) -> Self {
        Self {
            id,
            ..Self::new(job_type)
        }
    }

    /// Reports whether `consumer_id` is the consumer holding this job.
    pub fn is_held_by(&self, consumer_id: &str) -> bool {
        self.consumer_id.as_deref() == Some(consumer_id)
    }
}

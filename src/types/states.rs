use std::fmt;

use serde::Serialize;

/// Where a job sits in its lifecycle.
///
/// The permitted transitions are:
///
/// * `Queued -> InProgress`, when a consumer claims the job;
/// * `InProgress -> Concluded`, when the claiming consumer finishes it;
/// * `Queued -> Cancelled` and `InProgress -> Cancelled`, administratively.
///
/// `Concluded` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Concluded,
    Cancelled,
}

impl JobStatus {
    /// Reports whether a job in this state may move to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, next),
            (Queued, InProgress)
                | (InProgress, Concluded)
                | (Queued, Cancelled)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        use JobStatus::*;

        match self {
            Queued => "QUEUED",
            InProgress => "IN_PROGRESS",
            Concluded => "CONCLUDED",
            Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::collections::HashMap;

use crate::error::{QueueError, Result};
use crate::types::job::{Job, JobId};

/// Finds the first ID after `last_max` for which `taken` is false.
///
/// IDs are handed out densely from 1, so this only walks past IDs a caller
/// inserted out of turn. Fails once the search runs past `JobId::MAX`.
pub(crate) fn next_free_id(
    last_max: JobId,
    taken: impl Fn(JobId) -> bool,
) -> Result<JobId> {
    let mut id = last_max.checked_add(1).ok_or(QueueError::IdsExhausted)?;
    while taken(id) {
        id = id.checked_add(1).ok_or(QueueError::IdsExhausted)?;
    }
    Ok(id)
}

/// Holds the canonical record of every job a queue has accepted.
#[derive(Debug, Default)]
pub(crate) struct JobRegistry {
    jobs: HashMap<JobId, Job>,
    /// Highest ID handed out or inserted so far.
    max_id: JobId,
}

impl JobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `job` under the next free ID, returning that ID.
    pub(crate) fn create(&mut self, mut job: Job) -> Result<JobId> {
        let id = next_free_id(self.max_id, |id| self.jobs.contains_key(&id))?;

        job.id = id;
        self.jobs.insert(id, job);
        self.max_id = id;

        Ok(id)
    }

    /// Stores `job` under the ID it already carries.
    pub(crate) fn insert(&mut self, job: Job) -> Result<JobId> {
        let id = job.id;
        if id == 0 || self.jobs.contains_key(&id) {
            return Err(QueueError::IdInUse { id });
        }

        self.jobs.insert(id, job);
        self.max_id = self.max_id.max(id);

        Ok(id)
    }

    pub(crate) fn get(&self, id: JobId) -> Result<&Job> {
        self.jobs.get(&id).ok_or(QueueError::NotFound { id })
    }

    /// Replaces the stored record with the same ID as `job`.
    pub(crate) fn update(&mut self, job: Job) -> Result<()> {
        match self.jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job;
                Ok(())
            },
            None => Err(QueueError::NotFound { id: job.id }),
        }
    }
}

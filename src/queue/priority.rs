use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use super::registry::next_free_id;
use super::{InMemoryQueue, JobQueue};
use crate::error::{QueueError, Result};
use crate::types::job::{Job, JobId, JobType};

/// The two service levels jobs are routed between.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Priority {
    High,
    Low,
}

impl From<JobType> for Priority {
    fn from(value: JobType) -> Self {
        match value {
            JobType::TimeCritical => Priority::High,
            JobType::NotTimeCritical => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Low => "low",
        })
    }
}

/// Tracks which sub-queue owns each job, and hands out IDs that are unique
/// across both.
#[derive(Debug, Default)]
struct Routes {
    owners: HashMap<JobId, Priority>,
    max_id: JobId,
}

impl Routes {
    fn allocate(&self) -> Result<JobId> {
        next_free_id(self.max_id, |id| self.owners.contains_key(&id))
    }

    fn record(&mut self, id: JobId, priority: Priority) {
        self.owners.insert(id, priority);
        self.max_id = self.max_id.max(id);
    }
}

/// Composes a high- and a low-priority queue into a single queue that always
/// serves time-critical work first.
///
/// IDs are allocated here rather than in the sub-queues, so they are unique
/// across both, and the owning sub-queue of every ID is remembered for
/// `conclude`, `cancel` and `fetch_job`.
///
/// Locks are always taken in the order routing table, then one sub-queue. No
/// operation holds both sub-queue locks at once.
#[derive(Debug)]
pub struct PriorityQueue<Q = InMemoryQueue> {
    high: Q,
    low: Q,
    routes: RwLock<Routes>,
}

impl<Q: JobQueue> PriorityQueue<Q> {
    pub fn new(high: Q, low: Q) -> Self {
        Self {
            high,
            low,
            routes: RwLock::new(Routes::default()),
        }
    }

    /// The sub-queue serving `priority`. Jobs must only reach it through the
    /// router.
    fn queue(&self, priority: Priority) -> &Q {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    fn route(&self, id: JobId) -> Result<Priority> {
        self.routes
            .read()
            .owners
            .get(&id)
            .copied()
            .ok_or(QueueError::NotFound { id })
    }
}

impl<Q: JobQueue + Default> Default for PriorityQueue<Q> {
    fn default() -> Self {
        Self::new(Q::default(), Q::default())
    }
}

impl<Q: JobQueue> JobQueue for PriorityQueue<Q> {
    fn enqueue(&self, mut job: Job) -> Result<JobId> {
        let priority = Priority::from(job.job_type);

        // Hold the routing table across the sub-queue insert so no job is
        // ever visible without a route.
        let mut routes = self.routes.write();

        if job.id == 0 {
            job.id = routes.allocate()?;
        } else if routes.owners.contains_key(&job.id) {
            return Err(QueueError::IdInUse { id: job.id });
        }

        let id = self.queue(priority).enqueue(job)?;
        routes.record(id, priority);

        debug!(id, %priority, "routed job");

        Ok(id)
    }

    fn dequeue(&self, consumer_id: &str) -> Result<Job> {
        // Each sub-queue call takes and releases its own lock, so the high
        // queue is unlocked before the low queue is tried.
        match self.high.dequeue(consumer_id) {
            Err(QueueError::QueueEmpty) => self.low.dequeue(consumer_id),
            res => res,
        }
    }

    fn conclude(&self, id: JobId, consumer_id: &str) -> Result<()> {
        let priority = self.route(id)?;
        self.queue(priority).conclude(id, consumer_id)
    }

    fn cancel(&self, id: JobId) -> Result<()> {
        let priority = self.route(id)?;
        self.queue(priority).cancel(id)
    }

    fn fetch_job(&self, id: JobId) -> Result<Job> {
        let priority = self.route(id)?;
        self.queue(priority).fetch_job(id)
    }
}

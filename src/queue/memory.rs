use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::registry::JobRegistry;
use super::JobQueue;
use crate::error::{QueueError, Result};
use crate::types::job::{Job, JobId};
use crate::types::states::JobStatus;

/// A FIFO job queue held entirely in memory.
///
/// Job records live in a registry keyed by ID; a separate sequence of pending
/// IDs preserves arrival order. Cancelling or concluding a job only rewrites
/// its record: the stale ID stays in the sequence and is discarded when a
/// later dequeue pops it.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<JobId>,
    registry: JobRegistry,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                pending: VecDeque::new(),
                registry: JobRegistry::new(),
            }),
        }
    }

    /// Number of IDs waiting in the pending sequence, including any stale
    /// entries not yet skipped by a dequeue.
    pub fn len(&self) -> usize {
        self.inner.read().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fails unless a job in `from` may move to `to`.
fn check_transition(id: JobId, from: JobStatus, to: JobStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(QueueError::TransitionNotAllowed { id, from, to })
    }
}

impl JobQueue for InMemoryQueue {
    fn enqueue(&self, mut job: Job) -> Result<JobId> {
        job.status = JobStatus::Queued;
        job.consumer_id = None;

        let mut inner = self.inner.write();

        let id = if job.id == 0 {
            inner.registry.create(job)?
        } else {
            inner.registry.insert(job)?
        };
        inner.pending.push_back(id);

        debug!(id, pending = inner.pending.len(), "enqueued job");

        Ok(id)
    }

    fn dequeue(&self, consumer_id: &str) -> Result<Job> {
        let mut inner = self.inner.write();

        // Pop IDs until one refers to a job that's still queued; anything else
        // was claimed, concluded or cancelled since it was enqueued.
        while let Some(id) = inner.pending.pop_front() {
            let job = inner.registry.get(id)?;

            if job.status != JobStatus::Queued {
                trace!(id, status = %job.status, "skipping stale entry");
                continue;
            }

            let mut job = job.clone();
            job.status = JobStatus::InProgress;
            job.consumer_id = Some(consumer_id.to_owned());
            inner.registry.update(job.clone())?;

            debug!(id, consumer_id, "claimed job");

            return Ok(job);
        }

        Err(QueueError::QueueEmpty)
    }

    fn conclude(&self, id: JobId, consumer_id: &str) -> Result<()> {
        let mut inner = self.inner.write();

        let job = inner.registry.get(id)?;
        check_transition(id, job.status, JobStatus::Concluded)?;
        if !job.is_held_by(consumer_id) {
            return Err(QueueError::TransitionNotAllowed {
                id,
                from: job.status,
                to: JobStatus::Concluded,
            });
        }

        let mut job = job.clone();
        job.status = JobStatus::Concluded;
        inner.registry.update(job)?;

        debug!(id, consumer_id, "concluded job");

        Ok(())
    }

    fn cancel(&self, id: JobId) -> Result<()> {
        let mut inner = self.inner.write();

        let job = inner.registry.get(id)?;
        check_transition(id, job.status, JobStatus::Cancelled)?;

        let mut job = job.clone();
        job.status = JobStatus::Cancelled;
        inner.registry.update(job)?;

        debug!(id, "cancelled job");

        Ok(())
    }

    fn fetch_job(&self, id: JobId) -> Result<Job> {
        self.inner.read().registry.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::types::job::JobType;

    fn job_in(id: JobId, status: JobStatus) -> Job {
        Job {
            status,
            ..Job::with_id(id, JobType::NotTimeCritical)
        }
    }

    #[test]
    fn test_enqueue() {
        let q = InMemoryQueue::new();

        assert_eq!(q.enqueue(Job::new(JobType::TimeCritical)), Ok(1));
        assert_eq!(q.enqueue(Job::new(JobType::TimeCritical)), Ok(2));
        assert_eq!(q.len(), 2);

        let job = q.fetch_job(2).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.consumer_id, None);

        // A caller-chosen ID is kept, and later allocations continue after it.
        assert_eq!(q.enqueue(Job::with_id(10, JobType::TimeCritical)), Ok(10));
        assert_eq!(q.enqueue(Job::new(JobType::TimeCritical)), Ok(11));
        assert_eq!(
            q.enqueue(Job::with_id(10, JobType::TimeCritical)),
            Err(QueueError::IdInUse { id: 10 })
        );
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_enqueue_resets_lifecycle_fields() {
        let q = InMemoryQueue::new();

        let mut job = Job::new(JobType::TimeCritical);
        job.status = JobStatus::Concluded;
        job.consumer_id = Some("c1".into());

        let id = q.enqueue(job).unwrap();
        let job = q.fetch_job(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.consumer_id, None);
    }

    #[test]
    fn test_enqueue_after_highest_id() {
        let q = InMemoryQueue::new();

        assert_eq!(
            q.enqueue(Job::with_id(JobId::MAX, JobType::NotTimeCritical)),
            Ok(JobId::MAX)
        );
        assert_eq!(
            q.enqueue(Job::new(JobType::NotTimeCritical)),
            Err(QueueError::IdsExhausted)
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.fetch_job(0), Err(QueueError::NotFound { id: 0 }));
    }

    #[test]
    fn test_dequeue_skips_stale_entries() {
        let q = InMemoryQueue::new();
        {
            let mut inner = q.inner.write();
            for (id, status) in [
                (1, JobStatus::InProgress),
                (2, JobStatus::Concluded),
                (3, JobStatus::Cancelled),
                (4, JobStatus::Queued),
            ] {
                inner.registry.insert(job_in(id, status)).unwrap();
                inner.pending.push_back(id);
            }
        }

        let job = q.dequeue("c1").unwrap();
        assert_eq!(job.id, 4);
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.consumer_id.as_deref(), Some("c1"));
        assert!(q.is_empty());
        assert_eq!(q.dequeue("c1"), Err(QueueError::QueueEmpty));
    }

    #[test]
    fn test_dequeue_is_fifo_and_exactly_once() {
        let q = InMemoryQueue::new();
        for _ in 0..3 {
            q.enqueue(Job::new(JobType::NotTimeCritical)).unwrap();
        }

        assert_eq!(q.dequeue("a").unwrap().id, 1);
        assert_eq!(q.dequeue("b").unwrap().id, 2);
        assert_eq!(q.dequeue("a").unwrap().id, 3);
        assert_eq!(q.dequeue("a"), Err(QueueError::QueueEmpty));

        assert_eq!(q.fetch_job(2).unwrap().consumer_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_dequeue_missing_record() {
        let q = InMemoryQueue::new();
        q.inner.write().pending.push_back(42);

        assert_eq!(q.dequeue("c1"), Err(QueueError::NotFound { id: 42 }));
    }

    #[test]
    fn test_cancel_then_dequeue() {
        let q = InMemoryQueue::new();
        let id = q.enqueue(Job::new(JobType::TimeCritical)).unwrap();

        q.cancel(id).unwrap();
        // The cancelled ID is still pending until a dequeue skips it.
        assert_eq!(q.len(), 1);
        assert_eq!(q.dequeue("c1"), Err(QueueError::QueueEmpty));
        assert_eq!(q.len(), 0);
        assert_eq!(q.fetch_job(id).unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn test_cancel() {
        let q = InMemoryQueue::new();
        assert_eq!(q.cancel(1), Err(QueueError::NotFound { id: 1 }));

        let id = q.enqueue(Job::new(JobType::TimeCritical)).unwrap();
        q.dequeue("c1").unwrap();
        q.cancel(id).unwrap();

        let job = q.fetch_job(id).unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.consumer_id.as_deref(), Some("c1"));

        assert_eq!(
            q.cancel(id),
            Err(QueueError::TransitionNotAllowed {
                id,
                from: JobStatus::Cancelled,
                to: JobStatus::Cancelled,
            })
        );

        let id = q.enqueue(Job::new(JobType::TimeCritical)).unwrap();
        q.dequeue("c1").unwrap();
        q.conclude(id, "c1").unwrap();
        assert_eq!(
            q.cancel(id),
            Err(QueueError::TransitionNotAllowed {
                id,
                from: JobStatus::Concluded,
                to: JobStatus::Cancelled,
            })
        );
    }

    #[test]
    fn test_conclude_requires_owner() {
        let q = InMemoryQueue::new();
        let id = q.enqueue(Job::new(JobType::TimeCritical)).unwrap();

        // Not yet claimed.
        assert_eq!(
            q.conclude(id, "c1"),
            Err(QueueError::TransitionNotAllowed {
                id,
                from: JobStatus::Queued,
                to: JobStatus::Concluded,
            })
        );

        let job = q.dequeue("c1").unwrap();
        assert_eq!(job.id, id);

        assert_eq!(
            q.conclude(id, "c2"),
            Err(QueueError::TransitionNotAllowed {
                id,
                from: JobStatus::InProgress,
                to: JobStatus::Concluded,
            })
        );
        assert_eq!(q.fetch_job(id).unwrap().status, JobStatus::InProgress);

        q.conclude(id, "c1").unwrap();
        assert_eq!(q.fetch_job(id).unwrap().status, JobStatus::Concluded);

        assert!(matches!(
            q.conclude(id, "c1"),
            Err(QueueError::TransitionNotAllowed { .. })
        ));
        assert_eq!(q.conclude(99, "c1"), Err(QueueError::NotFound { id: 99 }));
    }

    #[test]
    fn test_concurrent_dequeue_claims_each_job_once() {
        const JOBS: usize = 500;
        const CONSUMERS: usize = 8;

        let q = Arc::new(InMemoryQueue::new());
        for _ in 0..JOBS {
            q.enqueue(Job::new(JobType::NotTimeCritical)).unwrap();
        }

        let handles: Vec<_> = (0..CONSUMERS)
            .map(|n| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let consumer = format!("c{n}");
                    let mut claimed = Vec::new();
                    while let Ok(job) = q.dequeue(&consumer) {
                        assert!(job.is_held_by(&consumer));
                        claimed.push(job.id);
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "job {id} claimed twice");
            }
        }
        assert_eq!(seen.len(), JOBS);
    }
}

//! The job queue engine: a registry-backed FIFO queue, and a router composing
//! two of them into a two-level priority queue.
mod memory;
mod priority;
mod registry;

pub use memory::InMemoryQueue;
pub use priority::{Priority, PriorityQueue};

use crate::error::Result;
use crate::types::job::{Job, JobId};

/// The operations a job queue offers to producers and consumers.
///
/// Implementations are shared between connection tasks, so every method takes
/// `&self` and does its own locking.
pub trait JobQueue: Send + Sync {
    /// Accepts a job, returning its ID. A job carrying a zero ID is given the
    /// next free one; a non-zero ID is used as-is.
    fn enqueue(&self, job: Job) -> Result<JobId>;

    /// Claims the oldest queued job on behalf of `consumer_id`.
    fn dequeue(&self, consumer_id: &str) -> Result<Job>;

    /// Marks a job claimed by `consumer_id` as done.
    fn conclude(&self, id: JobId, consumer_id: &str) -> Result<()>;

    /// Cancels a job that is queued or in progress, whoever holds it.
    fn cancel(&self, id: JobId) -> Result<()>;

    fn fetch_job(&self, id: JobId) -> Result<Job>;
}

//! Least-loaded routing across a fixed pool of task queues.

use crate::error::QueueError;
use crate::queue::{QueueOptions, TaskOptions, TaskQueue};

/// Snapshot of one queue's load, reported by [`QueueManager::queue_statuses`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueStatus {
    /// The queue's name.
    pub name: String,
    /// Current execution-queue length.
    pub length: usize,
}

/// Distributes submissions across a fixed pool of [`TaskQueue`]s.
///
/// Every queue in the pool shares the same options and concurrency limit and
/// is named `Queue-1` through `Queue-N`. Each submission is routed to the
/// queue with the fewest currently queued tasks, recomputed fresh on every
/// call; there is no sticky assignment and already-queued work is never
/// rebalanced.
pub struct QueueManager<T> {
    queues: Vec<TaskQueue<T>>,
}

impl<T> QueueManager<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a pool of `count` queues.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::PoolMustBePositive`] if `count` is 0 and
    /// [`QueueError::ConcurrencyMustBePositive`] if `concurrency` is 0.
    pub async fn new(
        count: usize,
        opts: QueueOptions<T>,
        concurrency: usize,
    ) -> Result<Self, QueueError> {
        if count == 0 {
            return Err(QueueError::PoolMustBePositive);
        }

        let mut queues = Vec::with_capacity(count);
        for index in 0..count {
            let queue =
                TaskQueue::new(format!("Queue-{}", index + 1), opts.clone(), concurrency).await?;
            queues.push(queue);
        }

        Ok(Self { queues })
    }

    /// Route a submission to the least-loaded queue.
    ///
    /// Load is the current execution-queue length; ties go to the first queue
    /// in pool order. The per-submission options carry the debounce delay and
    /// optional action/error overrides.
    pub async fn add_task(&self, key: impl Into<String>, task: T, opts: TaskOptions<T>) {
        let Some(queue) = self.queues.iter().min_by_key(|queue| queue.queue_len()) else {
            return;
        };
        queue.submit_with(key, task, opts).await;
    }

    /// Total number of queued tasks across the pool.
    #[must_use]
    pub fn total_tasks(&self) -> usize {
        self.queues.iter().map(TaskQueue::queue_len).sum()
    }

    /// Per-queue status snapshot, in pool order.
    #[must_use]
    pub fn queue_statuses(&self) -> Vec<QueueStatus> {
        self.queues
            .iter()
            .map(|queue| QueueStatus {
                name: queue.name().to_string(),
                length: queue.queue_len(),
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Error types for the debounced task queue.

use thiserror::Error;

/// Opaque error produced by caller-supplied actions and storage backends.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when constructing a queue or manager.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A queue requires a concurrency limit of at least one.
    #[error("Invalid configuration: concurrency must be greater than 0")]
    ConcurrencyMustBePositive,

    /// A manager requires at least one queue in its pool.
    #[error("Invalid configuration: pool size must be greater than 0")]
    PoolMustBePositive,
}

/// A task failure annotated with the owning queue's name.
///
/// Forwarded to the caller's error hook when an action fails or when
/// persisting a fired task fails. The display form prefixes the queue name so
/// callers sharing one hook across a pool can attribute failures.
#[derive(Debug, Error)]
#[error("{queue} - {source}")]
pub struct TaskFailure {
    /// Name of the queue the task belonged to.
    pub queue: String,
    /// The underlying action or storage error.
    #[source]
    pub source: TaskError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_failure_prefixes_queue_name() {
        let failure = TaskFailure {
            queue: "Queue-1".into(),
            source: "boom".into(),
        };
        assert_eq!(failure.to_string(), "Queue-1 - boom");
    }

    #[test]
    fn config_errors_are_descriptive() {
        assert!(QueueError::ConcurrencyMustBePositive
            .to_string()
            .contains("concurrency must be greater than 0"));
        assert!(QueueError::PoolMustBePositive
            .to_string()
            .contains("pool size must be greater than 0"));
    }
}

//! A debounced, concurrency-limited async task queue with pluggable persistence.
//!
//! Callers submit keyed tasks with a delay; re-submitting the same key within
//! the delay window re-schedules it (last write wins). When a timer fires the
//! task is persisted, appended to an execution queue, and processed under a
//! bounded concurrency limit by a user-supplied action, with failures routed
//! to a user-supplied error hook. A [`QueueManager`] spreads submissions
//! across a pool of queues by current queue depth.
//!
//! # Architecture
//!
//! ```text
//!              submit(key, task, delay)
//!                        │ debounce
//!                        ▼
//! ┌─────────────┐   ┌───────────┐   ┌──────────────┐
//! │ TaskStore   │◄──│ TaskQueue │──►│ action(task) │
//! │ save/delete │   │ drain×N   │   │ error(fail)  │
//! └─────────────┘   └───────────┘   └──────────────┘
//! ```
//!
//! Delivery is single-process, best-effort, at-least-once. The default
//! [`MemoryStore`] satisfies the persistence contract without durability;
//! implement [`TaskStore`] for real crash recovery.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use debounce_queue::{QueueManager, QueueOptions, TaskError, TaskOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), debounce_queue::QueueError> {
//!     let opts = QueueOptions::new(
//!         |task: String| async move {
//!             println!("processing {task}");
//!             Ok::<(), TaskError>(())
//!         },
//!         |failure| eprintln!("{failure}"),
//!     );
//!
//!     let manager = QueueManager::new(4, opts, 2).await?;
//!     manager
//!         .add_task(
//!             "user-42",
//!             "send welcome email".to_string(),
//!             TaskOptions::default().with_delay(Duration::from_millis(250)),
//!         )
//!         .await;
//!     Ok(())
//! }
//! ```

mod error;
mod manager;
mod queue;
mod store;

pub use error::{QueueError, TaskError, TaskFailure};
pub use manager::{QueueManager, QueueStatus};
pub use queue::{
    normalized_eq, Action, ActionFuture, ErrorHook, QueueOptions, TaskEq, TaskOptions, TaskQueue,
    DEFAULT_DELAY,
};
pub use store::{MemoryStore, StoreError, TaskStore};

//! Persistence backends for pending tasks.
//!
//! This module provides:
//! - [`TaskStore`] trait - Durability contract used by a queue for crash recovery
//! - [`MemoryStore`] - Non-durable in-memory default
//!
//! A queue persists every fired task before it becomes visible to the drain
//! loop, and deletes it again after the action succeeds. On construction the
//! queue loads whatever the store still holds and drains it.

use std::error::Error;

mod memory;

pub use memory::MemoryStore;

/// Shared error type used by store backends.
pub type StoreError = Box<dyn Error + Send + Sync + 'static>;

/// Durability contract a queue depends on for crash recovery.
///
/// Implementations only need the contract shape; ordering beyond "`save`
/// completes before the task is enqueued" is not required.
///
/// # Example
///
/// ```rust,no_run
/// use debounce_queue::{MemoryStore, StoreError, TaskStore};
///
/// # async fn example() -> Result<(), StoreError> {
/// let store: MemoryStore<String> = MemoryStore::new();
/// let saved = store.save("job".to_string()).await?;
/// let remaining = store.delete(&saved).await?;
/// assert!(remaining.is_empty());
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait TaskStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Return all currently durable tasks.
    ///
    /// Called once per queue, at construction, to recover pending work.
    async fn get(&self) -> Result<Vec<T>, StoreError>;

    /// Durably record a task, returning it once the write has settled.
    async fn save(&self, task: T) -> Result<T, StoreError>;

    /// Remove a processed task, returning the remaining durable set.
    async fn delete(&self, task: &T) -> Result<Vec<T>, StoreError>;
}

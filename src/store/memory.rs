//! In-memory store implementation for testing and simple use cases.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::{StoreError, TaskStore};

const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1000);

/// In-memory task store.
///
/// Satisfies the [`TaskStore`] contract shape without actual durability: data
/// is lost on process restart. A queue falls back to this store when the
/// caller supplies none, which makes it the default for tests and
/// single-process setups that don't need recovery.
///
/// `save` resolves only after a fixed settle delay, modeling an asynchronous
/// backing store; the delay is configurable via [`MemoryStore::with_save_delay`].
///
/// # Cloning
///
/// `Clone` is implemented manually to avoid requiring `T: Clone`.
/// Cloning creates a new handle to the **same** underlying list, so callers
/// can keep a handle for inspection after handing one to a queue.
pub struct MemoryStore<T> {
    tasks: Arc<Mutex<Vec<T>>>,
    save_delay: Duration,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            save_delay: self.save_delay,
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }

    /// Override the settle delay applied by `save`.
    #[must_use]
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    /// Get the number of stored tasks.
    #[must_use = "this returns the count, it doesn't modify the store"]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Check if the store is empty.
    #[must_use = "this returns a boolean, it doesn't modify the store"]
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

#[async_trait::async_trait]
impl<T> TaskStore<T> for MemoryStore<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    async fn get(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.tasks.lock().clone())
    }

    async fn save(&self, task: T) -> Result<T, StoreError> {
        self.tasks.lock().push(task.clone());
        tokio::time::sleep(self.save_delay).await;
        Ok(task)
    }

    async fn delete(&self, task: &T) -> Result<Vec<T>, StoreError> {
        // Full structural equality via serialization, unlike the normalized
        // comparison the drain loop uses for dedup.
        let target = serde_json::to_string(task)?;
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| {
            serde_json::to_string(t)
                .map(|s| s != target)
                .unwrap_or(true)
        });
        Ok(tasks.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, serde::Serialize)]
    struct TestTask {
        id: u64,
    }

    #[tokio::test]
    async fn store_new_is_empty() {
        let store: MemoryStore<TestTask> = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn save_appends_and_returns_task() {
        let store: MemoryStore<TestTask> = MemoryStore::new();
        let saved = store.save(TestTask { id: 1 }).await.unwrap();
        assert_eq!(saved, TestTask { id: 1 });
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn save_settles_after_delay() {
        let store: MemoryStore<TestTask> =
            MemoryStore::new().with_save_delay(Duration::from_millis(200));

        let start = tokio::time::Instant::now();
        store.save(TestTask { id: 1 }).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_removes_structurally_equal_entries() {
        let store: MemoryStore<TestTask> =
            MemoryStore::new().with_save_delay(Duration::ZERO);
        store.save(TestTask { id: 1 }).await.unwrap();
        store.save(TestTask { id: 2 }).await.unwrap();
        store.save(TestTask { id: 1 }).await.unwrap();

        let remaining = store.delete(&TestTask { id: 1 }).await.unwrap();
        assert_eq!(remaining, vec![TestTask { id: 2 }]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clone_shares_state() {
        let store1: MemoryStore<TestTask> =
            MemoryStore::new().with_save_delay(Duration::ZERO);
        let store2 = store1.clone();

        store1.save(TestTask { id: 42 }).await.unwrap();
        assert_eq!(store2.len(), 1);
        assert_eq!(store2.get().await.unwrap(), vec![TestTask { id: 42 }]);
    }
}

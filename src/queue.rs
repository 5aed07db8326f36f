//! Single-queue engine: debounce timers, dedup, and the concurrency-limited
//! drain loop.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use crate::error::{QueueError, TaskError, TaskFailure};
use crate::store::{MemoryStore, TaskStore};

/// Debounce delay used by [`TaskOptions::default`].
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Boxed future returned by task actions.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// Caller-supplied action invoked once per drained task.
pub type Action<T> = Arc<dyn Fn(T) -> ActionFuture + Send + Sync>;

/// Caller-supplied hook receiving annotated task failures.
pub type ErrorHook = Arc<dyn Fn(TaskFailure) + Send + Sync>;

/// Equality strategy used to coalesce queued tasks.
pub type TaskEq<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Default task equality: serialize both values, keep only ASCII
/// alphanumerics and hyphens, and compare the results exactly.
///
/// Structurally different values can normalize to the same string; callers
/// that need stricter identity should inject their own strategy via
/// [`QueueOptions::with_equality`]. Values that fail to serialize never
/// compare equal.
pub fn normalized_eq<T: Serialize>(a: &T, b: &T) -> bool {
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn normalize<T: Serialize>(value: &T) -> Option<String> {
    let json = serde_json::to_string(value).ok()?;
    Some(
        json.chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect(),
    )
}

/// Options shared by every submission on a queue.
///
/// Carries the action, the error hook, the persistence store (an in-memory
/// default when none is injected), the task-equality strategy, and the settle
/// delay applied to [`TaskQueue::submit`].
pub struct QueueOptions<T> {
    action: Action<T>,
    error: ErrorHook,
    store: Arc<dyn TaskStore<T>>,
    equality: TaskEq<T>,
    settle: Duration,
}

impl<T> Clone for QueueOptions<T> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            error: Arc::clone(&self.error),
            store: Arc::clone(&self.store),
            equality: Arc::clone(&self.equality),
            settle: self.settle,
        }
    }
}

impl<T> QueueOptions<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Create options with the given action and error hook, a non-durable
    /// [`MemoryStore`], and [`normalized_eq`] as the equality strategy.
    pub fn new<A, F, E>(action: A, error: E) -> Self
    where
        A: Fn(T) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
        E: Fn(TaskFailure) + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(move |task| -> ActionFuture { Box::pin(action(task)) }),
            error: Arc::new(error),
            store: Arc::new(MemoryStore::new()),
            equality: Arc::new(normalized_eq::<T>),
            settle: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl<T> QueueOptions<T>
where
    T: Send + Sync + 'static,
{
    /// Create options with an explicit store and equality strategy.
    ///
    /// Unlike [`QueueOptions::new`], this places no `Serialize` bound on the
    /// task type; the bound belongs to the defaults, not the engine.
    pub fn custom<A, F, E, S, Q>(action: A, error: E, store: S, equality: Q) -> Self
    where
        A: Fn(T) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
        E: Fn(TaskFailure) + Send + Sync + 'static,
        S: TaskStore<T> + 'static,
        Q: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            action: Arc::new(move |task| -> ActionFuture { Box::pin(action(task)) }),
            error: Arc::new(error),
            store: Arc::new(store),
            equality: Arc::new(equality),
            settle: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Inject a persistence store in place of the in-memory default.
    #[must_use]
    pub fn with_store(mut self, store: impl TaskStore<T> + 'static) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Replace the task-equality strategy used for dedup.
    #[must_use]
    pub fn with_equality(
        mut self,
        equality: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.equality = Arc::new(equality);
        self
    }

    /// Override the settle delay after which `submit` resolves (default 500ms).
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle = delay;
        self
    }
}

/// Per-submission overrides accepted by [`TaskQueue::submit_with`] and the
/// manager's `add_task`.
///
/// Unset action and error hooks fall back to the queue's own.
pub struct TaskOptions<T> {
    delay: Duration,
    action: Option<Action<T>>,
    error: Option<ErrorHook>,
}

impl<T> Default for TaskOptions<T> {
    /// Defaults to a 1000ms debounce delay with no overrides.
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            action: None,
            error: None,
        }
    }
}

impl<T> Clone for TaskOptions<T> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            action: self.action.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T> TaskOptions<T> {
    /// Set the debounce delay for this submission.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Override the action for this submission.
    #[must_use]
    pub fn with_action<A, F>(mut self, action: A) -> Self
    where
        A: Fn(T) -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.action = Some(Arc::new(move |task| -> ActionFuture {
            Box::pin(action(task))
        }));
        self
    }

    /// Override the error hook for this submission.
    #[must_use]
    pub fn with_error(mut self, error: impl Fn(TaskFailure) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(error));
        self
    }
}

struct Entry<T> {
    task: T,
    action: Option<Action<T>>,
    error: Option<ErrorHook>,
}

struct Timer {
    handle: AbortHandle,
    generation: u64,
}

struct State<T> {
    queue: VecDeque<Entry<T>>,
    timers: HashMap<String, Timer>,
    next_generation: u64,
    in_flight: usize,
}

struct Inner<T> {
    name: String,
    concurrency: usize,
    action: Action<T>,
    error: ErrorHook,
    equality: TaskEq<T>,
    settle: Duration,
    store: Arc<dyn TaskStore<T>>,
    state: Mutex<State<T>>,
}

/// A named task queue with debounced submission and a bounded-concurrency
/// drain loop.
///
/// Submissions are keyed: re-submitting a key before its timer fires cancels
/// the previous timer and re-schedules (last write wins within the delay
/// window). Once a timer fires the task is persisted, appended to the
/// execution queue, and consumed by up to `concurrency` cooperative drain
/// activations. Equal queued tasks (per the configured equality strategy) are
/// coalesced into a single action invocation at claim time.
///
/// # Cloning
///
/// Cloning creates a new handle to the **same** queue.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use debounce_queue::{QueueOptions, TaskError, TaskQueue};
///
/// # async fn example() -> Result<(), debounce_queue::QueueError> {
/// let opts = QueueOptions::new(
///     |task: String| async move {
///         println!("processing {task}");
///         Ok::<(), TaskError>(())
///     },
///     |failure| eprintln!("{failure}"),
/// );
///
/// let queue = TaskQueue::new("emails", opts, 1).await?;
/// queue
///     .submit("user-42", "send welcome".to_string(), Duration::from_millis(250))
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> TaskQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a named queue with the given options and concurrency limit.
    ///
    /// Loads any previously persisted tasks from the store and, if the load
    /// yields a non-empty queue, starts draining immediately (recovery path).
    /// A store load failure is routed to the error hook and leaves the queue
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ConcurrencyMustBePositive`] if `concurrency` is 0.
    pub async fn new(
        name: impl Into<String>,
        opts: QueueOptions<T>,
        concurrency: usize,
    ) -> Result<Self, QueueError> {
        if concurrency == 0 {
            return Err(QueueError::ConcurrencyMustBePositive);
        }

        let inner = Arc::new(Inner {
            name: name.into(),
            concurrency,
            action: opts.action,
            error: opts.error,
            equality: opts.equality,
            settle: opts.settle,
            store: opts.store,
            state: Mutex::new(State {
                queue: VecDeque::new(),
                timers: HashMap::new(),
                next_generation: 0,
                in_flight: 0,
            }),
        });

        match inner.store.get().await {
            Ok(tasks) if !tasks.is_empty() => {
                debug!(queue = %inner.name, count = tasks.len(), "recovered persisted tasks");
                {
                    let mut state = inner.state.lock();
                    state.queue.extend(tasks.into_iter().map(|task| Entry {
                        task,
                        action: None,
                        error: None,
                    }));
                    state.in_flight += 1;
                }
                Inner::spawn_worker(&inner);
            }
            Ok(_) => {}
            Err(e) => {
                error!(queue = %inner.name, error = %e, "failed to load persisted tasks");
                (inner.error)(TaskFailure {
                    queue: inner.name.clone(),
                    source: e,
                });
            }
        }

        Ok(Self { inner })
    }

    /// Submit a task under a debounce key.
    ///
    /// Any pending timer for `key` is cancelled and replaced; a new timer is
    /// scheduled for `delay` (zero fires on the next scheduling opportunity,
    /// not synchronously). The call resolves after the configured settle
    /// delay regardless of whether the timer has fired; it signals
    /// "submission accepted", not "task queued or processed".
    pub async fn submit(&self, key: impl Into<String>, task: T, delay: Duration) {
        self.submit_with(key, task, TaskOptions::default().with_delay(delay))
            .await;
    }

    /// Submit a task with per-submission overrides.
    ///
    /// Same debounce contract as [`TaskQueue::submit`]; an override action or
    /// error hook travels with the task through the execution queue.
    pub async fn submit_with(&self, key: impl Into<String>, task: T, opts: TaskOptions<T>) {
        let key = key.into();
        let delay = opts.delay;
        let entry = Entry {
            task,
            action: opts.action,
            error: opts.error,
        };

        {
            let mut state = self.inner.state.lock();
            let generation = state.next_generation;
            state.next_generation += 1;

            // Last write wins within the delay window. A timer that already
            // fired has claimed its entry out of the map, so it can no longer
            // be found and aborted here.
            if let Some(previous) = state.timers.remove(&key) {
                previous.handle.abort();
            }

            let inner = Arc::clone(&self.inner);
            let timer_key = key.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                Inner::fire(inner, timer_key, generation, entry).await;
            })
            .abort_handle();

            state.timers.insert(key, Timer { handle, generation });
        }

        tokio::time::sleep(self.inner.settle).await;
    }

    /// True while any debounce timer is pending.
    #[must_use]
    pub fn has_tasks(&self) -> bool {
        !self.inner.state.lock().timers.is_empty()
    }

    /// True while the execution queue is non-empty.
    #[must_use]
    pub fn has_queue(&self) -> bool {
        !self.inner.state.lock().queue.is_empty()
    }

    /// Number of tasks currently awaiting a drain slot.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Task at the given execution-queue position, if any.
    #[must_use]
    pub fn task_at(&self, index: usize) -> Option<T> {
        self.inner
            .state
            .lock()
            .queue
            .get(index)
            .map(|entry| entry.task.clone())
    }

    /// Timer handle for a pending key, if any.
    #[must_use]
    pub fn timer(&self, key: &str) -> Option<AbortHandle> {
        self.inner
            .state
            .lock()
            .timers
            .get(key)
            .map(|timer| timer.handle.clone())
    }

    /// Snapshot of all pending timers, keyed by submission key.
    #[must_use]
    pub fn timers(&self) -> HashMap<String, AbortHandle> {
        self.inner
            .state
            .lock()
            .timers
            .iter()
            .map(|(key, timer)| (key.clone(), timer.handle.clone()))
            .collect()
    }

    /// The queue's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Timer callback: claim the timer entry, persist, enqueue, and wake a
    /// drain slot if one is free.
    async fn fire(inner: Arc<Self>, key: String, generation: u64, entry: Entry<T>) {
        // Claim the entry before the first await: once a timer has fired, a
        // re-submission must neither find nor abort it, and a stale firing
        // must not clobber an entry a newer submission just inserted.
        {
            let mut state = inner.state.lock();
            let claimed =
                matches!(state.timers.get(&key), Some(timer) if timer.generation == generation);
            if !claimed {
                return;
            }
            state.timers.remove(&key);
        }

        let Entry {
            task,
            action,
            error,
        } = entry;

        let task = match inner.store.save(task).await {
            Ok(task) => task,
            Err(e) => {
                error!(queue = %inner.name, error = %e, "failed to persist task");
                let hook = error.unwrap_or_else(|| Arc::clone(&inner.error));
                hook(TaskFailure {
                    queue: inner.name.clone(),
                    source: e,
                });
                return;
            }
        };

        let start_worker = {
            let mut state = inner.state.lock();
            state.queue.push_back(Entry {
                task,
                action,
                error,
            });
            if state.in_flight < inner.concurrency {
                state.in_flight += 1;
                true
            } else {
                false
            }
        };

        if start_worker {
            Self::spawn_worker(&inner);
        }
    }

    fn spawn_worker(inner: &Arc<Self>) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            inner.drain().await;
        });
    }

    /// One concurrency slot: keep consuming until the queue is empty, then
    /// release the slot.
    async fn drain(self: Arc<Self>) {
        loop {
            let entry = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(entry) => {
                        // Coalesce queued tasks equal to the one just claimed.
                        // Pop and filter stay atomic under the state lock so
                        // concurrent slots never double-filter.
                        state
                            .queue
                            .retain(|queued| !(self.equality)(&queued.task, &entry.task));
                        entry
                    }
                    None => {
                        state.in_flight -= 1;
                        return;
                    }
                }
            };

            debug!(queue = %self.name, "task claimed");

            let action = entry.action.as_ref().unwrap_or(&self.action);
            match action(entry.task.clone()).await {
                Ok(()) => {
                    if let Err(e) = self.store.delete(&entry.task).await {
                        warn!(queue = %self.name, error = %e, "failed to delete processed task");
                    }
                }
                Err(e) => {
                    let hook = entry.error.as_ref().unwrap_or(&self.error);
                    hook(TaskFailure {
                        queue: self.name.clone(),
                        source: e,
                    });
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

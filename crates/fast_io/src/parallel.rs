//! crates/fast_io/src/parallel.rs
//!
//! Bounded work distribution across a fixed set of workers.
//!
//! A [`WorkDistributor`] runs a *task* for every index produced by a *cursor*.
//! Each worker repeatedly pulls the next index from the cursor and runs the
//! task for it until the cursor reports exhaustion. [`execute`] returns only
//! after every worker has stopped, so all side effects of the tasks are
//! visible to the caller.
//!
//! The distributor never serialises calls to the cursor: the cursor must be
//! safe to call concurrently and must hand out each index at most once.
//! [`WorkCursor`] is the canonical implementation.
//!
//! [`execute`]: WorkDistributor::execute

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// What happens to the remaining workers when one task fails.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum FailurePolicy {
    /// Only the worker whose task failed stops; the others drain the cursor.
    #[default]
    StopWorker,
    /// Every worker stops pulling new indices once any task fails.
    AbortAll,
}

/// Configuration of a [`WorkDistributor`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DistributorConfig {
    threads: NonZeroUsize,
    caller_participates: bool,
    failure_policy: FailurePolicy,
}

impl DistributorConfig {
    /// Creates a configuration running `threads` workers.
    #[must_use]
    pub const fn new(threads: NonZeroUsize) -> Self {
        Self {
            threads,
            caller_participates: true,
            failure_policy: FailurePolicy::StopWorker,
        }
    }

    /// Sets the number of workers.
    #[must_use]
    pub const fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = threads;
        self
    }

    /// Selects whether the thread calling [`WorkDistributor::execute`] acts as
    /// one of the workers instead of idling until the pool finishes.
    #[must_use]
    pub const fn with_caller_participation(mut self, participates: bool) -> Self {
        self.caller_participates = participates;
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Number of concurrent workers.
    #[inline]
    #[must_use]
    pub const fn threads(&self) -> NonZeroUsize {
        self.threads
    }

    /// Whether the calling thread is one of the workers.
    #[inline]
    #[must_use]
    pub const fn caller_participates(&self) -> bool {
        self.caller_participates
    }

    /// Failure policy applied when a task returns an error.
    #[inline]
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Number of workers that run on pool threads.
    const fn pool_threads(&self) -> usize {
        self.threads.get() - self.caller_participates as usize
    }
}

impl Default for DistributorConfig {
    /// Uses the hardware-reported parallelism, falling back to one worker.
    fn default() -> Self {
        let threads = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self::new(threads)
    }
}

/// Errors raised while constructing a [`WorkDistributor`].
#[derive(Debug, Error)]
pub enum DistributorError {
    /// The dedicated worker pool could not be started.
    #[error("failed to start {threads} worker thread(s): {source}")]
    PoolBuild {
        /// Requested number of pool threads.
        threads: usize,
        /// Error reported by the pool builder.
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Outcome of a successful [`WorkDistributor::execute`] call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecutionReport {
    /// Number of task invocations that completed successfully.
    pub completed: u64,
    /// Number of workers that took part.
    pub workers: usize,
}

/// Runs tasks for cursor-supplied indices on a fixed set of workers.
///
/// The distributor owns a dedicated thread pool sized to the configured
/// worker count (minus the caller when it participates). The pool is created
/// once and reused by every [`execute`](Self::execute) call.
///
/// # Example
///
/// ```
/// use std::num::NonZeroUsize;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use fast_io::parallel::{DistributorConfig, WorkCursor, WorkDistributor};
///
/// let distributor =
///     WorkDistributor::new(DistributorConfig::new(NonZeroUsize::new(4).unwrap())).unwrap();
/// let cursor = WorkCursor::new(100);
/// let sum = AtomicU64::new(0);
///
/// let report = distributor
///     .execute(
///         |index| {
///             sum.fetch_add(index, Ordering::Relaxed);
///             Ok::<(), std::convert::Infallible>(())
///         },
///         || cursor.next(),
///     )
///     .unwrap();
///
/// assert_eq!(report.completed, 100);
/// assert_eq!(sum.load(Ordering::Relaxed), (0..100).sum::<u64>());
/// ```
pub struct WorkDistributor {
    config: DistributorConfig,
    pool: Option<rayon::ThreadPool>,
}

impl WorkDistributor {
    /// Creates a distributor for `config`.
    pub fn new(config: DistributorConfig) -> Result<Self, DistributorError> {
        let pool_threads = config.pool_threads();
        let pool = if pool_threads == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(pool_threads)
                .thread_name(|index| format!("blocksig-worker-{index}"))
                .build()
                .map_err(|source| DistributorError::PoolBuild {
                    threads: pool_threads,
                    source,
                })?;
            Some(pool)
        };

        Ok(Self { config, pool })
    }

    /// Creates a distributor with `threads` workers and default settings.
    pub fn with_threads(threads: NonZeroUsize) -> Result<Self, DistributorError> {
        Self::new(DistributorConfig::new(threads))
    }

    /// Returns the configuration the distributor was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &DistributorConfig {
        &self.config
    }

    /// Runs `task` for every index yielded by `cursor` and waits for all
    /// workers to finish.
    ///
    /// Returns the first task error observed, after every worker has
    /// stopped. A panicking task stops all workers and the panic is resumed
    /// on the calling thread once they have joined.
    pub fn execute<T, C, E>(&self, task: T, cursor: C) -> Result<ExecutionReport, E>
    where
        T: Fn(u64) -> Result<(), E> + Sync,
        C: Fn() -> Option<u64> + Sync,
        E: Send,
    {
        let state = ExecutionState::new();
        let policy = self.config.failure_policy;
        let worker = || run_worker(&task, &cursor, &state, policy);

        match &self.pool {
            Some(pool) => {
                let pool_threads = self.config.pool_threads();
                let caller_participates = self.config.caller_participates;
                pool.in_place_scope(|scope| {
                    for _ in 0..pool_threads {
                        scope.spawn(|_| worker());
                    }
                    if caller_participates {
                        worker();
                    }
                });
            }
            None => worker(),
        }

        state.finish(self.config.threads.get())
    }

    /// Runs `task` once for every index in `0..count`.
    pub fn execute_indexed<T, E>(&self, count: u64, task: T) -> Result<ExecutionReport, E>
    where
        T: Fn(u64) -> Result<(), E> + Sync,
        E: Send,
    {
        let cursor = WorkCursor::new(count);
        self.execute(task, || cursor.next())
    }
}

impl std::fmt::Debug for WorkDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkDistributor")
            .field("config", &self.config)
            .field("pool_threads", &self.config.pool_threads())
            .finish()
    }
}

/// Shared bookkeeping for one `execute` call.
struct ExecutionState<E> {
    abort: AtomicBool,
    completed: AtomicU64,
    failures: AtomicUsize,
    first_error: Mutex<Option<E>>,
}

impl<E> ExecutionState<E> {
    fn new() -> Self {
        Self {
            abort: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
            first_error: Mutex::new(None),
        }
    }

    fn record_failure(&self, error: E) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn finish(self, workers: usize) -> Result<ExecutionReport, E> {
        let completed = self.completed.into_inner();
        let failures = self.failures.into_inner();
        let first_error = self
            .first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        match first_error {
            Some(error) => {
                #[cfg(feature = "tracing")]
                warn!(completed, failures, "work distribution finished with failures");
                #[cfg(not(feature = "tracing"))]
                let _ = failures;
                Err(error)
            }
            None => {
                #[cfg(feature = "tracing")]
                debug!(completed, workers, "work distribution finished");
                Ok(ExecutionReport { completed, workers })
            }
        }
    }
}

/// Raises the abort flag if the owning worker unwinds.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

fn run_worker<T, C, E>(task: &T, cursor: &C, state: &ExecutionState<E>, policy: FailurePolicy)
where
    T: Fn(u64) -> Result<(), E>,
    C: Fn() -> Option<u64>,
{
    let _guard = AbortOnPanic(&state.abort);

    while !state.abort.load(Ordering::Acquire) {
        let Some(index) = cursor() else {
            break;
        };

        match task(index) {
            Ok(()) => {
                state.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                state.record_failure(error);
                if policy == FailurePolicy::AbortAll {
                    state.abort.store(true, Ordering::Release);
                }
                break;
            }
        }
    }
}

/// Shared counter handing out the indices `0..limit` exactly once each.
///
/// [`next`](Self::next) claims the current value and advances the counter as
/// one atomic step, so concurrent callers can neither receive the same index
/// nor skip one. Once the limit is reached every call returns `None`.
///
/// # Example
///
/// ```
/// use fast_io::parallel::WorkCursor;
///
/// let cursor = WorkCursor::new(2);
/// assert_eq!(cursor.next(), Some(0));
/// assert_eq!(cursor.next(), Some(1));
/// assert_eq!(cursor.next(), None);
/// assert_eq!(cursor.next(), None);
/// ```
#[derive(Debug)]
pub struct WorkCursor {
    next: AtomicU64,
    limit: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl WorkCursor {
    /// Creates a cursor over `0..limit`.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            limit,
            cancel: None,
        }
    }

    /// Creates a cursor that stops handing out indices once `cancel` is set.
    #[must_use]
    pub fn with_cancellation(limit: u64, cancel: Arc<AtomicBool>) -> Self {
        Self {
            next: AtomicU64::new(0),
            limit,
            cancel: Some(cancel),
        }
    }

    /// Claims the next index, or returns `None` when the cursor is exhausted
    /// or cancelled.
    pub fn next(&self) -> Option<u64> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
        {
            return None;
        }

        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.limit).then_some(current + 1)
            })
            .ok()
    }

    /// Exhausts the cursor so every later call to [`next`](Self::next)
    /// returns `None`.
    pub fn abort(&self) {
        self.next.fetch_max(self.limit, Ordering::AcqRel);
    }

    /// Upper bound of the index range.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of indices handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Acquire).min(self.limit)
    }

    /// Number of indices still available.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit - self.issued()
    }
}

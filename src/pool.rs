use crate::config::PoolConfig;
use crate::envelope::TaskEnvelope;
use crate::error::TaskError;
use crate::handle::{self, JoinHandle, JoinState};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::overflow::OverflowList;
use crate::worker::{self, run_worker, WorkerState};
use crossbeam_utils::CachePadded;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// State shared between `Pool` and every worker thread it owns.
///
/// Held as an `Arc` by `Pool` itself and by each worker's thread closure.
/// Once `Pool::drop` joins every worker thread, those clones are gone and
/// `Pool`'s own clone is the last one standing — dropping it runs this
/// struct's field drops, which is what actually drains the overflow list
/// and every local ring (see `overflow.rs` and `ring.rs`'s `Drop` impls).
pub(crate) struct PoolShared {
    pub(crate) workers: Box<[CachePadded<WorkerState>]>,
    pub(crate) overflow: OverflowList,
    pub(crate) active_tasks: AtomicUsize,
    pub(crate) stop: AtomicBool,
    pub(crate) metrics: Metrics,
    pub(crate) config: PoolConfig,
}

/// A fixed-size work-stealing thread pool.
///
/// Each worker owns a bounded local ring it pushes to and pops from without
/// contention; when a ring is full, submissions spill to a shared unbounded
/// overflow list; when a worker's ring and the overflow list are both empty,
/// it steals from a random peer before backing off. See the crate's module
/// docs for the full design.
pub struct Pool {
    shared: Arc<PoolShared>,
    join_handles: Vec<thread::JoinHandle<()>>,
}

impl Pool {
    /// Creates a pool with default configuration: one worker per available
    /// core, 4096-slot local rings, metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool with explicit configuration.
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        let worker_count = config.resolved_worker_count();
        let ring_capacity = config.ring_capacity();

        let workers = (0..worker_count)
            .map(|index| CachePadded::new(WorkerState::new(index, ring_capacity)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let shared = Arc::new(PoolShared {
            workers,
            overflow: OverflowList::new(),
            active_tasks: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            metrics: Metrics::new(),
            config,
        });

        let join_handles = (0..worker_count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("taskpool-worker-{index}"))
                    .spawn(move || run_worker(shared, index))
                    .expect("failed to spawn taskpool worker thread")
            })
            .collect();

        Self {
            shared,
            join_handles,
        }
    }

    /// Submits a task for execution, returning a handle to its eventual
    /// result.
    ///
    /// If the calling thread is itself one of this pool's workers (a task
    /// submitting another task), the new task is pushed onto that worker's
    /// own local ring, falling back to the overflow list if the ring is
    /// full. Otherwise it goes straight to the overflow list. A panicking
    /// task never takes down its worker thread — the panic is caught and
    /// delivered through the returned handle as [`TaskError::Panicked`].
    ///
    /// Submitting after the pool has begun shutting down is not policed: the
    /// task may run, or may be dropped unexecuted with the handle resolving
    /// to [`TaskError::Lost`], depending on timing.
    pub fn submit<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (handle, state) = JoinHandle::new_pair();
        let envelope = build_envelope(f, state);
        self.dispatch(envelope);
        handle
    }

    fn dispatch(&self, envelope: Box<TaskEnvelope>) {
        self.shared
            .metrics
            .add_submitted(self.shared.config.enable_metrics);

        let pool_identity = Arc::as_ptr(&self.shared).cast::<()>();
        let spilled = match worker::current_index_for(pool_identity) {
            Some(index) => self.shared.workers[index].ring.push(envelope),
            None => Err(envelope),
        };

        if let Err(envelope) = spilled {
            self.shared.overflow.push(envelope);
            self.shared
                .metrics
                .add_overflow_push(self.shared.config.enable_metrics);
        }

        self.wake_hint();
    }

    /// Clears one sleeping worker's back-off counter so it re-checks its
    /// queues sooner than the deepest back-off stage's sleep would otherwise
    /// allow. Not a guarantee of immediate wake-up — a worker already deep
    /// asleep still wakes within the back-off ladder's maximum interval
    /// regardless, this just shaves that latency off the common case.
    fn wake_hint(&self) {
        for worker in self.shared.workers.iter() {
            if worker.sleeping.load(Ordering::Relaxed) {
                crate::backoff::Backoff::reset(&worker.miss_count);
                break;
            }
        }
    }

    /// Blocks until every submitted task has completed: no task is running,
    /// no local ring holds one, and the overflow list is empty.
    ///
    /// This is a poll, not a push-based signal — a long-running task
    /// delays the return of `wait` by however long it takes to finish.
    pub fn wait(&self) {
        while !self.is_quiescent() {
            thread::yield_now();
            thread::sleep(Duration::from_micros(50));
        }
    }

    fn is_quiescent(&self) -> bool {
        self.shared.active_tasks.load(Ordering::Acquire) == 0
            && self.shared.overflow.is_empty()
            && self.shared.workers.iter().all(|w| w.ring.is_empty())
    }

    /// Number of worker threads this pool owns.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.shared.workers.len()
    }

    /// Snapshot of tasks not yet completed: running or resident on the
    /// overflow list. Local rings are not included — each is only ever
    /// touched by its own worker (plus occasional stealers), so summing
    /// them here would race the very workers this is meant to observe.
    /// Callers must not use this as a quiescence oracle; use `wait` instead.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.shared.overflow.len() + self.shared.active_tasks.load(Ordering::Relaxed)
    }

    /// A point-in-time snapshot of the pool's diagnostic counters. All
    /// fields are zero if metrics were not enabled at construction.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pool {
    /// Waits for outstanding work, signals every worker to stop, and joins
    /// all worker threads. By the time this returns, `self.shared` is the
    /// last surviving `Arc` clone — its own drop, which runs immediately
    /// after, is what drains the overflow list and any still-resident local
    /// ring entries (there shouldn't be any, since `wait` already ran).
    fn drop(&mut self) {
        self.wait();
        self.shared.stop.store(true, Ordering::Release);
        for handle in self.join_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

pub(crate) fn build_envelope<F, R>(f: F, state: Arc<JoinState<R>>) -> Box<TaskEnvelope>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    TaskEnvelope::new(Box::new(move || match panic::catch_unwind(panic::AssertUnwindSafe(f)) {
        Ok(value) => handle::resolve_value(&state, value),
        Err(payload) => handle::resolve_error(&state, TaskError::from_panic_payload(payload)),
    }))
}

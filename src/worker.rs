use crate::backoff::Backoff;
use crate::envelope::TaskEnvelope;
use crate::pool::PoolShared;
use crate::ring::LocalRing;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Per-thread state for one worker: its index, its owned ring, the advisory
/// `sleeping` flag, and the back-off miss counter. Created before the worker
/// thread is spawned, observed (for stealing, and for the wake hint) by
/// every other worker for the lifetime of the pool, joined before the pool's
/// destructor returns.
///
/// The miss counter lives here rather than as a loop-local in `run_worker`
/// so `Pool::submit`'s wake hint can clear it from another thread.
pub(crate) struct WorkerState {
    pub(crate) index: usize,
    pub(crate) ring: LocalRing,
    pub(crate) sleeping: AtomicBool,
    pub(crate) miss_count: AtomicU32,
}

impl WorkerState {
    pub(crate) fn new(index: usize, ring_capacity: usize) -> Self {
        Self {
            index,
            ring: LocalRing::new(ring_capacity),
            sleeping: AtomicBool::new(false),
            miss_count: AtomicU32::new(0),
        }
    }
}

thread_local! {
    /// `(pool identity, worker index)` — set once when a worker thread
    /// starts, read by `Pool::submit` to decide whether the calling thread
    /// is itself one of this pool's workers. The pool identity is the raw
    /// address of its shared state, which is enough to distinguish two
    /// independently constructed pools sharing this process.
    static CURRENT_WORKER: Cell<Option<(*const (), usize)>> = Cell::new(None);
}

pub(crate) fn set_current(pool_identity: *const (), index: usize) {
    CURRENT_WORKER.with(|cell| cell.set(Some((pool_identity, index))));
}

/// Returns this thread's worker index within the pool identified by
/// `pool_identity`, if this thread is in fact one of that pool's workers.
pub(crate) fn current_index_for(pool_identity: *const ()) -> Option<usize> {
    CURRENT_WORKER.with(|cell| match cell.get() {
        Some((identity, index)) if identity == pool_identity => Some(index),
        _ => None,
    })
}

static SEED_SALT: AtomicU64 = AtomicU64::new(0);

fn seed_for(index: usize) -> u64 {
    let salt = SEED_SALT.fetch_add(1, Ordering::Relaxed);
    0x9E37_79B9_7F4A_7C15_u64
        ^ (index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
        ^ salt
}

/// Uniformly picks a peer ring and attempts to steal from it, skipping self,
/// retried up to `2N` times before giving up for this dispatch attempt.
fn steal_from_peers(shared: &PoolShared, my_index: usize, rng: &mut StdRng) -> Option<Box<TaskEnvelope>> {
    let n = shared.workers.len();
    if n <= 1 {
        return None;
    }
    for _ in 0..(2 * n) {
        let victim = rng.gen_range(0..n);
        if victim == my_index {
            continue;
        }
        shared.metrics.add_steal_attempt(shared.config.enable_metrics);
        if let Some(envelope) = shared.workers[victim].ring.steal() {
            return Some(envelope);
        }
    }
    None
}

/// The worker main loop: pop local, then overflow, then steal; execute on
/// hit, back off on a miss across all three. Runs until `stop` is observed.
pub(crate) fn run_worker(shared: Arc<PoolShared>, index: usize) {
    set_current(Arc::as_ptr(&shared).cast::<()>(), index);

    let mut rng = StdRng::seed_from_u64(seed_for(index));
    let miss_count = &shared.workers[index].miss_count;
    let sleeping = &shared.workers[index].sleeping;

    while !shared.stop.load(Ordering::Acquire) {
        // Reserved before the dequeue, not after: a task must count toward
        // `active_tasks` for the entire window between leaving its queue
        // and finishing, or a concurrent `Pool::wait` could observe every
        // queue empty and `active_tasks == 0` while this task is in flight
        // between the two, and return before it has run. Reserving early
        // makes the counter conservative — it can only ever make `wait`
        // wait a little longer than strictly necessary, never return early
        // — so the `fetch_sub` below on a miss gives the reservation back.
        shared.active_tasks.fetch_add(1, Ordering::Relaxed);

        let mut envelope = shared.workers[index].ring.pop();
        if envelope.is_none() {
            envelope = shared.overflow.pop();
        }
        let stolen = envelope.is_none();
        if stolen {
            envelope = steal_from_peers(&shared, index, &mut rng);
        }

        match envelope {
            Some(envelope) => {
                if stolen {
                    shared.metrics.add_stolen(shared.config.enable_metrics);
                }
                envelope.run();
                // Release: publishes the task's effects to whatever thread
                // later observes `active_tasks` reach zero in `Pool::wait`.
                shared.active_tasks.fetch_sub(1, Ordering::Release);
                shared.metrics.add_executed(shared.config.enable_metrics);
                Backoff::reset(miss_count);
            }
            None => {
                shared.active_tasks.fetch_sub(1, Ordering::Relaxed);
                Backoff::idle(miss_count, sleeping);
            }
        }
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe diagnostic counters, gated behind
/// [`PoolConfig::enable_metrics`](crate::PoolConfig::enable_metrics).
///
/// These are the pool's entire observability surface — there is no logging
/// on the dispatch hot path, by the same reasoning the rest of this crate's
/// lock-free data structures avoid it: a log line costs far more than the
/// atomic operation it would be reporting on.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_executed: AtomicU64,
    tasks_stolen: AtomicU64,
    overflow_pushes: AtomicU64,
    steal_attempts: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_submitted(&self, enabled: bool) {
        if enabled {
            self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_executed(&self, enabled: bool) {
        if enabled {
            self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_stolen(&self, enabled: bool) {
        if enabled {
            self.tasks_stolen.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_overflow_push(&self, enabled: bool) {
        if enabled {
            self.overflow_pushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_steal_attempt(&self, enabled: bool) {
        if enabled {
            self.steal_attempts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_stolen: self.tasks_stolen.load(Ordering::Relaxed),
            overflow_pushes: self.overflow_pushes.load(Ordering::Relaxed),
            steal_attempts: self.steal_attempts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`Pool`](crate::Pool)'s diagnostic counters.
///
/// All fields are zero if the pool was constructed with
/// `enable_metrics: false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub tasks_stolen: u64,
    pub overflow_pushes: u64,
    pub steal_attempts: u64,
}

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

const YIELD_LIMIT: u32 = 10;
const SHORT_SLEEP_LIMIT: u32 = 20;
const MEDIUM_SLEEP_LIMIT: u32 = 100;

/// Staged back-off for a worker that found nothing to dispatch.
///
/// Stateless by design: the miss counter lives in the worker's shared
/// `WorkerState` (an `AtomicU32`), not in a loop-local struct, so the wake
/// hint in `Pool::submit` can reach in and clear a sleeping worker's counter
/// from another thread — exactly the "clears its back-off counter" hint
/// described in the design notes.
///
/// Escalates monotonically with the number of consecutive empty dispatch
/// attempts: cooperative yield, then short sleeps of increasing length, then
/// a longer sleep with the worker marked `sleeping`. Exact durations are
/// tunable; the escalating shape is not.
pub(crate) struct Backoff;

impl Backoff {
    /// Records one more empty dispatch attempt and applies the ladder stage
    /// it falls into.
    pub(crate) fn idle(miss_count: &AtomicU32, sleeping: &AtomicBool) {
        let misses = miss_count.fetch_add(1, Ordering::Relaxed).saturating_add(1);

        if misses < YIELD_LIMIT {
            thread::yield_now();
        } else if misses < SHORT_SLEEP_LIMIT {
            thread::sleep(Duration::from_micros(10));
        } else if misses < MEDIUM_SLEEP_LIMIT {
            thread::sleep(Duration::from_micros(100));
        } else {
            sleeping.store(true, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(1));
            sleeping.store(false, Ordering::Relaxed);
        }
    }

    /// Clears the miss counter, either after a successful dispatch or as the
    /// wake hint nudging a sleeping peer to re-check its queues sooner.
    #[inline]
    pub(crate) fn reset(miss_count: &AtomicU32) {
        miss_count.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_escalates_and_resets() {
        let misses = AtomicU32::new(0);
        let sleeping = AtomicBool::new(false);

        for _ in 0..5 {
            Backoff::idle(&misses, &sleeping);
        }
        assert_eq!(misses.load(Ordering::Relaxed), 5);
        assert!(!sleeping.load(Ordering::Relaxed));

        Backoff::reset(&misses);
        assert_eq!(misses.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn deepest_stage_toggles_sleeping_flag_and_clears_it() {
        let misses = AtomicU32::new(MEDIUM_SLEEP_LIMIT);
        let sleeping = AtomicBool::new(false);
        Backoff::idle(&misses, &sleeping);
        // The flag is cleared again by the time idle() returns; this just
        // exercises the deepest stage without asserting on a timing window.
        assert!(!sleeping.load(Ordering::Relaxed));
    }

    #[test]
    fn external_reset_is_visible_to_next_idle_call() {
        let misses = AtomicU32::new(50);
        let sleeping = AtomicBool::new(false);
        // Simulates the wake hint: another thread clears this worker's
        // counter while it's presumably asleep.
        Backoff::reset(&misses);
        assert_eq!(misses.load(Ordering::Relaxed), 0);
        Backoff::idle(&misses, &sleeping);
        assert_eq!(misses.load(Ordering::Relaxed), 1);
    }
}

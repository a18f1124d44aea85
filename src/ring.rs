//! The bounded single-producer multi-consumer local ring (BSR).
//!
//! =============================================================================
//! MEMORY ORDERING & SYNCHRONIZATION STRATEGY
//! =============================================================================
//!
//! One owner thread pushes and pops; any other worker may steal. Both `pop`
//! and `steal` perform a CAS on `head` (strategy (b) from the design notes —
//! simpler than giving the owner a non-CAS fast path, and it's what tolerates
//! a steal and a pop racing for the same last element).
//!
//! **Producer / owner (push):**
//! 1. Load `tail` Relaxed (only the owner writes `tail`).
//! 2. Load `head` Acquire to check for room — synchronizes with the Release
//!    stores any `pop`/`steal` does when advancing `head`.
//! 3. Publish the envelope pointer into the slot with Release.
//! 4. Publish the new `tail` with Release.
//!
//! **Consumer (pop, owner) / thief (steal, any thread):**
//! 1. Load `head` to get a candidate index.
//! 2. Load `tail` Acquire — synchronizes with the owner's Release store —
//!    to detect emptiness.
//! 3. Load the slot pointer Acquire, synchronized with the push that
//!    published it.
//! 4. CAS `head` from the candidate to `(candidate + 1) & mask`, Release on
//!    success (publishes the consumption) / Relaxed on failure (no effect).
//!
//! =============================================================================

use crate::envelope::TaskEnvelope;
use crate::invariants::debug_assert_bounded_count;
use std::ops::Deref;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Wrapper ensuring 128-byte alignment so the owner-hot `tail` and the
/// steal-hot `head` never share a cache line.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CacheAligned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

/// A fixed-capacity circular buffer of non-owning `TaskEnvelope` pointers,
/// owned by exactly one worker.
///
/// `head` is the consumer/stealer end; `tail` is the owner's producer end.
/// Both are plain indices in `[0, C)` — the ring wraps every `C` pushes, not
/// every 2^64, which is what the invariant macros in `invariants.rs` are
/// shaped around.
pub(crate) struct LocalRing {
    head: CacheAligned<AtomicUsize>,
    tail: CacheAligned<AtomicUsize>,
    mask: usize,
    slots: Box<[AtomicPtr<TaskEnvelope>]>,
}

// SAFETY: envelopes are moved, never shared, between the owner and a
// successful stealer; the ring itself holds only raw pointers.
unsafe impl Send for LocalRing {}
unsafe impl Sync for LocalRing {}

impl LocalRing {
    /// Creates a ring with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two.
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity > 0,
            "local ring capacity must be a nonzero power of two"
        );
        let slots = (0..capacity)
            .map(|_| AtomicPtr::new(std::ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            head: CacheAligned::new(AtomicUsize::new(0)),
            tail: CacheAligned::new(AtomicUsize::new(0)),
            mask: capacity - 1,
            slots,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Current resident count. Diagnostic only — racy against concurrent
    /// pushers/stealers, never used to gate correctness.
    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) & self.mask
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Owner-only. Must not be called concurrently with another `push` on
    /// the same ring. Returns the envelope back if the ring is full so the
    /// caller can fall back to the overflow list without losing it.
    pub(crate) fn push(&self, envelope: Box<TaskEnvelope>) -> Result<(), Box<TaskEnvelope>> {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = (tail + 1) & self.mask;
        if next == self.head.load(Ordering::Acquire) {
            return Err(envelope);
        }

        let ptr = Box::into_raw(envelope);
        self.slots[tail].store(ptr, Ordering::Release);
        self.tail.store(next, Ordering::Release);

        debug_assert_bounded_count!(self.len(), self.capacity());
        Ok(())
    }

    /// Owner-only, but races against concurrent `steal` — see module docs.
    pub(crate) fn pop(&self) -> Option<Box<TaskEnvelope>> {
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let tail = self.tail.load(Ordering::Acquire);
            if head == tail {
                return None;
            }
            let ptr = self.slots[head].load(Ordering::Acquire);
            let next = (head + 1) & self.mask;
            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: this thread won the CAS claiming slot `head`; the
                // pointer was published by a prior push with Release
                // ordering, observed above via the Acquire load on the slot.
                return Some(unsafe { Box::from_raw(ptr) });
            }
            // Lost the race to a concurrent steal; retry against fresh state.
        }
    }

    /// Any thread, including the owner. Best-effort: a `None` return means
    /// either the ring was empty or a race was lost — the caller (the main
    /// dispatch loop) is expected to move on to the next victim rather than
    /// retry this one immediately.
    pub(crate) fn steal(&self) -> Option<Box<TaskEnvelope>> {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let ptr = self.slots[head].load(Ordering::Acquire);
        let next = (head + 1) & self.mask;
        if self
            .head
            .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            // SAFETY: see `pop` above — the CAS win is exclusive.
            return Some(unsafe { Box::from_raw(ptr) });
        }
        None
    }
}

impl Drop for LocalRing {
    fn drop(&mut self) {
        // Anything still resident at shutdown is deallocated, not executed —
        // `Pool`'s destructor only reaches here after `wait()`, so in normal
        // shutdown this drops nothing.
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc;

    fn make_envelope(counter: Arc<StdAtomicUsize>) -> Box<TaskEnvelope> {
        TaskEnvelope::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn push_pop_round_trip() {
        let ring = LocalRing::new(4);
        let counter = Arc::new(StdAtomicUsize::new(0));
        assert!(ring.push(make_envelope(counter.clone())).is_ok());
        assert_eq!(ring.len(), 1);

        let popped = ring.pop().expect("should have one item");
        popped.run();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(ring.is_empty());
    }

    #[test]
    fn push_rejects_when_full() {
        let ring = LocalRing::new(2); // one usable slot (mask makes full at 1 item)
        let counter = Arc::new(StdAtomicUsize::new(0));
        assert!(ring.push(make_envelope(counter.clone())).is_ok());
        let rejected = ring.push(make_envelope(counter.clone()));
        assert!(rejected.is_err());
    }

    #[test]
    fn steal_from_non_owner_thread() {
        let ring = Arc::new(LocalRing::new(8));
        let counter = Arc::new(StdAtomicUsize::new(0));
        for _ in 0..4 {
            ring.push(make_envelope(counter.clone())).unwrap();
        }

        let thief_ring = Arc::clone(&ring);
        let handle = std::thread::spawn(move || {
            let mut stolen = 0;
            while stolen < 2 {
                if let Some(e) = thief_ring.steal() {
                    e.run();
                    stolen += 1;
                }
            }
        });
        handle.join().unwrap();

        let mut remaining = 0;
        while let Some(e) = ring.pop() {
            e.run();
            remaining += 1;
        }
        assert_eq!(remaining, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn concurrent_pop_and_steal_never_double_execute() {
        const N: usize = 2000;
        let ring = Arc::new(LocalRing::new(4096));
        let counter = Arc::new(StdAtomicUsize::new(0));
        for _ in 0..N {
            ring.push(make_envelope(counter.clone())).unwrap();
        }

        let executed = Arc::new(StdAtomicUsize::new(0));
        let mut handles = vec![];
        for _ in 0..4 {
            let ring = Arc::clone(&ring);
            let executed = Arc::clone(&executed);
            handles.push(std::thread::spawn(move || loop {
                let got = if executed.load(Ordering::Relaxed) % 2 == 0 {
                    ring.pop()
                } else {
                    ring.steal()
                };
                match got {
                    Some(e) => {
                        e.run();
                        executed.fetch_add(1, Ordering::SeqCst);
                    }
                    None => {
                        if ring.is_empty() {
                            break;
                        }
                        std::thread::yield_now();
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), N);
    }
}

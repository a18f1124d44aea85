//! The unbounded multi-producer multi-consumer overflow list (MPML).
//!
//! A Treiber-stack LIFO: external submitters and ring-full spillers push;
//! any worker (or `Pool::wait`'s quiescence check) may pop. Unlike a typical
//! lock-free stack, this one never recycles nodes back onto itself — every
//! [`TaskEnvelope`] is freshly allocated at submission and freed by whichever
//! worker runs it. That sidesteps the classic ABA hazard a `pop` reading
//! `head->next` before its CAS would otherwise have: there's no pool of
//! reusable nodes for a concurrent push to resurrect mid-pop. If a future
//! revision adds envelope pooling, this property must be preserved or the
//! `pop` below needs hazard pointers / epoch reclamation.

use crate::envelope::TaskEnvelope;
use crate::invariants::debug_assert_detached;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

pub(crate) struct OverflowList {
    head: AtomicPtr<TaskEnvelope>,
    size: AtomicUsize,
}

// SAFETY: envelopes are exclusively owned by whichever push/pop holds them;
// the list itself holds only raw pointers guarded by the head CAS.
unsafe impl Send for OverflowList {}
unsafe impl Sync for OverflowList {}

impl OverflowList {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(std::ptr::null_mut()),
            size: AtomicUsize::new(0),
        }
    }

    /// Any thread. Repeatedly CAS-swaps the head.
    pub(crate) fn push(&self, envelope: Box<TaskEnvelope>) {
        let ptr = Box::into_raw(envelope);
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: `ptr` isn't published to any other thread until the
            // CAS below succeeds, so writing its `next` link is exclusive.
            unsafe {
                (*ptr).next.store(head, Ordering::Relaxed);
            }
            match self
                .head
                .compare_exchange_weak(head, ptr, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => head = actual,
            }
        }
        self.size.fetch_add(1, Ordering::Relaxed);
    }

    /// Any thread. Repeatedly CAS-pops the head.
    pub(crate) fn pop(&self) -> Option<Box<TaskEnvelope>> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            if head.is_null() {
                return None;
            }
            // SAFETY: `head` was read under Acquire; another thread can only
            // free it via a CAS on `self.head` that we haven't raced past
            // yet (a concurrent winner would change `self.head` and our own
            // CAS below would fail and retry against the fresh value).
            let next = unsafe { (*head).next.load(Ordering::Relaxed) };
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => {
                    self.size.fetch_sub(1, Ordering::Relaxed);
                    // SAFETY: this thread's CAS exclusively claimed `head`.
                    let mut envelope = unsafe { Box::from_raw(head) };
                    envelope.next = std::sync::atomic::AtomicPtr::new(std::ptr::null_mut());
                    debug_assert_detached!(envelope.next.load(Ordering::Relaxed));
                    return Some(envelope);
                }
                Err(actual) => head = actual,
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Shutdown only: lifts the head to null and deallocates every resident
    /// envelope without running it. Called once, after all workers joined.
    pub(crate) fn drain(&self) {
        while self.pop().is_some() {}
    }
}

impl Drop for OverflowList {
    fn drop(&mut self) {
        self.drain();
    }
}

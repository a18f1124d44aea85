//! Debug assertion macros for the local ring and overflow list invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`) — zero overhead
//! in release. Indices here are bounded and masked to `[0, C)`, so the
//! monotonic-sequence-number checks used for an unbounded producer/consumer
//! protocol don't apply; these instead check the things that *can* go wrong
//! under a masked, wrap-every-`C` scheme.

// =============================================================================
// INV-RING-01: Bounded Count
// =============================================================================

/// `0 ≤ len ≤ capacity`. A masked ring can never report more items resident
/// than it has slots for.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-RING-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-OVF-01: No Envelope Resident On Two Queues
// =============================================================================

/// A freshly-popped overflow node's `next` link must be cleared before the
/// node is handed to a worker — otherwise a stale link could be mistaken for
/// live queue membership by a debugger or a future recycling scheme.
macro_rules! debug_assert_detached {
    ($next_ptr:expr) => {
        debug_assert!(
            $next_ptr.is_null(),
            "INV-OVF-01 violated: popped envelope still carries a next-link"
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_detached;

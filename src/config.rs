/// Construction-time configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of worker threads. `None` defaults to
    /// `std::thread::available_parallelism()` (falling back to 1).
    pub worker_count: Option<usize>,
    /// Local ring capacity as a power of 2 (default: 12 = 4096 slots,
    /// matching the suggested capacity in the design notes).
    pub ring_bits: u8,
    /// Enable the atomic submission/steal/overflow counters in
    /// [`Pool::metrics`](crate::Pool::metrics). Off by default: the counters
    /// are diagnostic only and cost an extra fetch-add per dispatch.
    pub enable_metrics: bool,
}

impl PoolConfig {
    /// Creates a configuration with explicit settings.
    ///
    /// # Panics
    ///
    /// Panics if `ring_bits` is 0 or greater than 20 (1M slots), mirroring
    /// the sanity bound used elsewhere in this crate's ring sizing.
    #[must_use]
    pub const fn new(worker_count: Option<usize>, ring_bits: u8, enable_metrics: bool) -> Self {
        assert!(
            ring_bits > 0 && ring_bits <= 20,
            "ring_bits must be between 1 and 20 (max 1M slots)"
        );
        Self {
            worker_count,
            ring_bits,
            enable_metrics,
        }
    }

    /// Returns the resolved worker count, applying the platform default.
    #[must_use]
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    /// Returns the local ring capacity (`1 << ring_bits`).
    #[inline]
    #[must_use]
    pub const fn ring_capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask used for index wrapping (`capacity - 1`).
    #[inline]
    #[must_use]
    pub const fn ring_mask(&self) -> usize {
        self.ring_capacity() - 1
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            ring_bits: 12, // 4096 slots
            enable_metrics: false,
        }
    }
}

//! taskpool - A Work-Stealing Thread Pool
//!
//! A fixed-size thread pool built from per-worker bounded local rings, a
//! shared unbounded overflow list, and randomized work-stealing between
//! workers when a ring runs dry.
//!
//! # Key Features
//!
//! - 128-byte cache-line isolation between a ring's owner-hot and
//!   steal-hot fields
//! - Lock-free dispatch: local push/pop never contends, stealing and the
//!   overflow list are CAS-based
//! - One-shot [`JoinHandle`] per submission, with panics captured rather
//!   than propagated to the worker thread
//! - Staged back-off (yield, then increasingly long sleeps) so idle
//!   workers don't spin the CPU
//!
//! # Example
//!
//! ```
//! use taskpool::Pool;
//!
//! let pool = Pool::new();
//! let handle = pool.submit(|| 2 + 2);
//! assert_eq!(handle.get().unwrap(), 4);
//! pool.wait();
//! ```

mod backoff;
mod config;
mod envelope;
mod error;
mod handle;
mod invariants;
mod metrics;
mod overflow;
mod pool;
mod ring;
mod worker;

pub use config::PoolConfig;
pub use error::TaskError;
pub use handle::JoinHandle;
pub use metrics::MetricsSnapshot;
pub use pool::Pool;

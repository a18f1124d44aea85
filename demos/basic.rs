use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use taskpool::{Pool, PoolConfig};

fn main() {
    println!("taskpool basic example");
    println!("=======================\n");

    let pool = Pool::with_config(PoolConfig::new(Some(4), 12, true));

    const N_TASKS: usize = 1_000_000;
    println!("Configuration:");
    println!("  Workers: {}", pool.thread_count());
    println!("  Tasks: {N_TASKS}\n");

    let start = Instant::now();
    let sum = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..N_TASKS)
        .map(|i| {
            let sum = Arc::clone(&sum);
            pool.submit(move || {
                sum.fetch_add(i as u64, Ordering::Relaxed);
            })
        })
        .collect();

    for handle in handles {
        handle.get().unwrap();
    }
    let duration = start.elapsed();

    let expected: u64 = (0..N_TASKS as u64).sum();
    println!("Results:");
    println!("  Sum: {} (expected {})", sum.load(Ordering::Relaxed), expected);
    println!("  Duration: {duration:.2?}");
    println!(
        "  Throughput: {:.2} million tasks/sec",
        N_TASKS as f64 / duration.as_secs_f64() / 1_000_000.0
    );

    let snapshot = pool.metrics();
    println!("\nMetrics:");
    println!("  submitted: {}", snapshot.tasks_submitted);
    println!("  executed:  {}", snapshot.tasks_executed);
    println!("  stolen:    {}", snapshot.tasks_stolen);
    println!("  overflow:  {}", snapshot.overflow_pushes);

    // A deliberately panicking task: demonstrates that a failing task
    // neither crashes the process nor takes down a worker thread.
    let failed = pool.submit(|| -> i32 { panic!("example failure") });
    match failed.get() {
        Err(e) => println!("\nCaught expected task failure: {e}"),
        Ok(_) => unreachable!(),
    }
}

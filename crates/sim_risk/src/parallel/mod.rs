//! Rayon thread pools for scenario execution.
//!
//! Scenario runs are independent and CPU-bound; each batch of scenarios runs
//! on a dedicated pool so callers can bound the CPU share of a stress run.

use rayon::{ThreadPool, ThreadPoolBuilder};
use sim_core::{SimResult, SimulationError};

/// Resolve a requested thread count: 0 means one thread per logical CPU.
///
/// ```rust
/// use sim_risk::parallel::resolve_threads;
///
/// assert_eq!(resolve_threads(3), 3);
/// assert!(resolve_threads(0) >= 1);
/// ```
pub fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

/// Build a named thread pool for scenario execution.
///
/// # Errors
///
/// `InvalidInput` if the pool cannot be created.
pub fn build_pool(requested: usize) -> SimResult<ThreadPool> {
    let threads = resolve_threads(requested);
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("capsim-scenario-{}", i))
        .build()
        .map_err(|e| SimulationError::invalid_input(format!("thread pool: {}", e)))
}

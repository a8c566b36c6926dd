//! Explicit run context.
//!
//! A [`SimulationContext`] replaces process-wide seeds and caches: it carries
//! the RNG seed, a cooperative [`CancellationFlag`] and an optional injected
//! [`TtlCache`] handle. Contexts are cheap to clone and share the flag and
//! cache with their clones.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::error::{SimResult, SimulationError};

/// Seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 42;

/// Shared cooperative cancellation flag.
///
/// # Example
///
/// ```rust
/// use sim_core::context::CancellationFlag;
///
/// let flag = CancellationFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Visible to every clone.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lower the flag again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-run context passed to the simulation and analytics entry points.
#[derive(Clone)]
pub struct SimulationContext {
    seed: u64,
    cancellation: CancellationFlag,
    cache: Option<Arc<dyn TtlCache>>,
}

impl SimulationContext {
    /// Context with the given seed, a fresh flag and no cache.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            cancellation: CancellationFlag::new(),
            cache: None,
        }
    }

    /// Share an existing cancellation flag.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Attach a cache handle.
    pub fn with_cache(mut self, cache: Arc<dyn TtlCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Same context with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Cancellation flag.
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Injected cache, if any.
    pub fn cache(&self) -> Option<&Arc<dyn TtlCache>> {
        self.cache.as_ref()
    }

    /// Return `Err(Cancelled)` if the flag is raised.
    pub fn check_cancelled(&self) -> SimResult<()> {
        if self.cancellation.is_cancelled() {
            Err(SimulationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Independent seed for an auxiliary stream (SplitMix64 finaliser).
    ///
    /// Keeps auxiliary draws such as drawdown sampling off the shock stream.
    pub fn derived_seed(&self, stream: u64) -> u64 {
        let mut z = self
            .seed
            .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("seed", &self.seed)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

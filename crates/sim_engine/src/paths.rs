//! Path integration for portfolio capital.
//!
//! Under continuous rebalancing to fixed target weights the portfolio value is
//! a one-dimensional Geometric Brownian Motion, integrated here with the exact
//! log-normal transition:
//!
//! ```text
//! X(t+dt) = max(X(t) × exp((μ - ½σ²)dt + σ√dt × Z), 1e-6)
//! ```
//!
//! # Capital Floor
//!
//! A value that falls below [`CAPITAL_FLOOR`] is clamped to the floor and the
//! path keeps evolving from there. There is no reflection, resampling or
//! absorption.
//!
//! # Memory Layout
//!
//! Paths are stored row-major: `paths[path_idx * n_steps + step_idx]`, with
//! `step_idx = 0` holding the initial capital. Shocks are stored row-major with
//! `n_steps - 1` draws per path.

/// Lower bound on simulated capital.
pub const CAPITAL_FLOOR: f64 = 1e-6;

/// Precomputed constants of one exact GBM step.
///
/// # Examples
///
/// ```rust
/// use sim_engine::paths::GbmStep;
///
/// let step = GbmStep::new(0.05, 0.04, 1.0 / 252.0);
/// let next = step.advance(100.0, 0.0);
/// assert!(next > 100.0 * (0.03_f64 / 252.0).exp() - 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GbmStep {
    /// `(μ - ½σ²) dt`
    pub drift: f64,
    /// `σ √dt`
    pub vol_sqrt_dt: f64,
}

impl GbmStep {
    /// Step constants from an annual drift, annual variance and time increment.
    #[inline]
    pub fn new(mu: f64, variance: f64, dt: f64) -> Self {
        Self {
            drift: (mu - 0.5 * variance) * dt,
            vol_sqrt_dt: variance.max(0.0).sqrt() * dt.sqrt(),
        }
    }

    /// Advance one step with standard normal shock `z`.
    #[inline]
    pub fn advance(&self, x: f64, z: f64) -> f64 {
        (x * (self.drift + self.vol_sqrt_dt * z).exp()).max(CAPITAL_FLOOR)
    }

    /// Advance one step with a pre-scaled diffusion increment.
    #[inline]
    pub fn advance_with_diffusion(&self, x: f64, diffusion: f64) -> f64 {
        (x * (self.drift + diffusion).exp()).max(CAPITAL_FLOOR)
    }
}

/// Integrate a single path in place.
///
/// `row[0]` is set to `x0`; `row[t + 1]` is derived from `row[t]` and
/// `shocks[t]`.
pub fn integrate_path(row: &mut [f64], shocks: &[f64], x0: f64, step: &GbmStep) {
    debug_assert_eq!(row.len(), shocks.len() + 1);

    row[0] = x0;
    for (t, &z) in shocks.iter().enumerate() {
        row[t + 1] = step.advance(row[t], z);
    }
}

/// Integrate a contiguous batch of paths in place.
///
/// `paths` holds whole rows of length `n_steps`; `shocks` holds the matching
/// rows of length `n_steps - 1`.
pub fn integrate_batch(paths: &mut [f64], shocks: &[f64], n_steps: usize, x0: f64, step: &GbmStep) {
    debug_assert!(n_steps >= 2);
    debug_assert_eq!(paths.len() / n_steps, shocks.len() / (n_steps - 1));

    for (row, row_shocks) in paths
        .chunks_exact_mut(n_steps)
        .zip(shocks.chunks_exact(n_steps - 1))
    {
        integrate_path(row, row_shocks, x0, step);
    }
}

//! Simulation driver.
//!
//! Orchestrates one run: validate shapes, reduce to portfolio moments, draw
//! the full shock matrix from a single seeded stream, then integrate path rows
//! in batches (in parallel above a threshold).
//!
//! # Reproducibility
//!
//! Shocks are drawn row-major before integration starts, so results are
//! bit-identical for a given seed regardless of thread count or batch size.
//!
//! # Integration order
//!
//! The recurrence `X[i, t+1] = f(X[i, t], Z[i, t])` is evaluated path by path
//! rather than time step by time step. Each path depends only on its own
//! row of shocks, so the two orders produce identical values; the row order
//! keeps batches contiguous for `par_chunks_mut`.
//!
//! # Cancellation
//!
//! The context's [`CancellationFlag`](sim_core::context::CancellationFlag) is
//! checked between batches of paths, both while drawing shocks and while
//! integrating. A raised flag aborts with [`SimulationError::Cancelled`].

use std::time::Instant;

use rayon::prelude::*;
use sim_core::context::SimulationContext;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_core::{SimResult, SimulationError};
use tracing::{debug, info, warn};

use crate::config::{ParallelConfig, SimulationConfig};
use crate::ensemble::{AssetTrajectories, PathEnsemble};
use crate::paths::{integrate_batch, GbmStep};
use crate::rng::SimRng;
use crate::shocks::{portfolio_moments, CorrelatedShockGenerator, PortfolioMoments};

/// Ensemble size above which a warning is logged (≈400 MB).
pub const LARGE_ENSEMBLE_BYTES: usize = 400 * 1024 * 1024;

/// Simulate the portfolio capital ensemble.
///
/// # Errors
///
/// - `ShapeMismatch` if the weights do not match the asset count
/// - `InvalidInput` if the configuration is invalid
/// - `DegenerateCovariance` if the covariance cannot be repaired
/// - `Cancelled` if the context's flag is raised during the run
///
/// # Examples
///
/// ```rust
/// use sim_core::context::SimulationContext;
/// use sim_core::types::{AssetParameters, PortfolioWeights};
/// use sim_engine::config::SimulationConfig;
/// use sim_engine::driver::simulate;
///
/// let params = AssetParameters::from_rows(
///     vec![0.10, 0.08],
///     &[vec![0.04, 0.01], vec![0.01, 0.03]],
/// ).unwrap();
/// let weights = PortfolioWeights::new(vec![0.6, 0.4]).unwrap();
/// let config = SimulationConfig::builder()
///     .x0(1_000_000.0)
///     .horizon(1.0)
///     .n_paths(500)
///     .build()
///     .unwrap();
///
/// let ensemble = simulate(&params, &weights, &config, &SimulationContext::new(42)).unwrap();
/// assert_eq!(ensemble.n_paths(), 500);
/// assert_eq!(ensemble.value(0, 0), 1_000_000.0);
/// ```
pub fn simulate(
    params: &AssetParameters,
    weights: &PortfolioWeights,
    config: &SimulationConfig,
    ctx: &SimulationContext,
) -> SimResult<PathEnsemble> {
    params.check_weights(weights)?;
    config.validate()?;
    let moments = portfolio_moments(params, weights)?;
    simulate_moments(&moments, config, ctx)
}

/// Simulate directly from portfolio moments.
///
/// # Errors
///
/// `InvalidInput` for an invalid configuration or non-finite moments, and
/// `Cancelled` as for [`simulate`].
pub fn simulate_moments(
    moments: &PortfolioMoments,
    config: &SimulationConfig,
    ctx: &SimulationContext,
) -> SimResult<PathEnsemble> {
    config.validate()?;
    if !(moments.mu.is_finite() && moments.variance.is_finite() && moments.variance >= 0.0) {
        return Err(SimulationError::invalid_input(format!(
            "portfolio moments must be finite with non-negative variance (mu={}, variance={})",
            moments.mu, moments.variance
        )));
    }

    let seed = config.seed().unwrap_or_else(|| ctx.seed());
    let n_paths = config.n_paths();
    let n_steps = config.n_steps();
    let started = Instant::now();

    info!(
        n_paths,
        n_steps,
        seed,
        port_mu = moments.mu,
        port_vol = moments.volatility,
        "Starting portfolio simulation"
    );
    log_ensemble_size(config.ensemble_bytes(), 1);

    let mut rng = SimRng::from_seed(seed);
    let shocks = draw_shocks(&mut rng, n_paths, n_steps - 1, config.parallel(), ctx)?;

    let step = GbmStep::new(moments.mu, moments.variance, config.dt());
    let mut paths = vec![0.0; n_paths * n_steps];
    integrate_all(&mut paths, &shocks, n_steps, config.x0(), &step, config.parallel(), ctx)?;

    info!(
        n_paths,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Portfolio simulation complete"
    );
    Ok(PathEnsemble::from_parts(paths, config.time_grid(), n_paths))
}

/// Simulate from flat inputs.
///
/// Shapes are checked before anything else: `mu`, every `sigma` row and
/// `weights` must all have length N. Inputs are never truncated or padded.
///
/// # Examples
///
/// ```rust
/// use sim_engine::driver::simulate_portfolio;
///
/// let ensemble = simulate_portfolio(
///     &[0.10, 0.08],
///     &[vec![0.04, 0.01], vec![0.01, 0.03]],
///     &[0.6, 0.4],
///     1_000_000.0,
///     1.0,
///     200,
///     42,
/// ).unwrap();
/// assert_eq!(ensemble.n_steps(), 252);
/// ```
pub fn simulate_portfolio(
    mu: &[f64],
    sigma: &[Vec<f64>],
    weights: &[f64],
    x0: f64,
    horizon: f64,
    n_paths: usize,
    seed: u64,
) -> SimResult<PathEnsemble> {
    check_flat_shapes(mu, sigma, weights)?;
    let params = AssetParameters::from_rows(mu.to_vec(), sigma)?;
    let weights = PortfolioWeights::new(weights.to_vec())?;
    let config = SimulationConfig::builder()
        .x0(x0)
        .horizon(horizon)
        .n_paths(n_paths)
        .seed(seed)
        .build()?;
    simulate(&params, &weights, &config, &SimulationContext::new(seed))
}

/// Validate `len(mu) == len(weights) == sigma.rows == sigma.cols`.
pub fn check_flat_shapes(mu: &[f64], sigma: &[Vec<f64>], weights: &[f64]) -> SimResult<()> {
    let n = mu.len();
    if sigma.len() != n {
        return Err(SimulationError::shape_mismatch("sigma rows", n, sigma.len()));
    }
    if let Some(row) = sigma.iter().find(|row| row.len() != n) {
        return Err(SimulationError::shape_mismatch("sigma columns", n, row.len()));
    }
    if weights.len() != n {
        return Err(SimulationError::shape_mismatch("weights", n, weights.len()));
    }
    Ok(())
}

/// Simulate the portfolio together with per-asset index trajectories.
///
/// Uses the asset-level [`CorrelatedShockGenerator`]: each step consumes one
/// i.i.d. normal vector of length N. Asset indices start at 1.0 and the
/// portfolio shock is the collapsed `w·(L z) / σ_p`.
///
/// # Errors
///
/// As for [`simulate`].
pub fn simulate_with_assets(
    params: &AssetParameters,
    weights: &PortfolioWeights,
    config: &SimulationConfig,
    ctx: &SimulationContext,
) -> SimResult<(PathEnsemble, AssetTrajectories)> {
    params.check_weights(weights)?;
    config.validate()?;
    let generator = CorrelatedShockGenerator::new(params, weights)?;

    let seed = config.seed().unwrap_or_else(|| ctx.seed());
    let n_assets = params.n_assets();
    let n_paths = config.n_paths();
    let n_steps = config.n_steps();
    let dt = config.dt();
    let sqrt_dt = dt.sqrt();
    let started = Instant::now();

    info!(
        n_paths,
        n_steps,
        n_assets,
        seed,
        "Starting asset-level portfolio simulation"
    );
    log_ensemble_size(config.ensemble_bytes(), n_assets + 1);

    let effective = generator
        .factorisation()
        .effective_covariance(params.sigma())
        .clone();
    let asset_steps: Vec<GbmStep> = (0..n_assets)
        .map(|i| GbmStep::new(params.mu()[i], effective.variance(i), dt))
        .collect();

    let mut rng = SimRng::from_seed(seed);
    let mut trajectories = AssetTrajectories::new(n_assets, n_paths, n_steps);
    let mut portfolio_shocks = vec![0.0; n_paths * (n_steps - 1)];
    let mut scratch = vec![0.0; n_assets];
    let mut correlated = vec![0.0; n_assets];
    let batch_size = config.parallel().batch_size.max(1);

    for (p, row_shocks) in portfolio_shocks.chunks_exact_mut(n_steps - 1).enumerate() {
        if p % batch_size == 0 {
            ctx.check_cancelled()?;
        }
        for asset in 0..n_assets {
            trajectories.path_mut(asset, p)[0] = 1.0;
        }
        for (t, slot) in row_shocks.iter_mut().enumerate() {
            *slot = generator.draw_step(&mut rng, &mut scratch, &mut correlated);
            for (asset, step) in asset_steps.iter().enumerate() {
                let row = trajectories.path_mut(asset, p);
                row[t + 1] = step.advance_with_diffusion(row[t], sqrt_dt * correlated[asset]);
            }
        }
    }

    let moments = generator.moments();
    let step = GbmStep::new(moments.mu, moments.variance, dt);
    let mut paths = vec![0.0; n_paths * n_steps];
    integrate_all(
        &mut paths,
        &portfolio_shocks,
        n_steps,
        config.x0(),
        &step,
        config.parallel(),
        ctx,
    )?;

    info!(
        n_paths,
        n_assets,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Asset-level simulation complete"
    );
    Ok((
        PathEnsemble::from_parts(paths, config.time_grid(), n_paths),
        trajectories,
    ))
}

fn log_ensemble_size(portfolio_bytes: usize, matrices: usize) {
    let bytes = portfolio_bytes.saturating_mul(matrices);
    debug!(bytes, "Allocating path ensemble");
    if bytes > LARGE_ENSEMBLE_BYTES {
        warn!(
            bytes,
            limit = LARGE_ENSEMBLE_BYTES,
            "Path ensemble exceeds recommended memory; consider fewer paths or a shorter horizon"
        );
    }
}

/// Draw the `n_paths × n_increments` shock matrix row-major from one stream.
fn draw_shocks(
    rng: &mut SimRng,
    n_paths: usize,
    n_increments: usize,
    parallel: &ParallelConfig,
    ctx: &SimulationContext,
) -> SimResult<Vec<f64>> {
    let mut shocks = vec![0.0; n_paths * n_increments];
    for batch in shocks.chunks_mut(parallel.batch_size.max(1) * n_increments) {
        ctx.check_cancelled()?;
        rng.fill_normal(batch);
    }
    Ok(shocks)
}

fn integrate_chunk(
    ctx: &SimulationContext,
    paths: &mut [f64],
    shocks: &[f64],
    n_steps: usize,
    x0: f64,
    step: &GbmStep,
) -> SimResult<()> {
    ctx.check_cancelled()?;
    integrate_batch(paths, shocks, n_steps, x0, step);
    Ok(())
}

fn integrate_all(
    paths: &mut [f64],
    shocks: &[f64],
    n_steps: usize,
    x0: f64,
    step: &GbmStep,
    parallel: &ParallelConfig,
    ctx: &SimulationContext,
) -> SimResult<()> {
    let rows = parallel.batch_size.max(1);
    let path_chunk = rows * n_steps;
    let shock_chunk = rows * (n_steps - 1);
    let n_paths = paths.len() / n_steps;

    if parallel.should_parallelize(n_paths) {
        paths
            .par_chunks_mut(path_chunk)
            .zip(shocks.par_chunks(shock_chunk))
            .try_for_each(|(batch, batch_shocks)| {
                integrate_chunk(ctx, batch, batch_shocks, n_steps, x0, step)
            })
    } else {
        paths
            .chunks_mut(path_chunk)
            .zip(shocks.chunks(shock_chunk))
            .try_for_each(|(batch, batch_shocks)| {
                integrate_chunk(ctx, batch, batch_shocks, n_steps, x0, step)
            })
    }
}

//! Scenario execution engine.
//!
//! Runs each stress scenario end to end (transform, simulate, analyse) on a
//! dedicated rayon pool and collects the reports by name.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use sim_core::context::SimulationContext;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_core::SimResult;
use sim_engine::config::SimulationConfig;
use sim_engine::driver::{check_flat_shapes, simulate};
use tracing::{debug, info};

use super::presets::{StressConfig, StressScenario};
use crate::analytics::{analyze, AnalyticsConfig, RiskReport};
use crate::parallel::build_pool;

/// Run the configured stress scenarios.
///
/// The baseline is always included. Every scenario uses the same seed
/// (the configuration's, else the context's).
///
/// # Errors
///
/// The first error raised by any scenario: invalid transform parameters,
/// simulation or analytics failures, or `Cancelled`.
pub fn run_scenarios(
    params: &AssetParameters,
    weights: &PortfolioWeights,
    sim_config: &SimulationConfig,
    analytics: &AnalyticsConfig,
    stress: &StressConfig,
    ctx: &SimulationContext,
) -> SimResult<BTreeMap<String, RiskReport>> {
    params.check_weights(weights)?;
    sim_config.validate()?;
    analytics.validate()?;

    let scenarios = stress.resolved_scenarios();
    let stressed: Vec<(StressScenario, AssetParameters)> = scenarios
        .iter()
        .map(|s| s.apply(params, stress).map(|p| (*s, p)))
        .collect::<SimResult<_>>()?;

    let seed = sim_config.seed().unwrap_or_else(|| ctx.seed());
    let sim_config = sim_config.clone();
    let run_ctx = ctx.clone().with_seed(seed);
    let pool = build_pool(stress.threads)?;
    let started = Instant::now();

    info!(
        scenarios = stressed.len(),
        threads = pool.current_num_threads(),
        n_paths = sim_config.n_paths(),
        seed,
        "Running stress scenarios"
    );

    let reports = pool.install(|| {
        stressed
            .par_iter()
            .map(|(scenario, scenario_params)| {
                run_ctx.check_cancelled()?;
                let scenario_started = Instant::now();
                let ensemble = simulate(scenario_params, weights, &sim_config, &run_ctx)?;
                let report = analyze(&ensemble, sim_config.x0(), analytics, &run_ctx)?;
                debug!(
                    scenario = scenario.name(),
                    elapsed_ms = scenario_started.elapsed().as_millis() as u64,
                    "Scenario complete"
                );
                Ok((scenario.name().to_string(), report))
            })
            .collect::<SimResult<Vec<_>>>()
    })?;

    info!(
        scenarios = reports.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Stress scenarios complete"
    );
    Ok(reports.into_iter().collect())
}

/// Run every preset scenario with default analytics and stress settings.
///
/// # Errors
///
/// `ShapeMismatch` if `mu`, `sigma` and `weights` disagree, plus the
/// conditions listed on [`run_scenarios`].
///
/// # Examples
///
/// ```rust
/// use sim_risk::scenarios::run_stress_scenarios;
///
/// let reports = run_stress_scenarios(
///     &[0.10, 0.08],
///     &[vec![0.04, 0.01], vec![0.01, 0.03]],
///     &[0.6, 0.4],
///     1_000_000.0,
///     1.0,
///     500,
/// ).unwrap();
///
/// assert_eq!(reports.len(), 5);
/// assert!(reports.contains_key("baseline"));
/// ```
pub fn run_stress_scenarios(
    mu: &[f64],
    sigma: &[Vec<f64>],
    weights: &[f64],
    x0: f64,
    horizon: f64,
    n_paths: usize,
) -> SimResult<BTreeMap<String, RiskReport>> {
    check_flat_shapes(mu, sigma, weights)?;
    let params = AssetParameters::from_rows(mu.to_vec(), sigma)?;
    let weights = PortfolioWeights::new(weights.to_vec())?;
    let sim_config = SimulationConfig::builder()
        .x0(x0)
        .horizon(horizon)
        .n_paths(n_paths)
        .build()?;
    run_scenarios(
        &params,
        &weights,
        &sim_config,
        &AnalyticsConfig::default(),
        &StressConfig::default(),
        &SimulationContext::default(),
    )
}

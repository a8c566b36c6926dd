//! `capsim analyze`: risk report for a simulated or stored ensemble.

use std::path::Path;

use sim_engine::driver::simulate;
use sim_risk::analytics::{analyze, RiskReport};
use tracing::{info, warn};

use super::context;
use crate::config::AppConfig;
use crate::input::PortfolioInput;
use crate::output::{emit, initial_capital, read_ensemble_csv, render_report};
use crate::Result;

/// Where the ensemble comes from.
#[derive(Debug, Clone, Copy)]
pub enum EnsembleSource<'a> {
    /// Simulate from a portfolio JSON file
    Portfolio(&'a Path),
    /// Read paths written by `capsim simulate --output`
    Csv(&'a Path),
}

/// Simulate the portfolio and analyse the result.
pub fn analyze_portfolio(config: &AppConfig, portfolio: &PortfolioInput) -> Result<RiskReport> {
    let (params, weights) = portfolio.to_model()?;
    let sim_config = config.simulation_config()?;
    let ctx = context(config);
    let ensemble = simulate(&params, &weights, &sim_config, &ctx)?;
    Ok(analyze(
        &ensemble,
        sim_config.x0(),
        &config.analytics_config(),
        &ctx,
    )?)
}

/// Analyse a stored ensemble.
///
/// Initial capital and time grid come from the file; configured values that
/// disagree are reported and ignored.
pub fn analyze_csv(config: &AppConfig, path: &Path) -> Result<RiskReport> {
    let ensemble = read_ensemble_csv(path)?;
    let x0 = initial_capital(&ensemble)?;
    info!(
        path = %path.display(),
        n_paths = ensemble.n_paths(),
        n_steps = ensemble.n_steps(),
        horizon = ensemble.horizon(),
        x0,
        "Loaded ensemble"
    );
    if x0 != config.simulation.x0 {
        warn!(file = x0, configured = config.simulation.x0, "Using initial capital from file");
    }
    if ensemble.horizon() != config.simulation.horizon {
        warn!(
            file = ensemble.horizon(),
            configured = config.simulation.horizon,
            "Using horizon from file"
        );
    }
    Ok(analyze(
        &ensemble,
        x0,
        &config.analytics_config(),
        &context(config),
    )?)
}

/// Entry point for `capsim analyze`.
pub fn run(config: &AppConfig, source: EnsembleSource<'_>) -> Result<()> {
    let report = match source {
        EnsembleSource::Portfolio(path) => {
            analyze_portfolio(config, &PortfolioInput::from_file(path)?)?
        }
        EnsembleSource::Csv(path) => analyze_csv(config, path)?,
    };
    emit(&report, config.runtime.format, render_report)
}

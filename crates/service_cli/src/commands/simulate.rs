//! `capsim simulate`: generate a path ensemble.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use sim_core::math::stats::{nan_mean, Moments};
use sim_engine::driver::{simulate, simulate_with_assets};
use sim_engine::shocks::portfolio_moments;
use tracing::info;

use super::context;
use crate::config::AppConfig;
use crate::input::PortfolioInput;
use crate::output::{emit, write_ensemble_csv};
use crate::Result;

/// What a simulation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub n_paths: usize,
    pub n_steps: usize,
    pub horizon: f64,
    pub seed: u64,
    /// Portfolio drift `w·μ`
    pub portfolio_mu: f64,
    /// Portfolio volatility `sqrt(wᵀΣw)`
    pub portfolio_volatility: f64,
    pub terminal: Moments,
    /// Mean terminal index level per asset, when asset paths were simulated
    pub asset_terminal_means: Option<Vec<f64>>,
    /// CSV file the ensemble was written to
    pub output: Option<String>,
}

/// Run the simulation and optionally write the ensemble.
pub fn execute(
    config: &AppConfig,
    portfolio: &PortfolioInput,
    output: Option<&Path>,
    with_assets: bool,
) -> Result<SimulationSummary> {
    let (params, weights) = portfolio.to_model()?;
    let sim_config = config.simulation_config()?;
    let ctx = context(config);
    let moments = portfolio_moments(&params, &weights)?;

    let (ensemble, asset_terminal_means) = if with_assets {
        let (ensemble, assets) = simulate_with_assets(&params, &weights, &sim_config, &ctx)?;
        let means = (0..assets.n_assets())
            .map(|a| nan_mean(&assets.terminal_values(a)))
            .collect();
        (ensemble, Some(means))
    } else {
        (simulate(&params, &weights, &sim_config, &ctx)?, None)
    };

    if let Some(path) = output {
        write_ensemble_csv(path, &ensemble)?;
        info!(path = %path.display(), n_paths = ensemble.n_paths(), "Wrote ensemble CSV");
    }

    Ok(SimulationSummary {
        n_paths: ensemble.n_paths(),
        n_steps: ensemble.n_steps(),
        horizon: ensemble.horizon(),
        seed: sim_config.seed().unwrap_or_else(|| ctx.seed()),
        portfolio_mu: moments.mu,
        portfolio_volatility: moments.volatility,
        terminal: Moments::from_samples(&ensemble.terminal_values()),
        asset_terminal_means,
        output: output.map(|p| p.display().to_string()),
    })
}

/// Entry point for `capsim simulate`.
pub fn run(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    with_assets: bool,
) -> Result<()> {
    let portfolio = PortfolioInput::from_file(input)?;
    let summary = execute(config, &portfolio, output, with_assets)?;
    emit(&summary, config.runtime.format, render)
}

fn render(summary: &SimulationSummary) -> String {
    summary.to_string()
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Simulated {} paths x {} time points over {:.4} years (seed {})",
            self.n_paths, self.n_steps, self.horizon, self.seed
        )?;
        writeln!(
            f,
            "Portfolio drift {:.4}, volatility {:.4}",
            self.portfolio_mu, self.portfolio_volatility
        )?;
        let t = &self.terminal;
        writeln!(
            f,
            "Terminal value: mean {:.2}, median {:.2}, min {:.2}, max {:.2}",
            t.mean, t.median, t.min, t.max
        )?;
        for (i, m) in self.asset_terminal_means.iter().flatten().enumerate() {
            writeln!(f, "  asset {} mean terminal index {:.4}", i, m)?;
        }
        if let Some(path) = &self.output {
            writeln!(f, "Ensemble written to {}", path)?;
        }
        Ok(())
    }
}

//! `capsim stress`: run stress scenarios side by side.

use std::collections::BTreeMap;
use std::path::Path;

use sim_risk::analytics::RiskReport;
use sim_risk::scenarios::{run_scenarios, ScenarioComparison};

use super::context;
use crate::config::AppConfig;
use crate::input::PortfolioInput;
use crate::output::{emit, render_stress, StressOutput};
use crate::Result;

/// Reports per scenario plus the baseline comparison.
pub fn execute(
    config: &AppConfig,
    portfolio: &PortfolioInput,
) -> Result<(BTreeMap<String, RiskReport>, Option<ScenarioComparison>)> {
    let (params, weights) = portfolio.to_model()?;
    let reports = run_scenarios(
        &params,
        &weights,
        &config.simulation_config()?,
        &config.analytics_config(),
        &config.stress_config()?,
        &context(config),
    )?;
    let comparison = ScenarioComparison::from_reports(&reports);
    Ok((reports, comparison))
}

/// Entry point for `capsim stress`.
pub fn run(config: &AppConfig, input: &Path) -> Result<()> {
    let portfolio = PortfolioInput::from_file(input)?;
    let (reports, comparison) = execute(config, &portfolio)?;
    let output = StressOutput {
        scenarios: &reports,
        comparison: comparison.as_ref(),
    };
    emit(&output, config.runtime.format, render_stress)
}

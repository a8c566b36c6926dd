//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod analyze;
pub mod check;
pub mod demo;
pub mod simulate;
pub mod stress;

use sim_core::context::{SimulationContext, DEFAULT_SEED};

use crate::config::AppConfig;

/// Execution context seeded from the configuration.
///
/// The seed also drives drawdown sampling, so it follows `--seed`.
pub(crate) fn context(config: &AppConfig) -> SimulationContext {
    SimulationContext::new(config.simulation.seed.unwrap_or(DEFAULT_SEED))
}

//! capsim - Command Line Operations for Portfolio Path Simulation
//!
//! This is the operational entry point for the portfolio simulation library.
//!
//! # Commands
//!
//! - `capsim simulate --input <portfolio.json>` - Generate a path ensemble
//! - `capsim analyze --input <portfolio.json>` - Simulate and report risk
//! - `capsim analyze --paths <ensemble.csv>` - Report risk for stored paths
//! - `capsim stress --input <portfolio.json>` - Compare stress scenarios
//! - `capsim demo` - Built-in two-asset walkthrough
//! - `capsim check` - Validate configuration and inputs
//!
//! # Architecture
//!
//! As the service layer, this crate wires configuration, input files and
//! output formatting around `sim_engine` and `sim_risk`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod input;
mod output;

pub use error::{CliError, Result};

use commands::analyze::EnsembleSource;
use config::{build_config, CliOverrides, LogLevel, OutputFormat};

/// Monte Carlo portfolio simulation and risk analytics
#[derive(Parser)]
#[command(name = "capsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML format)
    #[arg(short, long, global = true, env = "CAPSIM_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Simulation overrides shared by every command.
#[derive(Args, Debug, Clone, Default)]
struct SimulationArgs {
    /// Initial capital
    #[arg(long)]
    x0: Option<f64>,

    /// Horizon in years
    #[arg(long)]
    horizon: Option<f64>,

    /// Number of Monte Carlo paths
    #[arg(short, long)]
    num_paths: Option<usize>,

    /// RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Annual risk-free rate for the Sharpe ratio
    #[arg(long)]
    risk_free_rate: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate portfolio paths
    Simulate {
        /// Portfolio file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the ensemble to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also simulate per-asset index paths
        #[arg(long)]
        assets: bool,

        #[command(flatten)]
        sim: SimulationArgs,
    },

    /// Risk report for a simulated or stored ensemble
    Analyze {
        /// Portfolio file (JSON) to simulate
        #[arg(short, long, conflicts_with = "paths", required_unless_present = "paths")]
        input: Option<PathBuf>,

        /// Ensemble CSV written by `simulate --output`
        #[arg(short, long)]
        paths: Option<PathBuf>,

        #[command(flatten)]
        sim: SimulationArgs,
    },

    /// Run stress scenarios against the baseline
    Stress {
        /// Portfolio file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Scenarios to run (comma-separated); baseline always runs
        #[arg(long, value_delimiter = ',')]
        scenarios: Option<Vec<String>>,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        threads: Option<usize>,

        #[command(flatten)]
        sim: SimulationArgs,
    },

    /// Check configuration and an optional portfolio file
    Check {
        /// Portfolio file (JSON)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Run the built-in two-asset demonstration
    Demo {
        #[command(flatten)]
        sim: SimulationArgs,
    },
}

impl Cli {
    fn overrides(&self) -> std::result::Result<CliOverrides, config::ConfigError> {
        let mut overrides = CliOverrides {
            log_level: self.log_level.as_deref().map(str::parse::<LogLevel>).transpose()?,
            format: self.format.as_deref().map(str::parse::<OutputFormat>).transpose()?,
            ..Default::default()
        };
        if self.verbose && overrides.log_level.is_none() {
            overrides.log_level = Some(LogLevel::Debug);
        }

        let sim = match &self.command {
            Commands::Simulate { sim, .. }
            | Commands::Analyze { sim, .. }
            | Commands::Demo { sim } => Some(sim),
            Commands::Stress {
                sim,
                scenarios,
                threads,
                ..
            } => {
                overrides.scenarios = scenarios.clone();
                overrides.threads = *threads;
                Some(sim)
            }
            Commands::Check { .. } => None,
        };
        if let Some(sim) = sim {
            overrides.x0 = sim.x0;
            overrides.horizon = sim.horizon;
            overrides.n_paths = sim.num_paths;
            overrides.seed = sim.seed;
            overrides.risk_free_rate = sim.risk_free_rate;
        }
        Ok(overrides)
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides()?;
    let config = build_config(cli.config.as_deref(), &overrides).with_context(|| {
        match &cli.config {
            Some(path) => format!("loading configuration from {}", path.display()),
            None => "building configuration".to_string(),
        }
    })?;

    init_tracing(config.runtime.log_level.as_filter_str());
    info!("capsim v{}", env!("CARGO_PKG_VERSION"));
    debug!(?config, "Configuration loaded");

    match &cli.command {
        Commands::Simulate {
            input,
            output,
            assets,
            ..
        } => commands::simulate::run(&config, input, output.as_deref(), *assets)
            .with_context(|| format!("simulating {}", input.display())),
        Commands::Analyze { input, paths, .. } => {
            let source = match (input, paths) {
                (_, Some(paths)) => EnsembleSource::Csv(paths),
                (Some(input), None) => EnsembleSource::Portfolio(input),
                (None, None) => anyhow::bail!("analyze needs --input or --paths"),
            };
            commands::analyze::run(&config, source).context("analysing ensemble")
        }
        Commands::Stress { input, .. } => commands::stress::run(&config, input)
            .with_context(|| format!("stress testing {}", input.display())),
        Commands::Check { input } => {
            commands::check::run(&config, input.as_deref()).context("checking inputs")
        }
        Commands::Demo { .. } => commands::demo::run(&config).context("running demo"),
    }
}

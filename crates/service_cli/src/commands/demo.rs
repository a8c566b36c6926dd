//! Demo command: a complete run on a built-in two-asset portfolio.
//!
//! Walks through the three stages of the pipeline:
//! - Portfolio reduction (drift and volatility from `w`, `μ`, `Σ`)
//! - Path simulation and risk analytics
//! - Stress scenarios compared with the baseline

use crate::commands::{analyze, stress};
use crate::config::AppConfig;
use crate::input::PortfolioInput;
use crate::output::{render_report, render_stress, StressOutput};
use crate::Result;
use sim_engine::shocks::portfolio_moments;

/// Runs the demonstration.
///
/// The portfolio is 60/40 across two assets:
/// - Asset A: μ = 10%, σ = 20%
/// - Asset B: μ = 8%, σ ≈ 17.3%, covariance 0.01 with A
pub fn run(config: &AppConfig) -> Result<()> {
    println!("========================================");
    println!("Portfolio Path Simulation Demo");
    println!("========================================");
    println!();

    let portfolio = PortfolioInput::demo();
    let (params, weights) = portfolio.to_model()?;
    let moments = portfolio_moments(&params, &weights)?;

    println!("[Demo] Portfolio:");
    println!("  - weights:  {:?}", portfolio.weights);
    println!("  - mu:       {:?}", portfolio.mu);
    println!("  - sigma:    {:?}", portfolio.sigma);
    println!(
        "  - reduced:  drift {:.4}, volatility {:.4}",
        moments.mu, moments.volatility
    );
    println!();

    println!(
        "[Demo] Simulating {} paths over {} year(s)...",
        config.simulation.n_paths, config.simulation.horizon
    );
    println!();
    let report = analyze::analyze_portfolio(config, &portfolio)?;
    print!("{}", render_report(&report));
    println!();

    println!("[Demo] Running stress scenarios...");
    println!();
    let (reports, comparison) = stress::execute(config, &portfolio)?;
    print!(
        "{}",
        render_stress(&StressOutput {
            scenarios: &reports,
            comparison: comparison.as_ref(),
        })
    );
    println!();

    println!("========================================");
    println!("Demo completed successfully!");
    println!("========================================");

    Ok(())
}

//! `capsim check`: validate configuration and, optionally, a portfolio.

use std::path::Path;

use sim_core::math::covariance::{Factorisation, RepairMethod};
use sim_engine::shocks::portfolio_moments;
use sim_risk::parallel::resolve_threads;

use crate::config::AppConfig;
use crate::input::PortfolioInput;
use crate::Result;

/// Findings about a portfolio input.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioCheck {
    pub n_assets: usize,
    pub weight_sum: f64,
    pub gross_exposure: f64,
    pub portfolio_mu: f64,
    pub portfolio_volatility: f64,
    /// Repair applied to the covariance, if any, with its minimum eigenvalue
    pub repair: Option<(RepairMethod, f64)>,
}

/// Validate a portfolio and describe its covariance.
pub fn check_portfolio(portfolio: &PortfolioInput) -> Result<PortfolioCheck> {
    let (params, weights) = portfolio.to_model()?;
    let repair = match params.sigma().factorise()? {
        Factorisation::Exact(_) => None,
        Factorisation::Repaired {
            method,
            min_eigenvalue,
            ..
        } => Some((method, min_eigenvalue)),
    };
    let moments = portfolio_moments(&params, &weights)?;
    Ok(PortfolioCheck {
        n_assets: portfolio.n_assets(),
        weight_sum: weights.sum(),
        gross_exposure: weights.gross_exposure(),
        portfolio_mu: moments.mu,
        portfolio_volatility: moments.volatility,
        repair,
    })
}

/// Entry point for `capsim check`.
pub fn run(config: &AppConfig, input: Option<&Path>) -> Result<()> {
    println!("Configuration OK");
    println!(
        "  simulation: x0={} horizon={} n_paths={} seed={}",
        config.simulation.x0,
        config.simulation.horizon,
        config.simulation.n_paths,
        config
            .simulation
            .seed
            .map_or_else(|| "default".to_string(), |s| s.to_string())
    );
    println!(
        "  analytics:  rf={} confidence={:?}",
        config.analytics.risk_free_rate, config.analytics.confidence_levels
    );
    println!(
        "  stress:     scenarios={:?} threads={}",
        config.stress.scenarios,
        resolve_threads(config.stress.threads)
    );

    if let Some(path) = input {
        let check = check_portfolio(&PortfolioInput::from_file(path)?)?;
        println!("Portfolio {} OK", path.display());
        println!(
            "  assets={} weight sum={:.4} gross exposure={:.4}",
            check.n_assets, check.weight_sum, check.gross_exposure
        );
        println!(
            "  drift={:.4} volatility={:.4}",
            check.portfolio_mu, check.portfolio_volatility
        );
        match check.repair {
            None => println!("  covariance is positive semi-definite"),
            Some((method, min_eig)) => println!(
                "  covariance repaired ({:?}), minimum eigenvalue {:.3e}",
                method, min_eig
            ),
        }
    }
    Ok(())
}

//! # sim_engine: Monte Carlo Portfolio Path Simulation
//!
//! ## Layer 3 (Engine) Role
//!
//! sim_engine generates ensembles of portfolio capital trajectories from a
//! mean/covariance description of asset returns and fixed target weights:
//! - Seeded random number generation (`rng`)
//! - Run configuration and validation (`config`)
//! - Portfolio moment reduction and correlated shocks (`shocks`)
//! - Exact GBM integration with a capital floor (`paths`)
//! - Path ensembles and per-asset trajectories (`ensemble`)
//! - Parallel, cancellable orchestration (`driver`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use sim_engine::driver::simulate_portfolio;
//!
//! let ensemble = simulate_portfolio(
//!     &[0.10, 0.08],
//!     &[vec![0.04, 0.01], vec![0.01, 0.03]],
//!     &[0.6, 0.4],
//!     1_000_000.0,
//!     1.0,
//!     1_000,
//!     42,
//! ).unwrap();
//!
//! assert_eq!(ensemble.n_paths(), 1_000);
//! assert!(ensemble.column(0).iter().all(|&x| x == 1_000_000.0));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for configuration and ensembles

#![deny(missing_docs)]

pub mod config;
pub mod driver;
pub mod ensemble;
pub mod paths;
pub mod rng;
pub mod shocks;

pub use config::{ConfigError, ParallelConfig, SimulationConfig, SimulationConfigBuilder};
pub use driver::{simulate, simulate_portfolio, simulate_with_assets};
pub use ensemble::{AssetTrajectories, PathEnsemble};
pub use paths::{GbmStep, CAPITAL_FLOOR};
pub use shocks::{portfolio_moments, CorrelatedShockGenerator, PortfolioMoments};

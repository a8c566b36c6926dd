//! # sim_risk: Portfolio Risk Analytics and Stress Testing
//!
//! ## Layer 4 (Risk) Role
//!
//! sim_risk turns simulated path ensembles into risk reports:
//! - Terminal statistics, VaR/CVaR, Sharpe, drawdown and chart bands (`analytics`)
//! - Stress transforms and concurrent scenario runs (`scenarios`)
//! - Scenario thread pools (`parallel`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use sim_risk::analytics::analyze_paths;
//!
//! let paths = vec![
//!     vec![100.0, 104.0, 98.0],
//!     vec![100.0, 97.0, 103.0],
//!     vec![100.0, 101.0, 110.0],
//! ];
//! let report = analyze_paths(&paths, &[0.0, 0.5, 1.0], 100.0, 0.02, &[0.95]).unwrap();
//!
//! assert_eq!(report.n_paths, 3);
//! assert!(report.tail(0.95).unwrap().cvar >= report.tail(0.95).unwrap().var);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for reports and configuration

#![deny(missing_docs)]

pub mod analytics;
pub mod parallel;
pub mod scenarios;

pub use analytics::{analyze, analyze_paths, AnalyticsConfig, RiskReport};
pub use scenarios::{run_scenarios, run_stress_scenarios, ScenarioComparison, StressConfig};

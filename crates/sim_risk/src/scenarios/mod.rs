//! Stress scenarios.
//!
//! This module provides:
//! - Pure parameter transforms (`vol_shock`, `corr_shock`, `drift_shock`, `combined`)
//! - Preset stress scenarios and their configuration (`StressScenario`, `StressConfig`)
//! - Concurrent scenario execution (`run_scenarios`, `run_stress_scenarios`)
//! - Comparison against the baseline (`ScenarioComparison`)
//!
//! Every scenario reuses the same seed, so differences between reports come
//! from the parameter transform alone.

mod comparison;
mod engine;
mod presets;
mod transforms;

pub use comparison::{ScenarioComparison, ScenarioDelta};
pub use engine::{run_scenarios, run_stress_scenarios};
pub use presets::{StressConfig, StressScenario};
pub use transforms::{combined, corr_shock, drift_shock, vol_shock};

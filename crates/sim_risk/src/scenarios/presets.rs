//! Preset stress scenarios.

use sim_core::types::AssetParameters;
use sim_core::SimResult;

use super::transforms::{combined, corr_shock, drift_shock, vol_shock};

/// Preset stress scenarios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StressScenario {
    /// Unmodified parameters
    Baseline,
    /// Covariance scaled by the volatility multiplier
    VolShock,
    /// All correlations set to the target correlation
    CorrShock,
    /// Expected returns scaled by the drift multiplier
    DriftShock,
    /// Volatility shock then correlation shock
    Combined,
}

impl StressScenario {
    /// Every preset, baseline first.
    pub fn all() -> Vec<Self> {
        vec![
            Self::Baseline,
            Self::VolShock,
            Self::CorrShock,
            Self::DriftShock,
            Self::Combined,
        ]
    }

    /// Scenario name used as report key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::VolShock => "vol_shock",
            Self::CorrShock => "corr_shock",
            Self::DriftShock => "drift_shock",
            Self::Combined => "combined",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Baseline => "Unstressed parameters",
            Self::VolShock => "Covariance scaled up (volatility stress)",
            Self::CorrShock => "Correlations pushed towards one (diversification breakdown)",
            Self::DriftShock => "Expected returns scaled down (drift stress)",
            Self::Combined => "Volatility stress with correlation breakdown",
        }
    }

    /// Parse a scenario name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.name() == name)
    }

    /// Apply the scenario transform.
    pub fn apply(&self, params: &AssetParameters, config: &StressConfig) -> SimResult<AssetParameters> {
        match self {
            Self::Baseline => Ok(params.clone()),
            Self::VolShock => vol_shock(params, config.vol_multiplier),
            Self::CorrShock => corr_shock(params, config.target_correlation),
            Self::DriftShock => drift_shock(params, config.drift_multiplier),
            Self::Combined => combined(params, config.vol_multiplier, config.target_correlation),
        }
    }
}

/// Stress run configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StressConfig {
    /// Covariance multiplier for `vol_shock`
    pub vol_multiplier: f64,
    /// Target pairwise correlation for `corr_shock`
    pub target_correlation: f64,
    /// Expected-return multiplier for `drift_shock`
    pub drift_multiplier: f64,
    /// Worker threads; 0 means one per CPU
    pub threads: usize,
    /// Scenarios to run; baseline is always added
    pub scenarios: Vec<StressScenario>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            vol_multiplier: 1.5,
            target_correlation: 0.9,
            drift_multiplier: 0.5,
            threads: 0,
            scenarios: StressScenario::all(),
        }
    }
}

impl StressConfig {
    /// Scenarios to run, deduplicated, with baseline first.
    pub fn resolved_scenarios(&self) -> Vec<StressScenario> {
        let mut scenarios = vec![StressScenario::Baseline];
        for s in &self.scenarios {
            if !scenarios.contains(s) {
                scenarios.push(*s);
            }
        }
        scenarios
    }
}

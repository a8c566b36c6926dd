//! Scenario comparison against the baseline.

use std::collections::BTreeMap;

use crate::analytics::RiskReport;

const BASELINE: &str = "baseline";
const REFERENCE_CONFIDENCE: f64 = 0.95;

/// Change of key metrics relative to the baseline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioDelta {
    /// Change in mean terminal value
    pub mean_delta: f64,
    /// Change in terminal standard deviation
    pub std_delta: f64,
    /// Change in 95% VaR (percentage points), if both reports carry it
    pub var95_pct_delta: Option<f64>,
    /// Change in 95% CVaR (percentage points), if both reports carry it
    pub cvar95_pct_delta: Option<f64>,
    /// Change in Sharpe ratio
    pub sharpe_delta: f64,
}

impl ScenarioDelta {
    fn between(base: &RiskReport, other: &RiskReport) -> Self {
        let diff = |a: Option<f64>, b: Option<f64>| a.zip(b).map(|(a, b)| a - b);
        Self {
            mean_delta: other.terminal.mean - base.terminal.mean,
            std_delta: other.terminal.std - base.terminal.std,
            var95_pct_delta: diff(
                other.var_pct(REFERENCE_CONFIDENCE),
                base.var_pct(REFERENCE_CONFIDENCE),
            ),
            cvar95_pct_delta: diff(
                other.cvar_pct(REFERENCE_CONFIDENCE),
                base.cvar_pct(REFERENCE_CONFIDENCE),
            ),
            sharpe_delta: other.returns.sharpe_ratio - base.returns.sharpe_ratio,
        }
    }
}

/// Per-scenario deltas against the baseline and the worst scenario.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioComparison {
    /// Deltas keyed by scenario name (baseline excluded)
    pub deltas: BTreeMap<String, ScenarioDelta>,
    /// Scenario with the highest 95% VaR, baseline included
    pub worst_scenario: Option<String>,
}

impl ScenarioComparison {
    /// Compare every report with the `baseline` entry.
    ///
    /// Returns `None` when no baseline report is present.
    pub fn from_reports(reports: &BTreeMap<String, RiskReport>) -> Option<Self> {
        let base = reports.get(BASELINE)?;

        let deltas = reports
            .iter()
            .filter(|(name, _)| name.as_str() != BASELINE)
            .map(|(name, report)| (name.clone(), ScenarioDelta::between(base, report)))
            .collect();

        let worst_scenario = reports
            .iter()
            .filter_map(|(name, r)| r.var_pct(REFERENCE_CONFIDENCE).map(|v| (name, v)))
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.clone());

        Some(Self {
            deltas,
            worst_scenario,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::analyze_paths;

    fn report(terminal: &[f64]) -> RiskReport {
        let rows: Vec<Vec<f64>> = terminal.iter().map(|&x| vec![100.0, x]).collect();
        analyze_paths(&rows, &[0.0, 1.0], 100.0, 0.0, &[0.95, 0.99]).unwrap()
    }

    #[test]
    fn test_deltas_and_worst() {
        let mut reports = BTreeMap::new();
        reports.insert("baseline".to_string(), report(&[95.0, 100.0, 105.0, 110.0]));
        reports.insert("vol_shock".to_string(), report(&[80.0, 100.0, 110.0, 130.0]));
        reports.insert("drift_shock".to_string(), report(&[94.0, 99.0, 104.0, 109.0]));

        let cmp = ScenarioComparison::from_reports(&reports).unwrap();
        assert_eq!(cmp.deltas.len(), 2);
        assert!(!cmp.deltas.contains_key("baseline"));

        let drift = &cmp.deltas["drift_shock"];
        assert!((drift.mean_delta + 1.0).abs() < 1e-12);
        assert!(drift.std_delta.abs() < 1e-12);
        assert!(drift.var95_pct_delta.unwrap() > 0.0);

        assert!(cmp.deltas["vol_shock"].std_delta > 0.0);
        assert_eq!(cmp.worst_scenario.as_deref(), Some("vol_shock"));
    }

    #[test]
    fn test_missing_baseline() {
        let mut reports = BTreeMap::new();
        reports.insert("vol_shock".to_string(), report(&[90.0, 110.0]));
        assert!(ScenarioComparison::from_reports(&reports).is_none());
    }
}

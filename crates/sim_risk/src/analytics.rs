//! Risk analytics over a simulated path ensemble.
//!
//! [`analyze`] derives a [`RiskReport`] from an ensemble:
//!
//! - terminal distribution statistics (NaN-safe)
//! - Value at Risk and Conditional VaR per confidence level
//! - annualised return statistics and Sharpe ratio
//! - maximum drawdown (on a deterministic sample for large ensembles)
//! - quantile bands for charting
//! - probability of ending below the initial capital
//!
//! # Conventions
//!
//! ```text
//! VaR(L)  = x0 − Q(1 − L)                 Q: linear-interpolation quantile of X_T
//! CVaR(L) = x0 − mean{ X_T : X_T ≤ Q(1 − L) }
//! r       = (X_T / x0)^(1/T) − 1
//! Sharpe  = (mean(r) − r_f) / std(r)      0 when std(r) < 1e-6
//! ```
//!
//! Percentages are reported ×100 of `x0`.

use rayon::prelude::*;
use sim_core::context::SimulationContext;
use sim_core::math::stats::{nan_mean, quantile_sorted, sorted_non_nan, Moments};
use sim_core::{SimResult, SimulationError};
use sim_engine::ensemble::PathEnsemble;
use sim_engine::rng::SimRng;
use tracing::{debug, warn};

/// Standard deviation below which the Sharpe ratio is reported as 0.
pub const SHARPE_STD_FLOOR: f64 = 1e-6;

/// Default confidence levels for VaR and CVaR.
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 2] = [0.95, 0.99];

/// Default number of paths used for drawdown statistics.
pub const DEFAULT_DRAWDOWN_SAMPLE: usize = 500;

/// Default number of points in chart series.
pub const DEFAULT_CHART_POINTS: usize = 50;

/// Auxiliary RNG stream for drawdown sampling.
const DRAWDOWN_STREAM: u64 = 1;

/// Analytics configuration.
///
/// # Examples
///
/// ```rust
/// use sim_risk::analytics::AnalyticsConfig;
///
/// let config = AnalyticsConfig::default().with_risk_free_rate(0.03);
/// assert_eq!(config.confidence_levels, vec![0.95, 0.99]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyticsConfig {
    /// Annual risk-free rate for the Sharpe ratio
    pub risk_free_rate: f64,
    /// Confidence levels in (0, 1)
    pub confidence_levels: Vec<f64>,
    /// Maximum number of paths used for drawdown statistics
    pub drawdown_sample_size: usize,
    /// Target number of points in chart series
    pub chart_points: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            drawdown_sample_size: DEFAULT_DRAWDOWN_SAMPLE,
            chart_points: DEFAULT_CHART_POINTS,
        }
    }
}

impl AnalyticsConfig {
    /// Replace the risk-free rate.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Replace the confidence levels.
    pub fn with_confidence_levels(mut self, levels: Vec<f64>) -> Self {
        self.confidence_levels = levels;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a confidence level lies outside (0, 1), the
    /// risk-free rate is not finite, or a sample size is zero.
    pub fn validate(&self) -> SimResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(SimulationError::invalid_input("risk-free rate must be finite"));
        }
        if let Some(level) = self
            .confidence_levels
            .iter()
            .find(|&&l| !(l > 0.0 && l < 1.0))
        {
            return Err(SimulationError::invalid_input(format!(
                "confidence level must lie in (0, 1), got {}",
                level
            )));
        }
        if self.drawdown_sample_size == 0 {
            return Err(SimulationError::invalid_input(
                "drawdown sample size must be at least 1",
            ));
        }
        if self.chart_points == 0 {
            return Err(SimulationError::invalid_input("chart points must be at least 1"));
        }
        Ok(())
    }
}

/// Terminal capital distribution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminalStatistics {
    /// Mean terminal value
    pub mean: f64,
    /// Median terminal value
    pub median: f64,
    /// Sample standard deviation
    pub std: f64,
    /// Biased skewness
    pub skew: f64,
    /// Biased excess kurtosis
    pub kurtosis: f64,
    /// Smallest terminal value
    pub min: f64,
    /// Largest terminal value
    pub max: f64,
}

/// VaR and CVaR at one confidence level.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TailRisk {
    /// Confidence level in (0, 1)
    pub confidence: f64,
    /// Value at Risk in currency units
    pub var: f64,
    /// Value at Risk as % of initial capital
    pub var_pct: f64,
    /// Conditional VaR in currency units
    pub cvar: f64,
    /// Conditional VaR as % of initial capital
    pub cvar_pct: f64,
    /// CVaR fell back to VaR because the tail was empty
    pub cvar_from_var: bool,
}

/// Annualised return statistics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReturnStatistics {
    /// Mean annualised return
    pub mean_annual_return: f64,
    /// Sample std of annualised returns
    pub std_annual_return: f64,
    /// Sharpe ratio against the configured risk-free rate
    pub sharpe_ratio: f64,
}

/// Maximum drawdown statistics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawdownStatistics {
    /// Mean of per-path maximum drawdowns (%)
    pub mean_max_drawdown_pct: f64,
    /// Worst per-path maximum drawdown (%)
    pub worst_max_drawdown_pct: f64,
    /// Number of paths the statistics were computed on
    pub paths_used: usize,
    /// Whether a sample of the ensemble was used
    pub sampled: bool,
}

/// Quantile bands over a strided time grid.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartSeries {
    /// Time points (years)
    pub time: Vec<f64>,
    /// Cross-sectional mean
    pub mean: Vec<f64>,
    /// Cross-sectional median
    pub median: Vec<f64>,
    /// 25th percentile
    pub q25: Vec<f64>,
    /// 75th percentile
    pub q75: Vec<f64>,
}

/// Risk and return summary of a path ensemble.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskReport {
    /// Initial capital
    pub x0: f64,
    /// Horizon in years
    pub horizon: f64,
    /// Number of paths
    pub n_paths: usize,
    /// Number of time points per path
    pub n_steps: usize,
    /// Terminal distribution
    pub terminal: TerminalStatistics,
    /// VaR/CVaR per confidence level, in configured order
    pub tail_risk: Vec<TailRisk>,
    /// Annualised returns and Sharpe
    pub returns: ReturnStatistics,
    /// Maximum drawdown
    pub drawdown: DrawdownStatistics,
    /// Share of paths ending below x0 (%)
    pub probability_of_loss_pct: f64,
    /// Quantile bands for charting
    pub chart: ChartSeries,
}

impl RiskReport {
    /// Tail-risk entry for a confidence level.
    pub fn tail(&self, confidence: f64) -> Option<&TailRisk> {
        self.tail_risk
            .iter()
            .find(|t| (t.confidence - confidence).abs() < 1e-9)
    }

    /// VaR % at a confidence level, if computed.
    pub fn var_pct(&self, confidence: f64) -> Option<f64> {
        self.tail(confidence).map(|t| t.var_pct)
    }

    /// CVaR % at a confidence level, if computed.
    pub fn cvar_pct(&self, confidence: f64) -> Option<f64> {
        self.tail(confidence).map(|t| t.cvar_pct)
    }
}

/// Analyse an ensemble.
///
/// The context seed drives the drawdown sample, so repeated calls with the
/// same context give identical reports.
///
/// # Errors
///
/// - `InvalidInput` for a bad configuration, non-positive `x0` or horizon
/// - `NumericDivergence` if the terminal or return mean/std is NaN or infinite
///
/// # Examples
///
/// ```rust
/// use sim_core::context::SimulationContext;
/// use sim_engine::driver::simulate_portfolio;
/// use sim_risk::analytics::{analyze, AnalyticsConfig};
///
/// let ensemble = simulate_portfolio(
///     &[0.10, 0.08],
///     &[vec![0.04, 0.01], vec![0.01, 0.03]],
///     &[0.6, 0.4],
///     1_000_000.0,
///     1.0,
///     1_000,
///     42,
/// ).unwrap();
///
/// let report = analyze(
///     &ensemble,
///     1_000_000.0,
///     &AnalyticsConfig::default(),
///     &SimulationContext::new(42),
/// ).unwrap();
///
/// assert!(report.tail(0.99).unwrap().var >= report.tail(0.95).unwrap().var);
/// ```
pub fn analyze(
    ensemble: &PathEnsemble,
    x0: f64,
    config: &AnalyticsConfig,
    ctx: &SimulationContext,
) -> SimResult<RiskReport> {
    config.validate()?;
    if !(x0.is_finite() && x0 > 0.0) {
        return Err(SimulationError::invalid_input(format!(
            "initial capital must be finite and positive, got {}",
            x0
        )));
    }
    let horizon = ensemble.horizon();
    if !(horizon.is_finite() && horizon > 0.0) {
        return Err(SimulationError::invalid_input(format!(
            "time grid must end at a positive horizon, got {}",
            horizon
        )));
    }

    let terminal_values = ensemble.terminal_values();
    let moments = Moments::from_samples(&terminal_values);
    check_finite("terminal mean", moments.mean)?;
    check_finite("terminal std", moments.std)?;

    let sorted = sorted_non_nan(&terminal_values);
    let tail_risk = config
        .confidence_levels
        .iter()
        .map(|&level| tail_risk(&sorted, x0, level))
        .collect();

    let returns = return_statistics(&terminal_values, x0, horizon, config.risk_free_rate)?;
    let drawdown = drawdown_statistics(ensemble, config.drawdown_sample_size, ctx);
    let chart = chart_series(ensemble, config.chart_points);

    let losses = sorted.iter().filter(|&&x| x < x0).count();
    let probability_of_loss_pct = 100.0 * losses as f64 / sorted.len() as f64;

    debug!(
        n_paths = ensemble.n_paths(),
        mean = moments.mean,
        sharpe = returns.sharpe_ratio,
        "Ensemble analysed"
    );

    Ok(RiskReport {
        x0,
        horizon,
        n_paths: ensemble.n_paths(),
        n_steps: ensemble.n_steps(),
        terminal: TerminalStatistics {
            mean: moments.mean,
            median: moments.median,
            std: moments.std,
            skew: moments.skew,
            kurtosis: moments.kurtosis,
            min: moments.min,
            max: moments.max,
        },
        tail_risk,
        returns,
        drawdown,
        probability_of_loss_pct,
        chart,
    })
}

/// Analyse raw path rows and a time grid.
///
/// Uses the default drawdown sample size, chart resolution and context seed.
///
/// # Errors
///
/// `ShapeMismatch` if a row length differs from the time grid, plus the
/// conditions listed on [`analyze`].
pub fn analyze_paths(
    paths: &[Vec<f64>],
    time_grid: &[f64],
    x0: f64,
    risk_free_rate: f64,
    confidence_levels: &[f64],
) -> SimResult<RiskReport> {
    let ensemble = PathEnsemble::from_rows(paths, time_grid.to_vec())?;
    let config = AnalyticsConfig::default()
        .with_risk_free_rate(risk_free_rate)
        .with_confidence_levels(confidence_levels.to_vec());
    analyze(&ensemble, x0, &config, &SimulationContext::default())
}

fn check_finite(what: &str, value: f64) -> SimResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::divergence(format!("{} is {}", what, value)))
    }
}

/// VaR and CVaR at `level` from sorted, NaN-free terminal values.
fn tail_risk(sorted: &[f64], x0: f64, level: f64) -> TailRisk {
    let cutoff = quantile_sorted(sorted, 1.0 - level);
    let var = x0 - cutoff;

    let tail_len = sorted.partition_point(|&x| x <= cutoff);
    let (cvar, cvar_from_var) = if tail_len == 0 {
        warn!(confidence = level, "Empty VaR tail; CVaR falls back to VaR");
        (var, true)
    } else {
        let tail_mean = sorted[..tail_len].iter().sum::<f64>() / tail_len as f64;
        (x0 - tail_mean, false)
    };

    TailRisk {
        confidence: level,
        var,
        var_pct: 100.0 * var / x0,
        cvar,
        cvar_pct: 100.0 * cvar / x0,
        cvar_from_var,
    }
}

fn return_statistics(
    terminal_values: &[f64],
    x0: f64,
    horizon: f64,
    risk_free_rate: f64,
) -> SimResult<ReturnStatistics> {
    let exponent = 1.0 / horizon;
    let annual: Vec<f64> = terminal_values
        .iter()
        .map(|&x| (x / x0).powf(exponent) - 1.0)
        .collect();
    let moments = Moments::from_samples(&annual);
    check_finite("mean annual return", moments.mean)?;
    check_finite("annual return std", moments.std)?;

    let sharpe_ratio = if moments.std < SHARPE_STD_FLOOR {
        0.0
    } else {
        (moments.mean - risk_free_rate) / moments.std
    };

    Ok(ReturnStatistics {
        mean_annual_return: moments.mean,
        std_annual_return: moments.std,
        sharpe_ratio,
    })
}

/// Maximum relative decline from the running peak.
pub fn max_drawdown(path: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &x in path.iter().filter(|x| !x.is_nan()) {
        peak = peak.max(x);
        if peak > 0.0 {
            worst = worst.max((peak - x) / peak);
        }
    }
    worst
}

fn drawdown_statistics(
    ensemble: &PathEnsemble,
    sample_size: usize,
    ctx: &SimulationContext,
) -> DrawdownStatistics {
    let n_paths = ensemble.n_paths();
    let sampled = n_paths > sample_size;
    let indices: Vec<usize> = if sampled {
        let mut rng = SimRng::from_seed(ctx.derived_seed(DRAWDOWN_STREAM));
        rng.sample_indices(n_paths, sample_size)
    } else {
        (0..n_paths).collect()
    };
    if sampled {
        debug!(n_paths, sample_size, "Sampling paths for drawdown statistics");
    }

    let drawdowns: Vec<f64> = indices
        .par_iter()
        .map(|&i| max_drawdown(ensemble.path(i)))
        .collect();
    let worst = drawdowns.iter().copied().fold(0.0_f64, f64::max);

    DrawdownStatistics {
        mean_max_drawdown_pct: 100.0 * nan_mean(&drawdowns),
        worst_max_drawdown_pct: 100.0 * worst,
        paths_used: indices.len(),
        sampled,
    }
}

fn chart_series(ensemble: &PathEnsemble, chart_points: usize) -> ChartSeries {
    let stride = (ensemble.n_steps() / chart_points.max(1)).max(1);
    let indices = ensemble.strided_indices(stride);

    let bands: Vec<(f64, f64, f64, f64)> = indices
        .par_iter()
        .map(|&t| {
            let column = ensemble.column(t);
            let sorted = sorted_non_nan(&column);
            (
                nan_mean(&column),
                quantile_sorted(&sorted, 0.5),
                quantile_sorted(&sorted, 0.25),
                quantile_sorted(&sorted, 0.75),
            )
        })
        .collect();

    let grid = ensemble.time_grid();
    ChartSeries {
        time: indices.iter().map(|&t| grid[t]).collect(),
        mean: bands.iter().map(|b| b.0).collect(),
        median: bands.iter().map(|b| b.1).collect(),
        q25: bands.iter().map(|b| b.2).collect(),
        q75: bands.iter().map(|b| b.3).collect(),
    }
}

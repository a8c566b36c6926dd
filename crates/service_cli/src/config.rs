//! Application configuration.
//!
//! Settings come from four sources, highest priority first:
//!
//! 1. CLI flags
//! 2. Environment variables (`CAPSIM_*`)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! # Example file
//!
//! ```toml
//! [simulation]
//! x0 = 1000000.0
//! horizon = 2.0
//! n_paths = 20000
//! seed = 7
//!
//! [analytics]
//! risk_free_rate = 0.03
//! confidence_levels = [0.95, 0.99]
//!
//! [stress]
//! vol_multiplier = 2.0
//! scenarios = ["vol_shock", "corr_shock"]
//!
//! [runtime]
//! log_level = "debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sim_engine::config::{
    steps_for_horizon, ParallelConfig, SimulationConfig, DEFAULT_BATCH_SIZE, MAX_PATHS, MAX_STEPS,
};
use sim_risk::analytics::{
    AnalyticsConfig, DEFAULT_CHART_POINTS, DEFAULT_CONFIDENCE_LEVELS, DEFAULT_DRAWDOWN_SAMPLE,
};
use sim_risk::scenarios::{StressConfig, StressScenario};
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid output format: {0}. Must be one of: table, json")]
    InvalidFormat(String),

    #[error("environment variable {var} has invalid value '{value}'")]
    Env { var: String, value: String },

    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

/// Log levels accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Tracing filter directive for this level.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// `[simulation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Initial capital
    pub x0: f64,
    /// Horizon in years
    pub horizon: f64,
    /// Number of simulated paths
    pub n_paths: usize,
    /// RNG seed; the context default applies when absent
    pub seed: Option<u64>,
    /// Paths per cancellation check and parallel chunk
    pub batch_size: usize,
    /// Path count from which integration runs in parallel
    pub parallel_threshold: usize,
}

impl Default for SimulationSection {
    fn default() -> Self {
        let parallel = ParallelConfig::default();
        Self {
            x0: 1_000_000.0,
            horizon: 1.0,
            n_paths: 10_000,
            seed: None,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_threshold: parallel.parallel_threshold,
        }
    }
}

/// `[analytics]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsSection {
    pub risk_free_rate: f64,
    pub confidence_levels: Vec<f64>,
    pub drawdown_sample_size: usize,
    pub chart_points: usize,
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            drawdown_sample_size: DEFAULT_DRAWDOWN_SAMPLE,
            chart_points: DEFAULT_CHART_POINTS,
        }
    }
}

/// `[stress]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressSection {
    pub vol_multiplier: f64,
    pub target_correlation: f64,
    pub drift_multiplier: f64,
    /// Worker threads; 0 means one per CPU
    pub threads: usize,
    /// Scenario names; baseline always runs
    pub scenarios: Vec<String>,
}

impl Default for StressSection {
    fn default() -> Self {
        let defaults = StressConfig::default();
        Self {
            vol_multiplier: defaults.vol_multiplier,
            target_correlation: defaults.target_correlation,
            drift_multiplier: defaults.drift_multiplier,
            threads: defaults.threads,
            scenarios: defaults
                .scenarios
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
        }
    }
}

/// `[runtime]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSection {
    pub log_level: LogLevel,
    pub format: OutputFormat,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub simulation: SimulationSection,
    pub analytics: AnalyticsSection,
    pub stress: StressSection,
    pub runtime: RuntimeSection,
}

/// Overrides taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub x0: Option<f64>,
    pub horizon: Option<f64>,
    pub n_paths: Option<usize>,
    pub seed: Option<u64>,
    pub risk_free_rate: Option<f64>,
    pub threads: Option<usize>,
    pub scenarios: Option<Vec<String>>,
    pub log_level: Option<LogLevel>,
    pub format: Option<OutputFormat>,
}

fn parse_env<T: FromStr>(var: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value,
    })
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing sections and fields keep their defaults. The result is not
    /// validated; see [`AppConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `CAPSIM_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply `CAPSIM_*` overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CAPSIM_X0") {
            self.simulation.x0 = parse_env("CAPSIM_X0", v)?;
        }
        if let Some(v) = lookup("CAPSIM_HORIZON") {
            self.simulation.horizon = parse_env("CAPSIM_HORIZON", v)?;
        }
        if let Some(v) = lookup("CAPSIM_N_PATHS") {
            self.simulation.n_paths = parse_env("CAPSIM_N_PATHS", v)?;
        }
        if let Some(v) = lookup("CAPSIM_SEED") {
            self.simulation.seed = Some(parse_env("CAPSIM_SEED", v)?);
        }
        if let Some(v) = lookup("CAPSIM_RISK_FREE_RATE") {
            self.analytics.risk_free_rate = parse_env("CAPSIM_RISK_FREE_RATE", v)?;
        }
        if let Some(v) = lookup("CAPSIM_THREADS") {
            self.stress.threads = parse_env("CAPSIM_THREADS", v)?;
        }
        if let Some(v) = lookup("CAPSIM_LOG_LEVEL") {
            self.runtime.log_level = LogLevel::from_str(&v)?;
        }
        if let Some(v) = lookup("CAPSIM_FORMAT") {
            self.runtime.format = OutputFormat::from_str(&v)?;
        }
        Ok(())
    }

    /// Merge with CLI flags (CLI takes precedence).
    pub fn merge_with_cli(&mut self, cli: &CliOverrides) {
        if let Some(x0) = cli.x0 {
            self.simulation.x0 = x0;
        }
        if let Some(horizon) = cli.horizon {
            self.simulation.horizon = horizon;
        }
        if let Some(n_paths) = cli.n_paths {
            self.simulation.n_paths = n_paths;
        }
        if let Some(seed) = cli.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(rate) = cli.risk_free_rate {
            self.analytics.risk_free_rate = rate;
        }
        if let Some(threads) = cli.threads {
            self.stress.threads = threads;
        }
        if let Some(scenarios) = &cli.scenarios {
            self.stress.scenarios = scenarios.clone();
        }
        if let Some(level) = cli.log_level {
            self.runtime.log_level = level;
        }
        if let Some(format) = cli.format {
            self.runtime.format = format;
        }
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let sim = &self.simulation;

        if !(sim.x0.is_finite() && sim.x0 > 0.0) {
            problems.push(format!("simulation.x0 must be finite and positive, got {}", sim.x0));
        }
        if !(sim.horizon.is_finite() && sim.horizon > 0.0) {
            problems.push(format!(
                "simulation.horizon must be finite and positive, got {}",
                sim.horizon
            ));
        } else if steps_for_horizon(sim.horizon) > MAX_STEPS {
            problems.push(format!(
                "simulation.horizon {} needs more than {} time steps",
                sim.horizon, MAX_STEPS
            ));
        }
        if sim.n_paths == 0 || sim.n_paths > MAX_PATHS {
            problems.push(format!(
                "simulation.n_paths must be between 1 and {}, got {}",
                MAX_PATHS, sim.n_paths
            ));
        }
        if sim.batch_size == 0 {
            problems.push("simulation.batch_size must be at least 1".to_string());
        }

        let analytics = &self.analytics;
        if !analytics.risk_free_rate.is_finite() {
            problems.push("analytics.risk_free_rate must be finite".to_string());
        }
        for level in &analytics.confidence_levels {
            if !(*level > 0.0 && *level < 1.0) {
                problems.push(format!(
                    "analytics.confidence_levels entries must lie in (0, 1), got {}",
                    level
                ));
            }
        }
        if analytics.drawdown_sample_size == 0 {
            problems.push("analytics.drawdown_sample_size must be at least 1".to_string());
        }
        if analytics.chart_points == 0 {
            problems.push("analytics.chart_points must be at least 1".to_string());
        }

        let stress = &self.stress;
        if !(stress.vol_multiplier.is_finite() && stress.vol_multiplier >= 0.0) {
            problems.push(format!(
                "stress.vol_multiplier must be finite and non-negative, got {}",
                stress.vol_multiplier
            ));
        }
        if !(-1.0..=1.0).contains(&stress.target_correlation) {
            problems.push(format!(
                "stress.target_correlation must lie in [-1, 1], got {}",
                stress.target_correlation
            ));
        }
        if !stress.drift_multiplier.is_finite() {
            problems.push("stress.drift_multiplier must be finite".to_string());
        }
        for name in &stress.scenarios {
            if StressScenario::from_name(name).is_none() {
                problems.push(format!("stress.scenarios has unknown scenario '{}'", name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }

    /// Engine configuration for the `[simulation]` section.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        let sim = &self.simulation;
        let mut builder = SimulationConfig::builder()
            .x0(sim.x0)
            .horizon(sim.horizon)
            .n_paths(sim.n_paths)
            .parallel(ParallelConfig::new(sim.batch_size, sim.parallel_threshold));
        if let Some(seed) = sim.seed {
            builder = builder.seed(seed);
        }
        builder
            .build()
            .map_err(|e| ConfigError::Validation(vec![e.to_string()]))
    }

    /// Analytics configuration for the `[analytics]` section.
    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            risk_free_rate: self.analytics.risk_free_rate,
            confidence_levels: self.analytics.confidence_levels.clone(),
            drawdown_sample_size: self.analytics.drawdown_sample_size,
            chart_points: self.analytics.chart_points,
        }
    }

    /// Stress configuration for the `[stress]` section.
    pub fn stress_config(&self) -> Result<StressConfig, ConfigError> {
        let scenarios = self
            .stress
            .scenarios
            .iter()
            .map(|name| {
                StressScenario::from_name(name).ok_or_else(|| {
                    ConfigError::Validation(vec![format!("unknown stress scenario '{}'", name)])
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StressConfig {
            vol_multiplier: self.stress.vol_multiplier,
            target_correlation: self.stress.target_correlation,
            drift_multiplier: self.stress.drift_multiplier,
            threads: self.stress.threads,
            scenarios,
        })
    }
}

/// Build configuration from all sources and validate it.
pub fn build_config(path: Option<&Path>, cli: &CliOverrides) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env()?;
    config.merge_with_cli(cli);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.simulation.x0, 1_000_000.0);
        assert_eq!(config.simulation.horizon, 1.0);
        assert_eq!(config.simulation.n_paths, 10_000);
        assert_eq!(config.simulation.seed, None);
        assert_eq!(config.analytics.risk_free_rate, 0.02);
        assert_eq!(config.analytics.confidence_levels, vec![0.95, 0.99]);
        assert_eq!(config.stress.vol_multiplier, 1.5);
        assert_eq!(config.stress.target_correlation, 0.9);
        assert_eq!(config.stress.drift_multiplier, 0.5);
        assert_eq!(config.stress.scenarios.len(), 5);
        assert_eq!(config.runtime.log_level, LogLevel::Info);
        assert_eq!(config.runtime.format, OutputFormat::Table);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warn").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [simulation]
            n_paths = 500
            seed = 7

            [runtime]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.n_paths, 500);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.x0, 1_000_000.0);
        assert_eq!(config.runtime.format, OutputFormat::Json);
        assert_eq!(config.analytics, AnalyticsSection::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[simulation]\npaths = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stress]\nvol_multiplier = 2.0\nscenarios = [\"vol_shock\"]").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.stress.vol_multiplier, 2.0);
        assert_eq!(config.stress.scenarios, vec!["vol_shock"]);

        let missing = AppConfig::from_file(Path::new("/nonexistent/capsim.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation\nx0 = ").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(lookup(&[
                ("CAPSIM_N_PATHS", "2500"),
                ("CAPSIM_SEED", "99"),
                ("CAPSIM_LOG_LEVEL", "debug"),
                ("CAPSIM_FORMAT", "json"),
            ]))
            .unwrap();
        assert_eq!(config.simulation.n_paths, 2500);
        assert_eq!(config.simulation.seed, Some(99));
        assert_eq!(config.runtime.log_level, LogLevel::Debug);
        assert_eq!(config.runtime.format, OutputFormat::Json);
        assert_eq!(config.simulation.x0, 1_000_000.0);
    }

    #[test]
    fn test_env_bad_value() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(lookup(&[("CAPSIM_HORIZON", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "CAPSIM_HORIZON"));
    }

    #[test]
    fn test_cli_beats_env() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(lookup(&[("CAPSIM_N_PATHS", "2500")]))
            .unwrap();
        config.merge_with_cli(&CliOverrides {
            n_paths: Some(100),
            format: Some(OutputFormat::Json),
            ..Default::default()
        });
        assert_eq!(config.simulation.n_paths, 100);
        assert_eq!(config.runtime.format, OutputFormat::Json);
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let mut config = AppConfig::default();
        config.simulation.x0 = -1.0;
        config.simulation.n_paths = 0;
        config.analytics.confidence_levels = vec![0.95, 1.0];
        config.stress.target_correlation = 1.5;
        config.stress.scenarios.push("meteor".to_string());

        match config.validate() {
            Err(ConfigError::Validation(problems)) => {
                assert_eq!(problems.len(), 5);
                assert!(problems.iter().any(|p| p.contains("meteor")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_horizon_step_limit() {
        let mut config = AppConfig::default();
        config.simulation.horizon = 1_000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_configs() {
        let mut config = AppConfig::default();
        config.simulation.n_paths = 1_000;
        config.simulation.seed = Some(3);
        config.stress.scenarios = vec!["drift_shock".to_string()];

        let sim = config.simulation_config().unwrap();
        assert_eq!(sim.n_paths(), 1_000);
        assert_eq!(sim.seed(), Some(3));
        assert_eq!(sim.n_steps(), 252);

        let stress = config.stress_config().unwrap();
        assert_eq!(stress.scenarios, vec![StressScenario::DriftShock]);
        assert_eq!(
            stress.resolved_scenarios(),
            vec![StressScenario::Baseline, StressScenario::DriftShock]
        );

        assert_eq!(config.analytics_config(), AnalyticsConfig::default());
    }

    #[test]
    fn test_build_config_without_file() {
        let config = build_config(
            None,
            &CliOverrides {
                n_paths: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(config, Err(ConfigError::Validation(_))));
    }
}

//! Simulation configuration.
//!
//! This module provides the run configuration for portfolio path simulation,
//! its builder, the parallel batching configuration and the validation error
//! type.

use sim_core::SimulationError;
use thiserror::Error;

/// Maximum number of simulation paths allowed.
pub const MAX_PATHS: usize = 10_000_000;

/// Maximum number of time points allowed per path.
pub const MAX_STEPS: usize = 100_000;

/// Trading days per year used to derive the step count.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default number of paths per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Configuration error for simulation setup.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Path count outside valid range.
    #[error("Invalid path count {0}: must be in range [1, 10_000_000]")]
    InvalidPathCount(usize),

    /// Derived step count outside valid range.
    #[error("Invalid step count {0}: must be in range [2, 100_000]")]
    InvalidStepCount(usize),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::InvalidInput(err.to_string())
    }
}

/// Number of time points for a horizon: `max(2, round(T × 252))`.
///
/// ```rust
/// use sim_engine::config::steps_for_horizon;
///
/// assert_eq!(steps_for_horizon(1.0), 252);
/// assert_eq!(steps_for_horizon(0.001), 2);
/// ```
pub fn steps_for_horizon(horizon: f64) -> usize {
    let raw = (horizon * TRADING_DAYS_PER_YEAR).round();
    if raw.is_finite() && raw > 2.0 {
        raw as usize
    } else {
        2
    }
}

/// Batching configuration for parallel path integration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParallelConfig {
    /// Paths per batch; cancellation is checked between batches
    pub batch_size: usize,
    /// Minimum path count before rayon is used
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_threshold: 256,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(batch_size: usize, parallel_threshold: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            parallel_threshold,
        }
    }

    /// Serial execution in a single batch stream.
    pub fn serial() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_threshold: usize::MAX,
        }
    }

    /// Returns whether to use parallel processing for the given path count.
    #[inline]
    pub fn should_parallelize(&self, n_paths: usize) -> bool {
        n_paths >= self.parallel_threshold
    }
}

/// Portfolio path simulation configuration.
///
/// Use [`SimulationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use sim_engine::config::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .x0(1_000_000.0)
///     .horizon(1.0)
///     .n_paths(5_000)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_steps(), 252);
/// assert_eq!(config.time_grid().len(), 252);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Initial capital.
    x0: f64,
    /// Horizon in years.
    horizon: f64,
    /// Number of simulation paths.
    n_paths: usize,
    /// Optional seed; falls back to the context seed.
    seed: Option<u64>,
    /// Parallel batching.
    parallel: ParallelConfig,
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Initial capital.
    #[inline]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    /// Horizon in years.
    #[inline]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Number of simulation paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of time points per path, including `t = 0`.
    #[inline]
    pub fn n_steps(&self) -> usize {
        steps_for_horizon(self.horizon)
    }

    /// Time increment `T / (n_steps - 1)`.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.horizon / (self.n_steps() - 1) as f64
    }

    /// Explicit seed, if one was set.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Parallel batching configuration.
    #[inline]
    pub fn parallel(&self) -> &ParallelConfig {
        &self.parallel
    }

    /// Equally spaced time grid from 0 to T inclusive.
    pub fn time_grid(&self) -> Vec<f64> {
        linspace(self.horizon, self.n_steps())
    }

    /// Bytes needed for the path matrix.
    pub fn ensemble_bytes(&self) -> usize {
        self.n_paths
            .saturating_mul(self.n_steps())
            .saturating_mul(std::mem::size_of::<f64>())
    }

    /// Copy of this configuration with a different path count.
    pub fn with_n_paths(&self, n_paths: usize) -> Result<Self, ConfigError> {
        let config = Self {
            n_paths,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `x0` is not finite and positive
    /// - `horizon` is not finite and positive
    /// - `n_paths` is 0 or greater than 10,000,000
    /// - the derived step count exceeds 100,000
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.x0.is_finite() && self.x0 > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "x0",
                value: format!("must be finite and positive, got {}", self.x0),
            });
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "horizon",
                value: format!("must be finite and positive, got {}", self.horizon),
            });
        }
        if self.n_paths == 0 || self.n_paths > MAX_PATHS {
            return Err(ConfigError::InvalidPathCount(self.n_paths));
        }
        let n_steps = self.n_steps();
        if n_steps > MAX_STEPS {
            return Err(ConfigError::InvalidStepCount(n_steps));
        }
        Ok(())
    }
}

/// `n` equally spaced points on `[0, end]` with exact end points.
pub(crate) fn linspace(end: f64, n: usize) -> Vec<f64> {
    let last = n.saturating_sub(1).max(1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|i| end * i as f64 / last).collect();
    if let Some(tail) = grid.last_mut() {
        if n > 1 {
            *tail = end;
        }
    }
    grid
}

/// Builder for [`SimulationConfig`].
///
/// Validation happens at [`build`](SimulationConfigBuilder::build).
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    x0: Option<f64>,
    horizon: Option<f64>,
    n_paths: Option<usize>,
    seed: Option<u64>,
    parallel: ParallelConfig,
}

impl SimulationConfigBuilder {
    /// Sets the initial capital.
    #[inline]
    pub fn x0(mut self, x0: f64) -> Self {
        self.x0 = Some(x0);
        self
    }

    /// Sets the horizon in years.
    #[inline]
    pub fn horizon(mut self, horizon: f64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the number of simulation paths.
    #[inline]
    pub fn n_paths(mut self, n_paths: usize) -> Self {
        self.n_paths = Some(n_paths);
        self
    }

    /// Sets the seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the parallel batching configuration.
    #[inline]
    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required field is missing or invalid.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let x0 = self.x0.ok_or(ConfigError::InvalidParameter {
            name: "x0",
            value: "must be specified".to_string(),
        })?;
        let horizon = self.horizon.ok_or(ConfigError::InvalidParameter {
            name: "horizon",
            value: "must be specified".to_string(),
        })?;
        let n_paths = self.n_paths.ok_or(ConfigError::InvalidParameter {
            name: "n_paths",
            value: "must be specified".to_string(),
        })?;

        let config = SimulationConfig {
            x0,
            horizon,
            n_paths,
            seed: self.seed,
            parallel: self.parallel,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base() -> SimulationConfigBuilder {
        SimulationConfig::builder().x0(100.0).horizon(1.0).n_paths(1000)
    }

    #[test]
    fn test_config_builder_valid() {
        let config = base().seed(42).build().unwrap();
        assert_eq!(config.n_paths(), 1000);
        assert_eq!(config.n_steps(), 252);
        assert_eq!(config.seed(), Some(42));
        assert_relative_eq!(config.dt(), 1.0 / 251.0);
        assert_eq!(config.parallel(), &ParallelConfig::default());
    }

    #[test]
    fn test_steps_for_horizon() {
        assert_eq!(steps_for_horizon(1.0), 252);
        assert_eq!(steps_for_horizon(0.5), 126);
        assert_eq!(steps_for_horizon(2.0 / 252.0), 2);
        assert_eq!(steps_for_horizon(1.0 / 252.0), 2);
        assert_eq!(steps_for_horizon(3.0 / 252.0), 3);
    }

    #[test]
    fn test_time_grid_exact_end_points() {
        let config = base().horizon(0.75).build().unwrap();
        let grid = config.time_grid();
        assert_eq!(grid.len(), config.n_steps());
        assert_eq!(grid[0], 0.0);
        assert_eq!(*grid.last().unwrap(), 0.75);
        assert_relative_eq!(grid[1] - grid[0], config.dt(), epsilon = 1e-15);
    }

    #[test]
    fn test_config_invalid_x0() {
        let result = base().x0(0.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "x0", .. })
        ));
        assert!(base().x0(f64::NAN).build().is_err());
    }

    #[test]
    fn test_config_invalid_horizon() {
        assert!(matches!(
            base().horizon(-1.0).build(),
            Err(ConfigError::InvalidParameter {
                name: "horizon",
                ..
            })
        ));
        assert!(matches!(
            base().horizon(1000.0).build(),
            Err(ConfigError::InvalidStepCount(252_000))
        ));
    }

    #[test]
    fn test_config_invalid_paths() {
        assert!(matches!(
            base().n_paths(0).build(),
            Err(ConfigError::InvalidPathCount(0))
        ));
        assert!(matches!(
            base().n_paths(MAX_PATHS + 1).build(),
            Err(ConfigError::InvalidPathCount(_))
        ));
    }

    #[test]
    fn test_config_missing_fields() {
        let result = SimulationConfig::builder().horizon(1.0).n_paths(10).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "x0", .. })
        ));
    }

    #[test]
    fn test_config_error_into_simulation_error() {
        let err: SimulationError = ConfigError::InvalidPathCount(0).into();
        assert!(matches!(err, SimulationError::InvalidInput(ref m) if m.contains("path count 0")));
    }

    #[test]
    fn test_with_n_paths() {
        let config = base().build().unwrap();
        assert_eq!(config.with_n_paths(10).unwrap().n_paths(), 10);
        assert!(config.with_n_paths(0).is_err());
    }

    #[test]
    fn test_parallel_config() {
        let config = ParallelConfig::new(0, 10);
        assert_eq!(config.batch_size, 1);
        assert!(config.should_parallelize(10));
        assert!(!ParallelConfig::serial().should_parallelize(1_000_000));
    }
}

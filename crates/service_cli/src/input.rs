//! Portfolio input files.
//!
//! Inputs are JSON documents of the form
//!
//! ```json
//! {
//!   "mu": [0.10, 0.08],
//!   "sigma": [[0.04, 0.01], [0.01, 0.03]],
//!   "weights": [0.6, 0.4]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_engine::driver::check_flat_shapes;

use crate::error::{CliError, Result};

/// Raw portfolio description as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortfolioInput {
    /// Annual expected returns per asset
    pub mu: Vec<f64>,
    /// Annual covariance matrix, row by row
    pub sigma: Vec<Vec<f64>>,
    /// Portfolio weights, used as given
    pub weights: Vec<f64>,
}

impl PortfolioInput {
    /// Read and parse a JSON input file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        Self::from_json(&content)
    }

    /// Parse a JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Two-asset example portfolio used by `capsim demo`.
    pub fn demo() -> Self {
        Self {
            mu: vec![0.10, 0.08],
            sigma: vec![vec![0.04, 0.01], vec![0.01, 0.03]],
            weights: vec![0.6, 0.4],
        }
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.mu.len()
    }

    /// Validate shapes and values, returning engine types.
    pub fn to_model(&self) -> Result<(AssetParameters, PortfolioWeights)> {
        check_flat_shapes(&self.mu, &self.sigma, &self.weights)?;
        let params = AssetParameters::from_rows(self.mu.clone(), &self.sigma)?;
        let weights = PortfolioWeights::new(self.weights.clone())?;
        Ok((params, weights))
    }
}

//! Asset and portfolio parameter types.

use crate::error::{SimResult, SimulationError};
use crate::math::covariance::CovarianceMatrix;

/// Expected returns and covariance of an asset universe.
///
/// Both quantities are annualised decimal fractions. Expected returns may be
/// negative.
///
/// # Invariants
///
/// - `sigma.dim() == mu.len()`
/// - all entries finite, covariance diagonal non-negative
///
/// # Examples
///
/// ```
/// use sim_core::types::AssetParameters;
///
/// let params = AssetParameters::from_rows(vec![0.07], &[vec![0.04]]).unwrap();
/// assert_eq!(params.n_assets(), 1);
/// assert_eq!(params.volatility(0), 0.2);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetParameters {
    mu: Vec<f64>,
    sigma: CovarianceMatrix,
}

impl AssetParameters {
    /// Create validated asset parameters.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if the covariance dimension differs from `mu.len()`
    /// - `InvalidInput` if any expected return is not finite
    pub fn new(mu: Vec<f64>, sigma: CovarianceMatrix) -> SimResult<Self> {
        if sigma.dim() != mu.len() {
            return Err(SimulationError::shape_mismatch("sigma", mu.len(), sigma.dim()));
        }
        if let Some(i) = mu.iter().position(|m| !m.is_finite()) {
            return Err(SimulationError::invalid_input(format!(
                "expected return of asset {} is not finite",
                i
            )));
        }
        Ok(Self { mu, sigma })
    }

    /// Create asset parameters from nested covariance rows.
    pub fn from_rows(mu: Vec<f64>, sigma: &[Vec<f64>]) -> SimResult<Self> {
        if sigma.len() != mu.len() {
            return Err(SimulationError::shape_mismatch("sigma rows", mu.len(), sigma.len()));
        }
        let sigma = CovarianceMatrix::from_rows(sigma)?;
        Self::new(mu, sigma)
    }

    /// Number of assets.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.mu.len()
    }

    /// Expected annual returns.
    #[inline]
    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    /// Annual covariance matrix.
    #[inline]
    pub fn sigma(&self) -> &CovarianceMatrix {
        &self.sigma
    }

    /// Annual volatility of asset `i`.
    pub fn volatility(&self, i: usize) -> f64 {
        self.sigma.variance(i).sqrt()
    }

    /// Check that `weights` has one entry per asset.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` on a length mismatch. Weights are never truncated or
    /// padded.
    pub fn check_weights(&self, weights: &PortfolioWeights) -> SimResult<()> {
        if weights.len() != self.n_assets() {
            return Err(SimulationError::shape_mismatch(
                "weights",
                self.n_assets(),
                weights.len(),
            ));
        }
        Ok(())
    }

    /// Replace the expected returns, keeping the covariance.
    pub fn with_mu(&self, mu: Vec<f64>) -> SimResult<Self> {
        Self::new(mu, self.sigma.clone())
    }

    /// Replace the covariance, keeping the expected returns.
    pub fn with_sigma(&self, sigma: CovarianceMatrix) -> SimResult<Self> {
        Self::new(self.mu.clone(), sigma)
    }
}

/// Target portfolio weights.
///
/// Weights may be zero or negative (short positions) and need not sum to one.
/// They are used exactly as supplied.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioWeights(Vec<f64>);

impl PortfolioWeights {
    /// Create validated weights.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if empty or any weight is not finite.
    pub fn new(weights: Vec<f64>) -> SimResult<Self> {
        if weights.is_empty() {
            return Err(SimulationError::invalid_input("weights must not be empty"));
        }
        if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
            return Err(SimulationError::invalid_input(format!(
                "weight {} is not finite",
                i
            )));
        }
        Ok(Self(weights))
    }

    /// Number of weights.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for validated weights.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weights as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Net exposure `Σ w_i`.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Gross exposure `Σ |w_i|`.
    pub fn gross_exposure(&self) -> f64 {
        self.0.iter().map(|w| w.abs()).sum()
    }

    /// Dot product with a per-asset vector.
    pub fn dot(&self, other: &[f64]) -> f64 {
        self.0.iter().zip(other).map(|(w, x)| w * x).sum()
    }
}

//! Correlated shock generation.
//!
//! Two routes produce the per-step portfolio shocks:
//!
//! - **Scalar reduction** (default): the portfolio is a 1-D GBM with
//!   `μ_p = w·μ` and `σ_p² = wᵀΣw`, so one standard normal per step suffices.
//! - **Asset level** ([`CorrelatedShockGenerator`]): per-asset correlated
//!   shocks `L z` with `Σ = L Lᵀ`, collapsed per step to `w·(L z) / σ_p`, which
//!   has the same law as the scalar draw.

use sim_core::math::covariance::Factorisation;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_core::SimResult;
use tracing::debug;

use crate::rng::SimRng;

/// Portfolio-level drift and variance.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioMoments {
    /// Expected annual return `w·μ`
    pub mu: f64,
    /// Annual variance `wᵀΣw`
    pub variance: f64,
    /// Annual volatility `sqrt(variance)`
    pub volatility: f64,
}

impl PortfolioMoments {
    /// Moments against the covariance a factorisation actually represents.
    ///
    /// Round-off below zero in the variance is clamped to 0.
    pub fn from_factorisation(
        params: &AssetParameters,
        weights: &PortfolioWeights,
        factorisation: &Factorisation,
    ) -> SimResult<Self> {
        params.check_weights(weights)?;
        let covariance = factorisation.effective_covariance(params.sigma());
        let variance = covariance.quadratic_form(weights.as_slice())?.max(0.0);
        Ok(Self {
            mu: weights.dot(params.mu()),
            variance,
            volatility: variance.sqrt(),
        })
    }
}

/// Reduce asset parameters and weights to portfolio moments.
///
/// The covariance is factorised (and repaired if needed) first so the
/// variance is never negative.
///
/// # Errors
///
/// - `ShapeMismatch` if the weights do not match the asset count
/// - `DegenerateCovariance` if the covariance cannot be repaired
///
/// # Examples
///
/// ```rust
/// use sim_core::types::{AssetParameters, PortfolioWeights};
/// use sim_engine::shocks::portfolio_moments;
///
/// let params = AssetParameters::from_rows(
///     vec![0.10, 0.08],
///     &[vec![0.04, 0.01], vec![0.01, 0.03]],
/// ).unwrap();
/// let weights = PortfolioWeights::new(vec![0.6, 0.4]).unwrap();
///
/// let moments = portfolio_moments(&params, &weights).unwrap();
/// assert!((moments.mu - 0.092).abs() < 1e-12);
/// assert!((moments.variance - 0.024).abs() < 1e-12);
/// ```
pub fn portfolio_moments(
    params: &AssetParameters,
    weights: &PortfolioWeights,
) -> SimResult<PortfolioMoments> {
    params.check_weights(weights)?;
    let factorisation = params.sigma().factorise()?;
    PortfolioMoments::from_factorisation(params, weights, &factorisation)
}

/// Asset-level shock generator.
///
/// Holds the Cholesky factor and weights; draws are consumed from the caller's
/// RNG one i.i.d. vector of length N per step.
#[derive(Clone, Debug)]
pub struct CorrelatedShockGenerator {
    factorisation: Factorisation,
    weights: Vec<f64>,
    moments: PortfolioMoments,
}

impl CorrelatedShockGenerator {
    /// Factorise the covariance and prepare the generator.
    ///
    /// # Errors
    ///
    /// As for [`portfolio_moments`].
    pub fn new(params: &AssetParameters, weights: &PortfolioWeights) -> SimResult<Self> {
        params.check_weights(weights)?;
        let factorisation = params.sigma().factorise()?;
        let moments = PortfolioMoments::from_factorisation(params, weights, &factorisation)?;
        debug!(
            n_assets = params.n_assets(),
            repaired = factorisation.is_repaired(),
            port_vol = moments.volatility,
            "Prepared correlated shock generator"
        );
        Ok(Self {
            factorisation,
            weights: weights.as_slice().to_vec(),
            moments,
        })
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.weights.len()
    }

    /// Portfolio moments under the factorised covariance.
    pub fn moments(&self) -> &PortfolioMoments {
        &self.moments
    }

    /// The underlying factorisation.
    pub fn factorisation(&self) -> &Factorisation {
        &self.factorisation
    }

    /// Map independent normals `z` to correlated annual-scale shocks `L z`.
    pub fn correlate(&self, z: &[f64], out: &mut [f64]) {
        self.factorisation.factor().transform_into(z, out);
    }

    /// Collapse correlated asset shocks to a standard normal portfolio shock.
    ///
    /// Returns 0.0 for a zero-volatility portfolio.
    pub fn collapse(&self, asset_shocks: &[f64]) -> f64 {
        if self.moments.volatility > 0.0 {
            let projected: f64 = self
                .weights
                .iter()
                .zip(asset_shocks)
                .map(|(w, s)| w * s)
                .sum();
            projected / self.moments.volatility
        } else {
            0.0
        }
    }

    /// Draw one step: fills `asset_shocks` with `L z` and returns the
    /// portfolio shock.
    ///
    /// `scratch` must have length N; it receives the raw independent normals.
    pub fn draw_step(&self, rng: &mut SimRng, scratch: &mut [f64], asset_shocks: &mut [f64]) -> f64 {
        rng.fill_normal(scratch);
        self.correlate(scratch, asset_shocks);
        self.collapse(asset_shocks)
    }
}

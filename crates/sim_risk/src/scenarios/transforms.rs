//! Parameter transforms for stress testing.
//!
//! Each transform is a pure function returning new validated parameters.

use sim_core::types::AssetParameters;
use sim_core::{SimResult, SimulationError};

/// Scale the covariance matrix by `k` (`Σ ← k Σ`).
///
/// # Errors
///
/// `InvalidInput` if `k` is negative or not finite.
///
/// # Examples
///
/// ```rust
/// use sim_core::types::AssetParameters;
/// use sim_risk::scenarios::vol_shock;
///
/// let params = AssetParameters::from_rows(vec![0.1], &[vec![0.04]]).unwrap();
/// let shocked = vol_shock(&params, 1.5).unwrap();
/// assert!((shocked.sigma().get(0, 0) - 0.06).abs() < 1e-15);
/// ```
pub fn vol_shock(params: &AssetParameters, k: f64) -> SimResult<AssetParameters> {
    params.with_sigma(params.sigma().scaled(k)?)
}

/// Replace every pairwise correlation with `rho`, keeping variances.
///
/// # Errors
///
/// `InvalidInput` if `rho` lies outside `[-1, 1]`.
pub fn corr_shock(params: &AssetParameters, rho: f64) -> SimResult<AssetParameters> {
    params.with_sigma(params.sigma().with_constant_correlation(rho)?)
}

/// Scale expected returns by `k` (`μ ← k μ`).
///
/// # Errors
///
/// `InvalidInput` if `k` is not finite.
pub fn drift_shock(params: &AssetParameters, k: f64) -> SimResult<AssetParameters> {
    if !k.is_finite() {
        return Err(SimulationError::invalid_input(format!(
            "drift multiplier must be finite, got {}",
            k
        )));
    }
    params.with_mu(params.mu().iter().map(|m| m * k).collect())
}

/// Volatility shock followed by correlation shock.
pub fn combined(params: &AssetParameters, k: f64, rho: f64) -> SimResult<AssetParameters> {
    corr_shock(&vol_shock(params, k)?, rho)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> AssetParameters {
        AssetParameters::from_rows(vec![0.10, 0.08], &[vec![0.04, 0.01], vec![0.01, 0.03]])
            .unwrap()
    }

    #[test]
    fn test_vol_shock_scales_all_entries() {
        let shocked = vol_shock(&params(), 1.5).unwrap();
        assert_relative_eq!(shocked.sigma().get(0, 0), 0.06, epsilon = 1e-15);
        assert_relative_eq!(shocked.sigma().get(0, 1), 0.015, epsilon = 1e-15);
        assert_eq!(shocked.mu(), params().mu());
        assert!(vol_shock(&params(), f64::NAN).is_err());
    }

    #[test]
    fn test_corr_shock_preserves_diagonal() {
        let shocked = corr_shock(&params(), 0.9).unwrap();
        assert_eq!(shocked.sigma().get(0, 0), 0.04);
        assert_eq!(shocked.sigma().get(1, 1), 0.03);
        assert_relative_eq!(
            shocked.sigma().get(0, 1),
            0.9 * (0.04_f64 * 0.03).sqrt(),
            epsilon = 1e-15
        );
        assert!(corr_shock(&params(), -1.1).is_err());
    }

    #[test]
    fn test_drift_shock() {
        let shocked = drift_shock(&params(), 0.5).unwrap();
        assert_relative_eq!(shocked.mu()[0], 0.05);
        assert_relative_eq!(shocked.mu()[1], 0.04);
        assert_eq!(shocked.sigma(), params().sigma());
    }

    #[test]
    fn test_combined_order() {
        let c = combined(&params(), 1.5, 0.9).unwrap();
        assert_relative_eq!(c.sigma().get(0, 0), 0.06, epsilon = 1e-15);
        assert_relative_eq!(
            c.sigma().correlation(0, 1),
            0.9,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            c.sigma().get(0, 1),
            0.9 * (0.06_f64 * 0.045).sqrt(),
            epsilon = 1e-15
        );
    }
}

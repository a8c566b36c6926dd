//! Integration tests for the public surface of sim_core.

use approx::assert_relative_eq;
use proptest::prelude::*;
use sim_core::context::SimulationContext;
use sim_core::math::covariance::{CovarianceMatrix, Factorisation, RepairMethod};
use sim_core::math::stats::Moments;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_core::{ErrorClass, SimulationError};

#[test]
fn test_reexports_compile() {
    let err: SimulationError = SimulationError::Cancelled;
    assert_eq!(err.class(), ErrorClass::Interrupted);
    let _ctx = SimulationContext::default();
    let _m = Moments::from_samples(&[1.0, 2.0]);
}

#[test]
fn test_portfolio_variance_from_params() {
    let params =
        AssetParameters::from_rows(vec![0.10, 0.08], &[vec![0.04, 0.01], vec![0.01, 0.03]])
            .unwrap();
    let weights = PortfolioWeights::new(vec![0.6, 0.4]).unwrap();
    params.check_weights(&weights).unwrap();

    let port_mu = weights.dot(params.mu());
    let port_var = params.sigma().quadratic_form(weights.as_slice()).unwrap();
    assert_relative_eq!(port_mu, 0.092, epsilon = 1e-12);
    assert_relative_eq!(port_var, 0.024, epsilon = 1e-12);
}

#[test]
fn test_repair_falls_back_to_diagonal_shift_or_floor() {
    // Strongly indefinite: eigenvalues 1 + 2 and 1 - 2
    let cov = CovarianceMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
    let factorisation = cov.factorise().unwrap();
    match factorisation {
        Factorisation::Repaired {
            method,
            min_eigenvalue,
            ..
        } => {
            assert!(matches!(
                method,
                RepairMethod::EigenvalueFloor | RepairMethod::DiagonalShift
            ));
            assert_relative_eq!(min_eigenvalue, -1.0, epsilon = 1e-10);
        }
        Factorisation::Exact(_) => panic!("Expected repair"),
    }
}

fn random_psd(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0f64..1.0, n * n).prop_map(move |a| {
        // A Aᵀ is PSD by construction
        let mut out = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                out[i * n + j] = (0..n).map(|k| a[i * n + k] * a[j * n + k]).sum::<f64>();
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                out[j * n + i] = out[i * n + j];
            }
        }
        out
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_factor_is_finite_and_reconstructs(data in random_psd(4)) {
        let cov = CovarianceMatrix::new(&data, 4).unwrap();
        let factorisation = cov.factorise().unwrap();
        let effective = factorisation.effective_covariance(&cov);
        let rebuilt = factorisation.factor().reconstruct();
        for (a, b) in rebuilt.iter().zip(effective.as_slice()) {
            prop_assert!(a.is_finite());
            prop_assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_quadratic_form_non_negative_for_psd(
        data in random_psd(3),
        w in prop::collection::vec(-2.0f64..2.0, 3),
    ) {
        let cov = CovarianceMatrix::new(&data, 3).unwrap();
        prop_assert!(cov.quadratic_form(&w).unwrap() >= -1e-9);
    }
}

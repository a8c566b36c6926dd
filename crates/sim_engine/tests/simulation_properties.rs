//! Integration tests for portfolio path simulation.
//!
//! Covers reproducibility, the capital floor, the initial condition, the
//! scalar reduction for a single asset and the two-asset reference run.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use proptest::prelude::*;
use sim_core::context::SimulationContext;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_core::SimulationError;
use sim_engine::config::{ParallelConfig, SimulationConfig};
use sim_engine::driver::{simulate, simulate_portfolio, simulate_with_assets};
use sim_engine::paths::{integrate_path, GbmStep, CAPITAL_FLOOR};
use sim_engine::rng::SimRng;

fn reference_inputs() -> (Vec<f64>, Vec<Vec<f64>>, Vec<f64>) {
    (
        vec![0.10, 0.08],
        vec![vec![0.04, 0.01], vec![0.01, 0.03]],
        vec![0.6, 0.4],
    )
}

#[test]
fn test_reference_run_reproducible() {
    let (mu, sigma, w) = reference_inputs();
    let a = simulate_portfolio(&mu, &sigma, &w, 1e6, 1.0, 5000, 42).unwrap();
    let b = simulate_portfolio(&mu, &sigma, &w, 1e6, 1.0, 5000, 42).unwrap();

    assert_eq!(a.n_paths(), 5000);
    assert_eq!(a.n_steps(), 252);
    assert_eq!(a.as_slice(), b.as_slice());
    assert_eq!(a.time_grid(), b.time_grid());
    assert!(a.column(0).iter().all(|&x| x == 1e6));

    // E[X_T] = x0 · exp(w·μ · T) = 1e6 · exp(0.092)
    let terminal = a.terminal_values();
    let mean = terminal.iter().sum::<f64>() / terminal.len() as f64;
    assert_relative_eq!(mean, 1e6 * 0.092_f64.exp(), max_relative = 0.02);
}

#[test]
fn test_reference_run_pinned_mean() {
    let (mu, sigma, w) = reference_inputs();
    let ensemble = simulate_portfolio(&mu, &sigma, &w, 1e6, 1.0, 5000, 42).unwrap();
    let terminal = ensemble.terminal_values();
    let mean = terminal.iter().sum::<f64>() / terminal.len() as f64;
    assert_abs_diff_eq!(mean, 1_096_770.858082, epsilon = 1e-3);
}

#[test]
fn test_different_seed_differs() {
    let (mu, sigma, w) = reference_inputs();
    let a = simulate_portfolio(&mu, &sigma, &w, 1e6, 1.0, 100, 42).unwrap();
    let b = simulate_portfolio(&mu, &sigma, &w, 1e6, 1.0, 100, 43).unwrap();
    assert_ne!(a.as_slice(), b.as_slice());
}

#[test]
fn test_shape_mismatch_is_reported() {
    let (mu, sigma, _) = reference_inputs();
    let err = simulate_portfolio(&mu, &sigma, &[1.0], 1e6, 1.0, 10, 42).unwrap_err();
    assert_eq!(err, SimulationError::shape_mismatch("weights", 2, 1));
}

#[test]
fn test_invalid_scalars_rejected() {
    let (mu, sigma, w) = reference_inputs();
    assert!(matches!(
        simulate_portfolio(&mu, &sigma, &w, -1.0, 1.0, 10, 42),
        Err(SimulationError::InvalidInput(_))
    ));
    assert!(matches!(
        simulate_portfolio(&mu, &sigma, &w, 1.0, 0.0, 10, 42),
        Err(SimulationError::InvalidInput(_))
    ));
    assert!(matches!(
        simulate_portfolio(&mu, &sigma, &w, 1.0, 1.0, 0, 42),
        Err(SimulationError::InvalidInput(_))
    ));
}

#[test]
fn test_single_asset_matches_scalar_gbm() {
    let (mu, var, x0, horizon, n_paths, seed) = (0.07, 0.09, 250.0, 0.5, 64, 9_u64);
    let ensemble =
        simulate_portfolio(&[mu], &[vec![var]], &[1.0], x0, horizon, n_paths, seed).unwrap();

    let n_steps = ensemble.n_steps();
    let dt = horizon / (n_steps - 1) as f64;
    let step = GbmStep::new(mu, var, dt);
    let mut rng = SimRng::from_seed(seed);
    let mut shocks = vec![0.0; n_steps - 1];
    let mut row = vec![0.0; n_steps];

    for p in 0..n_paths {
        rng.fill_normal(&mut shocks);
        integrate_path(&mut row, &shocks, x0, &step);
        assert_eq!(ensemble.path(p), &row[..]);
    }
}

#[test]
fn test_single_asset_trajectory_tracks_portfolio() {
    let params = AssetParameters::from_rows(vec![0.05], &[vec![0.04]]).unwrap();
    let weights = PortfolioWeights::new(vec![1.0]).unwrap();
    let config = SimulationConfig::builder()
        .x0(100.0)
        .horizon(0.25)
        .n_paths(20)
        .seed(3)
        .build()
        .unwrap();
    let (portfolio, assets) =
        simulate_with_assets(&params, &weights, &config, &SimulationContext::default()).unwrap();

    for p in 0..20 {
        for (x, idx) in portfolio.path(p).iter().zip(assets.path(0, p)) {
            assert_relative_eq!(*x, 100.0 * idx, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_extreme_volatility_respects_floor() {
    let ensemble = simulate_portfolio(&[-2.0], &[vec![25.0]], &[1.0], 1.0, 2.0, 200, 5).unwrap();
    assert!(ensemble.as_slice().iter().all(|&x| x >= CAPITAL_FLOOR));
    assert!(ensemble.terminal_values().iter().any(|&x| x == CAPITAL_FLOOR));
}

#[test]
fn test_non_psd_covariance_is_repaired_and_simulated() {
    let sigma = vec![
        vec![1.0, 0.9, 0.9],
        vec![0.9, 1.0, -0.9],
        vec![0.9, -0.9, 1.0],
    ];
    let ensemble =
        simulate_portfolio(&[0.05, 0.05, 0.05], &sigma, &[0.4, 0.3, 0.3], 1.0, 0.5, 100, 1)
            .unwrap();
    assert!(ensemble.as_slice().iter().all(|x| x.is_finite()));
}

#[test]
fn test_thread_count_does_not_change_result() {
    let (mu, sigma, w) = reference_inputs();
    let params = AssetParameters::from_rows(mu, &sigma).unwrap();
    let weights = PortfolioWeights::new(w).unwrap();
    let build = |parallel: ParallelConfig| {
        SimulationConfig::builder()
            .x0(1e6)
            .horizon(1.0)
            .n_paths(2_000)
            .seed(42)
            .parallel(parallel)
            .build()
            .unwrap()
    };
    let ctx = SimulationContext::default();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let single = pool
        .install(|| simulate(&params, &weights, &build(ParallelConfig::new(16, 1)), &ctx))
        .unwrap();
    let many = simulate(&params, &weights, &build(ParallelConfig::new(3, 1)), &ctx).unwrap();
    assert_eq!(single.as_slice(), many.as_slice());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_floor_and_initial_condition(
        mu in -1.0f64..1.0,
        vol in 0.0f64..2.0,
        x0 in 1e-3f64..1e7,
        seed in any::<u64>(),
    ) {
        let e = simulate_portfolio(&[mu], &[vec![vol * vol]], &[1.0], x0, 0.2, 16, seed).unwrap();
        prop_assert!(e.column(0).iter().all(|&x| x == x0));
        prop_assert!(e.as_slice().iter().all(|&x| x >= CAPITAL_FLOOR));
    }
}

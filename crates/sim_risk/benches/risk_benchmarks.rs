//! Criterion benchmarks for sim_risk analytics and stress runs.
//!
//! Benchmarks cover:
//! - Full risk report generation across ensemble sizes
//! - Stress scenario execution with varying thread counts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sim_core::context::SimulationContext;
use sim_core::types::{AssetParameters, PortfolioWeights};
use sim_engine::config::SimulationConfig;
use sim_engine::driver::simulate_portfolio;
use sim_risk::analytics::{analyze, AnalyticsConfig};
use sim_risk::scenarios::{run_scenarios, StressConfig};

fn params() -> (AssetParameters, PortfolioWeights) {
    (
        AssetParameters::from_rows(vec![0.10, 0.08], &[vec![0.04, 0.01], vec![0.01, 0.03]])
            .unwrap(),
        PortfolioWeights::new(vec![0.6, 0.4]).unwrap(),
    )
}

/// Benchmark risk report generation.
fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    group.sample_size(20);

    let config = AnalyticsConfig::default();
    let ctx = SimulationContext::default();

    for n_paths in [1_000, 10_000] {
        let ensemble = simulate_portfolio(
            &[0.10, 0.08],
            &[vec![0.04, 0.01], vec![0.01, 0.03]],
            &[0.6, 0.4],
            1e6,
            1.0,
            n_paths,
            42,
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("paths", n_paths), &ensemble, |b, e| {
            b.iter(|| analyze(black_box(e), 1e6, &config, &ctx));
        });
    }

    group.finish();
}

/// Benchmark stress runs by thread count.
fn bench_stress(c: &mut Criterion) {
    let mut group = c.benchmark_group("stress_scenarios");
    group.sample_size(10);

    let (params, weights) = params();
    let sim_config = SimulationConfig::builder()
        .x0(1e6)
        .horizon(1.0)
        .n_paths(2_000)
        .seed(42)
        .build()
        .unwrap();
    let analytics = AnalyticsConfig::default();
    let ctx = SimulationContext::default();

    for threads in [1, 4] {
        let stress = StressConfig {
            threads,
            ..StressConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("threads", threads), &stress, |b, stress| {
            b.iter(|| run_scenarios(&params, &weights, &sim_config, &analytics, stress, &ctx));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_stress);
criterion_main!(benches);

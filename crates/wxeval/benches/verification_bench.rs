//! Benchmarks for verification performance.
//!
//! Run with: cargo bench --bench verification_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use wxeval::prelude::*;

/// Create synthetic forecasts for benchmarking.
fn create_synthetic_forecasts(n_samples: usize) -> ForecastSet {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let mut probabilities = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let p: f64 = rng.gen();
        probabilities.push(p);
        labels.push(u8::from(rng.gen::<f64>() < p));
    }

    ForecastSet::new(probabilities, labels).unwrap()
}

fn bench_roc_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("roc_curve");

    for n_samples in [1_000, 10_000, 100_000].iter() {
        let set = create_synthetic_forecasts(*n_samples);

        group.bench_with_input(BenchmarkId::new("unique", n_samples), n_samples, |b, _| {
            b.iter(|| {
                let roc =
                    get_points_in_roc_curve(black_box(&set), &ThresholdArg::unique()).unwrap();
                black_box(roc.area_under_curve())
            })
        });

        group.bench_with_input(BenchmarkId::new("count_101", n_samples), n_samples, |b, _| {
            b.iter(|| {
                black_box(
                    get_points_in_roc_curve(black_box(&set), &ThresholdArg::Count(101)).unwrap(),
                )
            })
        });
    }

    group.finish();
}

fn bench_reliability_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("reliability_curve");

    for n_samples in [1_000, 100_000].iter() {
        let set = create_synthetic_forecasts(*n_samples);

        group.bench_with_input(BenchmarkId::new("20_bins", n_samples), n_samples, |b, _| {
            b.iter(|| {
                let curve = get_points_in_reliability_curve(black_box(&set), 20).unwrap();
                black_box(curve.brier_decomposition(set.climatology()).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap");
    group.sample_size(10);

    let set = create_synthetic_forecasts(10_000);
    let thresholds = ThresholdArg::Count(101);

    for parallel in [false, true] {
        let config = BootstrapConfig::default()
            .with_num_iters(100)
            .with_seed(Seed::new(7))
            .with_parallel(parallel);
        let name = if parallel { "parallel" } else { "sequential" };

        group.bench_function(BenchmarkId::new("roc", name), |b| {
            b.iter(|| {
                black_box(bootstrap_roc_curve(black_box(&set), &thresholds, &config).unwrap())
            })
        });

        group.bench_function(BenchmarkId::new("reliability", name), |b| {
            b.iter(|| black_box(bootstrap_reliability_curve(black_box(&set), 20, &config).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_roc_curve, bench_reliability_curve, bench_bootstrap,);
criterion_main!(benches);

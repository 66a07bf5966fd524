//! Resampling benchmarks.
//!
//! Run with: `cargo bench --package cambista-bench`

use cambista_aggregate::{
    AggregationConfig, BetaPolicy, EstimatorMode, Resampler, filter_outliers,
};
use cambista_bench::{Fixture, epoch};
use cambista_format::{Formatter, ParquetFormatter};
use cambista_types::Frequency;
use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn resample_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let estimators = [
        ("naive", EstimatorMode::Naive),
        ("weighted", EstimatorMode::Weighted(BetaPolicy::default())),
    ];

    for size in SIZES {
        let adverts = Fixture::new(size).build();
        let now = epoch() + TimeDelta::days(365);
        group.throughput(Throughput::Elements(size as u64));

        for (name, estimator) in estimators {
            let config = AggregationConfig::new(Frequency::Hour1).with_estimator(estimator);
            let resampler = Resampler::new(config).expect("valid estimator");
            group.bench_with_input(BenchmarkId::new(name, size), &adverts, |b, adverts| {
                b.iter(|| resampler.run(black_box(adverts), now));
            });
        }
    }

    group.finish();
}

fn outlier_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("outlier_filter");

    for size in SIZES {
        let adverts = Fixture::new(size).build();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &adverts, |b, adverts| {
            b.iter(|| filter_outliers(black_box(adverts.clone())));
        });
    }

    group.finish();
}

fn parquet_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parquet_write");
    let formatter = ParquetFormatter::new();

    for size in SIZES {
        let adverts = Fixture::new(size).build();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &adverts, |b, adverts| {
            b.iter(|| {
                let mut out = Vec::new();
                formatter
                    .write_adverts(black_box(adverts), &mut out)
                    .expect("parquet write");
                out
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    resample_benchmark,
    outlier_benchmark,
    parquet_benchmark
);
criterion_main!(benches);

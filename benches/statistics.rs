//! Benchmarks for percentile and range statistics

#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use distribution_prompts::stats::{INTERMEDIATE_PERCENTILES, PERCENTILES, PROBABILITIES};
use distribution_prompts::{DistributionSpec, Family, ParameterSet, SortedSample};

fn normal_sample(size: usize) -> Vec<f64> {
    let spec = DistributionSpec::new(
        Family::Normal,
        ParameterSet::new().with("mean", 100).with("std", 10),
    )
    .with_sample_size(size);
    match spec.draw() {
        Ok(distribution_prompts::OutcomeSet::Single(values)) => values,
        _ => (0..size).map(|i| i as f64).collect(),
    }
}

fn benchmark_percentiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentiles");

    for size in &[1_000, 10_000, 100_000] {
        let sample = normal_sample(*size);

        group.bench_function(format!("sort_and_percentiles_{size}"), |b| {
            b.iter(|| {
                let sorted = SortedSample::from_slice(black_box(&sample));
                (
                    sorted.percentile_values(&PERCENTILES),
                    sorted.percentile_values(&INTERMEDIATE_PERCENTILES),
                )
            });
        });
    }

    group.finish();
}

fn benchmark_target_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_ranges");

    for size in &[1_000, 10_000, 100_000] {
        let sorted = SortedSample::new(normal_sample(*size));

        group.bench_function(format!("ranges_{size}"), |b| {
            b.iter(|| black_box(&sorted).target_ranges(&PROBABILITIES));
        });
    }

    group.finish();
}

fn benchmark_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    group.sample_size(20);

    for family in [Family::Normal, Family::Poisson, Family::Multinomial] {
        let params = distribution_prompts::config::default_questions()
            .into_iter()
            .find(|q| q.family == family)
            .map(|q| q.params)
            .unwrap_or_default();
        let spec = DistributionSpec::new(family, params).with_sample_size(100_000);

        group.bench_function(format!("draw_{family}"), |b| {
            b.iter(|| black_box(&spec).draw());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_percentiles,
    benchmark_target_ranges,
    benchmark_sampling
);
criterion_main!(benches);

//! Throughput of the reproducible reductions against plain loops.
//!
//! The point of the design is that the deposit cascade costs a small
//! constant factor over a naive accumulation; these benches keep that
//! honest for the two hot kernels.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use reprosum::{ddot, dsum};

fn inputs(n: usize) -> Vec<f64> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xB1A5);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

pub fn bench_sum(c: &mut Criterion) {
    let xs = inputs(1 << 16);
    c.bench_function("sum 65536 naive", |b| {
        b.iter(|| black_box(&xs).iter().sum::<f64>())
    });
    c.bench_function("sum 65536 reproducible", |b| {
        b.iter(|| dsum(xs.len(), black_box(&xs), 1))
    });
}

pub fn bench_dot(c: &mut Criterion) {
    let xs = inputs(1 << 16);
    let ys = inputs(1 << 16);
    c.bench_function("dot 65536 naive", |b| {
        b.iter(|| {
            black_box(&xs)
                .iter()
                .zip(black_box(&ys).iter())
                .map(|(x, y)| x * y)
                .sum::<f64>()
        })
    });
    c.bench_function("dot 65536 reproducible", |b| {
        b.iter(|| ddot(xs.len(), black_box(&xs), 1, black_box(&ys), 1))
    });
}

criterion_group!(benches, bench_sum, bench_dot);
criterion_main!(benches);

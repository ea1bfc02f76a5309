//! Criterion benchmarks for tidelock-curve.
//!
//! Covers: rate lookup inside and after the lock, and yield computation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tidelock_core::constants::{COIN, SECONDS_PER_DAY};
use tidelock_core::traits::YieldCurve;
use tidelock_curve::LinearDecayCurve;

fn semi_annual() -> LinearDecayCurve {
    LinearDecayCurve::new(45, 25, 180 * SECONDS_PER_DAY).expect("valid curve")
}

fn bench_rate_at(c: &mut Criterion) {
    let curve = semi_annual();

    c.bench_function("rate_at_mid_lock", |b| {
        b.iter(|| curve.rate_at(black_box(90 * SECONDS_PER_DAY)))
    });
    c.bench_function("rate_at_after_lock", |b| {
        b.iter(|| curve.rate_at(black_box(400 * SECONDS_PER_DAY)))
    });
}

fn bench_yield_for(c: &mut Criterion) {
    let curve = semi_annual();
    let principal = 1_000_000 * COIN;

    c.bench_function("yield_for_30_days", |b| {
        b.iter(|| {
            curve.yield_for(
                black_box(principal),
                black_box(45),
                black_box(30 * SECONDS_PER_DAY),
            )
        })
    });
}

criterion_group!(benches, bench_rate_at, bench_yield_for);
criterion_main!(benches);

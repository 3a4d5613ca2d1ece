//! Propagation benchmarks: wide fan-out from one signal and deep chains of
//! computeds.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::reactive::{create_computed, Computed, Effect, Signal};

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [1usize, 16, 256] {
        let source = Signal::new(0u64);
        let effects: Vec<Effect> = (0..width)
            .map(|_| {
                let source = source.clone();
                Effect::new(move || {
                    black_box(source.get());
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                source.set(next);
            });
        });
        drop(effects);
    }
    group.finish();
}

fn chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for depth in [1usize, 16, 128] {
        let source = Signal::new(0u64);
        let mut tail: Computed<u64> = {
            let source = source.clone();
            create_computed(move || source.get())
        };
        for _ in 1..depth {
            let previous = tail.clone();
            tail = create_computed(move || previous.get() + 1);
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                source.set(next);
                black_box(tail.get())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, fan_out, chain);
criterion_main!(benches);

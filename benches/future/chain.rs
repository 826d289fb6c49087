//! # Chain — fulfilment fan-out cost
//!
//! **Scenario**: a producer fulfils once and the result flows through a
//! chain of transforms on the fulfilling thread.
//!
//! The depth sweep shows the per-continuation overhead: one heap-allocated
//! descriptor plus one lock-free push per link, and one LIFO drain at
//! fulfilment.

use std::hint::black_box;

use criterion::{Criterion, criterion_group};
use presto::{InlineExecutor, Promise, spawn};

pub fn chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");
    for depth in [1usize, 8, 64] {
        group.bench_function(format!("map_x{depth}"), |b| {
            b.iter(|| {
                let mut p = Promise::<u64>::new();
                let mut f = p.get_future().unwrap();
                for _ in 0..depth {
                    f = f.map(|x| x + 1);
                }
                p.set_value(black_box(0));
                f.get().unwrap()
            })
        });
    }
    group.finish();
}

pub fn roundtrip(c: &mut Criterion) {
    c.bench_function("promise_roundtrip", |b| {
        b.iter(|| {
            let mut p = Promise::<u64>::new();
            let f = p.get_future().unwrap();
            p.set_value(black_box(1));
            f.get().unwrap()
        })
    });
    c.bench_function("spawn_inline", |b| {
        b.iter(|| spawn(&InlineExecutor, || black_box(1u64)).get().unwrap())
    });
}

criterion_group!(benches, chain_depth, roundtrip);

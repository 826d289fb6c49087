//! # Compose — fan-in cost of `when_all` / `when_any`
//!
//! **Scenario**: N already-ready inputs are gathered into one future; the
//! whole subscription, arming and claim sequence runs on the calling
//! thread, so the numbers isolate the composition overhead itself.

use std::hint::black_box;

use criterion::{Criterion, criterion_group};
use presto::{Future, when_all, when_any};

pub fn fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in");
    for width in [2usize, 16, 128] {
        group.bench_function(format!("when_all_x{width}"), |b| {
            b.iter(|| {
                let inputs: Vec<_> = (0..width as u64).map(|i| Future::ready(black_box(i))).collect();
                when_all(inputs).get().unwrap().len()
            })
        });
        group.bench_function(format!("when_any_x{width}"), |b| {
            b.iter(|| {
                let inputs: Vec<_> = (0..width as u64).map(|i| Future::ready(black_box(i))).collect();
                when_any(inputs).get().unwrap().index
            })
        });
    }
    group.finish();
}

criterion_group!(benches, fan_in);

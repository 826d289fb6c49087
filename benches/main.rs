mod future {
    pub mod chain;
    pub mod compose;
}

criterion::criterion_main!(future::chain::benches, future::compose::benches);

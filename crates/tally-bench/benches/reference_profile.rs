//! Criterion benchmarks for the reference session.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tally_bench::{reference_session, REFERENCE_ENTITIES};
use tally_core::IterationInfo;

fn bench_time_step(c: &mut Criterion) {
    let mut session = reference_session(42).unwrap();
    let mut time = 0;
    c.bench_function("time_step_10_inner", |b| {
        b.iter(|| {
            for inner in 0..10 {
                let r = session
                    .record_iteration(IterationInfo {
                        time,
                        outer: 0,
                        inner,
                    })
                    .unwrap();
                black_box(r);
            }
            time += 1;
        });
    });
}

fn bench_volume_10k(c: &mut Criterion) {
    let mut session = reference_session(42).unwrap();
    session.record_iteration(IterationInfo::default()).unwrap();
    c.bench_function("collect_volume_10k", |b| {
        b.iter(|| {
            session.collect_volume(REFERENCE_ENTITIES, &[]).unwrap();
        });
    });
    black_box(session.metrics());
}

criterion_group!(benches, bench_time_step, bench_volume_10k);
criterion_main!(benches);

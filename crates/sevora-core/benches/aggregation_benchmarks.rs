//! Aggregation benchmarks.
//!
//! Measures the median over quorum-sized inputs and a full
//! open/submit/finalize cycle through the oracle's locks.

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sevora_core::{
    AggregationSettings, Oracle, Principal, RecordingSink, RequestId, Thresholds, median,
};

fn bench_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate/median");

    for n in [1usize, 3, 7, 31, 101] {
        let values: Vec<u16> = (0..n)
            .map(|i| u16::try_from((i * 7919) % 65_521).unwrap_or(u16::MAX))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| median(black_box(values)));
        });
    }

    group.finish();
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle/cycle");

    for quorum in [1u32, 3, 7] {
        let admin = Principal::new("ops");
        let settings =
            AggregationSettings::new(quorum, Thresholds::new(20, 100).unwrap()).unwrap();
        let oracle = Oracle::new(admin.clone(), settings, Arc::new(RecordingSink::new())).unwrap();
        let sources: Vec<Principal> = (0..quorum)
            .map(|i| Principal::new(format!("station-{i}")))
            .collect();
        for source in &sources {
            oracle.set_source(&admin, source.clone(), true).unwrap();
        }

        let mut next = 0u64;
        group.bench_with_input(BenchmarkId::from_parameter(quorum), &sources, |b, sources| {
            b.iter(|| {
                next += 1;
                let id = RequestId::new(next);
                oracle.open(id, "bench");
                for (i, source) in sources.iter().enumerate() {
                    oracle
                        .submit(id, source, u16::try_from(i * 10).unwrap_or(0))
                        .unwrap();
                }
                black_box(oracle.finalize(id).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_median, bench_cycle);
criterion_main!(benches);

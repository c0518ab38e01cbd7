use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use std::time::Duration;

use chgdet_core::ChannelKind;
use chgdet_response::{extract, response_stats};

/// 31 Hz dF/F trace of `minutes` length with one event every 8 s.
fn synthetic_trace(minutes: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = minutes * 60 * 31;
    let t: Vec<f64> = (0..n).map(|i| i as f64 / 31.0).collect();
    let v: Vec<f64> = t.iter().map(|x| (x * 1.3).sin() * 0.2 + (x % 8.0 < 1.0) as u8 as f64).collect();
    let events: Vec<f64> = (1..minutes * 60 / 8).map(|k| k as f64 * 8.0).collect();
    (t, v, events)
}

pub fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    for minutes in [10usize, 60] {
        let (t, v, events) = synthetic_trace(minutes);
        group.bench_with_input(BenchmarkId::from_parameter(minutes), &events, |b, events| {
            b.iter(|| {
                for &e in events {
                    if let Ok(x) = extract(black_box(&v), &t, e, (-4.0, 4.0), 31.0) {
                        black_box(response_stats(&x.trace, -4.0, 0.5, 31.0, ChannelKind::Continuous));
                    }
                }
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_extract
}
criterion_main!(benches);

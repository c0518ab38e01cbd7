use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use std::time::Duration;

use chgdet_core::EncoderSample;
use chgdet_encoder::{optimize_knot_factor, process_encoder, EncoderConfig};

/// One minute of 60 Hz encoder data with a slowly varying running speed.
fn synthetic_run(seconds: usize) -> Vec<EncoderSample> {
    (0..seconds * 60)
        .map(|i| {
            let t = i as f64 / 60.0;
            let v = 0.5 + 1.5 * t + 0.3 * (t * 0.7).sin();
            EncoderSample::new(t, v.rem_euclid(5.0), 5.0)
        })
        .collect()
}

pub fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_encoder");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    let cfg = EncoderConfig::default();
    for minutes in [1usize, 10] {
        let samples = synthetic_run(minutes * 60);
        group.bench_with_input(BenchmarkId::from_parameter(minutes), &samples, |b, s| {
            b.iter(|| black_box(process_encoder(black_box(s), &cfg)))
        });
    }
    group.finish();
}

pub fn bench_knot_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("knot_search");
    group.sample_size(10);
    let samples = synthetic_run(60);
    let cfg = EncoderConfig {
        knot_factors: 1..20,
        ..Default::default()
    };
    group.bench_function("one_minute_f1_19", |b| {
        b.iter(|| black_box(optimize_knot_factor(black_box(&samples), &cfg)))
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench_process, bench_knot_search
}
criterion_main!(benches);

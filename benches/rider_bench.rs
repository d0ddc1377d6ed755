use std::hint::black_box;
use std::time::Duration;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use fft_rider::bench::{BenchmarkOptions, Resolved};
use fft_rider::buffers::{allocate_host, synthesize_input};
use fft_rider::engine::{ExecBuffers, FftEngine, PlanDescription};
use fft_rider::host::HostEngine;
use fft_rider::layout::resolve;
use fft_rider::{Placement, RequestedTransform, TransformKind};

/// Transform lengths swept by every benchmark group.
const SIZES: &[usize] = &[64, 256, 1_024, 4_096];

// ── Host engine execution ────────────────────────────────────────────────────

/// Measures a single out-of-place execution on the host engine.
///
/// The plan is created once outside the loop; `iter_batched` rebuilds the
/// input in an un-timed setup phase.
fn bench_host_execute(c: &mut Criterion) {
    let engine = HostEngine::setup(0).unwrap();
    let mut group = c.benchmark_group("host_execute");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    for kind in [TransformKind::ComplexForward, TransformKind::RealForward] {
        for &n in SIZES {
            let mut request = RequestedTransform::new(vec![n], kind);
            request.placement = Placement::OutOfPlace;
            let t = resolve(&request).unwrap();
            let plan = engine.create_plan(&PlanDescription::from_resolved(&t)).unwrap();
            let input = synthesize_input(&t).unwrap();
            let output = allocate_host(&t, false).unwrap();

            group.throughput(Throughput::Elements(n as u64));
            group.bench_with_input(BenchmarkId::new(kind.name(), n), &input, |b, input| {
                b.iter_batched(
                    || (input.clone(), output.clone()),
                    |(mut i, mut o)| {
                        engine
                            .execute(
                                &plan,
                                ExecBuffers::OutOfPlace { input: &mut i, output: &mut o },
                                None,
                            )
                            .unwrap();
                        black_box(o)
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

// ── Full driver ──────────────────────────────────────────────────────────────

/// Measures resolve → plan → warm-up → one trial, i.e. the harness overhead
/// around a single in-place execution.
fn bench_driver(c: &mut Criterion) {
    let engine = HostEngine::setup(0).unwrap();
    let mut group = c.benchmark_group("driver");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    for &n in SIZES {
        let request = RequestedTransform::new(vec![n], TransformKind::ComplexForward);
        let options = BenchmarkOptions { ntrial: 1, ..Default::default() };
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, request| {
            b.iter(|| {
                let report = Resolved::new(black_box(request), 0)
                    .and_then(|r| r.plan(&engine, options))
                    .and_then(|p| p.warm_up())
                    .and_then(|w| w.time())
                    .map(|t| t.finish())
                    .unwrap();
                black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_host_execute, bench_driver);
criterion_main!(benches);

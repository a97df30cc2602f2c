use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use shadersweep::chart;
use shadersweep::extract;
use shadersweep::frametime;
use shadersweep::types::{Dataset, FrameTimeLog, SweepSample};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Synthetic frame time log: `frames` GPU/CPU pairs with a spike every 97th
/// frame and unrelated diagnostic lines sprinkled in.
fn synthetic_log(frames: usize) -> String {
    let mut out = String::with_capacity(frames * 80);
    for i in 0..frames {
        if i % 10 == 0 {
            out.push_str(&format!("Frame {i} submitted\n"));
        }
        let gpu = if i % 97 == 0 { 48.0 } else { 6.0 + (i % 7) as f64 * 0.25 };
        let cpu = 3.0 + (i % 5) as f64 * 0.5;
        out.push_str(&format!("GPU Headless frame time: {gpu:.3} ms\n"));
        out.push_str(&format!("CPU Headless frame time: {cpu:.3} ms\n"));
    }
    out
}

/// Step-shaped dataset like a real invocation sweep: the count jumps every
/// 96 indices.
fn synthetic_dataset(samples: usize) -> Dataset {
    let mut data = Dataset::new();
    for i in 0..samples {
        let parameter = 3 + (i as i64) * 12;
        data.push(SweepSample {
            parameter,
            metric: (parameter as u64).div_ceil(96) * 96,
        });
    }
    data
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_parse_invocations(c: &mut Criterion) {
    let inputs = [
        ("match", "VS invocations: 4096"),
        ("unrelated", "Selected physical device: Intel(R) Graphics"),
        ("prefixed", "Foo VS invocations: 10"),
    ];

    let mut group = c.benchmark_group("parse_invocations");
    for (name, input) in &inputs {
        group.bench_with_input(BenchmarkId::new("input", name), input, |b, s| {
            b.iter(|| extract::parse_invocations(s));
        });
    }
    group.finish();
}

fn bench_frame_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_log");
    for &frames in &[100, 1_000, 10_000] {
        let text = synthetic_log(frames);
        group.bench_with_input(BenchmarkId::new("parse", frames), &text, |b, t| {
            b.iter(|| frametime::parse_frame_times_str(t).unwrap());
        });

        let log: FrameTimeLog = frametime::parse_frame_times_str(&text).unwrap();
        group.bench_with_input(BenchmarkId::new("p95_upper_bound", frames), &log, |b, l| {
            b.iter(|| frametime::p95_upper_bound(l));
        });
    }
    group.finish();
}

fn bench_step_points(c: &mut Criterion) {
    let data = synthetic_dataset(250);
    c.bench_function("step_points_250", |b| {
        b.iter(|| chart::step_points(&data));
    });
}

criterion_group!(
    benches,
    bench_parse_invocations,
    bench_frame_log,
    bench_step_points,
);
criterion_main!(benches);

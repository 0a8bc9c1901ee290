//! Performance benchmarks for the per-frame dispatch decision
//!
//! Run with: cargo bench
//!
//! `on_frame` runs on the camera thread for every preview frame, so its cost
//! when nothing can be dispatched must stay negligible.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crabscan::analysis::{DetectorSet, FeatureFlags, FnDetector, FrameDispatcher, TaskRunner};
use crabscan::testing::{synthetic_nv21_frame, RecordingSink, PREVIEW_SIZES};
use crabscan::{AnalysisKind, DetectionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn dispatcher(rt: &tokio::runtime::Runtime, detectors: DetectorSet, enabled: bool) -> FrameDispatcher {
    let flags = if enabled {
        FeatureFlags::with_enabled(AnalysisKind::all())
    } else {
        FeatureFlags::new()
    };
    let (sink, _events) = RecordingSink::new();
    let runner = TaskRunner::new(rt.handle().clone(), Arc::new(sink));
    FrameDispatcher::new(Arc::new(flags), detectors, runner)
}

fn bench_idle_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let d = dispatcher(&rt, DetectorSet::new(), false);
    let frame = synthetic_nv21_frame(0, 1920, 1080);

    c.bench_function("on_frame nothing enabled", |b| {
        b.iter(|| black_box(d.on_frame(black_box(frame.clone()))))
    });
}

fn bench_all_busy(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let hold = Arc::new(AtomicBool::new(true));

    let mut detectors = DetectorSet::new();
    for kind in AnalysisKind::all() {
        let hold = Arc::clone(&hold);
        detectors.insert(
            kind,
            Arc::new(FnDetector::new(move |frame, _| {
                while hold.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(DetectionResult::empty(frame))
            })),
        );
    }
    let d = dispatcher(&rt, detectors, true);
    let frame = synthetic_nv21_frame(0, 1920, 1080);
    assert_eq!(d.on_frame(frame.clone()).len(), AnalysisKind::COUNT);

    c.bench_function("on_frame all kinds busy", |b| {
        b.iter(|| black_box(d.on_frame(black_box(frame.clone()))))
    });

    hold.store(false, Ordering::Release);
}

fn bench_inverted_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame inversion");
    for &(width, height) in PREVIEW_SIZES {
        let frame = synthetic_nv21_frame(0, width, height);
        group.throughput(Throughput::Bytes(frame.data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", width, height)), &frame, |b, f| {
            b.iter(|| black_box(f.inverted()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_idle_dispatch, bench_all_busy, bench_inverted_copy);
criterion_main!(benches);

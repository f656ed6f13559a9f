//! Performance benchmarks for the insight pipeline
//!
//! Targets:
//! - Fingerprint over 100 records: <100µs
//! - Cache hit round-trip: <50µs
//! - Fresh mood analysis over 30 records: <1ms

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ribbon_core::{
    fingerprint, AnalyzerMode, Domain, DomainRecord, ManualClock, Mode, PipelineProcessor,
    PipelineRequest, RibbonConfig, TriggerReason, UserId,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const START_MS: i64 = 1_717_200_000_000;

fn mood_entries(n: usize) -> Vec<DomainRecord> {
    let start = Utc.timestamp_millis_opt(START_MS).single().unwrap_or_else(Utc::now);
    (0..n)
        .map(|i| DomainRecord::Mood {
            recorded_at: start - Duration::hours((n - i) as i64 * 6),
            mood_score: 3 + (i % 6) as u8,
            energy: Some(5),
            anxiety: Some((i % 8) as u8),
            triggers: vec!["sleep".to_string()],
        })
        .collect()
}

fn processor() -> PipelineProcessor {
    let config = RibbonConfig {
        mode: Mode::Test,
        analyzer: AnalyzerMode::Live,
        ..Default::default()
    };
    PipelineProcessor::builder(config)
        .clock(Arc::new(ManualClock::new(START_MS)))
        .build()
}

/// Benchmark 1: Fingerprint hashing
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    let user = UserId::new("bench-user");

    for size in [10usize, 100, 1000] {
        let payload = mood_entries(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| fingerprint(black_box(&user), Domain::Mood, black_box(payload), "bench"));
        });
    }

    group.finish();
}

/// Benchmark 2: Cache hit vs fresh computation
fn bench_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pipeline");
    let payload = mood_entries(30);

    let warm = processor();
    rt.block_on(async {
        warm.process(PipelineRequest::new(
            UserId::new("warm"),
            Domain::Mood,
            payload.clone(),
            TriggerReason::ScreenFocus,
        ))
        .await
        .unwrap();
    });

    group.bench_function("cache_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let request = PipelineRequest::new(
                UserId::new("warm"),
                Domain::Mood,
                payload.clone(),
                TriggerReason::ScreenFocus,
            );
            black_box(warm.process(request).await.unwrap());
        });
    });

    let mut counter = 0u64;
    group.bench_function("fresh_mood", |b| {
        b.to_async(&rt).iter(|| {
            counter += 1;
            let request = PipelineRequest::new(
                UserId::new(format!("cold-{}", counter)),
                Domain::Mood,
                payload.clone(),
                TriggerReason::ScreenFocus,
            );
            let cold = &warm;
            async move {
                black_box(cold.process(request).await.unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fingerprint, bench_pipeline);
criterion_main!(benches);

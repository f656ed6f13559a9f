//! End-to-end pipeline scenarios on a simulated clock

mod common;

use common::{harness, harness_with, request, seed, seed_mood_entries, test_config};
use ribbon_core::{
    AnalyzerMode, AnalyzerRegistry, Domain, InvalidationEvent, MetadataSource, PipelineProcessor,
    Provenance, QualityTier, RibbonView, SqliteCacheBackend, TelemetryKind, TriggerReason, UserId,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_second_call_is_served_from_cache_for_every_domain() {
    let h = harness(AnalyzerMode::Live);
    for domain in Domain::all() {
        let first = h
            .processor
            .process(request("u1", domain, seed(domain, 12)))
            .await
            .unwrap();
        assert_eq!(first.metadata.source, MetadataSource::Fresh, "{}", domain);

        let second = h
            .processor
            .process(request("u1", domain, seed(domain, 12)))
            .await
            .unwrap();
        assert_eq!(second.metadata.source, MetadataSource::Cache, "{}", domain);
        assert_eq!(
            second.quality_metadata.as_ref().map(|m| m.source),
            Some(Provenance::Cache)
        );
        assert_eq!(second.insights, first.insights);
    }
}

#[tokio::test]
async fn test_seeded_mood_scenario() {
    let h = harness(AnalyzerMode::Live);
    let cases = [
        (16, Some(QualityTier::High)),
        (10, Some(QualityTier::Medium)),
        (4, Some(QualityTier::Low)),
        (0, None),
    ];

    for (n, expected) in cases {
        let result = h
            .processor
            .process(request(&format!("user-{}", n), Domain::Mood, seed_mood_entries(n)))
            .await
            .unwrap();
        assert_eq!(result.analytics.sample_size, n as u32);

        let meta = result.quality_metadata.as_ref();
        assert_eq!(meta.map(|m| m.quality), expected, "n={}", n);
        match RibbonView::from_metadata(meta) {
            Some(view) => {
                assert_eq!(view.source, "Fresh");
                assert_eq!(view.sample_size, format!("n={}", n));
            }
            None => assert_eq!(n, 0),
        }
    }
}

#[tokio::test]
async fn test_mood_tier_boundaries() {
    let h = harness(AnalyzerMode::Live);
    for (n, expected) in [
        (6, QualityTier::Low),
        (7, QualityTier::Medium),
        (13, QualityTier::Medium),
        (14, QualityTier::High),
    ] {
        let result = h
            .processor
            .process(request("u", Domain::Mood, seed_mood_entries(n)))
            .await
            .unwrap();
        assert_eq!(result.quality_metadata.unwrap().quality, expected, "n={}", n);
    }
}

#[tokio::test]
async fn test_ttl_expiry_on_simulated_clock() {
    let h = harness(AnalyzerMode::Stub);
    let payload = seed_mood_entries(5);

    h.processor
        .process(request("u", Domain::Mood, payload.clone()))
        .await
        .unwrap();

    h.clock.advance(5_000);
    let at_ttl = h
        .processor
        .process(request("u", Domain::Mood, payload.clone()))
        .await
        .unwrap();
    assert_eq!(at_ttl.metadata.source, MetadataSource::Cache);
    assert_eq!(at_ttl.quality_metadata.unwrap().freshness_ms, 5_000);

    h.clock.advance(1);
    let expired = h
        .processor
        .process(request("u", Domain::Mood, payload))
        .await
        .unwrap();
    assert_eq!(expired.metadata.source, MetadataSource::Fresh);
    assert_eq!(h.processor.cache_stats().expired, 1);
}

#[tokio::test]
async fn test_invalidation_forces_fresh_result() {
    let h = harness(AnalyzerMode::Live);
    let user = UserId::new("u1");

    for event in InvalidationEvent::all() {
        for domain in event.affected_domains() {
            h.processor
                .process(request("u1", domain, seed(domain, 8)))
                .await
                .unwrap();
        }

        let mut rx = h.telemetry.subscribe();
        h.processor.trigger_invalidation(event, &user).await;
        assert_eq!(rx.recv().await.unwrap().kind, TelemetryKind::CacheInvalidation);

        for domain in event.affected_domains() {
            let next = h
                .processor
                .process(request("u1", domain, seed(domain, 8)))
                .await
                .unwrap();
            assert_eq!(
                next.metadata.source,
                MetadataSource::Fresh,
                "{} after {}",
                domain,
                event
            );
        }
    }
}

#[tokio::test]
async fn test_invalidation_leaves_unaffected_domain_cached() {
    let h = harness(AnalyzerMode::Live);
    h.processor
        .process(request("u1", Domain::Cbt, seed(Domain::Cbt, 5)))
        .await
        .unwrap();

    h.processor
        .trigger_invalidation(InvalidationEvent::MoodAdded, &UserId::new("u1"))
        .await;

    let cbt = h
        .processor
        .process(request("u1", Domain::Cbt, seed(Domain::Cbt, 5)))
        .await
        .unwrap();
    assert!(cbt.is_from_cache());
}

#[tokio::test]
async fn test_concurrent_misses_both_succeed() {
    let h = harness(AnalyzerMode::Live);
    let (a, b) = tokio::join!(
        h.processor
            .process(request("u", Domain::Ocd, seed(Domain::Ocd, 9))),
        h.processor
            .process(request("u", Domain::Ocd, seed(Domain::Ocd, 9))),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.analytics, b.analytics);

    let third = h
        .processor
        .process(request("u", Domain::Ocd, seed(Domain::Ocd, 9)))
        .await
        .unwrap();
    assert!(third.is_from_cache());
}

#[tokio::test]
async fn test_process_for_user_reads_data_source() {
    let h = harness(AnalyzerMode::Live);
    let user = UserId::new("u1");
    h.source.extend(&user, seed_mood_entries(14));

    let result = h
        .processor
        .process_for_user(&user, Domain::Mood, TriggerReason::ScreenFocus)
        .await
        .unwrap();
    assert_eq!(result.analytics.sample_size, 14);
    assert_eq!(result.quality_metadata.unwrap().quality, QualityTier::High);

    let again = h
        .processor
        .process_for_user(&user, Domain::Mood, TriggerReason::PullToRefresh)
        .await
        .unwrap();
    assert!(again.is_from_cache());
}

#[tokio::test]
async fn test_fixed_test_user_substitution() {
    let config = ribbon_core::RibbonConfig {
        test_user_id: Some("e2e".to_string()),
        ..test_config(AnalyzerMode::Stub)
    };
    let h = harness_with(config, AnalyzerRegistry::stub());

    h.processor
        .process(request("alice", Domain::Mood, seed_mood_entries(3)))
        .await
        .unwrap();
    let bob = h
        .processor
        .process(request("bob", Domain::Mood, seed_mood_entries(3)))
        .await
        .unwrap();
    assert!(bob.is_from_cache());
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("ribbon.db");
    let payload = seed_mood_entries(10);

    {
        let processor = PipelineProcessor::builder(test_config(AnalyzerMode::Live))
            .clock(Arc::new(ribbon_core::ManualClock::new(common::START_MS)))
            .cache_backend(Arc::new(SqliteCacheBackend::open(&db).await.unwrap()))
            .build();
        let fresh = processor
            .process(request("u", Domain::Mood, payload.clone()))
            .await
            .unwrap();
        assert_eq!(fresh.metadata.source, MetadataSource::Fresh);
    }

    let processor = PipelineProcessor::builder(test_config(AnalyzerMode::Live))
        .clock(Arc::new(ribbon_core::ManualClock::new(common::START_MS + 1_000)))
        .cache_backend(Arc::new(SqliteCacheBackend::open(&db).await.unwrap()))
        .build();
    let cached = processor
        .process(request("u", Domain::Mood, payload))
        .await
        .unwrap();
    assert!(cached.is_from_cache());
    let meta = cached.quality_metadata.unwrap();
    assert_eq!(meta.quality, QualityTier::Medium);
    assert_eq!(meta.freshness_ms, 1_000);
}

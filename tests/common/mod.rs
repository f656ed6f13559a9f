//! Common test utilities and helpers

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ribbon_core::{
    AnalyzerMode, AnalyzerRegistry, BroadcastTelemetry, Domain, DomainRecord, InMemoryDataSource,
    ManualClock, Mode, PipelineProcessor, PipelineRequest, RibbonConfig, TriggerReason, UserId,
};
use std::sync::Arc;

/// Simulated start time (2024-06-01T00:00:00Z)
pub const START_MS: i64 = 1_717_200_000_000;

pub fn start() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(START_MS).unwrap()
}

/// `n` daily mood entries ending at the simulated start time
pub fn seed_mood_entries(n: usize) -> Vec<DomainRecord> {
    (0..n)
        .map(|i| DomainRecord::Mood {
            recorded_at: start() - Duration::days((n - i) as i64) + Duration::hours(9),
            mood_score: 4 + (i % 5) as u8,
            energy: Some(5),
            anxiety: Some(3 + (i % 3) as u8),
            triggers: if i % 3 == 0 {
                vec!["work".to_string()]
            } else {
                vec![]
            },
        })
        .collect()
}

pub fn seed_thought_records(n: usize) -> Vec<DomainRecord> {
    (0..n)
        .map(|i| DomainRecord::ThoughtRecord {
            recorded_at: start() - Duration::days((n - i) as i64) + Duration::hours(20),
            distortions: vec!["catastrophizing".to_string()],
            mood_before: 70,
            mood_after: 40,
        })
        .collect()
}

pub fn seed_compulsions(n: usize) -> Vec<DomainRecord> {
    (0..n)
        .map(|i| DomainRecord::Compulsion {
            recorded_at: start() - Duration::days((n - i) as i64) + Duration::hours(14),
            category: "checking".to_string(),
            intensity: 6,
            resisted: i % 2 == 0,
        })
        .collect()
}

pub fn seed_ocd_patterns(n: usize) -> Vec<DomainRecord> {
    (0..n)
        .map(|i| DomainRecord::OcdPattern {
            recorded_at: start() - Duration::days((n - i) as i64) + Duration::hours(8),
            trigger: "door locks".to_string(),
            anxiety_level: 6,
            resisted: i % 3 == 0,
        })
        .collect()
}

/// Records for `domain` (every domain's records for the aggregate view)
pub fn seed(domain: Domain, n: usize) -> Vec<DomainRecord> {
    match domain {
        Domain::Mood => seed_mood_entries(n),
        Domain::Cbt => seed_thought_records(n),
        Domain::Tracking => seed_compulsions(n),
        Domain::Ocd => seed_ocd_patterns(n),
        Domain::Aggregate => {
            let mut all = seed_mood_entries(n / 2);
            all.extend(seed_compulsions(n - n / 2));
            all
        }
    }
}

pub fn test_config(analyzer: AnalyzerMode) -> RibbonConfig {
    RibbonConfig {
        mode: Mode::Test,
        analyzer,
        ..Default::default()
    }
}

/// Processor on a simulated clock, with broadcast telemetry and an
/// in-memory data source
pub struct Harness {
    pub processor: PipelineProcessor,
    pub clock: Arc<ManualClock>,
    pub telemetry: Arc<BroadcastTelemetry>,
    pub source: Arc<InMemoryDataSource>,
}

pub fn harness(analyzer: AnalyzerMode) -> Harness {
    harness_with(test_config(analyzer), AnalyzerRegistry::for_mode(analyzer))
}

pub fn harness_with(config: RibbonConfig, analyzers: AnalyzerRegistry) -> Harness {
    let clock = Arc::new(ManualClock::new(START_MS));
    let telemetry = Arc::new(BroadcastTelemetry::new(64));
    let source = Arc::new(InMemoryDataSource::new(clock.clone()));
    let processor = PipelineProcessor::builder(config)
        .clock(clock.clone())
        .telemetry(telemetry.clone())
        .data_source(source.clone())
        .analyzers(analyzers)
        .build();
    Harness {
        processor,
        clock,
        telemetry,
        source,
    }
}

pub fn request(user: &str, domain: Domain, payload: Vec<DomainRecord>) -> PipelineRequest {
    PipelineRequest::new(UserId::new(user), domain, payload, TriggerReason::ScreenFocus)
        .requested_at(START_MS)
}

//! Quality Ribbon - insight pipeline core
//!
//! Computes per-domain insights for a wellbeing app (mood, CBT thought
//! records, compulsion tracking, OCD trigger logs and the cross-module
//! "today" view) and tags every result with its provenance and a quality
//! tier so the UI can render a compact ribbon of badges next to it.
//!
//! # Architecture
//!
//! - **Fingerprint**: deterministic cache key over user, domain, payload and
//!   pipeline version
//! - **Cache**: TTL-bounded result cache over a memory (LRU) or SQLite backend
//! - **Analyzers**: one pluggable strategy per domain, plus a deterministic stub
//! - **Quality**: per-domain sample-size thresholds and provenance tags
//! - **Pipeline**: fingerprint, cache lookup, analysis, classification, write-back
//! - **Invalidation**: domain mutation events clear the affected entries
//! - **Suggestion**: cooldown-gated suggestions that relay quality metadata
//! - **Ribbon**: UI view model, absent whenever quality metadata is absent
//!
//! # Example
//!
//! ```ignore
//! use ribbon_core::{Domain, PipelineProcessor, PipelineRequest, RibbonConfig, TriggerReason, UserId};
//!
//! #[tokio::main]
//! async fn main() -> ribbon_core::Result<()> {
//!     let processor = PipelineProcessor::from_config(RibbonConfig::load(None)?).await?;
//!     let request = PipelineRequest::new(UserId::new("u1"), Domain::Mood, records, TriggerReason::ScreenFocus);
//!
//!     let result = processor.process(request).await?;
//!     if let Some(ribbon) = ribbon_core::RibbonView::from_metadata(result.quality_metadata.as_ref()) {
//!         println!("{}", ribbon);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analyzers;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod invalidation;
pub mod pipeline;
pub mod quality;
pub mod ribbon;
pub mod source;
pub mod storage;
pub mod suggestion;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use analyzers::{AnalyzerOutput, AnalyzerRegistry, DomainAnalyzer};
pub use cache::{
    CacheBackend, CacheStats, CachedResult, MemoryCacheBackend, ResultCache, SqliteCacheBackend,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnalyzerMode, Mode, RibbonConfig};
pub use error::{Result, RibbonError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use invalidation::{
    HttpCacheMirror, InvalidationCoordinator, InvalidationEvent, InvalidationReport,
    RemoteCacheMirror,
};
pub use pipeline::{PipelineBuilder, PipelineProcessor};
pub use quality::{
    classify, Classification, DomainThresholds, Provenance, QualityClassifier, QualityMetadata,
    QualityTier,
};
pub use ribbon::RibbonView;
pub use source::{DomainDataSource, InMemoryDataSource};
pub use suggestion::{AdaptiveSuggestionSelector, Suggestion};
pub use telemetry::{
    BroadcastTelemetry, CompositeTelemetry, TelemetryEvent, TelemetryKind, TelemetrySink,
    TracingTelemetry,
};
pub use types::{
    Analytics, Domain, DomainRecord, Insight, InsightPriority, MetadataSource, Pattern,
    PipelineRequest, PipelineResult, RequestContext, ResultMetadata, TriggerReason, UserId,
};

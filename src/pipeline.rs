//! Pipeline processor
//!
//! Entry point for every insight request:
//!
//! 1. Fingerprint the request (user, domain, payload, pipeline version)
//! 2. Serve a live cache entry if there is one, re-tagged as `cache`
//! 3. Otherwise run the domain analyzer, classify the result and write it to
//!    the cache before returning it
//!
//! Analyzer failures are never cached. They propagate as
//! [`RibbonError::Computation`]; callers that must always render something
//! use [`PipelineProcessor::process_or_degrade`].

use crate::analyzers::stats::sample_confidence;
use crate::analyzers::{accepted, AnalyzerRegistry};
use crate::cache::{CacheBackend, CacheStats, MemoryCacheBackend, ResultCache, SqliteCacheBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::RibbonConfig;
use crate::error::{Result, RibbonError};
use crate::fingerprint::fingerprint;
use crate::invalidation::{
    HttpCacheMirror, InvalidationCoordinator, InvalidationEvent, InvalidationReport,
    RemoteCacheMirror,
};
use crate::quality::{Provenance, QualityMetadata};
use crate::source::{DomainDataSource, InMemoryDataSource};
use crate::telemetry::{TelemetryKind, TelemetrySink, TracingTelemetry};
use crate::types::{
    Analytics, Domain, MetadataSource, PipelineRequest, PipelineResult, RequestContext,
    ResultMetadata, TriggerReason, UserId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestrates fingerprinting, caching, analysis and classification
pub struct PipelineProcessor {
    config: RibbonConfig,
    cache: Arc<ResultCache>,
    analyzers: AnalyzerRegistry,
    source: Arc<dyn DomainDataSource>,
    telemetry: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
    coordinator: InvalidationCoordinator,
}

impl PipelineProcessor {
    pub fn builder(config: RibbonConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Processor wired from configuration alone
    ///
    /// Uses the SQLite cache when `database_path` is set and the HTTP mirror
    /// when `remote_mirror_url` is set.
    pub async fn from_config(config: RibbonConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = PipelineBuilder::new(config.clone());

        if let Some(path) = &config.database_path {
            builder = builder.cache_backend(Arc::new(SqliteCacheBackend::open(path).await?));
        }
        if let Some(url) = &config.remote_mirror_url {
            builder = builder.mirror(Arc::new(HttpCacheMirror::new(url.clone())?));
        }
        Ok(builder.build())
    }

    /// Produce a result for a request, from cache when possible
    pub async fn process(&self, request: PipelineRequest) -> Result<PipelineResult> {
        let user_id = self.effective_user(&request.user_id);
        let domain = request.domain;
        let fp = fingerprint(
            &user_id,
            domain,
            &request.payload,
            &self.config.pipeline_version,
        )?;

        if let Some(hit) = self.cache.get(&fp).await {
            let mut result = hit.result;
            result.metadata.source = MetadataSource::Cache;
            result.quality_metadata =
                QualityMetadata::derive(&result.analytics, Provenance::Cache, hit.age_ms);
            debug!(
                "Serving {} result for user {} from cache (age {}ms, trigger {:?})",
                domain, user_id, hit.age_ms, request.context.trigger
            );
            return Ok(result);
        }

        let analyzer = self.analyzers.get(domain).ok_or_else(|| RibbonError::Computation {
            domain,
            message: "no analyzer registered".to_string(),
        })?;

        let started = Instant::now();
        let output = match analyzer.analyze(&request.payload).await {
            Ok(output) => output,
            Err(e) => {
                let message = match e {
                    RibbonError::Computation { message, .. } => message,
                    other => other.to_string(),
                };
                error!("{} analyzer failed for user {}: {}", domain, user_id, message);
                self.telemetry.record(
                    TelemetryKind::PipelineError,
                    json!({ "domain": domain.as_str(), "error": message }),
                    &user_id,
                );
                return Err(RibbonError::Computation { domain, message });
            }
        };
        let processing_time = started.elapsed().as_millis() as u64;

        let ttl = self.config.active_ttl();
        let quality_metadata = QualityMetadata::derive(&output.analytics, Provenance::Unified, 0);
        let mut result = PipelineResult {
            insights: output.insights,
            patterns: output.patterns,
            analytics: output.analytics,
            metadata: ResultMetadata {
                source: MetadataSource::Fresh,
                processed_at: self.clock.now_ms(),
                processing_time,
                pipeline_version: self.config.pipeline_version.clone(),
                cache_ttl: ttl.as_millis() as u64,
            },
            quality_metadata,
        };

        if self.cache.put(fp, result.clone(), ttl).await.is_none() {
            result.metadata.cache_ttl = 0;
        }

        info!(
            "Computed {} insights for user {} in {}ms (n={})",
            domain, user_id, processing_time, result.analytics.sample_size
        );
        self.telemetry.record(
            TelemetryKind::PipelineCompleted,
            json!({
                "domain": domain.as_str(),
                "processingTime": processing_time,
                "sampleSize": result.analytics.sample_size,
            }),
            &user_id,
        );
        Ok(result)
    }

    /// Like [`process`](Self::process), but falls back to an uncached
    /// heuristic result when the analyzer fails
    ///
    /// Non-computation errors (fingerprinting) still propagate.
    pub async fn process_or_degrade(&self, request: PipelineRequest) -> Result<PipelineResult> {
        let domain = request.domain;
        let user_id = self.effective_user(&request.user_id);
        let sample_size = accepted(domain, &request.payload).len();

        match self.process(request).await {
            Err(e) if e.is_computation_failure() => {
                warn!("Degrading {} result for user {}: {}", domain, user_id, e);
                self.telemetry.record(
                    TelemetryKind::DegradedResult,
                    json!({ "domain": domain.as_str(), "error": e.to_string() }),
                    &user_id,
                );
                Ok(self.heuristic_result(domain, sample_size))
            }
            other => other,
        }
    }

    /// Fetch the user's records for `domain` and process them
    pub async fn process_for_user(
        &self,
        user_id: &UserId,
        domain: Domain,
        trigger: TriggerReason,
    ) -> Result<PipelineResult> {
        let user_id = self.effective_user(user_id);
        let payload = self
            .source
            .fetch_records(&user_id, domain, self.config.window_days)
            .await?;

        self.process(PipelineRequest {
            user_id,
            domain,
            payload,
            context: RequestContext {
                trigger,
                requested_at: self.clock.now_ms(),
            },
        })
        .await
    }

    pub async fn trigger_invalidation(
        &self,
        event: InvalidationEvent,
        user_id: &UserId,
    ) -> InvalidationReport {
        let user_id = self.effective_user(user_id);
        self.coordinator.trigger_invalidation(event, &user_id).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn config(&self) -> &RibbonConfig {
        &self.config
    }

    fn effective_user(&self, requested: &UserId) -> UserId {
        match self.config.fixed_user() {
            Some(fixed) => UserId::new(fixed),
            None => requested.clone(),
        }
    }

    /// Minimal result built from the record count only
    fn heuristic_result(&self, domain: Domain, sample_size: usize) -> PipelineResult {
        let analytics = Analytics {
            sample_size: sample_size as u32,
            confidence: if sample_size == 0 {
                0.0
            } else {
                sample_confidence(sample_size)
            },
            ..Analytics::empty(domain)
        };
        let quality_metadata = QualityMetadata::derive(&analytics, Provenance::Heuristic, 0);

        PipelineResult {
            insights: Vec::new(),
            patterns: Vec::new(),
            analytics,
            metadata: ResultMetadata {
                source: MetadataSource::Heuristic,
                processed_at: self.clock.now_ms(),
                processing_time: 0,
                pipeline_version: self.config.pipeline_version.clone(),
                cache_ttl: 0,
            },
            quality_metadata,
        }
    }
}

/// Assembles a [`PipelineProcessor`]
///
/// Unset collaborators default to an LRU memory cache sized from the
/// config, the analyzer set selected by the config, an in-memory data
/// source, tracing telemetry and the system clock.
pub struct PipelineBuilder {
    config: RibbonConfig,
    clock: Option<Arc<dyn Clock>>,
    backend: Option<Arc<dyn CacheBackend>>,
    analyzers: Option<AnalyzerRegistry>,
    source: Option<Arc<dyn DomainDataSource>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    mirror: Option<Arc<dyn RemoteCacheMirror>>,
}

impl PipelineBuilder {
    pub fn new(config: RibbonConfig) -> Self {
        Self {
            config,
            clock: None,
            backend: None,
            analyzers: None,
            source: None,
            telemetry: None,
            mirror: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn analyzers(mut self, analyzers: AnalyzerRegistry) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    pub fn data_source(mut self, source: Arc<dyn DomainDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn mirror(mut self, mirror: Arc<dyn RemoteCacheMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn build(self) -> PipelineProcessor {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryCacheBackend::new(self.config.cache_capacity)));
        let cache = Arc::new(ResultCache::new(backend, clock.clone()));
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Arc::new(TracingTelemetry));
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(InMemoryDataSource::new(clock.clone())));
        let analyzers = self
            .analyzers
            .unwrap_or_else(|| AnalyzerRegistry::for_mode(self.config.analyzer));

        let mut coordinator = InvalidationCoordinator::new(cache.clone(), telemetry.clone());
        if let Some(mirror) = self.mirror {
            coordinator = coordinator.with_mirror(mirror);
        }

        PipelineProcessor {
            config: self.config,
            cache,
            analyzers,
            source,
            telemetry,
            clock,
            coordinator,
        }
    }
}

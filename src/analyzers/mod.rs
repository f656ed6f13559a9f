//! Domain analyzers
//!
//! One pluggable strategy per data domain. The pipeline processor invokes
//! the analyzer for the request's domain on a cache miss. Analyzers are pure
//! with respect to their input: the same records always produce the same
//! output, independent of wall-clock time.
//!
//! - **MoodAnalyzer**: mood level, volatility, trigger and time-of-day patterns
//! - **CbtAnalyzer**: relief from thought records, recurring distortions
//! - **TrackingAnalyzer**: compulsion intensity and resistance
//! - **OcdAnalyzer**: OCD trigger log, anxiety and resistance
//! - **AggregateAnalyzer**: cross-module "today" summary over every record
//! - **StubAnalyzer**: deterministic fixed output for test scenarios

pub mod aggregate;
pub mod cbt;
pub mod mood;
pub mod ocd;
pub mod stats;
pub mod stub;
pub mod tracking;

pub use aggregate::AggregateAnalyzer;
pub use cbt::CbtAnalyzer;
pub use mood::MoodAnalyzer;
pub use ocd::OcdAnalyzer;
pub use stub::StubAnalyzer;
pub use tracking::TrackingAnalyzer;

use crate::config::AnalyzerMode;
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, Pattern};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// What an analyzer produces for a payload
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOutput {
    pub insights: Vec<Insight>,
    pub patterns: Vec<Pattern>,
    pub analytics: Analytics,
}

impl AnalyzerOutput {
    pub fn empty(domain: Domain) -> Self {
        Self {
            insights: Vec::new(),
            patterns: Vec::new(),
            analytics: Analytics::empty(domain),
        }
    }
}

/// Per-domain analysis strategy
#[async_trait]
pub trait DomainAnalyzer: Send + Sync {
    /// Domain this analyzer handles
    fn domain(&self) -> Domain;

    /// Analyze the records of a request
    ///
    /// Records outside the analyzer's domain are ignored and do not count
    /// toward the sample size.
    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput>;
}

/// Records accepted by `domain`
pub(crate) fn accepted(domain: Domain, records: &[DomainRecord]) -> Vec<&DomainRecord> {
    records.iter().filter(|r| domain.accepts(r)).collect()
}

/// Lookup table from domain to analyzer
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<Domain, Arc<dyn DomainAnalyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the live analyzer for every domain
    pub fn live() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MoodAnalyzer));
        registry.register(Arc::new(CbtAnalyzer));
        registry.register(Arc::new(TrackingAnalyzer));
        registry.register(Arc::new(OcdAnalyzer));
        registry.register(Arc::new(AggregateAnalyzer));
        registry
    }

    /// Registry with the deterministic stub for every domain
    pub fn stub() -> Self {
        let mut registry = Self::new();
        for domain in Domain::all() {
            registry.register(Arc::new(StubAnalyzer::new(domain)));
        }
        registry
    }

    pub fn for_mode(mode: AnalyzerMode) -> Self {
        match mode {
            AnalyzerMode::Live => Self::live(),
            AnalyzerMode::Stub => Self::stub(),
        }
    }

    /// Register (or replace) the analyzer for its domain
    pub fn register(&mut self, analyzer: Arc<dyn DomainAnalyzer>) {
        self.analyzers.insert(analyzer.domain(), analyzer);
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn DomainAnalyzer>> {
        self.analyzers.get(&domain).cloned()
    }
}

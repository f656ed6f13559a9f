//! Deterministic analyzer for test mode
//!
//! Produces the same output shape as the live analyzers without any domain
//! logic, so end-to-end scenarios can assert on exact values.

use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const STUB_CONFIDENCE: f64 = 0.8;
pub const STUB_DATA_QUALITY: f64 = 0.9;

#[derive(Debug, Clone, Copy)]
pub struct StubAnalyzer {
    domain: Domain,
}

impl StubAnalyzer {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }
}

#[async_trait]
impl DomainAnalyzer for StubAnalyzer {
    fn domain(&self) -> Domain {
        self.domain
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let count = accepted(self.domain, records).len();
        if count == 0 {
            return Ok(AnalyzerOutput::empty(self.domain));
        }

        let mut baselines = BTreeMap::new();
        baselines.insert("entries".to_string(), count as f64);

        Ok(AnalyzerOutput {
            insights: vec![Insight::Therapeutic {
                title: format!("Stub insight for {}", self.domain),
                message: format!("{} records analyzed", count),
                priority: InsightPriority::Low,
                target: self.domain,
            }],
            patterns: Vec::new(),
            analytics: Analytics {
                domain: self.domain,
                sample_size: count as u32,
                confidence: STUB_CONFIDENCE,
                volatility: 0.0,
                weekly_delta: 0.0,
                data_quality: STUB_DATA_QUALITY,
                baselines,
            },
        })
    }
}

//! CBT thought record analysis
//!
//! Relief is the drop in mood intensity between the start and the end of a
//! thought record; it is the primary metric for this domain.

use super::stats::{
    day_coverage, mean, recurring, sample_confidence, std_dev, temporal_pattern, trend,
    weekly_delta,
};
use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority, Pattern};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Average relief (in intensity points) below which reframing seems to stall
const LOW_RELIEF: f64 = 10.0;

/// Analyzer for CBT thought records
#[derive(Debug, Default, Clone, Copy)]
pub struct CbtAnalyzer;

#[async_trait]
impl DomainAnalyzer for CbtAnalyzer {
    fn domain(&self) -> Domain {
        Domain::Cbt
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let records = accepted(Domain::Cbt, records);
        let mut relief_points = Vec::new();
        let mut before = Vec::new();
        let mut distortions = Vec::new();
        let mut with_distortions = 0usize;

        for record in &records {
            if let DomainRecord::ThoughtRecord {
                recorded_at,
                distortions: named,
                mood_before,
                mood_after,
            } = record
            {
                let relief = f64::from(*mood_before) - f64::from(*mood_after);
                relief_points.push((*recorded_at, relief));
                before.push(f64::from(*mood_before));
                if !named.is_empty() {
                    with_distortions += 1;
                }
                distortions.extend(named.iter().map(String::as_str));
            }
        }

        if relief_points.is_empty() {
            return Ok(AnalyzerOutput::empty(Domain::Cbt));
        }

        let relief: Vec<f64> = relief_points.iter().map(|(_, r)| *r).collect();
        let average_relief = mean(&relief).unwrap_or_default();
        let delta = weekly_delta(&relief_points);
        let n = relief.len();

        let mut baselines = BTreeMap::new();
        baselines.insert("relief".to_string(), average_relief);
        baselines.insert("mood_before".to_string(), mean(&before).unwrap_or_default());

        let mut patterns: Vec<Pattern> = recurring(distortions)
            .into_iter()
            .map(|(name, occurrences)| Pattern::Distortion { name, occurrences })
            .collect();
        if let Some(temporal) = temporal_pattern(&records) {
            patterns.push(temporal);
        }
        patterns.push(trend(delta));

        let mut insights = Vec::new();
        if let Some(Pattern::Distortion { name, occurrences }) = patterns.first() {
            insights.push(Insight::Therapeutic {
                title: format!("Recurring thinking trap: {}", name),
                message: format!(
                    "\"{}\" showed up in {} of your thought records. Naming it early makes it easier to challenge.",
                    name, occurrences
                ),
                priority: InsightPriority::Medium,
                target: Domain::Cbt,
            });
        }
        if average_relief < LOW_RELIEF {
            insights.push(Insight::Therapeutic {
                title: "Reframes are not landing yet".to_string(),
                message: "Thought records have brought little relief so far. Try writing evidence against the thought before the balanced thought.".to_string(),
                priority: InsightPriority::High,
                target: Domain::Cbt,
            });
        }
        if delta != 0.0 {
            insights.push(Insight::Progress {
                metric: "relief".to_string(),
                change: delta,
                message: format!("Relief per record changed by {:+.1} points week over week", delta),
            });
        }

        let tagged_share = with_distortions as f64 / n as f64;
        Ok(AnalyzerOutput {
            insights,
            patterns,
            analytics: Analytics {
                domain: Domain::Cbt,
                sample_size: n as u32,
                confidence: sample_confidence(n),
                volatility: std_dev(&relief),
                weekly_delta: delta,
                data_quality: 0.5 * tagged_share + 0.5 * day_coverage(&records),
                baselines,
            },
        })
    }
}

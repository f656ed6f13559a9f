//! Compulsion tracking analysis

use super::stats::{
    day_coverage, inverse_trend, mean, recurring, sample_confidence, std_dev, temporal_pattern,
    weekly_delta,
};
use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority, Pattern};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Resistance rate below which exposure work is suggested
const LOW_RESISTANCE: f64 = 0.3;

/// Analyzer for compulsion entries
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAnalyzer;

#[async_trait]
impl DomainAnalyzer for TrackingAnalyzer {
    fn domain(&self) -> Domain {
        Domain::Tracking
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let records = accepted(Domain::Tracking, records);
        let mut intensity_points = Vec::new();
        let mut categories = Vec::new();
        let mut resisted = 0u32;

        for record in &records {
            if let DomainRecord::Compulsion {
                recorded_at,
                category,
                intensity,
                resisted: did_resist,
            } = record
            {
                intensity_points.push((*recorded_at, f64::from(*intensity)));
                categories.push((category.as_str(), f64::from(*intensity)));
                if *did_resist {
                    resisted += 1;
                }
            }
        }

        if intensity_points.is_empty() {
            return Ok(AnalyzerOutput::empty(Domain::Tracking));
        }

        let total = intensity_points.len() as u32;
        let intensity: Vec<f64> = intensity_points.iter().map(|(_, v)| *v).collect();
        let delta = weekly_delta(&intensity_points);
        let rate = f64::from(resisted) / f64::from(total);

        let mut baselines = BTreeMap::new();
        baselines.insert("intensity".to_string(), mean(&intensity).unwrap_or_default());
        baselines.insert("resistance_rate".to_string(), rate);

        let mut patterns: Vec<Pattern> = recurring(categories.iter().map(|(c, _)| *c))
            .into_iter()
            .map(|(name, occurrences)| {
                let matching: Vec<f64> = categories
                    .iter()
                    .filter(|(c, _)| c.trim().eq_ignore_ascii_case(&name))
                    .map(|(_, i)| *i)
                    .collect();
                Pattern::Trigger {
                    name,
                    occurrences,
                    average_intensity: mean(&matching).unwrap_or_default(),
                }
            })
            .collect();
        patterns.push(Pattern::Resistance {
            resisted,
            total,
            rate,
        });
        if let Some(temporal) = temporal_pattern(&records) {
            patterns.push(temporal);
        }
        patterns.push(inverse_trend(delta));

        let mut insights = Vec::new();
        if rate < LOW_RESISTANCE {
            insights.push(Insight::Therapeutic {
                title: "Build resistance gradually".to_string(),
                message: "Most urges were acted on. Logging the OCD trigger behind each urge helps plan small exposure steps.".to_string(),
                priority: InsightPriority::High,
                target: Domain::Ocd,
            });
        }
        if delta != 0.0 {
            insights.push(Insight::Progress {
                metric: "intensity".to_string(),
                change: delta,
                message: format!("Average urge intensity changed by {:+.1} week over week", delta),
            });
        }

        Ok(AnalyzerOutput {
            insights,
            patterns,
            analytics: Analytics {
                domain: Domain::Tracking,
                sample_size: total,
                confidence: sample_confidence(total as usize),
                volatility: std_dev(&intensity),
                weekly_delta: delta,
                data_quality: day_coverage(&records),
                baselines,
            },
        })
    }
}

//! OCD pattern log analysis

use super::stats::{
    day_coverage, inverse_trend, mean, recurring, sample_confidence, std_dev, temporal_pattern,
    weekly_delta,
};
use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority, Pattern};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Average anxiety (1..=10) at or above which grounding is suggested
const HIGH_ANXIETY: f64 = 7.0;

/// Analyzer for OCD pattern entries
#[derive(Debug, Default, Clone, Copy)]
pub struct OcdAnalyzer;

#[async_trait]
impl DomainAnalyzer for OcdAnalyzer {
    fn domain(&self) -> Domain {
        Domain::Ocd
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let records = accepted(Domain::Ocd, records);
        let mut anxiety_points = Vec::new();
        let mut triggers = Vec::new();
        let mut resisted = 0u32;

        for record in &records {
            if let DomainRecord::OcdPattern {
                recorded_at,
                trigger,
                anxiety_level,
                resisted: did_resist,
            } = record
            {
                anxiety_points.push((*recorded_at, f64::from(*anxiety_level)));
                triggers.push((trigger.as_str(), f64::from(*anxiety_level)));
                if *did_resist {
                    resisted += 1;
                }
            }
        }

        if anxiety_points.is_empty() {
            return Ok(AnalyzerOutput::empty(Domain::Ocd));
        }

        let total = anxiety_points.len() as u32;
        let anxiety: Vec<f64> = anxiety_points.iter().map(|(_, v)| *v).collect();
        let average = mean(&anxiety).unwrap_or_default();
        let delta = weekly_delta(&anxiety_points);
        let rate = f64::from(resisted) / f64::from(total);

        let mut baselines = BTreeMap::new();
        baselines.insert("anxiety".to_string(), average);
        baselines.insert("resistance_rate".to_string(), rate);

        let recurring_triggers = recurring(triggers.iter().map(|(t, _)| *t));
        let mut patterns: Vec<Pattern> = recurring_triggers
            .iter()
            .map(|(name, occurrences)| {
                let matching: Vec<f64> = triggers
                    .iter()
                    .filter(|(t, _)| t.trim().eq_ignore_ascii_case(name))
                    .map(|(_, a)| *a)
                    .collect();
                Pattern::Trigger {
                    name: name.clone(),
                    occurrences: *occurrences,
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
        if let Some((name, occurrences)) = recurring_triggers.first() {
            insights.push(Insight::Therapeutic {
                title: format!("Most common trigger: {}", name),
                message: format!(
                    "\"{}\" appeared {} times. Tracking the compulsions that follow shows where resistance is growing.",
                    name, occurrences
                ),
                priority: InsightPriority::Medium,
                target: Domain::Tracking,
            });
        }
        if average >= HIGH_ANXIETY {
            insights.push(Insight::Therapeutic {
                title: "High anxiety around triggers".to_string(),
                message: "Anxiety has been running high. Checking in with your mood after exposures helps spot recovery time.".to_string(),
                priority: InsightPriority::High,
                target: Domain::Mood,
            });
        }
        if delta != 0.0 {
            insights.push(Insight::Progress {
                metric: "anxiety".to_string(),
                change: delta,
                message: format!("Average trigger anxiety changed by {:+.1} week over week", delta),
            });
        }

        Ok(AnalyzerOutput {
            insights,
            patterns,
            analytics: Analytics {
                domain: Domain::Ocd,
                sample_size: total,
                confidence: sample_confidence(total as usize),
                volatility: std_dev(&anxiety),
                weekly_delta: delta,
                data_quality: day_coverage(&records),
                baselines,
            },
        })
    }
}

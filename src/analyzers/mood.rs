//! Mood check-in analysis

use super::stats::{
    day_coverage, mean, recurring, sample_confidence, std_dev, temporal_pattern, trend,
    weekly_delta,
};
use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority, Pattern};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Average mood below this is flagged
const LOW_MOOD: f64 = 4.5;

/// Standard deviation above this is flagged as swings
const HIGH_VOLATILITY: f64 = 2.5;

/// Analyzer for daily mood entries
#[derive(Debug, Default, Clone, Copy)]
pub struct MoodAnalyzer;

struct MoodPoint<'a> {
    record: &'a DomainRecord,
    score: f64,
    energy: Option<f64>,
    anxiety: Option<f64>,
    triggers: &'a [String],
}

fn points<'a>(records: &[&'a DomainRecord]) -> Vec<MoodPoint<'a>> {
    records
        .iter()
        .copied()
        .filter_map(|record| match record {
            DomainRecord::Mood {
                mood_score,
                energy,
                anxiety,
                triggers,
                ..
            } => Some(MoodPoint {
                record,
                score: f64::from(*mood_score),
                energy: energy.map(f64::from),
                anxiety: anxiety.map(f64::from),
                triggers,
            }),
            _ => None,
        })
        .collect()
}

/// Share of optional fields filled in, blended with day coverage
fn data_quality(points: &[MoodPoint<'_>], records: &[&DomainRecord]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let completeness = points
        .iter()
        .map(|p| {
            let filled = [
                p.energy.is_some(),
                p.anxiety.is_some(),
                !p.triggers.is_empty(),
            ]
            .iter()
            .filter(|f| **f)
            .count();
            filled as f64 / 3.0
        })
        .sum::<f64>()
        / points.len() as f64;
    0.5 * completeness + 0.5 * day_coverage(records)
}

#[async_trait]
impl DomainAnalyzer for MoodAnalyzer {
    fn domain(&self) -> Domain {
        Domain::Mood
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let records = accepted(Domain::Mood, records);
        let points = points(&records);
        if points.is_empty() {
            return Ok(AnalyzerOutput::empty(Domain::Mood));
        }

        let scores: Vec<f64> = points.iter().map(|p| p.score).collect();
        let average = mean(&scores).unwrap_or_default();
        let volatility = std_dev(&scores);
        let delta = weekly_delta(
            &points
                .iter()
                .map(|p| (p.record.recorded_at(), p.score))
                .collect::<Vec<_>>(),
        );

        let mut baselines = BTreeMap::new();
        baselines.insert("mood".to_string(), average);
        let energy: Vec<f64> = points.iter().filter_map(|p| p.energy).collect();
        if let Some(avg) = mean(&energy) {
            baselines.insert("energy".to_string(), avg);
        }
        let anxiety: Vec<f64> = points.iter().filter_map(|p| p.anxiety).collect();
        if let Some(avg) = mean(&anxiety) {
            baselines.insert("anxiety".to_string(), avg);
        }

        let mut patterns = Vec::new();
        if let Some(temporal) = temporal_pattern(&records) {
            patterns.push(temporal);
        }
        for (name, occurrences) in recurring(
            points
                .iter()
                .flat_map(|p| p.triggers.iter().map(String::as_str)),
        ) {
            let with_trigger: Vec<f64> = points
                .iter()
                .filter(|p| p.triggers.iter().any(|t| t.trim().eq_ignore_ascii_case(&name)))
                .map(|p| p.score)
                .collect();
            patterns.push(Pattern::Trigger {
                name,
                occurrences,
                average_intensity: mean(&with_trigger).unwrap_or_default(),
            });
        }
        patterns.push(trend(delta));

        let mut insights = Vec::new();
        if average < LOW_MOOD {
            insights.push(Insight::Therapeutic {
                title: "Low mood period".to_string(),
                message: "Your mood has been lower than usual. A thought record can help untangle what is weighing on you.".to_string(),
                priority: InsightPriority::High,
                target: Domain::Cbt,
            });
        }
        if volatility > HIGH_VOLATILITY {
            insights.push(Insight::Therapeutic {
                title: "Mood swings".to_string(),
                message: "Your mood has been shifting a lot. Noting triggers with each check-in makes swings easier to understand.".to_string(),
                priority: InsightPriority::Medium,
                target: Domain::Mood,
            });
        }
        if delta != 0.0 {
            insights.push(Insight::Progress {
                metric: "mood".to_string(),
                change: delta,
                message: format!("Average mood changed by {:+.1} compared to the previous week", delta),
            });
        }

        Ok(AnalyzerOutput {
            insights,
            patterns,
            analytics: Analytics {
                domain: Domain::Mood,
                sample_size: points.len() as u32,
                confidence: sample_confidence(points.len()),
                volatility,
                weekly_delta: delta,
                data_quality: data_quality(&points, &records),
                baselines,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendDirection;
    use chrono::{Duration, TimeZone, Utc};

    fn mood(day: i64, score: u8, triggers: &[&str]) -> DomainRecord {
        DomainRecord::Mood {
            recorded_at: Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap() + Duration::days(day),
            mood_score: score,
            energy: Some(5),
            anxiety: Some(4),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_sample_size_counts_only_mood_records() {
        let mut records: Vec<DomainRecord> = (0..5).map(|d| mood(d, 6, &[])).collect();
        records.push(DomainRecord::Compulsion {
            recorded_at: Utc::now(),
            category: "checking".to_string(),
            intensity: 6,
            resisted: true,
        });

        let output = MoodAnalyzer.analyze(&records).await.unwrap();
        assert_eq!(output.analytics.sample_size, 5);
        assert_eq!(output.analytics.baselines["mood"], 6.0);
        assert_eq!(output.analytics.volatility, 0.0);
    }

    #[tokio::test]
    async fn test_improving_week_and_triggers() {
        let mut records: Vec<DomainRecord> = (0..7).map(|d| mood(d, 3, &["work"])).collect();
        records.extend((7..14).map(|d| mood(d, 7, &[])));

        let output = MoodAnalyzer.analyze(&records).await.unwrap();
        assert_eq!(output.analytics.sample_size, 14);
        assert!((output.analytics.weekly_delta - 4.0).abs() < 1e-9);
        assert!(output.patterns.iter().any(|p| matches!(
            p,
            Pattern::Trend { direction: TrendDirection::Improving, .. }
        )));
        assert!(output.patterns.iter().any(|p| matches!(
            p,
            Pattern::Trigger { name, occurrences: 7, .. } if name == "work"
        )));
        assert!(output
            .insights
            .iter()
            .any(|i| matches!(i, Insight::Progress { metric, .. } if metric == "mood")));
    }

    #[tokio::test]
    async fn test_low_mood_points_to_cbt() {
        let records: Vec<DomainRecord> = (0..4).map(|d| mood(d, 2, &[])).collect();
        let output = MoodAnalyzer.analyze(&records).await.unwrap();
        assert!(output.insights.iter().any(|i| matches!(
            i,
            Insight::Therapeutic { target: Domain::Cbt, priority: InsightPriority::High, .. }
        )));
        assert!(output.analytics.data_quality > 0.0 && output.analytics.data_quality <= 1.0);
    }
}

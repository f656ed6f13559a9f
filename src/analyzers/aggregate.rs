//! Cross-module "today" analysis
//!
//! Reads every record regardless of domain. The sample size is the total
//! record count so the aggregate view is classified against its own
//! thresholds rather than any single module's.

use super::stats::{day_coverage, mean, sample_confidence, std_dev, temporal_pattern};
use super::{accepted, AnalyzerOutput, DomainAnalyzer};
use crate::error::Result;
use crate::types::{Analytics, Domain, DomainRecord, Insight, InsightPriority, Pattern};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Average mood below which the aggregate view nudges toward CBT
const LOW_MOOD: f64 = 4.5;

/// Analyzer for the aggregate view
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateAnalyzer;

#[derive(Default)]
struct Tally {
    mood: Vec<f64>,
    thought_records: u32,
    compulsions: u32,
    compulsions_resisted: u32,
    ocd_logs: u32,
}

impl Tally {
    fn count(&self, domain: Domain) -> u32 {
        match domain {
            Domain::Mood => self.mood.len() as u32,
            Domain::Cbt => self.thought_records,
            Domain::Tracking => self.compulsions,
            Domain::Ocd => self.ocd_logs,
            Domain::Aggregate => 0,
        }
    }
}

#[async_trait]
impl DomainAnalyzer for AggregateAnalyzer {
    fn domain(&self) -> Domain {
        Domain::Aggregate
    }

    async fn analyze(&self, records: &[DomainRecord]) -> Result<AnalyzerOutput> {
        let records = accepted(Domain::Aggregate, records);
        if records.is_empty() {
            return Ok(AnalyzerOutput::empty(Domain::Aggregate));
        }

        let mut tally = Tally::default();
        for record in &records {
            match record {
                DomainRecord::Mood { mood_score, .. } => tally.mood.push(f64::from(*mood_score)),
                DomainRecord::ThoughtRecord { .. } => tally.thought_records += 1,
                DomainRecord::Compulsion { resisted, .. } => {
                    tally.compulsions += 1;
                    if *resisted {
                        tally.compulsions_resisted += 1;
                    }
                }
                DomainRecord::OcdPattern { .. } => tally.ocd_logs += 1,
            }
        }

        let modules = [Domain::Mood, Domain::Cbt, Domain::Tracking, Domain::Ocd];
        let mut baselines = BTreeMap::new();
        for domain in modules {
            baselines.insert(format!("{}_entries", domain.as_str()), f64::from(tally.count(domain)));
        }
        let average_mood = mean(&tally.mood);
        if let Some(avg) = average_mood {
            baselines.insert("mood".to_string(), avg);
        }

        let active = modules.iter().filter(|d| tally.count(**d) > 0).count();
        let balance = active as f64 / modules.len() as f64;

        let mut insights = Vec::new();
        if matches!(average_mood, Some(avg) if avg < LOW_MOOD) && tally.thought_records == 0 {
            insights.push(Insight::Therapeutic {
                title: "Pair low days with a thought record".to_string(),
                message: "Mood has been low and no thought records were written. A short one can help on the next hard day.".to_string(),
                priority: InsightPriority::High,
                target: Domain::Cbt,
            });
        }
        if tally.compulsions > 0 && tally.ocd_logs == 0 {
            insights.push(Insight::Therapeutic {
                title: "Connect urges to their triggers".to_string(),
                message: "Compulsions are being tracked without OCD trigger logs. Logging the trigger shows what sets urges off.".to_string(),
                priority: InsightPriority::Medium,
                target: Domain::Ocd,
            });
        }
        if tally.compulsions > 0 {
            let rate = f64::from(tally.compulsions_resisted) / f64::from(tally.compulsions);
            insights.push(Insight::Progress {
                metric: "resistance_rate".to_string(),
                change: rate,
                message: format!("{:.0}% of tracked urges were resisted", rate * 100.0),
            });
        }

        let mut patterns = Vec::new();
        if let Some(temporal) = temporal_pattern(&records) {
            patterns.push(temporal);
        }
        if tally.compulsions > 0 {
            patterns.push(Pattern::Resistance {
                resisted: tally.compulsions_resisted,
                total: tally.compulsions,
                rate: f64::from(tally.compulsions_resisted) / f64::from(tally.compulsions),
            });
        }

        let n = records.len();
        Ok(AnalyzerOutput {
            insights,
            patterns,
            analytics: Analytics {
                domain: Domain::Aggregate,
                sample_size: n as u32,
                confidence: sample_confidence(n),
                volatility: std_dev(&tally.mood),
                weekly_delta: 0.0,
                data_quality: 0.5 * balance + 0.5 * day_coverage(&records),
                baselines,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 3, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_counts_every_domain() {
        let records = vec![
            DomainRecord::Mood {
                recorded_at: at(8),
                mood_score: 3,
                energy: None,
                anxiety: None,
                triggers: vec![],
            },
            DomainRecord::Mood {
                recorded_at: at(9),
                mood_score: 4,
                energy: None,
                anxiety: None,
                triggers: vec![],
            },
            DomainRecord::Compulsion {
                recorded_at: at(10),
                category: "checking".to_string(),
                intensity: 5,
                resisted: true,
            },
        ];
        let output = AggregateAnalyzer.analyze(&records).await.unwrap();

        assert_eq!(output.analytics.sample_size, 3);
        assert_eq!(output.analytics.baselines["mood_entries"], 2.0);
        assert_eq!(output.analytics.baselines["tracking_entries"], 1.0);
        assert_eq!(output.analytics.baselines["cbt_entries"], 0.0);
        assert!(output.insights.iter().any(|i| matches!(
            i,
            Insight::Therapeutic { target: Domain::Cbt, .. }
        )));
        assert!(output.insights.iter().any(|i| matches!(
            i,
            Insight::Therapeutic { target: Domain::Ocd, .. }
        )));
    }
}

//! Small statistics helpers shared by the domain analyzers

use crate::types::{DomainRecord, Pattern, TimeOfDay, TrendDirection};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Change smaller than this is reported as stable
const TREND_EPSILON: f64 = 0.5;

/// Minimum share of records for a temporal cluster to count
const TEMPORAL_SHARE: f64 = 0.5;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation (0 for fewer than two values)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sigmoid confidence over sample count
///
/// - 0 samples → ~0.12
/// - 10 samples → 0.5
/// - 20 samples → ~0.88
pub fn sample_confidence(samples: usize) -> f64 {
    let x = (samples as f64 - 10.0) / 5.0;
    1.0 / (1.0 + (-x).exp())
}

/// Mean of the latest seven days minus the mean of the seven days before
///
/// Windows are anchored on the newest timestamp so the result is independent
/// of wall-clock time. Returns 0 when either window is empty.
pub fn weekly_delta(points: &[(DateTime<Utc>, f64)]) -> f64 {
    let Some(latest) = points.iter().map(|(at, _)| *at).max() else {
        return 0.0;
    };
    let week_start = latest - Duration::days(7);
    let prior_start = latest - Duration::days(14);

    let current: Vec<f64> = points
        .iter()
        .filter(|(at, _)| *at > week_start)
        .map(|(_, v)| *v)
        .collect();
    let prior: Vec<f64> = points
        .iter()
        .filter(|(at, _)| *at > prior_start && *at <= week_start)
        .map(|(_, v)| *v)
        .collect();

    match (mean(&current), mean(&prior)) {
        (Some(c), Some(p)) => c - p,
        _ => 0.0,
    }
}

/// Share of calendar days in the recorded span that have at least one record
pub fn day_coverage(records: &[&DomainRecord]) -> f64 {
    let days: BTreeSet<_> = records.iter().map(|r| r.recorded_at().date_naive()).collect();
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return 0.0;
    };
    let span = (*last - *first).num_days() + 1;
    days.len() as f64 / span.max(1) as f64
}

/// Trend of a metric where larger is better
pub fn trend(delta: f64) -> Pattern {
    let direction = if delta.abs() < TREND_EPSILON {
        TrendDirection::Stable
    } else if delta > 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    };
    Pattern::Trend {
        direction,
        magnitude: delta.abs(),
    }
}

/// Trend of a metric where smaller is better (urge intensity, anxiety)
pub fn inverse_trend(delta: f64) -> Pattern {
    trend(-delta)
}

/// Dominant part of the day, if records cluster in one
pub fn temporal_pattern(records: &[&DomainRecord]) -> Option<Pattern> {
    if records.len() < 3 {
        return None;
    }
    let mut buckets: BTreeMap<TimeOfDay, u32> = BTreeMap::new();
    for record in records {
        *buckets
            .entry(TimeOfDay::from_hour(record.recorded_at().hour()))
            .or_default() += 1;
    }
    let (period, occurrences) = buckets
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;
    let share = occurrences as f64 / records.len() as f64;
    (share >= TEMPORAL_SHARE).then_some(Pattern::Temporal {
        period,
        occurrences,
        share,
    })
}

/// Labels that occur at least twice, most frequent first
pub fn recurring<'a, I>(labels: I) -> Vec<(String, u32)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for label in labels {
        let label = label.trim().to_lowercase();
        if !label.is_empty() {
            *counts.entry(label).or_default() += 1;
        }
    }
    let mut recurring: Vec<(String, u32)> =
        counts.into_iter().filter(|(_, count)| *count >= 2).collect();
    recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    recurring
}

//! Core data types for the insight pipeline
//!
//! This module defines the request/result shapes that flow through the
//! pipeline: users, data domains, the domain records analyzers consume, and
//! the [`PipelineResult`] handed back to the UI. Result types serialize with
//! camelCase field names because the consuming UI reads them directly.

use crate::quality::QualityMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Identifier of the user whose data is analyzed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Data domain an insight is computed for
///
/// `Aggregate` is the cross-module "today" view that reads every other domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Mood,
    Cbt,
    Tracking,
    Ocd,
    Aggregate,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Mood => "mood",
            Domain::Cbt => "cbt",
            Domain::Tracking => "tracking",
            Domain::Ocd => "ocd",
            Domain::Aggregate => "aggregate",
        }
    }

    pub fn all() -> [Domain; 5] {
        [
            Domain::Mood,
            Domain::Cbt,
            Domain::Tracking,
            Domain::Ocd,
            Domain::Aggregate,
        ]
    }

    /// Whether a record belongs to this domain's analyzer input
    pub fn accepts(&self, record: &DomainRecord) -> bool {
        match self {
            Domain::Aggregate => true,
            other => record.domain() == *other,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mood" => Ok(Domain::Mood),
            "cbt" => Ok(Domain::Cbt),
            "tracking" => Ok(Domain::Tracking),
            "ocd" => Ok(Domain::Ocd),
            "aggregate" | "today" => Ok(Domain::Aggregate),
            other => Err(format!("unknown domain: {}", other)),
        }
    }
}

/// A single user-entered record
///
/// Records carry no storage identity: two records with equal field values are
/// the same record as far as fingerprinting is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainRecord {
    /// Daily mood check-in
    Mood {
        recorded_at: DateTime<Utc>,
        /// Mood on a 1..=10 scale
        mood_score: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        energy: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anxiety: Option<u8>,
        #[serde(default)]
        triggers: Vec<String>,
    },

    /// CBT thought record
    ThoughtRecord {
        recorded_at: DateTime<Utc>,
        #[serde(default)]
        distortions: Vec<String>,
        /// Mood intensity before reframing (0..=100)
        mood_before: u8,
        /// Mood intensity after reframing (0..=100)
        mood_after: u8,
    },

    /// Compulsion tracking entry
    Compulsion {
        recorded_at: DateTime<Utc>,
        category: String,
        /// Urge intensity on a 1..=10 scale
        intensity: u8,
        resisted: bool,
    },

    /// OCD pattern log entry
    OcdPattern {
        recorded_at: DateTime<Utc>,
        trigger: String,
        /// Anxiety on a 1..=10 scale
        anxiety_level: u8,
        resisted: bool,
    },
}

impl DomainRecord {
    pub fn domain(&self) -> Domain {
        match self {
            DomainRecord::Mood { .. } => Domain::Mood,
            DomainRecord::ThoughtRecord { .. } => Domain::Cbt,
            DomainRecord::Compulsion { .. } => Domain::Tracking,
            DomainRecord::OcdPattern { .. } => Domain::Ocd,
        }
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            DomainRecord::Mood { recorded_at, .. }
            | DomainRecord::ThoughtRecord { recorded_at, .. }
            | DomainRecord::Compulsion { recorded_at, .. }
            | DomainRecord::OcdPattern { recorded_at, .. } => *recorded_at,
        }
    }
}

/// Why the pipeline was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    ScreenFocus,
    PullToRefresh,
    EntrySaved,
    BackgroundTimer,
    Manual,
}

/// Invocation context (not part of the fingerprint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub trigger: TriggerReason,
    /// Epoch milliseconds at which the caller issued the request
    pub requested_at: i64,
}

/// One pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub user_id: UserId,
    pub domain: Domain,
    pub payload: Vec<DomainRecord>,
    pub context: RequestContext,
}

impl PipelineRequest {
    /// Request stamped with the wall clock
    ///
    /// Callers driving the pipeline from a [`Clock`](crate::clock::Clock)
    /// should restamp with [`requested_at`](Self::requested_at) so request
    /// and result timestamps share one timeline.
    pub fn new(
        user_id: UserId,
        domain: Domain,
        payload: Vec<DomainRecord>,
        trigger: TriggerReason,
    ) -> Self {
        Self {
            user_id,
            domain,
            payload,
            context: RequestContext {
                trigger,
                requested_at: Utc::now().timestamp_millis(),
            },
        }
    }

    pub fn requested_at(mut self, epoch_ms: i64) -> Self {
        self.context.requested_at = epoch_ms;
        self
    }
}

/// How the metadata of a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Computed by the domain analyzer for this request
    Fresh,
    /// Served from the result cache
    Cache,
    /// Degraded heuristic-only path, never cached
    Heuristic,
}

/// Severity of a therapeutic insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

/// Analyzer-produced insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Insight {
    /// Actionable therapeutic observation
    Therapeutic {
        title: String,
        message: String,
        priority: InsightPriority,
        /// Domain the insight recommends acting in
        target: Domain,
    },
    /// Measured change over time
    Progress {
        metric: String,
        /// Signed change between the previous and current week
        change: f64,
        message: String,
    },
}

/// Direction of a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Part of the day a temporal pattern concentrates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Detected temporal or clinical pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    /// Records cluster in a part of the day
    Temporal {
        period: TimeOfDay,
        occurrences: u32,
        /// Share of all records falling in `period`
        share: f64,
    },
    /// A trigger or category that recurs
    Trigger {
        name: String,
        occurrences: u32,
        average_intensity: f64,
    },
    /// Overall direction of the primary metric
    Trend {
        direction: TrendDirection,
        magnitude: f64,
    },
    /// Recurring cognitive distortion
    Distortion { name: String, occurrences: u32 },
    /// Resistance against compulsions/urges
    Resistance { resisted: u32, total: u32, rate: f64 },
}

/// Per-domain numeric summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub domain: Domain,
    /// Count of records that contributed to this result
    pub sample_size: u32,
    /// 0.0..=1.0
    pub confidence: f64,
    pub volatility: f64,
    pub weekly_delta: f64,
    /// 0.0..=1.0
    pub data_quality: f64,
    #[serde(default)]
    pub baselines: BTreeMap<String, f64>,
}

impl Analytics {
    /// Summary for an empty payload
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            sample_size: 0,
            confidence: 0.0,
            volatility: 0.0,
            weekly_delta: 0.0,
            data_quality: 0.0,
            baselines: BTreeMap::new(),
        }
    }
}

/// Bookkeeping attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub source: MetadataSource,
    /// Epoch milliseconds of the computation
    pub processed_at: i64,
    pub processing_time: u64,
    pub pipeline_version: String,
    /// TTL the result was cached with (0 when uncached)
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: u64,
}

/// Output of one pipeline invocation
///
/// Immutable once returned; a later computation produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub insights: Vec<Insight>,
    pub patterns: Vec<Pattern>,
    pub analytics: Analytics,
    pub metadata: ResultMetadata,
    /// Absent when the input was too sparse to classify; the ribbon is hidden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_metadata: Option<QualityMetadata>,
}

impl PipelineResult {
    pub fn domain(&self) -> Domain {
        self.analytics.domain
    }

    pub fn is_from_cache(&self) -> bool {
        self.metadata.source == MetadataSource::Cache
    }
}

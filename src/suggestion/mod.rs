//! Adaptive suggestion selection
//!
//! Turns a pipeline result into at most one suggestion, gated by a per-user
//! cooldown and snooze. The result's quality metadata is relayed onto the
//! suggestion untouched; a result without metadata yields a suggestion
//! without metadata, which the UI renders without a ribbon.

pub mod store;

pub use store::{
    CooldownKey, CooldownPurpose, CooldownRecord, CooldownStore, InMemoryCooldownStore,
    SqliteCooldownStore,
};

use crate::clock::Clock;
use crate::error::Result;
use crate::quality::QualityMetadata;
use crate::telemetry::{TelemetryKind, TelemetrySink};
use crate::types::{
    Domain, Insight, InsightPriority, Pattern, PipelineResult, TrendDirection, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default cooldown between two surfaced suggestions
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(4 * 60 * 60);

/// Suggestion content chosen by a heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionDraft {
    pub target: Domain,
    pub title: String,
    pub message: String,
    pub priority: InsightPriority,
}

/// Suggestion handed to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    /// Domain whose result produced the suggestion
    pub source_domain: Domain,
    /// Domain the user is invited to open
    pub target: Domain,
    pub title: String,
    pub message: String,
    pub priority: InsightPriority,
    /// Relayed verbatim from the pipeline result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetadata>,
}

impl Suggestion {
    pub fn is_cross_module(&self) -> bool {
        self.source_domain != self.target
    }
}

/// Domain-specific choice of what to suggest
#[cfg_attr(test, mockall::automock)]
pub trait SuggestionHeuristic: Send + Sync {
    fn suggest(&self, result: &PipelineResult, domain: Domain) -> Option<SuggestionDraft>;
}

/// Picks the most urgent therapeutic insight, preferring ones that point
/// at another module; falls back to a check-in prompt on a declining trend.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsightHeuristic;

impl SuggestionHeuristic for InsightHeuristic {
    fn suggest(&self, result: &PipelineResult, domain: Domain) -> Option<SuggestionDraft> {
        let best = result
            .insights
            .iter()
            .filter_map(|insight| match insight {
                Insight::Therapeutic {
                    title,
                    message,
                    priority,
                    target,
                } => Some((title, message, *priority, *target)),
                Insight::Progress { .. } => None,
            })
            .max_by_key(|(_, _, priority, target)| (*priority, *target != domain));

        if let Some((title, message, priority, target)) = best {
            return Some(SuggestionDraft {
                target,
                title: title.clone(),
                message: message.clone(),
                priority,
            });
        }

        let declining = result.patterns.iter().any(|p| {
            matches!(
                p,
                Pattern::Trend {
                    direction: TrendDirection::Declining,
                    ..
                }
            )
        });
        declining.then(|| SuggestionDraft {
            target: domain,
            title: "Things have been harder lately".to_string(),
            message: "A quick check-in can help you notice what changed this week.".to_string(),
            priority: InsightPriority::Medium,
        })
    }
}

/// Cooldown-gated suggestion selector
pub struct AdaptiveSuggestionSelector {
    store: Arc<dyn CooldownStore>,
    heuristic: Arc<dyn SuggestionHeuristic>,
    telemetry: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    purpose: CooldownPurpose,
}

impl AdaptiveSuggestionSelector {
    pub fn new(
        store: Arc<dyn CooldownStore>,
        telemetry: Arc<dyn TelemetrySink>,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            heuristic: Arc::new(InsightHeuristic),
            telemetry,
            clock,
            cooldown,
            purpose: CooldownPurpose::CrossModuleSuggestion,
        }
    }

    pub fn with_heuristic(mut self, heuristic: Arc<dyn SuggestionHeuristic>) -> Self {
        self.heuristic = heuristic;
        self
    }

    fn key(&self, user_id: &UserId) -> CooldownKey {
        CooldownKey::new(user_id.clone(), self.purpose)
    }

    /// Pick a suggestion for `result`, or `None`
    ///
    /// While the user is cooling down or snoozed the heuristic is not
    /// consulted. A cooldown store that cannot be read suppresses the
    /// suggestion.
    pub async fn select_suggestion(
        &self,
        user_id: &UserId,
        result: &PipelineResult,
        domain: Domain,
    ) -> Option<Suggestion> {
        let key = self.key(user_id);
        let now = self.clock.now_ms();

        let record = match self.store.get(&key).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Cooldown lookup failed for user {}: {}", user_id, e);
                return None;
            }
        };

        if let Some(reason) = self.suppression(&record, now) {
            debug!("Suggestion suppressed for user {}: {}", user_id, reason);
            self.telemetry.record(
                TelemetryKind::SuggestionSuppressed,
                json!({ "domain": domain.as_str(), "reason": reason }),
                user_id,
            );
            return None;
        }

        let draft = self.heuristic.suggest(result, domain)?;
        let suggestion = Suggestion {
            id: Uuid::new_v4().to_string(),
            source_domain: domain,
            target: draft.target,
            title: draft.title,
            message: draft.message,
            priority: draft.priority,
            quality: result.quality_metadata.clone(),
        };

        let updated = CooldownRecord {
            last_suggested_at: Some(now),
            ..record
        };
        if let Err(e) = self.store.set(&key, updated).await {
            warn!("Failed to record cooldown for user {}: {}", user_id, e);
        }

        self.telemetry.record(
            TelemetryKind::SuggestionSurfaced,
            json!({
                "domain": domain.as_str(),
                "target": suggestion.target.as_str(),
                "hasQuality": suggestion.quality.is_some(),
            }),
            user_id,
        );
        Some(suggestion)
    }

    /// Hide suggestions until `until_ms`
    pub async fn snooze(&self, user_id: &UserId, until_ms: i64) -> Result<()> {
        let key = self.key(user_id);
        let record = self.store.get(&key).await?;
        self.store
            .set(
                &key,
                CooldownRecord {
                    snooze_until: Some(until_ms),
                    ..record
                },
            )
            .await
    }

    /// Dismiss the current suggestion; restarts the cooldown window
    pub async fn dismiss(&self, user_id: &UserId) -> Result<()> {
        let key = self.key(user_id);
        let record = self.store.get(&key).await?;
        self.store
            .set(
                &key,
                CooldownRecord {
                    last_suggested_at: Some(self.clock.now_ms()),
                    ..record
                },
            )
            .await
    }

    fn suppression(&self, record: &CooldownRecord, now: i64) -> Option<&'static str> {
        if let Some(until) = record.snooze_until {
            if now < until {
                return Some("snoozed");
            }
        }
        if let Some(last) = record.last_suggested_at {
            if now.saturating_sub(last) < self.cooldown.as_millis() as i64 {
                return Some("cooldown");
            }
        }
        None
    }
}

//! Telemetry sinks
//!
//! Recording is fire-and-forget: [`TelemetrySink::record`] is synchronous,
//! returns nothing and must not block, so no caller can fail because of it.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;
use tracing::info;

/// Kind of telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryKind {
    CacheInvalidation,
    PipelineCompleted,
    PipelineError,
    DegradedResult,
    SuggestionSurfaced,
    SuggestionSuppressed,
}

impl TelemetryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryKind::CacheInvalidation => "CACHE_INVALIDATION",
            TelemetryKind::PipelineCompleted => "PIPELINE_COMPLETED",
            TelemetryKind::PipelineError => "PIPELINE_ERROR",
            TelemetryKind::DegradedResult => "DEGRADED_RESULT",
            TelemetryKind::SuggestionSurfaced => "SUGGESTION_SURFACED",
            TelemetryKind::SuggestionSuppressed => "SUGGESTION_SUPPRESSED",
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub kind: TelemetryKind,
    pub user_id: UserId,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind, payload: Value, user_id: &UserId) -> Self {
        Self {
            kind,
            user_id: user_id.clone(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for telemetry records
pub trait TelemetrySink: Send + Sync {
    fn record(&self, kind: TelemetryKind, payload: Value, user_id: &UserId);
}

/// Emits each record as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, kind: TelemetryKind, payload: Value, user_id: &UserId) {
        info!(kind = kind.as_str(), user_id = %user_id, payload = %payload, "telemetry");
    }
}

/// Publishes records to in-process subscribers
///
/// Records sent while nobody is subscribed are dropped. Slow subscribers
/// lag rather than block the sender.
#[derive(Debug, Clone)]
pub struct BroadcastTelemetry {
    tx: broadcast::Sender<TelemetryEvent>,
}

impl BroadcastTelemetry {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastTelemetry {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TelemetrySink for BroadcastTelemetry {
    fn record(&self, kind: TelemetryKind, payload: Value, user_id: &UserId) {
        // Err only means there are no receivers
        let _ = self.tx.send(TelemetryEvent::new(kind, payload, user_id));
    }
}

/// Fan out to several sinks
#[derive(Default)]
pub struct CompositeTelemetry {
    sinks: Vec<std::sync::Arc<dyn TelemetrySink>>,
}

impl CompositeTelemetry {
    pub fn new(sinks: Vec<std::sync::Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for CompositeTelemetry {
    fn record(&self, kind: TelemetryKind, payload: Value, user_id: &UserId) {
        for sink in &self.sinks {
            sink.record(kind, payload.clone(), user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TelemetryKind::CacheInvalidation).unwrap(),
            "\"CACHE_INVALIDATION\""
        );
        assert_eq!(TelemetryKind::PipelineError.to_string(), "PIPELINE_ERROR");
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_fail() {
        let telemetry = BroadcastTelemetry::default();
        telemetry.record(TelemetryKind::PipelineCompleted, json!({}), &UserId::new("u"));
        assert_eq!(telemetry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscriber() {
        let telemetry = BroadcastTelemetry::new(8);
        let mut rx = telemetry.subscribe();

        telemetry.record(
            TelemetryKind::CacheInvalidation,
            json!({"event": "mood_added"}),
            &UserId::new("u1"),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, TelemetryKind::CacheInvalidation);
        assert_eq!(event.user_id.as_str(), "u1");
        assert_eq!(event.payload["event"], "mood_added");
    }

    #[tokio::test]
    async fn test_composite_fans_out() {
        let a = Arc::new(BroadcastTelemetry::new(4));
        let b = Arc::new(BroadcastTelemetry::new(4));
        let mut rx_a = a.subscribe();
        let mut rx_b = b.subscribe();
        let sinks: Vec<Arc<dyn TelemetrySink>> = vec![a.clone(), b.clone(), Arc::new(TracingTelemetry)];
        let composite = CompositeTelemetry::new(sinks);

        composite.record(TelemetryKind::DegradedResult, json!(null), &UserId::new("u"));

        assert_eq!(rx_a.recv().await.unwrap().kind, TelemetryKind::DegradedResult);
        assert_eq!(rx_b.recv().await.unwrap().kind, TelemetryKind::DegradedResult);
    }
}

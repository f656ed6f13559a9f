//! Cache invalidation on domain mutations
//!
//! [`InvalidationCoordinator::trigger_invalidation`] deletes the cache
//! entries a mutation makes stale, optionally asks a remote mirror to do the
//! same, and always records a `CACHE_INVALIDATION` telemetry event. Local
//! deletion failures and remote failures are logged and reported, never
//! returned as errors. A scope whose local deletion failed is fenced in the
//! cache, so the stale entries it still holds are never served.

use crate::cache::ResultCache;
use crate::error::{Result, RibbonError};
use crate::fingerprint::Fingerprint;
use crate::telemetry::{TelemetryKind, TelemetrySink};
use crate::types::{Domain, UserId};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Domain mutation that makes cached results stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationEvent {
    MoodAdded,
    CbtRecordAdded,
    CompulsionAdded,
    OcdPatternAdded,
    ManualRefresh,
    DataCleared,
}

impl InvalidationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationEvent::MoodAdded => "mood_added",
            InvalidationEvent::CbtRecordAdded => "cbt_record_added",
            InvalidationEvent::CompulsionAdded => "compulsion_added",
            InvalidationEvent::OcdPatternAdded => "ocd_pattern_added",
            InvalidationEvent::ManualRefresh => "manual_refresh",
            InvalidationEvent::DataCleared => "data_cleared",
        }
    }

    pub fn all() -> [InvalidationEvent; 6] {
        [
            InvalidationEvent::MoodAdded,
            InvalidationEvent::CbtRecordAdded,
            InvalidationEvent::CompulsionAdded,
            InvalidationEvent::OcdPatternAdded,
            InvalidationEvent::ManualRefresh,
            InvalidationEvent::DataCleared,
        ]
    }

    /// Domains whose cached results this event makes stale
    ///
    /// Every entry event also affects the aggregate view.
    pub fn affected_domains(&self) -> Vec<Domain> {
        match self {
            InvalidationEvent::MoodAdded => vec![Domain::Mood, Domain::Aggregate],
            InvalidationEvent::CbtRecordAdded => vec![Domain::Cbt, Domain::Aggregate],
            InvalidationEvent::CompulsionAdded => vec![Domain::Tracking, Domain::Aggregate],
            InvalidationEvent::OcdPatternAdded => vec![Domain::Ocd, Domain::Aggregate],
            InvalidationEvent::ManualRefresh | InvalidationEvent::DataCleared => {
                Domain::all().to_vec()
            }
        }
    }

    /// Whether the event clears the user's whole cache
    pub fn is_user_wide(&self) -> bool {
        matches!(
            self,
            InvalidationEvent::ManualRefresh | InvalidationEvent::DataCleared
        )
    }
}

impl fmt::Display for InvalidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvalidationEvent {
    type Err = RibbonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| RibbonError::InvalidInput(format!("unknown invalidation event: {}", s)))
    }
}

/// Best-effort remote cache clear
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteCacheMirror: Send + Sync {
    /// Delete every remote entry whose key starts with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;
}

/// Remote mirror reached over HTTP
///
/// Issues `DELETE {base_url}/cache?prefix=<prefix>`.
pub struct HttpCacheMirror {
    client: Client,
    base_url: String,
}

impl HttpCacheMirror {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("quality-ribbon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RibbonError::RemoteMirror(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RemoteCacheMirror for HttpCacheMirror {
    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let url = format!("{}/cache", self.base_url);
        debug!("Remote cache delete: {} prefix={}", url, prefix);

        let response = self
            .client
            .delete(&url)
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|e| RibbonError::RemoteMirror(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RibbonError::RemoteMirror(format!(
                "remote cache returned status: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Outcome of one invalidation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationReport {
    pub event: InvalidationEvent,
    pub user_id: UserId,
    pub domains: Vec<Domain>,
    /// Local entries deleted
    pub removed: usize,
    /// Local deletions that failed (logged)
    pub local_errors: usize,
    /// `None` without a mirror, otherwise whether every remote call succeeded
    pub remote_cleared: Option<bool>,
}

/// Deletes stale results when domain data changes
pub struct InvalidationCoordinator {
    cache: Arc<ResultCache>,
    telemetry: Arc<dyn TelemetrySink>,
    mirror: Option<Arc<dyn RemoteCacheMirror>>,
}

impl InvalidationCoordinator {
    pub fn new(cache: Arc<ResultCache>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            cache,
            telemetry,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn RemoteCacheMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Invalidate the entries `event` makes stale for `user_id`
    ///
    /// Idempotent. Emits telemetry even when nothing was deleted.
    pub async fn trigger_invalidation(
        &self,
        event: InvalidationEvent,
        user_id: &UserId,
    ) -> InvalidationReport {
        let domains = event.affected_domains();
        let mut removed = 0;
        let mut local_errors = 0;

        if event.is_user_wide() {
            match self.cache.delete_by_user(user_id).await {
                Ok(n) => removed += n,
                Err(e) => {
                    local_errors += 1;
                    warn!("Failed to clear cache for user {}, fencing: {}", user_id, e);
                    self.cache.fence_user(user_id);
                }
            }
        } else {
            for domain in &domains {
                match self.cache.delete_by_domain(user_id, *domain).await {
                    Ok(n) => removed += n,
                    Err(e) => {
                        local_errors += 1;
                        warn!(
                            "Failed to clear {} cache for user {}, fencing: {}",
                            domain, user_id, e
                        );
                        self.cache.fence_domain(user_id, *domain);
                    }
                }
            }
        }

        let remote_cleared = match &self.mirror {
            Some(mirror) => Some(self.clear_remote(mirror.as_ref(), event, user_id, &domains).await),
            None => None,
        };

        info!(
            "Invalidated {} cache entries for user {} on {}",
            removed, user_id, event
        );

        self.telemetry.record(
            TelemetryKind::CacheInvalidation,
            json!({
                "event": event.as_str(),
                "domains": domains.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                "removed": removed,
                "localErrors": local_errors,
                "remoteCleared": remote_cleared,
            }),
            user_id,
        );

        InvalidationReport {
            event,
            user_id: user_id.clone(),
            domains,
            removed,
            local_errors,
            remote_cleared,
        }
    }

    async fn clear_remote(
        &self,
        mirror: &dyn RemoteCacheMirror,
        event: InvalidationEvent,
        user_id: &UserId,
        domains: &[Domain],
    ) -> bool {
        let prefixes: Vec<String> = if event.is_user_wide() {
            vec![Fingerprint::user_prefix(user_id)]
        } else {
            domains
                .iter()
                .map(|d| Fingerprint::domain_prefix(user_id, *d))
                .collect()
        };

        let mut cleared = true;
        for prefix in prefixes {
            if let Err(e) = mirror.delete_prefix(&prefix).await {
                cleared = false;
                warn!("Remote cache clear failed for {}: {}", prefix, e);
            }
        }
        cleared
    }
}

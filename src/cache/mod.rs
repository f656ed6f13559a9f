//! Result cache with per-entry TTL
//!
//! [`ResultCache`] maps a [`Fingerprint`] to a previously computed
//! [`PipelineResult`]. The TTL is supplied by the caller at write time. An
//! entry older than its TTL is never returned: it is treated as absent and
//! lazily evicted on the read that observed it.
//!
//! Caching is an optimization. Backend read failures are reported as misses
//! and write failures as "not cached"; neither reaches the caller as an error.
//! Deletions used by invalidation do propagate so the coordinator can log
//! them. When a deletion fails the coordinator fences the scope instead:
//! entries of that user (or user and domain) written at or before the fence
//! are treated as absent from then on, even though they are still stored.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCacheBackend;
pub use sqlite::SqliteCacheBackend;

use crate::clock::{elapsed_ms, Clock};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::types::{Domain, PipelineResult, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Stored cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: PipelineResult,
    /// Epoch milliseconds of the write
    pub written_at: i64,
    pub ttl_ms: u64,
}

impl CacheEntry {
    pub fn age_ms(&self, now: i64) -> u64 {
        elapsed_ms(now, self.written_at)
    }

    /// Expired once strictly older than the TTL
    pub fn is_expired(&self, now: i64) -> bool {
        self.age_ms(now) > self.ttl_ms
    }
}

/// Storage behind the result cache
///
/// Implementations must make each call atomic per key: a `load` never
/// observes a half-written entry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Load the entry for a fingerprint, expired or not
    async fn load(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry (last write wins)
    async fn store(&self, entry: CacheEntry) -> Result<()>;

    /// Remove an entry unconditionally
    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Remove an entry only if it is still the write observed at `written_at`
    ///
    /// Used for lazy eviction so a concurrent fresh write is not discarded.
    async fn remove_if_written_at(&self, fingerprint: &Fingerprint, written_at: i64)
        -> Result<bool>;

    /// Remove every entry of a user
    async fn remove_user(&self, user_id: &UserId) -> Result<usize>;

    /// Remove every entry of a user in one domain
    async fn remove_domain(&self, user_id: &UserId, domain: Domain) -> Result<usize>;

    /// Number of stored entries, including expired ones not yet evicted
    async fn len(&self) -> Result<usize>;
}

/// A cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub result: PipelineResult,
    /// Age at the time of the read
    pub age_ms: u64,
}

/// Counters for cache behaviour
#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    writes: AtomicU64,
    backend_errors: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub writes: u64,
    pub backend_errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL-bounded result cache over a pluggable backend
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
    /// Write-time fences keyed by user and optional domain (`None` = whole user)
    fences: Mutex<HashMap<(UserId, Option<Domain>), i64>>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            metrics: CacheMetrics::default(),
            fences: Mutex::new(HashMap::new()),
        }
    }

    /// Read a live entry
    ///
    /// Returns `None` when there is no entry, when the entry is older than its
    /// TTL (and evicts it), or when the backend failed.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CachedResult> {
        let entry = match self.backend.load(fingerprint).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss: {}", fingerprint);
                return None;
            }
            Err(e) => {
                self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                warn!("Cache read failed for {}, treating as miss: {}", fingerprint, e);
                return None;
            }
        };

        if self.is_fenced(&entry) {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache entry fenced by failed invalidation: {}", fingerprint);
            return None;
        }

        let now = self.clock.now_ms();
        if entry.is_expired(now) {
            self.metrics.expired.fetch_add(1, Ordering::Relaxed);
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Cache entry expired: {} (age {}ms > ttl {}ms)",
                fingerprint,
                entry.age_ms(now),
                entry.ttl_ms
            );
            if let Err(e) = self
                .backend
                .remove_if_written_at(fingerprint, entry.written_at)
                .await
            {
                self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to evict expired entry {}: {}", fingerprint, e);
            }
            return None;
        }

        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache hit: {}", fingerprint);
        Some(CachedResult {
            age_ms: entry.age_ms(now),
            result: entry.result,
        })
    }

    /// Write a result, replacing any previous entry
    ///
    /// Returns the write timestamp, or `None` when the backend rejected the
    /// write (the caller proceeds uncached).
    pub async fn put(
        &self,
        fingerprint: Fingerprint,
        result: PipelineResult,
        ttl: Duration,
    ) -> Option<i64> {
        let written_at = self.clock.now_ms();
        let entry = CacheEntry {
            fingerprint,
            result,
            written_at,
            ttl_ms: ttl.as_millis() as u64,
        };
        let key = entry.fingerprint.key();

        match self.backend.store(entry).await {
            Ok(()) => {
                self.metrics.writes.fetch_add(1, Ordering::Relaxed);
                debug!("Cached result {} (ttl {}ms)", key, ttl.as_millis());
                Some(written_at)
            }
            Err(e) => {
                self.metrics.backend_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Cache write failed for {}, continuing uncached: {}", key, e);
                None
            }
        }
    }

    /// Delete a single entry
    pub async fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.backend.remove(fingerprint).await
    }

    /// Delete every entry of a user
    pub async fn delete_by_user(&self, user_id: &UserId) -> Result<usize> {
        self.backend.remove_user(user_id).await
    }

    /// Delete every entry of a user in one domain
    pub async fn delete_by_domain(&self, user_id: &UserId, domain: Domain) -> Result<usize> {
        self.backend.remove_domain(user_id, domain).await
    }

    /// Hide every entry of a user written up to now
    ///
    /// Fallback for a failed [`delete_by_user`](Self::delete_by_user).
    pub fn fence_user(&self, user_id: &UserId) {
        self.fence(user_id.clone(), None);
    }

    /// Hide every entry of a user in one domain written up to now
    pub fn fence_domain(&self, user_id: &UserId, domain: Domain) {
        self.fence(user_id.clone(), Some(domain));
    }

    fn fence(&self, user_id: UserId, domain: Option<Domain>) {
        let now = self.clock.now_ms();
        let mut fences = self.fences.lock().unwrap_or_else(|e| e.into_inner());
        let at = fences.entry((user_id, domain)).or_insert(now);
        *at = (*at).max(now);
    }

    fn is_fenced(&self, entry: &CacheEntry) -> bool {
        let fences = self.fences.lock().unwrap_or_else(|e| e.into_inner());
        if fences.is_empty() {
            return false;
        }
        let user_id = entry.fingerprint.user_id().clone();
        let domain = entry.fingerprint.domain();
        [(user_id.clone(), None), (user_id, Some(domain))]
            .iter()
            .filter_map(|scope| fences.get(scope))
            .any(|fenced_at| entry.written_at <= *fenced_at)
    }

    pub async fn len(&self) -> usize {
        self.backend.len().await.unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            expired: self.metrics.expired.load(Ordering::Relaxed),
            writes: self.metrics.writes.load(Ordering::Relaxed),
            backend_errors: self.metrics.backend_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::RibbonError;
    use crate::types::{Analytics, MetadataSource, ResultMetadata};

    pub fn result(domain: Domain, sample_size: u32) -> PipelineResult {
        let mut analytics = Analytics::empty(domain);
        analytics.sample_size = sample_size;
        PipelineResult {
            insights: vec![],
            patterns: vec![],
            analytics,
            metadata: ResultMetadata {
                source: MetadataSource::Fresh,
                processed_at: 0,
                processing_time: 0,
                pipeline_version: "test".to_string(),
                cache_ttl: 0,
            },
            quality_metadata: None,
        }
    }

    /// Backend that fails every call
    pub struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn load(&self, _: &Fingerprint) -> Result<Option<CacheEntry>> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn store(&self, _: CacheEntry) -> Result<()> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn remove(&self, _: &Fingerprint) -> Result<bool> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn remove_if_written_at(&self, _: &Fingerprint, _: i64) -> Result<bool> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn remove_user(&self, _: &UserId) -> Result<usize> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn remove_domain(&self, _: &UserId, _: Domain) -> Result<usize> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
        async fn len(&self) -> Result<usize> {
            Err(RibbonError::CacheBackend("disk unavailable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{result, BrokenBackend};
    use super::*;
    use crate::clock::ManualClock;
    use crate::fingerprint::fingerprint;

    fn setup() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = ResultCache::new(Arc::new(MemoryCacheBackend::new(64)), clock.clone());
        (cache, clock)
    }

    fn fp(user: &str, domain: Domain) -> Fingerprint {
        fingerprint(&UserId::from(user), domain, &[], "1").unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (cache, clock) = setup();
        let key = fp("u1", Domain::Mood);
        cache
            .put(key.clone(), result(Domain::Mood, 3), Duration::from_millis(5_000))
            .await
            .unwrap();

        clock.advance(1_200);
        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.age_ms, 1_200);
        assert_eq!(hit.result.analytics.sample_size, 3);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let (cache, clock) = setup();
        let key = fp("u1", Domain::Mood);
        cache
            .put(key.clone(), result(Domain::Mood, 3), Duration::from_millis(5_000))
            .await
            .unwrap();

        clock.advance(5_000);
        assert!(cache.get(&key).await.is_some(), "age == ttl is still live");

        clock.advance(1);
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.len().await, 0, "expired entry is evicted on read");
        assert_eq!(cache.stats().expired, 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (cache, _clock) = setup();
        let key = fp("u1", Domain::Mood);
        let ttl = Duration::from_secs(60);
        cache.put(key.clone(), result(Domain::Mood, 3), ttl).await;
        cache.put(key.clone(), result(Domain::Mood, 9), ttl).await;
        assert_eq!(cache.get(&key).await.unwrap().result.analytics.sample_size, 9);
    }

    #[tokio::test]
    async fn test_delete_by_domain_and_user() {
        let (cache, _clock) = setup();
        let ttl = Duration::from_secs(60);
        for domain in Domain::all() {
            cache.put(fp("u1", domain), result(domain, 1), ttl).await;
        }
        cache.put(fp("u2", Domain::Mood), result(Domain::Mood, 1), ttl).await;

        let removed = cache
            .delete_by_domain(&UserId::from("u1"), Domain::Mood)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get(&fp("u1", Domain::Mood)).await.is_none());
        assert!(cache.get(&fp("u2", Domain::Mood)).await.is_some());

        let removed = cache.delete_by_user(&UserId::from("u1")).await.unwrap();
        assert_eq!(removed, 4);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_miss() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ResultCache::new(Arc::new(BrokenBackend), clock);
        let key = fp("u1", Domain::Mood);

        assert!(cache
            .put(key.clone(), result(Domain::Mood, 1), Duration::from_secs(1))
            .await
            .is_none());
        assert!(cache.get(&key).await.is_none());
        assert!(cache.delete_by_user(&UserId::from("u1")).await.is_err());

        let stats = cache.stats();
        assert_eq!(stats.backend_errors, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_delete_single_entry() {
        let (cache, _clock) = setup();
        let ttl = Duration::from_secs(60);
        let mood = fp("u1", Domain::Mood);
        cache.put(mood.clone(), result(Domain::Mood, 2), ttl).await;
        cache.put(fp("u1", Domain::Cbt), result(Domain::Cbt, 2), ttl).await;

        assert!(cache.delete(&mood).await.unwrap());
        assert!(cache.get(&mood).await.is_none());
        assert!(!cache.delete(&mood).await.unwrap());
        assert!(cache.get(&fp("u1", Domain::Cbt)).await.is_some());
    }

    #[tokio::test]
    async fn test_fence_hides_older_writes_only() {
        let (cache, clock) = setup();
        let ttl = Duration::from_secs(60);
        let mood = fp("u1", Domain::Mood);
        let cbt = fp("u1", Domain::Cbt);
        cache.put(mood.clone(), result(Domain::Mood, 2), ttl).await;
        cache.put(cbt.clone(), result(Domain::Cbt, 2), ttl).await;
        cache.put(fp("u2", Domain::Mood), result(Domain::Mood, 2), ttl).await;

        cache.fence_domain(&UserId::from("u1"), Domain::Mood);
        assert!(cache.get(&mood).await.is_none());
        assert!(cache.get(&cbt).await.is_some());
        assert!(cache.get(&fp("u2", Domain::Mood)).await.is_some());

        clock.advance(1);
        cache.put(mood.clone(), result(Domain::Mood, 4), ttl).await;
        assert_eq!(cache.get(&mood).await.unwrap().result.analytics.sample_size, 4);

        cache.fence_user(&UserId::from("u1"));
        assert!(cache.get(&mood).await.is_none());
        assert!(cache.get(&cbt).await.is_none());
    }
}

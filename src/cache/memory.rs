//! In-memory cache backend
//!
//! A bounded LRU map. Capacity only limits memory use; TTL visibility is
//! enforced by [`ResultCache`](super::ResultCache).

use super::{CacheBackend, CacheEntry};
use crate::error::{Result, RibbonError};
use crate::fingerprint::Fingerprint;
use crate::types::{Domain, UserId};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// Default number of entries kept in memory
pub const DEFAULT_CAPACITY: usize = 512;

/// LRU-bounded in-process backend
pub struct MemoryCacheBackend {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
}

impl MemoryCacheBackend {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<Fingerprint, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|e| RibbonError::CacheBackend(format!("cache lock poisoned: {}", e)))
    }

    fn remove_matching<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&Fingerprint) -> bool,
    {
        let mut entries = self.lock()?;
        let doomed: Vec<Fingerprint> = entries
            .iter()
            .filter(|(fingerprint, _)| predicate(fingerprint))
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();
        for fingerprint in &doomed {
            entries.pop(fingerprint);
        }
        Ok(doomed.len())
    }
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn load(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        Ok(self.lock()?.get(fingerprint).cloned())
    }

    async fn store(&self, entry: CacheEntry) -> Result<()> {
        self.lock()?.put(entry.fingerprint.clone(), entry);
        Ok(())
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.lock()?.pop(fingerprint).is_some())
    }

    async fn remove_if_written_at(
        &self,
        fingerprint: &Fingerprint,
        written_at: i64,
    ) -> Result<bool> {
        let mut entries = self.lock()?;
        let matches = entries
            .peek(fingerprint)
            .map(|entry| entry.written_at == written_at)
            .unwrap_or(false);
        if matches {
            entries.pop(fingerprint);
        }
        Ok(matches)
    }

    async fn remove_user(&self, user_id: &UserId) -> Result<usize> {
        self.remove_matching(|fingerprint| fingerprint.user_id() == user_id)
    }

    async fn remove_domain(&self, user_id: &UserId, domain: Domain) -> Result<usize> {
        self.remove_matching(|fingerprint| {
            fingerprint.user_id() == user_id && fingerprint.domain() == domain
        })
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

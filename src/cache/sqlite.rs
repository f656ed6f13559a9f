//! SQLite cache backend
//!
//! Persists cache entries as JSON rows so cached insights survive an app
//! restart. Every operation is a single statement, which gives the per-key
//! atomicity the cache requires.

use super::{CacheBackend, CacheEntry};
use crate::error::{Result, RibbonError};
use crate::fingerprint::Fingerprint;
use crate::storage::{connection, interact_error, open_pool};
use crate::types::{Domain, PipelineResult, UserId};
use async_trait::async_trait;
use deadpool_sqlite::Pool;
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS result_cache (
    cache_key TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    domain TEXT NOT NULL,
    digest TEXT NOT NULL,
    written_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL,
    result TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_result_cache_user_domain ON result_cache (user_id, domain);";

/// Result cache persisted in a SQLite file
pub struct SqliteCacheBackend {
    pool: Pool,
}

impl SqliteCacheBackend {
    /// Open (and create if missing) the cache table in `db_path`
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let pool = open_pool(db_path)?;
        let conn = connection(&pool).await?;
        conn.interact(|conn| -> Result<()> {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(interact_error)??;

        info!("SQLite result cache ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheBackend {
    async fn load(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        let key = fingerprint.key();
        let conn = connection(&self.pool).await?;
        let row = conn
            .interact(move |conn| -> Result<Option<(i64, i64, String)>> {
                let mut stmt = conn.prepare(
                    "SELECT written_at, ttl_ms, result FROM result_cache WHERE cache_key = ?",
                )?;
                let row = stmt.query_row(rusqlite::params![key], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                });
                match row {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(interact_error)??;

        let Some((written_at, ttl_ms, json)) = row else {
            return Ok(None);
        };
        let result: PipelineResult = serde_json::from_str(&json)
            .map_err(|e| RibbonError::CacheBackend(format!("corrupt cache row: {}", e)))?;

        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            result,
            written_at,
            ttl_ms: ttl_ms.max(0) as u64,
        }))
    }

    async fn store(&self, entry: CacheEntry) -> Result<()> {
        let json = serde_json::to_string(&entry.result)?;
        let key = entry.fingerprint.key();
        let user_id = entry.fingerprint.user_id().to_string();
        let domain = entry.fingerprint.domain().as_str();
        let digest = entry.fingerprint.digest().to_string();
        let written_at = entry.written_at;
        let ttl_ms = entry.ttl_ms as i64;

        debug!("Persisting cache entry: {}", key);
        let conn = connection(&self.pool).await?;
        conn.interact(move |conn| -> Result<()> {
            conn.execute(
                "INSERT OR REPLACE INTO result_cache
                 (cache_key, user_id, domain, digest, written_at, ttl_ms, result)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![key, user_id, domain, digest, written_at, ttl_ms, json],
            )?;
            Ok(())
        })
        .await
        .map_err(interact_error)?
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let key = fingerprint.key();
        let conn = connection(&self.pool).await?;
        let removed = conn
            .interact(move |conn| -> Result<usize> {
                Ok(conn.execute(
                    "DELETE FROM result_cache WHERE cache_key = ?",
                    rusqlite::params![key],
                )?)
            })
            .await
            .map_err(interact_error)??;
        Ok(removed > 0)
    }

    async fn remove_if_written_at(
        &self,
        fingerprint: &Fingerprint,
        written_at: i64,
    ) -> Result<bool> {
        let key = fingerprint.key();
        let conn = connection(&self.pool).await?;
        let removed = conn
            .interact(move |conn| -> Result<usize> {
                Ok(conn.execute(
                    "DELETE FROM result_cache WHERE cache_key = ? AND written_at = ?",
                    rusqlite::params![key, written_at],
                )?)
            })
            .await
            .map_err(interact_error)??;
        Ok(removed > 0)
    }

    async fn remove_user(&self, user_id: &UserId) -> Result<usize> {
        let user_id = user_id.to_string();
        let conn = connection(&self.pool).await?;
        conn.interact(move |conn| -> Result<usize> {
            Ok(conn.execute(
                "DELETE FROM result_cache WHERE user_id = ?",
                rusqlite::params![user_id],
            )?)
        })
        .await
        .map_err(interact_error)?
    }

    async fn remove_domain(&self, user_id: &UserId, domain: Domain) -> Result<usize> {
        let user_id = user_id.to_string();
        let domain = domain.as_str();
        let conn = connection(&self.pool).await?;
        conn.interact(move |conn| -> Result<usize> {
            Ok(conn.execute(
                "DELETE FROM result_cache WHERE user_id = ? AND domain = ?",
                rusqlite::params![user_id, domain],
            )?)
        })
        .await
        .map_err(interact_error)?
    }

    async fn len(&self) -> Result<usize> {
        let conn = connection(&self.pool).await?;
        let count = conn
            .interact(|conn| -> Result<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM result_cache", [], |row| row.get(0))?)
            })
            .await
            .map_err(interact_error)??;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::result;
    use crate::cache::ResultCache;
    use crate::clock::ManualClock;
    use crate::fingerprint::fingerprint;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fp(user: &str, domain: Domain) -> Fingerprint {
        fingerprint(&UserId::from(user), domain, &[], "1").unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_and_domain_delete() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteCacheBackend::open(dir.path().join("cache.db"))
            .await
            .unwrap();

        for domain in [Domain::Mood, Domain::Aggregate, Domain::Cbt] {
            backend
                .store(CacheEntry {
                    fingerprint: fp("u1", domain),
                    result: result(domain, 5),
                    written_at: 10,
                    ttl_ms: 500,
                })
                .await
                .unwrap();
        }

        let loaded = backend.load(&fp("u1", Domain::Mood)).await.unwrap().unwrap();
        assert_eq!(loaded.written_at, 10);
        assert_eq!(loaded.ttl_ms, 500);
        assert_eq!(loaded.result.analytics.sample_size, 5);

        let removed = backend
            .remove_domain(&UserId::from("u1"), Domain::Mood)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(backend.len().await.unwrap(), 2);
        assert_eq!(backend.remove_user(&UserId::from("u1")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_by_key() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteCacheBackend::open(dir.path().join("cache.db"))
            .await
            .unwrap();
        for domain in [Domain::Tracking, Domain::Ocd] {
            backend
                .store(CacheEntry {
                    fingerprint: fp("u1", domain),
                    result: result(domain, 2),
                    written_at: 10,
                    ttl_ms: 500,
                })
                .await
                .unwrap();
        }

        let key = fp("u1", Domain::Tracking);
        assert!(backend.remove(&key).await.unwrap());
        assert!(backend.load(&key).await.unwrap().is_none());
        assert!(!backend.remove(&key).await.unwrap());
        assert!(backend.load(&fp("u1", Domain::Ocd)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        let clock = Arc::new(ManualClock::new(100));
        {
            let cache = ResultCache::new(
                Arc::new(SqliteCacheBackend::open(&path).await.unwrap()),
                clock.clone(),
            );
            cache
                .put(fp("u1", Domain::Ocd), result(Domain::Ocd, 2), Duration::from_secs(60))
                .await
                .unwrap();
        }

        let cache = ResultCache::new(
            Arc::new(SqliteCacheBackend::open(&path).await.unwrap()),
            clock.clone(),
        );
        clock.advance(30);
        let hit = cache.get(&fp("u1", Domain::Ocd)).await.unwrap();
        assert_eq!(hit.age_ms, 30);
    }
}

//! Suggestion cooldown ledger
//!
//! Cooldown state is addressed by a typed [`CooldownKey`] so every caller
//! goes through the same key shape. Only the SQLite store ever turns a key
//! into strings.

use crate::error::{Result, RibbonError};
use crate::storage::{connection, interact_error, open_pool};
use crate::types::UserId;
use async_trait::async_trait;
use deadpool_sqlite::Pool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// What a cooldown gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPurpose {
    /// Cross-module suggestions surfaced next to an insight
    CrossModuleSuggestion,
}

impl CooldownPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CooldownPurpose::CrossModuleSuggestion => "cross_module_suggestion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CooldownKey {
    pub user_id: UserId,
    pub purpose: CooldownPurpose,
}

impl CooldownKey {
    pub fn new(user_id: UserId, purpose: CooldownPurpose) -> Self {
        Self { user_id, purpose }
    }
}

/// Per-user suggestion state (epoch milliseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecord {
    pub last_suggested_at: Option<i64>,
    pub snooze_until: Option<i64>,
}

/// Storage for cooldown records
///
/// `get` returns the default record for keys never written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CooldownStore: Send + Sync {
    async fn get(&self, key: &CooldownKey) -> Result<CooldownRecord>;
    async fn set(&self, key: &CooldownKey, record: CooldownRecord) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryCooldownStore {
    records: RwLock<HashMap<CooldownKey, CooldownRecord>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn get(&self, key: &CooldownKey) -> Result<CooldownRecord> {
        Ok(self
            .records
            .read()
            .await
            .get(key)
            .copied()
            .unwrap_or_default())
    }

    async fn set(&self, key: &CooldownKey, record: CooldownRecord) -> Result<()> {
        self.records.write().await.insert(key.clone(), record);
        Ok(())
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS suggestion_cooldown (
    user_id TEXT NOT NULL,
    purpose TEXT NOT NULL,
    last_suggested_at INTEGER,
    snooze_until INTEGER,
    PRIMARY KEY (user_id, purpose)
);";

/// Cooldown records persisted in SQLite
pub struct SqliteCooldownStore {
    pool: Pool,
}

impl SqliteCooldownStore {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let pool = open_pool(db_path)?;
        let conn = connection(&pool).await?;
        conn.interact(|conn| -> Result<()> {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(interact_error)??;

        info!("SQLite cooldown store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CooldownStore for SqliteCooldownStore {
    async fn get(&self, key: &CooldownKey) -> Result<CooldownRecord> {
        let user_id = key.user_id.as_str().to_string();
        let purpose = key.purpose.as_str();
        let conn = connection(&self.pool).await?;

        conn.interact(move |conn| -> Result<CooldownRecord> {
            let mut stmt = conn.prepare(
                "SELECT last_suggested_at, snooze_until FROM suggestion_cooldown
                 WHERE user_id = ? AND purpose = ?",
            )?;
            let row = stmt.query_row(rusqlite::params![user_id, purpose], |row| {
                Ok(CooldownRecord {
                    last_suggested_at: row.get(0)?,
                    snooze_until: row.get(1)?,
                })
            });
            match row {
                Ok(record) => Ok(record),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(CooldownRecord::default()),
                Err(e) => Err(RibbonError::CooldownStore(e.to_string())),
            }
        })
        .await
        .map_err(interact_error)?
    }

    async fn set(&self, key: &CooldownKey, record: CooldownRecord) -> Result<()> {
        let user_id = key.user_id.as_str().to_string();
        let purpose = key.purpose.as_str();
        let conn = connection(&self.pool).await?;

        conn.interact(move |conn| -> Result<()> {
            conn.execute(
                "INSERT OR REPLACE INTO suggestion_cooldown
                 (user_id, purpose, last_suggested_at, snooze_until) VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    user_id,
                    purpose,
                    record.last_suggested_at,
                    record.snooze_until
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(interact_error)?
    }
}

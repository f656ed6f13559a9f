//! Domain data source
//!
//! The pipeline reads the records it analyzes through [`DomainDataSource`].
//! Fetches are pure reads; failures are returned to the caller unchanged.

use crate::clock::Clock;
use crate::error::{Result, RibbonError};
use crate::types::{Domain, DomainRecord, UserId};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Read access to a user's domain records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainDataSource: Send + Sync {
    /// Records of `domain` recorded within the last `window_days`
    ///
    /// For [`Domain::Aggregate`] every record in the window is returned.
    async fn fetch_records(
        &self,
        user_id: &UserId,
        domain: Domain,
        window_days: u32,
    ) -> Result<Vec<DomainRecord>>;
}

/// Process-local record store, mostly for tests and the CLI
pub struct InMemoryDataSource {
    records: RwLock<HashMap<UserId, Vec<DomainRecord>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDataSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn insert(&self, user_id: &UserId, record: DomainRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.entry(user_id.clone()).or_default().push(record);
    }

    pub fn extend(&self, user_id: &UserId, new_records: impl IntoIterator<Item = DomainRecord>) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.entry(user_id.clone()).or_default().extend(new_records);
    }

    /// Remove every record of a user
    pub fn clear(&self, user_id: &UserId) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.remove(user_id);
    }
}

#[async_trait]
impl DomainDataSource for InMemoryDataSource {
    async fn fetch_records(
        &self,
        user_id: &UserId,
        domain: Domain,
        window_days: u32,
    ) -> Result<Vec<DomainRecord>> {
        let now = Utc
            .timestamp_millis_opt(self.clock.now_ms())
            .single()
            .unwrap_or_else(Utc::now);
        let since = now
            .checked_sub_signed(Duration::days(i64::from(window_days)))
            .ok_or_else(|| {
                RibbonError::InvalidInput(format!(
                    "window of {} days is out of range",
                    window_days
                ))
            })?;

        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let fetched: Vec<DomainRecord> = records
            .get(user_id)
            .map(|all| {
                all.iter()
                    .filter(|r| domain.accepts(r) && r.recorded_at() >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            "Fetched {} {} records for user {} ({} day window)",
            fetched.len(),
            domain,
            user_id,
            window_days
        );
        Ok(fetched)
    }
}

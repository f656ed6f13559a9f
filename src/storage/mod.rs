//! SQLite connection pooling shared by the persistent backends
//!
//! Both the result cache and the suggestion cooldown ledger can persist to a
//! local SQLite file. Connections are pooled with deadpool-sqlite; all
//! statements run inside `interact` so the async caller is never blocked.

use crate::error::{Result, RibbonError};
use deadpool_sqlite::{Config, Object, Pool, Runtime};
use std::path::Path;
use tracing::info;

/// Default connection pool size
const DEFAULT_POOL_SIZE: usize = 4;

/// Open a connection pool for the database file at `db_path`
pub fn open_pool<P: AsRef<Path>>(db_path: P) -> Result<Pool> {
    let path_str = db_path.as_ref().to_string_lossy().to_string();
    info!("Opening SQLite pool at: {}", path_str);

    if let Some(parent) = db_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut config = Config::new(path_str);
    config.pool = Some(deadpool_sqlite::PoolConfig::new(DEFAULT_POOL_SIZE));
    config
        .create_pool(Runtime::Tokio1)
        .map_err(|e| RibbonError::Database(format!("Failed to create connection pool: {}", e)))
}

/// Check a connection out of the pool
pub async fn connection(pool: &Pool) -> Result<Object> {
    pool.get()
        .await
        .map_err(|e| RibbonError::Database(format!("Failed to get connection from pool: {}", e)))
}

/// Map a failed `interact` call into a database error
pub fn interact_error(e: impl std::fmt::Display) -> RibbonError {
    RibbonError::Database(format!("Pool interaction failed: {}", e))
}

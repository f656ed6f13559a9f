//! Runtime configuration for the insight pipeline
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `RIBBON_*` environment variables. The environment always wins.

use crate::error::{Result, RibbonError};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RIBBON";

/// Upper bound for `window_days` (ten years of history)
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Short TTL and optionally a fixed user for end-to-end scenarios
    Test,
    #[default]
    Production,
}

/// Which analyzer set the processor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    Stub,
    #[default]
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RibbonConfig {
    pub mode: Mode,
    pub test_ttl_ms: u64,
    pub production_ttl_ms: u64,
    /// Overrides the mode's TTL when set
    pub ttl_ms: Option<u64>,
    pub analyzer: AnalyzerMode,
    /// Fixed user id substituted for every request in test mode
    pub test_user_id: Option<String>,
    /// Mixed into every fingerprint; bump to orphan old cache entries
    pub pipeline_version: String,
    /// Days of history fetched by `process_for_user`
    pub window_days: u32,
    pub cache_capacity: usize,
    pub suggestion_cooldown_ms: u64,
    pub remote_mirror_url: Option<String>,
    /// SQLite file for the cache and cooldown store; in-memory when unset
    pub database_path: Option<PathBuf>,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            test_ttl_ms: 5_000,
            production_ttl_ms: 30 * 60 * 1000,
            ttl_ms: None,
            analyzer: AnalyzerMode::Live,
            test_user_id: None,
            pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
            window_days: 30,
            cache_capacity: 512,
            suggestion_cooldown_ms: 4 * 60 * 60 * 1000,
            remote_mirror_url: None,
            database_path: None,
        }
    }
}

impl RibbonConfig {
    /// Load configuration with layered merging
    ///
    /// A path that does not exist is an error; pass `None` to skip the file
    /// layer.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = serde_json::to_string(&Self::default())?;
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Json));

        if let Some(path) = path {
            if !path.exists() {
                return Err(RibbonError::InvalidInput(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config file {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// TTL applied to cache writes
    pub fn active_ttl(&self) -> Duration {
        let ms = self.ttl_ms.unwrap_or(match self.mode {
            Mode::Test => self.test_ttl_ms,
            Mode::Production => self.production_ttl_ms,
        });
        Duration::from_millis(ms)
    }

    pub fn suggestion_cooldown(&self) -> Duration {
        Duration::from_millis(self.suggestion_cooldown_ms)
    }

    /// Fixed test user, only honored in test mode
    pub fn fixed_user(&self) -> Option<&str> {
        match self.mode {
            Mode::Test => self.test_user_id.as_deref(),
            Mode::Production => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.active_ttl().is_zero() {
            return Err(RibbonError::InvalidInput(
                "cache TTL must be greater than zero".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(RibbonError::InvalidInput(
                "cache_capacity must be greater than zero".to_string(),
            ));
        }
        if self.window_days == 0 || self.window_days > MAX_WINDOW_DAYS {
            return Err(RibbonError::InvalidInput(format!(
                "window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        if self.mode == Mode::Test {
            if let Some(user) = &self.test_user_id {
                if user.trim().is_empty() {
                    return Err(RibbonError::InvalidInput(
                        "test_user_id must not be empty".to_string(),
                    ));
                }
            }
        }
        if self.pipeline_version.is_empty() {
            return Err(RibbonError::InvalidInput(
                "pipeline_version must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

//! CLI command handlers
//!
//! Each subcommand lives in its own module and exposes `handle`.

pub mod classify;
pub mod config;
pub mod invalidate;
pub mod process;

use ribbon_core::error::{Result, RibbonError};
use ribbon_core::Domain;
use std::path::PathBuf;

/// Per-user SQLite file used when the config names none
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quality-ribbon")
        .join("ribbon.db")
}

/// Parse a domain argument (`mood`, `cbt`, `tracking`, `ocd`, `aggregate`/`today`)
pub fn parse_domain(value: &str) -> Result<Domain> {
    value.parse::<Domain>().map_err(RibbonError::InvalidInput)
}

//! Ribbon view model
//!
//! The ribbon is the compact badge row shown under an insight or suggestion:
//! source, quality, sample size and age. It exists only when quality
//! metadata exists; `None` means render nothing at all.

use crate::quality::QualityMetadata;
use serde::Serialize;
use std::fmt;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Badge labels for one ribbon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RibbonView {
    pub source: &'static str,
    pub quality: &'static str,
    pub sample_size: String,
    pub age: String,
}

impl RibbonView {
    /// Ribbon for the given metadata, or `None` to hide it
    pub fn from_metadata(metadata: Option<&QualityMetadata>) -> Option<Self> {
        let metadata = metadata?;
        Some(Self {
            source: metadata.source.label(),
            quality: metadata.quality.label(),
            sample_size: format!("n={}", metadata.sample_size),
            age: format_age(metadata.freshness_ms),
        })
    }

    /// Badges in display order
    pub fn badges(&self) -> [&str; 4] {
        [self.source, self.quality, &self.sample_size, &self.age]
    }
}

impl fmt::Display for RibbonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.badges().join(" · "))
    }
}

/// Compact age label: `just now`, `5m`, `2h`, `3d`
pub fn format_age(age_ms: u64) -> String {
    if age_ms < MINUTE_MS {
        "just now".to_string()
    } else if age_ms < HOUR_MS {
        format!("{}m", age_ms / MINUTE_MS)
    } else if age_ms < DAY_MS {
        format!("{}h", age_ms / HOUR_MS)
    } else {
        format!("{}d", age_ms / DAY_MS)
    }
}

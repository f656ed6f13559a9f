//! Quality classification and provenance tags
//!
//! Maps (sample size, confidence, data quality) to a three-level
//! [`QualityTier`]. Every domain calibrates its own [`DomainThresholds`] but
//! the shape is shared: below `minimum` nothing is classified at all (the
//! ribbon is hidden), `adequate` and `ample` are the inclusive lower edges of
//! the medium and high tiers.
//!
//! Classification is a pure function of its inputs.

use crate::types::{Analytics, Domain};
use serde::{Deserialize, Serialize};

/// How a result reached the UI
///
/// The serialized names and the UI labels are a compatibility contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Fresh computation by the unified pipeline
    Unified,
    /// Served from the result cache
    Cache,
    /// Fast heuristic-only path
    Heuristic,
    /// LLM-backed result
    Llm,
}

impl Provenance {
    /// Badge label shown in the ribbon
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Unified => "Fresh",
            Provenance::Cache => "Cache",
            Provenance::Heuristic => "Fast",
            Provenance::Llm => "LLM",
        }
    }

    pub fn all() -> [Provenance; 4] {
        [
            Provenance::Unified,
            Provenance::Cache,
            Provenance::Heuristic,
            Provenance::Llm,
        ]
    }
}

/// Coarse reliability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Badge label shown in the ribbon
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::High => "High",
            QualityTier::Medium => "Med",
            QualityTier::Low => "Low",
        }
    }

    pub fn all() -> [QualityTier; 3] {
        [QualityTier::High, QualityTier::Medium, QualityTier::Low]
    }
}

/// Provenance and quality tags carried by a result
///
/// The pipeline derives it from the analytics of the result it describes via
/// [`QualityMetadata::derive`]; downstream consumers only relay it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetadata {
    pub source: Provenance,
    pub quality: QualityTier,
    pub sample_size: u32,
    pub confidence: f64,
    pub data_quality: f64,
    /// Milliseconds since the underlying computation; 0 for fresh results
    pub freshness_ms: u64,
}

impl QualityMetadata {
    /// Recompute quality metadata for a result's analytics
    ///
    /// Returns `None` when the domain judges the payload too sparse to
    /// classify.
    pub fn derive(
        analytics: &Analytics,
        provenance: Provenance,
        freshness_ms: u64,
    ) -> Option<Self> {
        let classifier = QualityClassifier::for_domain(analytics.domain);
        let classification = classifier.classify(
            analytics.sample_size,
            analytics.confidence,
            analytics.data_quality,
        )?;

        // Fresh computations always report zero age
        let freshness_ms = match provenance {
            Provenance::Unified => 0,
            _ => freshness_ms,
        };

        Some(Self {
            source: provenance,
            quality: classification.quality,
            sample_size: classification.sample_size,
            confidence: classification.confidence,
            data_quality: classification.data_quality,
            freshness_ms,
        })
    }
}

/// Per-domain sample size thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainThresholds {
    /// Below this nothing is classified
    pub minimum: u32,
    /// Lower edge of the medium tier
    pub adequate: u32,
    /// Lower edge of the high tier
    pub ample: u32,
}

impl DomainThresholds {
    pub const fn new(minimum: u32, adequate: u32, ample: u32) -> Self {
        Self {
            minimum,
            adequate,
            ample,
        }
    }

    /// Calibration for each data domain
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            // Daily mood entries: one week is adequate, two weeks ample
            Domain::Mood => Self::new(1, 7, 14),
            Domain::Cbt => Self::new(1, 7, 12),
            Domain::Tracking => Self::new(1, 11, 20),
            Domain::Ocd => Self::new(1, 9, 18),
            Domain::Aggregate => Self::new(1, 10, 21),
        }
    }

    fn is_ordered(&self) -> bool {
        self.minimum <= self.adequate && self.adequate <= self.ample
    }
}

/// Result of a successful classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub quality: QualityTier,
    pub sample_size: u32,
    pub confidence: f64,
    pub data_quality: f64,
}

/// Stateless quality classifier for one domain calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityClassifier {
    thresholds: DomainThresholds,
}

impl QualityClassifier {
    pub fn new(thresholds: DomainThresholds) -> Self {
        debug_assert!(thresholds.is_ordered(), "thresholds must be ordered");
        Self { thresholds }
    }

    pub fn for_domain(domain: Domain) -> Self {
        Self::new(DomainThresholds::for_domain(domain))
    }

    pub fn thresholds(&self) -> DomainThresholds {
        self.thresholds
    }

    /// Classify a result
    ///
    /// `None` means "too sparse to classify", which is distinct from
    /// [`QualityTier::Low`]. Confidence and data quality are clamped into
    /// `0.0..=1.0` (non-finite values count as 0).
    pub fn classify(
        &self,
        sample_size: u32,
        confidence: f64,
        data_quality: f64,
    ) -> Option<Classification> {
        classify(&self.thresholds, sample_size, confidence, data_quality)
    }
}

/// Classify with explicit thresholds
pub fn classify(
    thresholds: &DomainThresholds,
    sample_size: u32,
    confidence: f64,
    data_quality: f64,
) -> Option<Classification> {
    if sample_size < thresholds.minimum.max(1) {
        return None;
    }

    let quality = if sample_size >= thresholds.ample {
        QualityTier::High
    } else if sample_size >= thresholds.adequate {
        QualityTier::Medium
    } else {
        QualityTier::Low
    };

    Some(Classification {
        quality,
        sample_size,
        confidence: unit_interval(confidence),
        data_quality: unit_interval(data_quality),
    })
}

fn unit_interval(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

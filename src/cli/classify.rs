//! Classify a sample without running the pipeline

use ribbon_core::error::Result;
use ribbon_core::QualityClassifier;

use super::parse_domain;

/// Handle the classify command
pub fn handle(domain: String, sample_size: u32, confidence: f64, data_quality: f64) -> Result<()> {
    let domain = parse_domain(&domain)?;
    let classifier = QualityClassifier::for_domain(domain);
    let thresholds = classifier.thresholds();

    match classifier.classify(sample_size, confidence, data_quality) {
        Some(classification) => println!(
            "{} n={} -> {} (confidence {:.2}, data quality {:.2})",
            domain,
            sample_size,
            classification.quality.label(),
            classification.confidence,
            classification.data_quality
        ),
        None => println!("{} n={} -> too sparse to classify", domain, sample_size),
    }
    println!(
        "thresholds: minimum {}, medium from {}, high from {}",
        thresholds.minimum, thresholds.adequate, thresholds.ample
    );
    Ok(())
}

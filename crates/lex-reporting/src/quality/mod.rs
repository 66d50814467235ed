//! Data quality measurement.
//!
//! Computes [`QualityReport`](crate::types::QualityReport)s for raw and
//! cleaned datasets, including the weighted quality score.

mod analyzer;

pub use analyzer::DataQualityAnalyzer;

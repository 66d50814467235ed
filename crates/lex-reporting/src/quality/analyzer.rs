use crate::config::QualityWeights;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::{CleaningSummary, ColumnProfile, QualityReport};

pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    /// Measure duplicates, nulls and type-coercion failures of `dataset`
    /// against `profiles`, and compute the weighted quality score.
    ///
    /// `profiles` must describe `dataset` column for column.
    pub fn assess(
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        weights: &QualityWeights,
    ) -> Result<QualityReport> {
        dataset.check_profiles(profiles)?;

        let total_rows = dataset.height();
        let total_columns = dataset.width();
        let null_cells = dataset.null_cell_count();
        let duplicate_rows = dataset.duplicate_row_count()?;

        let mut coercion_failures = 0;
        for profile in profiles {
            coercion_failures += dataset.coercion_failures(&profile.name, profile.semantic_type)?;
        }

        let mut report = QualityReport {
            total_rows,
            total_columns,
            duplicate_rows,
            null_cells,
            non_null_cells: total_rows * total_columns - null_cells,
            coercion_failures,
            quality_score: 0.0,
            warnings: Vec::new(),
            cleaning: CleaningSummary::default(),
        };
        report.quality_score = Self::score(&report, weights);
        Ok(report)
    }

    /// Weighted mean of uniqueness, completeness and validity, clamped to `[0, 1]`.
    pub fn score(report: &QualityReport, weights: &QualityWeights) -> f64 {
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        let raw = weights.uniqueness * (1.0 - report.duplicate_ratio())
            + weights.completeness * (1.0 - report.null_ratio())
            + weights.validity * report.coercion_success_ratio();
        (raw / total).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfilerThresholds;
    use crate::profiler::SchemaProfiler;

    fn dataset(columns: &[(&str, &[Option<&str>])]) -> Dataset {
        Dataset::from_string_columns(
            columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.to_string(),
                        values.iter().map(|v| v.map(str::to_string)).collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn assess(ds: &Dataset, weights: &QualityWeights) -> QualityReport {
        let profiles = SchemaProfiler::profile(ds, &ProfilerThresholds::default()).unwrap();
        DataQualityAnalyzer::assess(ds, &profiles, weights).unwrap()
    }

    #[test]
    fn test_clean_dataset_scores_one() {
        let ds = dataset(&[
            ("Date", &[Some("2024-01-01"), Some("2024-01-02")]),
            ("Amount", &[Some("10"), Some("20")]),
        ]);
        let report = assess(&ds, &QualityWeights::default());
        assert_eq!(report.duplicate_rows, 0);
        assert_eq!(report.null_cells, 0);
        assert!((report.quality_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicates_and_nulls_lower_score() {
        let ds = dataset(&[
            ("Date", &[Some("2024-01-01"), Some("2024-01-01"), Some("2024-01-02")]),
            ("Amount", &[Some("100"), Some("100"), None]),
        ]);
        let report = assess(&ds, &QualityWeights::default());
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.null_cells, 1);
        assert!((report.duplicate_ratio() - 1.0 / 3.0).abs() < 1e-12);

        let expected = ((1.0 - 1.0 / 3.0) + (1.0 - 1.0 / 6.0) + 1.0) / 3.0;
        assert!((report.quality_score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weights_are_normalized() {
        let ds = dataset(&[
            ("A", &[Some("1"), Some("1")]),
            ("B", &[Some("x"), Some("x")]),
        ]);
        // only uniqueness counts: half the rows are duplicates
        let weights = QualityWeights {
            uniqueness: 4.0,
            completeness: 0.0,
            validity: 0.0,
        };
        let report = assess(&ds, &weights);
        assert!((report.quality_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let ds = dataset(&[("A", &[None, None, None]), ("B", &[None, None, None])]);
        let report = assess(&ds, &QualityWeights::default());
        assert!((0.0..=1.0).contains(&report.quality_score));
    }

    #[test]
    fn test_profile_mismatch_is_contract_violation() {
        let ds = dataset(&[("A", &[Some("1")]), ("B", &[Some("2")])]);
        let err = DataQualityAnalyzer::assess(&ds, &[], &QualityWeights::default()).unwrap_err();
        assert_eq!(err.error_code(), "CONTRACT_VIOLATION");
    }
}

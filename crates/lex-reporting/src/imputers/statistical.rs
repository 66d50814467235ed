//! Statistical imputation methods.
//!
//! Median for numeric columns, mode for categorical columns, forward/backward
//! fill for temporal columns and a constant for free text. Each method
//! returns `None` when the column has no value to impute from.

use crate::dataset::{CategoricalColumn, NumericColumn, TemporalColumn, TextColumn};

/// Placeholder written into missing free-text cells.
pub const TEXT_PLACEHOLDER: &str = "Unknown";

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill missing numeric values with the column median.
    pub fn impute_median(
        column: &NumericColumn,
        processing_steps: &mut Vec<String>,
    ) -> Option<NumericColumn> {
        let median = column.median()?;
        let missing = column.values().iter().filter(|v| v.is_none()).count();
        let filled = column
            .values()
            .iter()
            .map(|v| Some(v.unwrap_or(median)))
            .collect();

        if missing > 0 {
            processing_steps.push(format!(
                "Filled {} missing values in '{}' with median: {:.2}",
                missing,
                column.name(),
                median
            ));
        }
        Some(NumericColumn::new(column.name(), filled))
    }

    /// Fill missing categorical values with the column mode.
    pub fn impute_mode(
        column: &CategoricalColumn,
        processing_steps: &mut Vec<String>,
    ) -> Option<CategoricalColumn> {
        let mode = column.mode()?;
        let missing = column.values().iter().filter(|v| v.is_none()).count();
        let filled = column
            .values()
            .iter()
            .map(|v| Some(v.clone().unwrap_or_else(|| mode.clone())))
            .collect();

        if missing > 0 {
            processing_steps.push(format!(
                "Filled {} missing values in '{}' with mode: '{}'",
                missing,
                column.name(),
                mode
            ));
        }
        Some(CategoricalColumn::new(column.name(), filled))
    }

    /// Forward fill, then backward fill the leading gap.
    pub fn impute_forward_fill(
        column: &TemporalColumn,
        processing_steps: &mut Vec<String>,
    ) -> Option<TemporalColumn> {
        let first = column.values().iter().flatten().next().copied()?;
        let missing = column.values().iter().filter(|v| v.is_none()).count();

        let mut last = first;
        let filled = column
            .values()
            .iter()
            .map(|v| {
                if let Some(ts) = v {
                    last = *ts;
                }
                Some(last)
            })
            .collect();

        if missing > 0 {
            processing_steps.push(format!(
                "Forward filled {} missing values in '{}'",
                missing,
                column.name()
            ));
        }
        Some(TemporalColumn::new(column.name(), filled))
    }

    /// Fill missing free-text values with [`TEXT_PLACEHOLDER`].
    pub fn impute_constant(
        column: &TextColumn,
        processing_steps: &mut Vec<String>,
    ) -> Option<TextColumn> {
        if column.values().iter().all(Option::is_none) {
            return None;
        }
        let missing = column.values().iter().filter(|v| v.is_none()).count();
        let filled = column
            .values()
            .iter()
            .map(|v| Some(v.clone().unwrap_or_else(|| TEXT_PLACEHOLDER.to_string())))
            .collect();

        if missing > 0 {
            processing_steps.push(format!(
                "Filled {} missing values in '{}' with constant value: '{}'",
                missing,
                column.name(),
                TEXT_PLACEHOLDER
            ));
        }
        Some(TextColumn::new(column.name(), filled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    // ========================================================================
    // impute_median() tests
    // ========================================================================

    #[test]
    fn test_impute_median_basic() {
        let column = NumericColumn::new("values", vec![Some(1.0), None, Some(3.0), None, Some(5.0)]);
        let mut steps = Vec::new();

        let filled = StatisticalImputer::impute_median(&column, &mut steps).unwrap();

        // Median of [1, 3, 5] = 3
        assert_eq!(
            filled.values(),
            &[Some(1.0), Some(3.0), Some(3.0), Some(3.0), Some(5.0)]
        );
        assert!(steps[0].contains("median"));
    }

    #[test]
    fn test_impute_median_no_nulls_logs_nothing() {
        let column = NumericColumn::new("values", vec![Some(1.0), Some(2.0)]);
        let mut steps = Vec::new();

        let filled = StatisticalImputer::impute_median(&column, &mut steps).unwrap();

        assert_eq!(filled, column);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_impute_median_all_nulls() {
        let column = NumericColumn::new("values", vec![None, None]);
        let mut steps = Vec::new();
        assert!(StatisticalImputer::impute_median(&column, &mut steps).is_none());
        assert!(steps.is_empty());
    }

    // ========================================================================
    // impute_mode() tests
    // ========================================================================

    #[test]
    fn test_impute_mode_basic() {
        let column = CategoricalColumn::new(
            "region",
            vec![
                Some("East".to_string()),
                None,
                Some("West".to_string()),
                Some("East".to_string()),
            ],
        );
        let mut steps = Vec::new();

        let filled = StatisticalImputer::impute_mode(&column, &mut steps).unwrap();

        assert_eq!(filled.values()[1], Some("East".to_string()));
        assert!(steps[0].contains("mode"));
    }

    // ========================================================================
    // impute_forward_fill() tests
    // ========================================================================

    #[test]
    fn test_impute_forward_fill_with_leading_gap() {
        let column = TemporalColumn::new("date", vec![None, Some(day(2)), None, Some(day(4))]);
        let mut steps = Vec::new();

        let filled = StatisticalImputer::impute_forward_fill(&column, &mut steps).unwrap();

        assert_eq!(
            filled.values(),
            &[Some(day(2)), Some(day(2)), Some(day(2)), Some(day(4))]
        );
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_impute_forward_fill_all_nulls() {
        let column = TemporalColumn::new("date", vec![None, None]);
        let mut steps = Vec::new();
        assert!(StatisticalImputer::impute_forward_fill(&column, &mut steps).is_none());
    }

    // ========================================================================
    // impute_constant() tests
    // ========================================================================

    #[test]
    fn test_impute_constant() {
        let column = TextColumn::new("note", vec![Some("hello".to_string()), None]);
        let mut steps = Vec::new();

        let filled = StatisticalImputer::impute_constant(&column, &mut steps).unwrap();

        assert_eq!(filled.values()[1], Some(TEXT_PLACEHOLDER.to_string()));
        assert!(steps[0].contains("Unknown"));
    }
}

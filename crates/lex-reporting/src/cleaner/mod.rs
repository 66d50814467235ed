//! Data cleaning.
//!
//! [`Cleaner::clean`] runs its steps in a fixed order:
//!
//! 1. Rows with no value in any column are removed.
//! 2. Exact duplicate rows are removed, keeping the first occurrence.
//! 3. Missing values are handled per semantic type. A cell counts as missing
//!    when it is null or does not coerce to the column's profiled type.
//!    Numeric columns get the median, categorical columns the mode. Temporal
//!    and text columns are flagged with [`CleaningWarning::HighNullRatio`]
//!    above the configured threshold and filled (forward fill, `"Unknown"`).
//!    A column with no values at all is dropped.
//! 4. Every retained column is materialized in its profiled type, in one pass.
//! 5. Rows that only became identical through filling or coercion (`1` and
//!    `1.0`, a blank filled with the median) are removed, keeping the first.
//!
//! The output therefore has no null cells and no exact duplicate rows.

use crate::config::ReportConfig;
use crate::dataset::{Dataset, TypedColumn};
use crate::error::{CleaningWarning, Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::quality::DataQualityAnalyzer;
use crate::types::{CleaningSummary, ColumnProfile, QualityReport, SemanticType};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Data cleaner for profile-guided dataset cleaning.
pub struct Cleaner;

impl Cleaner {
    /// Clean `dataset` guided by `profiles`.
    ///
    /// Returns the cleaned dataset and the quality report of the input as it
    /// was before cleaning. Cleaning warnings and the [`CleaningSummary`] are
    /// attached to that report.
    pub fn clean(
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        config: &ReportConfig,
    ) -> Result<(Dataset, QualityReport)> {
        let mut quality_pre =
            DataQualityAnalyzer::assess(dataset, profiles, &config.quality_weights)?;
        let mut summary = CleaningSummary::default();

        info!("Cleaning dataset...");

        // 1. Remove rows with nothing in them
        let populated = Self::remove_empty_rows(dataset, &mut summary)?;

        // 2. Remove duplicate rows
        let deduplicated = Self::remove_duplicates(&populated, &mut summary, "duplicate rows")?;

        // 3. Handle missing values per semantic type
        let mut retained = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let column = deduplicated.typed_column(profile)?;
            match Self::handle_missing(column, config, &mut quality_pre.warnings, &mut summary) {
                Some(filled) => retained.push(filled),
                None => {
                    warn!(column = %profile.name, "Dropping column with no values");
                    summary.columns_dropped += 1;
                    summary
                        .actions
                        .push(format!("Dropped empty column '{}'", profile.name));
                }
            }
        }

        // 4. Materialize each column in its profiled type
        let columns = retained
            .iter()
            .map(|column| Self::coerce(column).map(Column::from))
            .collect::<Result<Vec<_>>>()?;
        let coerced = Dataset::new(DataFrame::new(columns).context("assembling cleaned dataset")?);

        // 5. Rows that only match once filled and coerced
        let cleaned = Self::remove_duplicates(&coerced, &mut summary, "rows duplicated after filling")?;

        for action in &summary.actions {
            debug!("{}", action);
        }
        info!(
            rows_before = dataset.height(),
            rows_after = cleaned.height(),
            columns_before = dataset.width(),
            columns_after = cleaned.width(),
            empty_rows = summary.empty_rows_removed,
            duplicates = summary.duplicate_rows_removed,
            filled = summary.cells_filled,
            warnings = quality_pre.warnings.len(),
            "Cleaning complete"
        );

        quality_pre.cleaning = summary;
        Ok((cleaned, quality_pre))
    }

    fn remove_empty_rows(dataset: &Dataset, summary: &mut CleaningSummary) -> Result<Dataset> {
        let keep = dataset.non_empty_row_mask();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok(dataset.clone());
        }

        summary.empty_rows_removed += removed;
        summary.actions.push(format!("Removed {} empty rows", removed));
        dataset.filter_rows(keep)
    }

    fn remove_duplicates(
        dataset: &Dataset,
        summary: &mut CleaningSummary,
        label: &str,
    ) -> Result<Dataset> {
        let keep = dataset.first_occurrence_mask()?;
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            summary.actions.push(format!("No {} found", label));
            return Ok(dataset.clone());
        }

        summary.duplicate_rows_removed += removed;
        summary.actions.push(format!(
            "Removed {} {} ({:.1}%)",
            removed,
            label,
            removed as f64 / dataset.height() as f64 * 100.0
        ));
        dataset.filter_rows(keep)
    }

    fn handle_missing(
        column: TypedColumn,
        config: &ReportConfig,
        warnings: &mut Vec<CleaningWarning>,
        summary: &mut CleaningSummary,
    ) -> Option<TypedColumn> {
        let rows = column.len();
        let missing = column.null_count();
        if rows > 0 && missing == rows {
            warnings.push(CleaningWarning::ColumnDropped {
                column: column.name().to_string(),
                reason: "every value is missing".to_string(),
            });
            return None;
        }

        let ratio = if rows == 0 {
            0.0
        } else {
            missing as f64 / rows as f64
        };
        if matches!(
            column.semantic_type(),
            SemanticType::Temporal | SemanticType::Text
        ) && ratio > config.missing_value_threshold
        {
            warnings.push(CleaningWarning::HighNullRatio {
                column: column.name().to_string(),
                ratio,
            });
        }

        if rows == 0 || missing == 0 {
            return Some(column);
        }

        let cleaning_actions = &mut summary.actions;
        let filled = match &column {
            TypedColumn::Numeric(c) => {
                StatisticalImputer::impute_median(c, cleaning_actions).map(TypedColumn::Numeric)
            }
            TypedColumn::Categorical(c) => {
                StatisticalImputer::impute_mode(c, cleaning_actions).map(TypedColumn::Categorical)
            }
            TypedColumn::Temporal(c) => StatisticalImputer::impute_forward_fill(c, cleaning_actions)
                .map(TypedColumn::Temporal),
            TypedColumn::Text(c) => {
                StatisticalImputer::impute_constant(c, cleaning_actions).map(TypedColumn::Text)
            }
        };
        if filled.is_some() {
            summary.cells_filled += missing;
        }
        filled
    }

    fn coerce(column: &TypedColumn) -> Result<Series> {
        let name: PlSmallStr = column.name().into();
        let series = match column {
            TypedColumn::Numeric(c) => Series::new(name, c.values().to_vec()),
            TypedColumn::Temporal(c) => {
                let millis: Vec<Option<i64>> = c
                    .values()
                    .iter()
                    .map(|v| v.map(|ts| ts.and_utc().timestamp_millis()))
                    .collect();
                Series::new(name, millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            }
            TypedColumn::Categorical(c) => Series::new(name, c.values().to_vec()),
            TypedColumn::Text(c) => Series::new(name, c.values().to_vec()),
        };
        Ok(series)
    }
}

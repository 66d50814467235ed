//! Schema profiling.
//!
//! [`SchemaProfiler`] is the single place where columns are classified into
//! [`SemanticType`]s. Every later stage reads the resulting
//! [`ColumnProfile`]s instead of re-inspecting values.

pub(crate) mod statistics;
mod type_inference;

use crate::config::ProfilerThresholds;
use crate::dataset::{Dataset, TypedColumn};
use crate::error::Result;
use crate::types::{ColumnProfile, ProfileValue};
use tracing::debug;

pub(crate) use type_inference::{ColumnEvidence, classify, coercion_failures};

/// Schema profiler for inferring column semantic types.
pub struct SchemaProfiler;

impl SchemaProfiler {
    /// Profile every column of `dataset`, in column order. Deterministic.
    pub fn profile(dataset: &Dataset, thresholds: &ProfilerThresholds) -> Result<Vec<ColumnProfile>> {
        dataset
            .column_names()
            .iter()
            .map(|name| Self::profile_column(dataset, name, thresholds))
            .collect()
    }

    fn profile_column(
        dataset: &Dataset,
        name: &str,
        thresholds: &ProfilerThresholds,
    ) -> Result<ColumnProfile> {
        let values = dataset.string_values(name)?;
        let evidence = ColumnEvidence::from_strings(&values);
        let semantic_type = classify(&evidence, thresholds);

        let mut profile = ColumnProfile {
            name: name.to_string(),
            semantic_type,
            row_count: evidence.row_count,
            null_count: evidence.row_count - evidence.non_null,
            distinct_count: evidence.distinct,
            coercion_failures: coercion_failures(&evidence, semantic_type),
            min: None,
            max: None,
        };

        match dataset.typed_column(&profile)? {
            TypedColumn::Numeric(column) => {
                profile.min = column.min().map(ProfileValue::Number);
                profile.max = column.max().map(ProfileValue::Number);
            }
            TypedColumn::Temporal(column) => {
                profile.min = column.min().map(ProfileValue::Timestamp);
                profile.max = column.max().map(ProfileValue::Timestamp);
            }
            TypedColumn::Categorical(_) | TypedColumn::Text(_) => {}
        }

        debug!(
            column = name,
            semantic_type = %profile.semantic_type,
            nulls = profile.null_count,
            distinct = profile.distinct_count,
            "Profiled column"
        );
        Ok(profile)
    }
}

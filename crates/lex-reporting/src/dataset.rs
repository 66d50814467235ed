//! Tabular working data and its typed column views.
//!
//! A [`Dataset`] wraps a polars [`DataFrame`]. Raw datasets built by the
//! validator hold every column as trimmed strings with missing markers
//! normalized to null. The cleaner produces typed datasets (numeric columns
//! as `Float64`, temporal columns as millisecond `Datetime`).
//!
//! [`TypedColumn`] is the only way to read values in their semantic type;
//! each variant exposes the operations valid for that type.

use crate::error::{ReportingError, Result, ResultExt};
use crate::profiler::statistics;
use crate::types::{ColumnProfile, SemanticType};
use crate::utils::{
    datetime_from_millis, is_missing_marker, is_numeric_dtype, parse_datetime_string,
    parse_numeric_string,
};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}

impl Dataset {
    /// Wrap an already-typed frame as-is.
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Build a raw dataset: every column becomes a trimmed string column and
    /// missing markers (`""`, `N/A`, `null`, ...) become null.
    pub fn from_raw_frame(frame: DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let series = column.as_materialized_series();
            let values = string_values_of(series)?;
            columns.push((series.name().to_string(), values));
        }
        Self::from_string_columns(columns)
    }

    /// Build a raw dataset from named string columns.
    ///
    /// All columns must have the same length.
    pub fn from_string_columns(columns: Vec<(String, Vec<Option<String>>)>) -> Result<Self> {
        let mut built = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let normalized: Vec<Option<String>> = values
                .into_iter()
                .map(|v| {
                    v.and_then(|s| {
                        if is_missing_marker(&s) {
                            None
                        } else {
                            Some(s.trim().to_string())
                        }
                    })
                })
                .collect();
            built.push(Series::new(name.as_str().into(), normalized).into_column());
        }
        Ok(Self {
            frame: DataFrame::new(built)?,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    pub fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| ReportingError::ColumnNotFound(name.to_string()))
    }

    /// Column values rendered as strings, nulls preserved.
    pub fn string_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        string_values_of(self.series(name)?)
    }

    pub fn null_cell_count(&self) -> usize {
        self.frame
            .get_columns()
            .iter()
            .map(|c| c.null_count())
            .sum()
    }

    /// For each row, whether it is the first occurrence of its exact values.
    pub fn first_occurrence_mask(&self) -> Result<Vec<bool>> {
        let columns = self
            .column_names()
            .iter()
            .map(|name| self.string_values(name))
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(self.height());
        let mut mask = Vec::with_capacity(self.height());
        for row in 0..self.height() {
            let key: Vec<Option<&str>> = columns.iter().map(|col| col[row].as_deref()).collect();
            mask.push(seen.insert(key));
        }
        Ok(mask)
    }

    /// For each row, whether any of its cells holds a value.
    pub fn non_empty_row_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.height()];
        for column in self.frame.get_columns() {
            let present = column.as_materialized_series().is_not_null();
            for (row, is_present) in present.into_iter().enumerate() {
                if is_present == Some(true) {
                    mask[row] = true;
                }
            }
        }
        mask
    }

    /// Keep the rows whose mask entry is `true`, in order.
    pub fn filter_rows(&self, keep: Vec<bool>) -> Result<Self> {
        let mask = Series::new("keep".into(), keep);
        let frame = self
            .frame
            .filter(mask.bool()?)
            .context("filtering dataset rows")?;
        Ok(Self { frame })
    }

    /// Rows that repeat an earlier row exactly.
    pub fn duplicate_row_count(&self) -> Result<usize> {
        Ok(self
            .first_occurrence_mask()?
            .into_iter()
            .filter(|keep| !keep)
            .count())
    }

    /// Non-null cells of a column that do not coerce to `semantic_type`.
    pub fn coercion_failures(&self, name: &str, semantic_type: SemanticType) -> Result<usize> {
        let series = self.series(name)?;
        let fails = match semantic_type {
            SemanticType::Numeric if is_numeric_dtype(series.dtype()) => 0,
            SemanticType::Temporal if crate::utils::is_temporal_dtype(series.dtype()) => 0,
            SemanticType::Numeric => string_values_of(series)?
                .iter()
                .flatten()
                .filter(|v| parse_numeric_string(v).is_none())
                .count(),
            SemanticType::Temporal => string_values_of(series)?
                .iter()
                .flatten()
                .filter(|v| parse_datetime_string(v).is_none())
                .count(),
            SemanticType::Categorical | SemanticType::Text => 0,
        };
        Ok(fails)
    }

    /// Read a column in its profiled semantic type.
    ///
    /// Values that do not coerce are read as null.
    pub fn typed_column(&self, profile: &ColumnProfile) -> Result<TypedColumn> {
        let series = self.series(&profile.name)?;
        let name = profile.name.clone();
        let column = match profile.semantic_type {
            SemanticType::Numeric => TypedColumn::Numeric(NumericColumn {
                name,
                values: numeric_values_of(series)?,
            }),
            SemanticType::Temporal => TypedColumn::Temporal(TemporalColumn {
                name,
                values: temporal_values_of(series)?,
            }),
            SemanticType::Categorical => TypedColumn::Categorical(CategoricalColumn {
                name,
                values: string_values_of(series)?,
            }),
            SemanticType::Text => TypedColumn::Text(TextColumn {
                name,
                values: string_values_of(series)?,
            }),
        };
        Ok(column)
    }

    /// Check that `profiles` describe exactly this dataset's columns, in order.
    pub fn check_profiles(&self, profiles: &[ColumnProfile]) -> Result<()> {
        let names = self.column_names();
        if names.len() != profiles.len() {
            return Err(ReportingError::ContractViolation(format!(
                "dataset has {} columns but {} profiles were supplied",
                names.len(),
                profiles.len()
            )));
        }
        for (name, profile) in names.iter().zip(profiles) {
            if name != &profile.name {
                return Err(ReportingError::ContractViolation(format!(
                    "profile '{}' does not match column '{}'",
                    profile.name, name
                )));
            }
        }
        Ok(())
    }

    /// The profiles of the columns still present, in dataset order.
    ///
    /// Every remaining column must have a profile.
    pub fn retain_profiles(&self, profiles: &[ColumnProfile]) -> Result<Vec<ColumnProfile>> {
        let by_name: HashMap<&str, &ColumnProfile> =
            profiles.iter().map(|p| (p.name.as_str(), p)).collect();
        self.column_names()
            .iter()
            .map(|name| {
                by_name.get(name.as_str()).map(|p| (*p).clone()).ok_or_else(|| {
                    ReportingError::ContractViolation(format!("column '{}' has no profile", name))
                })
            })
            .collect()
    }
}

fn string_values_of(series: &Series) -> Result<Vec<Option<String>>> {
    let as_str = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn numeric_values_of(series: &Series) -> Result<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }
    Ok(string_values_of(series)?
        .into_iter()
        .map(|v| v.and_then(|s| parse_numeric_string(&s)))
        .collect())
}

fn temporal_values_of(series: &Series) -> Result<Vec<Option<NaiveDateTime>>> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let per_milli: i64 = match unit {
                TimeUnit::Nanoseconds => 1_000_000,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Milliseconds => 1,
            };
            let raw = series.cast(&DataType::Int64)?;
            Ok(raw
                .i64()?
                .into_iter()
                .map(|v| v.and_then(|x| datetime_from_millis(x.div_euclid(per_milli))))
                .collect())
        }
        DataType::Date => {
            let raw = series.cast(&DataType::Int32)?;
            Ok(raw
                .i32()?
                .into_iter()
                .map(|v| v.and_then(|days| datetime_from_millis(days as i64 * 86_400_000)))
                .collect())
        }
        _ => Ok(string_values_of(series)?
            .into_iter()
            .map(|v| v.and_then(|s| parse_datetime_string(&s)))
            .collect()),
    }
}

// ============================================================================
// Typed Column Views
// ============================================================================

/// A column read in its semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    Numeric(NumericColumn),
    Categorical(CategoricalColumn),
    Temporal(TemporalColumn),
    Text(TextColumn),
}

impl TypedColumn {
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric(c) => &c.name,
            Self::Categorical(c) => &c.name,
            Self::Temporal(c) => &c.name,
            Self::Text(c) => &c.name,
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::Numeric(_) => SemanticType::Numeric,
            Self::Categorical(_) => SemanticType::Categorical,
            Self::Temporal(_) => SemanticType::Temporal,
            Self::Text(_) => SemanticType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(c) => c.values.len(),
            Self::Categorical(c) => c.values.len(),
            Self::Temporal(c) => c.values.len(),
            Self::Text(c) => c.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            Self::Numeric(c) => c.values.iter().filter(|v| v.is_none()).count(),
            Self::Categorical(c) => c.values.iter().filter(|v| v.is_none()).count(),
            Self::Temporal(c) => c.values.iter().filter(|v| v.is_none()).count(),
            Self::Text(c) => c.values.iter().filter(|v| v.is_none()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    name: String,
    values: Vec<Option<f64>>,
}

impl NumericColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn present(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    pub fn median(&self) -> Option<f64> {
        statistics::median(&self.present())
    }

    pub fn mean(&self) -> Option<f64> {
        statistics::mean(&self.present())
    }

    pub fn std_dev(&self) -> f64 {
        statistics::sample_std_dev(&self.present())
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().flatten().copied().reduce(f64::max)
    }

    pub fn total(&self) -> f64 {
        self.values.iter().flatten().sum()
    }

    pub fn distinct_count(&self) -> usize {
        statistics::distinct_floats(&self.present())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    name: String,
    values: Vec<Option<String>>,
}

impl CategoricalColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// `(value, count)` pairs, count descending, ties in first-seen order.
    pub fn frequencies(&self) -> Vec<(String, usize)> {
        statistics::frequencies(self.values.iter().flatten().map(String::as_str))
    }

    /// Most frequent value; ties go to the value seen first.
    pub fn mode(&self) -> Option<String> {
        self.frequencies().into_iter().next().map(|(value, _)| value)
    }

    pub fn distinct_count(&self) -> usize {
        self.values
            .iter()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalColumn {
    name: String,
    values: Vec<Option<NaiveDateTime>>,
}

impl TemporalColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<NaiveDateTime>] {
        &self.values
    }

    pub fn min(&self) -> Option<NaiveDateTime> {
        self.values.iter().flatten().min().copied()
    }

    pub fn max(&self) -> Option<NaiveDateTime> {
        self.values.iter().flatten().max().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
    name: String,
    values: Vec<Option<String>>,
}

impl TextColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }
}

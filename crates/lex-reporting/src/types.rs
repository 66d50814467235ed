use crate::config::TrendGranularity;
use crate::dataset::Dataset;
use crate::error::CleaningWarning;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Profiling Types
// ============================================================================

/// Semantic type assigned to a column by the schema profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Categorical,
    Temporal,
    Text,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Temporal => "temporal",
            Self::Text => "text",
        }
    }

    /// Column group this type contributes to in reports, if any.
    pub fn column_group(&self) -> Option<ColumnGroup> {
        match self {
            Self::Numeric => Some(ColumnGroup::Numeric),
            Self::Categorical => Some(ColumnGroup::Categorical),
            Self::Temporal | Self::Text => None,
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bound of an ordered column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileValue {
    Number(f64),
    Timestamp(NaiveDateTime),
}

impl std::fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", crate::utils::format_number(*v)),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: SemanticType,
    pub row_count: usize,
    pub null_count: usize,
    /// Distinct non-null values.
    pub distinct_count: usize,
    /// Non-null values that do not coerce to `semantic_type`.
    pub coercion_failures: usize,
    /// Present for numeric and temporal columns only.
    pub min: Option<ProfileValue>,
    pub max: Option<ProfileValue>,
}

impl ColumnProfile {
    pub fn null_ratio(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.row_count as f64
        }
    }
}

// ============================================================================
// Quality Types
// ============================================================================

/// Data quality measurements of one dataset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub total_columns: usize,
    /// Rows that repeat an earlier row exactly.
    pub duplicate_rows: usize,
    pub null_cells: usize,
    pub non_null_cells: usize,
    /// Non-null cells that do not coerce to their column's profiled type.
    pub coercion_failures: usize,
    /// Weighted composite in `[0, 1]`.
    pub quality_score: f64,
    #[serde(default)]
    pub warnings: Vec<CleaningWarning>,
    /// What the cleaner changed. Empty for reports not produced by a clean.
    #[serde(default)]
    pub cleaning: CleaningSummary,
}

impl QualityReport {
    pub fn total_cells(&self) -> usize {
        self.total_rows * self.total_columns
    }

    pub fn duplicate_ratio(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.duplicate_rows as f64 / self.total_rows as f64
        }
    }

    pub fn null_ratio(&self) -> f64 {
        let total = self.total_cells();
        if total == 0 {
            0.0
        } else {
            self.null_cells as f64 / total as f64
        }
    }

    /// Share of non-null cells that coerce to their profiled type.
    /// An empty dataset counts as fully coercible.
    pub fn coercion_success_ratio(&self) -> f64 {
        if self.non_null_cells == 0 {
            1.0
        } else {
            1.0 - self.coercion_failures as f64 / self.non_null_cells as f64
        }
    }
}

/// Row, cell and column changes made by one clean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Rows with no value in any column.
    pub empty_rows_removed: usize,
    /// Exact repeats, including rows that only matched once filled and coerced.
    pub duplicate_rows_removed: usize,
    /// Missing or uncoercible cells replaced by an imputed value.
    pub cells_filled: usize,
    pub columns_dropped: usize,
    /// Human-readable log of each step, in order.
    pub actions: Vec<String>,
}

// ============================================================================
// Analysis Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What orders the periods of a trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendBasis {
    /// Values summed per bucket of a temporal column.
    TemporalColumn {
        column: String,
        granularity: TrendGranularity,
    },
    /// No temporal column: each row is one period.
    RowOrder,
}

/// Change of a numeric column between two consecutive periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendObservation {
    pub column: String,
    pub previous_period: String,
    pub current_period: String,
    pub previous: f64,
    pub current: f64,
    /// `None` when the previous value is zero.
    pub pct_change: Option<f64>,
    pub direction: TrendDirection,
}

impl TrendObservation {
    pub fn period_label(&self) -> String {
        format!("{} -> {}", self.previous_period, self.current_period)
    }
}

/// Per-period values of a numeric column, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub column: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub distinct_count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
    /// Share of the column's non-null values, in `[0, 1]`.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub distinct_count: usize,
    pub mode: Option<String>,
    pub mode_count: usize,
    /// Most frequent values, count descending.
    pub top: Vec<FrequencyEntry>,
}

/// A single computed statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statistic {
    Number(f64),
    Count(usize),
    Label(String),
}

/// Report column grouping. Each present group gets its own workbook sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnGroup {
    Numeric,
    Categorical,
}

impl ColumnGroup {
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Numeric => "Numeric Analysis",
            Self::Categorical => "Categorical Analysis",
        }
    }
}

/// Everything the report builders need, owned by the run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub dataset: Dataset,
    /// Profiles of the columns that survived cleaning, in dataset order.
    pub profiles: Vec<ColumnProfile>,
    /// Quality of the raw input.
    pub quality_pre: QualityReport,
    /// Quality of the cleaned dataset.
    pub quality: QualityReport,
    pub metrics: BTreeMap<String, Statistic>,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    pub trend_basis: TrendBasis,
    pub trend_series: Vec<TrendSeries>,
    pub trends: Vec<TrendObservation>,
}

impl AnalysisResult {
    /// Column groups present, in report order.
    pub fn column_groups(&self) -> Vec<ColumnGroup> {
        let mut groups = Vec::new();
        if !self.numeric.is_empty() {
            groups.push(ColumnGroup::Numeric);
        }
        if !self.categorical.is_empty() {
            groups.push(ColumnGroup::Categorical);
        }
        groups
    }

    /// The `n` trend observations with the largest absolute change.
    ///
    /// Undefined changes rank last; ties keep their original order.
    pub fn top_trends(&self, n: usize) -> Vec<&TrendObservation> {
        let mut ranked: Vec<&TrendObservation> = self.trends.iter().collect();
        ranked.sort_by(|a, b| {
            let key = |t: &TrendObservation| t.pct_change.map(f64::abs).unwrap_or(-1.0);
            key(b).total_cmp(&key(a))
        });
        ranked.truncate(n);
        ranked
    }

    pub fn trend_series_for(&self, column: &str) -> Option<&TrendSeries> {
        self.trend_series.iter().find(|s| s.column == column)
    }

    /// Serializable view without the dataset itself.
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            rows: self.dataset.height(),
            columns: self.dataset.width(),
            profiles: self.profiles.clone(),
            quality_pre: self.quality_pre.clone(),
            quality: self.quality.clone(),
            metrics: self.metrics.clone(),
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
            trend_basis: self.trend_basis.clone(),
            trends: self.trends.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub rows: usize,
    pub columns: usize,
    pub profiles: Vec<ColumnProfile>,
    pub quality_pre: QualityReport,
    pub quality: QualityReport,
    pub metrics: BTreeMap<String, Statistic>,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    pub trend_basis: TrendBasis,
    pub trends: Vec<TrendObservation>,
}

// ============================================================================
// Artifact Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Workbook,
    Document,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Workbook => "xlsx",
            Self::Document => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Workbook => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Document => "application/pdf",
        }
    }
}

/// A finished report file, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    format: ArtifactFormat,
    filename: String,
    payload: Vec<u8>,
}

impl ReportArtifact {
    pub fn new(format: ArtifactFormat, filename: String, payload: Vec<u8>) -> Self {
        Self {
            format,
            filename,
            payload,
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// The two artifacts of one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub workbook: ReportArtifact,
    pub document: ReportArtifact,
}

impl ReportArtifacts {
    pub fn into_vec(self) -> Vec<ReportArtifact> {
        vec![self.workbook, self.document]
    }
}

static_assertions::assert_impl_all!(AnalysisResult: Send, Sync);
static_assertions::assert_impl_all!(ReportArtifact: Send, Sync);

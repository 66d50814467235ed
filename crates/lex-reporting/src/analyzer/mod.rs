//! Descriptive analysis of a cleaned dataset.
//!
//! [`Analyzer::analyze`] computes per-column summaries, the flat metrics map,
//! period-over-period trends and the post-cleaning quality report. The result
//! is a pure function of its inputs.

mod trends;

use crate::config::ReportConfig;
use crate::dataset::{Dataset, TypedColumn};
use crate::error::Result;
use crate::profiler::statistics;
use crate::quality::DataQualityAnalyzer;
use crate::types::{
    AnalysisResult, CategoricalSummary, ColumnProfile, FrequencyEntry, NumericSummary,
    QualityReport, Statistic,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Analyzer for cleaned datasets.
pub struct Analyzer;

impl Analyzer {
    /// Analyze `dataset` (the cleaner's output) described by `profiles`.
    ///
    /// `quality_pre` is the report of the raw input and is carried into the
    /// result unchanged for the before/after comparison.
    pub fn analyze(
        dataset: Dataset,
        profiles: Vec<ColumnProfile>,
        quality_pre: QualityReport,
        config: &ReportConfig,
    ) -> Result<AnalysisResult> {
        dataset.check_profiles(&profiles)?;
        info!(
            rows = dataset.height(),
            columns = dataset.width(),
            "Analyzing dataset..."
        );

        let quality = DataQualityAnalyzer::assess(&dataset, &profiles, &config.quality_weights)?;

        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for profile in &profiles {
            match dataset.typed_column(profile)? {
                TypedColumn::Numeric(column) => {
                    if let Some(summary) = Self::summarize_numeric(column.name(), &column.present()) {
                        numeric.push(summary);
                    }
                }
                TypedColumn::Categorical(column) => {
                    let frequencies = column.frequencies();
                    categorical.push(Self::summarize_categorical(
                        column.name(),
                        &frequencies,
                        config.top_n,
                    ));
                }
                TypedColumn::Temporal(_) | TypedColumn::Text(_) => {}
            }
        }

        let trend_analysis = trends::analyze_trends(
            &dataset,
            &profiles,
            config.trend_granularity,
            config.flat_band_pct,
        )?;
        debug!(
            series = trend_analysis.series.len(),
            observations = trend_analysis.observations.len(),
            basis = ?trend_analysis.basis,
            "Trends computed"
        );

        let metrics = Self::collect_metrics(&dataset, &quality, &numeric, &categorical);

        info!(
            numeric_columns = numeric.len(),
            categorical_columns = categorical.len(),
            quality_score = quality.quality_score,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            dataset,
            profiles,
            quality_pre,
            quality,
            metrics,
            numeric,
            categorical,
            trend_basis: trend_analysis.basis,
            trend_series: trend_analysis.series,
            trends: trend_analysis.observations,
        })
    }

    fn summarize_numeric(column: &str, values: &[f64]) -> Option<NumericSummary> {
        let mean = statistics::mean(values)?;
        let median = statistics::median(values)?;
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some(NumericSummary {
            column: column.to_string(),
            count: values.len(),
            distinct_count: statistics::distinct_floats(values),
            mean,
            median,
            std_dev: statistics::sample_std_dev(values),
            min,
            max,
            total: values.iter().sum(),
        })
    }

    fn summarize_categorical(
        column: &str,
        frequencies: &[(String, usize)],
        top_n: usize,
    ) -> CategoricalSummary {
        let count: usize = frequencies.iter().map(|(_, c)| c).sum();
        let share = |c: usize| if count == 0 { 0.0 } else { c as f64 / count as f64 };
        let top = frequencies
            .iter()
            .take(top_n)
            .map(|(value, c)| FrequencyEntry {
                value: value.clone(),
                count: *c,
                share: share(*c),
            })
            .collect();
        let (mode, mode_count) = match frequencies.first() {
            Some((value, c)) => (Some(value.clone()), *c),
            None => (None, 0),
        };

        CategoricalSummary {
            column: column.to_string(),
            count,
            distinct_count: frequencies.len(),
            mode,
            mode_count,
            top,
        }
    }

    fn collect_metrics(
        dataset: &Dataset,
        quality: &QualityReport,
        numeric: &[NumericSummary],
        categorical: &[CategoricalSummary],
    ) -> BTreeMap<String, Statistic> {
        let mut metrics = BTreeMap::new();
        metrics.insert("dataset.rows".to_string(), Statistic::Count(dataset.height()));
        metrics.insert("dataset.columns".to_string(), Statistic::Count(dataset.width()));
        metrics.insert(
            "dataset.quality_score".to_string(),
            Statistic::Number(quality.quality_score),
        );

        for summary in numeric {
            let stats = [
                ("mean", summary.mean),
                ("median", summary.median),
                ("std_dev", summary.std_dev),
                ("min", summary.min),
                ("max", summary.max),
                ("total", summary.total),
            ];
            for (key, value) in stats {
                metrics.insert(format!("{}.{}", summary.column, key), Statistic::Number(value));
            }
        }

        for summary in categorical {
            metrics.insert(
                format!("{}.distinct", summary.column),
                Statistic::Count(summary.distinct_count),
            );
            if let Some(mode) = &summary.mode {
                metrics.insert(format!("{}.mode", summary.column), Statistic::Label(mode.clone()));
            }
        }

        metrics
    }
}

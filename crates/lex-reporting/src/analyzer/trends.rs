//! Period-over-period trend computation.
//!
//! The first temporal column orders the data. Each numeric column is summed
//! per bucket (day, ISO week or calendar month) and consecutive buckets are
//! compared. Without a temporal column, row order stands in for time and
//! every row is one period.

use crate::config::TrendGranularity;
use crate::dataset::{Dataset, TypedColumn};
use crate::error::Result;
use crate::types::{ColumnProfile, SemanticType, TrendBasis, TrendDirection, TrendObservation, TrendSeries};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Tolerance applied to the flat band edges.
const FLAT_EPSILON: f64 = 1e-9;

pub(crate) struct TrendAnalysis {
    pub basis: TrendBasis,
    pub series: Vec<TrendSeries>,
    pub observations: Vec<TrendObservation>,
}

pub(crate) fn analyze_trends(
    dataset: &Dataset,
    profiles: &[ColumnProfile],
    granularity: TrendGranularity,
    flat_band_pct: f64,
) -> Result<TrendAnalysis> {
    let time_axis = match profiles
        .iter()
        .find(|p| p.semantic_type == SemanticType::Temporal)
    {
        Some(profile) => match dataset.typed_column(profile)? {
            TypedColumn::Temporal(column) => Some((profile.name.clone(), column.values().to_vec())),
            _ => None,
        },
        None => None,
    };

    let basis = match &time_axis {
        Some((name, _)) => TrendBasis::TemporalColumn {
            column: name.clone(),
            granularity,
        },
        None => TrendBasis::RowOrder,
    };

    let mut series = Vec::new();
    for profile in profiles
        .iter()
        .filter(|p| p.semantic_type == SemanticType::Numeric)
    {
        let TypedColumn::Numeric(column) = dataset.typed_column(profile)? else {
            continue;
        };
        let trend = match &time_axis {
            Some((_, timestamps)) => bucket_series(&profile.name, timestamps, column.values(), granularity),
            None => row_series(&profile.name, column.values()),
        };
        series.push(trend);
    }

    let observations = series
        .iter()
        .flat_map(|s| observe(s, flat_band_pct))
        .collect();

    Ok(TrendAnalysis {
        basis,
        series,
        observations,
    })
}

fn bucket_series(
    column: &str,
    timestamps: &[Option<NaiveDateTime>],
    values: &[Option<f64>],
    granularity: TrendGranularity,
) -> TrendSeries {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, value) in timestamps.iter().zip(values) {
        if let (Some(ts), Some(value)) = (ts, value) {
            *buckets.entry(bucket_start(ts.date(), granularity)).or_insert(0.0) += value;
        }
    }

    let (labels, values) = buckets
        .into_iter()
        .map(|(start, total)| (bucket_label(start, granularity), total))
        .unzip();
    TrendSeries {
        column: column.to_string(),
        labels,
        values,
    }
}

fn row_series(column: &str, values: &[Option<f64>]) -> TrendSeries {
    let (labels, values) = values
        .iter()
        .enumerate()
        .filter_map(|(row, value)| value.map(|v| (format!("Row {}", row + 1), v)))
        .unzip();
    TrendSeries {
        column: column.to_string(),
        labels,
        values,
    }
}

pub(crate) fn bucket_start(date: NaiveDate, granularity: TrendGranularity) -> NaiveDate {
    match granularity {
        TrendGranularity::Day => date,
        TrendGranularity::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        TrendGranularity::Month => date.with_day(1).unwrap_or(date),
    }
}

pub(crate) fn bucket_label(start: NaiveDate, granularity: TrendGranularity) -> String {
    match granularity {
        TrendGranularity::Day => start.format("%Y-%m-%d").to_string(),
        TrendGranularity::Week => {
            let week = start.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        TrendGranularity::Month => start.format("%Y-%m").to_string(),
    }
}

fn observe(series: &TrendSeries, flat_band_pct: f64) -> Vec<TrendObservation> {
    series
        .values
        .windows(2)
        .zip(series.labels.windows(2))
        .map(|(values, labels)| {
            let (pct_change, direction) = classify_change(values[0], values[1], flat_band_pct);
            TrendObservation {
                column: series.column.clone(),
                previous_period: labels[0].clone(),
                current_period: labels[1].clone(),
                previous: values[0],
                current: values[1],
                pct_change,
                direction,
            }
        })
        .collect()
}

/// Percentage change and direction between two consecutive periods.
///
/// The change is undefined when `previous` is zero; the direction then
/// follows the sign of the difference.
pub(crate) fn classify_change(
    previous: f64,
    current: f64,
    flat_band_pct: f64,
) -> (Option<f64>, TrendDirection) {
    if previous == 0.0 {
        let direction = if current > 0.0 {
            TrendDirection::Up
        } else if current < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        };
        return (None, direction);
    }

    let pct = (current - previous) / previous.abs() * 100.0;
    let direction = if pct.abs() <= flat_band_pct + FLAT_EPSILON {
        TrendDirection::Flat
    } else if pct > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };
    (Some(pct), direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_classify_change_flat_band() {
        assert_eq!(classify_change(100.0, 101.0, 1.0).1, TrendDirection::Flat);
        assert_eq!(classify_change(101.0, 102.01, 1.0).1, TrendDirection::Flat);
        assert_eq!(classify_change(100.0, 99.0, 1.0).1, TrendDirection::Flat);
        assert_eq!(classify_change(100.0, 101.5, 1.0).1, TrendDirection::Up);
        assert_eq!(classify_change(100.0, 98.0, 1.0).1, TrendDirection::Down);
    }

    #[test]
    fn test_classify_change_from_zero() {
        assert_eq!(classify_change(0.0, 5.0, 1.0), (None, TrendDirection::Up));
        assert_eq!(classify_change(0.0, -5.0, 1.0), (None, TrendDirection::Down));
        assert_eq!(classify_change(0.0, 0.0, 1.0), (None, TrendDirection::Flat));
    }

    #[test]
    fn test_classify_change_negative_base() {
        // -100 -> -50 is an improvement of 50%
        let (pct, direction) = classify_change(-100.0, -50.0, 1.0);
        assert_eq!(pct, Some(50.0));
        assert_eq!(direction, TrendDirection::Up);
    }

    #[test]
    fn test_bucket_start() {
        // 2024-01-17 is a Wednesday
        let d = date(2024, 1, 17);
        assert_eq!(bucket_start(d, TrendGranularity::Day), d);
        assert_eq!(bucket_start(d, TrendGranularity::Week), date(2024, 1, 15));
        assert_eq!(bucket_start(d, TrendGranularity::Month), date(2024, 1, 1));
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(bucket_label(date(2024, 1, 15), TrendGranularity::Week), "2024-W03");
        assert_eq!(bucket_label(date(2024, 3, 1), TrendGranularity::Month), "2024-03");
        assert_eq!(bucket_label(date(2024, 3, 9), TrendGranularity::Day), "2024-03-09");
    }

    #[test]
    fn test_bucket_series_sums_per_month() {
        let ts = |m, d| Some(date(2024, m, d).and_hms_opt(0, 0, 0).unwrap());
        let timestamps = vec![ts(2, 3), ts(1, 5), ts(1, 20), ts(2, 1)];
        let values = vec![Some(5.0), Some(10.0), Some(15.0), Some(20.0)];

        let series = bucket_series("Sales", &timestamps, &values, TrendGranularity::Month);

        assert_eq!(series.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(series.values, vec![25.0, 25.0]);
    }

    #[test]
    fn test_row_series_labels() {
        let series = row_series("Sales", &[Some(1.0), Some(2.0)]);
        assert_eq!(series.labels, vec!["Row 1", "Row 2"]);
    }
}

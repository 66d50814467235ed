//! Chart rendering.
//!
//! Charts are drawn into an in-memory RGB bitmap with plotters and encoded
//! as PNG. They carry no text; titles and axis labels live in the
//! surrounding workbook cells or document blocks.

use crate::config::{MAX_CHART_SIDE, ReportStyle};
use crate::error::{RenderError, Result};
use crate::types::AnalysisResult;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

/// Minimum distinct values a column needs before it is charted.
pub const MIN_DISTINCT_VALUES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Period values of a numeric column.
    Line,
    /// Category frequencies.
    Bar,
}

/// Data points of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub column: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Distinct non-null values in the underlying column.
    pub distinct_values: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub series: ChartSeries,
}

/// A PNG chart image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

pub type ChartOutcome = std::result::Result<RenderedChart, RenderError>;

/// Render outcomes keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSet {
    charts: BTreeMap<String, ChartOutcome>,
}

impl ChartSet {
    pub fn get(&self, column: &str) -> Option<&ChartOutcome> {
        self.charts.get(column)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn rendered_count(&self) -> usize {
        self.charts.values().filter(|c| c.is_ok()).count()
    }
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Build one chart request per numeric and categorical column.
    ///
    /// Numeric columns chart their trend series, categorical columns their
    /// top-N frequencies.
    pub fn requests(analysis: &AnalysisResult) -> Vec<ChartRequest> {
        let mut requests = Vec::new();
        for summary in &analysis.numeric {
            let (labels, values) = match analysis.trend_series_for(&summary.column) {
                Some(series) => (series.labels.clone(), series.values.clone()),
                None => (Vec::new(), Vec::new()),
            };
            requests.push(ChartRequest {
                kind: ChartKind::Line,
                series: ChartSeries {
                    column: summary.column.clone(),
                    labels,
                    values,
                    distinct_values: summary.distinct_count,
                },
            });
        }
        for summary in &analysis.categorical {
            requests.push(ChartRequest {
                kind: ChartKind::Bar,
                series: ChartSeries {
                    column: summary.column.clone(),
                    labels: summary.top.iter().map(|e| e.value.clone()).collect(),
                    values: summary.top.iter().map(|e| e.count as f64).collect(),
                    distinct_values: summary.distinct_count,
                },
            });
        }
        requests
    }

    /// Render one chart.
    pub fn render(series: &ChartSeries, kind: ChartKind, style: &ReportStyle) -> ChartOutcome {
        let points = series.values.len();
        if series.distinct_values < MIN_DISTINCT_VALUES || points < MIN_DISTINCT_VALUES {
            return Err(RenderError::InsufficientData {
                distinct: series.distinct_values.min(points),
            });
        }
        if series.values.iter().any(|v| !v.is_finite()) {
            return Err(RenderError::RenderFailure(format!(
                "series '{}' contains non-finite values",
                series.column
            )));
        }

        let (width, height) = (style.chart_width, style.chart_height);
        if !(1..=MAX_CHART_SIDE).contains(&width) || !(1..=MAX_CHART_SIDE).contains(&height) {
            return Err(RenderError::RenderFailure(format!(
                "chart size {}x{} is out of range",
                width, height
            )));
        }
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(failure)?;
            match kind {
                ChartKind::Line => draw_line(&root, &series.values, style)?,
                ChartKind::Bar => draw_bars(&root, &series.values, style)?,
            }
            root.present().map_err(failure)?;
        }

        Ok(RenderedChart {
            kind,
            width,
            height,
            png: encode_png(buffer, width, height)?,
        })
    }

    /// Render all requests concurrently and wait for every one of them.
    ///
    /// Individual render failures are kept in the set; only a panicked
    /// render thread is an error.
    pub fn render_all(requests: &[ChartRequest], style: &ReportStyle) -> Result<ChartSet> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut charts = BTreeMap::new();
        for batch in requests.chunks(workers) {
            let outcomes = std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|request| {
                        scope.spawn(move || Self::render(&request.series, request.kind, style))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join())
                    .collect::<Vec<_>>()
            });

            for (request, outcome) in batch.iter().zip(outcomes) {
                let outcome = super::joined(outcome, || {
                    format!("chart render for '{}'", request.series.column)
                })?;
                match &outcome {
                    Ok(chart) => debug!(
                        column = %request.series.column,
                        bytes = chart.png.len(),
                        "Chart rendered"
                    ),
                    Err(e) => warn!(column = %request.series.column, "Chart skipped: {}", e),
                }
                charts.insert(request.series.column.clone(), outcome);
            }
        }

        Ok(ChartSet { charts })
    }
}

fn failure<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::RenderFailure(e.to_string())
}

fn rgb(color: (u8, u8, u8)) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// Value axis range with a little headroom; flat series get a unit band.
fn value_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn draw_line(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &[f64],
    style: &ReportStyle,
) -> std::result::Result<(), RenderError> {
    let (low, high) = value_range(values);
    let last = (values.len() - 1) as f64;
    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(0f64..last, low..high)
        .map_err(failure)?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, low), (last, low)],
            BLACK.stroke_width(1),
        )))
        .map_err(failure)?;
    chart
        .draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            rgb(style.primary_color()).stroke_width(3),
        ))
        .map_err(failure)?;
    Ok(())
}

fn draw_bars(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    values: &[f64],
    style: &ReportStyle,
) -> std::result::Result<(), RenderError> {
    let max = values.iter().copied().fold(0.0, f64::max);
    let top = if max > 0.0 { max * 1.1 } else { 1.0 };
    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .build_cartesian_2d(0f64..values.len() as f64, 0f64..top)
        .map_err(failure)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, v)| {
            let x = i as f64;
            Rectangle::new([(x + 0.15, 0.0), (x + 0.85, *v)], rgb(style.color(i)).filled())
        }))
        .map_err(failure)?;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 0.0), (values.len() as f64, 0.0)],
            BLACK.stroke_width(1),
        )))
        .map_err(failure)?;
    Ok(())
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> std::result::Result<Vec<u8>, RenderError> {
    let bitmap = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::RenderFailure("bitmap size mismatch".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(bitmap)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(failure)?;
    Ok(png.into_inner())
}

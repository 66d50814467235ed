//! Spreadsheet workbook artifact.
//!
//! [`WorkbookBuilder::layout`] decides every sheet, row and chart anchor as
//! plain data; [`WorkbookBuilder::build`] writes that layout with
//! rust_xlsxwriter. Sheets, in order: "Summary", "Raw-Cleaned Diff", then one
//! sheet per column group present in the analysis.

use crate::config::ReportStyle;
use crate::error::{CleaningWarning, Result, ResultExt};
use crate::reporting::charts::ChartSet;
use crate::types::{AnalysisResult, ColumnGroup, Statistic, TrendObservation};
use crate::utils::format_change_pct;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, DocProperties, Format, FormatAlign, Image, Workbook, Worksheet};
use tracing::{debug, info};

pub const SUMMARY_SHEET: &str = "Summary";
pub const DIFF_SHEET: &str = "Raw-Cleaned Diff";

/// Rows left between stacked chart images.
const CHART_ROW_SPAN: u32 = 22;

/// Trend rows written to the numeric sheet. Beyond this, each column keeps
/// only its most recent periods.
pub const MAX_TREND_ROWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Title(String),
    Header(String),
    Text(String),
    Number(f64),
    Count(usize),
    /// A ratio in `[0, 1]`, shown as a percentage.
    Percent(f64),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    fn header(value: impl Into<String>) -> Self {
        Self::Header(value.into())
    }
}

/// Where a column's chart goes on a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAnchor {
    pub column: String,
    pub row: u32,
    pub col: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    pub column_widths: Vec<f64>,
    pub charts: Vec<ChartAnchor>,
}

impl SheetLayout {
    fn new(name: impl Into<String>, column_widths: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            column_widths,
            charts: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn blank(&mut self) {
        self.rows.push(Vec::new());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookLayout {
    pub sheets: Vec<SheetLayout>,
}

impl WorkbookLayout {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetLayout> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

pub struct WorkbookBuilder;

impl WorkbookBuilder {
    /// Lay out every sheet. Pure.
    pub fn layout(
        analysis: &AnalysisResult,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> WorkbookLayout {
        let mut sheets = vec![
            Self::summary_sheet(analysis, style, generated_at),
            Self::diff_sheet(analysis),
        ];
        for group in analysis.column_groups() {
            sheets.push(match group {
                ColumnGroup::Numeric => Self::numeric_sheet(analysis),
                ColumnGroup::Categorical => Self::categorical_sheet(analysis),
            });
        }
        WorkbookLayout { sheets }
    }

    /// Write the workbook. Charts that failed to render get a note in place
    /// of the image.
    pub fn build(
        analysis: &AnalysisResult,
        charts: &ChartSet,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> Result<Vec<u8>> {
        let layout = Self::layout(analysis, style, generated_at);
        let formats = SheetFormats::new(style);

        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_title(&style.title)
            .set_author(&style.author)
            .set_company(&style.company_name);
        workbook.set_properties(&properties);

        for sheet in &layout.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            Self::write_sheet(worksheet, sheet, charts, &formats)
                .context(format!("writing sheet '{}'", sheet.name))?;
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Sheet written");
        }

        let bytes = workbook.save_to_buffer()?;
        info!(sheets = layout.sheets.len(), bytes = bytes.len(), "Workbook built");
        Ok(bytes)
    }

    fn write_sheet(
        worksheet: &mut Worksheet,
        sheet: &SheetLayout,
        charts: &ChartSet,
        formats: &SheetFormats,
    ) -> Result<()> {
        for (col, width) in sheet.column_widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        for (row, cells) in sheet.rows.iter().enumerate() {
            let row = row as u32;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Title(text) => {
                        worksheet.write_string_with_format(row, col, text, &formats.title)?;
                    }
                    Cell::Header(text) => {
                        worksheet.write_string_with_format(row, col, text, &formats.header)?;
                    }
                    Cell::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number_with_format(row, col, *value, &formats.number)?;
                    }
                    Cell::Count(value) => {
                        worksheet.write_number(row, col, *value as f64)?;
                    }
                    Cell::Percent(value) => {
                        worksheet.write_number_with_format(row, col, *value, &formats.percent)?;
                    }
                }
            }
        }

        for anchor in &sheet.charts {
            match charts.get(&anchor.column) {
                Some(Ok(chart)) => {
                    let image = Image::new_from_buffer(&chart.png)?;
                    worksheet.insert_image(anchor.row, anchor.col, &image)?;
                }
                Some(Err(e)) => {
                    let note = format!("Chart unavailable for '{}': {}", anchor.column, e);
                    worksheet.write_string_with_format(anchor.row, anchor.col, &note, &formats.note)?;
                }
                None => {
                    let note = format!("Chart unavailable for '{}'", anchor.column);
                    worksheet.write_string_with_format(anchor.row, anchor.col, &note, &formats.note)?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Sheet layouts
    // ========================================================================

    fn summary_sheet(
        analysis: &AnalysisResult,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> SheetLayout {
        let mut sheet = SheetLayout::new(SUMMARY_SHEET, vec![32.0, 24.0, 18.0, 14.0]);
        let pre = &analysis.quality_pre;
        let post = &analysis.quality;

        sheet.push(vec![Cell::Title(style.title.clone())]);
        sheet.push(vec![Cell::text("Company"), Cell::text(&style.company_name)]);
        sheet.push(vec![Cell::text("Author"), Cell::text(&style.author)]);
        sheet.push(vec![
            Cell::text("Generated"),
            Cell::text(generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
        sheet.blank();

        sheet.push(vec![Cell::header("Overview"), Cell::header("Value")]);
        sheet.push(vec![Cell::text("Quality Score"), Cell::Percent(post.quality_score)]);
        sheet.push(vec![Cell::text("Rows Analyzed"), Cell::Count(post.total_rows)]);
        sheet.push(vec![Cell::text("Columns Analyzed"), Cell::Count(post.total_columns)]);
        let cleaning = &pre.cleaning;
        sheet.push(vec![
            Cell::text("Empty Rows Removed"),
            Cell::Count(cleaning.empty_rows_removed),
        ]);
        sheet.push(vec![
            Cell::text("Duplicate Rows Removed"),
            Cell::Count(cleaning.duplicate_rows_removed),
        ]);
        sheet.push(vec![Cell::text("Missing Cells Filled"), Cell::Count(cleaning.cells_filled)]);
        sheet.push(vec![Cell::text("Cleaning Warnings"), Cell::Count(pre.warnings.len())]);
        sheet.blank();

        sheet.push(vec![Cell::header("Metric"), Cell::header("Value")]);
        for (key, statistic) in &analysis.metrics {
            let value = match statistic {
                Statistic::Number(v) => Cell::Number(*v),
                Statistic::Count(c) => Cell::Count(*c),
                Statistic::Label(l) => Cell::text(l),
            };
            sheet.push(vec![Cell::text(key), value]);
        }

        let top = analysis.top_trends(3);
        if !top.is_empty() {
            sheet.blank();
            sheet.push(vec![
                Cell::header("Top Trend"),
                Cell::header("Period"),
                Cell::header("Change"),
                Cell::header("Direction"),
            ]);
            for trend in top {
                sheet.push(vec![
                    Cell::text(&trend.column),
                    Cell::text(trend.period_label()),
                    Cell::text(format_change_pct(trend.pct_change)),
                    Cell::text(trend.direction.as_str()),
                ]);
            }
        }
        sheet
    }

    fn diff_sheet(analysis: &AnalysisResult) -> SheetLayout {
        let mut sheet = SheetLayout::new(DIFF_SHEET, vec![28.0, 16.0, 16.0, 16.0, 18.0, 14.0]);
        let pre = &analysis.quality_pre;
        let post = &analysis.quality;

        sheet.push(vec![
            Cell::header("Measure"),
            Cell::header("Raw"),
            Cell::header("Cleaned"),
            Cell::header("Change"),
        ]);
        let counts = [
            ("Rows", pre.total_rows, post.total_rows),
            ("Columns", pre.total_columns, post.total_columns),
            ("Duplicate Rows", pre.duplicate_rows, post.duplicate_rows),
            ("Missing Cells", pre.null_cells, post.null_cells),
            ("Type Coercion Failures", pre.coercion_failures, post.coercion_failures),
        ];
        for (label, raw, cleaned) in counts {
            sheet.push(vec![
                Cell::text(label),
                Cell::Count(raw),
                Cell::Count(cleaned),
                Cell::Number(cleaned as f64 - raw as f64),
            ]);
        }
        sheet.push(vec![
            Cell::text("Quality Score"),
            Cell::Percent(pre.quality_score),
            Cell::Percent(post.quality_score),
            Cell::Percent(post.quality_score - pre.quality_score),
        ]);
        sheet.blank();

        sheet.push(vec![
            Cell::header("Column"),
            Cell::header("Type"),
            Cell::header("Raw Missing"),
            Cell::header("Raw Missing %"),
            Cell::header("Coercion Failures"),
            Cell::header("Status"),
        ]);
        for profile in &analysis.profiles {
            sheet.push(vec![
                Cell::text(&profile.name),
                Cell::text(profile.semantic_type.as_str()),
                Cell::Count(profile.null_count),
                Cell::Percent(profile.null_ratio()),
                Cell::Count(profile.coercion_failures),
                Cell::text("retained"),
            ]);
        }
        for warning in &pre.warnings {
            if let CleaningWarning::ColumnDropped { column, .. } = warning {
                sheet.push(vec![
                    Cell::text(column),
                    Cell::Empty,
                    Cell::Count(pre.total_rows),
                    Cell::Percent(1.0),
                    Cell::Empty,
                    Cell::text("dropped"),
                ]);
            }
        }

        if !pre.warnings.is_empty() {
            sheet.blank();
            sheet.push(vec![Cell::header("Column"), Cell::header("Warning")]);
            for warning in &pre.warnings {
                sheet.push(vec![Cell::text(warning.column()), Cell::text(warning.to_string())]);
            }
        }
        sheet
    }

    fn numeric_sheet(analysis: &AnalysisResult) -> SheetLayout {
        let mut sheet = SheetLayout::new(
            ColumnGroup::Numeric.sheet_name(),
            vec![22.0, 18.0, 14.0, 14.0, 14.0, 12.0, 14.0],
        );

        sheet.push(vec![
            Cell::header("Column"),
            Cell::header("Mean"),
            Cell::header("Median"),
            Cell::header("Std Dev"),
            Cell::header("Min"),
            Cell::header("Max"),
            Cell::header("Total"),
        ]);
        for summary in &analysis.numeric {
            sheet.push(vec![
                Cell::text(&summary.column),
                Cell::Number(summary.mean),
                Cell::Number(summary.median),
                Cell::Number(summary.std_dev),
                Cell::Number(summary.min),
                Cell::Number(summary.max),
                Cell::Number(summary.total),
            ]);
        }

        if !analysis.trends.is_empty() {
            sheet.blank();
            sheet.push(vec![
                Cell::header("Column"),
                Cell::header("Period"),
                Cell::header("Previous"),
                Cell::header("Current"),
                Cell::header("Change %"),
                Cell::header("Direction"),
            ]);
            let (trends, omitted) = recent_trends(&analysis.trends);
            for trend in trends {
                sheet.push(vec![
                    Cell::text(&trend.column),
                    Cell::text(trend.period_label()),
                    Cell::Number(trend.previous),
                    Cell::Number(trend.current),
                    Cell::text(format_change_pct(trend.pct_change)),
                    Cell::text(trend.direction.as_str()),
                ]);
            }
            if omitted > 0 {
                sheet.push(vec![Cell::text(format!(
                    "Showing the most recent periods only; {} older trend rows omitted.",
                    omitted
                ))]);
            }
        }

        let chart_col = sheet.column_widths.len() as u16 + 1;
        sheet.charts = anchors(analysis.numeric.iter().map(|s| s.column.as_str()), chart_col);
        sheet
    }

    fn categorical_sheet(analysis: &AnalysisResult) -> SheetLayout {
        let mut sheet = SheetLayout::new(
            ColumnGroup::Categorical.sheet_name(),
            vec![22.0, 24.0, 12.0, 12.0],
        );

        sheet.push(vec![
            Cell::header("Column"),
            Cell::header("Distinct"),
            Cell::header("Mode"),
            Cell::header("Mode Count"),
        ]);
        for summary in &analysis.categorical {
            sheet.push(vec![
                Cell::text(&summary.column),
                Cell::Count(summary.distinct_count),
                Cell::text(summary.mode.clone().unwrap_or_default()),
                Cell::Count(summary.mode_count),
            ]);
        }
        sheet.blank();

        sheet.push(vec![
            Cell::header("Column"),
            Cell::header("Value"),
            Cell::header("Count"),
            Cell::header("Share"),
        ]);
        for summary in &analysis.categorical {
            for entry in &summary.top {
                sheet.push(vec![
                    Cell::text(&summary.column),
                    Cell::text(&entry.value),
                    Cell::Count(entry.count),
                    Cell::Percent(entry.share),
                ]);
            }
        }

        let chart_col = sheet.column_widths.len() as u16 + 1;
        sheet.charts = anchors(analysis.categorical.iter().map(|s| s.column.as_str()), chart_col);
        sheet
    }
}

/// At most [`MAX_TREND_ROWS`] observations, split evenly across columns and
/// keeping each column's latest periods, plus the number left out.
fn recent_trends(trends: &[TrendObservation]) -> (Vec<&TrendObservation>, usize) {
    if trends.len() <= MAX_TREND_ROWS {
        return (trends.iter().collect(), 0);
    }

    let columns = trends.chunk_by(|a, b| a.column == b.column).count();
    let per_column = (MAX_TREND_ROWS / columns).max(1);
    let mut kept: Vec<&TrendObservation> = trends
        .chunk_by(|a, b| a.column == b.column)
        .flat_map(|group| &group[group.len().saturating_sub(per_column)..])
        .collect();
    kept.truncate(MAX_TREND_ROWS);

    let omitted = trends.len() - kept.len();
    debug!(kept = kept.len(), omitted, "Trend table truncated");
    (kept, omitted)
}

/// Stack one chart per column to the right of the tables.
fn anchors<'a>(columns: impl Iterator<Item = &'a str>, col: u16) -> Vec<ChartAnchor> {
    columns
        .enumerate()
        .map(|(i, column)| ChartAnchor {
            column: column.to_string(),
            row: i as u32 * CHART_ROW_SPAN,
            col,
        })
        .collect()
}

struct SheetFormats {
    title: Format,
    header: Format,
    number: Format,
    percent: Format,
    note: Format,
}

impl SheetFormats {
    fn new(style: &ReportStyle) -> Self {
        let (r, g, b) = style.primary_color();
        let primary = Color::RGB(((r as u32) << 16) | ((g as u32) << 8) | b as u32);
        Self {
            title: Format::new().set_bold().set_font_size(16).set_font_color(primary),
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(primary)
                .set_align(FormatAlign::Center),
            number: Format::new().set_num_format("#,##0.00"),
            percent: Format::new().set_num_format("0.00%"),
            note: Format::new().set_italic().set_font_color(Color::Gray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CategoricalSummary, CleaningSummary, FrequencyEntry, NumericSummary, QualityReport, TrendBasis,
        TrendDirection,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn quality(rows: usize, score: f64) -> QualityReport {
        QualityReport {
            total_rows: rows,
            total_columns: 2,
            duplicate_rows: 0,
            null_cells: 0,
            non_null_cells: rows * 2,
            coercion_failures: 0,
            quality_score: score,
            warnings: Vec::new(),
            cleaning: CleaningSummary::default(),
        }
    }

    fn analysis(numeric: bool, categorical: bool) -> AnalysisResult {
        let dataset = crate::dataset::Dataset::from_string_columns(vec![
            ("A".to_string(), vec![Some("1".to_string())]),
            ("B".to_string(), vec![Some("x".to_string())]),
        ])
        .unwrap();
        AnalysisResult {
            dataset,
            profiles: Vec::new(),
            quality_pre: quality(1, 0.9),
            quality: quality(1, 1.0),
            metrics: BTreeMap::new(),
            numeric: if numeric {
                vec![NumericSummary {
                    column: "Revenue".to_string(),
                    count: 1,
                    distinct_count: 1,
                    mean: 1.0,
                    median: 1.0,
                    std_dev: 0.0,
                    min: 1.0,
                    max: 1.0,
                    total: 1.0,
                }]
            } else {
                Vec::new()
            },
            categorical: if categorical {
                vec![CategoricalSummary {
                    column: "Region".to_string(),
                    count: 1,
                    distinct_count: 1,
                    mode: Some("East".to_string()),
                    mode_count: 1,
                    top: vec![FrequencyEntry {
                        value: "East".to_string(),
                        count: 1,
                        share: 1.0,
                    }],
                }]
            } else {
                Vec::new()
            },
            trend_basis: TrendBasis::RowOrder,
            trend_series: Vec::new(),
            trends: Vec::new(),
        }
    }

    fn trend_rows(column: &str, count: usize) -> Vec<TrendObservation> {
        (0..count)
            .map(|i| TrendObservation {
                column: column.to_string(),
                previous_period: format!("Row {}", i + 1),
                current_period: format!("Row {}", i + 2),
                previous: i as f64,
                current: i as f64 + 1.0,
                pct_change: None,
                direction: TrendDirection::Up,
            })
            .collect()
    }

    fn at() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_sheet_count_tracks_groups() {
        let style = ReportStyle::default();
        let both = WorkbookBuilder::layout(&analysis(true, true), &style, &at());
        assert_eq!(
            both.sheet_names(),
            vec![SUMMARY_SHEET, DIFF_SHEET, "Numeric Analysis", "Categorical Analysis"]
        );

        let numeric_only = WorkbookBuilder::layout(&analysis(true, false), &style, &at());
        assert_eq!(numeric_only.sheets.len(), 3);

        let neither = WorkbookBuilder::layout(&analysis(false, false), &style, &at());
        assert_eq!(neither.sheet_names(), vec![SUMMARY_SHEET, DIFF_SHEET]);
    }

    #[test]
    fn test_group_sheets_anchor_one_chart_per_column() {
        let layout = WorkbookBuilder::layout(&analysis(true, true), &ReportStyle::default(), &at());
        let numeric = layout.sheet("Numeric Analysis").unwrap();
        assert_eq!(numeric.charts.len(), 1);
        assert_eq!(numeric.charts[0].column, "Revenue");
        // Stats header plus one row, no trend table
        assert_eq!(numeric.rows.len(), 2);
    }

    #[test]
    fn test_summary_carries_branding() {
        let style = ReportStyle::default();
        let layout = WorkbookBuilder::layout(&analysis(true, true), &style, &at());
        let summary = layout.sheet(SUMMARY_SHEET).unwrap();
        assert_eq!(summary.rows[0], vec![Cell::Title(style.title.clone())]);
        assert_eq!(
            summary.rows[1],
            vec![Cell::text("Company"), Cell::text("Business Analytics Corp")]
        );
    }

    #[test]
    fn test_build_writes_xlsx_with_placeholder_charts() {
        let analysis = analysis(true, true);
        let bytes =
            WorkbookBuilder::build(&analysis, &ChartSet::default(), &ReportStyle::default(), &at())
                .unwrap();
        // xlsx is a zip container
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_trend_table_keeps_latest_periods_within_cap() {
        let mut analysis = analysis(true, false);
        analysis.trends = trend_rows("Revenue", 6_000);
        analysis.trends.extend(trend_rows("Units", 6_000));
        let style = ReportStyle::default();

        let layout = WorkbookBuilder::layout(&analysis, &style, &at());
        let numeric = layout.sheet("Numeric Analysis").unwrap();

        // Stats header and row, blank, trend header, capped trends, note
        assert_eq!(numeric.rows.len(), 4 + MAX_TREND_ROWS + 1);
        assert_eq!(numeric.rows[4][1], Cell::text("Row 1001 -> Row 1002"));
        assert_eq!(
            numeric.rows[4 + MAX_TREND_ROWS / 2][0],
            Cell::text("Units")
        );
        assert_eq!(
            numeric.rows.last().unwrap()[0],
            Cell::text("Showing the most recent periods only; 2000 older trend rows omitted.")
        );

        let bytes = WorkbookBuilder::build(&analysis, &ChartSet::default(), &style, &at()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_short_trend_table_is_complete() {
        let mut analysis = analysis(true, false);
        analysis.trends = trend_rows("Revenue", 3);

        let layout = WorkbookBuilder::layout(&analysis, &ReportStyle::default(), &at());
        let numeric = layout.sheet("Numeric Analysis").unwrap();
        assert_eq!(numeric.rows.len(), 4 + 3);
        assert_eq!(numeric.rows[4][1], Cell::text("Row 1 -> Row 2"));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let style = ReportStyle::default();
        let analysis = analysis(true, true);
        assert_eq!(
            WorkbookBuilder::layout(&analysis, &style, &at()),
            WorkbookBuilder::layout(&analysis, &style, &at())
        );
    }
}

//! Paginated document artifact.
//!
//! The document is assembled as a list of [`Block`]s, laid out onto A4 pages
//! by [`paginate`] and then serialized to PDF. Section order:
//!
//! 1. title page (the only explicit page break follows it)
//! 2. executive summary with the quality score and the top three trends
//! 3. one section per numeric and categorical column: chart (or a
//!    placeholder note) and statistics table
//! 4. appendix with the full quality report

mod layout;
mod pdf;

pub use layout::{Block, DocumentLayout, Element, Page, Placed, Table, paginate};

use crate::config::ReportStyle;
use crate::error::{CleaningWarning, Result};
use crate::reporting::charts::ChartSet;
use crate::types::{AnalysisResult, CategoricalSummary, NumericSummary, QualityReport, TrendBasis};
use crate::utils::{format_change_pct, format_number, format_ratio_pct};
use chrono::NaiveDateTime;
use tracing::info;

pub const EXECUTIVE_SUMMARY: &str = "Executive Summary";
pub const APPENDIX: &str = "Appendix: Data Quality Report";

/// Trend observations shown in the executive summary.
const SUMMARY_TRENDS: usize = 3;

pub struct DocumentBuilder;

impl DocumentBuilder {
    /// Document content in reading order. Pure.
    pub fn blocks(
        analysis: &AnalysisResult,
        charts: &ChartSet,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> Vec<Block> {
        let mut blocks = vec![
            Block::Title {
                title: style.title.clone(),
                lines: vec![
                    style.company_name.clone(),
                    format!("Prepared by {}", style.author),
                    format!("Generated {}", generated_at.format("%Y-%m-%d %H:%M")),
                    format!(
                        "{} rows and {} columns analyzed",
                        analysis.dataset.height(),
                        analysis.dataset.width()
                    ),
                ],
            },
            Block::PageBreak,
        ];

        Self::executive_summary(analysis, &mut blocks);
        for summary in &analysis.numeric {
            Self::numeric_section(summary, charts, &mut blocks);
        }
        for summary in &analysis.categorical {
            Self::categorical_section(summary, charts, &mut blocks);
        }
        Self::appendix(analysis, &mut blocks);
        blocks
    }

    /// Paginated layout of the document. Pure.
    pub fn layout(
        analysis: &AnalysisResult,
        charts: &ChartSet,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> DocumentLayout {
        paginate(&Self::blocks(analysis, charts, style, generated_at))
    }

    pub fn build(
        analysis: &AnalysisResult,
        charts: &ChartSet,
        style: &ReportStyle,
        generated_at: &NaiveDateTime,
    ) -> Result<Vec<u8>> {
        let layout = Self::layout(analysis, charts, style, generated_at);
        let bytes = pdf::render_pdf(&layout, charts, style)?;
        info!(pages = layout.page_count(), bytes = bytes.len(), "Document built");
        Ok(bytes)
    }

    fn executive_summary(analysis: &AnalysisResult, blocks: &mut Vec<Block>) {
        let pre = &analysis.quality_pre;
        let post = &analysis.quality;

        blocks.push(Block::Heading(EXECUTIVE_SUMMARY.to_string()));
        blocks.push(Block::Paragraph(format!(
            "Overall data quality score: {} (raw input: {}).",
            format_ratio_pct(post.quality_score),
            format_ratio_pct(pre.quality_score)
        )));
        blocks.push(Block::Paragraph(format!(
            "Cleaning removed {} empty and {} duplicate rows, filled {} missing cells and raised \
             {} warnings. {} numeric and {} categorical columns were analyzed.",
            pre.cleaning.empty_rows_removed,
            pre.cleaning.duplicate_rows_removed,
            pre.cleaning.cells_filled,
            pre.warnings.len(),
            analysis.numeric.len(),
            analysis.categorical.len()
        )));

        blocks.push(Block::Subheading("Key Trends".to_string()));
        let top = analysis.top_trends(SUMMARY_TRENDS);
        if top.is_empty() {
            blocks.push(Block::Paragraph(
                "No period-over-period trends could be computed.".to_string(),
            ));
            return;
        }
        let basis = match &analysis.trend_basis {
            TrendBasis::TemporalColumn {
                column,
                granularity,
            } => format!("Periods are {} buckets of '{}'.", granularity.as_str(), column),
            TrendBasis::RowOrder => "No date column was found; periods follow row order.".to_string(),
        };
        blocks.push(Block::Paragraph(basis));
        blocks.push(Block::Table(Table {
            headers: headers(&["Column", "Period", "Change", "Direction"]),
            rows: top
                .into_iter()
                .map(|t| {
                    vec![
                        t.column.clone(),
                        t.period_label(),
                        format_change_pct(t.pct_change),
                        t.direction.to_string(),
                    ]
                })
                .collect(),
        }));
    }

    fn numeric_section(summary: &NumericSummary, charts: &ChartSet, blocks: &mut Vec<Block>) {
        blocks.push(Block::Heading(summary.column.clone()));
        blocks.push(chart_block(&summary.column, charts));
        let stats = [
            ("Mean", summary.mean),
            ("Median", summary.median),
            ("Std Dev", summary.std_dev),
            ("Min", summary.min),
            ("Max", summary.max),
            ("Total", summary.total),
        ];
        let mut rows: Vec<Vec<String>> = vec![
            vec!["Values".to_string(), summary.count.to_string()],
            vec!["Distinct".to_string(), summary.distinct_count.to_string()],
        ];
        rows.extend(
            stats
                .iter()
                .map(|(label, value)| vec![label.to_string(), format_number(*value)]),
        );
        blocks.push(Block::Table(Table {
            headers: headers(&["Statistic", "Value"]),
            rows,
        }));
    }

    fn categorical_section(
        summary: &CategoricalSummary,
        charts: &ChartSet,
        blocks: &mut Vec<Block>,
    ) {
        blocks.push(Block::Heading(summary.column.clone()));
        blocks.push(chart_block(&summary.column, charts));
        blocks.push(Block::Paragraph(format!(
            "{} distinct values; most frequent: {} ({} occurrences).",
            summary.distinct_count,
            summary.mode.as_deref().unwrap_or("-"),
            summary.mode_count
        )));
        blocks.push(Block::Table(Table {
            headers: headers(&["Value", "Count", "Share"]),
            rows: summary
                .top
                .iter()
                .map(|e| vec![e.value.clone(), e.count.to_string(), format_ratio_pct(e.share)])
                .collect(),
        }));
    }

    fn appendix(analysis: &AnalysisResult, blocks: &mut Vec<Block>) {
        let pre = &analysis.quality_pre;
        let post = &analysis.quality;

        blocks.push(Block::Heading(APPENDIX.to_string()));
        blocks.push(Block::Table(Table {
            headers: headers(&["Measure", "Raw", "Cleaned"]),
            rows: quality_rows(pre, post),
        }));

        blocks.push(Block::Subheading("Column Profiles".to_string()));
        blocks.push(Block::Table(Table {
            headers: headers(&["Column", "Type", "Missing", "Distinct", "Min", "Max"]),
            rows: analysis
                .profiles
                .iter()
                .map(|p| {
                    vec![
                        p.name.clone(),
                        p.semantic_type.to_string(),
                        format!("{} ({})", p.null_count, format_ratio_pct(p.null_ratio())),
                        p.distinct_count.to_string(),
                        p.min.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                        p.max.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect(),
        }));

        blocks.push(Block::Subheading("Cleaning Warnings".to_string()));
        if pre.warnings.is_empty() {
            blocks.push(Block::Paragraph("No warnings were raised.".to_string()));
        } else {
            blocks.push(Block::Table(Table {
                headers: headers(&["Column", "Warning"]),
                rows: pre
                    .warnings
                    .iter()
                    .map(|w| vec![w.column().to_string(), warning_text(w)])
                    .collect(),
            }));
        }
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn chart_block(column: &str, charts: &ChartSet) -> Block {
    match charts.get(column) {
        Some(Ok(chart)) => Block::Chart {
            column: column.to_string(),
            aspect: chart.height as f32 / chart.width.max(1) as f32,
        },
        Some(Err(e)) => Block::Placeholder(format!("Chart omitted: {}", e)),
        None => Block::Placeholder("Chart omitted: not rendered".to_string()),
    }
}

fn quality_rows(pre: &QualityReport, post: &QualityReport) -> Vec<Vec<String>> {
    let count = |label: &str, raw: usize, cleaned: usize| {
        vec![label.to_string(), raw.to_string(), cleaned.to_string()]
    };
    vec![
        count("Rows", pre.total_rows, post.total_rows),
        count("Columns", pre.total_columns, post.total_columns),
        count("Duplicate rows", pre.duplicate_rows, post.duplicate_rows),
        count("Missing cells", pre.null_cells, post.null_cells),
        count("Coercion failures", pre.coercion_failures, post.coercion_failures),
        vec![
            "Duplicate ratio".to_string(),
            format_ratio_pct(pre.duplicate_ratio()),
            format_ratio_pct(post.duplicate_ratio()),
        ],
        vec![
            "Missing ratio".to_string(),
            format_ratio_pct(pre.null_ratio()),
            format_ratio_pct(post.null_ratio()),
        ],
        vec![
            "Quality score".to_string(),
            format_ratio_pct(pre.quality_score),
            format_ratio_pct(post.quality_score),
        ],
    ]
}

fn warning_text(warning: &CleaningWarning) -> String {
    match warning {
        CleaningWarning::ColumnDropped { reason, .. } => format!("Dropped: {}", reason),
        CleaningWarning::HighNullRatio { ratio, .. } => {
            format!("{} missing before filling", format_ratio_pct(*ratio))
        }
    }
}

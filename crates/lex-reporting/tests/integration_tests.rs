//! Integration tests for the reporting pipeline.
//!
//! These tests run the pipeline end to end over fixture files and in-memory
//! spreadsheets, and read the produced workbooks back with calamine.

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::{NaiveDate, NaiveDateTime};
use lex_reporting::reporting::document::{APPENDIX, EXECUTIVE_SUMMARY};
use lex_reporting::reporting::workbook::{DIFF_SHEET, MAX_TREND_ROWS, SUMMARY_SHEET};
use lex_reporting::{
    CancellationToken, ChartRenderer, DeliveryChannel, DirectoryDelivery, DocumentBuilder,
    Pipeline, PipelineOutput, PipelineStage, RawInput, RenderError, ReportConfig, ReportStyle,
    ReportingError, TrendDirection, TypedColumn, ValidationErrorKind, WorkbookBuilder,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> RawInput {
    RawInput::from_path(fixtures_path().join(filename)).expect("Failed to read fixture")
}

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(14, 15, 0)
        .unwrap()
}

fn test_config() -> ReportConfig {
    ReportConfig::builder()
        .company_name("Acme Retail")
        .author("Finance Team")
        .output_base_name("Sales")
        .style(ReportStyle {
            company_name: "Acme Retail".to_string(),
            author: "Finance Team".to_string(),
            chart_width: 320,
            chart_height: 160,
            ..ReportStyle::default()
        })
        .build()
        .expect("valid config")
}

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .config(test_config())
        .generated_at(generated_at())
        .build()
        .unwrap()
}

fn run_fixture(filename: &str) -> PipelineOutput {
    pipeline()
        .run(load_fixture(filename))
        .expect("pipeline should complete")
}

fn validation_kind(result: Result<PipelineOutput, ReportingError>) -> Option<ValidationErrorKind> {
    result.err().and_then(|e| e.validation_kind())
}

fn open_workbook(bytes: &[u8]) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(bytes.to_vec())).expect("workbook should be readable")
}

/// Row of `sheet` whose first cell is the string `label`.
fn find_row(workbook: &mut Xlsx<Cursor<Vec<u8>>>, sheet: &str, label: &str) -> Vec<Data> {
    let range = workbook.worksheet_range(sheet).expect("sheet should exist");
    range
        .rows()
        .find(|row| matches!(row.first(), Some(Data::String(s)) if s == label))
        .map(|row| row.to_vec())
        .unwrap_or_else(|| panic!("no row labelled '{}' in '{}'", label, sheet))
}

fn sales_xlsx() -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = [
        ("2024-01-08", "Online", 420.0),
        ("2024-01-22", "Retail", 380.0),
        ("2024-02-05", "Online", 510.0),
        ("2024-02-19", "Retail", 300.0),
        ("2024-03-04", "Online", 640.0),
        ("2024-03-18", "Retail", 290.0),
    ];
    sheet.write_string(0, 0, "Date").unwrap();
    sheet.write_string(0, 1, "Channel").unwrap();
    sheet.write_string(0, 2, "Revenue").unwrap();
    for (i, (date, channel, revenue)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *date).unwrap();
        sheet.write_string(row, 1, *channel).unwrap();
        sheet.write_number(row, 2, *revenue).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_full_pipeline_sales_csv() {
    let output = run_fixture("sales.csv");
    let analysis = &output.analysis;

    assert_eq!(analysis.quality_pre.total_rows, 12);
    assert_eq!(analysis.quality_pre.duplicate_rows, 1);
    assert_eq!(analysis.quality_pre.null_cells, 1);
    assert_eq!(analysis.dataset.height(), 11);
    assert_eq!(analysis.dataset.null_cell_count(), 0);
    assert_eq!(analysis.quality.duplicate_rows, 0);
    assert!(analysis.quality.quality_score > analysis.quality_pre.quality_score);

    let numeric: Vec<&str> = analysis.numeric.iter().map(|s| s.column.as_str()).collect();
    assert_eq!(numeric, vec!["Revenue", "Units"]);
    let categorical: Vec<&str> = analysis.categorical.iter().map(|s| s.column.as_str()).collect();
    assert_eq!(categorical, vec!["Region"]);

    // four months -> three comparisons per numeric column
    assert_eq!(analysis.trends.len(), 6);

    assert_eq!(output.artifacts.workbook.filename(), "Sales_20240502T141500.xlsx");
    assert_eq!(output.artifacts.document.filename(), "Sales_20240502T141500.pdf");
    assert!(output.artifacts.document.payload().starts_with(b"%PDF"));
}

#[test]
fn test_workbook_structure_read_back() {
    let output = run_fixture("sales.csv");
    let mut workbook = open_workbook(output.artifacts.workbook.payload());

    assert_eq!(
        workbook.sheet_names(),
        vec![
            SUMMARY_SHEET.to_string(),
            DIFF_SHEET.to_string(),
            "Numeric Analysis".to_string(),
            "Categorical Analysis".to_string(),
        ]
    );

    let rows = find_row(&mut workbook, DIFF_SHEET, "Rows");
    assert_eq!(rows[1], Data::Float(12.0));
    assert_eq!(rows[2], Data::Float(11.0));

    let company = find_row(&mut workbook, SUMMARY_SHEET, "Company");
    assert_eq!(company[1], Data::String("Acme Retail".to_string()));
}

#[test]
fn test_document_section_order() {
    let config = test_config();
    let output = run_fixture("sales.csv");
    let charts =
        ChartRenderer::render_all(&ChartRenderer::requests(&output.analysis), &config.style)
            .unwrap();
    let layout = DocumentBuilder::layout(&output.analysis, &charts, &config.style, &generated_at());

    let headings = layout.headings();
    assert_eq!(headings.first(), Some(&EXECUTIVE_SUMMARY));
    assert_eq!(headings.last(), Some(&APPENDIX));
    assert_eq!(layout.page_of(EXECUTIVE_SUMMARY), Some(1));

    let position = |name: &str| headings.iter().position(|h| *h == name).unwrap();
    assert!(position("Revenue") < position("Units"));
    assert!(position("Units") < position("Region"));
    assert_eq!(layout.charts(), vec!["Revenue", "Units", "Region"]);
}

#[test]
fn test_full_pipeline_xlsx_input() {
    let output = pipeline()
        .run(RawInput::new("sales.xlsx", sales_xlsx()))
        .unwrap();

    assert_eq!(output.analysis.dataset.height(), 6);
    assert_eq!(output.analysis.categorical[0].column, "Channel");
    assert_eq!(output.analysis.numeric[0].count, 6);

    let workbook = open_workbook(output.artifacts.workbook.payload());
    assert_eq!(workbook.sheet_names().len(), 4);
}

// ============================================================================
// Cleaning Scenario Tests
// ============================================================================

#[test]
fn test_duplicate_and_missing_scenario() {
    let output = run_fixture("duplicates.csv");
    let analysis = &output.analysis;

    assert_eq!(analysis.dataset.height(), 2);
    assert_eq!(analysis.dataset.null_cell_count(), 0);
    assert_eq!(analysis.quality_pre.duplicate_rows, 1);
    assert!((analysis.quality_pre.duplicate_ratio() - 1.0 / 3.0).abs() < 1e-12);

    let profile = analysis.profiles.iter().find(|p| p.name == "Amount").unwrap();
    let TypedColumn::Numeric(amount) = analysis.dataset.typed_column(profile).unwrap() else {
        panic!("Amount should be numeric");
    };
    assert_eq!(amount.values(), &[Some(100.0), Some(100.0)]);
}

#[test]
fn test_rows_equal_once_cleaned_are_deduplicated() {
    let output = run_fixture("equivalent_rows.csv");
    let analysis = &output.analysis;

    // "100" vs "100.0" and a blank filled with the median 100
    assert_eq!(analysis.quality_pre.duplicate_rows, 0);
    assert_eq!(analysis.quality_pre.cleaning.duplicate_rows_removed, 2);
    assert_eq!(analysis.quality_pre.cleaning.cells_filled, 1);
    assert_eq!(analysis.dataset.height(), 3);
    assert_eq!(analysis.dataset.duplicate_row_count().unwrap(), 0);
    assert_eq!(analysis.quality.duplicate_rows, 0);
    assert_eq!(analysis.quality.null_cells, 0);
    assert_eq!(
        analysis.dataset.string_values("Id").unwrap(),
        vec![Some("a".to_string()), Some("b".to_string()), Some("c".to_string())]
    );
}

#[test]
fn test_blank_rows_are_removed_not_filled() {
    let output = run_fixture("blank_rows.csv");
    let analysis = &output.analysis;
    let cleaning = &analysis.quality_pre.cleaning;

    assert_eq!(analysis.quality_pre.total_rows, 6);
    assert_eq!(cleaning.empty_rows_removed, 3);
    assert_eq!(cleaning.duplicate_rows_removed, 0);
    assert_eq!(cleaning.cells_filled, 0);
    assert_eq!(analysis.dataset.height(), 3);

    let revenue = analysis.numeric.iter().find(|s| s.column == "Revenue").unwrap();
    assert_eq!(revenue.count, 3);
    assert_eq!(revenue.total, 420.0);

    let mut workbook = open_workbook(output.artifacts.workbook.payload());
    let removed = find_row(&mut workbook, SUMMARY_SHEET, "Empty Rows Removed");
    assert_eq!(removed[1], Data::Float(3.0));
    let filled = find_row(&mut workbook, SUMMARY_SHEET, "Missing Cells Filled");
    assert_eq!(filled[1], Data::Float(0.0));
}

#[test]
fn test_long_row_order_input_fits_workbook() {
    let rows = MAX_TREND_ROWS / 2 + 1_000;
    let mut csv = String::from("Units,Revenue\n");
    for i in 1..=rows {
        csv.push_str(&format!("{},{}\n", i, i * 3));
    }

    let output = pipeline()
        .run(RawInput::new("ledger.csv", csv))
        .expect("large row-order input should still report");
    let analysis = &output.analysis;
    assert_eq!(analysis.trends.len(), 2 * (rows - 1));

    let mut workbook = open_workbook(output.artifacts.workbook.payload());
    let range = workbook
        .worksheet_range("Numeric Analysis")
        .expect("numeric sheet should exist");
    let trend_rows = range
        .rows()
        .filter(|row| matches!(row.get(1), Some(Data::String(s)) if s.starts_with("Row ")))
        .count();
    assert_eq!(trend_rows, MAX_TREND_ROWS);

    let omitted = 2 * (rows - 1) - MAX_TREND_ROWS;
    let note = format!(
        "Showing the most recent periods only; {} older trend rows omitted.",
        omitted
    );
    assert!(
        range
            .rows()
            .any(|row| matches!(row.first(), Some(Data::String(s)) if *s == note))
    );
}

#[test]
fn test_flat_growth_is_flat() {
    let output = run_fixture("flat_growth.csv");
    let trends = &output.analysis.trends;

    assert_eq!(trends.len(), 3);
    assert!(trends.iter().all(|t| t.direction == TrendDirection::Flat));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_header_only_is_too_few_rows() {
    let result = pipeline().run(load_fixture("header_only.csv"));
    assert_eq!(validation_kind(result), Some(ValidationErrorKind::TooFewRows));
}

#[test]
fn test_single_column_is_too_few_columns() {
    let result = pipeline().run(RawInput::new("list.csv", "Amount\n1\n2\n"));
    assert_eq!(validation_kind(result), Some(ValidationErrorKind::TooFewColumns));
}

#[test]
fn test_oversized_input_is_rejected() {
    let config = ReportConfig::builder().max_file_size_bytes(64).build().unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(load_fixture("sales.csv"));
    assert_eq!(validation_kind(result), Some(ValidationErrorKind::TooLarge));
}

#[test]
fn test_unsupported_and_corrupt_inputs() {
    let result = pipeline().run(RawInput::new("sales.json", "{\"a\": 1}"));
    assert_eq!(validation_kind(result), Some(ValidationErrorKind::UnsupportedFormat));

    let result = pipeline().run(RawInput::new("sales.xlsx", "definitely not a zip archive"));
    assert_eq!(validation_kind(result), Some(ValidationErrorKind::CorruptFile));
}

// ============================================================================
// Chart Placeholder Tests
// ============================================================================

#[test]
fn test_single_value_column_gets_placeholder() {
    let config = test_config();
    let output = run_fixture("single_region.csv");
    let charts =
        ChartRenderer::render_all(&ChartRenderer::requests(&output.analysis), &config.style)
            .unwrap();

    assert_eq!(
        charts.get("Region"),
        Some(&Err(RenderError::InsufficientData { distinct: 1 }))
    );
    assert!(matches!(charts.get("Revenue"), Some(Ok(_))));

    let layout = DocumentBuilder::layout(&output.analysis, &charts, &config.style, &generated_at());
    assert_eq!(layout.charts(), vec!["Revenue"]);

    let workbook = WorkbookBuilder::layout(&output.analysis, &config.style, &generated_at());
    assert!(workbook.sheet("Categorical Analysis").is_some());
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[test]
fn test_structure_is_deterministic() {
    let config = test_config();
    let first = run_fixture("sales.csv");
    let second = run_fixture("sales.csv");

    assert_eq!(first.analysis.summary(), second.analysis.summary());

    let first_layout = WorkbookBuilder::layout(&first.analysis, &config.style, &generated_at());
    let second_layout = WorkbookBuilder::layout(&second.analysis, &config.style, &generated_at());
    assert_eq!(first_layout, second_layout);

    assert_eq!(
        first.artifacts.workbook.filename(),
        second.artifacts.workbook.filename()
    );
}

// ============================================================================
// Cancellation and Progress Tests
// ============================================================================

#[test]
fn test_pipeline_cancellation_before_start() {
    let token = CancellationToken::new();
    token.cancel();

    let result = Pipeline::builder()
        .cancellation_token(token)
        .build()
        .unwrap()
        .run(load_fixture("sales.csv"));

    assert!(matches!(result, Err(ReportingError::Cancelled)));
}

#[test]
fn test_cancellation_between_stages() {
    let token = CancellationToken::new();
    let trigger = token.clone();

    let result = Pipeline::builder()
        .config(test_config())
        .cancellation_token(token)
        .on_progress(move |update| {
            if update.stage == PipelineStage::Cleaning && update.stage_progress >= 1.0 {
                trigger.cancel();
            }
        })
        .build()
        .unwrap()
        .run(load_fixture("sales.csv"));

    assert!(result.unwrap_err().is_cancelled());
}

#[test]
fn test_progress_visits_every_stage() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();

    Pipeline::builder()
        .config(test_config())
        .on_progress(move |update| {
            let mut stages = sink.lock().unwrap();
            if stages.last() != Some(&update.stage) {
                stages.push(update.stage);
            }
        })
        .build()
        .unwrap()
        .run(load_fixture("sales.csv"))
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            PipelineStage::Validating,
            PipelineStage::Profiling,
            PipelineStage::Cleaning,
            PipelineStage::Analyzing,
            PipelineStage::ReportGeneration,
            PipelineStage::Complete,
        ]
    );
}

// ============================================================================
// Delivery Tests
// ============================================================================

#[test]
fn test_delivery_writes_both_artifacts() {
    let output = run_fixture("sales.csv");
    let dir = tempfile::tempdir().unwrap();

    let result = DirectoryDelivery::new(dir.path())
        .deliver(&output.artifacts.into_vec(), &["cfo@acme.com".to_string()])
        .unwrap();

    assert_eq!(result.locations.len(), 2);
    assert!(dir.path().join("Sales_20240502T141500.xlsx").exists());
    assert!(dir.path().join("Sales_20240502T141500.pdf").exists());
}

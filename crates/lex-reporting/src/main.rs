//! CLI entry point for the business data reporting pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_reporting::{
    DeliveryChannel, DirectoryDelivery, Pipeline, PipelineOutput, RawInput, ReportConfig,
    TrendGranularity, parse_recipients,
};
use lex_reporting::utils::{format_change_pct, format_ratio_pct};
use std::path::Path;
use tracing::{error, info};

/// CLI-compatible trend granularity enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGranularity {
    /// Compare consecutive days
    Day,
    /// Compare consecutive ISO weeks
    Week,
    /// Compare consecutive calendar months
    Month,
}

impl From<CliGranularity> for TrendGranularity {
    fn from(cli: CliGranularity) -> Self {
        match cli {
            CliGranularity::Day => TrendGranularity::Day,
            CliGranularity::Week => TrendGranularity::Week,
            CliGranularity::Month => TrendGranularity::Month,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Business data cleaning, analysis and report generation",
    long_about = "Validates, cleans and analyzes a CSV/TSV/XLSX file and writes an Excel\n\
                  workbook and a PDF report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  COMPANY_NAME     Company name shown on the reports\n  \
                  REPORT_AUTHOR    Author shown on the reports\n\n\
                  EXAMPLES:\n  \
                  # Basic usage\n  \
                  lex-reporting -i sales.csv\n\n  \
                  # Weekly trends, custom output\n  \
                  lex-reporting -i sales.xlsx --granularity week -o reports/ --output-name Q1\n\n  \
                  # Machine-readable summary\n  \
                  lex-reporting -i sales.csv --json | jq .run.analysis.quality"
)]
struct Args {
    /// Path to the CSV, TSV or XLSX file to process
    #[arg(short, long)]
    input: String,

    /// Output directory for the generated reports
    #[arg(short, long, default_value = "./reports")]
    output: String,

    /// Base name of the generated files (timestamp and extension are appended)
    #[arg(long, default_value = "Report")]
    output_name: String,

    /// Company name for report branding (overrides COMPANY_NAME)
    #[arg(long)]
    company: Option<String>,

    /// Report author (overrides REPORT_AUTHOR)
    #[arg(long)]
    author: Option<String>,

    /// Largest accepted input file, in megabytes
    #[arg(long, default_value = "50")]
    max_size_mb: u64,

    /// Missing-value ratio (0.0 - 1.0) above which text and date columns are flagged
    #[arg(long, default_value = "0.5")]
    missing_threshold: f64,

    /// Number of categories listed per categorical column
    #[arg(long, default_value = "10")]
    top_n: usize,

    /// Period used for trend comparisons
    #[arg(long, value_enum, default_value = "month")]
    granularity: CliGranularity,

    /// Changes within +/- this percentage are reported as flat
    #[arg(long, default_value = "1.0")]
    flat_band: f64,

    /// Comma-separated e-mail addresses the reports are intended for
    #[arg(long)]
    recipients: Option<String>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON summary.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let recipients = match &args.recipients {
        Some(list) => parse_recipients(list)?,
        None => Vec::new(),
    };

    let config = build_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;

    let input = RawInput::from_path(&args.input)
        .with_context(|| format!("Failed to read {}", args.input))?;
    info!(file = %args.input, bytes = input.size(), "Input loaded");

    let output = match pipeline.run(input) {
        Ok(output) => output,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed [{}]: {}", e.error_code(), e));
        }
    };

    let summary = output.summary();
    let delivery = DirectoryDelivery::new(&args.output)
        .deliver(&output.artifacts.clone().into_vec(), &recipients)?;

    if args.json {
        let json = serde_json::json!({
            "run": summary,
            "delivery": delivery,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    print_human_readable_summary(&output, &delivery.locations, &recipients);
    Ok(())
}

/// Map CLI flags and environment onto a validated configuration.
fn build_config(args: &Args) -> Result<ReportConfig> {
    let company = args
        .company
        .clone()
        .or_else(|| std::env::var("COMPANY_NAME").ok());
    let author = args
        .author
        .clone()
        .or_else(|| std::env::var("REPORT_AUTHOR").ok());

    let mut builder = ReportConfig::builder()
        .max_file_size_mb(args.max_size_mb)
        .missing_value_threshold(args.missing_threshold)
        .top_n(args.top_n)
        .trend_granularity(args.granularity.into())
        .flat_band_pct(args.flat_band)
        .output_base_name(&args.output_name);

    if let Some(company) = company {
        builder = builder.company_name(company);
    }
    if let Some(author) = author {
        builder = builder.author(author);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: ReportConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:>5.1}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(output: &PipelineOutput, locations: &[String], recipients: &[String]) {
    let analysis = &output.analysis;
    let before = &analysis.quality_pre;
    let after = &analysis.quality;

    println!();
    println!("{}", "=".repeat(80));
    println!("REPORT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Dataset:");
    println!(
        "  Rows: {} -> {} ({} empty, {} duplicates removed)",
        before.total_rows,
        after.total_rows,
        before.cleaning.empty_rows_removed,
        before.cleaning.duplicate_rows_removed
    );
    println!("  Missing cells filled: {}", before.cleaning.cells_filled);
    println!(
        "  Columns: {} -> {}",
        before.total_columns, after.total_columns
    );
    println!(
        "  Quality score: {:.2} -> {:.2}",
        before.quality_score, after.quality_score
    );
    println!("  Missing cells before cleaning: {}", format_ratio_pct(before.null_ratio()));
    println!("  Duration: {}ms", output.duration_ms);
    println!();

    let top = analysis.top_trends(3);
    if !top.is_empty() {
        println!("Key Trends:");
        for trend in top {
            println!(
                "  - {} {} ({}): {}",
                trend.column,
                trend.direction,
                trend.period_label(),
                format_change_pct(trend.pct_change)
            );
        }
        println!();
    }

    if !before.warnings.is_empty() {
        println!("Warnings:");
        for warning in &before.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Reports:");
    for location in locations {
        println!("  - {}", location);
    }
    if !recipients.is_empty() {
        println!("Intended recipients: {}", recipients.join(", "));
    }
    println!();
    println!("Use --json for machine-readable output");
}

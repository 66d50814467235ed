//! Business Data Reporting Library
//!
//! Turns an uploaded spreadsheet or delimited file into a cleaned dataset,
//! an analysis and two finished report artifacts, built on Polars.
//!
//! # Overview
//!
//! - **Validation**: size, format, encoding and shape checks before any work
//! - **Schema Profiling**: every column classified as numeric, categorical,
//!   temporal or text
//! - **Cleaning**: duplicate removal, profile-guided missing-value handling
//!   and type coercion
//! - **Analysis**: descriptive statistics, category frequencies,
//!   period-over-period trends and a data-quality score
//! - **Reports**: an `.xlsx` workbook and a paginated PDF document, with
//!   charts rendered concurrently
//! - **Progress Reporting**: stage updates with cooperative cancellation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_reporting::{DeliveryChannel, DirectoryDelivery, Pipeline, RawInput, ReportConfig};
//!
//! let config = ReportConfig::builder()
//!     .company_name("Acme Retail")
//!     .author("Finance Team")
//!     .output_base_name("Q1_Sales")
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(RawInput::from_path("sales.csv")?)?;
//!
//! println!("Quality score: {:.2}", output.analysis.quality.quality_score);
//!
//! DirectoryDelivery::new("reports").deliver(&output.artifacts.into_vec(), &[])?;
//! ```
//!
//! # Stages
//!
//! Each stage is also usable on its own:
//!
//! ```rust,ignore
//! use lex_reporting::{Analyzer, Cleaner, ReportComposer, SchemaProfiler, Validator};
//!
//! let raw = Validator::validate(&input, config.max_file_size_bytes)?;
//! let profiles = SchemaProfiler::profile(&raw, &config.profiler)?;
//! let (cleaned, quality_pre) = Cleaner::clean(&raw, &profiles, &config)?;
//! let profiles = cleaned.retain_profiles(&profiles)?;
//! let analysis = Analyzer::analyze(cleaned, profiles, quality_pre, &config)?;
//! let artifacts = ReportComposer::compose(&analysis, &config, generated_at)?;
//! ```

pub mod analyzer;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod delivery;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;
pub mod validator;

// Re-exports for convenient access
pub use analyzer::Analyzer;
pub use cleaner::Cleaner;
pub use config::{
    ConfigValidationError, ProfilerThresholds, QualityWeights, ReportConfig, ReportConfigBuilder,
    ReportStyle, TrendGranularity,
};
pub use dataset::{Dataset, TypedColumn};
pub use delivery::{DeliveryChannel, DeliveryResult, DirectoryDelivery, parse_recipients};
pub use error::{
    CleaningWarning, RenderError, ReportingError, Result as ReportingResult, ResultExt,
    ValidationError, ValidationErrorKind,
};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineContext,
    PipelineOutput, PipelineStage, ProgressReporter, ProgressUpdate, RunSummary,
};
pub use profiler::SchemaProfiler;
pub use quality::DataQualityAnalyzer;
pub use reporting::{ChartRenderer, DocumentBuilder, ReportComposer, WorkbookBuilder};
pub use types::{
    AnalysisResult, AnalysisSummary, ArtifactFormat, ColumnProfile, QualityReport,
    ReportArtifact, ReportArtifacts, SemanticType, TrendDirection, TrendObservation,
};
pub use validator::{InputFormat, RawInput, ValidationResult, Validator};

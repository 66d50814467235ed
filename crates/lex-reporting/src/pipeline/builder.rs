//! Report pipeline and its builder.
//!
//! The pipeline runs Validator, SchemaProfiler, Cleaner, Analyzer and
//! ReportComposer in that order. Intermediate state lives in a
//! caller-owned [`PipelineContext`], so stages can also be driven one at a
//! time and inspected in between.

use crate::analyzer::Analyzer;
use crate::cleaner::Cleaner;
use crate::config::ReportConfig;
use crate::dataset::Dataset;
use crate::error::{ReportingError, Result};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::SchemaProfiler;
use crate::reporting::ReportComposer;
use crate::types::{
    AnalysisResult, AnalysisSummary, ArtifactFormat, ColumnProfile, QualityReport,
    ReportArtifacts,
};
use crate::validator::{RawInput, Validator};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The report pipeline.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use lex_reporting::{Pipeline, RawInput, ReportConfig};
///
/// let output = Pipeline::builder()
///     .config(ReportConfig::builder().company_name("Acme").build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run(RawInput::from_path("sales.xlsx")?)?;
///
/// for artifact in output.artifacts.into_vec() {
///     std::fs::write(artifact.filename(), artifact.payload())?;
/// }
/// ```
pub struct Pipeline {
    config: ReportConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    generated_at: Option<NaiveDateTime>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

/// State threaded through the stages of one run.
///
/// Each stage reads what the previous stage left and stores its own
/// result. Running a stage before its input exists fails with
/// [`ReportingError::StageOutOfOrder`].
#[derive(Debug, Clone)]
pub struct PipelineContext {
    generated_at: NaiveDateTime,
    raw: Option<Dataset>,
    profiles: Option<Vec<ColumnProfile>>,
    cleaned: Option<(Dataset, QualityReport)>,
    analysis: Option<AnalysisResult>,
    artifacts: Option<ReportArtifacts>,
}

static_assertions::assert_impl_all!(PipelineContext: Send);

impl PipelineContext {
    /// Fresh context whose artifacts will be stamped with `generated_at`.
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            raw: None,
            profiles: None,
            cleaned: None,
            analysis: None,
            artifacts: None,
        }
    }

    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    /// Validated input, before cleaning.
    pub fn raw(&self) -> Option<&Dataset> {
        self.raw.as_ref()
    }

    /// Column profiles. After cleaning, only the columns that survived.
    pub fn profiles(&self) -> Option<&[ColumnProfile]> {
        self.profiles.as_deref()
    }

    pub fn cleaned(&self) -> Option<&Dataset> {
        self.cleaned.as_ref().map(|(dataset, _)| dataset)
    }

    /// Quality of the input as it was before cleaning.
    pub fn quality_pre(&self) -> Option<&QualityReport> {
        self.cleaned
            .as_ref()
            .map(|(_, report)| report)
            .or_else(|| self.analysis.as_ref().map(|a| &a.quality_pre))
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn artifacts(&self) -> Option<&ReportArtifacts> {
        self.artifacts.as_ref()
    }

    /// The finished run, if every stage has completed.
    pub fn into_output(self) -> Option<(AnalysisResult, ReportArtifacts)> {
        Some((self.analysis?, self.artifacts?))
    }
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub analysis: AnalysisResult,
    pub artifacts: ReportArtifacts,
    pub duration_ms: u64,
}

static_assertions::assert_impl_all!(PipelineOutput: Send, Sync);

impl PipelineOutput {
    /// Serializable summary of the run, without payloads.
    pub fn summary(&self) -> RunSummary {
        let artifact = |a: &crate::types::ReportArtifact| ArtifactSummary {
            format: a.format(),
            filename: a.filename().to_string(),
            bytes: a.payload().len(),
        };
        RunSummary {
            analysis: self.analysis.summary(),
            artifacts: vec![
                artifact(&self.artifacts.workbook),
                artifact(&self.artifacts.document),
            ],
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub format: ArtifactFormat,
    pub filename: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub analysis: AnalysisSummary,
    pub artifacts: Vec<ArtifactSummary>,
    pub duration_ms: u64,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Run every stage over `input`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ReportingError::Cancelled)` if the token was cancelled
    /// before a stage started, and the validation error if the input is
    /// rejected. No artifacts are produced on any error.
    pub fn run(&self, input: RawInput) -> Result<PipelineOutput> {
        let start = Instant::now();
        let mut context = PipelineContext::new(self.timestamp());

        match self.run_stages(&mut context, &input) {
            Ok(()) => {
                let Some((analysis, artifacts)) = context.into_output() else {
                    return Err(ReportingError::ContractViolation(
                        "run finished without analysis or artifacts".to_string(),
                    ));
                };
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(duration_ms, "Report run completed");
                self.report_progress(ProgressUpdate::complete(format!(
                    "Generated {} and {}",
                    artifacts.workbook.filename(),
                    artifacts.document.filename()
                )));
                Ok(PipelineOutput {
                    analysis,
                    artifacts,
                    duration_ms,
                })
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!(code = e.error_code(), "Report run failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_stages(&self, context: &mut PipelineContext, input: &RawInput) -> Result<()> {
        self.validate(context, input)?;
        self.profile(context)?;
        self.clean(context)?;
        self.analyze(context)?;
        self.compose(context)
    }

    /// Check the input's size, format and shape and load it.
    ///
    /// Starting over with a new input discards every later result in
    /// `context`.
    pub fn validate(&self, context: &mut PipelineContext, input: &RawInput) -> Result<()> {
        self.begin(PipelineStage::Validating, "Validating input...")?;

        let dataset = Validator::validate(input, self.config.max_file_size_bytes)?;
        info!(
            file = %input.file_name,
            rows = dataset.height(),
            columns = dataset.width(),
            "Input accepted"
        );

        *context = PipelineContext::new(context.generated_at);
        context.raw = Some(dataset);
        self.finish(PipelineStage::Validating, "Input validated");
        Ok(())
    }

    pub fn profile(&self, context: &mut PipelineContext) -> Result<()> {
        let Some(raw) = context.raw.as_ref() else {
            return Err(out_of_order(PipelineStage::Profiling, PipelineStage::Validating));
        };
        self.begin(PipelineStage::Profiling, "Profiling columns...")?;

        let profiles = SchemaProfiler::profile(raw, &self.config.profiler)?;
        for profile in &profiles {
            debug!(
                column = %profile.name,
                semantic_type = profile.semantic_type.as_str(),
                nulls = profile.null_count,
                distinct = profile.distinct_count,
                "Profiled column"
            );
        }
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Profiling,
            profiles.len(),
            profiles.len(),
            format!("Profiled {} columns", profiles.len()),
        ));

        context.profiles = Some(profiles);
        Ok(())
    }

    pub fn clean(&self, context: &mut PipelineContext) -> Result<()> {
        let (Some(raw), Some(profiles)) = (context.raw.as_ref(), context.profiles.as_ref()) else {
            return Err(out_of_order(PipelineStage::Cleaning, PipelineStage::Profiling));
        };
        self.begin(PipelineStage::Cleaning, "Cleaning data...")?;

        let (cleaned, quality_pre) = Cleaner::clean(raw, profiles, &self.config)?;
        let retained = cleaned.retain_profiles(profiles)?;
        info!(
            rows_before = raw.height(),
            rows_after = cleaned.height(),
            columns_after = cleaned.width(),
            warnings = quality_pre.warnings.len(),
            "Dataset cleaned"
        );

        context.profiles = Some(retained);
        context.cleaned = Some((cleaned, quality_pre));
        self.finish(PipelineStage::Cleaning, "Data cleaned");
        Ok(())
    }

    pub fn analyze(&self, context: &mut PipelineContext) -> Result<()> {
        let (Some(_), Some(profiles)) = (context.cleaned.as_ref(), context.profiles.as_ref())
        else {
            return Err(out_of_order(PipelineStage::Analyzing, PipelineStage::Cleaning));
        };
        self.begin(PipelineStage::Analyzing, "Analyzing data...")?;

        let profiles = profiles.clone();
        let Some((cleaned, quality_pre)) = context.cleaned.take() else {
            return Err(out_of_order(PipelineStage::Analyzing, PipelineStage::Cleaning));
        };
        let analysis = Analyzer::analyze(cleaned, profiles, quality_pre, &self.config)?;
        info!(
            quality_score = analysis.quality.quality_score,
            trends = analysis.trends.len(),
            "Analysis complete"
        );

        context.analysis = Some(analysis);
        self.finish(PipelineStage::Analyzing, "Analysis complete");
        Ok(())
    }

    pub fn compose(&self, context: &mut PipelineContext) -> Result<()> {
        let Some(analysis) = context.analysis.as_ref() else {
            return Err(out_of_order(PipelineStage::ReportGeneration, PipelineStage::Analyzing));
        };
        self.begin(PipelineStage::ReportGeneration, "Generating reports...")?;

        let artifacts = ReportComposer::compose(analysis, &self.config, context.generated_at)?;

        context.artifacts = Some(artifacts);
        self.finish(PipelineStage::ReportGeneration, "Reports generated");
        Ok(())
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.generated_at
            .unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ReportingError::Cancelled);
        }
        Ok(())
    }

    fn begin(&self, stage: PipelineStage, message: &str) -> Result<()> {
        self.check_cancelled()?;
        info!(stage = stage.as_str(), "{}", message);
        self.report_progress(ProgressUpdate::new(stage, 0.0, message));
        Ok(())
    }

    fn finish(&self, stage: PipelineStage, message: &str) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message));
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

fn out_of_order(stage: PipelineStage, requires: PipelineStage) -> ReportingError {
    ReportingError::StageOutOfOrder {
        stage: stage.as_str(),
        requires: requires.as_str(),
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
    generated_at: Option<NaiveDateTime>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// The token is checked before each stage starts. Once cancelled, the
    /// run returns [`ReportingError::Cancelled`] and produces no artifacts.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Fix the timestamp embedded in artifact filenames and report headers.
    ///
    /// Defaults to the local time at the start of each run.
    pub fn generated_at(mut self, timestamp: NaiveDateTime) -> Self {
        self.generated_at = Some(timestamp);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            generated_at: self.generated_at,
        })
    }
}

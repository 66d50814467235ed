//! Progress reporting and cancellation for report runs.
//!
//! A run reports a [`ProgressUpdate`] when each stage starts and finishes.
//! Cancellation is cooperative: the pipeline checks its
//! [`CancellationToken`] between stages, so a stage that has started always
//! runs to completion.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_reporting::{CancellationToken, Pipeline, RawInput};
//!
//! let token = CancellationToken::new();
//! let cancel = token.clone();
//! ctrlc_handler(move || cancel.cancel());
//!
//! let output = Pipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(RawInput::from_path("sales.csv")?)?;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a report run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Checking size, format and shape of the input
    Validating,
    /// Classifying columns into semantic types
    Profiling,
    /// Removing duplicates, filling missing values, coercing types
    Cleaning,
    /// Computing summaries, trends and the quality score
    Analyzing,
    /// Rendering charts and building the workbook and document
    ReportGeneration,
    Complete,
    Cancelled,
    Failed,
}

impl PipelineStage {
    /// The working stages, in execution order.
    pub const WORKING: [PipelineStage; 5] = [
        Self::Validating,
        Self::Profiling,
        Self::Cleaning,
        Self::Analyzing,
        Self::ReportGeneration,
    ];

    /// Machine name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Profiling => "profiling",
            Self::Cleaning => "cleaning",
            Self::Analyzing => "analyzing",
            Self::ReportGeneration => "report_generation",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Validating => "Validating Input",
            Self::Profiling => "Profiling Columns",
            Self::Cleaning => "Cleaning Data",
            Self::Analyzing => "Analyzing Data",
            Self::ReportGeneration => "Generating Reports",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage.
    ///
    /// Working stages sum to 1.0; terminal states weigh nothing.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Validating => 0.10,
            Self::Profiling => 0.15,
            Self::Cleaning => 0.20,
            Self::Analyzing => 0.15,
            Self::ReportGeneration => 0.40,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Overall progress when this stage starts.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
            working => Self::WORKING
                .iter()
                .take_while(|s| *s != working)
                .map(|s| s.weight())
                .sum(),
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    /// Items processed so far in this stage, for stages that iterate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        let progress = stage.base_progress() + stage.weight() * stage_progress;
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    pub fn with_items(
        stage: PipelineStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self::new(PipelineStage::Cancelled, 0.0, "Report run cancelled")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Receiver of progress updates.
///
/// Runs may execute on a background thread, so implementations must be
/// `Send + Sync`. `report` is called on the pipeline's thread and should
/// return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Shared flag for cancelling a run from another thread.
///
/// Clones share state. The pipeline returns
/// [`ReportingError::Cancelled`](crate::error::ReportingError::Cancelled) at
/// the next stage boundary after [`cancel`](Self::cancel) is called.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be used for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

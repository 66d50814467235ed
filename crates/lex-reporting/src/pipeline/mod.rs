//! Report pipeline: stage orchestration, progress and cancellation.

mod builder;
pub mod progress;

pub use builder::{
    ArtifactSummary, Pipeline, PipelineBuilder, PipelineContext, PipelineOutput, RunSummary,
};
pub use progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};

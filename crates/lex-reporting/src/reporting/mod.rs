//! Report composition.
//!
//! [`ReportComposer::compose`] turns one [`AnalysisResult`] into a workbook
//! and a document artifact:
//!
//! 1. every chart is rendered concurrently into a [`ChartSet`]
//! 2. once all renders have joined, the workbook and document builders run
//!    side by side over the same immutable analysis and chart set
//! 3. both payloads get `<base>_<timestamp>.<ext>` filenames sharing one
//!    timestamp
//!
//! A chart that cannot be rendered never fails composition; the builders
//! put a placeholder note in its place.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_reporting::reporting::ReportComposer;
//!
//! let artifacts = ReportComposer::compose(&analysis, &config, generated_at)?;
//! std::fs::write(artifacts.workbook.filename(), artifacts.workbook.payload())?;
//! ```

pub mod charts;
pub mod document;
pub mod workbook;

pub use charts::{ChartKind, ChartRenderer, ChartRequest, ChartSeries, ChartSet, RenderedChart};
pub use document::{DocumentBuilder, DocumentLayout};
pub use workbook::{WorkbookBuilder, WorkbookLayout};

use crate::config::ReportConfig;
use crate::error::{ReportingError, Result};
use crate::types::{AnalysisResult, ArtifactFormat, ReportArtifact, ReportArtifacts};
use crate::utils::artifact_filename;
use chrono::NaiveDateTime;
use tracing::info;

pub struct ReportComposer;

/// Turn a panicked worker thread into [`ReportingError::Internal`].
pub(crate) fn joined<T>(outcome: std::thread::Result<T>, worker: impl FnOnce() -> String) -> Result<T> {
    outcome.map_err(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());
        ReportingError::Internal(format!("{} panicked: {}", worker(), detail))
    })
}

impl ReportComposer {
    /// Build both artifacts for `analysis`.
    pub fn compose(
        analysis: &AnalysisResult,
        config: &ReportConfig,
        generated_at: NaiveDateTime,
    ) -> Result<ReportArtifacts> {
        let style = &config.style;

        let requests = ChartRenderer::requests(analysis);
        let charts = ChartRenderer::render_all(&requests, style)?;
        info!(
            requested = requests.len(),
            rendered = charts.rendered_count(),
            "Charts ready"
        );

        let (workbook, document) = std::thread::scope(|scope| {
            let workbook =
                scope.spawn(|| WorkbookBuilder::build(analysis, &charts, style, &generated_at));
            let document =
                scope.spawn(|| DocumentBuilder::build(analysis, &charts, style, &generated_at));
            (workbook.join(), document.join())
        });
        let workbook = joined(workbook, || "workbook builder".to_string())??;
        let document = joined(document, || "document builder".to_string())??;
        drop(charts);

        let artifact = |format: ArtifactFormat, payload: Vec<u8>| {
            let filename =
                artifact_filename(&config.output_base_name, &generated_at, format.extension());
            ReportArtifact::new(format, filename, payload)
        };
        let artifacts = ReportArtifacts {
            workbook: artifact(ArtifactFormat::Workbook, workbook),
            document: artifact(ArtifactFormat::Document, document),
        };
        info!(
            workbook = artifacts.workbook.filename(),
            document = artifacts.document.filename(),
            "Report artifacts composed"
        );
        Ok(artifacts)
    }
}

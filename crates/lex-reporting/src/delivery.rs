//! Hand-off of finished artifacts.
//!
//! A [`DeliveryChannel`] takes ownership of the artifacts of one run together
//! with the recipient list. [`DirectoryDelivery`] writes them to a local
//! directory; transports such as mail are left to other implementations.

use crate::error::{ReportingError, Result};
use crate::types::ReportArtifact;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("Invalid regex: email")
});

/// Outcome of a delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Where each artifact ended up, in input order.
    pub locations: Vec<String>,
    pub recipients: Vec<String>,
    pub bytes_delivered: usize,
}

/// Destination for finished report artifacts.
pub trait DeliveryChannel: Send + Sync {
    fn deliver(&self, artifacts: &[ReportArtifact], recipients: &[String]) -> Result<DeliveryResult>;
}

/// Writes artifacts into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    directory: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl DeliveryChannel for DirectoryDelivery {
    fn deliver(&self, artifacts: &[ReportArtifact], recipients: &[String]) -> Result<DeliveryResult> {
        if artifacts.is_empty() {
            return Err(ReportingError::Delivery("no artifacts to deliver".to_string()));
        }
        std::fs::create_dir_all(&self.directory).map_err(|e| {
            ReportingError::Delivery(format!(
                "cannot create '{}': {}",
                self.directory.display(),
                e
            ))
        })?;

        let mut locations = Vec::with_capacity(artifacts.len());
        let mut bytes_delivered = 0;
        for artifact in artifacts {
            let path = self.directory.join(artifact.filename());
            std::fs::write(&path, artifact.payload()).map_err(|e| {
                ReportingError::Delivery(format!("cannot write '{}': {}", path.display(), e))
            })?;
            debug!(path = %path.display(), bytes = artifact.payload().len(), "Artifact written");
            bytes_delivered += artifact.payload().len();
            locations.push(path.display().to_string());
        }

        info!(
            directory = %self.directory.display(),
            artifacts = artifacts.len(),
            recipients = recipients.len(),
            "Artifacts delivered"
        );
        Ok(DeliveryResult {
            locations,
            recipients: recipients.to_vec(),
            bytes_delivered,
        })
    }
}

/// Parse a comma or semicolon separated list of e-mail addresses.
///
/// Blank entries are skipped and duplicates removed, keeping the first.
pub fn parse_recipients(list: &str) -> Result<Vec<String>> {
    let mut recipients: Vec<String> = Vec::new();
    for entry in list.split([',', ';']).map(str::trim).filter(|e| !e.is_empty()) {
        if !EMAIL_PATTERN.is_match(entry) {
            return Err(ReportingError::InvalidConfig(format!(
                "invalid recipient address '{}'",
                entry
            )));
        }
        if !recipients.iter().any(|r| r.eq_ignore_ascii_case(entry)) {
            recipients.push(entry.to_string());
        }
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactFormat;
    use pretty_assertions::assert_eq;

    fn artifacts() -> Vec<ReportArtifact> {
        vec![
            ReportArtifact::new(
                ArtifactFormat::Workbook,
                "Report_20240101T000000.xlsx".to_string(),
                b"PK\x03\x04".to_vec(),
            ),
            ReportArtifact::new(
                ArtifactFormat::Document,
                "Report_20240101T000000.pdf".to_string(),
                b"%PDF-1.3".to_vec(),
            ),
        ]
    }

    #[test]
    fn test_directory_delivery_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("reports");
        let channel = DirectoryDelivery::new(&target);

        let result = channel
            .deliver(&artifacts(), &["ops@example.com".to_string()])
            .unwrap();

        assert_eq!(result.locations.len(), 2);
        assert_eq!(result.bytes_delivered, 12);
        assert_eq!(result.recipients, vec!["ops@example.com".to_string()]);
        let pdf = std::fs::read(target.join("Report_20240101T000000.pdf")).unwrap();
        assert_eq!(pdf, b"%PDF-1.3".to_vec());
    }

    #[test]
    fn test_directory_delivery_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryDelivery::new(dir.path()).deliver(&[], &[]).unwrap_err();
        assert_eq!(err.error_code(), "DELIVERY_ERROR");
    }

    #[test]
    fn test_parse_recipients() {
        let parsed =
            parse_recipients(" cfo@acme.com, ops@acme.co.uk; ; CFO@acme.com ").unwrap();
        assert_eq!(parsed, vec!["cfo@acme.com".to_string(), "ops@acme.co.uk".to_string()]);
        assert_eq!(parse_recipients("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_parse_recipients_invalid() {
        let err = parse_recipients("cfo@acme.com, not-an-address").unwrap_err();
        assert!(err.to_string().contains("not-an-address"));
    }
}

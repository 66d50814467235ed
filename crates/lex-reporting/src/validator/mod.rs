//! Input validation.
//!
//! [`Validator::validate`] checks structural preconditions before any
//! processing and turns an accepted input into a raw [`Dataset`]. Checks run
//! in this order and stop at the first failure:
//!
//! 1. payload size against the configured limit
//! 2. format recognised from the file extension (and UTF-8 for text)
//! 3. payload parses ([`ValidationError::CorruptFile`] otherwise)
//! 4. at least two columns
//! 5. at least one data row with a value in it

mod readers;

use crate::dataset::Dataset;
use crate::error::{ReportingError, ValidationError};
use std::path::Path;
use tracing::{debug, info};

pub const MIN_COLUMNS: usize = 2;
pub const MIN_ROWS: usize = 1;

/// Outcome of validation: the raw dataset or the first failed check.
pub type ValidationResult = std::result::Result<Dataset, ValidationError>;

/// An uploaded file: its name (for format detection) and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawInput {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ReportingError::InvalidConfig(format!("'{}' is not a file path", path.display()))
            })?;
        Ok(Self { file_name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Recognised input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited { separator: u8 },
    Spreadsheet,
}

impl InputFormat {
    /// Detect the format from a file name's extension.
    pub fn detect(file_name: &str) -> Result<Self, ValidationError> {
        let extension = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(Self::Delimited { separator: b',' }),
            "tsv" => Ok(Self::Delimited { separator: b'\t' }),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "" => Err(ValidationError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                file_name
            ))),
            other => Err(ValidationError::UnsupportedFormat(format!(
                "'.{}' files are not supported (expected .csv, .tsv, .xlsx or .xls)",
                other
            ))),
        }
    }
}

/// Validator for structural input preconditions.
pub struct Validator;

impl Validator {
    /// Validate `input` and parse it into a raw dataset. Pure.
    pub fn validate(input: &RawInput, max_file_size_bytes: u64) -> ValidationResult {
        let size = input.size();
        if size > max_file_size_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit: max_file_size_bytes,
            });
        }

        let format = InputFormat::detect(&input.file_name)?;
        debug!(file = %input.file_name, ?format, size, "Validating input");

        let frame = match format {
            InputFormat::Delimited { separator } => readers::read_delimited(&input.bytes, separator)?,
            InputFormat::Spreadsheet => readers::read_spreadsheet(&input.bytes)?,
        };

        if frame.width() < MIN_COLUMNS {
            return Err(ValidationError::TooFewColumns {
                found: frame.width(),
            });
        }
        if frame.height() < MIN_ROWS {
            return Err(ValidationError::TooFewRows {
                found: frame.height(),
            });
        }

        let dataset = Dataset::from_raw_frame(frame)
            .map_err(|e| ValidationError::CorruptFile(e.to_string()))?;
        let populated = dataset.non_empty_row_mask().into_iter().filter(|p| *p).count();
        if populated < MIN_ROWS {
            return Err(ValidationError::TooFewRows { found: populated });
        }
        info!(
            file = %input.file_name,
            rows = dataset.height(),
            columns = dataset.width(),
            "Input accepted"
        );
        Ok(dataset)
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ConsolidateError>;

/// Error type covering the different failure cases that can occur while
/// discovering, reading, merging, or persisting workbooks.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the JSON configuration file cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the xlsx reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from calamine's format-sniffing reader.
    #[error("Excel format error: {0}")]
    ExcelFormat(#[from] calamine::Error),

    /// Raised when the xlsx container cannot be read as a zip archive.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Raised when one of the package XML parts is not well formed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when a package part does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when an A1 cell or range reference cannot be parsed.
    #[error("invalid cell reference '{0}'")]
    InvalidReference(String),

    /// A discovered path does not parse as a supported workbook.
    #[error("invalid workbook {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    /// Legacy-to-modern conversion failed.
    #[error("failed to convert legacy workbook {path}: {reason}")]
    NormalizationFailure { path: PathBuf, reason: String },

    /// A legacy workbook was found but no converter is configured.
    #[error("legacy workbook {0} is unsupported without a converter")]
    LegacyUnsupported(PathBuf),

    /// A validated workbook could not be reopened for data extraction.
    #[error("failed to open workbook {path}: {reason}")]
    OpenFailure { path: PathBuf, reason: String },

    /// A single cell's style could not be transferred.
    #[error("failed to copy style of {sheet}!{cell}: {reason}")]
    StyleCopyFailure {
        sheet: String,
        cell: String,
        reason: String,
    },

    /// The input directory holds no candidate workbook.
    #[error("no workbook files found in {0}")]
    NoInputFiles(PathBuf),

    /// Every discovered workbook was skipped.
    #[error("none of the {0} discovered workbooks could be processed")]
    NothingProcessed(usize),

    /// The consolidated workbook could not be persisted.
    #[error("failed to write consolidated workbook {path}: {reason}")]
    OutputWriteFailure { path: PathBuf, reason: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the options fail validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the output writer thread stops unexpectedly.
    #[error("output writer failed: {0}")]
    Writer(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ConsolidateError {
    /// Whether the error terminates the whole batch rather than a single
    /// file or cell.
    pub fn is_batch_fatal(&self) -> bool {
        !matches!(
            self,
            ConsolidateError::InvalidFile { .. }
                | ConsolidateError::NormalizationFailure { .. }
                | ConsolidateError::LegacyUnsupported(_)
                | ConsolidateError::OpenFailure { .. }
                | ConsolidateError::StyleCopyFailure { .. }
        )
    }

    pub(crate) fn invalid_file(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConsolidateError::InvalidFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn normalization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConsolidateError::NormalizationFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn open_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConsolidateError::OpenFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn output_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConsolidateError::OutputWriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_errors_do_not_stop_the_batch() {
        assert!(!ConsolidateError::invalid_file("a.xlsx", "not a zip").is_batch_fatal());
        assert!(!ConsolidateError::LegacyUnsupported("old.xls".into()).is_batch_fatal());
        assert!(ConsolidateError::NothingProcessed(3).is_batch_fatal());
        assert!(ConsolidateError::output_write("out.xlsx", "disk full").is_batch_fatal());
    }

    #[test]
    fn messages_name_the_file() {
        let error = ConsolidateError::open_failure("data/a.xlsx", "truncated archive");
        assert_eq!(
            error.to_string(),
            "failed to open workbook data/a.xlsx: truncated archive"
        );
    }
}

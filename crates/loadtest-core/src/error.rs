use std::path::PathBuf;
use thiserror::Error;

/// A source dump that violates the fixed instrument schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The dump is shorter than the metadata block it must start with.
    #[error("Expected at least {expected} metadata lines, found {found}")]
    TooFewLines { expected: usize, found: usize },

    /// A data line does not carry exactly one value per schema column.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The timestamp column could not be parsed.
    #[error("Line {line}: invalid timestamp {value:?}")]
    InvalidTimestamp { line: u64, value: String },

    /// The record number column could not be parsed.
    #[error("Line {line}: invalid record id {value:?}")]
    InvalidRecordId { line: u64, value: String },

    /// The timestamp is earlier than the one on the preceding row.
    #[error("Line {line}: timestamp {timestamp} is earlier than the previous row")]
    OutOfOrder { line: u64, timestamp: String },

    /// The record number was already used by an earlier row.
    #[error("Line {line}: duplicate record id {record_id}")]
    DuplicateRecord { line: u64, record_id: i64 },

    /// The delimited-text reader rejected the line outright.
    #[error("Line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl FormatError {
    /// Source line the error refers to, when it is tied to a single line.
    pub fn line(&self) -> Option<u64> {
        match self {
            FormatError::TooFewLines { .. } => None,
            FormatError::FieldCount { line, .. }
            | FormatError::InvalidTimestamp { line, .. }
            | FormatError::InvalidRecordId { line, .. }
            | FormatError::OutOfOrder { line, .. }
            | FormatError::DuplicateRecord { line, .. }
            | FormatError::Malformed { line, .. } => Some(*line),
        }
    }
}

/// All errors produced by the load-test monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A source file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source content does not match the instrument schema.
    #[error("Invalid source format: {0}")]
    Format(#[from] FormatError),

    /// A refresh failed; the previously held snapshot is still current.
    #[error("Refresh of {source_name} failed: {source}")]
    Refresh {
        source_name: String,
        #[source]
        source: Box<MonitorError>,
    },

    /// A view, summary or export was requested before any successful refresh.
    #[error("No {0} data loaded yet")]
    NotReady(&'static str),

    /// The dataset parsed successfully but holds no readings.
    #[error("Dataset contains no readings")]
    EmptyDataset,

    /// Rendering an export table failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonitorError {
    /// The underlying format error, looking through a refresh wrapper.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            MonitorError::Format(e) => Some(e),
            MonitorError::Refresh { source, .. } => source.format_error(),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the load-test crates.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MonitorError::FileRead {
            path: PathBuf::from("/some/LT2312.dat"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/LT2312.dat"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_too_few_lines() {
        let err = FormatError::TooFewLines {
            expected: 4,
            found: 2,
        };
        assert_eq!(err.to_string(), "Expected at least 4 metadata lines, found 2");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_error_display_field_count() {
        let err = FormatError::FieldCount {
            line: 7,
            expected: 13,
            found: 9,
        };
        assert_eq!(err.to_string(), "Line 7: expected 13 fields, found 9");
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_error_display_not_ready() {
        let err = MonitorError::NotReady("summary");
        assert_eq!(err.to_string(), "No summary data loaded yet");
    }

    #[test]
    fn test_error_display_empty_dataset() {
        assert_eq!(
            MonitorError::EmptyDataset.to_string(),
            "Dataset contains no readings"
        );
    }

    #[test]
    fn test_refresh_wraps_format_error() {
        let inner = FormatError::TooFewLines {
            expected: 4,
            found: 1,
        };
        let err = MonitorError::Refresh {
            source_name: "primary".to_string(),
            source: Box::new(MonitorError::Format(inner.clone())),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Refresh of primary failed"));
        assert!(msg.contains("found 1"));
        assert_eq!(err.format_error(), Some(&inner));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MonitorError = io_err.into();
        assert!(err.to_string().contains("denied"));
        assert!(err.format_error().is_none());
    }

    #[test]
    fn test_error_from_format() {
        let err: MonitorError = FormatError::DuplicateRecord {
            line: 12,
            record_id: 40,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid source format: Line 12: duplicate record id 40"
        );
    }
}

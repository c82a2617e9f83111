/// Error types for document scanning.
///
/// Every failure that can stop a single document from being scanned is a
/// `ScanError`. The per-file driver wraps lower-level errors into
/// `ScanError::Document` so that the message always starts with the
/// document's display name, and the orchestrator classifies them with
/// [`ScanError::kind`] when it records a failure.
///
/// ```rust,ignore
/// match scanner.scan(&document, &query).await {
///     Ok(result) => // use result,
///     Err(e) if e.kind() == FailureKind::FileTooLarge => // skip quietly,
///     Err(e) => // record e.to_string()
/// }
/// ```
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::document::DocumentKind;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while scanning documents
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{kind} document is {size} bytes, limit is {limit} bytes")]
    FileTooLarge {
        kind: DocumentKind,
        size: u64,
        limit: u64,
    },
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Failed to decode page {page}: {message}")]
    PageDecode { page: u32, message: String },
    #[error("Timed out after {} ms", .limit.as_millis())]
    Timeout { limit: Duration },
    #[error("Read error: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("{name}: {source}")]
    Document {
        name: String,
        #[source]
        source: Box<ScanError>,
    },
}

/// Coarse classification of a scan failure, used in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    FileTooLarge,
    Parse,
    PageDecode,
    Timeout,
    Read,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::FileTooLarge => "file too large",
            FailureKind::Parse => "parse error",
            FailureKind::PageDecode => "page decode error",
            FailureKind::Timeout => "timeout",
            FailureKind::Read => "read error",
            FailureKind::Config => "configuration error",
        };
        f.write_str(label)
    }
}

impl ScanError {
    pub fn file_too_large(kind: DocumentKind, size: u64, limit: u64) -> Self {
        Self::FileTooLarge { kind, size, limit }
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn page_decode(page: u32, msg: impl Into<String>) -> Self {
        Self::PageDecode {
            page,
            message: msg.into(),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout { limit }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    /// Wraps an error so its message is prefixed with the document name.
    /// Already-wrapped errors are returned unchanged.
    pub fn for_document(name: impl Into<String>, source: ScanError) -> Self {
        match source {
            wrapped @ ScanError::Document { .. } => wrapped,
            other => Self::Document {
                name: name.into(),
                source: Box::new(other),
            },
        }
    }

    /// Classifies the error, looking through the per-document wrapper
    pub fn kind(&self) -> FailureKind {
        match self {
            ScanError::FileTooLarge { .. } => FailureKind::FileTooLarge,
            ScanError::ParseError(_) => FailureKind::Parse,
            ScanError::PageDecode { .. } => FailureKind::PageDecode,
            ScanError::Timeout { .. } => FailureKind::Timeout,
            ScanError::ReadError(_) => FailureKind::Read,
            ScanError::ConfigError(_) | ScanError::InvalidPattern(_) => FailureKind::Config,
            ScanError::Document { source, .. } => source.kind(),
        }
    }
}

impl From<calamine::Error> for ScanError {
    fn from(err: calamine::Error) -> Self {
        ScanError::ParseError(err.to_string())
    }
}

impl From<lopdf::Error> for ScanError {
    fn from(err: lopdf::Error) -> Self {
        ScanError::ParseError(err.to_string())
    }
}

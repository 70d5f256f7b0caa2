//! Error types for the audit pipeline

use thiserror::Error;

/// Result type for audit pipeline operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors raised while ingesting documents, computing metrics, calling the
/// text-generation service or rendering the report.
///
/// Extraction errors are scoped to one document; the processor decides whether
/// the run continues based on its document policy. Service and render errors
/// always abort the run.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Declared format tag is not plain text, DOCX or PDF
    #[error("Unsupported format '{declared}' for document '{name}'")]
    UnsupportedFormat { name: String, declared: String },

    /// Bytes could not be decoded into text (bad UTF-8, corrupt container)
    #[error("Could not decode document '{name}': {reason}")]
    DecodingError { name: String, reason: String },

    /// Degenerate arithmetic while computing a metric
    #[error("Invalid measurement: {0}")]
    InvalidMeasurement(String),

    /// Text-generation service call failed
    #[error("Text-generation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Text-generation service returned nothing usable
    #[error("Text-generation service returned an empty report")]
    EmptyReport,

    /// More documents than the configured maximum for one run
    #[error("Too many documents: {count} uploaded, at most {max} allowed per run")]
    TooManyDocuments { count: usize, max: usize },

    /// A run needs at least one document
    #[error("No documents supplied")]
    NoDocuments,

    /// Report layout or serialization failed
    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    /// True for errors scoped to a single document during extraction
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            AuditError::UnsupportedFormat { .. } | AuditError::DecodingError { .. }
        )
    }
}

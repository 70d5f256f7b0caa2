//! PDF Preprocessor
//!
//! Extracts note text from PDF documents through a pluggable backend. Page
//! texts are concatenated in page order with no separator inserted, so a
//! pattern that straddles a page boundary sees the two halves glued together.

pub mod backends;

use crate::error::{AuditError, Result};
use crate::preprocessors::Preprocessor;
use crate::types::DocumentFormat;

pub use backends::{LopdfBackend, PdfBackend};

/// PDF Preprocessor with pluggable backend
pub struct PdfPreprocessor {
    backend: Box<dyn PdfBackend>,
}

impl Default for PdfPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfPreprocessor {
    /// Create PdfPreprocessor with the lopdf backend
    pub fn new() -> Self {
        Self::with_backend(Box::new(LopdfBackend::new()))
    }

    pub fn with_backend(backend: Box<dyn PdfBackend>) -> Self {
        Self { backend }
    }

    /// Get the backend name for logging
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Preprocessor for PdfPreprocessor {
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let pages = self
            .backend
            .extract_pages(bytes)
            .map_err(|e| AuditError::DecodingError {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(
            document = name,
            backend = self.backend_name(),
            pages = pages.len(),
            "extracted PDF text"
        );
        Ok(pages.concat())
    }

    fn name(&self) -> &str {
        "PdfPreprocessor"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::PortableDocument
    }
}

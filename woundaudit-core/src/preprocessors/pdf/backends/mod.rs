//! PDF Backend trait and backend implementations
//!
//! Defines the interface that all PDF text backends must implement.
//! Backends return one string per page, in page order; page joining is the
//! preprocessor's job so every backend shares the same boundary behavior.

use anyhow::Result;

/// Backend trait for PDF text extraction
pub trait PdfBackend: Send + Sync {
    /// Extract the text of every page, ordered by page number
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;
}

pub mod lopdf_backend;

pub use lopdf_backend::LopdfBackend;

// Preprocessor abstraction for document ingestion
//
// This module defines the boundary between format handling (bytes -> text)
// and everything downstream (identifiers, metrics, composition). Downstream
// stages only ever see plain text, never the source format.

use crate::error::Result;
use crate::types::DocumentFormat;
use std::path::Path;

/// Preprocessor trait - converts one document format to plain text
///
/// Implementations handle:
/// - Container/encoding handling (UTF-8, zip + XML, PDF objects)
/// - Text selection (which parts of the document count as note text)
/// - Ordering (paragraph order, page order)
pub trait Preprocessor {
    /// Extract plain text from raw document bytes
    ///
    /// `name` is only used to label errors.
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String>;

    /// Convenience method: Process from file path
    fn process_file(&self, input: &Path) -> Result<String> {
        let bytes = std::fs::read(input)?;
        let name = input.to_string_lossy();
        self.extract_text(&name, &bytes)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// The document format this preprocessor handles
    fn format(&self) -> DocumentFormat;
}

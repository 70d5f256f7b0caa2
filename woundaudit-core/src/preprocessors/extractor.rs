use crate::error::{AuditError, Result};
use crate::preprocessors::{DocxPreprocessor, PdfPreprocessor, PlainTextPreprocessor, Preprocessor};
use crate::types::{Document, NormalizedNote};

/// Routes each document to the preprocessor for its declared format and
/// normalizes the result into a `NormalizedNote`.
pub struct DocumentExtractor {
    preprocessors: Vec<Box<dyn Preprocessor + Send + Sync>>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor {
    /// Extractor with the built-in text, DOCX and PDF preprocessors
    pub fn new() -> Self {
        Self {
            preprocessors: vec![
                Box::new(PlainTextPreprocessor::new()),
                Box::new(DocxPreprocessor::new()),
                Box::new(PdfPreprocessor::new()),
            ],
        }
    }

    /// Replace the preprocessor registered for the same format
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn Preprocessor + Send + Sync>) -> Self {
        let format = preprocessor.format();
        self.preprocessors.retain(|p| p.format() != format);
        self.preprocessors.push(preprocessor);
        self
    }

    /// Extract one document. `position` is its 1-based upload position.
    pub fn extract(&self, position: usize, document: &Document) -> Result<NormalizedNote> {
        let unsupported = || AuditError::UnsupportedFormat {
            name: document.name().to_string(),
            declared: document.declared_format().to_string(),
        };

        let format = document.format().ok_or_else(unsupported)?;
        let preprocessor = self
            .preprocessors
            .iter()
            .find(|p| p.format() == format)
            .ok_or_else(unsupported)?;

        tracing::debug!(
            document = document.name(),
            preprocessor = preprocessor.name(),
            bytes = document.bytes().len(),
            "extracting document"
        );

        let text = preprocessor.extract_text(document.name(), document.bytes())?;
        Ok(NormalizedNote::new(
            position,
            document.name(),
            normalize_line_endings(&text),
        ))
    }
}

/// CRLF and lone CR become LF so line-based patterns behave the same for every source
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_document_becomes_note() {
        let doc = Document::new("a.txt", "text/plain", b"Surface Area: 3\r\nTunneling: Yes".to_vec());
        let note = DocumentExtractor::new().extract(1, &doc).unwrap();
        assert_eq!(note.position, 1);
        assert_eq!(note.source_name, "a.txt");
        assert_eq!(note.text, "Surface Area: 3\nTunneling: Yes");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let doc = Document::new("wound.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]);
        let err = DocumentExtractor::new().extract(1, &doc).unwrap_err();
        assert!(matches!(
            err,
            AuditError::UnsupportedFormat { ref declared, .. } if declared == "image/png"
        ));
    }

    #[test]
    fn replaced_preprocessor_is_used() {
        struct Upper;
        impl Preprocessor for Upper {
            fn extract_text(&self, _name: &str, bytes: &[u8]) -> Result<String> {
                Ok(String::from_utf8_lossy(bytes).to_uppercase())
            }
            fn name(&self) -> &str {
                "Upper"
            }
            fn format(&self) -> crate::types::DocumentFormat {
                crate::types::DocumentFormat::PlainText
            }
        }

        let extractor = DocumentExtractor::new().with_preprocessor(Box::new(Upper));
        let note = extractor.extract(1, &Document::from_text("p.txt", "yes")).unwrap();
        assert_eq!(note.text, "YES");
    }

    #[test]
    fn lone_carriage_returns_are_normalized() {
        assert_eq!(normalize_line_endings("a\rb\r\nc"), "a\nb\nc");
    }
}

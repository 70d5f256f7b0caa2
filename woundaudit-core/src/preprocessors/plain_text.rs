use crate::error::{AuditError, Result};
use crate::preprocessors::Preprocessor;
use crate::types::DocumentFormat;

/// Plain-text notes: strict UTF-8, invalid sequences are an error rather
/// than replacement characters.
pub struct PlainTextPreprocessor;

impl Default for PlainTextPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainTextPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for PlainTextPreprocessor {
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(bytes).map_err(|e| AuditError::DecodingError {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
    }

    fn name(&self) -> &str {
        "PlainTextPreprocessor"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }
}

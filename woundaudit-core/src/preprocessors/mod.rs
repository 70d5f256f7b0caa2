//! Document Preprocessors
//!
//! This module converts uploaded documents in each supported format into the
//! plain text the rest of the audit pipeline works on.
//!
//! ## Architecture
//!
//! ```text
//! Document (TXT, DOCX, PDF) + declared format tag
//!     ↓
//! [DocumentExtractor] resolves the tag, rejects unknown formats
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! NormalizedNote (plain text, LF line endings)
//! ```
//!
//! ## Available Preprocessors
//!
//! - `PlainTextPreprocessor` - UTF-8 text, decoding errors surfaced
//! - `DocxPreprocessor` - body paragraphs of WordprocessingML documents
//! - `PdfPreprocessor` - page text in page order via lopdf

pub mod docx;
pub mod extractor;
pub mod pdf;
pub mod plain_text;
pub mod preprocessor;

// Re-export main types
pub use docx::DocxPreprocessor;
pub use extractor::DocumentExtractor;
pub use pdf::PdfPreprocessor;
pub use plain_text::PlainTextPreprocessor;
pub use preprocessor::Preprocessor;

//! DOCX Preprocessor
//!
//! Reads `word/document.xml` out of the zip container and keeps the text of
//! body paragraphs only, one line per paragraph in document order. Tables,
//! text boxes, headers/footers and embedded objects are not part of the note
//! text: headers and footers live in other parts of the container, and
//! paragraphs nested in `w:tbl` or `w:txbxContent` are skipped.

use crate::error::{AuditError, Result};
use crate::preprocessors::Preprocessor;
use crate::types::DocumentFormat;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

pub struct DocxPreprocessor;

impl Default for DocxPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxPreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Step 1: unpack the main document part from the zip container
    fn read_document_part(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let decoding_error = |reason: String| AuditError::DecodingError {
            name: name.to_string(),
            reason,
        };

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| decoding_error(format!("not a DOCX container: {e}")))?;
        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| decoding_error(format!("missing {DOCUMENT_PART}: {e}")))?;

        let mut xml = String::new();
        part.read_to_string(&mut xml)
            .map_err(|e| decoding_error(format!("unreadable {DOCUMENT_PART}: {e}")))?;
        Ok(xml)
    }
}

/// Step 2: collect body paragraph text from WordprocessingML
pub fn parse_body_paragraphs(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    // Depth inside tables / text boxes, whose paragraphs are excluded
    let mut skip_depth = 0usize;
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skip_depth += 1,
                b"w:p" if skip_depth == 0 => current = Some(String::new()),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Event::Empty(e) => {
                if skip_depth > 0 {
                    continue;
                }
                match e.name().as_ref() {
                    b"w:p" => paragraphs.push(String::new()),
                    b"w:tab" => {
                        if let Some(paragraph) = current.as_mut() {
                            paragraph.push('\t');
                        }
                    }
                    b"w:br" | b"w:cr" => {
                        if let Some(paragraph) = current.as_mut() {
                            paragraph.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if in_text_run && skip_depth == 0 {
                    if let Some(paragraph) = current.as_mut() {
                        paragraph.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skip_depth = skip_depth.saturating_sub(1),
                b"w:p" if skip_depth == 0 => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                b"w:t" => in_text_run = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

impl Preprocessor for DocxPreprocessor {
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let xml = self.read_document_part(name, bytes)?;
        let paragraphs = parse_body_paragraphs(&xml).map_err(|e| AuditError::DecodingError {
            name: name.to_string(),
            reason: format!("malformed {DOCUMENT_PART}: {e}"),
        })?;
        tracing::debug!(document = name, paragraphs = paragraphs.len(), "parsed DOCX body");
        Ok(paragraphs.join("\n"))
    }

    fn name(&self) -> &str {
        "DocxPreprocessor"
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::WordMarkup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn paragraphs_join_with_newlines() {
        let xml = body(
            r#"<w:p><w:r><w:t>Patient: Jordan Lee</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Surface Area: </w:t></w:r><w:r><w:t>12.5</w:t></w:r></w:p>"#,
        );
        let text = DocxPreprocessor::new()
            .extract_text("note.docx", &docx_bytes(&xml))
            .unwrap();
        assert_eq!(text, "Patient: Jordan Lee\nSurface Area: 12.5");
    }

    #[test]
    fn tables_and_text_boxes_are_ignored() {
        let xml = body(
            r#"<w:p><w:r><w:t>Before</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>After</w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></w:pict></w:r></w:p>"#,
        );
        let paragraphs = parse_body_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Before".to_string(), "After".to_string()]);
    }

    #[test]
    fn empty_paragraphs_are_kept_and_entities_unescaped() {
        let xml = body(r#"<w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>C</w:t></w:r></w:p>"#);
        let paragraphs = parse_body_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs, vec!["A & B".to_string(), String::new(), "C".to_string()]);
    }

    #[test]
    fn non_zip_bytes_are_a_decoding_error() {
        let err = DocxPreprocessor::new()
            .extract_text("broken.docx", b"plain text pretending to be docx")
            .unwrap_err();
        assert!(matches!(err, AuditError::DecodingError { .. }));
    }
}

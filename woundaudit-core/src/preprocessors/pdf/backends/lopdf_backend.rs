//! Pure-Rust PDF backend built on lopdf

use super::PdfBackend;
use anyhow::{anyhow, Result};
use lopdf::Document;

/// Reads the page tree with lopdf and extracts each page's text content.
pub struct LopdfBackend;

impl Default for LopdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>> {
        let doc = Document::load_mem(pdf_bytes).map_err(|e| anyhow!("unreadable PDF: {e}"))?;
        if doc.is_encrypted() {
            return Err(anyhow!("encrypted PDF"));
        }

        // get_pages() is a BTreeMap keyed by 1-based page number
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for page_number in pages.keys() {
            let text = doc
                .extract_text(&[*page_number])
                .map_err(|e| anyhow!("page {page_number}: {e}"))?;
            texts.push(text);
        }
        Ok(texts)
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

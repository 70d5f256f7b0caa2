//! Report rendering
//!
//! The built-in PDF fonts cover a narrow character set, so text goes
//! through `normalize_typography` first: typographic punctuation becomes
//! ASCII and anything else outside printable ASCII becomes a placeholder.
//! Layout is one text line per wrapped line, fixed left margin, blank lines
//! kept as vertical space, and a new page whenever the cursor reaches the
//! bottom margin.

use crate::config::RenderConfig;
use crate::error::{AuditError, Result};
use crate::types::AuditReport;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::io::BufWriter;

const TAB_EXPANSION: &str = "    ";

/// Map typographic characters to ASCII and replace everything else outside
/// printable ASCII with `placeholder`. Newlines are kept; CR and CRLF become
/// LF. Applying it twice gives the same result as applying it once.
pub fn normalize_typography(text: &str, placeholder: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => out.push('\n'),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\t' => out.push_str(TAB_EXPANSION),
            ' '..='~' => out.push(c),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => out.push('"'),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
            | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{2023}' | '\u{2043}' | '\u{25AA}' | '\u{25CF}' | '\u{25E6}'
            | '\u{00B7}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2007}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            _ => out.push(placeholder),
        }
    }

    out
}

/// Word-wrap one line at `max_chars`, keeping its leading indentation.
/// A blank line wraps to a single empty line; words longer than the width
/// are split.
pub fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return vec![String::new()];
    }

    let indent = &line[..line.len() - trimmed.len()];
    let indent = if indent.len() < max_chars / 2 { indent } else { "" };
    let width = max_chars - indent.len();

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in trimmed.split_whitespace() {
        let mut word = word;
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = floor_char_boundary(word, width);
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|l| format!("{indent}{l}"))
        .collect()
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    if i == 0 {
        // A single char wider than the budget still has to make progress
        s.chars().next().map(char::len_utf8).unwrap_or(0)
    } else {
        i
    }
}

/// The rendered artifact
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub struct ReportRenderer {
    config: RenderConfig,
}

impl ReportRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render summary lines then narrative into a paginated PDF
    pub fn render(&self, report: &AuditReport) -> Result<RenderedReport> {
        let text = normalize_typography(&report.full_text(), self.config.placeholder);
        let title = normalize_typography(&report.title, self.config.placeholder);
        self.render_text(&title, &text)
    }

    pub fn render_text(&self, title: &str, text: &str) -> Result<RenderedReport> {
        let cfg = &self.config;
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(cfg.page_width_mm),
            Mm(cfg.page_height_mm),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AuditError::Render(format!("PDF font error: {e}")))?;

        let mut cursor = PageCursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            font: &font,
            y: cfg.page_height_mm - cfg.margin_top_mm,
            pages: 1,
            config: cfg,
        };

        for line in text.lines() {
            for wrapped in wrap_line(line, cfg.wrap_width) {
                cursor.write_line(&wrapped);
            }
        }

        let page_count = cursor.pages;
        drop(cursor);
        tracing::debug!(pages = page_count, "rendered report");

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| AuditError::Render(format!("PDF save error: {e}")))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| AuditError::Render(format!("PDF buffer error: {e}")))?;

        Ok(RenderedReport { bytes, page_count })
    }
}

/// Vertical position on the current page, in mm from the bottom edge
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: &'a IndirectFontRef,
    y: f32,
    pages: usize,
    config: &'a RenderConfig,
}

impl PageCursor<'_> {
    fn write_line(&mut self, line: &str) {
        if self.y < self.config.margin_bottom_mm {
            self.new_page();
        }
        // Blank lines only advance the cursor
        if !line.is_empty() {
            self.layer.use_text(
                line,
                self.config.font_size,
                Mm(self.config.margin_left_mm),
                Mm(self.y),
                self.font,
            );
        }
        self.y -= self.config.line_height_mm;
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(self.config.page_width_mm),
            Mm(self.config.page_height_mm),
            format!("Layer {}", self.pages + 1),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.config.page_height_mm - self.config.margin_top_mm;
        self.pages += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn report(narrative: &str) -> AuditReport {
        AuditReport {
            run_id: Uuid::new_v4(),
            title: "CMS Wound Audit Report (L35125 / L38902)".to_string(),
            generated_at: Utc::now(),
            summary: vec![
                "Healing Trajectory: 20% surface area reduction".to_string(),
                "Risk Score: Moderate Risk".to_string(),
            ],
            narrative: narrative.to_string(),
        }
    }

    #[test]
    fn typographic_characters_become_ascii() {
        let text = "\u{201C}Stage 3\u{201D} \u{2013} patient\u{2019}s wound \u{2022} ok\u{2026}";
        assert_eq!(
            normalize_typography(text, '?'),
            "\"Stage 3\" - patient's wound - ok..."
        );
    }

    #[test]
    fn unmapped_characters_use_placeholder() {
        assert_eq!(normalize_typography("Temp 37\u{00B0}C \u{1F600}", '?'), "Temp 37?C ?");
        assert_eq!(normalize_typography("a\u{0007}b", '#'), "a#b");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "\u{201C}quoted\u{201D}\r\n\tindented \u{2014} dash",
            "plain ascii\n\nwith blank line",
            "\u{00E9}\u{00E8}\u{4E2D}\u{6587}",
        ];
        for sample in samples {
            let once = normalize_typography(sample, '?');
            assert_eq!(normalize_typography(&once, '?'), once);
            assert!(once.chars().all(|c| c == '\n' || (' '..='~').contains(&c)));
        }
    }

    #[test]
    fn wrap_keeps_indent_and_blank_lines() {
        assert_eq!(wrap_line("", 20), vec![String::new()]);
        assert_eq!(wrap_line("   ", 20), vec![String::new()]);
        let wrapped = wrap_line("  - one two three four five", 12);
        assert!(wrapped.iter().all(|l| l.starts_with("  ")));
        assert!(wrapped.iter().all(|l| l.len() <= 12));
        assert_eq!(wrapped.join(" ").split_whitespace().count(), 6);
    }

    #[test]
    fn long_words_are_split() {
        let wrapped = wrap_line(&"x".repeat(25), 10);
        assert_eq!(wrapped, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn renders_pdf_bytes() {
        let rendered = ReportRenderer::new(RenderConfig::default())
            .render(&report("1. **Audit Summary**\n\nDocumentation supports necessity."))
            .unwrap();
        assert!(rendered.bytes.starts_with(b"%PDF"));
        assert_eq!(rendered.page_count, 1);
    }

    #[test]
    fn long_reports_break_across_pages() {
        let narrative: Vec<String> = (1..=150).map(|i| format!("Line {i} of the narrative")).collect();
        let rendered = ReportRenderer::new(RenderConfig::default())
            .render(&report(&narrative.join("\n")))
            .unwrap();
        assert!(rendered.page_count > 1);

        let parsed = lopdf::Document::load_mem(&rendered.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), rendered.page_count);
    }

    #[test]
    fn blank_lines_take_vertical_space() {
        let renderer = ReportRenderer::new(RenderConfig::default());
        // About 38 lines fit a default page; blank lines must count toward that
        let dense = renderer.render_text("t", &"x\n".repeat(30)).unwrap();
        let spaced = renderer.render_text("t", &"x\n\n".repeat(30)).unwrap();
        assert_eq!(dense.page_count, 1);
        assert_eq!(spaced.page_count, 2);
    }

    #[test]
    fn non_ascii_narrative_does_not_fail() {
        let rendered = ReportRenderer::new(RenderConfig::default())
            .render(&report("Wundbehandlung \u{2014} \u{00FC}berpr\u{00FC}ft \u{2713}"))
            .unwrap();
        assert!(rendered.bytes.starts_with(b"%PDF"));
    }
}

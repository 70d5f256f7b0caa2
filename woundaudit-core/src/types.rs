use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

pub type RunId = Uuid;

// ===== DOCUMENTS =====

pub const MIME_PLAIN_TEXT: &str = "text/plain";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PDF: &str = "application/pdf";

/// The three document kinds the extractor understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    WordMarkup,
    PortableDocument,
}

impl DocumentFormat {
    /// Resolve a declared format tag: either a MIME type or a bare file extension.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let tag = declared.trim().trim_start_matches('.').to_ascii_lowercase();
        match tag.as_str() {
            MIME_PLAIN_TEXT | "txt" | "text" => Some(DocumentFormat::PlainText),
            MIME_DOCX | "docx" => Some(DocumentFormat::WordMarkup),
            MIME_PDF | "pdf" => Some(DocumentFormat::PortableDocument),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::PlainText => MIME_PLAIN_TEXT,
            DocumentFormat::WordMarkup => MIME_DOCX,
            DocumentFormat::PortableDocument => MIME_PDF,
        }
    }
}

/// An uploaded document: raw bytes plus the format tag it was declared with.
/// Immutable once built; consumed once by the extractor.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    declared_format: String,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, declared_format: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_format: declared_format.into(),
            bytes,
        }
    }

    /// Pasted note text, treated as a plain-text upload
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, MIME_PLAIN_TEXT, text.as_bytes().to_vec())
    }

    /// Read a document from disk, declaring its format by file extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let declared = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        Ok(Self::new(name, declared, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_format(&self) -> &str {
        &self.declared_format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_declared(&self.declared_format)
    }
}

/// Plain text derived from one document, optionally prefixed with the
/// synthetic multi-note header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedNote {
    /// 1-based upload position
    pub position: usize,
    pub source_name: String,
    pub text: String,
}

impl NormalizedNote {
    pub fn new(position: usize, source_name: &str, text: String) -> Self {
        Self {
            position,
            source_name: source_name.to_string(),
            text,
        }
    }

    /// Prepend the `===== NOTE <n> =====` / `File Name:` header used in multi-document runs
    pub fn with_header(mut self) -> Self {
        self.text = format!(
            "===== NOTE {} =====\nFile Name: {}\n{}",
            self.position, self.source_name, self.text
        );
        self
    }
}

/// A document that was rejected during extraction under the skip-failed policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedDocument {
    pub position: usize,
    pub name: String,
    pub reason: String,
}

// ===== IDENTIFIERS =====

/// Marker shown wherever an identifier was not found (or matched only blank text)
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Identifiers {
    pub patient: Option<String>,
    pub visit_date: Option<String>,
    pub provider: Option<String>,
    pub facility: Option<String>,
}

impl Identifiers {
    pub fn patient_display(&self) -> &str {
        display_field(&self.patient)
    }

    pub fn visit_date_display(&self) -> &str {
        display_field(&self.visit_date)
    }

    pub fn provider_display(&self) -> &str {
        display_field(&self.provider)
    }

    pub fn facility_display(&self) -> &str {
        display_field(&self.facility)
    }

    pub fn is_empty(&self) -> bool {
        self.patient.is_none()
            && self.visit_date.is_none()
            && self.provider.is_none()
            && self.facility.is_none()
    }
}

/// A match that is blank after trimming is presented as not found
fn display_field(field: &Option<String>) -> &str {
    match field.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => NOT_FOUND,
    }
}

/// One note with the identifiers extracted from its (header-prefixed) text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAnalysis {
    pub note: NormalizedNote,
    pub identifiers: Identifiers,
}

/// Result of comparing visit dates against upload order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChronologyCheck {
    /// Fewer than two notes, nothing to compare
    SingleNote,
    /// Some note has no parseable visit date
    Undetermined,
    InOrder,
    /// Visit dates go backwards; upload order is still used
    OutOfOrder { first_regression_at: usize },
}

// ===== CLINICAL METRICS =====

/// Wound dimensions in centimeters, in document order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub length: f64,
    pub width: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskFindings {
    pub drainage: u32,
    pub tunneling: u32,
    pub periwound_redness: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskScore {
    Low,
    Moderate,
    High,
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskScore::Low => "Low Risk",
            RiskScore::Moderate => "Moderate Risk",
            RiskScore::High => "High Risk",
        };
        f.write_str(label)
    }
}

/// Healing trajectory as reported: a percentage, or why there is none
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrajectoryStatus {
    /// Percent surface-area reduction between the two most recent values
    Percent { value: f64 },
    /// Fewer than two surface-area values
    NotEnoughData,
    /// Values present but the arithmetic is degenerate
    Unavailable { reason: String },
}

impl TrajectoryStatus {
    pub fn percent(&self) -> Option<f64> {
        match self {
            TrajectoryStatus::Percent { value } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for TrajectoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryStatus::Percent { value } => {
                write!(f, "{value}% surface area reduction")
            }
            TrajectoryStatus::NotEnoughData => f.write_str("Not enough data to calculate"),
            TrajectoryStatus::Unavailable { reason } => write!(f, "Unavailable ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalMetrics {
    pub measurements: Vec<Measurement>,
    pub surface_areas: Vec<f64>,
    pub findings: RiskFindings,
    pub risk_points: u32,
    pub risk_score: RiskScore,
    pub trajectory: TrajectoryStatus,
}

impl ClinicalMetrics {
    /// Summary lines placed ahead of the narrative in requests and reports
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Healing Trajectory: {}", self.trajectory),
            format!(
                "Risk Score: {} (score {}: drainage {}, tunneling {}, periwound redness {})",
                self.risk_score,
                self.risk_points,
                self.findings.drainage,
                self.findings.tunneling,
                self.findings.periwound_redness
            ),
        ]
    }
}

// ===== REQUEST / REPORT =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// The two-part message sent once to the text-generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub run_id: RunId,
    pub framework: String,
    pub instructions: String,
    pub user_content: String,
}

impl AuditRequest {
    pub fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage {
                role: MessageRole::System,
                content: self.instructions.clone(),
            },
            ChatMessage {
                role: MessageRole::User,
                content: self.user_content.clone(),
            },
        ]
    }
}

/// Narrative returned by the service plus the computed summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_id: RunId,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Vec<String>,
    pub narrative: String,
}

impl AuditReport {
    /// Summary lines, a blank separator line, then the narrative
    pub fn full_text(&self) -> String {
        let mut text = self.summary.join("\n");
        text.push_str("\n\n");
        text.push_str(&self.narrative);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_formats_resolve_from_mime_or_extension() {
        assert_eq!(
            DocumentFormat::from_declared("text/plain"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_declared(".DOCX"),
            Some(DocumentFormat::WordMarkup)
        );
        assert_eq!(
            DocumentFormat::from_declared(MIME_PDF),
            Some(DocumentFormat::PortableDocument)
        );
        assert_eq!(DocumentFormat::from_declared("image/png"), None);
        assert_eq!(DocumentFormat::from_declared(""), None);
    }

    #[test]
    fn blank_identifier_displays_as_not_found() {
        let ids = Identifiers {
            patient: Some("   ".to_string()),
            visit_date: None,
            provider: Some("Dana Reyes, NP".to_string()),
            facility: None,
        };
        assert_eq!(ids.patient_display(), NOT_FOUND);
        assert_eq!(ids.visit_date_display(), NOT_FOUND);
        assert_eq!(ids.provider_display(), "Dana Reyes, NP");
    }

    #[test]
    fn note_header_is_prepended() {
        let note = NormalizedNote::new(2, "visit2.txt", "Surface Area: 4".to_string()).with_header();
        assert!(note.text.starts_with("===== NOTE 2 =====\nFile Name: visit2.txt\n"));
        assert!(note.text.ends_with("Surface Area: 4"));
    }

    #[test]
    fn report_text_puts_summary_first() {
        let report = AuditReport {
            run_id: Uuid::new_v4(),
            title: "Audit".to_string(),
            generated_at: Utc::now(),
            summary: vec!["Healing Trajectory: 20%".to_string(), "Risk Score: Low Risk".to_string()],
            narrative: "1. Audit Summary".to_string(),
        };
        assert_eq!(
            report.full_text(),
            "Healing Trajectory: 20%\nRisk Score: Low Risk\n\n1. Audit Summary"
        );
    }

    #[test]
    fn zero_percent_trajectory_is_not_hidden() {
        let status = TrajectoryStatus::Percent { value: 0.0 };
        assert_eq!(status.to_string(), "0% surface area reduction");
    }
}

//! Identifier extraction
//!
//! Four independent first-match scans (patient, visit date, provider,
//! facility) driven by label tables from configuration. The engine itself
//! carries no patient or facility literals; deployments that need literal
//! fallbacks list them in `IdentifierRules`.
//!
//! Extraction never fails. A scan with no match yields `None`; a label with
//! nothing after it yields an empty string, which presentation treats as
//! "Not found".

use crate::types::{ChronologyCheck, Identifiers, NoteAnalysis};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

const MONTH: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

/// Label-token tables for each identifier field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentifierRules {
    pub patient_labels: Vec<String>,
    pub visit_date_labels: Vec<String>,
    pub provider_labels: Vec<String>,
    /// Provider matches must end in one of these credential tokens
    pub credentials: Vec<String>,
    pub facility_labels: Vec<String>,
    /// Literal fallbacks used only when no patient label matches
    #[serde(default)]
    pub known_patients: Vec<String>,
    /// Literal fallbacks used only when no facility label matches
    #[serde(default)]
    pub known_facilities: Vec<String>,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            patient_labels: vec![
                "Patient Name".to_string(),
                "Patient".to_string(),
                "Name".to_string(),
            ],
            visit_date_labels: vec![
                "Visited on".to_string(),
                "Date of Service".to_string(),
                "Visit Date".to_string(),
                "Date".to_string(),
            ],
            provider_labels: vec![
                "Provider".to_string(),
                "Signed by".to_string(),
                "Edited by".to_string(),
                "by".to_string(),
            ],
            credentials: vec![
                "NP".to_string(),
                "MD".to_string(),
                "DO".to_string(),
                "PA".to_string(),
            ],
            facility_labels: vec![
                "Facility".to_string(),
                "Clinic".to_string(),
            ],
            known_patients: Vec::new(),
            known_facilities: Vec::new(),
        }
    }
}

/// Escaped alternation, longest token first so "Patient Name" wins over "Patient"
fn alternation(tokens: &[String]) -> String {
    let mut escaped: Vec<String> = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    escaped.dedup();
    escaped.join("|")
}

/// One regex per label, longest label first, each capturing the rest of the
/// line after the label. A label may sit anywhere in a line.
fn line_label_patterns(labels: &[String]) -> Result<Vec<Regex>> {
    let mut labels: Vec<&str> = labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    labels.sort_by(|a, b| b.len().cmp(&a.len()));
    labels.dedup();
    labels
        .into_iter()
        .map(|label| -> Result<Regex> {
            let pattern = format!(
                r"\b{}\b[ \t]*[:\-]?[ \t]*([^\n]*)",
                regex::escape(label)
            );
            Ok(Regex::new(&pattern)?)
        })
        .collect()
}

fn literal_pattern(literals: &[String]) -> Result<Option<Regex>> {
    if literals.iter().all(|l| l.trim().is_empty()) {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!(r"\b(?:{})\b", alternation(literals)))?))
}

pub struct IdentifierExtractor {
    patient: Vec<Regex>,
    patient_literals: Option<Regex>,
    visit_date: Option<Regex>,
    provider: Option<Regex>,
    facility: Vec<Regex>,
    facility_literals: Option<Regex>,
}

impl Default for IdentifierExtractor {
    fn default() -> Self {
        // Default tables are plain words; compiling them cannot fail
        Self::new(&IdentifierRules::default()).expect("default identifier rules compile")
    }
}

impl IdentifierExtractor {
    pub fn new(rules: &IdentifierRules) -> Result<Self> {
        let date_fragment = format!(
            r"\d{{4}}[ \t]+(?:{MONTH})[a-z]*\.?(?:[ \t]+\d{{1,2}})?|\d{{4}}(?:[-/.]\d{{1,2}}){{0,2}}|\d{{1,2}}[-/.]\d{{1,2}}[-/.]\d{{4}}|(?:{MONTH})[a-z]*\.?[ \t]+\d{{1,2}},?[ \t]+\d{{4}}"
        );

        let visit_date = if rules.visit_date_labels.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"\b(?:{})\b[ \t]*[:\-]?[ \t]*({date_fragment})",
                alternation(&rules.visit_date_labels)
            ))?)
        };

        let provider = if rules.provider_labels.is_empty() || rules.credentials.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"\b(?:{})\b[ \t]*:?[ \t]*([^\n]*?\b(?:{})\b)",
                alternation(&rules.provider_labels),
                alternation(&rules.credentials)
            ))?)
        };

        Ok(Self {
            patient: line_label_patterns(&rules.patient_labels)?,
            patient_literals: literal_pattern(&rules.known_patients)?,
            visit_date,
            provider,
            facility: line_label_patterns(&rules.facility_labels)?,
            facility_literals: literal_pattern(&rules.known_facilities)?,
        })
    }

    pub fn extract(&self, text: &str) -> Identifiers {
        Identifiers {
            patient: first_labelled(&self.patient, text)
                .or_else(|| first_match(&self.patient_literals, text)),
            visit_date: first_capture(&self.visit_date, text),
            provider: first_capture(&self.provider, text),
            facility: first_labelled(&self.facility, text)
                .or_else(|| first_match(&self.facility_literals, text)),
        }
    }
}

fn first_capture(pattern: &Option<Regex>, text: &str) -> Option<String> {
    pattern
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().trim_end().to_string())
}

/// Labels are tried in order; the first label found anywhere wins
fn first_labelled(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().trim_end().to_string())
    })
}

fn first_match(pattern: &Option<Regex>, text: &str) -> Option<String> {
    pattern.as_ref()?.find(text).map(|m| m.as_str().to_string())
}

/// Parse an extracted visit-date fragment; year-only fragments don't parse
pub fn parse_visit_date(fragment: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%Y %B %d",
        "%B %d, %Y", "%B %d %Y",
    ];
    let fragment = fragment.trim();
    // "Mar. 5, 2024" -> "Mar 5, 2024"; dotted numeric dates keep their dots
    let cleaned = if fragment.contains(' ') {
        fragment.replace('.', "")
    } else {
        fragment.to_string()
    };
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
}

/// Compare visit dates against upload order. Notes are never reordered;
/// this only reports whether upload order looks chronological.
pub fn check_chronology(notes: &[NoteAnalysis]) -> ChronologyCheck {
    if notes.len() < 2 {
        return ChronologyCheck::SingleNote;
    }

    let dates: Option<Vec<NaiveDate>> = notes
        .iter()
        .map(|n| n.identifiers.visit_date.as_deref().and_then(parse_visit_date))
        .collect();

    let Some(dates) = dates else {
        return ChronologyCheck::Undetermined;
    };

    match dates.windows(2).position(|pair| pair[1] < pair[0]) {
        Some(index) => ChronologyCheck::OutOfOrder {
            first_regression_at: notes[index + 1].note.position,
        },
        None => ChronologyCheck::InOrder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedNote;

    fn extract(text: &str) -> Identifiers {
        IdentifierExtractor::default().extract(text)
    }

    #[test]
    fn no_labels_means_all_absent() {
        let ids = extract("Wound bed pink with granulation tissue.\nNo odor noted.");
        assert!(ids.is_empty());
    }

    #[test]
    fn extracts_all_four_fields() {
        let text = "Patient: Jordan Lee\nDate: 2024-03-15\nFacility: Riverside Wound Center\nWound assessed.\nSigned by: Dana Reyes, NP";
        let ids = extract(text);
        assert_eq!(ids.patient.as_deref(), Some("Jordan Lee"));
        assert_eq!(ids.visit_date.as_deref(), Some("2024-03-15"));
        assert_eq!(ids.facility.as_deref(), Some("Riverside Wound Center"));
        assert_eq!(ids.provider.as_deref(), Some("Dana Reyes, NP"));
    }

    #[test]
    fn first_match_wins() {
        let ids = extract("Patient: First Person\nPatient: Second Person");
        assert_eq!(ids.patient.as_deref(), Some("First Person"));
    }

    #[test]
    fn longer_label_takes_priority() {
        let ids = extract("Patient Name: Jordan Lee");
        assert_eq!(ids.patient.as_deref(), Some("Jordan Lee"));
    }

    #[test]
    fn patient_label_outranks_note_header_file_name() {
        let ids = extract("===== NOTE 1 =====\nFile Name: visit1.txt\nPatient: Jordan Lee");
        assert_eq!(ids.patient.as_deref(), Some("Jordan Lee"));
    }

    #[test]
    fn note_header_file_name_matches_when_nothing_else_does() {
        let ids = extract("===== NOTE 1 =====\nFile Name: visit1.txt\nWound assessed.");
        assert_eq!(ids.patient.as_deref(), Some("visit1.txt"));
    }

    #[test]
    fn labels_are_found_partway_through_a_line() {
        let ids = extract("Wound care visit for Patient: Jordan Lee at Facility: Riverside Wound Center");
        assert_eq!(ids.facility.as_deref(), Some("Riverside Wound Center"));
        assert!(ids.patient.as_deref().unwrap().starts_with("Jordan Lee"));
    }

    #[test]
    fn labels_inside_longer_words_do_not_match() {
        let ids = extract("Clinical course stable. Renamed dressing protocol.");
        assert_eq!(ids.facility, None);
        assert_eq!(ids.patient, None);
    }

    #[test]
    fn empty_label_value_is_blank_not_absent() {
        let ids = extract("Patient:\nSurface Area: 4");
        assert_eq!(ids.patient.as_deref(), Some(""));
        assert_eq!(ids.patient_display(), crate::types::NOT_FOUND);
    }

    #[test]
    fn visit_date_forms() {
        assert_eq!(
            extract("Visited on 2024 March 5 by wound team").visit_date.as_deref(),
            Some("2024 March 5")
        );
        assert_eq!(extract("Date: 03/15/2024").visit_date.as_deref(), Some("03/15/2024"));
        assert_eq!(extract("Date of Service: 2024/01/09").visit_date.as_deref(), Some("2024/01/09"));
        assert_eq!(extract("Date of Birth: unknown").visit_date, None);
    }

    #[test]
    fn provider_needs_a_credential() {
        assert_eq!(extract("Provider: Sam Ortiz").provider, None);
        assert_eq!(
            extract("Electronically signed by Sam Ortiz, MD on 2024-03-15").provider.as_deref(),
            Some("Sam Ortiz, MD")
        );
        assert_eq!(extract("Provider: Jane Doe").provider, None);
    }

    #[test]
    fn literal_fallbacks_apply_only_when_labels_miss() {
        let rules = IdentifierRules {
            known_patients: vec!["Alex Morgan".to_string()],
            known_facilities: vec!["Harbor View SNF".to_string()],
            ..IdentifierRules::default()
        };
        let extractor = IdentifierExtractor::new(&rules).unwrap();

        let ids = extractor.extract("Seen Alex Morgan at Harbor View SNF today.");
        assert_eq!(ids.patient.as_deref(), Some("Alex Morgan"));
        assert_eq!(ids.facility.as_deref(), Some("Harbor View SNF"));

        let ids = extractor.extract("Patient: Chris Wu\nSeen Alex Morgan.");
        assert_eq!(ids.patient.as_deref(), Some("Chris Wu"));
    }

    #[test]
    fn empty_tables_disable_a_field() {
        let rules = IdentifierRules {
            provider_labels: Vec::new(),
            ..IdentifierRules::default()
        };
        let ids = IdentifierExtractor::new(&rules)
            .unwrap()
            .extract("Signed by: Dana Reyes, NP");
        assert_eq!(ids.provider, None);
    }

    #[test]
    fn parses_visit_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_visit_date("2024-03-05"), Some(expected));
        assert_eq!(parse_visit_date("03/05/2024"), Some(expected));
        assert_eq!(parse_visit_date("2024 March 5"), Some(expected));
        assert_eq!(parse_visit_date("March 5, 2024"), Some(expected));
        assert_eq!(parse_visit_date("2024"), None);
    }

    fn analysis(position: usize, date: Option<&str>) -> NoteAnalysis {
        NoteAnalysis {
            note: NormalizedNote::new(position, "n.txt", String::new()),
            identifiers: Identifiers {
                visit_date: date.map(str::to_string),
                ..Identifiers::default()
            },
        }
    }

    #[test]
    fn chronology_is_reported_not_fixed() {
        assert_eq!(
            check_chronology(&[analysis(1, Some("2024-01-01"))]),
            ChronologyCheck::SingleNote
        );
        assert_eq!(
            check_chronology(&[analysis(1, Some("2024-01-01")), analysis(2, Some("2024-02-01"))]),
            ChronologyCheck::InOrder
        );
        assert_eq!(
            check_chronology(&[analysis(1, Some("2024-02-01")), analysis(2, Some("2024-01-01"))]),
            ChronologyCheck::OutOfOrder { first_regression_at: 2 }
        );
        assert_eq!(
            check_chronology(&[analysis(1, Some("2024-02-01")), analysis(2, None)]),
            ChronologyCheck::Undetermined
        );
    }
}

//! Audit request composition.
//!
//! Purely structural: the framework supplies the citations, review focus,
//! checklist and section list; the composer arranges them into the system
//! block and concatenates notes in upload order into the user block.

use crate::config::AuditFramework;
use crate::types::{AuditRequest, ClinicalMetrics, NormalizedNote, RunId};

/// Separator between notes in the user block
pub const NOTE_SEPARATOR: &str = "\n\n";

pub struct AuditRequestComposer<'a> {
    framework: &'a AuditFramework,
    include_metrics: bool,
}

impl<'a> AuditRequestComposer<'a> {
    pub fn new(framework: &'a AuditFramework) -> Self {
        Self {
            framework,
            include_metrics: true,
        }
    }

    /// Whether the computed trajectory/risk lines go ahead of the note text
    pub fn include_metrics(mut self, include: bool) -> Self {
        self.include_metrics = include;
        self
    }

    /// Fixed instruction block for the configured framework
    pub fn instructions(&self) -> String {
        let framework = self.framework;
        let mut text = format!(
            "You are a CMS wound care compliance auditor. Review this wound care note for accuracy, completeness, and LCD compliance based on {}.",
            join_list(&framework.citations)
        );

        if !framework.review_focus.is_empty() {
            text.push_str(&format!(
                " Check for {}.",
                join_list(&framework.review_focus)
            ));
        }

        if framework.comparison_mode {
            text.push_str(
                " Multiple notes are provided in visit order. Compare each visit with the previous one and call out changes in measurements, drainage and plan of care.",
            );
        }

        if !framework.checklist.is_empty() {
            text.push_str("\n\nAddress each checklist item:\n");
            let items: Vec<String> = framework
                .checklist
                .iter()
                .map(|item| format!("- {item}"))
                .collect();
            text.push_str(&items.join("\n"));
        }

        text.push_str("\n\nFormat output as:\n\n");
        let sections: Vec<String> = framework
            .sections
            .iter()
            .enumerate()
            .map(|(i, section)| format!("{}. **{}**", i + 1, section))
            .collect();
        text.push_str(&sections.join("\n"));
        text
    }

    /// Build the single request for a run. Notes keep the order given.
    pub fn compose(
        &self,
        run_id: RunId,
        notes: &[NormalizedNote],
        image_context: Option<&str>,
        metrics: Option<&ClinicalMetrics>,
    ) -> AuditRequest {
        let mut body = String::new();
        if self.include_metrics {
            if let Some(metrics) = metrics {
                body.push_str(&metrics.summary_lines().join("\n"));
                body.push_str(NOTE_SEPARATOR);
            }
        }
        body.push_str(&combine_notes(notes));

        let user_content = match image_context {
            Some(context) if !context.trim().is_empty() => {
                format!("{context}{NOTE_SEPARATOR}{body}")
            }
            _ => body,
        };

        AuditRequest {
            run_id,
            framework: self.framework.name.clone(),
            instructions: self.instructions(),
            user_content,
        }
    }
}

/// Concatenate note texts in the order given
pub fn combine_notes(notes: &[NormalizedNote]) -> String {
    notes
        .iter()
        .map(|note| note.text.as_str())
        .collect::<Vec<_>>()
        .join(NOTE_SEPARATOR)
}

/// "A", "A and B", "A, B, and C"
fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

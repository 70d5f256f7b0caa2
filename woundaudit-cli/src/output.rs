//! Output artifacts: the PDF report and optional stage dumps.
//!
//! The report is written to a temporary file in the destination directory
//! and only renamed into place once fully written, so a failed run never
//! leaves a partial artifact behind.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use woundaudit_core::{AuditReport, AuditStages};

/// Report file name used when no --output is given
pub const DEFAULT_REPORT_NAME: &str = "CMS_Wound_Audit_Report.pdf";

/// Write `bytes` to `destination` atomically
pub fn write_artifact(bytes: &[u8], destination: &Path) -> Result<PathBuf> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(destination)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    Ok(destination.to_path_buf())
}

/// Dump every captured stage as its own file
pub fn save_stages(stages: &AuditStages, output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    // Stage 1: notes with their identifiers
    let notes_path = format!("{}/stage1_notes.json", output_dir);
    fs::write(&notes_path, serde_json::to_string_pretty(&stages.notes)?)?;
    println!("  💾 {} ({} notes)", notes_path, stages.notes.len());

    // Stage 2: clinical metrics
    let metrics_path = format!("{}/stage2_metrics.json", output_dir);
    fs::write(&metrics_path, serde_json::to_string_pretty(&stages.metrics)?)?;
    println!("  💾 {}", metrics_path);

    // Stage 3: composed request
    let request_path = format!("{}/stage3_request.json", output_dir);
    fs::write(&request_path, serde_json::to_string_pretty(&stages.request)?)?;
    println!("  💾 {}", request_path);

    // Summary file: quick reference for scripts
    let summary = serde_json::json!({
        "run_id": stages.run_id,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "chronology": stages.chronology,
        "rejected": stages.rejected,
        "stage_counts": {
            "notes": stages.notes.len(),
            "rejected": stages.rejected.len(),
            "surface_areas": stages.metrics.surface_areas.len(),
            "measurements": stages.metrics.measurements.len(),
            "request_bytes": stages.request.user_content.len(),
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

/// Dump the report text (summary plus narrative) next to the stage files
pub fn save_report_text(report: &AuditReport, output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let report_path = format!("{}/stage4_report.txt", output_dir);
    fs::write(&report_path, report.full_text())?;
    println!("  💾 {}", report_path);
    Ok(())
}

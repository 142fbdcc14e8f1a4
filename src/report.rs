//! Markdown rendering of a run's records.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use outreach_core::email::EmailRecord;

pub fn render_markdown(records: &[EmailRecord], threshold: f64, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated Stakeholder Emails\n");
    let _ = writeln!(out, "**Generated:** {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Total Emails:** {}\n", records.len());
    out.push_str("---\n\n");

    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(out, "## Email {}: {}\n", i + 1, record.stakeholder_name);
        let _ = writeln!(out, "**To:** {} ({})  ", record.stakeholder_name, record.stakeholder_title);
        let _ = writeln!(out, "**Subject:** {}  ", record.subject);
        let _ = writeln!(out, "**Generation Mode:** {}  ", record.generation_mode);
        let _ = writeln!(out, "**Quality Score:** {:.1}/10  ", record.quality_score);
        let _ = writeln!(out, "**Reflection Notes:** {}\n", record.reflection_notes);
        let _ = writeln!(out, "### Email Body\n\n{}\n", record.body);
        out.push_str("---\n\n");
    }

    out.push_str("## Summary\n\n");
    out.push_str("| # | Stakeholder | Title | Quality Score | Meets Threshold |\n");
    out.push_str("|---|-------------|-------|---------------|-----------------|\n");
    for (i, record) in records.iter().enumerate() {
        let mark = if record.meets(threshold) { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1} | {} |",
            i + 1,
            record.stakeholder_name,
            record.stakeholder_title,
            record.quality_score,
            mark
        );
    }
    out
}

pub fn write_markdown(path: &Path, records: &[EmailRecord], threshold: f64) -> Result<()> {
    let markdown = render_markdown(records, threshold, Local::now());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, markdown).with_context(|| format!("failed to write {}", path.display()))
}

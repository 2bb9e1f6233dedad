//! Completion report generation
//!
//! Every completed work item gets a skeleton report beside its document
//! (`item-NN_report.md`) capturing the timeline and leaving prompts for
//! the author to fill in. Generation is idempotent: an existing report
//! is never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::status::REPORT_SUFFIX;

/// Timeline fields pulled from the work item header.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub item: u32,
    pub title: String,
    pub created: Option<String>,
    pub started: Option<String>,
    pub completed: Option<String>,
    pub hours: Option<f64>,
}

/// Where the report for a document lives: beside it, named
/// `item-NN_report.md`.
pub fn report_path(doc_path: &Path, item: u32) -> PathBuf {
    let dir = doc_path.parent().unwrap_or(Path::new(""));
    dir.join(format!("item-{item:02}{REPORT_SUFFIX}"))
}

pub fn report_exists(doc_path: &Path, item: u32) -> bool {
    report_path(doc_path, item).exists()
}

/// Write the report skeleton. Returns the path, or `None` when a report
/// already exists and was left untouched.
pub fn generate_report(doc_path: &Path, ctx: &ReportContext) -> Result<Option<PathBuf>> {
    let path = report_path(doc_path, ctx.item);
    if path.exists() {
        return Ok(None);
    }
    fs::write(&path, render(ctx))
        .map_err(|e| Error::file_op(format!("writing report {}", path.display()), e))?;
    Ok(Some(path))
}

fn render(ctx: &ReportContext) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Work Item {} Report: {}\n\n", ctx.item, ctx.title));
    out.push_str(&format!("- Created: {}\n", field(&ctx.created)));
    out.push_str(&format!("- Started: {}\n", field(&ctx.started)));
    out.push_str(&format!("- Completed: {}\n", field(&ctx.completed)));
    match ctx.hours {
        Some(h) => out.push_str(&format!("- Hours: {h}\n")),
        None => out.push_str("- Hours: _not recorded_\n"),
    }
    out.push_str(
        "\n## What was delivered\n\n_Fill in._\n\n\
         ## What went well\n\n_Fill in._\n\n\
         ## What to change next time\n\n_Fill in._\n\n\
         ## Follow-up items\n\n- None recorded\n",
    );
    out
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("_unknown_")
}

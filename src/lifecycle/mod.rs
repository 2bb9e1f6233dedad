//! Lifecycle operations
//!
//! One module per operation, sharing the transaction plumbing here. Every
//! mutating operation follows the same shape: validate everything up
//! front, then (unless `--dry-run`) update the document header, perform
//! the planned renames, update the registry, and finally the task-state
//! store. Validation failures therefore always mean zero side effects.

pub mod abort;
pub mod advance;
pub mod archive;
pub mod block;
pub mod collection;
pub mod complete;
pub mod create;
pub mod init;
pub mod locate;
pub mod resume;
pub mod start;
pub mod status_cmd;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::backup::FileBackup;
use crate::parser::frontmatter;
use crate::status::{MovePlan, Status};

/// Shared invocation context: resolved project root plus the dry-run flag.
#[derive(Debug, Clone)]
pub struct OpContext {
    pub root: PathBuf,
    pub dry_run: bool,
}

/// YAML header of a work item document. Unknown keys are preserved by the
/// in-place frontmatter editor, so this struct only needs the keys the
/// lifecycle reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemHeader {
    pub item: u32,
    pub title: String,
    #[serde(default)]
    pub collection: Option<u32>,
    pub status: Status,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub blocked_at: Option<String>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub aborted_at: Option<String>,
    #[serde(default)]
    pub aborted_reason: Option<String>,
}

/// YAML header of a `_collection.md` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionHeader {
    pub collection: u32,
    pub title: String,
    pub status: Status,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
}

/// Current UTC timestamp in the header format.
pub fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Elapsed hours between two header timestamps, rounded to one decimal.
/// Returns `None` when either timestamp is absent or unparseable.
pub fn hours_between(started: Option<&str>, finished: &str) -> Option<f64> {
    let start = chrono::DateTime::parse_from_rfc3339(started?).ok()?;
    let end = chrono::DateTime::parse_from_rfc3339(finished).ok()?;
    let minutes = (end - start).num_minutes();
    if minutes < 0 {
        return None;
    }
    Some((minutes as f64 / 60.0 * 10.0).round() / 10.0)
}

/// Lowercase-hyphen slug for filenames: `Auth & Sessions` -> `auth-sessions`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn item_doc_name(item: u32, slug: &str) -> String {
    format!("item-{item:02}_{slug}.md")
}

pub fn collection_dir_name(collection: u32, slug: &str) -> String {
    format!("collection-{collection:02}_{slug}")
}

/// Parse a work item header out of its document.
pub fn read_item_header(path: &Path) -> Result<ItemHeader> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::file_op(format!("reading {}", path.display()), e))?;
    frontmatter::parse_from_markdown(&content, "work item header")
        .map_err(|e| Error::validation(format!("{}: {e:#}", path.display())))
}

pub fn read_collection_header(path: &Path) -> Result<CollectionHeader> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::file_op(format!("reading {}", path.display()), e))?;
    frontmatter::parse_from_markdown(&content, "collection header")
        .map_err(|e| Error::validation(format!("{}: {e:#}", path.display())))
}

/// Rewrite header keys in place, under a backup that restores the
/// original bytes when the write fails.
pub fn update_header(path: &Path, updates: &[(&str, serde_yaml::Value)]) -> Result<()> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::file_op(format!("reading {}", path.display()), e))?;
    let updated = frontmatter::update_frontmatter(&content, updates)
        .map_err(|e| Error::validation(format!("{}: {e}", path.display())))?;

    let backup = FileBackup::create(path)?;
    match fs::write(path, updated) {
        Ok(()) => backup.cleanup(),
        Err(write_err) => {
            backup.restore()?;
            Err(Error::file_op(format!("writing {}", path.display()), write_err))
        }
    }
}

/// Perform the renames of a move plan in order, creating destination
/// parent directories as needed.
pub fn apply_plan(plan: &MovePlan) -> Result<()> {
    for (from, to) in &plan.renames {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::file_op(format!("creating directory {}", parent.display()), e)
            })?;
        }
        fs::rename(from, to).map_err(|e| {
            Error::file_op(
                format!("renaming {} -> {}", from.display(), to.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Print the dry-run preview for a transition: the renames that would
/// happen and the header keys that would change.
pub fn preview_transition(plan: &MovePlan, header_updates: &[(&str, serde_yaml::Value)]) {
    println!("{}", "Dry run - no changes made".yellow().bold());
    if plan.renames.is_empty() {
        println!("  no renames required");
    }
    for (from, to) in &plan.renames {
        println!("  {} {} -> {}", "mv".cyan(), from.display(), to.display());
    }
    for (key, value) in header_updates {
        println!(
            "  {} {key}: {}",
            "set".cyan(),
            serde_yaml::to_string(value).unwrap_or_default().trim()
        );
    }
}

/// Validate that a status transition is legal, with a message naming the
/// legal alternatives.
pub fn check_transition(item: u32, current: Status, target: Status) -> Result<()> {
    if current.can_transition_to(target) {
        return Ok(());
    }
    let allowed: Vec<String> = current
        .valid_transitions()
        .iter()
        .map(|s| s.to_string())
        .collect();
    Err(Error::validation(format!(
        "work item {item} is {current}; cannot move to {target} (allowed: {})",
        if allowed.is_empty() {
            "none, terminal state".to_string()
        } else {
            allowed.join(", ")
        }
    )))
}

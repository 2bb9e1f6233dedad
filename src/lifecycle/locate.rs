//! Locating documents on disk by work item / collection number
//!
//! The filesystem is the source of truth, so lookups glob the status
//! directories rather than trusting registry paths. An item found in two
//! places at once is a corruption signal and errors out with both paths.

use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::{Error, Result};
use crate::project;
use crate::status::{DIR_DONE, REPORT_SUFFIX, STANDALONE_DIR};

/// Find the document for work item `id` anywhere under `work/`.
pub fn find_item_doc(root: &Path, id: u32) -> Result<PathBuf> {
    let work = project::work_dir(root);
    let stem = format!("item-{id:02}_");

    let patterns = [
        // Standalone, directly in a status directory (flat or nested).
        format!("{}/*/{stem}*.md", work.display()),
        format!("{}/*/{stem}*/{stem}*.md", work.display()),
        // Collection children (flat or nested).
        format!("{}/*/collection-*/{stem}*.md", work.display()),
        format!("{}/*/collection-*/{stem}*/{stem}*.md", work.display()),
        // Finished standalone items under 3-done/_standalone/.
        format!("{}/{DIR_DONE}/{STANDALONE_DIR}/{stem}*.md", work.display()),
        format!(
            "{}/{DIR_DONE}/{STANDALONE_DIR}/{stem}*/{stem}*.md",
            work.display()
        ),
    ];

    let mut matches: Vec<PathBuf> = Vec::new();
    for pattern in &patterns {
        let paths = glob(pattern)
            .map_err(|e| Error::validation(format!("bad glob pattern {pattern}: {e}")))?;
        for path in paths.flatten() {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if name.ends_with(REPORT_SUFFIX) {
                continue;
            }
            if !matches.contains(&path) {
                matches.push(path);
            }
        }
    }

    match matches.len() {
        0 => Err(Error::not_found(format!(
            "work item {id} not found under {}",
            work.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => {
            let listed: Vec<String> = matches.iter().map(|p| p.display().to_string()).collect();
            Err(Error::validation(format!(
                "work item {id} found in multiple locations: {}",
                listed.join(", ")
            )))
        }
    }
}

/// Find the directory for collection `id` in whichever status directory
/// holds it.
pub fn find_collection_dir(root: &Path, id: u32) -> Result<PathBuf> {
    let work = project::work_dir(root);
    let pattern = format!("{}/*/collection-{id:02}_*", work.display());

    let mut matches: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| Error::validation(format!("bad glob pattern {pattern}: {e}")))?
        .flatten()
        .filter(|p| p.is_dir())
        .collect();

    match matches.len() {
        0 => Err(Error::not_found(format!(
            "collection {id} not found under {}",
            work.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => {
            let listed: Vec<String> = matches.iter().map(|p| p.display().to_string()).collect();
            Err(Error::validation(format!(
                "collection {id} found in multiple locations: {}",
                listed.join(", ")
            )))
        }
    }
}

/// Every collection directory under `work/`, across all statuses.
pub fn list_collection_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let work = project::work_dir(root);
    let pattern = format!("{}/*/collection-*", work.display());
    let mut dirs: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| Error::validation(format!("bad glob pattern {pattern}: {e}")))?
        .flatten()
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

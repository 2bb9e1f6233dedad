//! Parent-collection completion detection
//!
//! A collection is complete when every child work item has reached a
//! finished status (`done` or `aborted`), read straight off the
//! filesystem encoding. The registry is never consulted here: the
//! directory tree is the source of truth, and this module is how the
//! lifecycle operations (and `collection status`) interrogate it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::status::{self, Status, COLLECTION_DOC, ITEM_PREFIX, REPORT_SUFFIX};

/// One child work item as found on disk.
#[derive(Debug, Clone)]
pub struct ChildState {
    pub name: String,
    pub path: PathBuf,
    pub status: Option<Status>,
    /// Set when the child's name carries an unrecognized `--` marker.
    /// Such a child never counts as finished.
    pub malformed: Option<String>,
}

impl ChildState {
    pub fn is_finished(&self) -> bool {
        self.status.map(|s| s.is_finished()).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub collection_dir: PathBuf,
    pub children: Vec<ChildState>,
}

impl CompletionReport {
    /// True when every child is finished. A collection with no children
    /// is never complete - an empty directory says nothing was done.
    pub fn is_complete(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|c| c.is_finished())
    }

    pub fn finished_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_finished()).count()
    }

    pub fn unfinished(&self) -> impl Iterator<Item = &ChildState> {
        self.children.iter().filter(|c| !c.is_finished())
    }

    /// Multi-line human-readable summary, one child per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Collection {}: {}/{} children finished\n",
            self.collection_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?"),
            self.finished_count(),
            self.children.len()
        ));
        for child in &self.children {
            let state = match (&child.malformed, child.status) {
                (Some(marker), _) => format!("MALFORMED ({marker})"),
                (None, Some(s)) => s.to_string(),
                (None, None) => "unknown".to_string(),
            };
            let mark = if child.is_finished() { "x" } else { " " };
            out.push_str(&format!("  [{mark}] {:<40} {state}\n", child.name));
        }
        if self.children.is_empty() {
            out.push_str("  (no child work items)\n");
        }
        out
    }
}

/// Scan a collection directory and classify every child work item.
///
/// Children are item documents (`item-NN_*.md`) and nested item
/// subdirectories (`item-NN_*/`); `_collection.md` and `*_report.md`
/// companions are not children. Scanning never fails on a single bad
/// name: a malformed suffix is recorded on the child and leaves it
/// unfinished rather than aborting the whole report.
pub fn scan_collection(collection_dir: &Path) -> Result<CompletionReport> {
    if !collection_dir.is_dir() {
        return Err(Error::not_found(format!(
            "collection directory {} does not exist",
            collection_dir.display()
        )));
    }

    let mut children = Vec::new();
    let entries = fs::read_dir(collection_dir).map_err(|e| {
        Error::file_op(
            format!("reading collection directory {}", collection_dir.display()),
            anyhow::Error::from(e),
        )
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::file_op(
                format!("reading collection directory {}", collection_dir.display()),
                anyhow::Error::from(e),
            )
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        if !name.starts_with(ITEM_PREFIX) {
            continue;
        }
        if name == COLLECTION_DOC || name.ends_with(REPORT_SUFFIX) {
            continue;
        }

        // A nested child is classified by its document inside the
        // subdirectory; the directory suffix still participates via decode.
        let doc = if path.is_dir() {
            match item_doc_in(&path)? {
                Some(doc) => doc,
                // Subdirectory without a document: classify by the
                // directory name itself.
                None => path.clone(),
            }
        } else if name.ends_with(".md") {
            path.clone()
        } else {
            continue;
        };

        let child = match status::decode(&doc) {
            Ok(decoded) => ChildState {
                name,
                path,
                status: Some(decoded.status),
                malformed: None,
            },
            Err(err) => ChildState {
                name,
                path,
                status: None,
                malformed: Some(err.to_string()),
            },
        };
        children.push(child);
    }

    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(CompletionReport {
        collection_dir: collection_dir.to_path_buf(),
        children,
    })
}

/// Find the item document inside a nested item subdirectory: the `.md`
/// file whose name starts with `item-`, preferring one matching the
/// directory's own stem.
fn item_doc_in(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::file_op(
            format!("reading item directory {}", dir.display()),
            anyhow::Error::from(e),
        )
    })?;
    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with(ITEM_PREFIX) && name.ends_with(".md")
                && !name.ends_with(REPORT_SUFFIX)
            {
                candidates.push(path);
            }
        }
    }
    candidates.sort();
    let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let preferred = candidates.iter().find(|p| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s == dir_name)
            .unwrap_or(false)
    });
    Ok(preferred.cloned().or_else(|| candidates.first().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collection(files: &[&str], dirs: &[(&str, &[&str])]) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let cdir = temp
            .path()
            .join("work/2-in-progress/collection-01_users");
        fs::create_dir_all(&cdir).unwrap();
        fs::write(cdir.join(COLLECTION_DOC), "---\ncollection: 1\n---\n").unwrap();
        for f in files {
            fs::write(cdir.join(f), "---\nitem: 0\n---\n").unwrap();
        }
        for (d, inner) in dirs {
            let sub = cdir.join(d);
            fs::create_dir_all(&sub).unwrap();
            for f in *inner {
                fs::write(sub.join(f), "---\nitem: 0\n---\n").unwrap();
            }
        }
        (temp, cdir)
    }

    #[test]
    fn all_children_finished_is_complete() {
        let (_t, cdir) = collection(
            &["item-01_a--done.md", "item-02_b--aborted.md"],
            &[],
        );
        let report = scan_collection(&cdir).unwrap();
        assert_eq!(report.children.len(), 2);
        assert!(report.is_complete());
    }

    #[test]
    fn unfinished_child_blocks_completion() {
        let (_t, cdir) = collection(&["item-01_a--done.md", "item-02_b.md"], &[]);
        let report = scan_collection(&cdir).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.finished_count(), 1);
        let unfinished: Vec<_> = report.unfinished().map(|c| c.name.clone()).collect();
        assert_eq!(unfinished, ["item-02_b.md"]);
    }

    #[test]
    fn blocked_child_is_not_finished() {
        let (_t, cdir) = collection(&["item-01_a--done.md", "item-02_b--blocked.md"], &[]);
        let report = scan_collection(&cdir).unwrap();
        assert!(!report.is_complete());
    }

    #[test]
    fn empty_collection_is_never_complete() {
        let (_t, cdir) = collection(&[], &[]);
        let report = scan_collection(&cdir).unwrap();
        assert!(report.children.is_empty());
        assert!(!report.is_complete());
    }

    #[test]
    fn malformed_suffix_counts_as_unfinished() {
        let (_t, cdir) = collection(&["item-01_a--done.md", "item-02_b--frozen.md"], &[]);
        let report = scan_collection(&cdir).unwrap();
        assert!(!report.is_complete());
        let bad = report
            .children
            .iter()
            .find(|c| c.name == "item-02_b--frozen.md")
            .unwrap();
        assert!(bad.malformed.is_some());
        assert!(!bad.is_finished());
    }

    #[test]
    fn nested_subdirectory_child_is_classified() {
        let (_t, cdir) = collection(
            &["item-01_a--done.md"],
            &[("item-02_b--done", &["item-02_b--done.md", "notes.md"])],
        );
        let report = scan_collection(&cdir).unwrap();
        assert_eq!(report.children.len(), 2);
        assert!(report.is_complete());
    }

    #[test]
    fn companion_files_are_not_children() {
        let (_t, cdir) = collection(&["item-01_a--done.md", "item-01_report.md"], &[]);
        let report = scan_collection(&cdir).unwrap();
        assert_eq!(report.children.len(), 1);
        assert!(report.is_complete());
    }

    #[test]
    fn render_lists_every_child() {
        let (_t, cdir) = collection(&["item-01_a--done.md", "item-02_b.md"], &[]);
        let report = scan_collection(&cdir).unwrap();
        let rendered = report.render();
        assert!(rendered.contains("1/2 children finished"));
        assert!(rendered.contains("[x] item-01_a--done.md"));
        assert!(rendered.contains("[ ] item-02_b.md"));
    }
}

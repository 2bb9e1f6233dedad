//! Project root resolution and path layout
//!
//! A cadence project is any directory containing a `.cadence/` marker.
//! The root is resolved exactly once at process entry (or taken from the
//! `--project` flag) and threaded through every call as an explicit
//! parameter; nothing below this module walks the filesystem upwards.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Error, Result};
use crate::status::STATUS_DIRS;

/// Marker directory that identifies a project root.
pub const MARKER_DIR: &str = ".cadence";
/// Directory holding the status tree and the registry.
pub const WORK_DIR: &str = "work";
/// Registry document filename.
pub const REGISTRY_FILE: &str = "registry.json";
/// Atomic task-state document filename.
pub const STATE_FILE: &str = "task-state.json";
/// Single-writer lock filename.
pub const LOCK_FILE: &str = "cadence.lock";
/// Optional workflow override filename.
pub const WORKFLOW_FILE: &str = "workflow.json";

/// Resolve the project root: an explicit path wins, otherwise walk up from
/// the current directory looking for the `.cadence/` marker.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = path
            .canonicalize()
            .map_err(|e| Error::file_op(format!("resolving --project {}", path.display()), e))?;
        if !path.join(MARKER_DIR).is_dir() {
            return Err(Error::validation(format!(
                "{} is not a cadence project (missing {MARKER_DIR}/). Run `cadence init` first.",
                path.display()
            )));
        }
        return Ok(path);
    }

    let cwd =
        std::env::current_dir().map_err(|e| Error::file_op("reading current directory", e))?;
    find_root_from(&cwd).ok_or_else(|| {
        Error::validation(format!(
            "could not find a cadence project above {} (no {MARKER_DIR}/ marker). \
             Run `cadence init` or pass --project.",
            cwd.display()
        ))
    })
}

/// Walk up from `start` to the first directory containing the marker.
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(MARKER_DIR).is_dir() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

pub fn work_dir(root: &Path) -> PathBuf {
    root.join(WORK_DIR)
}

pub fn registry_path(root: &Path) -> PathBuf {
    root.join(WORK_DIR).join(REGISTRY_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(MARKER_DIR).join(STATE_FILE)
}

pub fn workflow_override_path(root: &Path) -> PathBuf {
    root.join(MARKER_DIR).join(WORKFLOW_FILE)
}

/// Create any missing status directories under `work/`.
pub fn ensure_status_dirs(root: &Path) -> Result<()> {
    for dir in STATUS_DIRS {
        let path = work_dir(root).join(dir);
        fs::create_dir_all(&path)
            .map_err(|e| Error::file_op(format!("creating {}", path.display()), e))?;
    }
    Ok(())
}

/// Exclusive process lock making the single-writer assumption explicit.
///
/// Registry counter increments and directory renames are not safe against
/// concurrent cadence processes, so every mutating operation takes this
/// lock at entry and holds it until the process exits. The lock is
/// advisory; readers (`status`, `list`) do not take it.
pub struct ProjectLock {
    _file: File,
}

impl ProjectLock {
    pub fn acquire(root: &Path) -> Result<ProjectLock> {
        let lock_path = root.join(MARKER_DIR).join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::file_op(format!("opening lock file {}", lock_path.display()), e))?;
        file.try_lock_exclusive().map_err(|_| {
            Error::validation(
                "another cadence process is already operating on this project \
                 (lock held on .cadence/cadence.lock)",
            )
        })?;
        Ok(ProjectLock { _file: file })
    }
}

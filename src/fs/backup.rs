//! Copy-before-write backup for single-file mutations
//!
//! Wraps a file mutation in backup / cleanup-on-success / restore-on-failure
//! semantics. A leftover `.bak` file on disk means a previous operation was
//! interrupted between backup and cleanup; callers should surface it rather
//! than silently overwrite.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Suffix appended to the original filename for the backup copy.
const BACKUP_SUFFIX: &str = ".bak";

/// Handle to a backup copy created before mutating a file.
///
/// Exactly one of [`FileBackup::cleanup`] or [`FileBackup::restore`] must be
/// called; dropping the handle leaves the backup file in place as evidence
/// of an interrupted operation.
#[derive(Debug)]
pub struct FileBackup {
    original: PathBuf,
    backup: PathBuf,
}

impl FileBackup {
    /// Copy `path` aside before mutation.
    pub fn create(path: &Path) -> Result<FileBackup> {
        let backup = backup_path(path);
        fs::copy(path, &backup)
            .map_err(|e| Error::file_op(format!("backing up {}", path.display()), e))?;
        Ok(FileBackup {
            original: path.to_path_buf(),
            backup,
        })
    }

    /// Delete the backup after the caller's write succeeded.
    pub fn cleanup(self) -> Result<()> {
        if self.backup.exists() {
            fs::remove_file(&self.backup).map_err(|e| {
                Error::file_op(format!("removing backup {}", self.backup.display()), e)
            })?;
        }
        Ok(())
    }

    /// Move the backup back over the original after a failed write.
    pub fn restore(self) -> Result<()> {
        fs::rename(&self.backup, &self.original).map_err(|e| {
            Error::file_op(
                format!(
                    "restoring {} from {}",
                    self.original.display(),
                    self.backup.display()
                ),
                e,
            )
        })
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

//! File locking utilities for safe concurrent access
//!
//! Provides locked read and atomic write operations using `fs2` advisory
//! locks so that multiple processes sharing the task-state document never
//! observe a torn read or corrupt the file with an interleaved write.
//!
//! Advisory locks are cooperative - all participants must use these
//! functions for the locking to be effective.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Read file contents with a shared (read) lock.
///
/// Acquires a shared lock before reading, allowing multiple concurrent
/// readers but blocking while an exclusive (write) lock is held.
pub fn locked_read(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to acquire shared lock: {}", path.display()))?;
    let mut content = String::new();
    BufReader::new(&file)
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(content)
}

/// Write file contents atomically: stage to a sibling temporary file under
/// an exclusive lock, then rename over the target.
///
/// The rename is the only mutation of the real path, so a failed write
/// (disk full, crash) leaves the previous document untouched and no reader
/// ever observes a partially-written file.
pub fn atomic_locked_write(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("No parent directory for: {}", path.display()))?;
    let mut temp = NamedTempFile::with_prefix_in(".staged-", dir)
        .with_context(|| format!("Failed to create temp file in: {}", dir.display()))?;
    temp.as_file()
        .lock_exclusive()
        .with_context(|| format!("Failed to acquire exclusive lock: {}", path.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write staged content for: {}", path.display()))?;
    temp.flush()
        .with_context(|| format!("Failed to flush staged content for: {}", path.display()))?;
    // Atomic promotion; the lock releases when the handle drops.
    temp.persist(path)
        .with_context(|| format!("Failed to promote staged file to: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_and_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state.json");

        atomic_locked_write(&path, "hello world").unwrap();
        let content = locked_read(&path).unwrap();
        assert_eq!(content, "hello world");
    }

    #[test]
    fn test_write_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state.json");

        atomic_locked_write(&path, "first content").unwrap();
        atomic_locked_write(&path, "second").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "second");
    }

    #[test]
    fn test_no_staging_residue() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state.json");

        atomic_locked_write(&path, "content").unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staged-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_concurrent_write_safety() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state-concurrent.json");

        atomic_locked_write(&path, "initial").unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let path = path.clone();
                thread::spawn(move || {
                    let content = format!("content from thread {i}");
                    atomic_locked_write(&path, &content).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let final_content = locked_read(&path).unwrap();
        assert!(final_content.starts_with("content from thread"));
    }

    #[test]
    fn test_concurrent_read_write() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state-rw.json");

        atomic_locked_write(&path, "initial content").unwrap();

        let read_path = path.clone();
        let read_handle = thread::spawn(move || {
            for _ in 0..50 {
                // Readers must always see a complete document.
                if let Ok(content) = locked_read(&read_path) {
                    assert!(!content.is_empty());
                }
            }
        });

        let write_path = path.clone();
        let write_handle = thread::spawn(move || {
            for i in 0..50 {
                atomic_locked_write(&write_path, &format!("write {i}")).unwrap();
            }
        });

        read_handle.join().unwrap();
        write_handle.join().unwrap();

        let final_content = locked_read(&path).unwrap();
        assert!(final_content.starts_with("write "));
    }
}

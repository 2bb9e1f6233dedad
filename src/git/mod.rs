//! Git command runner
//!
//! Centralized wrappers around `git` subprocesses with consistent error
//! handling. Network-touching commands (push) run under a timeout so a
//! hung remote never wedges a lifecycle operation.

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::{Error, Result};

/// Maximum time a push is allowed to take before we give up on it.
const PUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// Run a git command and return the raw Output.
pub fn run_git(args: &[&str], repo_root: &Path) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .map_err(|e| Error::external(format!("git {}", args.join(" ")), e.to_string()))
}

/// Run a git command, check for success, and return stdout trimmed.
pub fn run_git_checked(args: &[&str], repo_root: &Path) -> Result<String> {
    let output = run_git(args, repo_root)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::external(
            format!("git {}", args.join(" ")),
            stderr,
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a git command and return true if exit code is 0. Spawn failures
/// count as false; use for existence checks only.
pub fn run_git_bool(args: &[&str], repo_root: &Path) -> bool {
    run_git(args, repo_root)
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Whether `root` is inside a git work tree at all.
pub fn is_repo(root: &Path) -> bool {
    run_git_bool(&["rev-parse", "--is-inside-work-tree"], root)
}

/// Whether the working tree has staged or unstaged changes.
pub fn has_uncommitted_changes(root: &Path) -> Result<bool> {
    let status = run_git_checked(&["status", "--porcelain"], root)?;
    Ok(!status.is_empty())
}

/// Stage everything and commit. Fails if there is nothing to commit.
pub fn commit_all(root: &Path, message: &str) -> Result<()> {
    run_git_checked(&["add", "-A"], root)?;
    run_git_checked(&["commit", "-m", message], root)?;
    Ok(())
}

pub fn tag_exists(root: &Path, tag: &str) -> bool {
    run_git_bool(&["rev-parse", "--verify", &format!("refs/tags/{tag}")], root)
}

/// Create an annotated tag at HEAD.
pub fn create_tag(root: &Path, tag: &str, message: &str) -> Result<()> {
    run_git_checked(&["tag", "-a", tag, "-m", message], root)?;
    Ok(())
}

/// Push a tag to `origin`, bounded by [`PUSH_TIMEOUT`].
pub fn push_tag(root: &Path, tag: &str) -> Result<()> {
    push_with_timeout(root, &["push", "origin", tag])
}

fn push_with_timeout(root: &Path, args: &[&str]) -> Result<()> {
    let command = format!("git {}", args.join(" "));
    let mut child = Command::new("git")
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::external(command.clone(), e.to_string()))?;

    match child
        .wait_timeout(PUSH_TIMEOUT)
        .map_err(|e| Error::external(command.clone(), e.to_string()))?
    {
        Some(status) if status.success() => Ok(()),
        Some(status) => {
            let stderr = child
                .stderr
                .take()
                .and_then(|mut s| {
                    use std::io::Read;
                    let mut buf = String::new();
                    s.read_to_string(&mut buf).ok().map(|_| buf)
                })
                .unwrap_or_default();
            Err(Error::external(
                command,
                format!("exit {}: {}", status.code().unwrap_or(-1), stderr.trim()),
            ))
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(Error::external(
                command,
                format!("timed out after {}s", PUSH_TIMEOUT.as_secs()),
            ))
        }
    }
}

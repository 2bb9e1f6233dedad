//! Shared test helpers for lifecycle integration tests

use std::process::Command;
use tempfile::TempDir;

use cadence::lifecycle::{complete, init, OpContext};

/// Scaffold a cadence project in a temp directory.
pub fn init_project() -> (TempDir, OpContext) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    init::run(temp.path(), false).expect("Failed to init project");
    let ctx = OpContext {
        root: temp.path().to_path_buf(),
        dry_run: false,
    };
    (temp, ctx)
}

/// Scaffold a cadence project that is also a git repository with one
/// commit, so completion with tagging can run.
pub fn init_project_with_repo() -> (TempDir, OpContext) {
    let (temp, ctx) = init_project();
    let root = temp.path();

    git(root, &["init", "-q"]);
    git(root, &["config", "user.email", "test@test.com"]);
    git(root, &["config", "user.name", "Test User"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "Initial commit"]);

    (temp, ctx)
}

pub fn git(root: &std::path::Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn no_tag() -> complete::CompleteOpts {
    complete::CompleteOpts { no_tag: true }
}

pub fn with_tag() -> complete::CompleteOpts {
    complete::CompleteOpts { no_tag: false }
}

//! Completion's git stage: clean-tree gate, tagging, push degradation

use std::process::Command;

use cadence::git;
use cadence::lifecycle::{complete, create, start};
use cadence::project;
use cadence::status::Status;

use super::helpers::*;

fn tags(root: &std::path::Path) -> Vec<String> {
    let output = Command::new("git")
        .args(["tag", "-l"])
        .current_dir(root)
        .output()
        .expect("Failed to run git tag");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn clean_tree_completion_creates_an_annotated_tag() {
    let (temp, ctx) = init_project_with_repo();
    let root = temp.path();

    let id = create::item(&ctx, "Ship it", None, None).unwrap();
    start::run(&ctx, id).unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "Start work item 1"]);

    // No origin remote: the push stage fails, but completion still
    // succeeds because everything internal is already consistent.
    complete::run(&ctx, id, &with_tag()).unwrap();

    assert_eq!(tags(root), ["item-1"]);
    assert!(git::tag_exists(root, "item-1"));
    assert!(project::work_dir(root)
        .join("3-done/_standalone/item-01_ship-it--done.md")
        .exists());

    // The completion commit includes the renamed document and registry.
    assert!(!git::has_uncommitted_changes(root).unwrap());
}

#[test]
fn dirty_tree_blocks_before_any_mutation() {
    let (temp, ctx) = init_project_with_repo();
    let root = temp.path();

    let id = create::item(&ctx, "Ship it", None, None).unwrap();
    start::run(&ctx, id).unwrap();
    // Item files are uncommitted, so the tree is dirty.

    let err = complete::run(&ctx, id, &with_tag()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("uncommitted"));

    // Gate fires before the transaction: the document never moved.
    let doc = project::work_dir(root).join("2-in-progress/item-01_ship-it.md");
    assert!(doc.exists());
    assert_eq!(cadence::status::decode(&doc).unwrap().status, Status::InProgress);
    assert!(tags(root).is_empty());
}

#[test]
fn no_tag_skips_the_git_stage_entirely() {
    let (temp, ctx) = init_project_with_repo();
    let root = temp.path();

    let id = create::item(&ctx, "Quiet one", None, None).unwrap();
    start::run(&ctx, id).unwrap();

    // Dirty tree is fine with --no-tag; git is never consulted.
    complete::run(&ctx, id, &no_tag()).unwrap();
    assert!(tags(root).is_empty());
    assert!(git::has_uncommitted_changes(root).unwrap());
}

#[test]
fn existing_tag_is_left_alone() {
    let (temp, ctx) = init_project_with_repo();
    let root = temp.path();

    let id = create::item(&ctx, "Redo", None, None).unwrap();
    start::run(&ctx, id).unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "Start work item 1"]);
    git(root, &["tag", "-a", "item-1", "-m", "placeholder"]);

    // Completion warns about the collision instead of failing or
    // recreating the tag.
    complete::run(&ctx, id, &with_tag()).unwrap();
    assert_eq!(tags(root), ["item-1"]);
}

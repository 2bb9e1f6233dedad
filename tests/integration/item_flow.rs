//! End-to-end lifecycle of standalone work items

use cadence::error::Error;
use cadence::lifecycle::{abort, advance, archive, block, complete, create, resume, start};
use cadence::project;
use cadence::registry;
use cadence::state;
use cadence::status::Status;

use super::helpers::*;

#[test]
fn full_lifecycle_create_start_complete_archive() {
    let (temp, ctx) = init_project();
    let root = temp.path();

    let id = create::item(&ctx, "Add user auth", None, Some(8.0)).unwrap();
    assert_eq!(id, 1);
    let todo_doc = project::work_dir(root).join("1-todo/item-01_add-user-auth.md");
    assert!(todo_doc.exists());

    let reg = registry::load(root).unwrap();
    assert_eq!(reg.work_item(id).unwrap().status, Status::Todo);
    assert_eq!(
        reg.work_item(id).unwrap().metadata.get("estimate"),
        Some(&serde_json::json!(8.0))
    );

    start::run(&ctx, id).unwrap();
    assert!(!todo_doc.exists());
    let wip_doc = project::work_dir(root).join("2-in-progress/item-01_add-user-auth.md");
    assert!(wip_doc.exists());

    let task = state::get_task(root, "1").unwrap();
    assert_eq!(task.pipeline, "workflow");
    assert_eq!(task.status, state::TASK_IN_PROGRESS);
    assert_eq!(task.current_step, "1.1");

    complete::run(&ctx, id, &no_tag()).unwrap();
    let done_doc =
        project::work_dir(root).join("3-done/_standalone/item-01_add-user-auth--done.md");
    assert!(done_doc.exists());
    assert!(project::work_dir(root)
        .join("3-done/_standalone/item-01_report.md")
        .exists());

    let reg = registry::load(root).unwrap();
    let entry = reg.work_item(id).unwrap();
    assert_eq!(entry.status, Status::Done);
    assert!(entry.completed.is_some());
    assert!(entry.hours.is_some());

    archive::run(&ctx, id).unwrap();
    assert!(project::work_dir(root)
        .join("6-archived/item-01_add-user-auth.md")
        .exists());
    assert!(state::get_task(root, "1").is_none());
}

#[test]
fn double_complete_is_a_validation_error() {
    let (_temp, ctx) = init_project();
    let id = create::item(&ctx, "One shot", None, None).unwrap();
    start::run(&ctx, id).unwrap();
    complete::run(&ctx, id, &no_tag()).unwrap();

    let err = complete::run(&ctx, id, &no_tag()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn abort_of_never_started_item_names_the_precondition() {
    let (_temp, ctx) = init_project();
    let id = create::item(&ctx, "Never ran", None, None).unwrap();

    let err = abort::run(&ctx, id, "changed priorities").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn block_then_resume_roundtrips_the_filename() {
    let (temp, ctx) = init_project();
    let root = temp.path();
    let id = create::item(&ctx, "Flaky dep", None, None).unwrap();
    start::run(&ctx, id).unwrap();

    block::run(&ctx, id, Some("upstream outage")).unwrap();
    assert!(project::work_dir(root)
        .join("2-in-progress/item-01_flaky-dep--blocked.md")
        .exists());
    assert_eq!(
        state::get_task(root, "1").unwrap().status,
        state::TASK_BLOCKED
    );

    resume::run(&ctx, id).unwrap();
    assert!(project::work_dir(root)
        .join("2-in-progress/item-01_flaky-dep.md")
        .exists());
    assert_eq!(
        state::get_task(root, "1").unwrap().status,
        state::TASK_IN_PROGRESS
    );
}

#[test]
fn advance_through_all_steps_then_complete() {
    let (temp, ctx) = init_project();
    let root = temp.path();
    let id = create::item(&ctx, "Stepper", None, None).unwrap();
    start::run(&ctx, id).unwrap();

    // 1.1 Scope, 1.2 Design (contract artifact), 2.1, 2.2, 3.1, 3.2
    for _ in 0..6 {
        advance::run(&ctx, id).unwrap();
    }
    let task = state::get_task(root, "1").unwrap();
    assert_eq!(task.completed_steps.len(), 6);
    assert_eq!(task.current_phase, 3);

    // The design step nested the item into its own subdirectory.
    let dir = project::work_dir(root).join("2-in-progress/item-01_stepper");
    assert!(dir.join("item-01_stepper.md").exists());
    assert!(dir.join("contract.md").exists());

    // Nested completion renames directory first, then file.
    complete::run(&ctx, id, &no_tag()).unwrap();
    let done_dir = project::work_dir(root).join("3-done/_standalone/item-01_stepper--done");
    assert!(done_dir.join("item-01_stepper--done.md").exists());
    assert!(done_dir.join("contract.md").exists());
    assert!(done_dir.join("item-01_report.md").exists());
}

#[test]
fn dry_run_previews_without_side_effects() {
    let (temp, ctx) = init_project();
    let root = temp.path();
    let id = create::item(&ctx, "Careful", None, None).unwrap();

    let dry = cadence::lifecycle::OpContext {
        root: root.to_path_buf(),
        dry_run: true,
    };
    start::run(&dry, id).unwrap();

    assert!(project::work_dir(root).join("1-todo/item-01_careful.md").exists());
    assert!(state::get_task(root, "1").is_none());
    let reg = registry::load(root).unwrap();
    assert_eq!(reg.work_item(id).unwrap().status, Status::Todo);
}

#[test]
fn registry_and_header_never_leave_backup_residue() {
    let (temp, ctx) = init_project();
    let root = temp.path();
    let id = create::item(&ctx, "Tidy", None, None).unwrap();
    start::run(&ctx, id).unwrap();
    complete::run(&ctx, id, &no_tag()).unwrap();

    let mut leftovers = Vec::new();
    for entry in walkdir(root) {
        if entry.to_string_lossy().ends_with(".bak") {
            leftovers.push(entry);
        }
    }
    assert!(leftovers.is_empty(), "stray backups: {leftovers:?}");
}

fn walkdir(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
    }
    out
}

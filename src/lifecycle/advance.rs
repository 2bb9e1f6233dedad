//! `cadence item advance` - complete the current workflow step
//!
//! Advancing records the step in the task-state store and moves the
//! pointer to the next step. A step that produces an artifact converts a
//! flat document into the nested layout (the item moves into its own
//! subdirectory) so the artifact can live beside it.

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use super::{locate, now, OpContext};
use crate::error::{Error, Result};
use crate::state::{self, CompletedStep, TASK_IN_PROGRESS};
use crate::status;
use crate::workflow::{Step, Workflow};

pub fn run(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    if decoded.status != status::Status::InProgress {
        return Err(Error::validation(format!(
            "work item {id} is {}; only in_progress items advance through workflow steps",
            decoded.status
        )));
    }

    let mut task = state::get_task(&ctx.root, &id.to_string()).ok_or_else(|| {
        Error::not_found(format!(
            "no workflow record for work item {id}; was it started with `cadence item start`?"
        ))
    })?;
    if task.status != TASK_IN_PROGRESS {
        return Err(Error::validation(format!(
            "workflow record for work item {id} is {}, not in_progress",
            task.status
        )));
    }

    let workflow = Workflow::load(&ctx.root)?;
    let current = workflow
        .find_step(&task.current_step)
        .ok_or_else(|| {
            Error::validation(format!(
                "step `{}` not found in workflow definition",
                task.current_step
            ))
        })?
        .clone();
    if task.completed_steps.iter().any(|s| s.step == current.step) {
        return Err(Error::validation(format!(
            "all workflow steps already completed for work item {id}; \
             run `cadence item complete {id}`"
        )));
    }
    let next = workflow.next_step(&current.step)?.cloned();

    if ctx.dry_run {
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!("  would complete step {} ({})", current.step, current.name);
        if let Some(artifact) = &current.artifact {
            println!("  would create artifact {artifact}.md beside the document");
        }
        match &next {
            Some(step) => println!("  would move to step {} ({})", step.step, step.name),
            None => println!("  final step; item is ready for `cadence item complete {id}`"),
        }
        return Ok(());
    }

    if let Some(artifact) = &current.artifact {
        let path = write_artifact(&doc, decoded.nested, artifact, id, &current)?;
        println!("  artifact: {}", path.display());
    }

    task.completed_steps.push(CompletedStep {
        step: current.step.clone(),
        completed_at: now(),
    });
    if let Some(step) = &next {
        task.current_step = step.step.clone();
        task.current_phase = state::phase_of(&step.step);
    }
    state::upsert_task(&ctx.root, task)?;

    match next {
        Some(step) => println!(
            "{} step {} done; now at {} ({})",
            "ok".green(),
            current.step,
            step.step,
            step.name
        ),
        None => println!(
            "{} step {} done; all steps complete, run `cadence item complete {id}`",
            "ok".green(),
            current.step
        ),
    }
    Ok(())
}

/// Write the step artifact beside the document, nesting the item into its
/// own subdirectory first when it is still a flat file.
fn write_artifact(
    doc: &Path,
    nested: bool,
    artifact: &str,
    id: u32,
    step: &Step,
) -> Result<PathBuf> {
    let doc_dir = if nested {
        doc.parent()
            .ok_or_else(|| Error::validation(format!("{} has no parent", doc.display())))?
            .to_path_buf()
    } else {
        // item-05_auth.md -> item-05_auth/item-05_auth.md
        let stem = doc
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::validation(format!("{} has no stem", doc.display())))?;
        let dir = doc.with_file_name(stem);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::file_op(format!("creating {}", dir.display()), e))?;
        let inner = dir.join(doc.file_name().unwrap_or_default());
        fs::rename(doc, &inner).map_err(|e| {
            Error::file_op(
                format!("nesting {} into {}", doc.display(), dir.display()),
                e,
            )
        })?;
        dir
    };

    let path = doc_dir.join(format!("{artifact}.md"));
    if !path.exists() {
        let content = format!(
            "# {} for work item {id}\n\nProduced by workflow step {} ({}).\n",
            capitalize(artifact),
            step.step,
            step.name
        );
        fs::write(&path, content)
            .map_err(|e| Error::file_op(format!("writing artifact {}", path.display()), e))?;
    }
    Ok(path)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{create, init, start};
    use super::*;
    use crate::project;
    use tempfile::TempDir;

    fn setup() -> (TempDir, OpContext) {
        let temp = TempDir::new().unwrap();
        init::run(temp.path(), false).unwrap();
        let ctx = OpContext {
            root: temp.path().to_path_buf(),
            dry_run: false,
        };
        (temp, ctx)
    }

    #[test]
    fn advance_walks_steps_and_records_them() {
        let (temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        start::run(&ctx, id).unwrap();

        run(&ctx, id).unwrap(); // 1.1 -> 1.2
        let task = state::get_task(temp.path(), "1").unwrap();
        assert_eq!(task.current_step, "1.2");
        assert_eq!(task.completed_steps.len(), 1);
        assert_eq!(task.completed_steps[0].step, "1.1");

        run(&ctx, id).unwrap(); // 1.2 -> 2.1, design artifact
        let task = state::get_task(temp.path(), "1").unwrap();
        assert_eq!(task.current_step, "2.1");
        assert_eq!(task.current_phase, 2);
    }

    #[test]
    fn artifact_step_nests_the_document() {
        let (temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        start::run(&ctx, id).unwrap();
        run(&ctx, id).unwrap(); // 1.1
        run(&ctx, id).unwrap(); // 1.2 produces `contract`

        let dir = project::work_dir(temp.path()).join("2-in-progress/item-01_auth");
        assert!(dir.join("item-01_auth.md").exists());
        assert!(dir.join("contract.md").exists());

        // The nested document still resolves and advances.
        run(&ctx, id).unwrap(); // 2.1
        let task = state::get_task(temp.path(), "1").unwrap();
        assert_eq!(task.current_step, "2.2");
    }

    #[test]
    fn final_step_stops_the_walk() {
        let (temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        start::run(&ctx, id).unwrap();
        for _ in 0..6 {
            run(&ctx, id).unwrap();
        }
        let task = state::get_task(temp.path(), "1").unwrap();
        assert_eq!(task.completed_steps.len(), 6);

        let err = run(&ctx, id).unwrap_err();
        assert!(err.to_string().contains("already completed"));
    }

    #[test]
    fn advance_requires_started_item() {
        let (_temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        assert!(run(&ctx, id).is_err());
    }
}

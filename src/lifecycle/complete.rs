//! `cadence item complete` - finish a work item
//!
//! The one multi-system operation: document header, renames, registry,
//! task state, completion report, then git commit + tag + push. Everything
//! up to and including the registry is transactional-by-ordering; git
//! failures after that point are reported as warnings, not errors, since
//! the internal state is already consistent.

use colored::Colorize;

use super::{
    apply_plan, check_transition, hours_between, locate, now, preview_transition,
    read_item_header, update_header, OpContext,
};
use crate::detect;
use crate::error::{Error, Result};
use crate::git;
use crate::registry::{self, WorkItemUpdate};
use crate::report::{self, ReportContext};
use crate::state;
use crate::status::{self, Status};

pub struct CompleteOpts {
    /// Skip the git commit/tag/push stage entirely.
    pub no_tag: bool,
}

pub fn run(ctx: &OpContext, id: u32, opts: &CompleteOpts) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    check_transition(id, decoded.status, Status::Done)?;
    let header = read_item_header(&doc)?;

    // Tagging requires a clean tree so the tag lands on a commit that
    // contains exactly this completion. Checked before any mutation.
    if !opts.no_tag {
        if !git::is_repo(&ctx.root) {
            return Err(Error::GateBlocked(format!(
                "{} is not a git repository; pass --no-tag to complete without tagging",
                ctx.root.display()
            )));
        }
        if git::has_uncommitted_changes(&ctx.root)? {
            return Err(Error::GateBlocked(
                "working tree has uncommitted changes; commit or stash them first, \
                 or pass --no-tag"
                    .to_string(),
            ));
        }
    }

    let plan = status::plan_transition(&doc, Status::Done)?;
    let completed = now();
    let hours = hours_between(header.started.as_deref(), &completed);
    let mut updates = vec![
        ("status", serde_yaml::Value::String("done".into())),
        ("completed", serde_yaml::Value::String(completed.clone())),
    ];
    if let Some(hours) = hours {
        updates.push(("hours", serde_yaml::Value::from(hours)));
    }

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        if !opts.no_tag {
            println!("  would commit and create tag item-{id}");
        }
        return Ok(());
    }

    update_header(&doc, &updates)?;
    apply_plan(&plan)?;

    registry::upsert_work_item(
        &ctx.root,
        id,
        WorkItemUpdate {
            status: Some(Status::Done),
            completed: Some(completed.clone()),
            hours,
            ..Default::default()
        },
    )?;

    if let Some(mut task) = state::get_task(&ctx.root, &id.to_string()) {
        task.status = state::TASK_COMPLETED.to_string();
        task.completed = Some(completed.clone());
        state::upsert_task(&ctx.root, task)?;
    }

    let report_ctx = ReportContext {
        item: id,
        title: header.title.clone(),
        created: header.created.clone(),
        started: header.started.clone(),
        completed: Some(completed),
        hours: hours.or(header.hours),
    };
    match report::generate_report(&plan.target, &report_ctx)? {
        Some(path) => println!("  report: {}", path.display()),
        None => println!("  report already exists, left untouched"),
    }

    println!("{} work item {id} completed: {}", "ok".green(), header.title);

    if !opts.no_tag {
        tag_and_push(ctx, id, &header.title);
    }

    // Surface collection progress so the operator knows when the parent
    // itself is ready to be completed.
    if let Some(cid) = decoded.collection {
        if let Ok(collection_dir) = locate::find_collection_dir(&ctx.root, cid) {
            let scan = detect::scan_collection(&collection_dir)?;
            print!("{}", scan.render());
            if scan.is_complete() {
                println!(
                    "{} all children finished; run `cadence collection complete {cid}`",
                    "note".cyan()
                );
            }
        }
    }
    Ok(())
}

/// Commit, tag and push. By this point the lifecycle state is already
/// committed, so failures degrade to warnings.
fn tag_and_push(ctx: &OpContext, id: u32, title: &str) {
    let tag = format!("item-{id}");
    if let Err(e) = git::commit_all(&ctx.root, &format!("Complete work item {id}: {title}")) {
        eprintln!("{} commit failed: {e}", "warning".yellow());
        return;
    }
    if git::tag_exists(&ctx.root, &tag) {
        eprintln!("{} tag {tag} already exists, not recreating", "warning".yellow());
    } else if let Err(e) = git::create_tag(&ctx.root, &tag, &format!("Work item {id}: {title}")) {
        eprintln!("{} tagging failed: {e}", "warning".yellow());
        return;
    }
    match git::push_tag(&ctx.root, &tag) {
        Ok(()) => println!("  tagged and pushed {tag}"),
        Err(e) => eprintln!(
            "{} push failed ({e}); push the tag manually with `git push origin {tag}`",
            "warning".yellow()
        ),
    }
}

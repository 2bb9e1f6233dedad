//! `cadence collection ...` - operations on collection directories
//!
//! Collections are directory-only encodings: their status is the status
//! directory holding `collection-NN_slug/`. Completion is gated on the
//! detector - every child must be finished before the directory moves to
//! `3-done/`.

use colored::Colorize;

use super::{
    apply_plan, locate, now, preview_transition, read_collection_header, update_header,
    OpContext,
};
use crate::detect;
use crate::error::{Error, Result};
use crate::registry::{self, CollectionUpdate};
use crate::status::{self, Status, COLLECTION_DOC};

pub fn start(ctx: &OpContext, id: u32) -> Result<()> {
    let dir = locate::find_collection_dir(&ctx.root, id)?;
    let current = status_of(&dir)?;
    if !matches!(current, Status::Backlog | Status::Todo) {
        return Err(Error::validation(format!(
            "collection {id} is {current}; only backlog or todo collections start"
        )));
    }

    let plan = status::plan_collection_move(&dir, Status::InProgress)?;
    let started = now();
    let updates = [
        ("status", serde_yaml::Value::String("in_progress".into())),
        ("started", serde_yaml::Value::String(started.clone())),
    ];

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        return Ok(());
    }

    update_header(&dir.join(COLLECTION_DOC), &updates)?;
    apply_plan(&plan)?;
    registry::upsert_collection(
        &ctx.root,
        id,
        CollectionUpdate {
            status: Some(Status::InProgress),
            started: Some(started),
            ..Default::default()
        },
    )?;

    println!(
        "{} collection {id} is now in progress at {}/",
        "ok".green(),
        plan.target.display()
    );
    Ok(())
}

/// Complete a collection. Refuses unless every child is finished; the
/// refusal message carries the detector's per-child report.
pub fn complete(ctx: &OpContext, id: u32) -> Result<()> {
    let dir = locate::find_collection_dir(&ctx.root, id)?;
    let current = status_of(&dir)?;
    if current != Status::InProgress {
        return Err(Error::validation(format!(
            "collection {id} is {current}; only in_progress collections complete"
        )));
    }

    let scan = detect::scan_collection(&dir)?;
    if !scan.is_complete() {
        return Err(Error::validation(format!(
            "collection {id} has unfinished children:\n{}",
            scan.render()
        )));
    }

    let plan = status::plan_collection_move(&dir, Status::Done)?;
    let completed = now();
    let updates = [
        ("status", serde_yaml::Value::String("done".into())),
        ("completed", serde_yaml::Value::String(completed.clone())),
    ];

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        return Ok(());
    }

    update_header(&dir.join(COLLECTION_DOC), &updates)?;
    apply_plan(&plan)?;
    registry::upsert_collection(
        &ctx.root,
        id,
        CollectionUpdate {
            status: Some(Status::Done),
            completed: Some(completed),
            ..Default::default()
        },
    )?;

    let header = read_collection_header(&plan.target.join(COLLECTION_DOC))?;
    println!(
        "{} collection {id} completed: {} ({} children)",
        "ok".green(),
        header.title,
        scan.children.len()
    );
    Ok(())
}

pub fn archive(ctx: &OpContext, id: u32) -> Result<()> {
    let dir = locate::find_collection_dir(&ctx.root, id)?;
    let current = status_of(&dir)?;
    if current != Status::Done {
        return Err(Error::validation(format!(
            "collection {id} is {current}; only done collections archive"
        )));
    }

    let plan = status::plan_collection_move(&dir, Status::Archived)?;
    let updates = [("status", serde_yaml::Value::String("archived".into()))];

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        return Ok(());
    }

    update_header(&dir.join(COLLECTION_DOC), &updates)?;
    apply_plan(&plan)?;
    registry::upsert_collection(
        &ctx.root,
        id,
        CollectionUpdate {
            status: Some(Status::Archived),
            ..Default::default()
        },
    )?;

    println!("{} collection {id} archived", "ok".green());
    Ok(())
}

/// Adopt an existing standalone work item into a collection: the document
/// (or its subdirectory, when nested) moves inside the collection
/// directory and the membership is stamped in header and registry.
pub fn add(ctx: &OpContext, item_id: u32, collection_id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, item_id)?;
    let decoded = status::decode(&doc)?;
    if let Some(existing) = decoded.collection {
        return Err(Error::validation(format!(
            "work item {item_id} already belongs to collection {existing}"
        )));
    }
    if decoded.status.is_finished() || decoded.status == Status::Archived {
        return Err(Error::validation(format!(
            "work item {item_id} is {}; finished items cannot join a collection",
            decoded.status
        )));
    }

    let dir = locate::find_collection_dir(&ctx.root, collection_id)?;
    let collection_status = status_of(&dir)?;
    if collection_status.is_finished() || collection_status == Status::Archived {
        return Err(Error::validation(format!(
            "collection {collection_id} is {collection_status}; cannot add new work items"
        )));
    }
    // Adoption never changes an item's status, only its location, so the
    // move must stay inside one status directory. Crossing directories
    // would make the location encoding disagree with header and registry.
    if decoded.status != collection_status {
        return Err(Error::validation(format!(
            "work item {item_id} is {} but collection {collection_id} is {collection_status}; \
             bring the item to {collection_status} before adding it",
            decoded.status
        )));
    }

    let moved: &std::path::Path = if decoded.nested {
        doc.parent().ok_or_else(|| {
            Error::validation(format!("{} has no parent", doc.display()))
        })?
    } else {
        &doc
    };
    let name = moved
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("{} has no name", moved.display())))?;
    let dest = dir.join(name);

    if ctx.dry_run {
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!("  mv {} -> {}", moved.display(), dest.display());
        println!("  set collection: {collection_id}");
        return Ok(());
    }

    update_header(
        &doc,
        &[("collection", serde_yaml::Value::from(collection_id))],
    )?;
    std::fs::rename(moved, &dest).map_err(|e| {
        Error::file_op(
            format!("moving {} into {}", moved.display(), dir.display()),
            e,
        )
    })?;

    registry::upsert_work_item(
        &ctx.root,
        item_id,
        crate::registry::WorkItemUpdate {
            collection: Some(Some(collection_id)),
            ..Default::default()
        },
    )?;
    registry::upsert_collection(
        &ctx.root,
        collection_id,
        CollectionUpdate {
            total_children_delta: 1,
            ..Default::default()
        },
    )?;

    println!(
        "{} work item {item_id} joined collection {collection_id}",
        "ok".green()
    );
    Ok(())
}

/// Print the detector's report plus registry progress counters.
pub fn status(ctx: &OpContext, id: u32) -> Result<()> {
    let dir = locate::find_collection_dir(&ctx.root, id)?;
    let scan = detect::scan_collection(&dir)?;
    print!("{}", scan.render());

    let reg = registry::load(&ctx.root)?;
    if let Some(entry) = reg.collection(id) {
        println!(
            "  registry: {} - {}/{} done",
            entry.status, entry.completed_children, entry.total_children
        );
    }
    if scan.is_complete() {
        println!("{} ready to complete", "note".cyan());
    }
    Ok(())
}

/// One line per collection across all status directories.
pub fn list(ctx: &OpContext) -> Result<()> {
    let dirs = locate::list_collection_dirs(&ctx.root)?;
    if dirs.is_empty() {
        println!("no collections");
        return Ok(());
    }
    for dir in dirs {
        let current = status_of(&dir)?;
        let scan = detect::scan_collection(&dir)?;
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        println!(
            "{name:<40} {current:<12} {}/{} finished",
            scan.finished_count(),
            scan.children.len()
        );
    }
    Ok(())
}

fn status_of(dir: &std::path::Path) -> Result<Status> {
    let decoded = status::decode(&dir.join(COLLECTION_DOC))?;
    Ok(decoded.status)
}

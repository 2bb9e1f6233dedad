//! `cadence item status` / `cadence report` - read-only inspection

use colored::Colorize;

use super::{locate, read_item_header, OpContext};
use crate::error::Result;
use crate::registry;
use crate::report::{self, ReportContext};
use crate::state;
use crate::status;

/// Print everything known about one work item: decoded location, header
/// timeline, registry entry, and the workflow record if one exists.
pub fn item(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    let header = read_item_header(&doc)?;

    println!("{} {}", format!("work item {id}:").bold(), header.title);
    println!("  status:   {}", decoded.status.to_string().cyan());
    println!("  location: {}", doc.display());
    if let Some(cid) = decoded.collection {
        println!("  collection: {cid}");
    }
    if let Some(created) = &header.created {
        println!("  created:  {created}");
    }
    if let Some(started) = &header.started {
        println!("  started:  {started}");
    }
    if let Some(completed) = &header.completed {
        println!("  completed: {completed}");
    }
    if let Some(hours) = header.hours {
        println!("  hours:    {hours}");
    }
    if let Some(reason) = &header.blocked_reason {
        println!("  blocked:  {reason}");
    }
    if let Some(reason) = &header.aborted_reason {
        println!("  aborted:  {reason}");
    }

    if let Some(task) = state::get_task(&ctx.root, &id.to_string()) {
        println!(
            "  workflow: at step {}, {} completed, record {}",
            task.current_step,
            task.completed_steps.len(),
            task.status
        );
    }

    let reg = registry::load(&ctx.root)?;
    if reg.work_item(id).is_none() {
        println!("  {} no registry entry for this item", "warning".yellow());
    }
    Ok(())
}

/// Ensure a companion report exists for a work item, generating the
/// skeleton from the header timeline when missing.
pub fn report(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let header = read_item_header(&doc)?;

    if ctx.dry_run {
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!(
            "  would write {}",
            report::report_path(&doc, id).display()
        );
        return Ok(());
    }

    let report_ctx = ReportContext {
        item: id,
        title: header.title.clone(),
        created: header.created.clone(),
        started: header.started.clone(),
        completed: header.completed.clone(),
        hours: header.hours,
    };
    match report::generate_report(&doc, &report_ctx)? {
        Some(path) => println!("{} report written: {}", "ok".green(), path.display()),
        None => println!(
            "report already exists: {}",
            report::report_path(&doc, id).display()
        ),
    }
    Ok(())
}

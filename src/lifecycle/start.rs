//! `cadence item start` - move a work item into `in_progress`

use colored::Colorize;

use super::{
    apply_plan, check_transition, locate, now, preview_transition, read_item_header,
    update_header, OpContext,
};
use crate::error::{Error, Result};
use crate::registry::{self, CollectionUpdate, WorkItemUpdate};
use crate::state;
use crate::status::{self, Status};
use crate::workflow::Workflow;

pub fn run(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    let header = read_item_header(&doc)?;

    // Blocked items re-enter through `resume`, which keeps the original
    // `started` timestamp and the workflow record. Restarting one here
    // would reset both.
    if decoded.status == Status::Blocked {
        return Err(Error::validation(format!(
            "work item {id} is blocked; run `cadence item resume {id}` to pick it back up"
        )));
    }

    // A child of an already-started collection decodes as in_progress from
    // its location alone. Starting it then means activating it: stamping
    // `started` and opening its workflow record.
    let activating = decoded.status == Status::InProgress
        && header.started.is_none()
        && state::get_task(&ctx.root, &id.to_string()).is_none();
    if !activating {
        check_transition(id, decoded.status, Status::InProgress)?;
    }
    let workflow = Workflow::load(&ctx.root)?;
    let first_step = workflow.first_step()?.step.clone();

    let plan = status::plan_transition(&doc, Status::InProgress)?;
    let started = now();
    let updates = [
        ("status", serde_yaml::Value::String("in_progress".into())),
        ("started", serde_yaml::Value::String(started.clone())),
    ];

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        println!("  would start workflow at step {first_step}");
        return Ok(());
    }

    update_header(&doc, &updates)?;
    apply_plan(&plan)?;

    registry::upsert_work_item(
        &ctx.root,
        id,
        WorkItemUpdate {
            status: Some(Status::InProgress),
            started: Some(started.clone()),
            ..Default::default()
        },
    )?;
    // The whole collection directory moved with the item; a no-rename plan
    // means the collection was already in progress.
    if let Some(cid) = decoded.collection.filter(|_| !plan.renames.is_empty()) {
        registry::upsert_collection(
            &ctx.root,
            cid,
            CollectionUpdate {
                status: Some(Status::InProgress),
                started: Some(started),
                ..Default::default()
            },
        )?;
    }

    state::create_workflow_task(&ctx.root, id, &header.title, &first_step)?;

    println!(
        "{} work item {id} is now in progress (step {first_step}) at {}",
        "ok".green(),
        plan.target.display()
    );
    Ok(())
}

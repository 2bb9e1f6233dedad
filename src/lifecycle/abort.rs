//! `cadence item abort` - abandon an in-progress work item (terminal)

use colored::Colorize;

use super::{
    apply_plan, check_transition, hours_between, locate, now, preview_transition,
    read_item_header, update_header, OpContext,
};
use crate::error::Result;
use crate::registry::{self, WorkItemUpdate};
use crate::state;
use crate::status::{self, Status};

pub fn run(ctx: &OpContext, id: u32, reason: &str) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    check_transition(id, decoded.status, Status::Aborted)?;

    let header = read_item_header(&doc)?;
    if header.started.is_none() {
        return Err(crate::error::Error::validation(format!(
            "work item {id} was never started (`started` is unset); \
             nothing to abort"
        )));
    }

    let plan = status::plan_transition(&doc, Status::Aborted)?;
    let aborted_at = now();
    let hours = hours_between(header.started.as_deref(), &aborted_at);
    let mut updates = vec![
        ("status", serde_yaml::Value::String("aborted".into())),
        ("aborted_at", serde_yaml::Value::String(aborted_at.clone())),
        ("aborted_reason", serde_yaml::Value::String(reason.into())),
    ];
    if let Some(hours) = hours {
        updates.push(("hours", serde_yaml::Value::from(hours)));
    }

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        return Ok(());
    }

    update_header(&doc, &updates)?;
    apply_plan(&plan)?;

    registry::upsert_work_item(
        &ctx.root,
        id,
        WorkItemUpdate {
            status: Some(Status::Aborted),
            hours,
            metadata: vec![
                ("abortedAt".to_string(), serde_json::json!(aborted_at)),
                ("abortedReason".to_string(), serde_json::json!(reason)),
            ],
            ..Default::default()
        },
    )?;

    if let Some(mut task) = state::get_task(&ctx.root, &id.to_string()) {
        task.status = state::TASK_ABORTED.to_string();
        task.error = Some(reason.to_string());
        task.completed = Some(aborted_at);
        state::upsert_task(&ctx.root, task)?;
    }

    println!("{} work item {id} aborted: {reason}", "ok".green());
    Ok(())
}

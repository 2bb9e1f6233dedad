//! `cadence item block` - pause an in-progress work item

use colored::Colorize;

use super::{
    apply_plan, check_transition, locate, now, preview_transition, update_header, OpContext,
};
use crate::error::Result;
use crate::registry::{self, WorkItemUpdate};
use crate::state;
use crate::status::{self, Status};

pub fn run(ctx: &OpContext, id: u32, reason: Option<&str>) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    check_transition(id, decoded.status, Status::Blocked)?;

    let plan = status::plan_transition(&doc, Status::Blocked)?;
    let blocked_at = now();
    let mut updates = vec![
        ("status", serde_yaml::Value::String("blocked".into())),
        ("blocked_at", serde_yaml::Value::String(blocked_at.clone())),
    ];
    if let Some(reason) = reason {
        updates.push(("blocked_reason", serde_yaml::Value::String(reason.into())));
    }

    if ctx.dry_run {
        preview_transition(&plan, &updates);
        return Ok(());
    }

    update_header(&doc, &updates)?;
    apply_plan(&plan)?;

    let mut metadata = vec![("blockedAt".to_string(), serde_json::json!(blocked_at))];
    if let Some(reason) = reason {
        metadata.push(("blockedReason".to_string(), serde_json::json!(reason)));
    }
    registry::upsert_work_item(
        &ctx.root,
        id,
        WorkItemUpdate {
            status: Some(Status::Blocked),
            metadata,
            ..Default::default()
        },
    )?;

    if let Some(mut task) = state::get_task(&ctx.root, &id.to_string()) {
        task.status = state::TASK_BLOCKED.to_string();
        task.error = reason.map(String::from);
        state::upsert_task(&ctx.root, task)?;
    }

    match reason {
        Some(reason) => println!("{} work item {id} blocked: {reason}", "ok".green()),
        None => println!("{} work item {id} blocked", "ok".green()),
    }
    Ok(())
}

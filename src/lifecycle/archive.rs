//! `cadence item archive` - move a finished standalone item to cold storage

use colored::Colorize;

use super::{
    apply_plan, check_transition, locate, preview_transition, update_header, OpContext,
};
use crate::error::{Error, Result};
use crate::registry::{self, WorkItemUpdate};
use crate::state;
use crate::status::{self, Status};

pub fn run(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    if decoded.collection.is_some() {
        return Err(Error::validation(format!(
            "work item {id} belongs to collection {}; archive the whole collection instead",
            decoded.collection.unwrap_or_default()
        )));
    }
    check_transition(id, decoded.status, Status::Archived)?;

    let plan = status::plan_transition(&doc, Status::Archived)?;
    let updates = [("status", serde_yaml::Value::String("archived".into()))];

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
            status: Some(Status::Archived),
            ..Default::default()
        },
    )?;
    // The workflow record has no further use once the item leaves 3-done.
    state::delete_task(&ctx.root, &id.to_string())?;

    println!(
        "{} work item {id} archived at {}",
        "ok".green(),
        plan.target.display()
    );
    Ok(())
}

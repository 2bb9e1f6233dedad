//! `cadence item resume` - unblock a work item

use colored::Colorize;

use super::{
    apply_plan, check_transition, locate, now, preview_transition, update_header, OpContext,
};
use crate::error::Result;
use crate::registry::{self, WorkItemUpdate};
use crate::state;
use crate::status::{self, Status};

pub fn run(ctx: &OpContext, id: u32) -> Result<()> {
    let doc = locate::find_item_doc(&ctx.root, id)?;
    let decoded = status::decode(&doc)?;
    check_transition(id, decoded.status, Status::InProgress)?;

    let plan = status::plan_transition(&doc, Status::InProgress)?;
    let resumed_at = now();
    let updates = [
        ("status", serde_yaml::Value::String("in_progress".into())),
        ("resumed_at", serde_yaml::Value::String(resumed_at.clone())),
    ];

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
            status: Some(Status::InProgress),
            metadata: vec![("resumedAt".to_string(), serde_json::json!(resumed_at))],
            ..Default::default()
        },
    )?;

    if let Some(mut task) = state::get_task(&ctx.root, &id.to_string()) {
        task.status = state::TASK_IN_PROGRESS.to_string();
        task.error = None;
        state::upsert_task(&ctx.root, task)?;
    }

    println!(
        "{} work item {id} resumed at {}",
        "ok".green(),
        plan.target.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{block, create, init, start};
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
    fn resume_strips_suffix_and_reactivates_task() {
        let (temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        start::run(&ctx, id).unwrap();
        block::run(&ctx, id, Some("waiting")).unwrap();
        run(&ctx, id).unwrap();

        let doc = project::work_dir(temp.path()).join("2-in-progress/item-01_auth.md");
        assert!(doc.exists());
        let header = super::super::read_item_header(&doc).unwrap();
        assert_eq!(header.status, Status::InProgress);

        let task = state::get_task(temp.path(), "1").unwrap();
        assert_eq!(task.status, state::TASK_IN_PROGRESS);
        assert!(task.error.is_none());
    }

    #[test]
    fn resume_requires_blocked() {
        let (_temp, ctx) = setup();
        let id = create::item(&ctx, "Auth", None, None).unwrap();
        start::run(&ctx, id).unwrap();
        let err = run(&ctx, id).unwrap_err();
        assert!(err.to_string().contains("in_progress"));
    }
}

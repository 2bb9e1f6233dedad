//! `cadence item create` / `cadence collection create` / `cadence collection add`

use std::fs;
use std::path::PathBuf;

use colored::Colorize;

use super::{collection_dir_name, item_doc_name, locate, now, slugify, OpContext};
use crate::error::{Error, Result};
use crate::project;
use crate::registry::{self, CollectionUpdate, WorkItemUpdate};
use crate::status::{self, Status, COLLECTION_DOC, DIR_TODO};

/// Create a work item document, either standalone in `1-todo/` or inside
/// an existing collection directory. Returns the new item's number.
///
/// A child of a collection inherits the status that its location encodes:
/// adding to a collection already in `2-in-progress/` yields an
/// `in_progress` item. Finished collections refuse new children.
pub fn item(
    ctx: &OpContext,
    title: &str,
    collection: Option<u32>,
    estimate: Option<f64>,
) -> Result<u32> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(Error::validation("title produces an empty slug"));
    }

    // Validate the collection before consuming a counter.
    let (target_dir, initial_status) = match collection {
        Some(cid) => {
            let dir = locate::find_collection_dir(&ctx.root, cid)?;
            let decoded = status::decode(&dir.join(COLLECTION_DOC))?;
            if matches!(decoded.status, Status::Done | Status::Aborted | Status::Archived) {
                return Err(Error::validation(format!(
                    "collection {cid} is {}; cannot add new work items",
                    decoded.status
                )));
            }
            (dir, decoded.status)
        }
        None => (project::work_dir(&ctx.root).join(DIR_TODO), Status::Todo),
    };

    if ctx.dry_run {
        let registry = registry::load(&ctx.root)?;
        let id = registry.counters.next_work_item;
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!(
            "  would create {} as {initial_status}",
            target_dir.join(item_doc_name(id, &slug)).display()
        );
        return Ok(id);
    }

    let id = registry::next_work_item_id(&ctx.root)?;
    let doc_path = target_dir.join(item_doc_name(id, &slug));
    let created = now();

    fs::create_dir_all(&target_dir)
        .map_err(|e| Error::file_op(format!("creating {}", target_dir.display()), e))?;
    fs::write(
        &doc_path,
        item_template(id, title, collection, estimate, initial_status, &created),
    )
    .map_err(|e| Error::file_op(format!("writing {}", doc_path.display()), e))?;

    let metadata = match estimate {
        Some(estimate) => vec![("estimate".to_string(), serde_json::json!(estimate))],
        None => Vec::new(),
    };
    registry::upsert_work_item(
        &ctx.root,
        id,
        WorkItemUpdate {
            title: Some(title.to_string()),
            status: Some(initial_status),
            collection: Some(collection),
            created: Some(created),
            metadata,
            ..Default::default()
        },
    )?;
    if let Some(cid) = collection {
        registry::upsert_collection(
            &ctx.root,
            cid,
            CollectionUpdate {
                total_children_delta: 1,
                ..Default::default()
            },
        )?;
    }

    println!(
        "{} created work item {id}: {} ({})",
        "ok".green(),
        title,
        doc_path.display()
    );
    Ok(id)
}

/// Create a collection directory in `1-todo/` with its `_collection.md`.
pub fn collection(ctx: &OpContext, title: &str) -> Result<u32> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(Error::validation("title produces an empty slug"));
    }

    if ctx.dry_run {
        let registry = registry::load(&ctx.root)?;
        let id = registry.counters.next_collection;
        let dir = project::work_dir(&ctx.root)
            .join(DIR_TODO)
            .join(collection_dir_name(id, &slug));
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!("  would create {}/", dir.display());
        return Ok(id);
    }

    let id = registry::next_collection_id(&ctx.root)?;
    let dir: PathBuf = project::work_dir(&ctx.root)
        .join(DIR_TODO)
        .join(collection_dir_name(id, &slug));
    let created = now();

    fs::create_dir_all(&dir)
        .map_err(|e| Error::file_op(format!("creating {}", dir.display()), e))?;
    let doc = dir.join(COLLECTION_DOC);
    fs::write(&doc, collection_template(id, title, &created))
        .map_err(|e| Error::file_op(format!("writing {}", doc.display()), e))?;

    registry::upsert_collection(
        &ctx.root,
        id,
        CollectionUpdate {
            title: Some(title.to_string()),
            status: Some(Status::Todo),
            created: Some(created),
            ..Default::default()
        },
    )?;

    println!(
        "{} created collection {id}: {} ({}/)",
        "ok".green(),
        title,
        dir.display()
    );
    Ok(id)
}

fn item_template(
    id: u32,
    title: &str,
    collection: Option<u32>,
    estimate: Option<f64>,
    status: Status,
    created: &str,
) -> String {
    let collection_line = match collection {
        Some(cid) => format!("collection: {cid}\n"),
        None => String::new(),
    };
    let estimate_line = match estimate {
        Some(estimate) => format!("estimate: {estimate}\n"),
        None => String::new(),
    };
    format!(
        "---\n\
         item: {id}\n\
         title: {title}\n\
         {collection_line}\
         {estimate_line}\
         status: {status}\n\
         created: {created}\n\
         started: null\n\
         completed: null\n\
         hours: null\n\
         ---\n\
         \n\
         # {title}\n\
         \n\
         ## Goal\n\
         \n\
         ## Notes\n"
    )
}

fn collection_template(id: u32, title: &str, created: &str) -> String {
    format!(
        "---\n\
         collection: {id}\n\
         title: {title}\n\
         status: todo\n\
         created: {created}\n\
         started: null\n\
         completed: null\n\
         ---\n\
         \n\
         # {title}\n\
         \n\
         ## Scope\n\
         \n\
         ## Child work items\n"
    )
}

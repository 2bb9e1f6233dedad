//! Registry store: the single authoritative catalog of work items and
//! collections
//!
//! One JSON document per project (`work/registry.json`) holding the
//! auto-increment counters and per-entry lifecycle metadata. All writes go
//! through the copy-before-write backup so a failed save restores the
//! previous document byte-for-byte.
//!
//! Counter increments are read-increment-save and are NOT safe against
//! concurrent processes; the orchestrator enforces a single writer via the
//! project lock (see `project::ProjectLock`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::backup::FileBackup;
use crate::project;
use crate::status::Status;

pub const REGISTRY_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub version: String,
    pub counters: Counters,
    /// Keyed by work item number rendered as a string.
    #[serde(default, rename = "workItems")]
    pub work_items: BTreeMap<String, WorkItemEntry>,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    #[serde(rename = "nextWorkItem")]
    pub next_work_item: u32,
    #[serde(rename = "nextCollection")]
    pub next_collection: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemEntry {
    pub title: String,
    pub status: Status,
    #[serde(default)]
    pub collection: Option<u32>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
    /// Free-form metadata (abort reasons, estimates, ...). Flattened so
    /// unknown fields written by other tools round-trip unchanged.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub title: String,
    pub status: Status,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default, rename = "totalChildren")]
    pub total_children: u32,
    #[serde(default, rename = "completedChildren")]
    pub completed_children: u32,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Default for Registry {
    fn default() -> Registry {
        Registry {
            version: REGISTRY_VERSION.to_string(),
            counters: Counters {
                next_work_item: 1,
                next_collection: 1,
            },
            work_items: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }
}

impl Registry {
    pub fn work_item(&self, id: u32) -> Option<&WorkItemEntry> {
        self.work_items.get(&id.to_string())
    }

    pub fn collection(&self, id: u32) -> Option<&CollectionEntry> {
        self.collections.get(&id.to_string())
    }
}

/// Load the registry, returning an empty correctly-shaped one when the
/// document does not exist yet. A present-but-unreadable document is an
/// error; it is never silently replaced.
pub fn load(root: &Path) -> Result<Registry> {
    let path = project::registry_path(root);
    if !path.exists() {
        return Ok(Registry::default());
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::file_op(format!("reading registry {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| {
        Error::file_op(
            format!("parsing registry {}", path.display()),
            anyhow::Error::from(e),
        )
    })
}

/// Save the registry with backup/restore semantics: on a failed write the
/// previous document is restored and the error re-raised.
pub fn save(root: &Path, registry: &Registry) -> Result<()> {
    let path = project::registry_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::file_op(format!("creating {}", parent.display()), e))?;
    }

    let backup = if path.exists() {
        Some(FileBackup::create(&path)?)
    } else {
        None
    };

    let json = serde_json::to_string_pretty(registry)
        .map_err(|e| Error::file_op("serializing registry", anyhow::Error::from(e)))?;

    match fs::write(&path, json) {
        Ok(()) => {
            if let Some(backup) = backup {
                backup.cleanup()?;
            }
            Ok(())
        }
        Err(e) => {
            if let Some(backup) = backup {
                backup.restore()?;
            }
            Err(Error::file_op(
                format!("writing registry {}", path.display()),
                e,
            ))
        }
    }
}

/// Allocate the next work item number and persist the incremented counter.
pub fn next_work_item_id(root: &Path) -> Result<u32> {
    let mut registry = load(root)?;
    let id = registry.counters.next_work_item;
    registry.counters.next_work_item = id + 1;
    save(root, &registry)?;
    Ok(id)
}

/// Allocate the next collection number and persist the incremented counter.
pub fn next_collection_id(root: &Path) -> Result<u32> {
    let mut registry = load(root)?;
    let id = registry.counters.next_collection;
    registry.counters.next_collection = id + 1;
    save(root, &registry)?;
    Ok(id)
}

/// Fields applied to a work item entry by `upsert_work_item`.
#[derive(Debug, Default, Clone)]
pub struct WorkItemUpdate {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub collection: Option<Option<u32>>,
    pub created: Option<String>,
    pub started: Option<String>,
    pub completed: Option<String>,
    pub hours: Option<f64>,
    pub metadata: Vec<(String, serde_json::Value)>,
}

/// Insert or update a work item entry and save.
///
/// When the update transitions the item into `done` and the item belongs
/// to a collection, the collection's `completedChildren` counter is
/// incremented inside the same save. The increment fires only on the
/// not-done -> done edge, so reapplying a terminal status never
/// double-counts.
pub fn upsert_work_item(root: &Path, id: u32, update: WorkItemUpdate) -> Result<()> {
    let mut registry = load(root)?;
    let key = id.to_string();

    let entry = registry
        .work_items
        .entry(key)
        .or_insert_with(|| WorkItemEntry {
            title: String::new(),
            status: Status::Todo,
            collection: None,
            created: None,
            started: None,
            completed: None,
            hours: None,
            metadata: BTreeMap::new(),
        });

    let was_done = entry.status == Status::Done;

    if let Some(title) = update.title {
        entry.title = title;
    }
    if let Some(collection) = update.collection {
        entry.collection = collection;
    }
    if let Some(created) = update.created {
        entry.created = Some(created);
    }
    if let Some(started) = update.started {
        entry.started = Some(started);
    }
    if let Some(completed) = update.completed {
        entry.completed = Some(completed);
    }
    if let Some(hours) = update.hours {
        entry.hours = Some(hours);
    }
    for (k, v) in update.metadata {
        entry.metadata.insert(k, v);
    }

    let mut bump_collection = None;
    if let Some(status) = update.status {
        entry.status = status;
        if status == Status::Done && !was_done {
            bump_collection = entry.collection;
        }
    }

    if let Some(collection_id) = bump_collection {
        if let Some(collection) = registry.collections.get_mut(&collection_id.to_string()) {
            collection.completed_children += 1;
        }
    }

    save(root, &registry)
}

/// Fields applied to a collection entry by `upsert_collection`.
#[derive(Debug, Default, Clone)]
pub struct CollectionUpdate {
    pub title: Option<String>,
    pub status: Option<Status>,
    pub created: Option<String>,
    pub started: Option<String>,
    pub completed: Option<String>,
    pub total_children_delta: i32,
}

pub fn upsert_collection(root: &Path, id: u32, update: CollectionUpdate) -> Result<()> {
    let mut registry = load(root)?;
    let entry = registry
        .collections
        .entry(id.to_string())
        .or_insert_with(|| CollectionEntry {
            title: String::new(),
            status: Status::Todo,
            created: None,
            started: None,
            completed: None,
            total_children: 0,
            completed_children: 0,
            metadata: BTreeMap::new(),
        });

    if let Some(title) = update.title {
        entry.title = title;
    }
    if let Some(status) = update.status {
        entry.status = status;
    }
    if let Some(created) = update.created {
        entry.created = Some(created);
    }
    if let Some(started) = update.started {
        entry.started = Some(started);
    }
    if let Some(completed) = update.completed {
        entry.completed = Some(completed);
    }
    if update.total_children_delta != 0 {
        let total = entry.total_children as i64 + update.total_children_delta as i64;
        entry.total_children = total.max(0) as u32;
    }

    save(root, &registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("work")).unwrap();
        temp
    }

    #[test]
    fn load_missing_returns_empty_shape() {
        let temp = setup();
        let registry = load(temp.path()).unwrap();
        assert_eq!(registry.version, REGISTRY_VERSION);
        assert_eq!(registry.counters.next_work_item, 1);
        assert_eq!(registry.counters.next_collection, 1);
        assert!(registry.work_items.is_empty());
    }

    #[test]
    fn counters_are_independent_sequences() {
        let temp = setup();
        assert_eq!(next_work_item_id(temp.path()).unwrap(), 1);
        assert_eq!(next_work_item_id(temp.path()).unwrap(), 2);
        assert_eq!(next_collection_id(temp.path()).unwrap(), 1);
        assert_eq!(next_work_item_id(temp.path()).unwrap(), 3);
        assert_eq!(next_collection_id(temp.path()).unwrap(), 2);
    }

    #[test]
    fn upsert_roundtrips_through_save() {
        let temp = setup();
        upsert_work_item(
            temp.path(),
            5,
            WorkItemUpdate {
                title: Some("X".into()),
                status: Some(Status::Todo),
                created: Some("2026-08-30".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let registry = load(temp.path()).unwrap();
        let entry = registry.work_item(5).unwrap();
        assert_eq!(entry.title, "X");
        assert_eq!(entry.status, Status::Todo);
    }

    #[test]
    fn done_increments_collection_counter_once() {
        let temp = setup();
        upsert_collection(
            temp.path(),
            2,
            CollectionUpdate {
                title: Some("Users".into()),
                total_children_delta: 1,
                ..Default::default()
            },
        )
        .unwrap();
        upsert_work_item(
            temp.path(),
            5,
            WorkItemUpdate {
                title: Some("X".into()),
                status: Some(Status::InProgress),
                collection: Some(Some(2)),
                ..Default::default()
            },
        )
        .unwrap();

        upsert_work_item(
            temp.path(),
            5,
            WorkItemUpdate {
                status: Some(Status::Done),
                ..Default::default()
            },
        )
        .unwrap();
        // Re-applying the terminal status must not double-count.
        upsert_work_item(
            temp.path(),
            5,
            WorkItemUpdate {
                status: Some(Status::Done),
                hours: Some(3.5),
                ..Default::default()
            },
        )
        .unwrap();

        let registry = load(temp.path()).unwrap();
        assert_eq!(registry.collection(2).unwrap().completed_children, 1);
        assert_eq!(registry.work_item(5).unwrap().hours, Some(3.5));
    }

    #[test]
    fn unknown_fields_roundtrip() {
        let temp = setup();
        let raw = r#"{
            "version": "1.0",
            "counters": { "nextWorkItem": 3, "nextCollection": 1 },
            "workItems": {
                "1": { "title": "t", "status": "todo", "sprintType": "backend" }
            },
            "collections": {}
        }"#;
        fs::write(project::registry_path(temp.path()), raw).unwrap();

        let registry = load(temp.path()).unwrap();
        save(temp.path(), &registry).unwrap();

        let reloaded = load(temp.path()).unwrap();
        assert_eq!(
            reloaded.work_item(1).unwrap().metadata.get("sprintType"),
            Some(&serde_json::Value::String("backend".into()))
        );
    }

    #[test]
    fn save_leaves_no_backup_residue() {
        let temp = setup();
        upsert_work_item(
            temp.path(),
            1,
            WorkItemUpdate {
                title: Some("a".into()),
                ..Default::default()
            },
        )
        .unwrap();
        upsert_work_item(
            temp.path(),
            1,
            WorkItemUpdate {
                status: Some(Status::InProgress),
                ..Default::default()
            },
        )
        .unwrap();
        let bak = temp.path().join("work").join("registry.json.bak");
        assert!(!bak.exists());
    }
}

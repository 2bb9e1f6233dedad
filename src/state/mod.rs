//! Atomic task-state store: live progress for in-flight work items
//!
//! A single JSON document per project (`.cadence/task-state.json`) holding
//! one record per active item, optimized for frequent small updates.
//! Reads take a shared advisory lock; writes stage to a sibling temp file
//! under an exclusive lock and are promoted with an atomic rename, so
//! concurrent readers never observe a torn document and a crashed writer
//! cannot corrupt the real path.
//!
//! This store is authoritative for in-flight step progress only; the
//! registry remains authoritative for lifecycle status and history.
//!
//! The mutation helpers (`upsert_task`, `delete_task`) are load-modify-save
//! across two separate lock scopes, so concurrent mutators can lose a
//! record. Mutation assumes the caller holds `project::ProjectLock`; only
//! reads are safe from unlocked paths.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::locking::{atomic_locked_write, locked_read};
use crate::project;

pub const STATE_VERSION: &str = "1.0";

/// Pipeline kind stamped on records created by the lifecycle orchestrator.
pub const PIPELINE_WORKFLOW: &str = "workflow";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStateDoc {
    pub version: String,
    #[serde(rename = "projectRoot")]
    pub project_root: String,
    #[serde(default)]
    pub tasks: Vec<TaskStateRecord>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStateRecord {
    pub id: String,
    pub title: String,
    pub pipeline: String,
    pub status: String,
    #[serde(rename = "currentPhase")]
    pub current_phase: u32,
    #[serde(rename = "currentStep")]
    pub current_step: String,
    #[serde(default, rename = "completedSteps")]
    pub completed_steps: Vec<CompletedStep>,
    pub created: String,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step: String,
    #[serde(rename = "completedAt")]
    pub completed_at: String,
}

/// Task status values used inside the state store.
pub const TASK_IN_PROGRESS: &str = "in_progress";
pub const TASK_BLOCKED: &str = "blocked";
pub const TASK_COMPLETED: &str = "completed";
pub const TASK_ABORTED: &str = "aborted";

impl TaskStateDoc {
    fn empty(root: &Path) -> TaskStateDoc {
        TaskStateDoc {
            version: STATE_VERSION.to_string(),
            project_root: root.display().to_string(),
            tasks: Vec::new(),
            last_updated: Utc::now().to_rfc3339(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskStateRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskStateRecord> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Replace-by-id or append.
    pub fn upsert(&mut self, record: TaskStateRecord) {
        match self.tasks.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record,
            None => self.tasks.push(record),
        }
    }

    pub fn delete(&mut self, id: &str) {
        self.tasks.retain(|t| t.id != id);
    }

    pub fn list_by_pipeline(&self, pipeline: &str) -> Vec<&TaskStateRecord> {
        self.tasks.iter().filter(|t| t.pipeline == pipeline).collect()
    }

    pub fn list_active(&self) -> Vec<&TaskStateRecord> {
        self.tasks
            .iter()
            .filter(|t| t.status == TASK_IN_PROGRESS)
            .collect()
    }
}

/// Load the task-state document with a shared lock.
///
/// A missing document yields an empty store. A parse failure logs a
/// warning to stderr and also yields an empty store rather than failing
/// the caller - the registry remains the source of truth for lifecycle
/// status, so losing in-flight step detail is recoverable.
pub fn load(root: &Path) -> TaskStateDoc {
    let path = project::state_path(root);
    if !path.exists() {
        return TaskStateDoc::empty(root);
    }
    match locked_read(&path).and_then(|content| {
        serde_json::from_str::<TaskStateDoc>(&content).map_err(anyhow::Error::from)
    }) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!(
                "Warning: failed to load task state from {}: {e}",
                path.display()
            );
            TaskStateDoc::empty(root)
        }
    }
}

/// Save the task-state document atomically.
pub fn save(root: &Path, doc: &mut TaskStateDoc) -> Result<()> {
    let path = project::state_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::file_op(format!("creating {}", parent.display()), e))?;
    }
    doc.last_updated = Utc::now().to_rfc3339();
    let json = serde_json::to_string_pretty(doc)
        .map_err(|e| Error::file_op("serializing task state", anyhow::Error::from(e)))?;
    atomic_locked_write(&path, &json)
        .map_err(|e| Error::file_op(format!("writing task state {}", path.display()), e))
}

/// Fetch one record by id.
pub fn get_task(root: &Path, id: &str) -> Option<TaskStateRecord> {
    load(root).get(id).cloned()
}

/// Insert or update one record and persist.
pub fn upsert_task(root: &Path, record: TaskStateRecord) -> Result<()> {
    let mut doc = load(root);
    doc.upsert(record);
    save(root, &mut doc)
}

/// Delete one record and persist.
pub fn delete_task(root: &Path, id: &str) -> Result<()> {
    let mut doc = load(root);
    doc.delete(id);
    save(root, &mut doc)
}

/// Create a fresh in-progress record for a just-started work item.
pub fn create_workflow_task(
    root: &Path,
    id: u32,
    title: &str,
    first_step: &str,
) -> Result<TaskStateRecord> {
    let now = Utc::now().to_rfc3339();
    let record = TaskStateRecord {
        id: id.to_string(),
        title: title.to_string(),
        pipeline: PIPELINE_WORKFLOW.to_string(),
        status: TASK_IN_PROGRESS.to_string(),
        current_phase: phase_of(first_step),
        current_step: first_step.to_string(),
        completed_steps: Vec::new(),
        created: now.clone(),
        started: Some(now),
        completed: None,
        error: None,
    };
    upsert_task(root, record.clone())?;
    Ok(record)
}

/// Parse the phase number out of a step id like `2.3`.
pub fn phase_of(step: &str) -> u32 {
    step.split('.')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
}

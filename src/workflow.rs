//! Workflow step definitions for the advance operation
//!
//! A workflow is an ordered list of phases, each with numbered steps
//! (`1.1`, `1.2`, `2.1`, ...). The built-in definition covers the default
//! plan/build/close cadence; a project can override it with
//! `.cadence/workflow.json`. A step may name an artifact that is created
//! beside the work item document when the step completes (e.g. an
//! interface contract).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::project;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub phase: u32,
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step: String,
    pub name: String,
    /// Companion artifact (filename stem) created when this step completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl Default for Workflow {
    fn default() -> Workflow {
        Workflow {
            phases: vec![
                Phase {
                    phase: 1,
                    name: "Plan".to_string(),
                    steps: vec![
                        Step {
                            step: "1.1".into(),
                            name: "Scope".into(),
                            artifact: None,
                        },
                        Step {
                            step: "1.2".into(),
                            name: "Design".into(),
                            artifact: Some("contract".into()),
                        },
                    ],
                },
                Phase {
                    phase: 2,
                    name: "Build".to_string(),
                    steps: vec![
                        Step {
                            step: "2.1".into(),
                            name: "Implement".into(),
                            artifact: None,
                        },
                        Step {
                            step: "2.2".into(),
                            name: "Test".into(),
                            artifact: None,
                        },
                    ],
                },
                Phase {
                    phase: 3,
                    name: "Close".to_string(),
                    steps: vec![
                        Step {
                            step: "3.1".into(),
                            name: "Review".into(),
                            artifact: None,
                        },
                        Step {
                            step: "3.2".into(),
                            name: "Quality check".into(),
                            artifact: None,
                        },
                    ],
                },
            ],
        }
    }
}

impl Workflow {
    /// Load the project override when present, otherwise the built-in
    /// definition. An unreadable override is an error - silently falling
    /// back would desynchronize step ids across invocations.
    pub fn load(root: &Path) -> Result<Workflow> {
        let path = project::workflow_override_path(root);
        if !path.exists() {
            return Ok(Workflow::default());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::file_op(format!("reading workflow {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::file_op(
                format!("parsing workflow {}", path.display()),
                anyhow::Error::from(e),
            )
        })
    }

    /// Flat step order across phases.
    pub fn step_order(&self) -> Vec<&Step> {
        self.phases.iter().flat_map(|p| p.steps.iter()).collect()
    }

    pub fn first_step(&self) -> Result<&Step> {
        self.step_order()
            .first()
            .copied()
            .ok_or_else(|| Error::validation("workflow definition has no steps"))
    }

    pub fn find_step(&self, id: &str) -> Option<&Step> {
        self.step_order().into_iter().find(|s| s.step == id)
    }

    /// The step after `current`, or `None` when `current` is the final step.
    pub fn next_step(&self, current: &str) -> Result<Option<&Step>> {
        let order = self.step_order();
        let idx = order
            .iter()
            .position(|s| s.step == current)
            .ok_or_else(|| {
                Error::validation(format!("step `{current}` not found in workflow definition"))
            })?;
        Ok(order.get(idx + 1).copied())
    }
}

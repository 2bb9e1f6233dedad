//! `cadence init` - scaffold a project

use std::fs;
use std::path::Path;

use colored::Colorize;

use crate::error::{Error, Result};
use crate::project;
use crate::registry;
use crate::state;

/// Create the project skeleton at `path`: the `.cadence/` marker, the
/// status directories under `work/`, an empty registry, and an empty
/// task-state document. Safe to re-run; existing files are left alone.
pub fn run(path: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{}", "Dry run - no changes made".yellow().bold());
        println!("  would create {}/", path.join(project::MARKER_DIR).display());
        println!("  would create {}/<status dirs>", project::work_dir(path).display());
        println!("  would create {}", project::registry_path(path).display());
        println!("  would create {}", project::state_path(path).display());
        return Ok(());
    }

    let marker = path.join(project::MARKER_DIR);
    let already = marker.is_dir();
    fs::create_dir_all(&marker)
        .map_err(|e| Error::file_op(format!("creating {}", marker.display()), e))?;
    project::ensure_status_dirs(path)?;

    if !project::registry_path(path).exists() {
        registry::save(path, &registry::Registry::default())?;
    }
    if !project::state_path(path).exists() {
        let mut doc = state::load(path);
        state::save(path, &mut doc)?;
    }

    if already {
        println!("{} project at {} already initialized", "ok".green(), path.display());
    } else {
        println!("{}", crate::LOGO.cyan());
        println!("{} initialized cadence project at {}", "ok".green(), path.display());
    }
    Ok(())
}

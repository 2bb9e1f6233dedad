//! Status codec: the filesystem-encoded lifecycle state machine
//!
//! A work item's status is physically discoverable without consulting the
//! registry: it is determined by which status directory the document lives
//! under, combined with a `--done` / `--blocked` / `--aborted` suffix for
//! the sub-states reachable from `in_progress` without changing directory.
//!
//! Everything in this module is pure path computation - no I/O - so the
//! codec is unit-testable with synthetic path strings alone. Callers
//! perform the planned renames.

use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The fixed, ordered status directories under `work/`.
pub const DIR_BACKLOG: &str = "0-backlog";
pub const DIR_TODO: &str = "1-todo";
pub const DIR_IN_PROGRESS: &str = "2-in-progress";
pub const DIR_DONE: &str = "3-done";
pub const DIR_BLOCKED: &str = "4-blocked";
pub const DIR_ABORTED: &str = "5-aborted";
pub const DIR_ARCHIVED: &str = "6-archived";

pub const STATUS_DIRS: [&str; 7] = [
    DIR_BACKLOG,
    DIR_TODO,
    DIR_IN_PROGRESS,
    DIR_DONE,
    DIR_BLOCKED,
    DIR_ABORTED,
    DIR_ARCHIVED,
];

/// Suffixes marking terminal/paused sub-states inside `2-in-progress/`.
pub const SUFFIX_DONE: &str = "--done";
pub const SUFFIX_BLOCKED: &str = "--blocked";
pub const SUFFIX_ABORTED: &str = "--aborted";

/// Where standalone finished items collect inside `3-done/`.
pub const STANDALONE_DIR: &str = "_standalone";

/// Document naming.
pub const ITEM_PREFIX: &str = "item-";
pub const COLLECTION_PREFIX: &str = "collection-";
pub const COLLECTION_DOC: &str = "_collection.md";
pub const REPORT_SUFFIX: &str = "_report.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Backlog,
    Todo,
    InProgress,
    Done,
    Blocked,
    Aborted,
    Archived,
}

impl Status {
    /// The status directory encoding this status at the top level.
    pub fn directory(&self) -> &'static str {
        match self {
            Status::Backlog => DIR_BACKLOG,
            Status::Todo => DIR_TODO,
            Status::InProgress => DIR_IN_PROGRESS,
            Status::Done => DIR_DONE,
            Status::Blocked => DIR_BLOCKED,
            Status::Aborted => DIR_ABORTED,
            Status::Archived => DIR_ARCHIVED,
        }
    }

    pub fn from_directory(dir: &str) -> Option<Status> {
        match dir {
            DIR_BACKLOG => Some(Status::Backlog),
            DIR_TODO => Some(Status::Todo),
            DIR_IN_PROGRESS => Some(Status::InProgress),
            DIR_DONE => Some(Status::Done),
            DIR_BLOCKED => Some(Status::Blocked),
            DIR_ABORTED => Some(Status::Aborted),
            DIR_ARCHIVED => Some(Status::Archived),
            _ => None,
        }
    }

    /// Filename/directory suffix for sub-states reachable from
    /// `in_progress` without changing directory.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Status::Done => Some(SUFFIX_DONE),
            Status::Blocked => Some(SUFFIX_BLOCKED),
            Status::Aborted => Some(SUFFIX_ABORTED),
            _ => None,
        }
    }

    /// Finished statuses count toward collection completion.
    pub fn is_finished(&self) -> bool {
        matches!(self, Status::Done | Status::Aborted)
    }

    /// Check whether the lifecycle state machine permits this transition.
    ///
    /// ```text
    /// backlog -> todo -> in_progress -> done -> archived
    ///                         |-> blocked -> in_progress   (resume)
    ///                         |-> aborted                  (terminal)
    /// ```
    pub fn can_transition_to(&self, new_status: Status) -> bool {
        match self {
            Status::Backlog => matches!(new_status, Status::Todo | Status::InProgress),
            Status::Todo => matches!(new_status, Status::InProgress),
            Status::InProgress => {
                matches!(new_status, Status::Done | Status::Blocked | Status::Aborted)
            }
            Status::Blocked => matches!(new_status, Status::InProgress),
            Status::Done => matches!(new_status, Status::Archived),
            Status::Aborted => false,
            Status::Archived => false,
        }
    }

    pub fn valid_transitions(&self) -> Vec<Status> {
        match self {
            Status::Backlog => vec![Status::Todo, Status::InProgress],
            Status::Todo => vec![Status::InProgress],
            Status::InProgress => vec![Status::Done, Status::Blocked, Status::Aborted],
            Status::Blocked => vec![Status::InProgress],
            Status::Done => vec![Status::Archived],
            Status::Aborted => vec![],
            Status::Archived => vec![],
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Backlog => "backlog",
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Blocked => "blocked",
            Status::Aborted => "aborted",
            Status::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "backlog" => Ok(Status::Backlog),
            "todo" => Ok(Status::Todo),
            "in_progress" | "in-progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            "blocked" => Ok(Status::Blocked),
            "aborted" => Ok(Status::Aborted),
            "archived" => Ok(Status::Archived),
            _ => Err(Error::validation(format!("unknown status: {s}"))),
        }
    }
}

/// Result of decoding a work item document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLocation {
    pub status: Status,
    /// Collection number when a `collection-NN_` segment encloses the item.
    pub collection: Option<u32>,
    /// Item number parsed from the filename.
    pub item: Option<u32>,
    /// True when the document lives inside its own `item-NN_` subdirectory
    /// (with companion files beside it).
    pub nested: bool,
}

fn collection_regex() -> Regex {
    Regex::new(r"^collection-(\d+)_").expect("static regex")
}

fn item_regex() -> Regex {
    Regex::new(r"^item-(\d+)_").expect("static regex")
}

/// Decode a document path into its logical status and collection membership.
///
/// Works on any depth: the item may be a direct child of a status directory
/// or of a collection directory, or nested one level deeper in its own
/// subdirectory. A suffix on the filename or enclosing item subdirectory
/// overrides the status directory; a `--` marker that matches no known
/// suffix is a validation error, never silently ignored.
pub fn decode(path: &Path) -> Result<DecodedLocation> {
    let mut base_status = None;
    let mut collection = None;

    let components: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .collect();

    for part in &components {
        if base_status.is_none() {
            if let Some(status) = Status::from_directory(part) {
                base_status = Some(status);
                continue;
            }
        }
        if let Some(caps) = collection_regex().captures(part) {
            collection = caps[1].parse::<u32>().ok();
        }
    }

    let base_status = base_status.ok_or_else(|| {
        Error::validation(format!(
            "path {} contains no status directory segment",
            path.display()
        ))
    })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("path {} has no filename", path.display())))?;

    let parent_name = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let nested = item_regex().is_match(parent_name);

    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    let suffix_status = decode_suffix(stem)?.or(if nested {
        decode_suffix(parent_name)?
    } else {
        None
    });

    let item = item_regex()
        .captures(stem)
        .or_else(|| item_regex().captures(parent_name))
        .and_then(|caps| caps[1].parse::<u32>().ok());

    Ok(DecodedLocation {
        status: suffix_status.unwrap_or(base_status),
        collection,
        item,
        nested,
    })
}

/// Map a `--suffix` marker on a name to its status. `Ok(None)` means no
/// marker; an unrecognized marker is a corruption signal and errors out.
fn decode_suffix(name: &str) -> Result<Option<Status>> {
    let Some(idx) = name.find("--") else {
        return Ok(None);
    };
    let marker = &name[idx..];
    match marker {
        SUFFIX_DONE => Ok(Some(Status::Done)),
        SUFFIX_BLOCKED => Ok(Some(Status::Blocked)),
        SUFFIX_ABORTED => Ok(Some(Status::Aborted)),
        _ => Err(Error::validation(format!(
            "malformed status suffix `{marker}` on `{name}`"
        ))),
    }
}

/// An ordered sequence of renames realizing one transition.
///
/// Directory renames always precede file renames so that a crash between
/// the two leaves the document reachable at `newDirName/oldFileName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub renames: Vec<(PathBuf, PathBuf)>,
    /// Where the document lives after all renames complete.
    pub target: PathBuf,
}

impl MovePlan {
    fn in_place(target: PathBuf) -> MovePlan {
        MovePlan {
            renames: Vec::new(),
            target,
        }
    }
}

/// Compute the renames that move `current` into `new_status`.
///
/// Rules (see the codec module docs):
/// - a collection child is renamed in place with a suffix for
///   `done`/`blocked`/`aborted`; only top-level directory changes move it
///   (e.g. `todo -> in_progress` relocates the whole collection directory);
/// - a standalone item moves between status directories, with done items
///   collecting under `3-done/_standalone/`;
/// - a nested item renames its subdirectory first, then the file.
///
/// The caller must have validated the transition already; this function
/// only computes paths.
pub fn plan_transition(current: &Path, new_status: Status) -> Result<MovePlan> {
    let decoded = decode(current)?;
    let work_dir = work_dir_of(current)?;

    let file_name = current
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("path {} has no filename", current.display())))?;
    let parent = current.parent().unwrap_or(Path::new(""));

    match new_status {
        // Suffix sub-states: rename in place, directory before file.
        Status::Done if decoded.collection.is_some() => {
            Ok(suffix_rename_plan(current, SUFFIX_DONE, decoded.nested))
        }
        Status::Blocked | Status::Aborted => Ok(suffix_rename_plan(
            current,
            new_status.suffix().expect("suffix status"),
            decoded.nested,
        )),

        // Standalone done: move under 3-done/_standalone/ with the suffix.
        Status::Done => {
            let standalone = work_dir.join(DIR_DONE).join(STANDALONE_DIR);
            if decoded.nested {
                let dir_name = parent.file_name().and_then(|n| n.to_str()).unwrap_or("");
                let new_dir = standalone.join(append_suffix(dir_name, SUFFIX_DONE));
                let new_file = new_dir.join(append_suffix_file(file_name, SUFFIX_DONE));
                Ok(MovePlan {
                    renames: vec![
                        (parent.to_path_buf(), new_dir.clone()),
                        (new_dir.join(file_name), new_file.clone()),
                    ],
                    target: new_file,
                })
            } else {
                let new_file = standalone.join(append_suffix_file(file_name, SUFFIX_DONE));
                Ok(MovePlan {
                    renames: vec![(current.to_path_buf(), new_file.clone())],
                    target: new_file,
                })
            }
        }

        // Resume: strip the blocked suffix in place.
        Status::InProgress if decoded.status == Status::Blocked => {
            let mut renames = Vec::new();
            let mut dir = parent.to_path_buf();
            if decoded.nested {
                let dir_name = parent.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if dir_name.contains(SUFFIX_BLOCKED) {
                    let new_dir = parent.with_file_name(strip_suffix(dir_name, SUFFIX_BLOCKED));
                    renames.push((parent.to_path_buf(), new_dir.clone()));
                    dir = new_dir;
                }
            }
            let new_file = dir.join(strip_suffix(file_name, SUFFIX_BLOCKED));
            let current_in_dir = dir.join(file_name);
            if current_in_dir != new_file {
                renames.push((current_in_dir, new_file.clone()));
            }
            Ok(MovePlan {
                renames,
                target: new_file,
            })
        }

        // Top-level directory moves: backlog -> todo -> in_progress,
        // done -> archived. Collection children move with their
        // collection directory; standalone items move alone.
        Status::Todo | Status::InProgress | Status::Archived | Status::Backlog => {
            relocate_plan(&work_dir, current, &decoded, new_status)
        }
    }
}

/// Plan a move between top-level status directories.
fn relocate_plan(
    work_dir: &Path,
    current: &Path,
    decoded: &DecodedLocation,
    new_status: Status,
) -> Result<MovePlan> {
    let target_dir = work_dir.join(new_status.directory());
    let old_dir = work_dir.join(decoded.status.directory());

    // Path of the document relative to its status directory.
    let relative = current.strip_prefix(&old_dir).map_err(|_| {
        Error::validation(format!(
            "document {} does not live under {}",
            current.display(),
            old_dir.display()
        ))
    })?;

    if let Some(collection_root) = relative.components().next() {
        let collection_name = collection_root.as_os_str().to_string_lossy();
        if decoded.collection.is_some() && collection_name.starts_with(COLLECTION_PREFIX) {
            // Move the entire collection directory; the item travels inside.
            let from = old_dir.join(collection_root.as_os_str());
            let to = target_dir.join(collection_root.as_os_str());
            let target = target_dir.join(relative);
            if from == to {
                return Ok(MovePlan::in_place(target));
            }
            return Ok(MovePlan {
                renames: vec![(from, to)],
                target,
            });
        }
    }

    // Standalone: move the item subdirectory if nested, else the file.
    // Archived standalone items come out of 3-done/_standalone/.
    let moved: &Path = if decoded.nested {
        current.parent().expect("nested item has a parent")
    } else {
        current
    };
    let name = moved
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("path {} has no filename", moved.display())))?;
    // The archive is directory-only encoding: suffixes come off on the
    // way in so decode(archived path) reads `archived`, not `done`.
    let name = if new_status == Status::Archived {
        strip_all_suffixes(name)
    } else {
        name.to_string()
    };
    let to = target_dir.join(&name);
    let target = if decoded.nested {
        let inner = current
            .file_name()
            .and_then(|n| n.to_str())
            .expect("checked above");
        let inner = if new_status == Status::Archived {
            strip_all_suffixes(inner)
        } else {
            inner.to_string()
        };
        let target = to.join(&inner);
        if inner != current.file_name().and_then(|n| n.to_str()).unwrap_or("") {
            return Ok(MovePlan {
                renames: vec![
                    (moved.to_path_buf(), to.clone()),
                    (
                        to.join(current.file_name().expect("checked above")),
                        target.clone(),
                    ),
                ],
                target,
            });
        }
        target
    } else {
        to.clone()
    };
    if moved == target_dir.join(&name) {
        return Ok(MovePlan::in_place(target));
    }
    Ok(MovePlan {
        renames: vec![(moved.to_path_buf(), to)],
        target,
    })
}

/// Plan moving an entire collection directory to another status directory.
///
/// Collections are directory-only encodings: `done` and `archived` move the
/// directory under `3-done/` / `6-archived/` with no suffix involved.
pub fn plan_collection_move(collection_dir: &Path, new_status: Status) -> Result<MovePlan> {
    let name = collection_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::validation(format!("path {} has no name", collection_dir.display()))
        })?;
    if !name.starts_with(COLLECTION_PREFIX) {
        return Err(Error::validation(format!(
            "{} is not a collection directory",
            collection_dir.display()
        )));
    }
    let parent = collection_dir.parent().ok_or_else(|| {
        Error::validation(format!("path {} has no parent", collection_dir.display()))
    })?;
    let work_dir = parent.parent().unwrap_or(Path::new(""));
    let to = work_dir.join(new_status.directory()).join(name);
    if collection_dir == to {
        return Ok(MovePlan::in_place(to));
    }
    Ok(MovePlan {
        renames: vec![(collection_dir.to_path_buf(), to.clone())],
        target: to,
    })
}

/// Suffix rename in place: directory first (when nested), then file.
fn suffix_rename_plan(current: &Path, suffix: &str, nested: bool) -> MovePlan {
    let parent = current.parent().unwrap_or(Path::new(""));
    let file_name = current
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if nested {
        let dir_name = parent.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let new_dir = parent.with_file_name(append_suffix(dir_name, suffix));
        let new_file = new_dir.join(append_suffix_file(file_name, suffix));
        MovePlan {
            renames: vec![
                (parent.to_path_buf(), new_dir.clone()),
                (new_dir.join(file_name), new_file.clone()),
            ],
            target: new_file,
        }
    } else {
        let new_file = parent.join(append_suffix_file(file_name, suffix));
        MovePlan {
            renames: vec![(current.to_path_buf(), new_file.clone())],
            target: new_file,
        }
    }
}

/// Find the `work/` directory that the status-dir segment of `path` sits in.
fn work_dir_of(path: &Path) -> Result<PathBuf> {
    let mut current = path.parent();
    while let Some(dir) = current {
        if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
            if Status::from_directory(name).is_some() {
                return Ok(dir.parent().unwrap_or(Path::new("")).to_path_buf());
            }
        }
        current = dir.parent();
    }
    Err(Error::validation(format!(
        "path {} contains no status directory segment",
        path.display()
    )))
}

/// Append a suffix to a directory name: `item-04_auth` -> `item-04_auth--done`.
pub fn append_suffix(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

/// Append a suffix to a `.md` filename before the extension.
pub fn append_suffix_file(name: &str, suffix: &str) -> String {
    match name.strip_suffix(".md") {
        Some(stem) => format!("{stem}{suffix}.md"),
        None => format!("{name}{suffix}"),
    }
}

/// Remove a suffix from a file or directory name.
pub fn strip_suffix(name: &str, suffix: &str) -> String {
    name.replace(suffix, "")
}

/// Remove whichever status suffix a name carries.
pub fn strip_all_suffixes(name: &str) -> String {
    let mut out = name.to_string();
    for suffix in [SUFFIX_DONE, SUFFIX_BLOCKED, SUFFIX_ABORTED] {
        out = out.replace(suffix, "");
    }
    out
}

//! Error taxonomy for lifecycle operations
//!
//! Every multi-step transaction validates its preconditions before mutating
//! anything, so `NotFound`/`Validation`/`GateBlocked` always mean "no side
//! effects yet". `FileOperation` can occur mid-transaction and names the
//! step that failed so a document/registry mismatch is diagnosable by hand.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Work item or collection could not be located anywhere on disk.
    #[error("{0}")]
    NotFound(String),

    /// Illegal transition, malformed header, or a similar input problem.
    /// No side effects have been performed.
    #[error("{0}")]
    Validation(String),

    /// A precondition gate failed (e.g. dirty working tree before tagging).
    /// Maps to exit code 2 so callers can distinguish "blocked" from errors.
    #[error("{0}")]
    GateBlocked(String),

    /// Backup, restore, write, or rename failed. May occur mid-transaction;
    /// `step` states what was being attempted.
    #[error("file operation failed during {step}: {source}")]
    FileOperation {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    /// A version-control command failed. When this surfaces after internal
    /// state has already been committed the operation reports it as a
    /// partial-success warning instead of propagating.
    #[error("external command `{command}` failed: {detail}")]
    ExternalCommand { command: String, detail: String },
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn file_op(step: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::FileOperation {
            step: step.into(),
            source: source.into(),
        }
    }

    pub fn external(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::ExternalCommand {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Process exit code for this error: 1 for operational errors,
    /// 2 for blocked precondition gates.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::GateBlocked(_) => 2,
            _ => 1,
        }
    }
}

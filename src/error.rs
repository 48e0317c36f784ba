//! User-facing error taxonomy.
//!
//! Command handlers return `anyhow::Result`, but the failures a user can act on
//! are raised as [`Error`] so that callers (and tests) can tell them apart with
//! `downcast_ref`.

use thiserror::Error;

use crate::clients::github::RemoteError;
use crate::clients::vault::VaultError;
use crate::history::HistoryError;

#[derive(Debug, Error)]
pub enum Error {
    /// git ran but exited non-zero.
    #[error("git {command} failed (exit status {status}): {stderr}")]
    BackendFailure {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("'{0}' does not match any branch, account, commit or recorded action")]
    NotFound(String),

    #[error("'{target}' is ambiguous: it could be {}", .interpretations.join(" or "))]
    AmbiguousTarget {
        target: String,
        interpretations: Vec<String>,
    },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Refusing to {0}")]
    Refused(String),

    #[error("Not in a Git repository. Use 'bit init' first.")]
    NotARepository,
}

//! Append-only log of state-changing actions.
//!
//! Every handler that changes repository state records an [`Action`] once git
//! reports success. `bit undo` reads the log back, reverses one record and
//! flips its `reverted` flag. Records are never removed.

use std::cell::Cell;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path;
use std::rc::Rc;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Number of commit id characters shown to users.
pub const SHORT_COMMIT_LENGTH: usize = 8;

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to {operation} action history at {}: {source}", path.display())]
    Persistence {
        operation: &'static str,
        path: path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Action history at {} is unreadable: {reason}", path.display())]
    Corrupt { path: path::PathBuf, reason: String },

    #[error("No action #{0} in history")]
    NotFound(u64),

    #[error("Action #{0} was already undone")]
    AlreadyReverted(u64),
}

/// A completed state-changing operation, with everything needed to reverse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Save {
        /// `None` for the first commit of a repository.
        prior_head: Option<String>,
        new_head: String,
        message: String,
    },
    BranchCreate {
        name: String,
        start_point: String,
    },
    BranchDelete {
        name: String,
        commit: String,
    },
    Merge {
        source: String,
        pre_merge: String,
        merge_head: String,
    },
    Push {
        remote: String,
        branch: String,
        /// Remote tip before the push; `None` if the push created the branch.
        pre_tip: Option<String>,
        pushed_tip: String,
        force: bool,
    },
    Pull {
        branch: String,
        pre_pull: String,
        rebase: bool,
    },
    Stash {
        stash_commit: String,
        message: Option<String>,
    },
    Switch {
        /// `None` if HEAD was detached.
        from_branch: Option<String>,
        from_commit: String,
        to: String,
    },
}

/// One entry of the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub sequence_id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    #[serde(default)]
    pub reverted: bool,
}

/// Durable storage for the whole log.
///
/// Stores read and write the complete record list at once; a failed `save`
/// must leave the previous contents intact.
pub trait HistoryStore {
    fn load(&self) -> Result<Vec<ActionRecord>, HistoryError>;
    fn save(&self, records: &[ActionRecord]) -> Result<(), HistoryError>;
}

/// A JSON array in a single file, replaced atomically on every write.
pub struct JsonFileStore {
    path: path::PathBuf,
}

/// In-memory store. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<Vec<ActionRecord>>>,
    read_only: Rc<Cell<bool>>,
}

/// The history log of one repository.
pub struct ActionHistory {
    store: Box<dyn HistoryStore>,
}

// -----------------------------------------------------------------------------
// Action impl

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::BranchCreate { .. } => "branch create",
            Self::BranchDelete { .. } => "branch delete",
            Self::Merge { .. } => "merge",
            Self::Push { .. } => "push",
            Self::Pull { .. } => "pull",
            Self::Stash { .. } => "stash",
            Self::Switch { .. } => "switch",
        }
    }

    /// Human-readable payload summary.
    pub fn details(&self) -> String {
        match self {
            Self::Save { message, .. } => format!("\"{message}\""),
            Self::BranchCreate { name, start_point } => {
                format!("{name} at {}", short_commit(start_point))
            }
            Self::BranchDelete { name, commit } => {
                format!("{name} (was {})", short_commit(commit))
            }
            Self::Merge { source, .. } => format!("{source} into current branch"),
            Self::Push {
                remote,
                branch,
                force,
                ..
            } => format!(
                "to {remote}/{branch}{}",
                if *force { " (force)" } else { "" }
            ),
            Self::Pull { branch, rebase, .. } => format!(
                "from {branch}{}",
                if *rebase { " (rebase)" } else { "" }
            ),
            Self::Stash { message, .. } => match message {
                Some(message) => format!("\"{message}\""),
                None => "untitled".to_string(),
            },
            Self::Switch {
                from_branch,
                from_commit,
                to,
            } => {
                let from = from_branch
                    .clone()
                    .unwrap_or_else(|| short_commit(from_commit).to_string());
                let to = if looks_like_commit(to) {
                    short_commit(to)
                } else {
                    to
                };
                format!("{from} → {to}")
            }
        }
    }

    /// Whether a user-supplied reference (branch name or commit prefix)
    /// designates this action.
    pub fn matches(&self, reference: &str) -> bool {
        match self {
            Self::Save { new_head, .. } => is_commit_prefix(reference, new_head),
            Self::BranchCreate { name, .. } | Self::BranchDelete { name, .. } => {
                name == reference
            }
            Self::Merge {
                source, merge_head, ..
            } => source == reference || is_commit_prefix(reference, merge_head),
            Self::Push {
                branch, pushed_tip, ..
            } => branch == reference || is_commit_prefix(reference, pushed_tip),
            Self::Pull { branch, .. } => branch == reference,
            Self::Stash { stash_commit, .. } => is_commit_prefix(reference, stash_commit),
            Self::Switch { to, .. } => to == reference || is_commit_prefix(reference, to),
        }
    }
}

pub fn short_commit(commit: &str) -> &str {
    &commit[..SHORT_COMMIT_LENGTH.min(commit.len())]
}

fn looks_like_commit(s: &str) -> bool {
    s.len() >= SHORT_COMMIT_LENGTH && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_commit_prefix(reference: &str, commit: &str) -> bool {
    reference.len() >= 4
        && reference.chars().all(|c| c.is_ascii_hexdigit())
        && commit.starts_with(&reference.to_ascii_lowercase())
}

// -----------------------------------------------------------------------------
// ActionRecord impl

impl ActionRecord {
    /// One-line summary, e.g. `SAVE: "fix login"`.
    pub fn summary(&self) -> String {
        format!(
            "{}: {}",
            self.action.kind().to_uppercase(),
            self.action.details()
        )
    }
}

// -----------------------------------------------------------------------------
// JsonFileStore impl

impl JsonFileStore {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }

    /// The store of the repository rooted at `repo_root`.
    ///
    /// Files are named after the repository directory plus a hash of its full
    /// path, so two checkouts with the same name keep separate logs.
    pub fn for_repository(config_dir: &path::Path, repo_root: &path::Path) -> Self {
        let digest = Sha256::digest(repo_root.to_string_lossy().as_bytes());
        let hash: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        let name = repo_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());

        Self::new(
            config_dir
                .join("history")
                .join(format!("{name}-{hash}.json")),
        )
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    fn persistence_error(&self, operation: &'static str, source: std::io::Error) -> HistoryError {
        HistoryError::Persistence {
            operation,
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ActionRecord>, HistoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(self.persistence_error("read", e)),
        };

        if contents.trim().is_empty() {
            return Ok(vec![]);
        }

        serde_json::from_str(&contents).map_err(|e| HistoryError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, records: &[ActionRecord]) -> Result<(), HistoryError> {
        let parent = self
            .path
            .parent()
            .unwrap_or_else(|| path::Path::new("."));
        fs::create_dir_all(parent).map_err(|e| self.persistence_error("write", e))?;

        // Write a sibling temp file and rename it over the log, so a failure
        // never leaves a truncated log behind
        let mut file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| self.persistence_error("write", e))?;
        serde_json::to_writer_pretty(&mut file, records)
            .map_err(|e| self.persistence_error("write", e.into()))?;
        file.flush()
            .map_err(|e| self.persistence_error("write", e))?;
        file.persist(&self.path)
            .map_err(|e| self.persistence_error("write", e.error))?;

        debug!(path = %self.path.display(), records = records.len(), "Wrote action history");
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// MemoryStore impl

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ActionRecord>) -> Self {
        let store = Self::default();
        *store.records.borrow_mut() = records;
        store
    }

    /// Make every subsequent `save` fail, as a full disk would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.records.borrow().clone()
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<Vec<ActionRecord>, HistoryError> {
        Ok(self.records.borrow().clone())
    }

    fn save(&self, records: &[ActionRecord]) -> Result<(), HistoryError> {
        if self.read_only.get() {
            return Err(HistoryError::Persistence {
                operation: "write",
                path: path::PathBuf::from("<memory>"),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "store is read-only",
                ),
            });
        }
        *self.records.borrow_mut() = records.to_vec();
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ActionHistory impl

impl ActionHistory {
    pub fn new(store: impl HistoryStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Record a completed action and return its sequence id.
    pub fn append(&self, action: Action) -> Result<u64, HistoryError> {
        let mut records = self.store.load()?;
        let sequence_id = records
            .iter()
            .map(|record| record.sequence_id)
            .max()
            .unwrap_or(0)
            + 1;

        info!(sequence_id, kind = action.kind(), "Recording action");
        records.push(ActionRecord {
            sequence_id,
            timestamp: Utc::now(),
            action,
            reverted: false,
        });
        self.store.save(&records)?;

        Ok(sequence_id)
    }

    pub fn most_recent_unreverted(&self) -> Result<Option<ActionRecord>, HistoryError> {
        self.find(|_| true)
    }

    /// The most recent unreverted record satisfying `predicate`.
    pub fn find(
        &self,
        predicate: impl Fn(&ActionRecord) -> bool,
    ) -> Result<Option<ActionRecord>, HistoryError> {
        Ok(self
            .newest_first()?
            .into_iter()
            .filter(|record| !record.reverted)
            .find(|record| predicate(record)))
    }

    pub fn mark_reverted(&self, sequence_id: u64) -> Result<(), HistoryError> {
        let mut records = self.store.load()?;
        let record = records
            .iter_mut()
            .find(|record| record.sequence_id == sequence_id)
            .ok_or(HistoryError::NotFound(sequence_id))?;

        if record.reverted {
            return Err(HistoryError::AlreadyReverted(sequence_id));
        }
        record.reverted = true;

        self.store.save(&records)
    }

    /// Up to `limit` records, most recent first, reverted ones included.
    pub fn list(&self, limit: usize) -> Result<Vec<ActionRecord>, HistoryError> {
        Ok(self.newest_first()?.into_iter().take(limit).collect())
    }

    /// Up to `limit` unreverted records, most recent first.
    pub fn unreverted(&self, limit: usize) -> Result<Vec<ActionRecord>, HistoryError> {
        Ok(self
            .newest_first()?
            .into_iter()
            .filter(|record| !record.reverted)
            .take(limit)
            .collect())
    }

    fn newest_first(&self) -> Result<Vec<ActionRecord>, HistoryError> {
        let mut records = self.store.load()?;
        records.sort_by(|a, b| b.sequence_id.cmp(&a.sequence_id));
        Ok(records)
    }
}

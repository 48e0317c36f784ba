#![allow(async_fn_in_trait)]

use std::path;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;

use crate::error::Error;

// -----------------------------------------------------------------------------
// Types

/// Raw result of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

/// Executes git commands.
#[cfg_attr(test, automock)]
pub trait Backend {
    /// Run git with the given arguments.
    ///
    /// A non-zero exit status is returned as data; only failing to start git
    /// at all is an error.
    async fn run(&self, args: Vec<String>) -> Result<BackendOutput>;
}

/// Backend that spawns the git CLI in a working directory.
#[derive(Debug, Clone)]
pub struct RealGit {
    path: path::PathBuf,
}

/// Higher-level git queries built on a [`Backend`].
pub struct Git<B> {
    backend: B,
}

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: String,
    pub path: String,
}

// -----------------------------------------------------------------------------
// BackendOutput impl

impl BackendOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

// -----------------------------------------------------------------------------
// RealGit impl

impl RealGit {
    pub fn new(path: path::PathBuf) -> Self {
        Self { path }
    }
}

impl Backend for RealGit {
    #[instrument(skip(self))]
    async fn run(&self, args: Vec<String>) -> Result<BackendOutput> {
        let output = Command::new("git")
            .current_dir(&self.path)
            .args(&args)
            .output()
            .await
            .context("Failed to execute git command. Is git installed and in PATH?")?;

        let result = BackendOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // Killed by a signal
            status: output.status.code().unwrap_or(-1),
        };
        debug!(status = result.status, "git finished");

        Ok(result)
    }
}

// -----------------------------------------------------------------------------
// StatusEntry impl

impl StatusEntry {
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }

    /// Has changes that are not staged yet.
    pub fn is_unstaged(&self) -> bool {
        self.is_untracked() || !self.code.ends_with(' ')
    }

    pub fn describe(&self) -> &'static str {
        match self.code.as_str() {
            " M" => "modified",
            " D" => "deleted",
            "??" => "untracked",
            "MM" => "modified (partially staged)",
            _ => "changed",
        }
    }
}

// -----------------------------------------------------------------------------
// Git impl

impl<B: Backend> Git<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Run git and return its raw output, whatever the exit status.
    pub async fn run(&self, args: &[&str]) -> Result<BackendOutput> {
        self.backend
            .run(args.iter().map(|arg| arg.to_string()).collect())
            .await
    }

    /// Run git and return its stdout, failing with [`Error::BackendFailure`]
    /// on a non-zero exit status.
    pub async fn checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.success() {
            // Some commands (merge conflicts) report on stdout only
            let message = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            return Err(Error::BackendFailure {
                command: args.join(" "),
                status: output.status,
                stderr: message.to_string(),
            }
            .into());
        }

        // Leading whitespace is significant in porcelain output
        Ok(output.stdout.trim_end().to_string())
    }

    pub async fn is_repository(&self) -> Result<bool> {
        Ok(self.run(&["rev-parse", "--git-dir"]).await?.success())
    }

    pub async fn repository_root(&self) -> Result<Option<path::PathBuf>> {
        let output = self.run(&["rev-parse", "--show-toplevel"]).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(path::PathBuf::from(output.stdout.trim())))
    }

    /// The checked-out branch, or `None` in detached state.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let branch = self.checked(&["branch", "--show-current"]).await?;
        Ok(Some(branch.trim().to_string()).filter(|b| !b.is_empty()))
    }

    /// The commit HEAD points at, or `None` in a repository without commits.
    pub async fn head(&self) -> Result<Option<String>> {
        self.resolve_commit("HEAD").await
    }

    pub async fn resolve_commit(&self, rev: &str) -> Result<Option<String>> {
        let output = self
            .run(&["rev-parse", "--verify", "-q", &format!("{rev}^{{commit}}")])
            .await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    /// Whether `commit` is present in the local object database.
    pub async fn has_commit(&self, commit: &str) -> Result<bool> {
        Ok(self
            .run(&["cat-file", "-e", &format!("{commit}^{{commit}}")])
            .await?
            .success())
    }

    /// The commit a local branch points at.
    pub async fn branch_tip(&self, branch: &str) -> Result<Option<String>> {
        self.resolve_commit(&format!("refs/heads/{branch}")).await
    }

    pub async fn local_branches(&self) -> Result<Vec<String>> {
        let output = self
            .checked(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .await?;
        Ok(non_empty_lines(&output))
    }

    /// Remote-tracking branches of `remote`, with the "<remote>/" prefix stripped.
    pub async fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let output = self
            .checked(&[
                "for-each-ref",
                "--format=%(refname:short)",
                &format!("refs/remotes/{remote}"),
            ])
            .await?;
        let prefix = format!("{remote}/");

        Ok(output
            .lines()
            .filter_map(|line| line.trim().strip_prefix(&prefix))
            .filter(|branch| *branch != "HEAD")
            .map(|branch| branch.to_string())
            .collect())
    }

    pub async fn status(&self) -> Result<Vec<StatusEntry>> {
        let output = self.checked(&["status", "--porcelain"]).await?;

        Ok(output
            .lines()
            .filter(|line| line.len() > 3)
            .map(|line| StatusEntry {
                code: line[..2].to_string(),
                path: line[3..].to_string(),
            })
            .collect())
    }

    pub async fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(!self.status().await?.is_empty())
    }

    pub async fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        let output = self.run(&["remote", "get-url", remote]).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    /// The commit `branch` currently points at on `remote`, asking the remote
    /// itself rather than trusting the remote-tracking ref.
    pub async fn remote_tip(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let output = self
            .checked(&["ls-remote", remote, &format!("refs/heads/{branch}")])
            .await?;

        Ok(output
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .map(|commit| commit.to_string()))
    }

    pub async fn merged_branches(&self) -> Result<Vec<String>> {
        let output = self
            .checked(&["branch", "--merged", "--format=%(refname:short)"])
            .await?;
        Ok(non_empty_lines(&output))
    }

    /// Commit ids of the stash entries, newest first (`stash@{0}` first).
    pub async fn stash_commits(&self) -> Result<Vec<String>> {
        let output = self.checked(&["stash", "list", "--format=%H"]).await?;
        Ok(non_empty_lines(&output))
    }
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

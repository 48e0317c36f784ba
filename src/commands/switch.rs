use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::App;
use crate::app::ORIGIN;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::error::Error;
use crate::history::Action;
use crate::history::short_commit;
use crate::prompt::Prompter;
use crate::ui;

static COMMIT_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid regex"));

/// What `bit switch <target>` resolved the target to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchTarget {
    Branch,
    Account,
    Commit,
}

impl SwitchTarget {
    fn describe(&self, target: &str) -> String {
        match self {
            Self::Branch => format!("branch '{target}'"),
            Self::Account => format!("account '{target}'"),
            Self::Commit => format!("commit '{target}'"),
        }
    }
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_switch(
        &mut self,
        target: &str,
        create: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.require_repository().await?;

        if create {
            return self.create_and_switch(target, stdout).await;
        }

        match self.resolve_switch_target(target).await? {
            SwitchTarget::Branch => self.switch_to_branch(target, stdout).await,
            SwitchTarget::Commit => self.switch_to_commit(target, stdout).await,
            SwitchTarget::Account => self.switch_account(target, stdout).await,
        }
    }

    /// Classify `target`; it must be exactly one of a branch (local or on
    /// origin), a configured account, or a commit-like id.
    pub(crate) async fn resolve_switch_target(&self, target: &str) -> Result<SwitchTarget> {
        let is_branch = self.git.local_branches().await?.iter().any(|b| b == target)
            || self
                .git
                .remote_branches(ORIGIN)
                .await?
                .iter()
                .any(|b| b == target);
        let is_account = self.config.accounts.contains_key(target);
        let is_commit = COMMIT_LIKE_RE.is_match(target);

        let matches: Vec<SwitchTarget> = [
            (is_branch, SwitchTarget::Branch),
            (is_account, SwitchTarget::Account),
            (is_commit, SwitchTarget::Commit),
        ]
        .into_iter()
        .filter_map(|(hit, kind)| hit.then_some(kind))
        .collect();
        debug!(target, ?matches, "Resolved switch target");

        match matches.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(Error::NotFound(target.to_string()).into()),
            _ => Err(Error::AmbiguousTarget {
                target: target.to_string(),
                interpretations: matches.iter().map(|kind| kind.describe(target)).collect(),
            }
            .into()),
        }
    }

    /// Create `branch` at HEAD and switch to it, recording both steps.
    pub(crate) async fn create_and_switch(
        &self,
        branch: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let from_branch = self.git.current_branch().await?;
        let from_commit = self.require_head().await?;

        self.git.checked(&["switch", "-c", branch]).await?;

        self.record(Action::BranchCreate {
            name: branch.to_string(),
            start_point: from_commit.clone(),
        })?;
        self.record(Action::Switch {
            from_branch,
            from_commit,
            to: branch.to_string(),
        })?;
        ui::success(stdout, format!("Created and switched to branch '{branch}'"))?;

        Ok(())
    }

    pub(crate) async fn switch_to_branch(
        &self,
        branch: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let from_branch = self.git.current_branch().await?;
        if from_branch.as_deref() == Some(branch) {
            ui::info(stdout, format!("Already on '{branch}'"))?;
            return Ok(());
        }
        let from_commit = self.require_head().await?;

        self.git.checked(&["switch", branch]).await?;

        self.record(Action::Switch {
            from_branch,
            from_commit,
            to: branch.to_string(),
        })?;
        ui::success(stdout, format!("Switched to branch '{branch}'"))?;

        Ok(())
    }

    async fn switch_to_commit(&self, commit: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        let from_branch = self.git.current_branch().await?;
        let from_commit = self.require_head().await?;

        self.git.checked(&["switch", "--detach", commit]).await?;
        let to = self.require_head().await?;

        self.record(Action::Switch {
            from_branch,
            from_commit,
            to: to.clone(),
        })?;
        ui::success(stdout, format!("Switched to commit {}", short_commit(&to)))?;
        ui::warning(
            stdout,
            "You are now in detached HEAD state. New saves will not belong to any branch unless you create one with 'bit switch -c <name>'.",
        )?;

        Ok(())
    }

    /// Accounts are configuration, not repository state: nothing is recorded.
    async fn switch_account(&mut self, alias: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        let account = self.config.set_current_account(alias)?;
        ui::success(
            stdout,
            format!("Switched to account '{alias}' ({})", account.name),
        )?;

        self.git.checked(&["config", "user.name", &account.name]).await?;
        self.git.checked(&["config", "user.email", &account.email]).await?;
        if let Some(key) = &account.ssh_key {
            let ssh_command = format!("ssh -i {key} -o IdentitiesOnly=yes");
            self.git
                .checked(&["config", "core.sshCommand", &ssh_command])
                .await?;
        }
        ui::info(stdout, "Updated git user configuration for this repository")?;

        Ok(())
    }
}

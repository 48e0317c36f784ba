use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::app::ORIGIN;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault;
use crate::clients::vault::Vault;
use crate::prompt::Prompter;
use crate::ui;

/// Saves shown by `bit list` without arguments.
const RECENT_SAVES: usize = 5;
const SAVES: usize = 10;
const HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListKind {
    Branches,
    Saves,
    Remotes,
    Accounts,
    History,
    Stashes,
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Read-only views. Without a kind: branches, recent saves and accounts.
    pub async fn cmd_list(
        &self,
        kind: Option<ListKind>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        if kind != Some(ListKind::Accounts) {
            self.require_repository().await?;
        }

        match kind {
            None => {
                self.list_branches(stdout).await?;
                writeln!(stdout)?;
                self.list_saves(RECENT_SAVES, stdout).await?;
                writeln!(stdout)?;
                self.list_accounts(stdout)?;
            }
            Some(ListKind::Branches) => self.list_branches(stdout).await?,
            Some(ListKind::Saves) => self.list_saves(SAVES, stdout).await?,
            Some(ListKind::Remotes) => self.list_remotes(stdout).await?,
            Some(ListKind::Accounts) => self.list_accounts(stdout)?,
            Some(ListKind::History) => self.cmd_history(HISTORY, stdout).await?,
            Some(ListKind::Stashes) => self.list_stashes(stdout).await?,
        }

        Ok(())
    }

    async fn list_branches(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let current = self.git.current_branch().await?;
        let local = self.git.local_branches().await?;
        let remote = self.git.remote_branches(ORIGIN).await?;

        if local.is_empty() && remote.is_empty() {
            ui::info(stdout, "No branches found.")?;
            return Ok(());
        }

        ui::heading(stdout, "Branches")?;
        for branch in &local {
            if current.as_ref() == Some(branch) {
                writeln!(stdout, "{} {} (current)", "✓".green(), branch.bold())?;
            } else {
                writeln!(stdout, "  {branch}")?;
            }
        }
        for branch in &remote {
            writeln!(stdout, "  {}", format!("{ORIGIN}/{branch}").dimmed())?;
        }

        Ok(())
    }

    async fn list_saves(&self, limit: usize, stdout: &mut impl std::io::Write) -> Result<()> {
        if self.git.head().await?.is_none() {
            ui::info(stdout, "No saves yet.")?;
            return Ok(());
        }

        let output = self
            .git
            .checked(&[
                "log",
                &format!("-{limit}"),
                "--pretty=format:%h|%an|%ar|%s",
            ])
            .await?;

        ui::heading(stdout, "Recent Saves")?;
        for line in output.lines() {
            let mut parts = line.splitn(4, '|');
            if let (Some(hash), Some(author), Some(when), Some(subject)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            {
                writeln!(
                    stdout,
                    "  {} {} {} {}",
                    hash.yellow(),
                    subject,
                    author.green(),
                    format!("({when})").dimmed()
                )?;
            }
        }

        Ok(())
    }

    async fn list_remotes(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let output = self.git.checked(&["remote", "-v"]).await?;
        if output.trim().is_empty() {
            ui::info(stdout, "No remotes configured.")?;
            return Ok(());
        }

        ui::heading(stdout, "Remotes")?;
        for line in output.lines() {
            writeln!(stdout, "  {line}")?;
        }

        Ok(())
    }

    fn list_accounts(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        if self.config.accounts.is_empty() {
            ui::info(stdout, "No accounts configured.")?;
            return Ok(());
        }

        ui::heading(stdout, "Accounts")?;
        for (alias, account) in &self.config.accounts {
            let marker = if self.config.current_account.as_ref() == Some(alias) {
                "✓".green()
            } else {
                " ".normal()
            };
            // A keychain error only hides the marker
            let has_token = matches!(self.vault.get(vault::SERVICE, alias), Ok(Some(_)));
            writeln!(
                stdout,
                "{} {}: {} <{}>{}",
                marker,
                alias,
                account.name,
                account.email,
                if has_token { " [token stored]" } else { "" }
            )?;
        }

        Ok(())
    }

    async fn list_stashes(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let output = self.git.checked(&["stash", "list"]).await?;
        if output.trim().is_empty() {
            ui::info(stdout, "No stashes found.")?;
            return Ok(());
        }

        ui::heading(stdout, "Stashes")?;
        for line in output.lines() {
            writeln!(stdout, "  {line}")?;
        }

        Ok(())
    }
}

use anyhow::Result;
use tracing::debug;
use tracing::info;

use crate::App;
use crate::app::ORIGIN;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::confirm;
use crate::confirm::SafetyTier;
use crate::history::Action;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_push(&self, force: bool, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let branch = self.require_branch("push").await?;

        if force
            && !confirm::confirm(
                &self.prompter,
                SafetyTier::Extreme,
                &format!("Force push '{branch}'?"),
                &branch,
                stdout,
            )?
        {
            ui::info(stdout, "Push cancelled.")?;
            return Ok(());
        }

        self.push_and_record(&branch, force, stdout).await
    }

    /// Push `branch` to origin and record the remote tip it replaced.
    pub(crate) async fn push_and_record(
        &self,
        branch: &str,
        force: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let pushed_tip = self.require_head().await?;
        // Ask the remote itself; the remote-tracking ref may be stale
        let pre_tip = self.git.remote_tip(ORIGIN, branch).await?;

        if pre_tip.as_deref() == Some(pushed_tip.as_str()) {
            ui::info(stdout, format!("'{branch}' is already up to date on {ORIGIN}"))?;
            return Ok(());
        }

        // Undoing a force push re-pushes the overwritten tip, so it must be local
        if let Some(pre_tip) = pre_tip.as_deref().filter(|_| force) {
            if !self.git.has_commit(pre_tip).await? {
                debug!(branch, pre_tip, "Fetching remote tip before overwriting it");
                self.git.checked(&["fetch", ORIGIN, branch]).await?;
            }
        }

        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.extend(["-u", ORIGIN, branch]);
        self.git.checked(&args).await?;
        info!(branch, force, "Pushed");

        self.record(Action::Push {
            remote: ORIGIN.to_string(),
            branch: branch.to_string(),
            pre_tip,
            pushed_tip,
            force,
        })?;

        if force {
            ui::success(stdout, format!("Force pushed '{branch}' to {ORIGIN}"))?;
        } else {
            ui::success(stdout, format!("Pushed '{branch}' to {ORIGIN}"))?;
        }
        Ok(())
    }
}

use anyhow::Result;
use log::warn;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// `pull --rebase`, then push. Each step is recorded on its own, so they
    /// are undone separately.
    pub async fn cmd_sync(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let branch = self.require_branch("sync").await?;

        ui::info(stdout, "Pulling latest changes...")?;
        self.pull_and_record(&branch, true, stdout).await?;

        ui::info(stdout, "Pushing changes...")?;
        if let Err(e) = self.push_and_record(&branch, false, stdout).await {
            warn!("Push during sync failed: {e:#}");
            ui::warning(stdout, format!("Push failed: {e}"))?;
        }

        ui::success(stdout, "Sync completed")?;
        Ok(())
    }
}

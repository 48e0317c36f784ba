use anyhow::Result;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::history::Action;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_stash(
        &self,
        message: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.require_repository().await?;

        if !self.git.has_uncommitted_changes().await? {
            ui::info(stdout, "No changes to stash.")?;
            return Ok(());
        }

        let before = self.git.stash_commits().await?.into_iter().next();
        match message {
            Some(message) => self.git.checked(&["stash", "push", "-m", message]).await?,
            None => self.git.checked(&["stash", "push"]).await?,
        };
        let after = self.git.stash_commits().await?.into_iter().next();

        // Only untracked files: git succeeds without creating an entry
        let Some(stash_commit) = after.filter(|after| Some(after) != before.as_ref()) else {
            ui::info(stdout, "Nothing was stashed (untracked files are left alone).")?;
            return Ok(());
        };

        self.record(Action::Stash {
            stash_commit,
            message: message.map(str::to_string),
        })?;
        ui::success(stdout, "Stashed uncommitted changes")?;

        Ok(())
    }
}

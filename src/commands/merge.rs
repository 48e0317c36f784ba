use anyhow::Result;
use anyhow::bail;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::history::Action;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Merge `source` into the current branch.
    pub async fn cmd_merge(&self, source: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let branch = self.require_branch("merge").await?;
        if branch == source {
            bail!("Cannot merge '{}' into itself.", source);
        }

        let pre_merge = self.require_head().await?;
        self.git.checked(&["merge", source]).await?;
        let merge_head = self.require_head().await?;

        if merge_head == pre_merge {
            ui::info(stdout, "Already up to date.")?;
            return Ok(());
        }

        self.record(Action::Merge {
            source: source.to_string(),
            pre_merge,
            merge_head,
        })?;
        ui::success(stdout, format!("Merged '{source}' into '{branch}'"))?;

        Ok(())
    }
}

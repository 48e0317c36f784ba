use anyhow::Result;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::confirm;
use crate::confirm::SafetyTier;
use crate::error::Error;
use crate::history::Action;
use crate::history::short_commit;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Delete a local branch, keeping its tip in the history so it can be
    /// restored with `bit undo <branch>`.
    pub async fn cmd_delete(&self, branch: &str, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        let Some(commit) = self.git.branch_tip(branch).await? else {
            return Err(Error::NotFound(branch.to_string()).into());
        };
        if self.git.current_branch().await?.as_deref() == Some(branch) {
            return Err(Error::Refused(format!(
                "delete '{branch}' while it is checked out; switch to another branch first"
            ))
            .into());
        }

        if !confirm::confirm(
            &self.prompter,
            SafetyTier::Medium,
            &format!("Delete branch '{branch}'?"),
            branch,
            stdout,
        )? {
            ui::info(stdout, "Deletion cancelled.")?;
            return Ok(());
        }

        self.git.checked(&["branch", "-D", branch]).await?;

        self.record(Action::BranchDelete {
            name: branch.to_string(),
            commit: commit.clone(),
        })?;
        ui::success(
            stdout,
            format!(
                "Deleted branch '{branch}' (was {}). Restore it with 'bit undo {branch}'",
                short_commit(&commit)
            ),
        )?;

        Ok(())
    }
}

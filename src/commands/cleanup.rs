use anyhow::Result;
use log::info;

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
    /// Delete merged branches, prune stale remote-tracking branches, run gc.
    pub async fn cmd_cleanup(&self, dry_run: bool, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        let current = self.git.current_branch().await?;
        let merged: Vec<String> = self
            .git
            .merged_branches()
            .await?
            .into_iter()
            .filter(|branch| !self.config.is_protected(branch))
            .filter(|branch| current.as_ref() != Some(branch))
            .collect();
        let has_origin = self.git.remote_url(ORIGIN).await?.is_some();

        if dry_run {
            ui::info(stdout, "Dry run: showing what would be cleaned")?;
            writeln!(stdout, "Delete merged branches:")?;
            if merged.is_empty() {
                writeln!(stdout, "  (none)")?;
            }
            for branch in &merged {
                writeln!(stdout, "  - {branch}")?;
            }
            if has_origin {
                let stale = self
                    .git
                    .checked(&["remote", "prune", ORIGIN, "--dry-run"])
                    .await?;
                writeln!(stdout, "Prune stale remote-tracking branches:")?;
                if stale.trim().is_empty() {
                    writeln!(stdout, "  (none)")?;
                }
                for line in stale.lines().filter(|line| line.contains("[would prune]")) {
                    writeln!(stdout, "  - {}", line.trim())?;
                }
            }
            writeln!(stdout, "Run garbage collection")?;
            return Ok(());
        }

        if !merged.is_empty()
            && confirm::confirm(
                &self.prompter,
                SafetyTier::Medium,
                &format!("Delete {} merged branches?", merged.len()),
                "",
                stdout,
            )?
        {
            for branch in &merged {
                let Some(commit) = self.git.branch_tip(branch).await? else {
                    continue;
                };
                self.git.checked(&["branch", "-d", branch]).await?;
                self.record(Action::BranchDelete {
                    name: branch.clone(),
                    commit,
                })?;
                writeln!(stdout, "  Deleted branch: {branch}")?;
            }
        }

        if has_origin {
            self.git.checked(&["remote", "prune", ORIGIN]).await?;
            writeln!(stdout, "  Pruned stale remote-tracking branches")?;
        }

        self.git.checked(&["gc", "--quiet"]).await?;
        writeln!(stdout, "  Ran garbage collection")?;
        info!("Cleanup finished, {} merged branches found", merged.len());

        ui::success(stdout, "Cleanup completed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::testing::Mocks;
    use crate::testing::missing;

    const MERGED: &[&str] = &["branch", "--merged", "--format=%(refname:short)"];

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let mut mocks = Mocks::in_repository();
        mocks
            .git(&["branch", "--show-current"], "feat\n")
            .git(MERGED, "main\ndevelop\nfeat\nold-fix\n")
            .git(&["remote", "get-url", "origin"], "git@github.com:octo/app.git\n")
            .git(
                &["remote", "prune", "origin", "--dry-run"],
                "Pruning origin\nURL: git@github.com:octo/app.git\n * [would prune] origin/gone\n",
            );
        let (app, store) = mocks.into_app();

        let mut stdout = Vec::new();
        app.cmd_cleanup(true, &mut stdout).await.unwrap();

        assert_snapshot!(String::from_utf8(stdout).unwrap(), @r"
        i Dry run: showing what would be cleaned
        Delete merged branches:
          - old-fix
        Prune stale remote-tracking branches:
          - * [would prune] origin/gone
        Run garbage collection
        ");
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_records_each_deleted_branch() {
        let mut mocks = Mocks::in_repository();
        mocks
            .git(&["branch", "--show-current"], "main\n")
            .git(MERGED, "main\nold-fix\nold-docs\n")
            .git_output(&["remote", "get-url", "origin"], missing())
            .git(
                &["rev-parse", "--verify", "-q", "refs/heads/old-fix^{commit}"],
                "aaaa1111\n",
            )
            .git(&["branch", "-d", "old-fix"], "")
            .git(
                &["rev-parse", "--verify", "-q", "refs/heads/old-docs^{commit}"],
                "bbbb2222\n",
            )
            .git(&["branch", "-d", "old-docs"], "")
            .git(&["gc", "--quiet"], "");
        mocks.prompter.expect_confirm().returning(|_, _| Ok(true));
        let (app, store) = mocks.into_app();

        let mut stdout = Vec::new();
        app.cmd_cleanup(false, &mut stdout).await.unwrap();

        assert_snapshot!(String::from_utf8(stdout).unwrap(), @r"
          Deleted branch: old-fix
          Deleted branch: old-docs
          Ran garbage collection
        ✓ Cleanup completed
        ");
        let deleted: Vec<_> = store
            .records()
            .iter()
            .map(|r| r.action.details())
            .collect();
        assert_eq!(
            deleted,
            vec!["old-fix (was aaaa1111)", "old-docs (was bbbb2222)"]
        );
    }
}

use anyhow::Result;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::history::Action;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_pull(&self, rebase: bool, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let branch = self.require_branch("pull").await?;

        self.pull_and_record(&branch, rebase, stdout).await
    }

    /// Pull into `branch`, recording where it was if anything changed.
    pub(crate) async fn pull_and_record(
        &self,
        branch: &str,
        rebase: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let pre_pull = self.require_head().await?;

        if rebase {
            self.git.checked(&["pull", "--rebase"]).await?;
        } else {
            self.git.checked(&["pull"]).await?;
        }

        if self.require_head().await? == pre_pull {
            ui::info(stdout, "Already up to date.")?;
            return Ok(());
        }

        self.record(Action::Pull {
            branch: branch.to_string(),
            pre_pull,
            rebase,
        })?;
        ui::success(stdout, "Pulled changes from remote")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::history::Action;
    use crate::testing::Mocks;

    const HEAD: &[&str] = &["rev-parse", "--verify", "-q", "HEAD^{commit}"];

    #[tokio::test]
    async fn test_pull_records_pre_pull_head() {
        let mut mocks = Mocks::in_repository();
        mocks
            .git(&["branch", "--show-current"], "main\n")
            .git(HEAD, "aaaa1111\n")
            .git(&["pull", "--rebase"], "")
            .git(HEAD, "bbbb2222\n");
        let (app, store) = mocks.into_app();

        app.cmd_pull(true, &mut Vec::new()).await.unwrap();

        assert_eq!(
            store.records()[0].action,
            Action::Pull {
                branch: "main".to_string(),
                pre_pull: "aaaa1111".to_string(),
                rebase: true,
            }
        );
    }

    #[tokio::test]
    async fn test_pull_without_changes_records_nothing() {
        let mut mocks = Mocks::in_repository();
        mocks
            .git(&["branch", "--show-current"], "main\n")
            .git(HEAD, "aaaa1111\n")
            .git(&["pull"], "Already up to date.\n")
            .git(HEAD, "aaaa1111\n");
        let (app, store) = mocks.into_app();

        let mut stdout = Vec::new();
        app.cmd_pull(false, &mut stdout).await.unwrap();

        assert_snapshot!(String::from_utf8(stdout).unwrap(), @"i Already up to date.");
        assert!(store.records().is_empty());
    }
}

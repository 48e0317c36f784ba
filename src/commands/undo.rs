use anyhow::Result;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::history::short_commit;
use crate::prompt::Prompter;
use crate::ui;
use crate::undo::UndoOutcome;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_undo(
        &self,
        target: Option<&str>,
        interactive: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.require_repository().await?;

        let outcome = self
            .undo_dispatcher()
            .undo(target, interactive, stdout)
            .await?;

        match outcome {
            UndoOutcome::Reverted(record) => {
                ui::success(stdout, format!("Undid {}", record.summary()))?;
            }
            UndoOutcome::ReversedUntracked { branch, commit } => {
                ui::success(
                    stdout,
                    format!("Deleted branch '{branch}' (was {})", short_commit(&commit)),
                )?;
            }
            UndoOutcome::BookkeepingFailed { record, error } => {
                ui::warning(
                    stdout,
                    format!(
                        "Undid {}, but history bookkeeping failed: {error}",
                        record.summary()
                    ),
                )?;
            }
            UndoOutcome::AlreadyReverted(record) => {
                ui::warning(
                    stdout,
                    format!(
                        "Undid {}, but it was already marked as undone",
                        record.summary()
                    ),
                )?;
            }
            UndoOutcome::Aborted => ui::info(stdout, "Undo cancelled.")?,
            UndoOutcome::Cancelled => ui::info(stdout, "Nothing selected.")?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use crate::error::Error;
    use crate::history::Action;
    use crate::history::ActionHistory;
    use crate::testing::Mocks;

    #[tokio::test]
    async fn test_undo_reports_reversed_action() {
        let mut mocks = Mocks::in_repository();
        ActionHistory::new(mocks.store.clone())
            .append(Action::BranchDelete {
                name: "feat".to_string(),
                commit: "cccc3333cccc3333".to_string(),
            })
            .unwrap();
        mocks.git(&["branch", "feat", "cccc3333cccc3333"], "");
        let (app, store) = mocks.into_app();

        let mut stdout = Vec::new();
        app.cmd_undo(None, false, &mut stdout).await.unwrap();

        assert_snapshot!(String::from_utf8(stdout).unwrap(), @"✓ Undid BRANCH DELETE: feat (was cccc3333)");
        assert!(store.records()[0].reverted);
    }

    #[tokio::test]
    async fn test_declined_undo_is_cancelled() {
        let mut mocks = Mocks::in_repository();
        ActionHistory::new(mocks.store.clone())
            .append(Action::Merge {
                source: "feat".to_string(),
                pre_merge: "aaaa1111".to_string(),
                merge_head: "bbbb2222".to_string(),
            })
            .unwrap();
        mocks
            .prompter
            .expect_confirm()
            .returning(|_, _| Ok(false));
        let (app, store) = mocks.into_app();

        let mut stdout = Vec::new();
        app.cmd_undo(Some("feat"), false, &mut stdout).await.unwrap();

        assert_snapshot!(String::from_utf8(stdout).unwrap(), @r"
        ! This discards commits and uncommitted changes in your working tree.
        i Undo cancelled.
        ");
        assert!(!store.records()[0].reverted);
    }

    #[tokio::test]
    async fn test_empty_history() {
        let (app, _) = Mocks::in_repository().into_app();

        let err = app.cmd_undo(None, false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NothingToUndo)));
    }
}

//! Reversal of recorded actions.
//!
//! [`inverse_of`] maps every [`Action`] kind to the git commands that reverse
//! it and the [`SafetyTier`] of doing so. [`UndoDispatcher`] picks the record
//! to reverse, runs it through the confirmation gate, executes the inverse and
//! flips the record's `reverted` flag. One invocation reverses exactly one
//! record.

use std::io;

use anyhow::Result;
use chrono::Utc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clients::git::Backend;
use crate::clients::git::Git;
use crate::confirm;
use crate::confirm::SafetyTier;
use crate::error::Error;
use crate::history::Action;
use crate::history::ActionHistory;
use crate::history::ActionRecord;
use crate::history::HistoryError;
use crate::history::short_commit;
use crate::prompt::Prompter;
use crate::ui;

/// How many records interactive undo offers.
pub const INTERACTIVE_CANDIDATES: usize = 20;

// -----------------------------------------------------------------------------
// Types

/// The git commands that reverse an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inverse {
    pub tier: SafetyTier,
    /// Run in order; the first failure stops the undo.
    pub steps: Vec<Vec<String>>,
    /// The name a user must type when the tier is Extreme.
    pub target: String,
}

#[derive(Debug)]
pub enum UndoOutcome {
    /// The record was reversed and marked reverted.
    Reverted(ActionRecord),
    /// A branch that no record accounts for was deleted on request.
    ReversedUntracked { branch: String, commit: String },
    /// The inverse ran but the history could not be updated.
    BookkeepingFailed { record: ActionRecord, error: String },
    /// The inverse ran, but another invocation had already flipped the record.
    AlreadyReverted(ActionRecord),
    /// The user declined the confirmation.
    Aborted,
    /// The user left the interactive selection.
    Cancelled,
}

pub struct UndoDispatcher<'a, B, P> {
    git: &'a Git<B>,
    history: &'a ActionHistory,
    prompter: &'a P,
}

// -----------------------------------------------------------------------------
// Inverse table

fn args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

pub fn inverse_of(action: &Action) -> Inverse {
    match action {
        Action::Save {
            prior_head: Some(prior_head),
            ..
        } => Inverse {
            tier: SafetyTier::Medium,
            steps: vec![args(&["reset", "--soft", prior_head])],
            target: prior_head.clone(),
        },
        // The first commit has no parent to reset to
        Action::Save {
            prior_head: None,
            new_head,
            ..
        } => Inverse {
            tier: SafetyTier::Medium,
            steps: vec![args(&["update-ref", "-d", "HEAD"])],
            target: new_head.clone(),
        },
        Action::BranchCreate { name, .. } => Inverse {
            tier: SafetyTier::Medium,
            steps: vec![args(&["branch", "-D", name])],
            target: name.clone(),
        },
        Action::BranchDelete { name, commit } => Inverse {
            tier: SafetyTier::Low,
            steps: vec![args(&["branch", name, commit])],
            target: name.clone(),
        },
        Action::Merge { pre_merge, .. } => Inverse {
            tier: SafetyTier::High,
            steps: vec![args(&["reset", "--hard", pre_merge])],
            target: pre_merge.clone(),
        },
        Action::Push {
            remote,
            branch,
            pre_tip: Some(pre_tip),
            ..
        } => Inverse {
            tier: SafetyTier::Extreme,
            steps: vec![args(&[
                "push",
                "--force",
                remote,
                &format!("{pre_tip}:refs/heads/{branch}"),
            ])],
            target: branch.clone(),
        },
        // The push created the branch on the remote
        Action::Push {
            remote,
            branch,
            pre_tip: None,
            ..
        } => Inverse {
            tier: SafetyTier::Extreme,
            steps: vec![args(&["push", remote, "--delete", branch])],
            target: branch.clone(),
        },
        Action::Pull {
            branch, pre_pull, ..
        } => Inverse {
            tier: SafetyTier::High,
            steps: vec![args(&["reset", "--hard", pre_pull])],
            target: branch.clone(),
        },
        Action::Stash { stash_commit, .. } => Inverse {
            tier: SafetyTier::Low,
            steps: vec![args(&["stash", "apply", stash_commit])],
            target: stash_commit.clone(),
        },
        Action::Switch {
            from_branch: Some(from_branch),
            ..
        } => Inverse {
            tier: SafetyTier::Low,
            steps: vec![args(&["switch", from_branch])],
            target: from_branch.clone(),
        },
        Action::Switch {
            from_branch: None,
            from_commit,
            ..
        } => Inverse {
            tier: SafetyTier::Low,
            steps: vec![args(&["switch", "--detach", from_commit])],
            target: from_commit.clone(),
        },
    }
}

// -----------------------------------------------------------------------------
// UndoDispatcher impl

impl<'a, B: Backend, P: Prompter> UndoDispatcher<'a, B, P> {
    pub fn new(git: &'a Git<B>, history: &'a ActionHistory, prompter: &'a P) -> Self {
        Self {
            git,
            history,
            prompter,
        }
    }

    /// Undo the most recent action, the action `target` refers to, or one the
    /// user picks when `interactive` is set.
    pub async fn undo(
        &self,
        target: Option<&str>,
        interactive: bool,
        stdout: &mut impl io::Write,
    ) -> Result<UndoOutcome> {
        if interactive {
            return self.undo_interactive(stdout).await;
        }

        let Some(target) = target else {
            let record = self
                .history
                .most_recent_unreverted()?
                .ok_or(Error::NothingToUndo)?;
            return self.reverse(record, stdout).await;
        };

        if let Some(record) = self.history.find(|record| record.action.matches(target))? {
            debug!(sequence_id = record.sequence_id, target, "Target matches recorded action");
            return self.reverse(record, stdout).await;
        }

        // Not in the history: treat it as "delete this branch now"
        if let Some(commit) = self.git.branch_tip(target).await? {
            return self.delete_untracked_branch(target, commit, stdout).await;
        }

        Err(Error::NotFound(target.to_string()).into())
    }

    async fn undo_interactive(&self, stdout: &mut impl io::Write) -> Result<UndoOutcome> {
        let candidates = self.history.unreverted(INTERACTIVE_CANDIDATES)?;
        if candidates.is_empty() {
            return Err(Error::NothingToUndo.into());
        }

        let now = Utc::now();
        let items: Vec<String> = candidates
            .iter()
            .map(|record| {
                format!(
                    "{} ({})",
                    record.summary(),
                    ui::relative_time(record.timestamp, now)
                )
            })
            .collect();

        match self.prompter.select("Select an action to undo", &items)? {
            Some(index) => match candidates.into_iter().nth(index) {
                Some(record) => self.reverse(record, stdout).await,
                None => Ok(UndoOutcome::Cancelled),
            },
            None => Ok(UndoOutcome::Cancelled),
        }
    }

    async fn reverse(
        &self,
        record: ActionRecord,
        stdout: &mut impl io::Write,
    ) -> Result<UndoOutcome> {
        let inverse = inverse_of(&record.action);
        self.check_preconditions(&record.action).await?;

        let question = format!("Undo {}?", record.summary());
        if !confirm::confirm(self.prompter, inverse.tier, &question, &inverse.target, stdout)? {
            return Ok(UndoOutcome::Aborted);
        }

        self.prepare_inverse(&record.action).await?;
        for step in &inverse.steps {
            let step: Vec<&str> = step.iter().map(String::as_str).collect();
            self.git.checked(&step).await?;
        }
        // The inverse has taken effect; from here on problems are only warnings
        self.finish_inverse(&record.action, stdout).await;

        info!(sequence_id = record.sequence_id, "Reversed action");
        match self.history.mark_reverted(record.sequence_id) {
            Ok(()) => Ok(UndoOutcome::Reverted(record)),
            Err(HistoryError::AlreadyReverted(_)) => Ok(UndoOutcome::AlreadyReverted(record)),
            Err(e) => Ok(UndoOutcome::BookkeepingFailed {
                record,
                error: e.to_string(),
            }),
        }
    }

    async fn check_preconditions(&self, action: &Action) -> Result<()> {
        match action {
            Action::BranchCreate { name, .. } => self.refuse_if_checked_out(name).await,
            // Resetting moves whatever is checked out, so it must still be the save
            Action::Save {
                new_head, message, ..
            } => match self.git.head().await? {
                Some(head) if head == *new_head => Ok(()),
                head => Err(Error::Refused(format!(
                    "undo save \"{message}\": HEAD is at {} instead of the saved commit {}",
                    head.as_deref().map(short_commit).unwrap_or("nothing"),
                    short_commit(new_head)
                ))
                .into()),
            },
            _ => Ok(()),
        }
    }

    /// Work the inverse depends on, done after confirmation.
    async fn prepare_inverse(&self, action: &Action) -> Result<()> {
        // A force push may have overwritten a commit this clone never had
        if let Action::Push {
            remote,
            pre_tip: Some(pre_tip),
            ..
        } = action
        {
            if !self.git.has_commit(pre_tip).await? {
                debug!(%pre_tip, "Fetching overwritten remote tip");
                self.git.checked(&["fetch", remote, pre_tip]).await?;
            }
        }
        Ok(())
    }

    /// Follow-up work after the inverse commands succeeded. Never fails:
    /// the record must still be marked reverted afterwards.
    async fn finish_inverse(&self, action: &Action, stdout: &mut impl io::Write) {
        // Applying a stash keeps the entry; drop it if it is still listed
        if let Action::Stash { stash_commit, .. } = action {
            if let Err(e) = self.drop_applied_stash(stash_commit).await {
                warn!(error = %e, "Failed to drop applied stash");
                let message = format!("Applied the stash but could not drop it: {e}");
                let _ = ui::warning(stdout, message);
            }
        }
    }

    async fn drop_applied_stash(&self, stash_commit: &str) -> Result<()> {
        let position = self
            .git
            .stash_commits()
            .await?
            .iter()
            .position(|commit| commit == stash_commit);

        if let Some(index) = position {
            self.git
                .checked(&["stash", "drop", &format!("stash@{{{index}}}")])
                .await?;
        }
        Ok(())
    }

    async fn refuse_if_checked_out(&self, branch: &str) -> Result<()> {
        if self.git.current_branch().await?.as_deref() == Some(branch) {
            return Err(Error::Refused(format!(
                "delete '{branch}' while it is checked out; switch to another branch first"
            ))
            .into());
        }
        Ok(())
    }

    async fn delete_untracked_branch(
        &self,
        branch: &str,
        commit: String,
        stdout: &mut impl io::Write,
    ) -> Result<UndoOutcome> {
        self.refuse_if_checked_out(branch).await?;

        let question = format!("'{branch}' is not in the action history. Delete the branch?");
        if !confirm::confirm(self.prompter, SafetyTier::Medium, &question, branch, stdout)? {
            return Ok(UndoOutcome::Aborted);
        }

        self.git.checked(&["branch", "-D", branch]).await?;
        info!(branch, "Deleted branch outside the history");

        Ok(UndoOutcome::ReversedUntracked {
            branch: branch.to_string(),
            commit,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::clients::git::BackendOutput;
    use crate::clients::git::MockBackend;
    use crate::history::MemoryStore;
    use crate::prompt::MockPrompter;
    use crate::testing::expect_git;
    use crate::testing::expect_git_output;

    const A: &str = "aaaaaaaa11111111";
    const B: &str = "bbbbbbbb22222222";
    const C: &str = "cccccccc33333333";
    const X: &str = "dddddddd44444444";
    const HEAD: &[&str] = &["rev-parse", "--verify", "-q", "HEAD^{commit}"];

    fn history_with(actions: Vec<Action>) -> (ActionHistory, MemoryStore) {
        let store = MemoryStore::new();
        let history = ActionHistory::new(store.clone());
        for action in actions {
            history.append(action).unwrap();
        }
        (history, store)
    }

    fn save(prior: &str, new: &str) -> Action {
        Action::Save {
            prior_head: Some(prior.to_string()),
            new_head: new.to_string(),
            message: "wip".to_string(),
        }
    }

    fn push_main() -> Action {
        Action::Push {
            remote: "origin".to_string(),
            branch: "main".to_string(),
            pre_tip: Some(X.to_string()),
            pushed_tip: B.to_string(),
            force: false,
        }
    }

    fn approve_all() -> MockPrompter {
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().returning(|_, _| Ok(true));
        prompter
    }

    fn reverted_flags(store: &MemoryStore) -> Vec<bool> {
        store.records().iter().map(|r| r.reverted).collect()
    }

    #[test]
    fn test_every_action_kind_has_an_inverse_tier() {
        let cases = [
            (save(A, B), SafetyTier::Medium),
            (
                Action::BranchCreate {
                    name: "feat".to_string(),
                    start_point: A.to_string(),
                },
                SafetyTier::Medium,
            ),
            (
                Action::BranchDelete {
                    name: "feat".to_string(),
                    commit: C.to_string(),
                },
                SafetyTier::Low,
            ),
            (
                Action::Merge {
                    source: "feat".to_string(),
                    pre_merge: A.to_string(),
                    merge_head: B.to_string(),
                },
                SafetyTier::High,
            ),
            (push_main(), SafetyTier::Extreme),
            (
                Action::Pull {
                    branch: "main".to_string(),
                    pre_pull: A.to_string(),
                    rebase: true,
                },
                SafetyTier::High,
            ),
            (
                Action::Stash {
                    stash_commit: C.to_string(),
                    message: None,
                },
                SafetyTier::Low,
            ),
            (
                Action::Switch {
                    from_branch: None,
                    from_commit: A.to_string(),
                    to: "main".to_string(),
                },
                SafetyTier::Low,
            ),
        ];

        for (action, tier) in cases {
            assert_eq!(inverse_of(&action).tier, tier, "{action:?}");
        }
    }

    #[test]
    fn test_push_that_created_branch_is_reversed_by_deleting_it() {
        let inverse = inverse_of(&Action::Push {
            remote: "origin".to_string(),
            branch: "feat".to_string(),
            pre_tip: None,
            pushed_tip: B.to_string(),
            force: false,
        });
        assert_eq!(inverse.steps, vec![args(&["push", "origin", "--delete", "feat"])]);
        assert_eq!(inverse.target, "feat");
    }

    #[tokio::test]
    async fn test_nothing_to_undo() {
        let (history, _) = history_with(vec![]);
        let git = Git::new(MockBackend::new());
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let err = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NothingToUndo)));
    }

    #[tokio::test]
    async fn test_undo_save_soft_resets_to_prior_head() {
        let (history, store) = history_with(vec![save(A, B)]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, HEAD, &format!("{B}\n"));
        expect_git(&mut backend, &["reset", "--soft", A], "");
        let git = Git::new(backend);
        let prompter = approve_all();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(ref r) if r.sequence_id == 1));
        assert_eq!(reverted_flags(&store), vec![true]);
    }

    #[tokio::test]
    async fn test_two_undos_reverse_the_two_most_recent_records() {
        let (history, store) = history_with(vec![save(A, B), save(B, C), save(C, X)]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, HEAD, &format!("{X}\n"));
        expect_git(&mut backend, &["reset", "--soft", C], "");
        expect_git(&mut backend, HEAD, &format!("{C}\n"));
        expect_git(&mut backend, &["reset", "--soft", B], "");
        let git = Git::new(backend);
        let prompter = approve_all();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();

        assert_eq!(reverted_flags(&store), vec![false, true, true]);
    }

    #[tokio::test]
    async fn test_failed_inverse_keeps_record_for_retry() {
        let (history, store) = history_with(vec![save(A, B), push_main()]);
        let force_push = ["push", "--force", "origin", &format!("{X}:refs/heads/main")];
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["cat-file", "-e", &format!("{X}^{{commit}}")], "");
        expect_git(&mut backend, &["cat-file", "-e", &format!("{X}^{{commit}}")], "");
        expect_git_output(
            &mut backend,
            &force_push,
            BackendOutput::new("", "fatal: unable to access remote\n", 128),
        );
        expect_git(&mut backend, &force_push, "");
        let git = Git::new(backend);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_input()
            .with(eq("Type 'main' to confirm"))
            .times(2)
            .returning(|_| Ok("main".to_string()));
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let err = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::BackendFailure { stderr, .. }) => {
                assert_eq!(stderr, "fatal: unable to access remote")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(reverted_flags(&store), vec![false, false]);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(ref r) if r.sequence_id == 2));
        assert_eq!(reverted_flags(&store), vec![false, true]);
    }

    #[tokio::test]
    async fn test_misspelled_target_aborts_extreme_undo_without_side_effects() {
        let (history, store) = history_with(vec![push_main()]);
        // No backend expectations: any git call would panic
        let git = Git::new(MockBackend::new());
        let mut prompter = MockPrompter::new();
        prompter
            .expect_input()
            .times(1)
            .returning(|_| Ok("mian".to_string()));
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Aborted));
        assert_eq!(reverted_flags(&store), vec![false]);
    }

    #[tokio::test]
    async fn test_undo_branch_delete_recreates_branch_without_prompt() {
        let (history, store) = history_with(vec![Action::BranchDelete {
            name: "feat".to_string(),
            commit: C.to_string(),
        }]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["branch", "feat", C], "");
        let git = Git::new(backend);
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(Some("feat"), false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(_)));
        assert_eq!(reverted_flags(&store), vec![true]);
    }

    #[tokio::test]
    async fn test_undo_branch_create_refused_while_checked_out() {
        let (history, store) = history_with(vec![Action::BranchCreate {
            name: "feat".to_string(),
            start_point: A.to_string(),
        }]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["branch", "--show-current"], "feat\n");
        let git = Git::new(backend);
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let err = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Refused(_))));
        assert_eq!(reverted_flags(&store), vec![false]);
    }

    #[tokio::test]
    async fn test_unrecorded_branch_target_is_deleted_without_touching_history() {
        let (history, store) = history_with(vec![save(A, B)]);
        let mut backend = MockBackend::new();
        expect_git(
            &mut backend,
            &["rev-parse", "--verify", "-q", "refs/heads/old^{commit}"],
            &format!("{C}\n"),
        );
        expect_git(&mut backend, &["branch", "--show-current"], "main\n");
        expect_git(&mut backend, &["branch", "-D", "old"], "Deleted branch old\n");
        let git = Git::new(backend);
        let prompter = approve_all();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(Some("old"), false, &mut Vec::new()).await.unwrap();
        match outcome {
            UndoOutcome::ReversedUntracked { branch, commit } => {
                assert_eq!(branch, "old");
                assert_eq!(commit, C);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(reverted_flags(&store), vec![false]);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let (history, _) = history_with(vec![save(A, B)]);
        let mut backend = MockBackend::new();
        expect_git_output(
            &mut backend,
            &["rev-parse", "--verify", "-q", "refs/heads/nope^{commit}"],
            BackendOutput::new("", "", 1),
        );
        let git = Git::new(backend);
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let err = dispatcher.undo(Some("nope"), false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(t)) if t == "nope"));
    }

    #[tokio::test]
    async fn test_interactive_undo_reverses_only_the_selected_record() {
        let deleted = |name: &str, commit: &str| Action::BranchDelete {
            name: name.to_string(),
            commit: commit.to_string(),
        };
        let (history, store) =
            history_with(vec![deleted("one", A), deleted("two", B), deleted("three", C)]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["branch", "two", B], "");
        let git = Git::new(backend);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_select()
            .withf(|_, items| items.len() == 3 && items[1].starts_with("BRANCH DELETE: two ("))
            .times(1)
            .returning(|_, _| Ok(Some(1)));
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        dispatcher.undo(None, true, &mut Vec::new()).await.unwrap();
        assert_eq!(reverted_flags(&store), vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_interactive_undo_cancelled() {
        let (history, store) = history_with(vec![save(A, B)]);
        let git = Git::new(MockBackend::new());
        let mut prompter = MockPrompter::new();
        prompter.expect_select().returning(|_, _| Ok(None));
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, true, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Cancelled));
        assert_eq!(reverted_flags(&store), vec![false]);
    }

    #[tokio::test]
    async fn test_bookkeeping_failure_after_successful_inverse() {
        let (history, store) = history_with(vec![save(A, B)]);
        store.set_read_only(true);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, HEAD, &format!("{B}\n"));
        expect_git(&mut backend, &["reset", "--soft", A], "");
        let git = Git::new(backend);
        let prompter = approve_all();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::BookkeepingFailed { .. }));
    }

    #[tokio::test]
    async fn test_undo_stash_applies_and_drops_entry() {
        let (history, store) = history_with(vec![Action::Stash {
            stash_commit: C.to_string(),
            message: Some("experiment".to_string()),
        }]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["stash", "apply", C], "");
        expect_git(
            &mut backend,
            &["stash", "list", "--format=%H"],
            &format!("{X}\n{C}\n"),
        );
        expect_git(&mut backend, &["stash", "drop", "stash@{1}"], "");
        let git = Git::new(backend);
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert_eq!(reverted_flags(&store), vec![true]);
    }

    #[tokio::test]
    async fn test_undo_first_save_deletes_head_ref() {
        let (history, _) = history_with(vec![Action::Save {
            prior_head: None,
            new_head: A.to_string(),
            message: "initial".to_string(),
        }]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, HEAD, &format!("{A}\n"));
        expect_git(&mut backend, &["update-ref", "-d", "HEAD"], "");
        let git = Git::new(backend);
        let prompter = approve_all();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(_)));
    }

    #[tokio::test]
    async fn test_undo_save_refused_when_head_moved() {
        let (history, store) = history_with(vec![save(A, B)]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, HEAD, &format!("{C}\n"));
        let git = Git::new(backend);
        // No prompt expectations: the refusal comes before confirmation
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let err = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Refusing to undo save \"wip\": HEAD is at cccccccc instead of the saved commit bbbbbbbb"
        );
        assert_eq!(reverted_flags(&store), vec![false]);
    }

    #[tokio::test]
    async fn test_undo_force_push_fetches_overwritten_tip() {
        let (history, store) = history_with(vec![push_main()]);
        let mut backend = MockBackend::new();
        expect_git_output(
            &mut backend,
            &["cat-file", "-e", &format!("{X}^{{commit}}")],
            BackendOutput::new("", "fatal: Not a valid object name", 128),
        );
        expect_git(&mut backend, &["fetch", "origin", X], "");
        expect_git(
            &mut backend,
            &["push", "--force", "origin", &format!("{X}:refs/heads/main")],
            "",
        );
        let git = Git::new(backend);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_input()
            .returning(|_| Ok("main".to_string()));
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let outcome = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(_)));
        assert_eq!(reverted_flags(&store), vec![true]);
    }

    #[tokio::test]
    async fn test_undo_stash_is_marked_reverted_when_listing_fails() {
        let (history, store) = history_with(vec![Action::Stash {
            stash_commit: C.to_string(),
            message: None,
        }]);
        let mut backend = MockBackend::new();
        expect_git(&mut backend, &["stash", "apply", C], "");
        expect_git_output(
            &mut backend,
            &["stash", "list", "--format=%H"],
            BackendOutput::new("", "fatal: Unable to create '.git/index.lock': File exists.", 128),
        );
        let git = Git::new(backend);
        let prompter = MockPrompter::new();
        let dispatcher = UndoDispatcher::new(&git, &history, &prompter);

        let mut stdout = Vec::new();
        let outcome = dispatcher.undo(None, false, &mut stdout).await.unwrap();
        assert!(matches!(outcome, UndoOutcome::Reverted(_)));
        assert_eq!(reverted_flags(&store), vec![true]);
        assert!(String::from_utf8(stdout)
            .unwrap()
            .starts_with("! Applied the stash but could not drop it: git stash list"));

        // The record is no longer eligible, so a retry cannot apply it twice
        let err = dispatcher.undo(None, false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NothingToUndo)));
    }
}

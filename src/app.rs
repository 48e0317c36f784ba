use std::future::Future;
use std::io;

use anyhow::Result;
use anyhow::bail;
use tracing::debug;
use tracing::warn;

use crate::clients::git::Backend;
use crate::clients::git::Git;
use crate::clients::github::HostingOps;
use crate::clients::github::RemoteError;
use crate::clients::github::RepoSlug;
use crate::clients::vault;
use crate::clients::vault::Vault;
use crate::config::Config;
use crate::error::Error;
use crate::history::Action;
use crate::history::ActionHistory;
use crate::prompt::Prompter;
use crate::ui;
use crate::undo::UndoDispatcher;

/// Remote every command talks to.
pub const ORIGIN: &str = "origin";

pub struct App<B, R, V, P> {
    pub config: Config,
    pub git: Git<B>,
    pub remote: R,
    pub vault: V,
    pub prompter: P,
    pub history: ActionHistory,
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub fn new(
        config: Config,
        backend: B,
        remote: R,
        vault: V,
        prompter: P,
        history: ActionHistory,
    ) -> Self {
        Self {
            config,
            git: Git::new(backend),
            remote,
            vault,
            prompter,
            history,
        }
    }
}

/// Shared helper methods for App
impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub(crate) async fn require_repository(&self) -> Result<()> {
        if !self.git.is_repository().await? {
            return Err(Error::NotARepository.into());
        }
        Ok(())
    }

    /// The current branch; `what` completes "Cannot ... in detached HEAD state".
    pub(crate) async fn require_branch(&self, what: &str) -> Result<String> {
        match self.git.current_branch().await? {
            Some(branch) => Ok(branch),
            None => bail!("Cannot {} in detached HEAD state.", what),
        }
    }

    /// The commit HEAD points at; fails in a repository without commits.
    pub(crate) async fn require_head(&self) -> Result<String> {
        match self.git.head().await? {
            Some(head) => Ok(head),
            None => bail!("This repository has no commits yet."),
        }
    }

    /// Append a completed action to the history.
    pub(crate) fn record(&self, action: Action) -> Result<u64> {
        Ok(self.history.append(action).map_err(Error::from)?)
    }

    pub(crate) fn undo_dispatcher(&self) -> UndoDispatcher<'_, B, P> {
        UndoDispatcher::new(&self.git, &self.history, &self.prompter)
    }

    /// Owner and name of the repository `origin` points at.
    pub(crate) async fn repo_slug(&self) -> Result<RepoSlug> {
        let Some(url) = self.git.remote_url(ORIGIN).await? else {
            bail!("No '{}' remote configured.", ORIGIN);
        };
        match RepoSlug::from_remote_url(&url) {
            Some(slug) => Ok(slug),
            None => bail!(
                "Could not parse repository URL '{}'. Only GitHub repositories are supported.",
                url
            ),
        }
    }

    /// The stored token of the current account, asking for one if none is stored.
    pub(crate) fn token(&self, stdout: &mut impl io::Write) -> Result<String> {
        let account = self.config.token_account();
        match self
            .vault
            .get(vault::SERVICE, account)
            .map_err(Error::from)?
        {
            Some(token) => Ok(token),
            None => {
                ui::info(
                    stdout,
                    format!("No stored credential found for account '{account}'"),
                )?;
                self.prompt_token(stdout)
            }
        }
    }

    fn prompt_token(&self, stdout: &mut impl io::Write) -> Result<String> {
        let account = self.config.token_account();
        let token = self
            .prompter
            .password(&format!("Enter GitHub token for {account}"))?;
        let token = token.trim().to_string();
        if token.is_empty() {
            bail!("No token provided.");
        }

        self.vault
            .set(vault::SERVICE, account, &token)
            .map_err(Error::from)?;
        ui::success(stdout, "Token stored securely for future use")?;

        Ok(token)
    }

    /// Remove the current account's stored token.
    fn forget_token(&self) -> Result<()> {
        let account = self.config.token_account();
        let removed = self
            .vault
            .delete(vault::SERVICE, account)
            .map_err(Error::from)?;
        debug!(account, removed, "Forgot stored token");
        Ok(())
    }

    /// Run a remote call with the current account's token.
    ///
    /// If the remote rejects the token, forget it, ask for a new one, store it
    /// and retry once.
    pub(crate) async fn with_token<T, F, Fut>(
        &self,
        stdout: &mut impl io::Write,
        call: F,
    ) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let token = self.token(stdout)?;
        match call(token).await {
            Err(e) if e.is_credential_problem() => {
                warn!(error = %e, "Remote rejected the stored token");
                ui::warning(stdout, &e)?;
                self.forget_token()?;
                let token = self.prompt_token(stdout)?;
                debug!("Retrying remote call with new token");
                Ok(call(token).await.map_err(Error::from)?)
            }
            result => Ok(result.map_err(Error::from)?),
        }
    }
}

use anyhow::Result;
use anyhow::bail;
use colored::Colorize;

use crate::App;
use crate::app::ORIGIN;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::github::NewPullRequest;
use crate::clients::github::PrState;
use crate::clients::vault::Vault;
use crate::history::Action;
use crate::prompt::Prompter;
use crate::ui;

/// Longest title shown by `bit pr list`.
const TITLE_WIDTH: usize = 50;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Push the current branch and open a pull request for it.
    pub async fn cmd_pr_create(
        &self,
        title: Option<String>,
        body: Option<String>,
        base: Option<String>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.require_repository().await?;
        let base = base.unwrap_or_else(|| self.config.defaults.main_branch_name.clone());
        let branch = self.require_branch("create a pull request").await?;
        if branch == base {
            bail!(
                "Cannot create a pull request from '{}' into itself. Switch to a feature branch first.",
                base
            );
        }
        let repo = self.repo_slug().await?;

        let title = match title {
            Some(title) => title,
            None => self.prompter.input("Pull request title")?,
        };
        if title.trim().is_empty() {
            bail!("A title is required for the pull request.");
        }
        let body = match body {
            Some(body) => body,
            None => self.prompter.input("Pull request body (optional)")?,
        };

        ui::info(stdout, format!("Pushing branch '{branch}'..."))?;
        self.push_and_record(&branch, false, stdout).await?;

        let request = NewPullRequest {
            title: title.trim().to_string(),
            body,
            head: branch,
            base,
        };
        let created = self
            .with_token(stdout, |token| {
                let repo = &repo;
                let request = &request;
                let remote = &self.remote;
                async move { remote.create_pull_request(&token, repo, request).await }
            })
            .await?;

        ui::success(
            stdout,
            format!("Created pull request #{}: {}", created.number, created.html_url),
        )?;
        Ok(())
    }

    pub async fn cmd_pr_list(&self, state: PrState, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let repo = self.repo_slug().await?;

        let pulls = self
            .with_token(stdout, |token| {
                let repo = &repo;
                let remote = &self.remote;
                async move { remote.list_pull_requests(&token, repo, state).await }
            })
            .await?;

        if pulls.is_empty() {
            ui::info(stdout, format!("No {state} pull requests found."))?;
            return Ok(());
        }

        ui::heading(stdout, &format!("Pull Requests ({state})"))?;
        for pull in &pulls {
            let title: String = pull.title.chars().take(TITLE_WIDTH).collect();
            let author = pull
                .user
                .as_ref()
                .map(|user| user.login.as_str())
                .unwrap_or("unknown");
            writeln!(
                stdout,
                "  {} {} {} {}",
                format!("#{}", pull.number).yellow(),
                title.trim_end(),
                author.green(),
                format!("[{}]", pull.state).dimmed()
            )?;
        }

        Ok(())
    }

    /// Fetch the head branch of a pull request and switch to it.
    pub async fn cmd_pr_checkout(&self, number: u64, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let repo = self.repo_slug().await?;

        let pull = self
            .with_token(stdout, |token| {
                let repo = &repo;
                let remote = &self.remote;
                async move { remote.get_pull_request(&token, repo, number).await }
            })
            .await?;
        let branch = pull.head.ref_name;
        ui::info(stdout, format!("Checking out PR #{number}: {}", pull.title))?;

        if self.git.branch_tip(&branch).await?.is_none() {
            self.git
                .checked(&["fetch", ORIGIN, &format!("{branch}:{branch}")])
                .await?;
            let Some(start_point) = self.git.branch_tip(&branch).await? else {
                bail!("Fetching '{}' from {} did not create the branch.", branch, ORIGIN);
            };
            self.record(Action::BranchCreate {
                name: branch.clone(),
                start_point,
            })?;
        }

        self.switch_to_branch(&branch, stdout).await
    }
}

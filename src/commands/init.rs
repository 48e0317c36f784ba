use std::fs;
use std::path;

use anyhow::Context;
use anyhow::Result;
use tracing::info;

use crate::App;
use crate::app::ORIGIN;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::config::Visibility;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Initialize a repository in `dir` with a README and an initial commit,
    /// optionally creating the remote repository and pushing to it.
    pub async fn cmd_init(
        &self,
        dir: &path::Path,
        no_remote: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        if self.git.is_repository().await? {
            ui::warning(stdout, "Already in a Git repository.")?;
            return Ok(());
        }

        let main = self.config.defaults.main_branch_name.as_str();
        self.git.checked(&["init", "--initial-branch", main]).await?;
        ui::success(stdout, format!("Initialized Git repository in {}", dir.display()))?;

        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());

        let readme = dir.join("README.md");
        if !readme.exists() {
            fs::write(
                &readme,
                format!("# {name}\n\nA new project created with BetterGit.\n"),
            )
            .with_context(|| format!("Failed to write {}", readme.display()))?;
            ui::success(stdout, "Created README.md")?;
        }

        if self.git.head().await?.is_none() {
            self.git.checked(&["add", "."]).await?;
            self.git.checked(&["commit", "-m", "Initial commit"]).await?;
            ui::success(stdout, "Created initial commit")?;
        }

        if no_remote
            || !self
                .prompter
                .confirm("Would you like to create a remote repository?", true)?
        {
            return Ok(());
        }

        let description = self.prompter.input("Repository description (optional)")?;
        let private = self.prompter.confirm(
            "Make the repository private?",
            self.config.defaults.repo_visibility == Visibility::Private,
        )?;

        let repository = self
            .with_token(stdout, |token| {
                let name = &name;
                let description = &description;
                let remote = &self.remote;
                async move {
                    remote
                        .create_repository(&token, name, description, private)
                        .await
                }
            })
            .await?;
        info!(url = %repository.html_url, private, "Created remote repository");
        ui::success(
            stdout,
            format!("Created remote repository: {}", repository.html_url),
        )?;

        self.git
            .checked(&["remote", "add", ORIGIN, &repository.clone_url])
            .await?;
        self.git.checked(&["branch", "-M", main]).await?;
        self.git.checked(&["push", "-u", ORIGIN, main]).await?;
        ui::success(stdout, format!("Pushed '{main}' to {ORIGIN}"))?;

        Ok(())
    }
}

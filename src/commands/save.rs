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
    /// `bit save [files...] "message"`, or interactive file selection with no
    /// arguments. The last argument is always the message.
    pub async fn cmd_save(&self, args: &[String], stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        let status = self.git.status().await?;
        if status.is_empty() {
            ui::info(stdout, "No changes to save.")?;
            return Ok(());
        }

        let (files, message) = match args.split_last() {
            Some((message, [])) => (vec![".".to_string()], message.clone()),
            Some((message, files)) => (files.to_vec(), message.clone()),
            None => {
                // Offer everything that has unstaged changes
                let candidates: Vec<_> = status.iter().filter(|e| e.is_unstaged()).collect();
                if candidates.is_empty() {
                    ui::info(stdout, "No unstaged files to select.")?;
                    return Ok(());
                }

                let items: Vec<String> = candidates
                    .iter()
                    .map(|entry| format!("{} ({})", entry.path, entry.describe()))
                    .collect();
                let selected = self
                    .prompter
                    .multi_select("Select files to stage", &items)?;
                if selected.is_empty() {
                    ui::info(stdout, "No files selected.")?;
                    return Ok(());
                }

                let files = selected
                    .into_iter()
                    .filter_map(|index| candidates.get(index))
                    .map(|entry| entry.path.clone())
                    .collect();
                (files, self.prompter.input("Save message")?)
            }
        };

        let message = message.trim().to_string();
        if message.is_empty() {
            bail!("A save message is required.");
        }

        let prior_head = self.git.head().await?;

        let mut add = vec!["add", "--"];
        add.extend(files.iter().map(String::as_str));
        self.git.checked(&add).await?;

        let staged = self.git.checked(&["diff", "--cached", "--name-only"]).await?;
        if staged.trim().is_empty() {
            ui::warning(stdout, "No files were staged. Nothing to save.")?;
            return Ok(());
        }

        self.git.checked(&["commit", "-m", &message]).await?;
        let new_head = self.require_head().await?;

        self.record(Action::Save {
            prior_head,
            new_head,
            message: message.clone(),
        })?;
        ui::success(stdout, format!("Saved changes: {message}"))?;

        Ok(())
    }
}

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::git::StatusEntry;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::error::Error;
use crate::history::short_commit;
use crate::prompt::Prompter;
use crate::ui;

fn is_staged(entry: &StatusEntry) -> bool {
    entry
        .code
        .chars()
        .next()
        .is_some_and(|c| "MADRC".contains(c))
}

fn is_modified(entry: &StatusEntry) -> bool {
    entry.code.chars().nth(1).is_some_and(|c| "MD".contains(c))
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    pub async fn cmd_status(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        match self.git.current_branch().await? {
            Some(branch) => writeln!(stdout, "On branch {}", branch.green().bold())?,
            None => {
                let head = self.git.head().await?.unwrap_or_default();
                writeln!(
                    stdout,
                    "{} at {}",
                    "HEAD detached".yellow(),
                    short_commit(&head)
                )?
            }
        }

        let entries = self.git.status().await?;
        if entries.is_empty() {
            ui::success(stdout, "Working tree clean")?;
        } else {
            let sections: [(&str, fn(&StatusEntry) -> bool); 3] = [
                ("Staged changes", is_staged),
                ("Modified files", is_modified),
                ("Untracked files", StatusEntry::is_untracked),
            ];
            for (title, belongs) in sections {
                let paths: Vec<_> = entries.iter().filter(|e| belongs(e)).collect();
                if paths.is_empty() {
                    continue;
                }
                writeln!(stdout, "{title}:")?;
                for entry in paths {
                    writeln!(stdout, "  {}", entry.path)?;
                }
            }
        }

        let last = self
            .history
            .most_recent_unreverted()
            .map_err(Error::from)?;
        if let Some(record) = last {
            writeln!(
                stdout,
                "Last action: {} ({})",
                record.summary(),
                ui::relative_time(record.timestamp, Utc::now())
            )?;
            writeln!(stdout, "{}", "Run 'bit undo' to revert it".dimmed())?;
        }

        Ok(())
    }
}

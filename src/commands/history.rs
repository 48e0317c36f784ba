use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::error::Error;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// The `limit` most recent recorded actions, undone ones included.
    pub async fn cmd_history(&self, limit: usize, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        let records = self.history.list(limit).map_err(Error::from)?;
        if records.is_empty() {
            ui::info(stdout, "No actions in history.")?;
            return Ok(());
        }

        let now = Utc::now();
        ui::heading(stdout, "Action History")?;
        for (i, record) in records.iter().enumerate() {
            let line = format!(
                "{:>3}. {} ({})",
                i + 1,
                record.summary(),
                ui::relative_time(record.timestamp, now)
            );
            if record.reverted {
                writeln!(stdout, "{} {}", line.dimmed(), "[undone]".dimmed())?;
            } else {
                writeln!(stdout, "{line}")?;
            }
        }

        Ok(())
    }
}

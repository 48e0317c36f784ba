use anyhow::Result;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::prompt::Prompter;
use crate::ui;

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Make sure the configuration file exists and show where it is.
    pub async fn cmd_config(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let path = self.config.path();
        if !path.exists() {
            self.config.save()?;
            ui::success(stdout, "Created default configuration")?;
        }

        ui::info(stdout, format!("Configuration file: {}", path.display()))?;
        writeln!(
            stdout,
            "Current account: {}",
            self.config.current_account.as_deref().unwrap_or("(none)")
        )?;
        writeln!(
            stdout,
            "Main branch: {}",
            self.config.defaults.main_branch_name
        )?;
        writeln!(stdout, "Edit the file to add accounts or change defaults.")?;
        Ok(())
    }
}

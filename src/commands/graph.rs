use anyhow::Result;
use colored::Colorize;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::vault::Vault;
use crate::prompt::Prompter;

const GRAPH_FORMAT: &str = "--pretty=format:%h|%an|%ar|%s";

/// Colorize one line of `git log --graph` output in [`GRAPH_FORMAT`].
fn render_line(line: &str) -> String {
    let Some(start) = line.find(|c: char| c.is_ascii_hexdigit()) else {
        // Connector-only line
        return line.trim_end().to_string();
    };
    let (graph, rest) = line.split_at(start);
    let mut fields = rest.splitn(4, '|');
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(hash), Some(author), Some(when), Some(subject)) => format!(
            "{graph}{} {} {} {}",
            hash.yellow(),
            subject,
            author.green(),
            format!("({when})").dimmed()
        ),
        _ => line.to_string(),
    }
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Commit graph of the current branch (last 10 commits) or of all refs.
    pub async fn cmd_graph(&self, all: bool, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;

        let mut args = vec!["log", "--graph", GRAPH_FORMAT, "--abbrev-commit"];
        args.push(if all { "--all" } else { "-10" });
        let output = self.git.checked(&args).await?;

        for line in output.lines() {
            writeln!(stdout, "{}", render_line(line))?;
        }
        Ok(())
    }
}

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::App;
use crate::clients::git::Backend;
use crate::clients::github::HostingOps;
use crate::clients::github::Issue;
use crate::clients::vault::Vault;
use crate::prompt::Prompter;
use crate::ui;

const MAX_SLUG_LENGTH: usize = 50;

static NOT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `<prefix>/<number>-<slug>`, e.g. `fix/42-login-fails-on-safari`.
///
/// The prefix comes from the issue labels: `fix` for bugs, `docs` for
/// documentation, `feature` otherwise.
pub fn branch_name_for_issue(issue: &Issue) -> String {
    let has_label = |wanted: &str| {
        issue
            .labels
            .iter()
            .any(|label| label.name.eq_ignore_ascii_case(wanted))
    };
    let prefix = if has_label("bug") {
        "fix"
    } else if has_label("documentation") {
        "docs"
    } else {
        "feature"
    };

    let cleaned = NOT_WORD_RE.replace_all(&issue.title, "");
    let slug: String = WHITESPACE_RE
        .replace_all(cleaned.trim(), "-")
        .to_lowercase()
        .chars()
        .take(MAX_SLUG_LENGTH)
        .collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("{prefix}/{}", issue.number)
    } else {
        format!("{prefix}/{}-{slug}", issue.number)
    }
}

impl<B: Backend, R: HostingOps, V: Vault, P: Prompter> App<B, R, V, P> {
    /// Create (or return to) the branch for an issue.
    pub async fn cmd_workon(&self, number: u64, stdout: &mut impl std::io::Write) -> Result<()> {
        self.require_repository().await?;
        let repo = self.repo_slug().await?;

        ui::info(stdout, format!("Fetching issue #{number}..."))?;
        let issue = self
            .with_token(stdout, |token| {
                let repo = &repo;
                let remote = &self.remote;
                async move { remote.get_issue(&token, repo, number).await }
            })
            .await?;
        ui::info(stdout, format!("Issue: {}", issue.title))?;

        let branch = branch_name_for_issue(&issue);
        if self.git.branch_tip(&branch).await?.is_some() {
            self.switch_to_branch(&branch, stdout).await?;
        } else {
            self.create_and_switch(&branch, stdout).await?;
        }

        ui::success(stdout, format!("Started working on issue #{number}"))?;
        Ok(())
    }
}

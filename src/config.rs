use std::collections::BTreeMap;
use std::fs;
use std::path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

/// Overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "BETTERGIT_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Account alias used for tokens when no account is selected.
const FALLBACK_ACCOUNT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub remote_service: String,
    pub repo_visibility: Visibility,
    pub main_branch_name: String,
    /// Never deleted by `bit cleanup`.
    pub protected_branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueTracker {
    pub platform: String,
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the config file and the action histories.
    #[serde(skip)]
    pub dir: path::PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_account: Option<String>,
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub issue_tracker: IssueTracker,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            remote_service: "github".to_string(),
            repo_visibility: Visibility::Private,
            main_branch_name: "main".to_string(),
            protected_branches: vec![
                "main".to_string(),
                "master".to_string(),
                "develop".to_string(),
            ],
        }
    }
}

impl Default for IssueTracker {
    fn default() -> Self {
        Self {
            platform: "github".to_string(),
            api_url: crate::clients::github::GITHUB_API_URL.to_string(),
            project_key: None,
        }
    }
}

impl Config {
    /// `$BETTERGIT_CONFIG_DIR`, or `bettergit` under the platform config directory.
    pub fn default_dir() -> Result<path::PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(path::PathBuf::from(dir));
        }
        match dirs::config_dir() {
            Some(dir) => Ok(dir.join("bettergit")),
            None => bail!(
                "Cannot determine the configuration directory. Set {} instead.",
                CONFIG_DIR_ENV
            ),
        }
    }

    /// Load config from the default directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_dir()?)
    }

    /// Load config from `dir`, writing the default file first if there is none.
    pub fn load_from(dir: &path::Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);

        if !path.exists() {
            let config = Self::new(dir.to_path_buf());
            config.save()?;
            info!(path = %path.display(), "Created default configuration");
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.dir = dir.to_path_buf();

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(self.path(), contents)
            .with_context(|| format!("Failed to write {}", self.path().display()))?;
        Ok(())
    }

    pub fn path(&self) -> path::PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// The default configuration, rooted at `dir`.
    pub fn new(dir: path::PathBuf) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(
            "personal".to_string(),
            Account {
                name: "Your Name".to_string(),
                email: "personal@example.com".to_string(),
                ssh_key: None,
            },
        );

        Self {
            dir,
            accounts,
            current_account: Some("personal".to_string()),
            defaults: Defaults::default(),
            issue_tracker: IssueTracker::default(),
        }
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        let mut config = Self::new(path::PathBuf::from("/tmp/bettergit-tests"));
        config.accounts.insert(
            "work".to_string(),
            Account {
                name: "Work Name".to_string(),
                email: "me@work.example".to_string(),
                ssh_key: Some("~/.ssh/id_work".to_string()),
            },
        );
        config
    }

    pub fn account(&self, alias: &str) -> Option<&Account> {
        self.accounts.get(alias)
    }

    /// Make `alias` the current account and persist the change.
    pub fn set_current_account(&mut self, alias: &str) -> Result<Account> {
        let Some(account) = self.accounts.get(alias).cloned() else {
            bail!("Account '{}' not found in configuration", alias);
        };
        self.current_account = Some(alias.to_string());
        self.save()?;
        info!(alias, "Switched current account");
        Ok(account)
    }

    /// Alias under which the current account's token is stored.
    pub fn token_account(&self) -> &str {
        self.current_account.as_deref().unwrap_or(FALLBACK_ACCOUNT)
    }

    pub fn is_protected(&self, branch: &str) -> bool {
        branch == self.defaults.main_branch_name
            || self.defaults.protected_branches.iter().any(|b| b == branch)
    }
}

#![allow(async_fn_in_trait)]

use std::fmt::Display;
use std::sync::LazyLock;

#[cfg(test)]
use mockall::automock;
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use tracing::instrument;

pub const GITHUB_API_URL: &str = "https://api.github.com";

static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/]+)/([^/]+?)(?:\.git)?/?$").expect("valid regex")
});

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Authentication failed. Please check your token.")]
    Authentication,

    #[error("Access forbidden. Check your token's permissions.")]
    Authorization,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    #[error("Invalid response from GitHub: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub html_url: String,
    pub clone_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    pub head: PullRequestHead,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestHead {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrState {
    Open,
    Closed,
    All,
}

#[derive(Debug, Serialize)]
struct CreateRepository<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: String,
}

/// Repository, pull-request and issue operations of a hosting platform.
#[cfg_attr(test, automock)]
pub trait HostingOps {
    async fn create_repository(
        &self,
        token: &str,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Repository, RemoteError>;

    async fn create_pull_request(
        &self,
        token: &str,
        repo: &RepoSlug,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, RemoteError>;

    async fn list_pull_requests(
        &self,
        token: &str,
        repo: &RepoSlug,
        state: PrState,
    ) -> Result<Vec<PullRequest>, RemoteError>;

    async fn get_pull_request(
        &self,
        token: &str,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<PullRequest, RemoteError>;

    async fn get_issue(
        &self,
        token: &str,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Issue, RemoteError>;
}

/// GitHub REST API client.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

// -----------------------------------------------------------------------------
// RemoteError impl

impl RemoteError {
    /// Whether a fresh token might fix this.
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, Self::Authentication | Self::Authorization)
    }
}

// -----------------------------------------------------------------------------
// RepoSlug impl

impl RepoSlug {
    /// Parse `git@github.com:owner/repo.git` or `https://github.com/owner/repo`.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let captures = GITHUB_URL_RE.captures(url.trim())?;
        Some(Self {
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }
}

impl Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// -----------------------------------------------------------------------------
// PrState impl

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

impl Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// GithubClient impl

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        token: &str,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "bettergit-cli")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "GitHub responded");
        check_status(status, &body, what)?;

        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl HostingOps for GithubClient {
    #[instrument(skip(self, token))]
    async fn create_repository(
        &self,
        token: &str,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Repository, RemoteError> {
        let request = self.http.post(self.url("/user/repos")).json(&CreateRepository {
            name,
            description,
            private,
            auto_init: false,
        });
        self.send(token, request, "user repositories").await
    }

    #[instrument(skip(self, token))]
    async fn create_pull_request(
        &self,
        token: &str,
        repo: &RepoSlug,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, RemoteError> {
        let request = self
            .http
            .post(self.url(&format!("/repos/{repo}/pulls")))
            .json(pr);
        self.send(token, request, &format!("repository {repo}")).await
    }

    #[instrument(skip(self, token))]
    async fn list_pull_requests(
        &self,
        token: &str,
        repo: &RepoSlug,
        state: PrState,
    ) -> Result<Vec<PullRequest>, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/repos/{repo}/pulls")))
            .query(&[("state", state.as_str())]);
        self.send(token, request, &format!("repository {repo}")).await
    }

    #[instrument(skip(self, token))]
    async fn get_pull_request(
        &self,
        token: &str,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<PullRequest, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/repos/{repo}/pulls/{number}")));
        self.send(token, request, &format!("pull request #{number} in {repo}"))
            .await
    }

    #[instrument(skip(self, token))]
    async fn get_issue(
        &self,
        token: &str,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Issue, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/repos/{repo}/issues/{number}")));
        self.send(token, request, &format!("issue #{number} in {repo}"))
            .await
    }
}

/// Map an HTTP status to the error taxonomy.
fn check_status(status: u16, body: &str, what: &str) -> Result<(), RemoteError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(RemoteError::Authentication),
        403 => Err(RemoteError::Authorization),
        404 => Err(RemoteError::NotFound(what.to_string())),
        _ => {
            // Prefer GitHub's own explanation when there is one
            let body = serde_json::from_str::<GithubErrorBody>(body)
                .map(|error| error.message)
                .unwrap_or_else(|_| body.to_string());
            Err(RemoteError::Request { status, body })
        }
    }
}

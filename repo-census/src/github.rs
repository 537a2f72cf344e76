#![doc = "GitHub REST client: implements the census collaborator traits against api.github.com."]
//
//! # GitHub Integration (CLI <-> Core)
//!
//! This module wires the [`RepositoryProvider`] and [`ContentFetcher`] traits from
//! `repo-census-core` to the GitHub REST API. One [`GitHubClient`] serves both roles.
//!
//! ## Client Usage
//!
//! - Construct [`GitHubClient`] from a [`GitHubApiConfig`]; the token comes from the
//!   environment (see `load_config`), never from the YAML file.
//! - Without a token all requests are unauthenticated and subject to the lower
//!   anonymous rate limit.
//! - Every non-success status is mapped to a [`FetchError`] by [`classify_status`].

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use repo_census_core::contract::{
    AccountProfile, ContentFetcher, EntryKind, FetchError, FileEntry, LanguageByteMap,
    RemoteContent, RepositoryDescriptor, RepositoryProvider, TransferEncoding,
};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";

/// Connection settings for the GitHub API, the `api` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHubApiConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Injected from `GITHUB_TOKEN`.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for GitHubApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("repo-census/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            token: None,
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    name: String,
    owner: GitHubOwner,
    default_branch: Option<String>,
    created_at: DateTime<Utc>,
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    private: bool,
}

impl From<GitHubRepository> for RepositoryDescriptor {
    fn from(repo: GitHubRepository) -> Self {
        RepositoryDescriptor {
            owner: repo.owner.login,
            name: repo.name,
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
            created_at: repo.created_at,
            pushed_at: repo.pushed_at,
        }
    }
}

/// Shared shape of the readme and blob endpoints.
#[derive(Debug, Deserialize)]
struct GitHubContent {
    content: String,
    encoding: String,
}

impl From<GitHubContent> for RemoteContent {
    fn from(c: GitHubContent) -> Self {
        RemoteContent {
            content: c.content,
            encoding: TransferEncoding::from(c.encoding.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubBranch {
    commit: GitHubCommitRef,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitHubTreeItem {
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    size: Option<u64>,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubWeeklyActivity {
    total: u64,
}

/// Map a non-success HTTP status to the failure taxonomy of the census engine.
///
/// `rate_limit_remaining` is the `x-ratelimit-remaining` header, when present.
/// GitHub answers an exhausted primary limit with 403 and remaining `0`, and a
/// secondary limit with 403 or 429 and a "rate limit" message.
pub fn classify_status(
    status: StatusCode,
    rate_limit_remaining: Option<&str>,
    message: &str,
) -> FetchError {
    let detail = if message.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {message}")
    };
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized(detail),
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited(detail),
        StatusCode::FORBIDDEN => {
            let exhausted = rate_limit_remaining == Some("0");
            if exhausted || message.to_ascii_lowercase().contains("rate limit") {
                FetchError::RateLimited(detail)
            } else {
                FetchError::Unauthorized(detail)
            }
        }
        s if s.is_server_error() => FetchError::Server(detail),
        _ => FetchError::Transient(detail),
    }
}

impl GitHubClient {
    pub fn new(config: &GitHubApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        info!(
            base_url = %config.base_url,
            authenticated = config.token.is_some(),
            "Initialized GitHubClient"
        );
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn get(&self, endpoint: &str) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(%url, "GitHub request");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or(body);
        let err = classify_status(status, remaining.as_deref(), &message);
        debug!(%url, %status, error = %err, "GitHub request failed");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        self.get(endpoint)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FetchError::Transient(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl RepositoryProvider for GitHubClient {
    async fn account(&self, login: &str) -> Result<AccountProfile, FetchError> {
        let user: GitHubUser = self.get_json(&format!("users/{login}")).await?;
        Ok(AccountProfile {
            login: user.login,
            display_name: user.name.filter(|n| !n.trim().is_empty()),
        })
    }

    async fn list_public_repositories(
        &self,
        login: &str,
    ) -> Result<Vec<RepositoryDescriptor>, FetchError> {
        let mut repositories = Vec::new();
        let mut page = 1usize;
        loop {
            let batch: Vec<GitHubRepository> = self
                .get_json(&format!(
                    "users/{login}/repos?type=owner&per_page={PER_PAGE}&page={page}"
                ))
                .await?;
            let fetched = batch.len();
            repositories.extend(
                batch
                    .into_iter()
                    .filter(|r| !r.private)
                    .map(RepositoryDescriptor::from),
            );
            debug!(page, fetched, "Listed repository page");
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(repositories)
    }
}

#[async_trait]
impl ContentFetcher for GitHubClient {
    async fn language_bytes(
        &self,
        repo: &RepositoryDescriptor,
    ) -> Result<LanguageByteMap, FetchError> {
        self.get_json(&format!("repos/{}/languages", repo.full_name()))
            .await
    }

    async fn readme(&self, repo: &RepositoryDescriptor) -> Result<RemoteContent, FetchError> {
        let content: GitHubContent = self
            .get_json(&format!("repos/{}/readme", repo.full_name()))
            .await?;
        Ok(content.into())
    }

    async fn latest_commit(
        &self,
        repo: &RepositoryDescriptor,
        branch: &str,
    ) -> Result<String, FetchError> {
        let branch: GitHubBranch = self
            .get_json(&format!("repos/{}/branches/{branch}", repo.full_name()))
            .await?;
        Ok(branch.commit.sha)
    }

    async fn file_tree(
        &self,
        repo: &RepositoryDescriptor,
        commit: &str,
    ) -> Result<Vec<FileEntry>, FetchError> {
        let tree: GitHubTree = self
            .get_json(&format!(
                "repos/{}/git/trees/{commit}?recursive=1",
                repo.full_name()
            ))
            .await?;
        if tree.truncated {
            warn!(
                repository = %repo.full_name(),
                entries = tree.tree.len(),
                "File tree truncated by GitHub; counting the entries returned"
            );
        }
        Ok(tree
            .tree
            .into_iter()
            .map(|item| FileEntry {
                kind: EntryKind::from(item.item_type.as_str()),
                path: item.path,
                size: item.size.unwrap_or(0),
                sha: item.sha,
            })
            .collect())
    }

    async fn blob(
        &self,
        repo: &RepositoryDescriptor,
        sha: &str,
    ) -> Result<RemoteContent, FetchError> {
        let content: GitHubContent = self
            .get_json(&format!("repos/{}/git/blobs/{sha}", repo.full_name()))
            .await?;
        Ok(content.into())
    }

    async fn commit_activity(
        &self,
        repo: &RepositoryDescriptor,
    ) -> Result<Option<u64>, FetchError> {
        let response = self
            .get(&format!("repos/{}/stats/commit_activity", repo.full_name()))
            .await?;
        // 202: statistics are still being computed. 204: empty repository.
        if matches!(response.status(), StatusCode::ACCEPTED | StatusCode::NO_CONTENT) {
            debug!(
                repository = %repo.full_name(),
                status = %response.status(),
                "Commit activity unavailable"
            );
            return Ok(None);
        }
        let weeks: Vec<GitHubWeeklyActivity> = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("invalid response body: {e}")))?;
        Ok(Some(weeks.iter().map(|w| w.total).sum()))
    }
}

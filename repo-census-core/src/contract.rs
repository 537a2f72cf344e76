//! # contract: collaborator interfaces and the data they exchange
//!
//! This module defines the two traits the census engine consumes
//! ([`RepositoryProvider`] and [`ContentFetcher`]) together with the plain data
//! types flowing across them: repository descriptors, file tree entries and
//! transfer-encoded content payloads.
//!
//! ## Interface & Extensibility
//! - Implement [`RepositoryProvider`] to enumerate the public repositories of an account.
//! - Implement [`ContentFetcher`] to resolve languages, README, tree, blobs and commit stats.
//! - All methods are async and fail with a [`FetchError`]; the engine decides which
//!   failures are fatal, which become warnings and which are silently zero.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so tests can build deterministic
//!   `MockRepositoryProvider` / `MockContentFetcher` values.
//!
//! ## Adding New Hosting Platforms
//! - Implement both traits for the platform's client.
//! - Map "does not exist" responses to [`FetchError::NotFound`]; the engine relies on it
//!   to tell a missing README apart from a broken one.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Bytes of source per language name, as reported for one repository.
pub type LanguageByteMap = BTreeMap<String, u64>;

/// Public profile of the analysed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub login: String,
    /// Human-readable name, when the account has set one.
    pub display_name: Option<String>,
}

impl AccountProfile {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.login)
    }
}

/// One repository as listed by the provider. Identity is the full name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub created_at: DateTime<Utc>,
    /// Absent for repositories that never received a push.
    pub pushed_at: Option<DateTime<Utc>>,
}

impl RepositoryDescriptor {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Kind of an entry in a recursive file tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule pointer (a commit inside a tree).
    Commit,
}

impl From<&str> for EntryKind {
    fn from(s: &str) -> Self {
        match s {
            "blob" => EntryKind::Blob,
            "commit" => EntryKind::Commit,
            _ => EntryKind::Tree,
        }
    }
}

/// A file or directory in a repository tree at one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes; zero for trees.
    pub size: u64,
    /// Opaque handle resolvable to the raw bytes through [`ContentFetcher::blob`].
    pub sha: String,
}

impl FileEntry {
    /// A blob is countable when its size lies strictly between 0 and `size_limit`.
    pub fn is_countable(&self, size_limit: u64) -> bool {
        self.kind == EntryKind::Blob && self.size > 0 && self.size < size_limit
    }
}

/// Declared transfer encoding of a content payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    Utf8,
    Other(String),
}

impl From<&str> for TransferEncoding {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "base64" => TransferEncoding::Base64,
            "utf-8" | "utf8" => TransferEncoding::Utf8,
            other => TransferEncoding::Other(other.to_string()),
        }
    }
}

/// Raw payload as returned by the hosting platform, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    pub content: String,
    pub encoding: TransferEncoding,
}

impl RemoteContent {
    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: TransferEncoding::Base64,
        }
    }
}

/// Failure of a single collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("transient error: {0}")]
    Transient(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Enumerates the repositories of an account.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Look up the account itself. `NotFound` means the account does not exist.
    async fn account(&self, login: &str) -> Result<AccountProfile, FetchError>;

    /// All public repositories owned by the account, in provider order.
    async fn list_public_repositories(
        &self,
        login: &str,
    ) -> Result<Vec<RepositoryDescriptor>, FetchError>;
}

/// Read-only access to one repository's contents and statistics.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Bytes per language for the repository.
    async fn language_bytes(&self, repo: &RepositoryDescriptor)
        -> Result<LanguageByteMap, FetchError>;

    /// README payload. A repository without README answers `NotFound`.
    async fn readme(&self, repo: &RepositoryDescriptor) -> Result<RemoteContent, FetchError>;

    /// Commit id at the tip of `branch`.
    async fn latest_commit(
        &self,
        repo: &RepositoryDescriptor,
        branch: &str,
    ) -> Result<String, FetchError>;

    /// Full recursive tree at `commit`.
    async fn file_tree(
        &self,
        repo: &RepositoryDescriptor,
        commit: &str,
    ) -> Result<Vec<FileEntry>, FetchError>;

    /// Blob payload for a tree entry's handle.
    async fn blob(&self, repo: &RepositoryDescriptor, sha: &str)
        -> Result<RemoteContent, FetchError>;

    /// Commits in the platform's recent activity window; `None` when unavailable.
    async fn commit_activity(&self, repo: &RepositoryDescriptor)
        -> Result<Option<u64>, FetchError>;
}

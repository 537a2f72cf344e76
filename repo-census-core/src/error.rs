//! Error taxonomy of a census run.
//!
//! Only [`CensusError`] ever leaves the engine as an `Err`. Everything else is
//! caught at the narrowest scope and turned into a zero contribution or a
//! [`RepositoryWarning`].

use serde::Serialize;
use thiserror::Error;

use crate::contract::FetchError;

/// Fatal failures: no report can be produced.
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("account '{0}' not found")]
    AccountNotFound(String),

    #[error("authorization failed for account '{account}': {message}")]
    Authorization { account: String, message: String },

    #[error("failed to look up account '{account}': {source}")]
    AccountLookup {
        account: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to list repositories for '{account}': {source}")]
    Listing {
        account: String,
        #[source]
        source: FetchError,
    },
}

impl CensusError {
    /// Classify a failed account lookup.
    pub fn from_account_lookup(account: &str, err: FetchError) -> Self {
        Self::classify(account, err, |account, source| CensusError::AccountLookup {
            account,
            source,
        })
    }

    /// Classify a failed repository listing.
    pub fn from_listing(account: &str, err: FetchError) -> Self {
        Self::classify(account, err, |account, source| CensusError::Listing {
            account,
            source,
        })
    }

    fn classify(
        account: &str,
        err: FetchError,
        otherwise: impl FnOnce(String, FetchError) -> Self,
    ) -> Self {
        match err {
            FetchError::NotFound => CensusError::AccountNotFound(account.to_string()),
            FetchError::Unauthorized(message) => CensusError::Authorization {
                account: account.to_string(),
                message,
            },
            other => otherwise(account.to_string(), other),
        }
    }
}

/// The analysis step a warning was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Languages,
    Readme,
    FileTree,
    /// The repository as a whole, e.g. its overall time budget ran out.
    Repository,
}

/// Coarse kind of the failure behind a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Unauthorized,
    RateLimited,
    Transient,
    Server,
    Timeout,
}

impl From<&FetchError> for FailureKind {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::NotFound => FailureKind::NotFound,
            FetchError::Unauthorized(_) => FailureKind::Unauthorized,
            FetchError::RateLimited(_) => FailureKind::RateLimited,
            FetchError::Transient(_) => FailureKind::Transient,
            FetchError::Server(_) => FailureKind::Server,
            FetchError::Timeout(_) => FailureKind::Timeout,
        }
    }
}

/// A repository that could only be partially analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryWarning {
    pub repository: String,
    pub stage: AnalysisStage,
    pub kind: FailureKind,
    pub message: String,
}

impl RepositoryWarning {
    pub fn new(repository: &str, stage: AnalysisStage, err: &FetchError) -> Self {
        Self {
            repository: repository.to_string(),
            stage,
            kind: FailureKind::from(err),
            message: err.to_string(),
        }
    }
}

//! High-level pipeline: list → analyze → merge for every repository of an account.
//!
//! This module provides the top-level orchestration of a census run. It:
//!   - Looks up the account and lists its public repositories (fatal on failure)
//!   - Drives each repository through [`RepositoryAnalyzer`] with bounded concurrency
//!   - Merges each outcome into one [`AggregateReport`] at a single merge point, in
//!     provider order, so the result does not depend on the concurrency degree.
//!     Analyses finish in any order; outcomes that finish early wait keyed by
//!     their listing index until every earlier repository has been merged
//!   - Collects per-repository warnings for observability
//!
//! # Major Types
//! - [`AggregateReport`]: the consolidated metrics, owned by the run until it ends
//! - [`CensusReport`]: the report plus account, warnings and cancellation state
//!
//! # Error Handling
//! Only account lookup and listing failures are returned as `Err`. Everything
//! below the repository level is absorbed by the analyzer.
//!
//! # Cancellation
//! When the [`CancelSignal`] fires, outstanding analyses are dropped (aborting
//! their in-flight calls). Analyses that already finished, including those still
//! waiting behind an unfinished repository, are merged in provider order and the
//! report is returned with `cancelled` set.
//!
//! # Navigation
//! - Main entrypoint: [`run_census`]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::analyzer::{RepositoryAnalyzer, RepositoryMetrics, RepositoryOutcome};
use crate::cancel::CancelSignal;
use crate::config::AnalysisOptions;
use crate::contract::{AccountProfile, ContentFetcher, RepositoryDescriptor, RepositoryProvider};
use crate::error::{CensusError, RepositoryWarning};
use crate::keywords::KeywordCounts;
use crate::languages::LanguageStats;

/// Consolidated metrics over every recorded repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub lines_of_code: u64,
    pub documentation_lines: u64,
    pub commits: u64,
    pub languages: LanguageStats,
    pub keywords: KeywordCounts,
    /// Full names in provider order.
    pub repositories: Vec<String>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub counted_files: u64,
    pub skipped_files: u64,
}

impl AggregateReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor-level facts: name, activity span and name keywords. Independent
    /// of how deep the analysis of the repository got.
    pub fn record_repository(&mut self, repo: &RepositoryDescriptor) {
        self.repositories.push(repo.full_name());

        if self.first_activity.map_or(true, |first| repo.created_at < first) {
            self.first_activity = Some(repo.created_at);
        }
        if let Some(pushed) = repo.pushed_at {
            if self.last_activity.map_or(true, |last| pushed > last) {
                self.last_activity = Some(pushed);
            }
        }

        self.keywords.extract_repository_name(&repo.name);
    }

    pub fn merge(&mut self, metrics: &RepositoryMetrics) {
        self.lines_of_code += metrics.code_lines;
        self.documentation_lines += metrics.documentation_lines;
        self.commits += metrics.commits;
        self.languages.accumulate(&metrics.languages);
        self.keywords.merge(&metrics.keywords);
        self.counted_files += metrics.counted_files;
        self.skipped_files += metrics.skipped_files;
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct CensusReport {
    pub run_id: Uuid,
    pub account: AccountProfile,
    pub aggregate: AggregateReport,
    pub warnings: Vec<RepositoryWarning>,
    /// Repositories the provider listed, including any not reached before cancellation.
    pub listed_repositories: usize,
    pub cancelled: bool,
}

impl CensusReport {
    /// Number of distinct repositories with at least one warning.
    pub fn partially_analyzed(&self) -> usize {
        let mut names: Vec<&str> = self.warnings.iter().map(|w| w.repository.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

/// The single merge point of a run.
fn absorb(
    report: &mut AggregateReport,
    warnings: &mut Vec<RepositoryWarning>,
    repo: &RepositoryDescriptor,
    outcome: RepositoryOutcome,
) {
    report.record_repository(repo);
    report.merge(&outcome.metrics);
    warnings.extend(outcome.warnings);
}

/// Entrypoint: run a census over every public repository of `account`.
pub async fn run_census<P, F>(
    provider: &P,
    fetcher: &F,
    account: &str,
    options: &AnalysisOptions,
    cancel: CancelSignal,
) -> Result<CensusReport, CensusError>
where
    P: RepositoryProvider + ?Sized,
    F: ContentFetcher + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("census", %run_id, account = %account);
    census(provider, fetcher, account, options, cancel, run_id)
        .instrument(span)
        .await
}

async fn census<P, F>(
    provider: &P,
    fetcher: &F,
    account: &str,
    options: &AnalysisOptions,
    cancel: CancelSignal,
    run_id: Uuid,
) -> Result<CensusReport, CensusError>
where
    P: RepositoryProvider + ?Sized,
    F: ContentFetcher + ?Sized,
{
    info!("[CENSUS] Starting census");
    options.trace_loaded();

    let profile = provider.account(account).await.map_err(|e| {
        error!(error = %e, "[CENSUS][ERROR] Account lookup failed");
        CensusError::from_account_lookup(account, e)
    })?;

    let repos = provider
        .list_public_repositories(account)
        .await
        .map_err(|e| {
            error!(error = %e, "[CENSUS][ERROR] Listing repositories failed");
            CensusError::from_listing(account, e)
        })?;
    let total = repos.len();
    info!(repositories = total, "[CENSUS] Starting analysis of repositories");

    let analyzer = RepositoryAnalyzer::new(fetcher, options);
    let mut report = AggregateReport::new();
    let mut warnings: Vec<RepositoryWarning> = Vec::new();
    let mut cancelled = false;

    // Finished outcomes keyed by listing index, waiting for their turn to merge.
    let mut finished: BTreeMap<usize, (&RepositoryDescriptor, RepositoryOutcome)> =
        BTreeMap::new();
    let mut next_to_merge = 0usize;
    {
        let outcomes = stream::iter(repos.iter().enumerate())
            .map(|(index, repo)| {
                let analyzer = &analyzer;
                async move {
                    info!("[{}/{}] Analyzing: {}", index + 1, total, repo.full_name());
                    (index, repo, analyzer.analyze(repo).await)
                }
            })
            .buffer_unordered(options.repository_concurrency());
        let mut outcomes = std::pin::pin!(outcomes);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = outcomes.next() => match next {
                    Some((index, repo, outcome)) => {
                        finished.insert(index, (repo, outcome));
                        while let Some((repo, outcome)) = finished.remove(&next_to_merge) {
                            absorb(&mut report, &mut warnings, repo, outcome);
                            next_to_merge += 1;
                        }
                    }
                    None => break,
                },
            }
        }
        // Dropping the stream here aborts analyses still in flight.
    }

    // Only non-empty after cancellation: completed analyses queued behind an unfinished one.
    for (repo, outcome) in finished.into_values() {
        absorb(&mut report, &mut warnings, repo, outcome);
    }
    if cancelled {
        warn!(
            recorded = report.repositories.len(),
            listed = total,
            "[CENSUS] Cancelled, returning partial report"
        );
    }

    let census = CensusReport {
        run_id,
        account: profile,
        aggregate: report,
        warnings,
        listed_repositories: total,
        cancelled,
    };
    info!(
        repositories = census.aggregate.repositories.len(),
        partially_analyzed = census.partially_analyzed(),
        cancelled,
        "[CENSUS] Analysis complete"
    );
    Ok(census)
}

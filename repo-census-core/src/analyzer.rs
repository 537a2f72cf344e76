//! Per-repository analysis: languages → README → file tree → commit activity.
//!
//! Each step runs behind its own failure boundary so one repository yields as
//! much as it can:
//!   - languages: failure contributes zero bytes and a warning, analysis continues
//!   - README: absence is normal; any other failure contributes zero lines and a warning
//!   - file tree: a failed branch or tree lookup ends this repository's analysis with a
//!     warning, keeping what the previous steps gathered; single files that cannot be
//!     fetched or decoded are skipped silently
//!   - commit activity: failure or unavailability contributes zero, no warning
//!
//! Every remote call takes a permit from a run-wide request budget and carries
//! its own timeout; the repository as a whole carries one too. A repository
//! that runs out of time keeps the results of the steps it finished.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

use crate::config::AnalysisOptions;
use crate::contract::{
    ContentFetcher, FetchError, FileEntry, LanguageByteMap, RepositoryDescriptor,
};
use crate::decode::{decode, Decoded};
use crate::error::{AnalysisStage, RepositoryWarning};
use crate::keywords::KeywordCounts;
use crate::lines::count_lines;

/// One repository's contribution to the aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMetrics {
    pub code_lines: u64,
    pub documentation_lines: u64,
    pub commits: u64,
    pub languages: LanguageByteMap,
    /// Keywords from the README body. Name keywords are the aggregator's job.
    pub keywords: KeywordCounts,
    pub counted_files: u64,
    /// Eligible files left out because they could not be fetched or decoded.
    pub skipped_files: u64,
}

#[derive(Debug, Clone)]
pub struct RepositoryOutcome {
    pub metrics: RepositoryMetrics,
    pub warnings: Vec<RepositoryWarning>,
}

pub struct RepositoryAnalyzer<'a, F: ContentFetcher + ?Sized> {
    fetcher: &'a F,
    options: &'a AnalysisOptions,
    budget: Semaphore,
}

impl<'a, F: ContentFetcher + ?Sized> RepositoryAnalyzer<'a, F> {
    pub fn new(fetcher: &'a F, options: &'a AnalysisOptions) -> Self {
        Self {
            fetcher,
            options,
            budget: Semaphore::new(options.max_in_flight_requests()),
        }
    }

    /// Analyze one repository. Never fails: problems end up in `warnings`.
    ///
    /// When the repository budget runs out, steps that already finished keep
    /// their results; the step in flight contributes nothing.
    pub async fn analyze(&self, repo: &RepositoryDescriptor) -> RepositoryOutcome {
        let full_name = repo.full_name();
        let span = tracing::info_span!("analyze_repository", repository = %full_name);
        let limit = self.options.repository_timeout();
        let mut metrics = RepositoryMetrics::default();
        let mut warnings = Vec::new();

        let steps = self.run_steps(repo, &full_name, &mut metrics, &mut warnings);
        if tokio::time::timeout(limit, steps)
            .instrument(span)
            .await
            .is_err()
        {
            let err = FetchError::Timeout(limit);
            warn!(repository = %full_name, error = %err, "Repository analysis timed out");
            warnings.push(RepositoryWarning::new(
                &full_name,
                AnalysisStage::Repository,
                &err,
            ));
        }
        RepositoryOutcome { metrics, warnings }
    }

    async fn run_steps(
        &self,
        repo: &RepositoryDescriptor,
        full_name: &str,
        metrics: &mut RepositoryMetrics,
        warnings: &mut Vec<RepositoryWarning>,
    ) {
        match self.call(self.fetcher.language_bytes(repo)).await {
            Ok(languages) => {
                debug!(languages = languages.len(), "Fetched language breakdown");
                metrics.languages = languages;
            }
            Err(e) => {
                warn!(repository = %full_name, error = %e, "Could not fetch language breakdown");
                warnings.push(RepositoryWarning::new(full_name, AnalysisStage::Languages, &e));
            }
        }

        match self.call(self.fetcher.readme(repo)).await {
            Ok(content) => match decode(&content) {
                Decoded::Text(text) => {
                    metrics.documentation_lines = count_lines(&text);
                    metrics.keywords.extract(&text);
                    debug!(lines = metrics.documentation_lines, "Counted README");
                }
                Decoded::Undecodable(reason) => {
                    debug!(reason = %reason, "README is not decodable text, ignoring");
                }
            },
            Err(FetchError::NotFound) => debug!("No README"),
            Err(e) => {
                warn!(repository = %full_name, error = %e, "Could not fetch README");
                warnings.push(RepositoryWarning::new(full_name, AnalysisStage::Readme, &e));
            }
        }

        if let Err(e) = self.count_code_lines(repo, metrics).await {
            warn!(
                repository = %full_name,
                error = %e,
                "Could not fully analyze repository, file tree unavailable"
            );
            warnings.push(RepositoryWarning::new(full_name, AnalysisStage::FileTree, &e));
            return;
        }

        match self.call(self.fetcher.commit_activity(repo)).await {
            Ok(Some(commits)) => metrics.commits = commits,
            Ok(None) => debug!("Commit activity unavailable"),
            Err(e) => debug!(error = %e, "Could not fetch commit activity"),
        }

        info!(
            code_lines = metrics.code_lines,
            documentation_lines = metrics.documentation_lines,
            commits = metrics.commits,
            skipped_files = metrics.skipped_files,
            "Repository analyzed"
        );
    }

    async fn count_code_lines(
        &self,
        repo: &RepositoryDescriptor,
        metrics: &mut RepositoryMetrics,
    ) -> Result<(), FetchError> {
        let commit = self
            .call(self.fetcher.latest_commit(repo, &repo.default_branch))
            .await?;
        let tree = self.call(self.fetcher.file_tree(repo, &commit)).await?;
        let size_limit = self.options.size_limit;
        debug!(commit = %commit, entries = tree.len(), "Fetched file tree");

        let countable = tree.iter().filter(|e| e.is_countable(size_limit));
        // Totals land in `metrics` only once every file is settled.
        let (lines, counted, skipped) = stream::iter(countable)
            .map(|entry| self.count_file(repo, entry))
            .buffer_unordered(self.options.file_concurrency())
            .fold((0u64, 0u64, 0u64), |(lines, counted, skipped), tally| async move {
                match tally {
                    Some(n) => (lines + n, counted + 1, skipped),
                    None => (lines, counted, skipped + 1),
                }
            })
            .await;

        metrics.code_lines += lines;
        metrics.counted_files += counted;
        metrics.skipped_files += skipped;
        Ok(())
    }

    async fn count_file(&self, repo: &RepositoryDescriptor, entry: &FileEntry) -> Option<u64> {
        match self.call(self.fetcher.blob(repo, &entry.sha)).await {
            Ok(content) => match decode(&content) {
                Decoded::Text(text) => Some(count_lines(&text)),
                Decoded::Undecodable(reason) => {
                    debug!(path = %entry.path, reason = %reason, "Skipping undecodable file");
                    None
                }
            },
            Err(e) => {
                debug!(path = %entry.path, error = %e, "Skipping file that could not be fetched");
                None
            }
        }
    }

    /// Run one remote call inside the request budget and the per-call timeout.
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        let _permit = self
            .budget
            .acquire()
            .await
            .map_err(|e| FetchError::Transient(format!("request budget closed: {e}")))?;
        let limit = self.options.request_timeout();
        tokio::time::timeout(limit, request)
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(limit)))
    }
}

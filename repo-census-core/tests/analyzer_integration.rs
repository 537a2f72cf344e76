use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{TimeZone, Utc};
use repo_census_core::analyzer::RepositoryAnalyzer;
use repo_census_core::config::AnalysisOptions;
use repo_census_core::contract::{
    ContentFetcher, EntryKind, FetchError, FileEntry, LanguageByteMap, MockContentFetcher,
    RemoteContent, RepositoryDescriptor,
};
use repo_census_core::error::{AnalysisStage, FailureKind};

fn descriptor(name: &str) -> RepositoryDescriptor {
    RepositoryDescriptor {
        owner: "octo".to_string(),
        name: name.to_string(),
        default_branch: "main".to_string(),
        created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        pushed_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
    }
}

fn blob_entry(path: &str, size: u64) -> FileEntry {
    FileEntry {
        path: path.to_string(),
        kind: EntryKind::Blob,
        size,
        sha: format!("sha-{path}"),
    }
}

fn text(body: &str) -> RemoteContent {
    RemoteContent::base64(BASE64.encode(body))
}

#[tokio::test]
async fn test_readme_absent_single_text_file() {
    let mut fetcher = MockContentFetcher::new();
    fetcher
        .expect_language_bytes()
        .returning(|_| Ok(LanguageByteMap::new()));
    fetcher.expect_readme().returning(|_| Err(FetchError::NotFound));
    fetcher
        .expect_latest_commit()
        .withf(|_, branch| branch == "main")
        .returning(|_, _| Ok("c0ffee".to_string()));
    fetcher
        .expect_file_tree()
        .withf(|_, commit| commit == "c0ffee")
        .returning(|_, _| Ok(vec![blob_entry("src/lib.rs", 5)]));
    fetcher
        .expect_blob()
        .returning(|_, _| Ok(text("a\nb\nc")));
    fetcher.expect_commit_activity().returning(|_| Ok(None));

    let options = AnalysisOptions::default();
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("solo")).await;

    assert_eq!(outcome.metrics.documentation_lines, 0);
    assert_eq!(outcome.metrics.code_lines, 3);
    assert_eq!(outcome.metrics.counted_files, 1);
    assert!(outcome.metrics.keywords.is_empty());
    assert!(outcome.warnings.is_empty(), "missing README is not a warning");
}

#[tokio::test]
async fn test_tree_failure_keeps_earlier_results_and_warns_once() {
    let mut fetcher = MockContentFetcher::new();
    fetcher.expect_language_bytes().returning(|_| {
        Ok([("Rust".to_string(), 1200u64)].into_iter().collect())
    });
    fetcher
        .expect_readme()
        .returning(|_| Ok(text("# Tokio Helpers\n\nAsync helpers\n")));
    fetcher
        .expect_latest_commit()
        .returning(|_, _| Ok("abc".to_string()));
    fetcher
        .expect_file_tree()
        .returning(|_, _| Err(FetchError::Server("502 Bad Gateway".to_string())));
    fetcher.expect_blob().never();
    fetcher.expect_commit_activity().never();

    let options = AnalysisOptions::default();
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("helpers")).await;

    assert_eq!(outcome.metrics.languages.get("Rust"), Some(&1200));
    assert_eq!(outcome.metrics.documentation_lines, 3);
    assert_eq!(outcome.metrics.keywords.get("helpers"), 2);
    assert_eq!(outcome.metrics.keywords.get("tokio"), 1);
    assert_eq!(outcome.metrics.code_lines, 0);

    assert_eq!(outcome.warnings.len(), 1);
    let warning = &outcome.warnings[0];
    assert_eq!(warning.repository, "octo/helpers");
    assert_eq!(warning.stage, AnalysisStage::FileTree);
    assert_eq!(warning.kind, FailureKind::Server);
}

#[tokio::test]
async fn test_size_boundaries_and_entry_kinds() {
    let limit = 100u64;
    let mut fetcher = MockContentFetcher::new();
    fetcher
        .expect_language_bytes()
        .returning(|_| Ok(LanguageByteMap::new()));
    fetcher.expect_readme().returning(|_| Err(FetchError::NotFound));
    fetcher
        .expect_latest_commit()
        .returning(|_, _| Ok("head".to_string()));
    fetcher.expect_file_tree().returning(move |_, _| {
        Ok(vec![
            blob_entry("empty.txt", 0),
            blob_entry("at_limit.txt", limit),
            blob_entry("below_limit.txt", limit - 1),
            FileEntry {
                path: "src".to_string(),
                kind: EntryKind::Tree,
                size: 10,
                sha: "tree-sha".to_string(),
            },
            FileEntry {
                path: "vendor/dep".to_string(),
                kind: EntryKind::Commit,
                size: 10,
                sha: "submodule-sha".to_string(),
            },
        ])
    });
    fetcher
        .expect_blob()
        .withf(|_, sha| sha == "sha-below_limit.txt")
        .times(1)
        .returning(|_, _| Ok(text("one\ntwo\n")));
    fetcher.expect_commit_activity().returning(|_| Ok(Some(42)));

    let options = AnalysisOptions {
        size_limit: limit,
        ..AnalysisOptions::default()
    };
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("bounds")).await;

    assert_eq!(outcome.metrics.code_lines, 2);
    assert_eq!(outcome.metrics.counted_files, 1);
    assert_eq!(outcome.metrics.skipped_files, 0);
    assert_eq!(outcome.metrics.commits, 42);
}

#[tokio::test]
async fn test_file_failures_are_swallowed() {
    let mut fetcher = MockContentFetcher::new();
    fetcher
        .expect_language_bytes()
        .returning(|_| Ok(LanguageByteMap::new()));
    fetcher.expect_readme().returning(|_| Err(FetchError::NotFound));
    fetcher
        .expect_latest_commit()
        .returning(|_, _| Ok("head".to_string()));
    fetcher.expect_file_tree().returning(|_, _| {
        Ok(vec![
            blob_entry("ok.rs", 10),
            blob_entry("gone.rs", 10),
            blob_entry("image.png", 10),
            blob_entry("flaky.rs", 10),
        ])
    });
    fetcher.expect_blob().returning(|_, sha| match sha {
        "sha-ok.rs" => Ok(text("fn a() {}\nfn b() {}\n")),
        "sha-gone.rs" => Err(FetchError::NotFound),
        "sha-image.png" => Ok(RemoteContent::base64(BASE64.encode([0x89, 0x50, 0xff, 0xfe]))),
        _ => Err(FetchError::RateLimited("secondary rate limit".to_string())),
    });
    fetcher.expect_commit_activity().returning(|_| Ok(Some(7)));

    let options = AnalysisOptions::default();
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("mixed")).await;

    assert_eq!(outcome.metrics.code_lines, 2);
    assert_eq!(outcome.metrics.counted_files, 1);
    assert_eq!(outcome.metrics.skipped_files, 3);
    assert_eq!(outcome.metrics.commits, 7);
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_language_and_readme_failures_do_not_stop_analysis() {
    let mut fetcher = MockContentFetcher::new();
    fetcher
        .expect_language_bytes()
        .returning(|_| Err(FetchError::Transient("connection reset".to_string())));
    fetcher
        .expect_readme()
        .returning(|_| Err(FetchError::Server("500".to_string())));
    fetcher
        .expect_latest_commit()
        .returning(|_, _| Ok("head".to_string()));
    fetcher
        .expect_file_tree()
        .returning(|_, _| Ok(vec![blob_entry("main.go", 20)]));
    fetcher
        .expect_blob()
        .returning(|_, _| Ok(text("package main\n")));
    fetcher
        .expect_commit_activity()
        .returning(|_| Err(FetchError::Transient("stats unavailable".to_string())));

    let options = AnalysisOptions::default();
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("partial")).await;

    assert!(outcome.metrics.languages.is_empty());
    assert_eq!(outcome.metrics.documentation_lines, 0);
    assert_eq!(outcome.metrics.code_lines, 1);
    assert_eq!(outcome.metrics.commits, 0);

    let stages: Vec<AnalysisStage> = outcome.warnings.iter().map(|w| w.stage).collect();
    assert_eq!(stages, vec![AnalysisStage::Languages, AnalysisStage::Readme]);
}

/// Which call of [`StallingFetcher`] never answers in time.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Stall {
    Readme,
    LatestCommit,
}

/// Answers every call at once except the stalled one, which sleeps for an hour.
struct StallingFetcher {
    stall: Stall,
}

impl StallingFetcher {
    async fn maybe_stall(&self, at: Stall) {
        if self.stall == at {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

#[async_trait]
impl ContentFetcher for StallingFetcher {
    async fn language_bytes(
        &self,
        _repo: &RepositoryDescriptor,
    ) -> Result<LanguageByteMap, FetchError> {
        Ok([("Go".to_string(), 10u64)].into_iter().collect())
    }

    async fn readme(&self, _repo: &RepositoryDescriptor) -> Result<RemoteContent, FetchError> {
        self.maybe_stall(Stall::Readme).await;
        Ok(text("# Gopher\nTools\n"))
    }

    async fn latest_commit(
        &self,
        _repo: &RepositoryDescriptor,
        _branch: &str,
    ) -> Result<String, FetchError> {
        self.maybe_stall(Stall::LatestCommit).await;
        Ok("head".to_string())
    }

    async fn file_tree(
        &self,
        _repo: &RepositoryDescriptor,
        _commit: &str,
    ) -> Result<Vec<FileEntry>, FetchError> {
        Ok(vec![blob_entry("a.go", 3)])
    }

    async fn blob(
        &self,
        _repo: &RepositoryDescriptor,
        _sha: &str,
    ) -> Result<RemoteContent, FetchError> {
        Ok(text("x\ny\n"))
    }

    async fn commit_activity(
        &self,
        _repo: &RepositoryDescriptor,
    ) -> Result<Option<u64>, FetchError> {
        Ok(Some(1))
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_counts_as_fetch_failure() {
    let options = AnalysisOptions {
        request_timeout_secs: 5,
        ..AnalysisOptions::default()
    };
    let fetcher = StallingFetcher {
        stall: Stall::Readme,
    };
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("slow")).await;

    assert_eq!(outcome.metrics.documentation_lines, 0);
    assert_eq!(outcome.metrics.code_lines, 2);
    assert_eq!(outcome.metrics.commits, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].stage, AnalysisStage::Readme);
    assert_eq!(outcome.warnings[0].kind, FailureKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_repository_timeout_keeps_finished_steps() {
    let options = AnalysisOptions {
        request_timeout_secs: 7200,
        repository_timeout_secs: 60,
        ..AnalysisOptions::default()
    };
    let fetcher = StallingFetcher {
        stall: Stall::LatestCommit,
    };
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("stuck")).await;

    assert_eq!(outcome.metrics.languages.get("Go"), Some(&10));
    assert_eq!(outcome.metrics.documentation_lines, 2);
    assert_eq!(outcome.metrics.keywords.get("gopher"), 1);
    assert_eq!(outcome.metrics.code_lines, 0);
    assert_eq!(outcome.metrics.counted_files, 0);
    assert_eq!(outcome.metrics.commits, 0);

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].stage, AnalysisStage::Repository);
    assert_eq!(outcome.warnings[0].kind, FailureKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_repository_timeout_during_readme_keeps_languages() {
    let options = AnalysisOptions {
        request_timeout_secs: 7200,
        repository_timeout_secs: 60,
        ..AnalysisOptions::default()
    };
    let fetcher = StallingFetcher {
        stall: Stall::Readme,
    };
    let analyzer = RepositoryAnalyzer::new(&fetcher, &options);
    let outcome = analyzer.analyze(&descriptor("stuck")).await;

    assert_eq!(outcome.metrics.languages.get("Go"), Some(&10));
    assert_eq!(outcome.metrics.documentation_lines, 0);
    assert!(outcome.metrics.keywords.is_empty());
    let stages: Vec<AnalysisStage> = outcome.warnings.iter().map(|w| w.stage).collect();
    assert_eq!(stages, vec![AnalysisStage::Repository]);
}

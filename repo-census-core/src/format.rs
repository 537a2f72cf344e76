//! Rendering of a finished census into a deterministic display structure.
//!
//! [`ReportView`] is plain data: `Display` renders it as the terminal report,
//! `Serialize` exports it for other presentation layers. Building a view never
//! touches the report it reads from.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{AggregateReport, CensusReport};
use crate::error::RepositoryWarning;

pub const TOP_KEYWORDS: usize = 10;
/// Languages at or below this share of all bytes are left out.
pub const MIN_LANGUAGE_PERCENTAGE: f64 = 0.1;
pub const NOT_AVAILABLE: &str = "N/A";

const RULE: &str = "==============================================";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub top_keywords: usize,
    /// Also show skipped files and every warning record.
    pub verbose: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            top_keywords: TOP_KEYWORDS,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountLine {
    pub label: String,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRow {
    pub rank: usize,
    pub keyword: String,
    pub mentions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageRow {
    pub language: String,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountLine>,
    pub first_activity: String,
    pub last_activity: String,
    pub lines_of_code: String,
    pub documentation_lines: String,
    pub commits: String,
    pub top_keywords: usize,
    pub keywords: Vec<KeywordRow>,
    pub languages: Vec<LanguageRow>,
    pub repositories: Vec<String>,
    pub partially_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_files: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RepositoryWarning>,
    /// `(recorded, listed)` when the run was cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<(usize, usize)>,
}

/// Integer with `,` between every group of three digits.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn format_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// View of the aggregate alone, without account or run annotations.
pub fn format_aggregate(report: &AggregateReport, options: &FormatOptions) -> ReportView {
    let keywords = report
        .keywords
        .top(options.top_keywords)
        .into_iter()
        .enumerate()
        .map(|(i, kc)| KeywordRow {
            rank: i + 1,
            keyword: kc.keyword,
            mentions: group_thousands(kc.count),
        })
        .collect();

    let languages = report
        .languages
        .shares()
        .into_iter()
        .filter(|share| share.percentage > MIN_LANGUAGE_PERCENTAGE)
        .map(|share| LanguageRow {
            language: share.language,
            percentage: format!("{:.1}%", share.percentage),
        })
        .collect();

    ReportView {
        account: None,
        first_activity: format_date(report.first_activity),
        last_activity: format_date(report.last_activity),
        lines_of_code: group_thousands(report.lines_of_code),
        documentation_lines: group_thousands(report.documentation_lines),
        commits: group_thousands(report.commits),
        top_keywords: options.top_keywords,
        keywords,
        languages,
        repositories: report.repositories.clone(),
        partially_analyzed: 0,
        skipped_files: options
            .verbose
            .then(|| group_thousands(report.skipped_files)),
        warnings: Vec::new(),
        cancelled: None,
    }
}

/// Full view of a census run.
pub fn format_report(census: &CensusReport, options: &FormatOptions) -> ReportView {
    let mut view = format_aggregate(&census.aggregate, options);
    view.account = Some(AccountLine {
        label: census.account.label().to_string(),
        login: census.account.login.clone(),
    });
    view.partially_analyzed = census.partially_analyzed();
    if options.verbose {
        view.warnings = census.warnings.clone();
    }
    if census.cancelled {
        view.cancelled = Some((
            census.aggregate.repositories.len(),
            census.listed_repositories,
        ));
    }
    view
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(account) = &self.account {
            writeln!(f, "Results for {} (@{})", account.label, account.login)?;
        }
        writeln!(f, "{RULE}")?;

        writeln!(f, "\nActivity Span")?;
        writeln!(f, "First activity (oldest repo): {}", self.first_activity)?;
        writeln!(f, "Last activity (latest push):  {}", self.last_activity)?;

        writeln!(f, "\nGeneral Statistics")?;
        writeln!(f, "Total lines of code: {}", self.lines_of_code)?;
        writeln!(
            f,
            "Total documentation lines (in READMEs): {}",
            self.documentation_lines
        )?;
        writeln!(f, "Total commits (last year): {}", self.commits)?;

        writeln!(
            f,
            "\nTop {} Keywords (from Repo Names & READMEs)",
            self.top_keywords
        )?;
        if self.keywords.is_empty() {
            writeln!(f, "No keywords found.")?;
        }
        for row in &self.keywords {
            writeln!(f, "{}. {} ({} mentions)", row.rank, row.keyword, row.mentions)?;
        }

        writeln!(f, "\nProgramming Languages Used:")?;
        if self.languages.is_empty() {
            writeln!(f, "No language data found.")?;
        }
        for row in &self.languages {
            writeln!(f, "  - {}: {}", row.language, row.percentage)?;
        }

        writeln!(f, "\nRepository List ({} total)", self.repositories.len())?;
        for name in &self.repositories {
            writeln!(f, "  - {name}")?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Partially analyzed repositories: {}",
            self.partially_analyzed
        )?;
        if let Some(skipped) = &self.skipped_files {
            writeln!(f, "Skipped files (unreadable or not text): {skipped}")?;
        }
        for w in &self.warnings {
            writeln!(
                f,
                "  ! {} [{:?}/{:?}]: {}",
                w.repository, w.stage, w.kind, w.message
            )?;
        }
        if let Some((recorded, listed)) = self.cancelled {
            writeln!(
                f,
                "Run cancelled: {recorded} of {listed} repositories analyzed"
            )?;
        }
        write!(f, "{RULE}")
    }
}

///
/// This module implements the CLI interface for repo-census: command parsing,
/// argument validation and the async entrypoint.
///
/// All census logic (analysis, aggregation, formatting) lives in the [`repo-census-core`] crate.
/// This module is strictly CLI glue: it loads the config, builds the GitHub client,
/// wires Ctrl-C to the cancellation signal and prints the report.
///
/// ## How To Use
/// - For command-line users: use the installed `repo-census` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`repo-census-core`]: ../../repo-census-core/
use crate::github::GitHubClient;
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use repo_census_core::aggregate::{run_census, CensusReport};
use repo_census_core::cancel::cancel_channel;
use repo_census_core::format::{format_report, FormatOptions};
use std::path::PathBuf;

/// CLI for repo-census: code and activity statistics for a GitHub account.
#[derive(Parser)]
#[clap(
    name = "repo-census",
    version,
    about = "Aggregate code, documentation and activity statistics across an account's public GitHub repositories"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse every public repository of the account and print the report
    Report {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Account login; overrides `account` in the config file
        #[clap(long)]
        account: Option<String>,
        /// Output format
        #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Include skipped-file counts and per-repository warnings
        #[clap(long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render a finished report in the requested format.
pub fn render(report: &CensusReport, format: OutputFormat, verbose: bool) -> Result<String> {
    let options = FormatOptions {
        verbose,
        ..FormatOptions::default()
    };
    let view = format_report(report, &options);
    Ok(match format {
        OutputFormat::Text => view.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&view)?,
    })
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Report {
            config,
            account,
            format,
            verbose,
        } => {
            let config = load_config(config)?;
            let account = account.or(config.account).ok_or_else(|| {
                anyhow::anyhow!("No account given: pass --account or set `account` in the config")
            })?;
            tracing::info!(command = "report", %account, "Starting census");

            let client = GitHubClient::new(&config.api)?;
            let (handle, signal) = cancel_channel();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, finishing with a partial report");
                    handle.cancel();
                }
            });

            let result = run_census(&client, &client, &account, &config.analysis, signal).await;
            interrupt.abort();

            match result {
                Ok(report) => {
                    tracing::info!(
                        command = "report",
                        repositories = report.aggregate.repositories.len(),
                        warnings = report.warnings.len(),
                        cancelled = report.cancelled,
                        "Census complete"
                    );
                    println!("{}", render(&report, format, verbose)?);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "report", error = %e, "Census failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

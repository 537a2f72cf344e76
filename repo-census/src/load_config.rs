/// `load_config` module: Loads a static YAML config and injects the GitHub token from the environment.
///
/// This module is the only place where untrusted YAML is parsed and mapped to typed structs.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Fill the `api` and `analysis` sections with defaults when they are omitted
/// - Inject `GITHUB_TOKEN` into the API settings; the token never lives in the file
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the CLI boundary.
use anyhow::Result;
use repo_census_core::config::AnalysisOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::github::GitHubApiConfig;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    /// Login of the account to analyse; `--account` overrides it.
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub api: GitHubApiConfig,
    #[serde(default)]
    pub analysis: AnalysisOptions,
}

/// Loads a static YAML config file (no secrets) and injects the token from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    config.api.token = env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
    if config.api.token.is_none() {
        info!("{TOKEN_ENV} not set; GitHub requests will be unauthenticated");
    }

    Ok(config)
}

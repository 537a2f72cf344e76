use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Files at or above this many bytes are never fetched.
pub const DEFAULT_SIZE_LIMIT: u64 = 1_000_000;

/// Tuning knobs for one census run. Every field has a default, so a partial
/// YAML section deserializes fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub size_limit: u64,
    pub request_timeout_secs: u64,
    pub repository_timeout_secs: u64,
    pub repository_concurrency: usize,
    pub file_concurrency: usize,
    /// Ceiling on remote calls in flight across all repositories.
    pub max_in_flight_requests: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            request_timeout_secs: 30,
            repository_timeout_secs: 600,
            repository_concurrency: 4,
            file_concurrency: 8,
            max_in_flight_requests: 16,
        }
    }
}

impl AnalysisOptions {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn repository_timeout(&self) -> Duration {
        Duration::from_secs(self.repository_timeout_secs)
    }

    pub fn repository_concurrency(&self) -> usize {
        self.repository_concurrency.max(1)
    }

    pub fn file_concurrency(&self) -> usize {
        self.file_concurrency.max(1)
    }

    pub fn max_in_flight_requests(&self) -> usize {
        self.max_in_flight_requests.max(1)
    }

    pub fn trace_loaded(&self) {
        info!(
            size_limit = self.size_limit,
            repository_concurrency = self.repository_concurrency(),
            file_concurrency = self.file_concurrency(),
            max_in_flight_requests = self.max_in_flight_requests(),
            "Loaded AnalysisOptions"
        );
        debug!(?self, "AnalysisOptions loaded (full debug)");
    }
}

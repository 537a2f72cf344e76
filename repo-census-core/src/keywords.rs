//! Keyword extraction from repository names and README bodies.
//!
//! Tokens are lowercase `[a-z0-9]+` runs of at least [`MIN_KEYWORD_LEN`]
//! characters that are not in [`STOP_WORDS`]. Counts keep the order in which
//! each token was first seen, which is what ranking ties fall back to.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub const MIN_KEYWORD_LEN: usize = 3;

/// English function words plus README and hosting-platform boilerplate.
pub const STOP_WORDS: &[&str] = &[
    "https", "http", "href", "com", "github", "bash", "www", "org", "de", "a", "about", "an",
    "and", "are", "as", "at", "be", "by", "for", "from", "how", "i", "in", "is", "it", "of",
    "on", "or", "that", "the", "this", "to", "was", "what", "when", "where", "who", "will",
    "with", "he", "she", "they", "we", "me", "you", "my", "your", "our", "do", "not", "have",
    "were", "if", "then", "else", "while", "code", "file", "files", "gem", "build", "setup",
    "config", "run", "installation", "usage", "license", "mit", "gpl", "data", "lib", "docs",
    "new", "get", "use", "using", "via", "these", "those", "example", "examples", "please",
    "feel", "free", "more", "also", "just", "like", "some", "any", "all", "its", "can",
    "readme", "md", "out", "there", "because", "been", "through", "into", "only", "repo",
    "repository", "project", "projects", "service", "api", "client", "server", "test",
    "tests", "feature", "features", "version", "update", "release", "change", "fix", "add",
    "remove", "refactor", "style", "chore", "ci", "performance", "security", "support",
    "help", "contact", "information", "details", "note", "important",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("keyword pattern is valid"))
}

/// Whether `token` (already lowercased) survives the filters.
pub fn is_keyword(token: &str) -> bool {
    token.len() >= MIN_KEYWORD_LEN && !stop_words().contains(token)
}

/// Occurrence count per keyword, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

impl KeywordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize `text` and count every surviving keyword.
    pub fn extract(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let lowered = text.to_lowercase();
        for token in token_pattern().find_iter(&lowered) {
            let token = token.as_str();
            if is_keyword(token) {
                self.add(token, 1);
            }
        }
    }

    /// Repository names use `-` and `_` as word separators.
    pub fn extract_repository_name(&mut self, name: &str) {
        self.extract(&name.replace(['-', '_'], " "));
    }

    pub fn add(&mut self, keyword: &str, count: u64) {
        match self.index.get(keyword) {
            Some(&pos) => self.entries[pos].1 += count,
            None => {
                self.index.insert(keyword.to_string(), self.entries.len());
                self.entries.push((keyword.to_string(), count));
            }
        }
    }

    /// Fold `other` in; tokens new to `self` keep `other`'s relative order.
    pub fn merge(&mut self, other: &KeywordCounts) {
        for (keyword, count) in &other.entries {
            self.add(keyword, *count);
        }
    }

    pub fn get(&self, keyword: &str) -> u64 {
        self.index
            .get(keyword)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// The `n` most frequent keywords; ties keep first-seen order.
    pub fn top(&self, n: usize) -> Vec<KeywordCount> {
        let mut ranked: Vec<&(String, u64)> = self.entries.iter().collect();
        // stable sort
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(keyword, count)| KeywordCount {
                keyword: keyword.clone(),
                count: *count,
            })
            .collect()
    }
}

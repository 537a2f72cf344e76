//! Corpus-wide bytes-per-language totals.

use serde::Serialize;

use crate::contract::LanguageByteMap;

/// Running sum of every repository's [`LanguageByteMap`]. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageStats {
    bytes: LanguageByteMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub bytes: u64,
    pub percentage: f64,
}

impl LanguageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, repo_bytes: &LanguageByteMap) {
        for (language, bytes) in repo_bytes {
            *self.bytes.entry(language.clone()).or_insert(0) += bytes;
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes.values().sum()
    }

    pub fn get(&self, language: &str) -> u64 {
        self.bytes.get(language).copied().unwrap_or(0)
    }

    pub fn as_map(&self) -> &LanguageByteMap {
        &self.bytes
    }

    /// Every language with its share of all bytes, largest first, ties by name.
    pub fn shares(&self) -> Vec<LanguageShare> {
        let total = self.total_bytes();
        if total == 0 {
            return Vec::new();
        }
        let mut shares: Vec<LanguageShare> = self
            .bytes
            .iter()
            .map(|(language, &bytes)| LanguageShare {
                language: language.clone(),
                bytes,
                percentage: bytes as f64 / total as f64 * 100.0,
            })
            .collect();
        // BTreeMap iteration is already name-ascending, so a stable sort keeps the tie order.
        shares.sort_by(|a, b| b.bytes.cmp(&a.bytes));
        shares
    }
}

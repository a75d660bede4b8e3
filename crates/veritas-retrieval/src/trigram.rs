//! Trigram search over the symbol store (§4.9).
//!
//! Exposed behind an abstract [`SymbolSearch`] port rather than a
//! specific database's similarity-operator extension (Open Question
//! (c)): the default implementation is an in-process trigram index.

use std::collections::{HashMap, HashSet};

/// One indexed symbol, as the Retriever needs it for trigram search and
/// citation reconstruction.
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    /// Unqualified name
    pub name: String,
    /// Fully qualified name
    pub qualified_name: String,
    /// File the symbol lives in
    pub file_path: String,
    /// 1-based inclusive start line
    pub line_start: usize,
    /// 1-based inclusive end line
    pub line_end: usize,
    /// Free-text search surface (signature + docstring, typically)
    pub search_text: String,
}

/// One trigram-search hit.
#[derive(Debug, Clone)]
pub struct SymbolMatch {
    /// The matched symbol
    pub record: SymbolRecord,
    /// Similarity score in `[0, 1]`
    pub score: f32,
}

/// Abstract symbol-search port (Open Question (c) resolution).
pub trait SymbolSearch: Send + Sync {
    /// Search `repo_id`'s symbol store for `keywords`, returning up to
    /// `limit` matches by similarity score descending.
    fn search(&self, repo_id: &str, keywords: &[String], limit: usize) -> Vec<SymbolMatch>;
}

fn char_trigrams(s: &str) -> HashSet<String> {
    let lower = s.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    if chars.len() < 3 {
        return HashSet::from([lower]);
    }
    chars.windows(3).map(|w| w.iter().collect::<String>()).collect()
}

/// Sorensen-Dice coefficient over character trigram sets, in `[0, 1]`.
pub fn trigram_similarity(a: &str, b: &str) -> f32 {
    let ta = char_trigrams(a);
    let tb = char_trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count() as f32;
    2.0 * intersection / (ta.len() as f32 + tb.len() as f32)
}

/// In-process trigram index, the default [`SymbolSearch`] implementation.
#[derive(Debug, Default)]
pub struct InProcessSymbolIndex {
    by_repo: HashMap<String, Vec<SymbolRecord>>,
}

impl InProcessSymbolIndex {
    /// New, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `repo_id`'s symbol records wholesale.
    pub fn replace_repo(&mut self, repo_id: &str, records: Vec<SymbolRecord>) {
        self.by_repo.insert(repo_id.to_string(), records);
    }
}

impl SymbolSearch for InProcessSymbolIndex {
    fn search(&self, repo_id: &str, keywords: &[String], limit: usize) -> Vec<SymbolMatch> {
        let Some(records) = self.by_repo.get(repo_id) else {
            return Vec::new();
        };
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<SymbolMatch> = records
            .iter()
            .map(|record| {
                let score = keywords
                    .iter()
                    .map(|kw| {
                        trigram_similarity(kw, &record.name)
                            .max(trigram_similarity(kw, &record.qualified_name))
                            .max(trigram_similarity(kw, &record.search_text))
                    })
                    .fold(0.0_f32, f32::max);
                SymbolMatch { record: record.clone(), score }
            })
            .filter(|m| m.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SymbolRecord {
        SymbolRecord {
            name: "parse_config".to_string(),
            qualified_name: "app.config.parse_config".to_string(),
            file_path: "app/config.py".to_string(),
            line_start: 10,
            line_end: 20,
            search_text: "def parse_config(path): load settings from disk".to_string(),
        }
    }

    #[test]
    fn exact_name_match_scores_highest() {
        let a = trigram_similarity("parse_config", "parse_config");
        assert_eq!(a, 1.0);
    }

    #[test]
    fn dissimilar_strings_score_low() {
        let score = trigram_similarity("parse_config", "zzz");
        assert!(score < 0.2);
    }

    #[test]
    fn search_finds_matching_symbol_by_keyword() {
        let mut index = InProcessSymbolIndex::new();
        index.replace_repo("repo1", vec![sample_record()]);
        let matches = index.search("repo1", &["parse_config".to_string()], 10);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score > 0.9);
    }

    #[test]
    fn search_is_scoped_per_repo() {
        let mut index = InProcessSymbolIndex::new();
        index.replace_repo("repo1", vec![sample_record()]);
        let matches = index.search("repo2", &["parse_config".to_string()], 10);
        assert!(matches.is_empty());
    }

    #[test]
    fn search_respects_limit() {
        let mut index = InProcessSymbolIndex::new();
        let records: Vec<SymbolRecord> = (0..5)
            .map(|i| SymbolRecord {
                name: format!("parse_config_{i}"),
                qualified_name: format!("app.config.parse_config_{i}"),
                file_path: "app/config.py".to_string(),
                line_start: 1,
                line_end: 2,
                search_text: "parse config".to_string(),
            })
            .collect();
        index.replace_repo("repo1", records);
        let matches = index.search("repo1", &["parse_config".to_string()], 3);
        assert_eq!(matches.len(), 3);
    }
}

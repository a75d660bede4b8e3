//! Retrieved source candidate, shared by trigram search, vector search,
//! merge, and snippet fetch (§4.9).

/// One retrieval candidate, before (`content: None`) or after
/// (`content: Some`) snippet fetch.
#[derive(Debug, Clone)]
pub struct RetrievedSource {
    /// 1-based index assigned after the final merge/sort, matching the
    /// `[Source i]` markers in the Answer Engine's prompt
    pub source_index: usize,
    /// Repository-relative file path
    pub file_path: String,
    /// Inclusive start line
    pub start_line: usize,
    /// Inclusive end line
    pub end_line: usize,
    /// Retrieval score in `[0, 1]`, from whichever channel produced or
    /// kept this candidate
    pub score: f32,
    /// Enclosing symbol, when known
    pub symbol_name: Option<String>,
    /// Snippet content, filled in by the snippet-fetch stage
    pub content: Option<String>,
}

impl RetrievedSource {
    fn merge_key(&self) -> (String, usize) {
        (self.file_path.clone(), self.start_line)
    }
}

/// Union `trigram` and `vector` candidates by `(file_path, start_line)`,
/// keeping the higher score on collision; sort by score desc; re-index
/// `1..N`; trim to `limit`.
pub fn merge_sources(trigram: Vec<RetrievedSource>, vector: Vec<RetrievedSource>, limit: usize) -> Vec<RetrievedSource> {
    use std::collections::HashMap;

    let mut by_key: HashMap<(String, usize), RetrievedSource> = HashMap::new();
    for source in trigram.into_iter().chain(vector) {
        let key = source.merge_key();
        match by_key.get(&key) {
            Some(existing) if existing.score >= source.score => {}
            _ => {
                by_key.insert(key, source);
            }
        }
    }

    let mut merged: Vec<RetrievedSource> = by_key.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(limit);
    for (idx, source) in merged.iter_mut().enumerate() {
        source.source_index = idx + 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(file: &str, line: usize, score: f32) -> RetrievedSource {
        RetrievedSource {
            source_index: 0,
            file_path: file.to_string(),
            start_line: line,
            end_line: line + 5,
            score,
            symbol_name: None,
            content: None,
        }
    }

    #[test]
    fn keeps_higher_score_on_collision() {
        let trigram = vec![source("a.py", 10, 0.3)];
        let vector = vec![source("a.py", 10, 0.8)];
        let merged = merge_sources(trigram, vector, 15);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.8);
    }

    #[test]
    fn distinct_keys_both_survive() {
        let trigram = vec![source("a.py", 10, 0.3)];
        let vector = vec![source("b.py", 20, 0.5)];
        let merged = merge_sources(trigram, vector, 15);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn sorts_by_score_desc_and_reindexes() {
        let trigram = vec![source("a.py", 1, 0.2), source("b.py", 2, 0.9)];
        let merged = merge_sources(trigram, Vec::new(), 15);
        assert_eq!(merged[0].file_path, "b.py");
        assert_eq!(merged[0].source_index, 1);
        assert_eq!(merged[1].source_index, 2);
    }

    #[test]
    fn trims_to_limit() {
        let trigram: Vec<RetrievedSource> = (0..20).map(|i| source("a.py", i, i as f32 / 20.0)).collect();
        let merged = merge_sources(trigram, Vec::new(), 15);
        assert_eq!(merged.len(), 15);
    }
}

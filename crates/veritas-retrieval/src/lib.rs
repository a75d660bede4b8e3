//! Retriever (C9, §4.9): code-aware keyword extraction, hybrid trigram +
//! vector search, ranked merge, and a TTL-cached snippet fetch.

#![warn(missing_docs)]

pub mod keywords;
pub mod snippet;
pub mod source;
pub mod trigram;

pub use keywords::extract_keywords;
pub use snippet::{fill_snippets, LocalCheckoutFetcher, SourceFetchError, SourceFetcher};
pub use source::{merge_sources, RetrievedSource};
pub use trigram::{trigram_similarity, InProcessSymbolIndex, SymbolMatch, SymbolRecord, SymbolSearch};

use veritas_vector::VectorStore;

const TRIGRAM_LIMIT: usize = 10;
const VECTOR_LIMIT: usize = 15;
const MERGE_LIMIT: usize = 15;

/// Run the full trigram+vector retrieval and merge step (§4.9), given an
/// already-embedded `question_vector`. Snippet fetch is a separate step
/// (see [`fill_snippets`]) since it needs async I/O and a cache handle.
pub fn retrieve(repo_id: &str, question: &str, question_vector: &[f32], symbols: &dyn SymbolSearch, vectors: &VectorStore) -> Vec<RetrievedSource> {
    let keywords = extract_keywords(question);

    let trigram_hits: Vec<RetrievedSource> = symbols
        .search(repo_id, &keywords, TRIGRAM_LIMIT)
        .into_iter()
        .map(|m| RetrievedSource {
            source_index: 0,
            file_path: m.record.file_path,
            start_line: m.record.line_start,
            end_line: m.record.line_end,
            score: m.score,
            symbol_name: Some(m.record.name),
            content: None,
        })
        .collect();

    let vector_hits: Vec<RetrievedSource> = vectors
        .search(repo_id, question_vector, VECTOR_LIMIT)
        .into_iter()
        .map(|p| RetrievedSource {
            source_index: 0,
            file_path: p.point.chunk.file_path,
            start_line: p.point.chunk.line_start,
            end_line: p.point.chunk.line_end,
            score: p.score,
            symbol_name: Some(p.point.chunk.symbol_name),
            content: None,
        })
        .collect();

    merge_sources(trigram_hits, vector_hits, MERGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_merges_trigram_and_vector_hits() {
        let mut symbols = InProcessSymbolIndex::new();
        symbols.replace_repo(
            "repo1",
            vec![SymbolRecord {
                name: "parse_config".to_string(),
                qualified_name: "app.parse_config".to_string(),
                file_path: "app/config.py".to_string(),
                line_start: 1,
                line_end: 10,
                search_text: "parse config from disk".to_string(),
            }],
        );
        let vectors = VectorStore::new();

        let results = retrieve("repo1", "how does parse_config work", &[1.0, 0.0], &symbols, &vectors);
        assert!(results.iter().any(|s| s.file_path == "app/config.py"));
        assert_eq!(results[0].source_index, 1);
    }
}

//! Snippet fetch (§4.9): fill each merged source's content from a
//! 1-hour TTL cache keyed by `(repo, commit, file_path, start_line,
//! end_line)`; on miss, slice the file and cache the result.
//!
//! Grounded on the teacher's `LocalDb` request-cache table shape in
//! `persistence.rs`, reusing its `snippet_cache` table/TTL-eviction
//! query via `get_cached_snippet`/`cache_snippet`. Bounded-fan-out
//! fetching (10 concurrent) uses `tokio::sync::Semaphore` +
//! `futures::stream::FuturesUnordered`, matching the teacher's existing
//! `futures` workspace dependency.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use veritas_core::LocalDb;

use crate::source::RetrievedSource;

const SNIPPET_CACHE_TTL_SECONDS: i64 = 3600;
const MAX_SNIPPET_CHARS: usize = 500;
const MAX_CONCURRENT_FETCHES: usize = 10;
const ELLIPSIS: &str = "…";

/// Error surfaced while fetching a file's content for snippet slicing.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    /// The file could not be read
    #[error("failed to read {file_path}: {message}")]
    Read {
        /// Path that failed
        file_path: String,
        /// Underlying error text
        message: String,
    },
}

/// Reads file content for snippet slicing, independent of where the
/// checkout lives. The default implementation reads the local clone's
/// working directory (the file was already fetched by the Cloner, C1);
/// this crate never re-fetches from the hosting platform over the
/// network.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch `file_path`'s full content.
    async fn fetch_file(&self, file_path: &str) -> Result<String, SourceFetchError>;
}

/// [`SourceFetcher`] backed by a local checkout directory.
pub struct LocalCheckoutFetcher {
    root: std::path::PathBuf,
}

impl LocalCheckoutFetcher {
    /// New fetcher rooted at `root` (the Cloner's working directory).
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for LocalCheckoutFetcher {
    async fn fetch_file(&self, file_path: &str) -> Result<String, SourceFetchError> {
        let full_path = self.root.join(file_path);
        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| SourceFetchError::Read { file_path: file_path.to_string(), message: e.to_string() })
    }
}

fn slice_lines(content: &str, start_line: usize, end_line: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start_idx = start_line.saturating_sub(1).min(lines.len());
    let end_idx = end_line.min(lines.len());
    if start_idx >= end_idx {
        return String::new();
    }
    let joined = lines[start_idx..end_idx].join("\n");
    if joined.chars().count() > MAX_SNIPPET_CHARS {
        joined.chars().take(MAX_SNIPPET_CHARS).collect::<String>() + ELLIPSIS
    } else {
        joined
    }
}

/// Fill `content` on every source in `sources`, using `db`'s
/// `snippet_cache` table keyed by `(repo, commit_sha, file_path,
/// start_line, end_line)` as a 1-hour TTL cache, falling back to
/// `fetcher` on miss, with at most [`MAX_CONCURRENT_FETCHES`] files
/// read concurrently.
pub async fn fill_snippets(
    sources: Vec<RetrievedSource>,
    db: &LocalDb,
    repo: &str,
    commit_sha: &str,
    fetcher: &dyn SourceFetcher,
) -> Vec<RetrievedSource> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut tasks = FuturesUnordered::new();

    for source in sources {
        let semaphore = semaphore.clone();
        tasks.push(async move {
            let _permit = semaphore.acquire().await;
            let mut source = source;
            let cache_key = LocalDb::snippet_cache_key(repo, commit_sha, &source.file_path, source.start_line, source.end_line);

            if let Ok(Some(cached)) = db.get_cached_snippet(&cache_key, SNIPPET_CACHE_TTL_SECONDS) {
                source.content = Some(cached);
                return source;
            }

            match fetcher.fetch_file(&source.file_path).await {
                Ok(full_content) => {
                    let snippet = slice_lines(&full_content, source.start_line, source.end_line);
                    let _ = db.cache_snippet(&cache_key, repo, commit_sha, &source.file_path, source.start_line, source.end_line, &snippet);
                    source.content = Some(snippet);
                }
                Err(_) => {
                    source.content = None;
                }
            }
            source
        });
    }

    let mut results = Vec::new();
    while let Some(source) = tasks.next().await {
        results.push(source);
    }
    results.sort_by_key(|s| s.source_index);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedContentFetcher {
        content: String,
    }

    #[async_trait::async_trait]
    impl SourceFetcher for FixedContentFetcher {
        async fn fetch_file(&self, _file_path: &str) -> Result<String, SourceFetchError> {
            Ok(self.content.clone())
        }
    }

    fn source(file: &str, start: usize, end: usize, index: usize) -> RetrievedSource {
        RetrievedSource {
            source_index: index,
            file_path: file.to_string(),
            start_line: start,
            end_line: end,
            score: 0.5,
            symbol_name: None,
            content: None,
        }
    }

    #[tokio::test]
    async fn fills_content_on_cache_miss() {
        let db = LocalDb::in_memory().unwrap();
        let fetcher = FixedContentFetcher { content: "line1\nline2\nline3\n".to_string() };
        let sources = vec![source("a.py", 1, 2, 1)];
        let filled = fill_snippets(sources, &db, "repo1", "deadbeef", &fetcher).await;
        assert_eq!(filled[0].content.as_deref(), Some("line1\nline2"));
    }

    #[tokio::test]
    async fn preserves_source_order() {
        let db = LocalDb::in_memory().unwrap();
        let fetcher = FixedContentFetcher { content: "line1\nline2\nline3\n".to_string() };
        let sources = vec![source("b.py", 1, 1, 2), source("a.py", 1, 1, 1)];
        let filled = fill_snippets(sources, &db, "repo1", "deadbeef", &fetcher).await;
        assert_eq!(filled[0].source_index, 1);
        assert_eq!(filled[1].source_index, 2);
    }

    #[test]
    fn slice_lines_caps_at_500_chars() {
        let content = "x".repeat(600);
        let sliced = slice_lines(&content, 1, 1);
        assert!(sliced.ends_with(ELLIPSIS));
    }
}

//! Index Orchestrator (C12, §4.12): clone, parse, index, replace
//! File/Symbol records, then chunk, embed, and upsert vectors.
//!
//! Shares the clone-then-parse groundwork with [`crate::scan`] but
//! feeds a different downstream — the symbol graph and vector store
//! that back retrieval (C9) rather than the finding pipeline.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use veritas_core::{FileSnapshot, IndexStatus};
use veritas_index::Indexer;
use veritas_vector::{Embedder, VectorStore};

use crate::discovery;
use crate::store::IndexStore;

/// One request to (re-)index a repository at its current default-branch
/// head.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    /// Hosting-platform owner/org
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Clone URL
    pub clone_url: String,
    /// Branch or tag to index. `None` indexes the default branch.
    pub git_ref: Option<String>,
    /// Credential injected via `GIT_ASKPASS`, never via the URL
    pub credential: Option<String>,
    /// Embedding batch size
    pub embedding_batch_size: usize,
}

/// Summary returned once an index run completes.
#[derive(Debug, Clone)]
pub struct IndexReport {
    /// Commit the index now reflects
    pub commit_sha: String,
    /// Files indexed
    pub file_count: usize,
    /// Symbols indexed
    pub symbol_count: usize,
    /// Chunks embedded and upserted
    pub chunk_count: usize,
}

/// Errors that abort an index run.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Clone failed, timed out, or exceeded the size bound
    #[error("clone failed: {0}")]
    Clone(#[from] veritas_git::GitError),
    /// Reading the clone's commit SHA failed
    #[error("failed to read cloned commit: {0}")]
    Commit(String),
    /// Embedding failed after retries
    #[error("embedding failed: {0}")]
    Embed(#[from] veritas_vector::EmbedError),
    /// A storage port call failed
    #[error("storage error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Drives one index run end to end against an injected [`IndexStore`],
/// [`Embedder`], and [`VectorStore`].
pub struct IndexOrchestrator {
    store: Arc<dyn IndexStore>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<tokio::sync::Mutex<VectorStore>>,
    clone_root: std::path::PathBuf,
}

impl IndexOrchestrator {
    /// New orchestrator.
    pub fn new(store: Arc<dyn IndexStore>, embedder: Arc<dyn Embedder>, vectors: Arc<tokio::sync::Mutex<VectorStore>>, clone_root: impl Into<std::path::PathBuf>) -> Self {
        Self { store, embedder, vectors, clone_root: clone_root.into() }
    }

    /// Run the full 6-step index sequence (§4.12). On any error
    /// `index_status` is set to `failed` with the error sanitized.
    #[instrument(skip(self, request))]
    pub async fn run(&self, request: IndexRequest) -> Result<IndexReport, IndexError> {
        info!("Starting index for {}/{}", request.owner, request.name);

        let repo = self.store.resolve_or_create_repository(&request.owner, &request.name).await.map_err(IndexError::Store)?;
        self.store.set_index_status(&repo.id, IndexStatus::Indexing).await.map_err(IndexError::Store)?;

        match self.run_inner(&repo.id, &request).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let sanitized = veritas_git::sanitize_error_message(&err.to_string());
                warn!("Index run for {}/{} failed: {}", request.owner, request.name, sanitized);
                self.store.set_index_status(&repo.id, IndexStatus::Failed).await.map_err(IndexError::Store)?;
                Err(err)
            }
        }
    }

    async fn run_inner(&self, repo_id: &str, request: &IndexRequest) -> Result<IndexReport, IndexError> {
        let working_dir = self.clone_root.join(format!("index-{}", uuid::Uuid::new_v4()));
        let result = self.clone_parse_index_embed(repo_id, request, &working_dir).await;

        if working_dir.exists() {
            let _ = tokio::fs::remove_dir_all(&working_dir).await;
        }
        result
    }

    async fn clone_parse_index_embed(&self, repo_id: &str, request: &IndexRequest, working_dir: &std::path::Path) -> Result<IndexReport, IndexError> {
        let clone_options = veritas_git::CloneOptions {
            git_ref: request.git_ref.clone(),
            credential: request.credential.clone(),
            ..Default::default()
        };
        let git_repo = veritas_git::GitRepo::clone(&request.clone_url, working_dir, &clone_options).await?;
        let commit_sha = git_repo.current_commit().await.map_err(|e| IndexError::Commit(e.to_string()))?;

        let mut coverage = veritas_core::CoverageTracker::new(false);
        let discovered = discovery::discover(working_dir, &mut coverage, None).await;

        let mut indexer = Indexer::new();
        let mut snapshots = Vec::new();
        for file in &discovered {
            if let Ok(result) = veritas_parse::parse_file(&file.path, &file.content) {
                indexer.ingest(&file.path, &result);
            }
            snapshots.push(FileSnapshot::from_content("index".to_string(), file.path.clone(), file.language.clone(), file.content.as_bytes(), false));
        }

        let file_count = snapshots.len();
        let symbol_count = indexer.symbol_count();
        self.store.replace_files_and_symbols(repo_id, snapshots, symbol_count).await.map_err(IndexError::Store)?;

        let symbols: Vec<_> = indexer.all_symbols().into_iter().cloned().collect();
        let mut chunks = veritas_vector::chunk_symbols(repo_id, &symbols);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = veritas_vector::embed_all(self.embedder.as_ref(), &texts, request.embedding_batch_size).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings.into_iter()) {
            chunk.embedding = Some(embedding);
        }

        let chunk_count = chunks.len();
        {
            let mut vectors = self.vectors.lock().await;
            vectors.replace_repo(repo_id, chunks);
        }

        self.store.finish_index(repo_id, &commit_sha, chunk_count).await.map_err(IndexError::Store)?;

        Ok(IndexReport { commit_sha, file_count, symbol_count, chunk_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use veritas_vector::EmbedError;

    struct StubEmbedder;

    #[async_trait::async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn init_local_repo(dir: &std::path::Path) {
        tokio::fs::create_dir_all(dir).await.unwrap();
        tokio::fs::write(
            dir.join("app.py"),
            "class Widget:\n    \"\"\"A widget.\"\"\"\n    def render(self):\n        return 1\n",
        )
        .await
        .unwrap();

        let run = |args: &[&str]| std::process::Command::new("git").args(args).current_dir(dir).output().unwrap();
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial"]);
    }

    #[tokio::test]
    async fn index_run_clones_parses_and_upserts_vectors() {
        let source = tempfile::TempDir::new().unwrap();
        init_local_repo(source.path()).await;

        let workdir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        let vectors = Arc::new(tokio::sync::Mutex::new(VectorStore::new()));
        let orchestrator = IndexOrchestrator::new(store.clone(), Arc::new(StubEmbedder), vectors.clone(), workdir.path());

        let request = IndexRequest {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
            clone_url: source.path().to_string_lossy().to_string(),
            git_ref: None,
            credential: None,
            embedding_batch_size: 8,
        };

        let report = orchestrator.run(request).await.unwrap();
        assert_eq!(report.symbol_count, 2);
        assert!(report.chunk_count > 0);

        let repo = store.get_repository("acme/widgets").unwrap();
        assert_eq!(repo.index_status, IndexStatus::Ready);
        assert_eq!(repo.last_indexed_commit.as_deref(), Some(report.commit_sha.as_str()));
    }
}

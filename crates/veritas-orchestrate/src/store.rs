//! Persistence ports (§9 "Per-request LLM/embedding clients" design
//! note, generalized): the orchestrators depend on abstract storage
//! interfaces rather than a concrete schema, since the persistence
//! layer itself is named as an external collaborator out of scope for
//! this repository. The in-memory implementations here exist so the
//! orchestrators are exercisable and testable without one; a real
//! deployment supplies its own [`ScanStore`]/[`IndexStore`].
//!
//! Grounded on the same injected-interface shape as [`veritas_vector::Embedder`]
//! and `veritas_llm::LLM`, and on the in-process default implementations
//! already established for [`veritas_vector::VectorStore`] and
//! [`veritas_retrieval::InProcessSymbolIndex`].

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use veritas_core::{CoverageSummary, FileSnapshot, Finding, IndexStatus, Repository, ScanRun, ScanRunStatus};

/// Storage port for everything a [`crate::scan::ScanOrchestrator`] run
/// persists (§3: Repository, ScanRun, FileSnapshot, Finding, CoverageSummary).
#[async_trait::async_trait]
pub trait ScanStore: Send + Sync {
    /// Resolve an existing `(owner, name)` repository or create a new,
    /// `Pending` one.
    async fn resolve_or_create_repository(&self, owner: &str, name: &str) -> anyhow::Result<Repository>;

    /// Resolve the existing [`ScanRun`] sharing `(repo_id, commit_sha,
    /// config_hash)`, or create and persist a new `Queued` one. Returns
    /// `(run, pre_existing)` so the caller can short-circuit a dedup hit.
    async fn resolve_or_create_scan_run(&self, repo_id: &str, commit_sha: &str, config_hash: &str) -> anyhow::Result<(ScanRun, bool)>;

    /// Transition `scan_run_id`'s status, recording degradation reasons
    /// and/or a finish time.
    async fn update_scan_run_status(
        &self,
        scan_run_id: &str,
        status: ScanRunStatus,
        degraded_reasons: Vec<String>,
        finished: bool,
    ) -> anyhow::Result<()>;

    /// Persist one scan run's [`FileSnapshot`]s.
    async fn persist_file_snapshots(&self, snapshots: Vec<FileSnapshot>) -> anyhow::Result<()>;

    /// Persist one scan run's deduplicated [`Finding`]s (with their
    /// instances already embedded).
    async fn persist_findings(&self, scan_run_id: &str, findings: Vec<Finding>) -> anyhow::Result<()>;

    /// Persist one scan run's [`CoverageSummary`].
    async fn persist_coverage_summary(&self, scan_run_id: &str, summary: CoverageSummary) -> anyhow::Result<()>;
}

/// Storage port for everything a [`crate::index::IndexOrchestrator`] run
/// persists: repository lifecycle state plus the File/Symbol/Chunk
/// records index replacement swaps in transactionally.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Resolve an existing `(owner, name)` repository or create a new,
    /// `Pending` one.
    async fn resolve_or_create_repository(&self, owner: &str, name: &str) -> anyhow::Result<Repository>;

    /// Set `repo_id`'s `index_status`.
    async fn set_index_status(&self, repo_id: &str, status: IndexStatus) -> anyhow::Result<()>;

    /// Replace `repo_id`'s File and Symbol records wholesale
    /// (transactional delete-then-insert at the caller's storage layer).
    async fn replace_files_and_symbols(&self, repo_id: &str, snapshots: Vec<FileSnapshot>, symbol_count: usize) -> anyhow::Result<()>;

    /// Update `repo_id`'s post-index counters and `last_indexed_commit`.
    async fn finish_index(&self, repo_id: &str, commit_sha: &str, chunk_count: usize) -> anyhow::Result<()>;
}

#[derive(Default)]
struct InMemoryState {
    repos: HashMap<String, Repository>,
    scan_runs: HashMap<String, ScanRun>,
    findings: HashMap<String, Vec<Finding>>,
    coverage: HashMap<String, CoverageSummary>,
    snapshots: HashMap<String, Vec<FileSnapshot>>,
}

/// In-memory [`ScanStore`] + [`IndexStore`], the default used by tests
/// and by callers with no external persistence layer of their own.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryStore {
    /// New, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn repo_key(owner: &str, name: &str) -> String {
        format!("{owner}/{name}")
    }

    /// Snapshot a repository's current record, for assertions in tests.
    pub fn get_repository(&self, repo_id: &str) -> Option<Repository> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).repos.get(repo_id).cloned()
    }

    /// Findings persisted for `scan_run_id`, for assertions in tests.
    pub fn get_findings(&self, scan_run_id: &str) -> Vec<Finding> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).findings.get(scan_run_id).cloned().unwrap_or_default()
    }

    /// Coverage summary persisted for `scan_run_id`, for assertions in tests.
    pub fn get_coverage(&self, scan_run_id: &str) -> Option<CoverageSummary> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).coverage.get(scan_run_id).cloned()
    }
}

#[async_trait::async_trait]
impl ScanStore for InMemoryStore {
    async fn resolve_or_create_repository(&self, owner: &str, name: &str) -> anyhow::Result<Repository> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let key = Self::repo_key(owner, name);
        if let Some(repo) = state.repos.get(&key) {
            return Ok(repo.clone());
        }
        let repo = Repository::new(key.clone(), owner, name);
        state.repos.insert(key, repo.clone());
        Ok(repo)
    }

    async fn resolve_or_create_scan_run(&self, repo_id: &str, commit_sha: &str, config_hash: &str) -> anyhow::Result<(ScanRun, bool)> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = state.scan_runs.values().find(|r| r.identity() == (repo_id.to_string(), commit_sha.to_string(), config_hash.to_string())) {
            return Ok((existing.clone(), true));
        }
        let run = ScanRun {
            id: format!("scan-{}", uuid::Uuid::new_v4()),
            repo_id: repo_id.to_string(),
            commit_sha: commit_sha.to_string(),
            config_hash: config_hash.to_string(),
            status: ScanRunStatus::Queued,
            degraded_reasons: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        };
        state.scan_runs.insert(run.id.clone(), run.clone());
        Ok((run, false))
    }

    async fn update_scan_run_status(&self, scan_run_id: &str, status: ScanRunStatus, degraded_reasons: Vec<String>, finished: bool) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(run) = state.scan_runs.get_mut(scan_run_id) {
            run.status = status;
            run.degraded_reasons = degraded_reasons;
            if finished {
                run.finished_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn persist_file_snapshots(&self, snapshots: Vec<FileSnapshot>) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for snapshot in snapshots {
            state.snapshots.entry(snapshot.scan_run_id.clone()).or_default().push(snapshot);
        }
        Ok(())
    }

    async fn persist_findings(&self, scan_run_id: &str, findings: Vec<Finding>) -> anyhow::Result<()> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).findings.insert(scan_run_id.to_string(), findings);
        Ok(())
    }

    async fn persist_coverage_summary(&self, scan_run_id: &str, summary: CoverageSummary) -> anyhow::Result<()> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).coverage.insert(scan_run_id.to_string(), summary);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IndexStore for InMemoryStore {
    async fn resolve_or_create_repository(&self, owner: &str, name: &str) -> anyhow::Result<Repository> {
        ScanStore::resolve_or_create_repository(self, owner, name).await
    }

    async fn set_index_status(&self, repo_id: &str, status: IndexStatus) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(repo) = state.repos.get_mut(repo_id) {
            repo.index_status = status;
        }
        Ok(())
    }

    async fn replace_files_and_symbols(&self, repo_id: &str, snapshots: Vec<FileSnapshot>, _symbol_count: usize) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.snapshots.insert(repo_id.to_string(), snapshots);
        Ok(())
    }

    async fn finish_index(&self, repo_id: &str, commit_sha: &str, _chunk_count: usize) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(repo) = state.repos.get_mut(repo_id) {
            repo.index_status = IndexStatus::Ready;
            repo.last_indexed_commit = Some(commit_sha.to_string());
        }
        Ok(())
    }
}

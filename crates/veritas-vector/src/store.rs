//! In-process vector store (§4.8 Persistence).
//!
//! Before inserting, all prior points for a repository are deleted, then
//! the new set is upserted in sub-batches of 100. Each point's id is the
//! chunk's stable id; the payload carries everything the Retriever needs
//! to reconstruct a citation without a secondary lookup.

use std::collections::HashMap;

use veritas_core::Chunk;

const UPSERT_SUB_BATCH: usize = 100;

/// One stored point: a chunk's payload plus its embedding vector.
#[derive(Debug, Clone)]
pub struct Point {
    /// Stable point id (the chunk id)
    pub id: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Chunk payload, embedding stripped (carried separately as `vector`)
    pub chunk: Chunk,
}

/// A single result from [`VectorStore::search`].
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// The matched point
    pub point: Point,
    /// Cosine similarity score in `[-1, 1]`
    pub score: f32,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// In-process vector store, keyed by repository id.
#[derive(Debug, Default)]
pub struct VectorStore {
    points_by_repo: HashMap<String, Vec<Point>>,
}

impl VectorStore {
    /// New, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete all points for `repo_id`.
    pub fn delete_repo(&mut self, repo_id: &str) {
        self.points_by_repo.remove(repo_id);
    }

    /// Replace `repo_id`'s points wholesale: delete then upsert in
    /// sub-batches of [`UPSERT_SUB_BATCH`].
    pub fn replace_repo(&mut self, repo_id: &str, chunks: Vec<Chunk>) {
        self.delete_repo(repo_id);
        let points: Vec<Point> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let vector = chunk.embedding.clone()?;
                Some(Point { id: chunk.id.clone(), vector, chunk })
            })
            .collect();

        for sub_batch in points.chunks(UPSERT_SUB_BATCH) {
            self.points_by_repo.entry(repo_id.to_string()).or_default().extend_from_slice(sub_batch);
        }
    }

    /// kNN search within `repo_id`'s points, returning the top `top_k`
    /// by cosine similarity, descending.
    pub fn search(&self, repo_id: &str, query: &[f32], top_k: usize) -> Vec<ScoredPoint> {
        let Some(points) = self.points_by_repo.get(repo_id) else {
            return Vec::new();
        };
        let mut scored: Vec<ScoredPoint> = points
            .iter()
            .map(|p| ScoredPoint { point: p.clone(), score: cosine_similarity(query, &p.vector) })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Total points stored for `repo_id`.
    pub fn count(&self, repo_id: &str) -> usize {
        self.points_by_repo.get(repo_id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with(id: &str, repo_id: &str, embedding: Option<Vec<f32>>) -> Chunk {
        Chunk {
            id: id.to_string(),
            repo_id: repo_id.to_string(),
            file_path: "src/lib.py".to_string(),
            line_start: 1,
            line_end: 2,
            symbol_name: "helper".to_string(),
            symbol_type: "function".to_string(),
            content_preview: "preview".to_string(),
            content: "content".to_string(),
            embedding,
        }
    }

    #[test]
    fn replace_repo_drops_points_without_an_embedding() {
        let mut store = VectorStore::new();
        store.replace_repo("repo1", vec![chunk_with("a", "repo1", None), chunk_with("b", "repo1", Some(vec![1.0, 0.0]))]);
        assert_eq!(store.count("repo1"), 1);
    }

    #[test]
    fn replace_repo_clears_prior_points() {
        let mut store = VectorStore::new();
        store.replace_repo("repo1", vec![chunk_with("a", "repo1", Some(vec![1.0, 0.0]))]);
        store.replace_repo("repo1", vec![chunk_with("b", "repo1", Some(vec![0.0, 1.0]))]);
        assert_eq!(store.count("repo1"), 1);
        assert_eq!(store.search("repo1", &[0.0, 1.0], 5)[0].point.id, "b");
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let mut store = VectorStore::new();
        store.replace_repo(
            "repo1",
            vec![
                chunk_with("close", "repo1", Some(vec![1.0, 0.0])),
                chunk_with("far", "repo1", Some(vec![0.0, 1.0])),
            ],
        );
        let results = store.search("repo1", &[0.9, 0.1], 2);
        assert_eq!(results[0].point.id, "close");
    }

    #[test]
    fn search_is_scoped_per_repo() {
        let mut store = VectorStore::new();
        store.replace_repo("repo1", vec![chunk_with("a", "repo1", Some(vec![1.0, 0.0]))]);
        assert!(store.search("repo2", &[1.0, 0.0], 5).is_empty());
    }
}

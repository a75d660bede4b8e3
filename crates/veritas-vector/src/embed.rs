//! Batched embedding with retry/backoff (§4.8).
//!
//! The actual embedding provider is an external collaborator (the spec
//! names "the actual LLM/embedding providers" as out of scope); this
//! module defines the provider-agnostic [`Embedder`] trait and the
//! batching/retry orchestration around it. Retry classification reuses
//! the *shape* of the teacher's `is_retryable_status`/`is_retryable_error`
//! in `hqe-openai/src/lib.rs`, with this component's own schedule
//! (1s, 2s, 4s; max 3 attempts per batch) rather than the teacher's.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default batch size for embedding requests.
pub const DEFAULT_BATCH_SIZE: usize = 20;
const MAX_ATTEMPTS: u32 = 3;

/// Error surfaced by an [`Embedder`] implementation.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Transient failure (rate limit, 5xx, timeout) — worth retrying.
    #[error("transient embedding error: {0}")]
    Transient(String),
    /// Non-transient failure — must not be retried.
    #[error("embedding error: {0}")]
    Permanent(String),
}

/// Provider-agnostic embedding client.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(2))
}

/// Embed `texts` in batches of `batch_size`, retrying each batch up to
/// [`MAX_ATTEMPTS`] times with exponential backoff on
/// [`EmbedError::Transient`]. [`EmbedError::Permanent`] propagates
/// immediately without retry.
#[instrument(skip(embedder, texts))]
pub async fn embed_all(embedder: &dyn Embedder, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        let mut attempt = 0u32;
        loop {
            match embedder.embed_batch(batch).await {
                Ok(vectors) => {
                    results.extend(vectors);
                    break;
                }
                Err(EmbedError::Transient(msg)) if attempt + 1 < MAX_ATTEMPTS => {
                    let backoff = retry_backoff(attempt);
                    warn!(attempt, backoff_ms = backoff.as_millis(), "retrying embedding batch: {msg}");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!("embedding batch failed after {attempt} attempt(s)");
                    return Err(err);
                }
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyEmbedder {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(EmbedError::Transient("rate limited".to_string()));
            }
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }
    }

    struct AlwaysPermanent;

    #[async_trait]
    impl Embedder for AlwaysPermanent {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError::Permanent("bad request".to_string()))
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let embedder = FlakyEmbedder { fail_times: AtomicU32::new(2) };
        let texts = vec!["a".to_string(), "b".to_string()];
        let result = embed_all(&embedder, &texts, 10).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn permanent_errors_do_not_retry() {
        let embedder = AlwaysPermanent;
        let texts = vec!["a".to_string()];
        let err = embed_all(&embedder, &texts, 10).await.unwrap_err();
        assert!(matches!(err, EmbedError::Permanent(_)));
    }

    #[tokio::test]
    async fn splits_into_batches_of_requested_size() {
        struct CountingEmbedder {
            batches_seen: Arc<AtomicU32>,
        }
        #[async_trait]
        impl Embedder for CountingEmbedder {
            async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
                self.batches_seen.fetch_add(1, Ordering::SeqCst);
                Ok(texts.iter().map(|_| vec![0.0]).collect())
            }
        }
        let batches_seen = Arc::new(AtomicU32::new(0));
        let embedder = CountingEmbedder { batches_seen: batches_seen.clone() };
        let texts: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        let result = embed_all(&embedder, &texts, 10).await.unwrap();
        assert_eq!(result.len(), 25);
        assert_eq!(batches_seen.load(Ordering::SeqCst), 3);
    }
}

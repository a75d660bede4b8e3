//! Chunker + Embedder (C8, §4.8): per-symbol chunking, batched embedding
//! with retry/backoff, and an in-process vector store keyed by
//! repository.
//!
//! The actual embedding provider is an external collaborator; this
//! crate only defines the [`embed::Embedder`] trait its caller must
//! implement (see `veritas-llm` for the OpenAI-compatible one).

#![warn(missing_docs)]

pub mod chunker;
pub mod embed;
pub mod store;

pub use chunker::{chunk_symbol, chunk_symbols};
pub use embed::{embed_all, EmbedError, Embedder, DEFAULT_BATCH_SIZE};
pub use store::{Point, ScoredPoint, VectorStore};

//! Scan Orchestrator (C11, §4.11) and Index Orchestrator (C12, §4.12):
//! the two end-to-end pipelines that drive acquisition, parsing,
//! analysis, and indexing against the rest of this workspace's crates.
//!
//! Grounded on the teacher's `ScanPipeline`/`ScanPhase` in
//! `hqe-core/src/scan.rs` — a phase enum advanced one step at a time,
//! logged via `tracing`, with graceful degradation recorded rather than
//! aborting the whole run. The phase *content* here is new: it ties
//! together the Cloner ([`veritas_git`]), Discoverer ([`discovery`]),
//! Parser ([`veritas_parse`]), Indexer ([`veritas_index`]), Analyzer
//! ([`veritas_analyze`]), Chunker/Embedder/VectorStore
//! ([`veritas_vector`]), and Retriever ([`veritas_retrieval`]), none of
//! which existed in the teacher.

#![warn(missing_docs)]

pub mod discovery;
pub mod index;
pub mod scan;
pub mod store;

pub use index::{IndexError, IndexOrchestrator, IndexReport};
pub use scan::{build_control_results, ControlResult, ControlStatus, ScanError, ScanOrchestrator, ScanRequest};
pub use store::{IndexStore, InMemoryStore, ScanStore};

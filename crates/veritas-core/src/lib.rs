//! Veritas Core — data model, redaction, coverage accounting, evidence
//! extraction, and local persistence shared by every other Veritas crate.
//!
//! # Modules
//!
//! - [`models`] — the full data model (Repository, ScanRun, Symbol, Finding, …)
//! - [`redaction`] — secret-pattern detection and redaction
//! - [`coverage`] — the Coverage Tracker (C2)
//! - [`evidence`] — the Evidence Builder (C5)
//! - [`persistence`] — request/snippet caches and session logging
//! - [`config`] — environment-driven configuration with fail-closed validation

#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod config;
pub mod coverage;
pub mod evidence;
pub mod models;
pub mod persistence;
pub mod redaction;

pub use config::VeritasConfig;
pub use coverage::CoverageTracker;
pub use evidence::EvidenceBuilder;
pub use models::*;
pub use persistence::LocalDb;
pub use redaction::RedactionEngine;

use thiserror::Error;

/// Core error type for Veritas.
///
/// Each disposition named in the error-handling design (§7) maps onto a
/// variant here or onto a crate-local enum that converts into this one.
#[derive(Error, Debug)]
pub enum VeritasError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON or other serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error during coverage accounting or file classification
    #[error("scan error: {0}")]
    Scan(String),

    /// Error during content redaction
    #[error("redaction error: {0}")]
    Redaction(String),

    /// Invalid or fail-closed configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Clone/acquisition failure, already sanitized by the caller
    #[error("clone error: {0}")]
    Clone(String),

    /// LLM or embedding provider error
    #[error("provider error: {0}")]
    Provider(String),

    /// Artifact writing failed
    #[error("artifact generation failed: {0}")]
    Artifacts(String),
}

/// Result type alias using [`VeritasError`]
pub type Result<T> = std::result::Result<T, VeritasError>;

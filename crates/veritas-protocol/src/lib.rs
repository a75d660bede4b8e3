//! Shared wire schemas for Veritas.
//!
//! This crate holds the request/response and provider-configuration types
//! that sit at the boundary between the core analysis pipeline and the
//! external collaborators named in the top-level scope (HTTP surface,
//! webhook receipt, persistence) — the crate itself implements none of
//! those collaborators, only the shapes they exchange with the core.
//!
//! # Core types
//!
//! - [`ProviderProfile`] — configuration for LLM/embedding providers
//! - [`ScanRequest`] / [`ScanRunHandle`] — scan kickoff contract
//! - [`AnswerRequest`] / [`AnswerResponse`] — proof-carrying answer contract
//! - [`WebhookEvent`] — inbound webhook payload shape
//!
//! # Example
//!
//! ```rust
//! use veritas_protocol::models::{ProviderProfile, ProviderKind};
//!
//! let profile = ProviderProfile::new("my-provider", "https://api.example.com/v1")
//!     .with_model("gpt-4")
//!     .with_provider_kind(ProviderKind::Generic);
//! ```

#![warn(missing_docs)]

/// Protocol models module
pub mod models;

pub use models::*;

//! Environment-driven configuration, fail-closed on insecure secrets (§2, §6).
//!
//! Covers the application signing secret and first-party JWT secret, the
//! two required secrets this workspace actually consumes. Hosting-platform
//! app credentials and webhook signing are out of scope here: the HTTP
//! surface, OAuth, and webhook receipt that would use them are external
//! collaborators this workspace doesn't implement.

use std::collections::HashSet;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::{Result, VeritasError};

const INSECURE_DEFAULTS: &[&str] = &["", "change-me-in-production", "secret", "password"];
const MIN_SECRET_LEN: usize = 32;

/// Clone acquisition bounds (§4.1).
#[derive(Debug, Clone)]
pub struct CloneBounds {
    /// Maximum allowed working-tree size, in bytes, excluding `.git`
    pub max_repo_bytes: u64,
    /// Hard wall-clock timeout for the clone operation
    pub clone_timeout: Duration,
}

impl Default for CloneBounds {
    fn default() -> Self {
        Self {
            max_repo_bytes: 500 * 1024 * 1024,
            clone_timeout: Duration::from_secs(300),
        }
    }
}

/// Per-job soft/hard time limits (§5).
#[derive(Debug, Clone)]
pub struct JobTimeLimits {
    /// A job past this duration emits a warning and may be marked degraded
    pub soft_limit: Duration,
    /// A job past this duration is forcibly cancelled
    pub hard_limit: Duration,
}

impl Default for JobTimeLimits {
    fn default() -> Self {
        Self {
            soft_limit: Duration::from_secs(600),
            hard_limit: Duration::from_secs(1800),
        }
    }
}

/// Top-level configuration for a Veritas deployment.
///
/// Constructed via [`VeritasConfig::from_env`], which fails closed: any
/// required secret left at an insecure default rejects the whole
/// configuration rather than silently running unauthenticated or
/// unencrypted.
#[derive(Debug, Clone)]
pub struct VeritasConfig {
    /// Root directory new clones are created under
    pub temp_root: std::path::PathBuf,
    /// Clone size/timeout bounds
    pub clone_bounds: CloneBounds,
    /// Names of analyzer rule groups enabled for this deployment
    pub analyzers_enabled: Vec<String>,
    /// Embedding batch size (chunks per provider request)
    pub embedding_batch_size: usize,
    /// Number of candidates returned by hybrid retrieval before fetch
    pub retrieval_top_k: usize,
    /// Snippet cache TTL
    pub snippet_cache_ttl: Duration,
    /// Per-job time limits
    pub job_time_limits: JobTimeLimits,
    /// Worker pool concurrency
    pub worker_concurrency: usize,
    /// Application signing secret (sessions, CSRF)
    pub app_secret_key: SecretString,
    /// JWT signing secret for first-party tokens
    pub jwt_secret: SecretString,
}

impl VeritasConfig {
    /// Build configuration from environment variables, validating all
    /// required secrets fail-closed. Mirrors the teacher's
    /// struct-with-defaults construction, but rejects rather than
    /// defaulting where a secret is required.
    pub fn from_env() -> Result<Self> {
        let app_secret_key = require_secret("VERITAS_SECRET_KEY", true)?;
        let jwt_secret = require_secret("VERITAS_JWT_SECRET", true)?;

        let temp_root = std::env::var("VERITAS_TEMP_ROOT")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("veritas"));

        Ok(Self {
            temp_root,
            clone_bounds: CloneBounds::default(),
            analyzers_enabled: default_analyzers(),
            embedding_batch_size: env_usize("VERITAS_EMBEDDING_BATCH_SIZE", 64),
            retrieval_top_k: env_usize("VERITAS_RETRIEVAL_TOP_K", 20),
            snippet_cache_ttl: Duration::from_secs(3600),
            job_time_limits: JobTimeLimits::default(),
            worker_concurrency: env_usize("VERITAS_WORKER_CONCURRENCY", 4),
            app_secret_key,
            jwt_secret,
        })
    }

    /// Construct a configuration suitable for tests: insecure secrets are
    /// accepted (unlike [`from_env`](Self::from_env)), everything else
    /// defaults.
    pub fn for_tests() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("veritas-test"),
            clone_bounds: CloneBounds::default(),
            analyzers_enabled: default_analyzers(),
            embedding_batch_size: 8,
            retrieval_top_k: 10,
            snippet_cache_ttl: Duration::from_secs(3600),
            job_time_limits: JobTimeLimits::default(),
            worker_concurrency: 2,
            app_secret_key: SecretString::new("test-secret-key-0123456789abcdef".into()),
            jwt_secret: SecretString::new("test-jwt-secret-0123456789abcdef".into()),
        }
    }
}

fn default_analyzers() -> Vec<String> {
    vec![
        "security".to_string(),
        "privacy".to_string(),
        "reliability".to_string(),
        "performance".to_string(),
        "maintainability".to_string(),
        "architecture".to_string(),
    ]
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Validate a secret is neither an insecure default nor too short (§6).
fn validate_secret_value(name: &str, value: &str, enforce_min_len: bool) -> Result<()> {
    let insecure: HashSet<&str> = INSECURE_DEFAULTS.iter().copied().collect();
    if insecure.contains(value.to_lowercase().as_str()) {
        return Err(VeritasError::Config(format!(
            "{name} must be set to a secure value via environment variable"
        )));
    }
    if enforce_min_len && value.len() < MIN_SECRET_LEN {
        return Err(VeritasError::Config(format!(
            "{name} must be at least {MIN_SECRET_LEN} characters long"
        )));
    }
    Ok(())
}

fn require_secret(env_var: &str, enforce_min_len: bool) -> Result<SecretString> {
    let value = std::env::var(env_var).unwrap_or_default();
    validate_secret_value(env_var, &value, enforce_min_len)?;
    Ok(SecretString::new(value))
}

/// Expose a secret's value for outbound use only (signing, header
/// construction) — never for logging.
pub fn expose(secret: &SecretString) -> &str {
    secret.expose_secret()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn rejects_insecure_default_secret() {
        with_env(&[("VERITAS_SECRET_KEY", "change-me-in-production")], || {
            let err = require_secret("VERITAS_SECRET_KEY", true).unwrap_err();
            assert!(matches!(err, VeritasError::Config(_)));
        });
    }

    #[test]
    fn rejects_too_short_secret() {
        with_env(&[("VERITAS_SECRET_KEY", "short")], || {
            let err = require_secret("VERITAS_SECRET_KEY", true).unwrap_err();
            assert!(matches!(err, VeritasError::Config(_)));
        });
    }

    #[test]
    fn accepts_sufficiently_long_secret() {
        with_env(
            &[("VERITAS_SECRET_KEY", "a-genuinely-long-random-secret-value-here")],
            || {
                let secret = require_secret("VERITAS_SECRET_KEY", true).unwrap();
                assert_eq!(expose(&secret).len(), 42);
            },
        );
    }

    #[test]
    fn test_config_uses_insecure_but_valid_length_secrets() {
        let cfg = VeritasConfig::for_tests();
        assert!(expose(&cfg.app_secret_key).len() >= MIN_SECRET_LEN);
    }
}

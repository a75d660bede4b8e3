use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider kind enumeration for supported LLM/embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI API provider (api.openai.com)
    OpenAI,
    /// Venice AI provider (venice.ai)
    Venice,
    /// OpenRouter provider (openrouter.ai)
    OpenRouter,
    /// XAI (Grok) provider
    XAI,
    /// Generic OpenAI-compatible provider
    Generic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Venice => write!(f, "venice"),
            ProviderKind::OpenRouter => write!(f, "openrouter"),
            ProviderKind::XAI => write!(f, "xai"),
            ProviderKind::Generic => write!(f, "generic"),
        }
    }
}

/// Unified provider profile definition.
///
/// Single source of truth for provider configuration across crates.
/// Stored in: `~/.local/share/veritas/profiles.json`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderProfile {
    /// Profile name (unique identifier)
    pub name: String,
    /// Provider base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,
    /// Reference to API key stored in keychain (format: "api_key:{profile_name}")
    pub api_key_id: String,
    /// Default model for this provider (e.g., "gpt-4o-mini")
    pub default_model: String,
    /// Additional HTTP headers (excluding Authorization)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Organization identifier (for providers that support it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Project identifier (for providers that support it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Provider kind override (auto-detected from URL if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_kind: Option<ProviderKind>,
    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

fn default_timeout_s() -> u64 {
    60
}

impl ProviderProfile {
    /// Create a new profile with the given name and base URL
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let name_str = name.into();
        Self {
            name: name_str.clone(),
            base_url: base_url.into(),
            api_key_id: format!("api_key:{}", name_str),
            default_model: "gpt-4o-mini".to_string(),
            headers: None,
            organization: None,
            project: None,
            provider_kind: None,
            timeout_s: default_timeout_s(),
        }
    }

    /// Set the default model for this profile
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set a custom header for this profile
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the provider kind override
    pub fn with_provider_kind(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = Some(kind);
        self
    }

    /// Set the timeout for this profile
    pub fn with_timeout(mut self, timeout_s: u64) -> Self {
        self.timeout_s = timeout_s;
        self
    }

    /// Set the API key ID
    pub fn with_api_key_id(mut self, api_key_id: impl Into<String>) -> Self {
        self.api_key_id = api_key_id.into();
        self
    }

    /// Validate the base URL
    pub fn validate_base_url(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }
        Ok(())
    }

    /// Validate the headers
    pub fn validate_headers(&self) -> Result<(), String> {
        if let Some(headers) = &self.headers {
            for (key, value) in headers {
                if key.chars().any(|c| c.is_control() || c == ':') {
                    return Err(format!("Invalid header name: {}", key));
                }
                if value.chars().any(|c| c.is_control()) {
                    return Err(format!("Invalid header value for key: {}", key));
                }
            }
        }
        Ok(())
    }
}

/// Status of a scan run, surfaced to callers of the scan request interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanRunStatus {
    /// Accepted, not yet started
    Queued,
    /// A worker has picked it up
    Running,
    /// Finished with no degradation flags
    Completed,
    /// Finished but at least one degradation flag is set
    Degraded,
    /// Did not finish (clone/auth/validation failure)
    Failed,
}

/// Scan request input (§6 "Scan request").
///
/// Exactly one of `repo_url`/`repo_id` must be set; validated by
/// [`ScanRequest::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScanRequest {
    /// Public clone URL of the repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    /// Identity of an already-connected repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    /// Git ref to scan (branch, tag, or commit-ish); defaults to the repo's default branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Hosting region hint, opaque to the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Compliance sector hint (affects regulatory tag mapping), opaque to the core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Restrict to a subset of analyzer categories; empty means "all enabled"
    #[serde(default)]
    pub analyzers_enabled: Vec<String>,
    /// Cap on files considered by the scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
    /// Skip vendor/build directories even if not auto-detected
    #[serde(default)]
    pub skip_vendor: bool,
}

/// Validation error for a malformed external-interface request.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, JsonSchema)]
pub enum ValidationError {
    /// Neither `repo_url` nor `repo_id` was supplied
    #[error("exactly one of repo_url or repo_id is required")]
    MissingRepoReference,
    /// The referenced repository is not visible to the caller
    #[error("repository not found")]
    RepoNotFound,
    /// Question length outside `1..=1000`
    #[error("question must be between 1 and 1000 characters")]
    QuestionLength,
}

impl ScanRequest {
    /// Validate the request per §6: exactly one of `repo_url`/`repo_id` required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.repo_url, &self.repo_id) {
            (None, None) => Err(ValidationError::MissingRepoReference),
            _ => Ok(()),
        }
    }
}

/// Response returned on accepting a scan request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScanRunHandle {
    /// Opaque scan run identifier
    pub scan_run_id: String,
    /// Initial status, always `queued` on acceptance
    pub status: ScanRunStatus,
}

/// Finding-listing filter (§6 "Finding listing").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FindingListQuery {
    /// Restrict to one or more categories
    #[serde(default)]
    pub category: Vec<String>,
    /// Restrict to one or more severities
    #[serde(default)]
    pub severity: Vec<String>,
    /// Restrict to one or more confidence levels
    #[serde(default)]
    pub confidence: Vec<String>,
}

/// Per-field counts accompanying a finding listing response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FindingCounts {
    /// Count per severity value
    pub by_severity: HashMap<String, usize>,
    /// Count per category value
    pub by_category: HashMap<String, usize>,
    /// Count per confidence value
    pub by_confidence: HashMap<String, usize>,
}

/// Answer request input (§6 "Answer request"). `question` length must be `1..=1000`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerRequest {
    /// Free-text question about the repository
    pub question: String,
}

impl AnswerRequest {
    /// Validate the question length per §6.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let len = self.question.chars().count();
        if (1..=1000).contains(&len) {
            Ok(())
        } else {
            Err(ValidationError::QuestionLength)
        }
    }
}

/// Answer response shape (§6 "Answer request").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerResponse {
    /// Composed answer text
    pub answer_text: String,
    /// Flat citation list
    pub citations: Vec<CitationDto>,
    /// Discrete confidence tier
    pub confidence_tier: String,
    /// Claims the engine could not substantiate
    pub unknowns: Vec<String>,
    /// `confidence_tier != "none"`
    pub has_sufficient_evidence: bool,
}

/// Wire representation of a citation, independent of the core's `Citation` entity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CitationDto {
    /// 1-based index matching `[Source i]` in the prompt
    pub source_index: usize,
    /// Repository-relative file path
    pub file_path: String,
    /// Inclusive start line
    pub start_line: usize,
    /// Inclusive end line
    pub end_line: usize,
    /// The cited snippet text
    pub snippet: String,
    /// Enclosing symbol, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    /// Deep link to the hosting platform, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Inbound webhook event kinds handled per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    /// App installed or uninstalled
    Installation,
    /// Push to a branch
    Push,
    /// Pull/merge request opened or updated
    PullRequest,
    /// Any event kind not in the handled set; logged and ignored
    Unknown,
}

/// A parsed, but not yet signature-verified, inbound webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebhookEvent {
    /// Event kind, as named by the `X-*-Event` header
    pub kind: WebhookEventKind,
    /// Hosting-platform delivery id, for idempotency/logging
    pub delivery_id: String,
    /// Raw JSON payload
    pub payload: serde_json::Value,
}

/// Action that triggers a pull-request review, per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    /// PR opened
    Opened,
    /// PR updated with new commits
    Synchronize,
    /// Any other action; does not trigger review
    Other,
}

/// Errors raised when an inbound webhook fails authentication.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, JsonSchema)]
pub enum AuthError {
    /// HMAC signature did not match
    #[error("invalid webhook signature")]
    InvalidSignature,
    /// No signature header present
    #[error("missing webhook signature")]
    MissingSignature,
    /// Installation token expired or absent
    #[error("invalid or expired installation token")]
    InvalidToken,
}

/// A cached, per-installation upstream access token (§6 "Upstream hosting API").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallationToken {
    /// The bearer token value
    pub token: String,
    /// Expiry timestamp reported by the hosting platform
    pub expires_at: DateTime<Utc>,
}

impl InstallationToken {
    /// Tokens are refreshed 5 minutes before expiry per §6.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - chrono::Duration::minutes(5)
    }
}

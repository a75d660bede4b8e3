//! Data model (§3).
//!
//! Entities are defined by their invariants, not their storage — these
//! types carry no persistence concerns; a caller's database layer maps
//! them onto whatever schema it likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Lifecycle status of a connected repository's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    /// Connected, never indexed
    Pending,
    /// An index run is in progress
    Indexing,
    /// Index is current
    Ready,
    /// Last index attempt failed
    Failed,
}

/// Identity `(owner, name)`. A Repository owns its ScanRuns, Chunks, Answers.
///
/// Invariant: only one indexing operation per repository may be in progress
/// — enforced by callers via `index_status` (a repository transitions to
/// `Indexing` only from `Pending`/`Ready`/`Failed`, never from `Indexing`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Opaque, globally unique identifier
    pub id: String,
    /// Hosting-platform owner/org
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Default branch name
    pub default_branch: String,
    /// Hosting-platform app installation id, if connected via app integration
    pub install_id: Option<String>,
    /// Current index lifecycle state
    pub index_status: IndexStatus,
    /// Commit SHA the current index reflects
    pub last_indexed_commit: Option<String>,
    /// Soft-delete marker; a tombstoned repository is excluded from listings
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Repository {
    /// Construct a freshly-connected repository (`Pending`, never indexed).
    pub fn new(id: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            name: name.into(),
            default_branch: "main".to_string(),
            install_id: None,
            index_status: IndexStatus::Pending,
            last_indexed_commit: None,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Status of a scan attempt. `Degraded` means it completed but at least
/// one degradation flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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
    /// Did not finish
    Failed,
}

/// Immutable record of a scan attempt.
///
/// Identity includes `(repo, commit_sha, config_hash)` — scans sharing
/// this triple return the existing run rather than spawning a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    /// Opaque identifier
    pub id: String,
    /// Owning repository id
    pub repo_id: String,
    /// Commit the scan ran against
    pub commit_sha: String,
    /// Hash of the effective scan configuration (analyzers enabled, max_files, …)
    pub config_hash: String,
    /// Current status
    pub status: ScanRunStatus,
    /// Reasons the run is degraded, if any
    pub degraded_reasons: Vec<String>,
    /// When the run was created
    pub started_at: DateTime<Utc>,
    /// When the run finished, if it has
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanRun {
    /// The `(repo, commit_sha, config_hash)` dedup identity.
    pub fn identity(&self) -> (String, String, String) {
        (
            self.repo_id.clone(),
            self.commit_sha.clone(),
            self.config_hash.clone(),
        )
    }

    /// Stable config hash for a scan request's effective configuration.
    pub fn compute_config_hash(analyzers_enabled: &[String], max_files: Option<usize>) -> String {
        let mut sorted = analyzers_enabled.to_vec();
        sorted.sort();
        let mut hasher = Sha256::new();
        hasher.update(sorted.join(",").as_bytes());
        hasher.update(b"|");
        hasher.update(max_files.map(|n| n.to_string()).unwrap_or_default().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A `(scan_run, path)` capture. Unique per scan per path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// Owning scan run id
    pub scan_run_id: String,
    /// Repository-relative path
    pub path: String,
    /// Detected language name
    pub language: String,
    /// `SHA-256(content)`
    pub content_hash: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Whether the file was classified as binary
    pub is_binary: bool,
}

impl FileSnapshot {
    /// Build a snapshot, computing `content_hash` from `content`.
    pub fn from_content(scan_run_id: impl Into<String>, path: impl Into<String>, language: impl Into<String>, content: &[u8], is_binary: bool) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self {
            scan_run_id: scan_run_id.into(),
            path: path.into(),
            language: language.into(),
            content_hash: format!("{:x}", hasher.finalize()),
            size_bytes: content.len() as u64,
            is_binary,
        }
    }
}

/// Kind of a parsed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Class/struct definition
    Class,
    /// Interface/trait/protocol definition
    Interface,
    /// Top-level function
    Function,
    /// Method on a class/struct/impl
    Method,
    /// Module-level constant
    Constant,
}

/// Visibility of a symbol, derived from naming convention when no
/// explicit modifier exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// No leading underscore, or an explicit `pub`/`public` modifier
    Public,
    /// Single leading underscore convention
    Protected,
    /// Double leading underscore convention (non-dunder)
    Private,
    /// Dunder (`__x__`) convention
    Magic,
}

/// `(kind, name, qualified_name, file_path, line_start, line_end, …)`.
///
/// Invariants: `line_start <= line_end`; `parent` only set for nested
/// symbols; `qualified_name` is unique within a parse result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Symbol kind
    pub kind: SymbolKind,
    /// Unqualified name
    pub name: String,
    /// Fully qualified name, unique within one parse result
    pub qualified_name: String,
    /// File-relative path
    pub file_path: String,
    /// First line (1-based, inclusive)
    pub line_start: usize,
    /// Last line (1-based, inclusive)
    pub line_end: usize,
    /// Signature text, when extractable
    pub signature: Option<String>,
    /// Docstring/doc-comment text, when present
    pub docstring: Option<String>,
    /// Enclosing symbol's qualified name, for nested symbols
    pub parent: Option<String>,
    /// Derived or explicit visibility
    pub visibility: Visibility,
    /// Body text. Always `None` for symbols produced by the regex
    /// fallback parser — see `Symbol::fallback`.
    pub body: Option<String>,
}

impl Symbol {
    /// Construct a symbol from a first-class AST path, where a body may
    /// legitimately be known.
    #[allow(clippy::too_many_arguments)]
    pub fn ast(
        kind: SymbolKind,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        parent: Option<String>,
        visibility: Visibility,
        body: Option<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            qualified_name: qualified_name.into(),
            file_path: file_path.into(),
            line_start,
            line_end,
            signature: None,
            docstring: None,
            parent,
            visibility,
            body,
        }
    }

    /// Construct a symbol from the regex fallback path. There is no
    /// `body` parameter at all: the fallback can never populate it,
    /// per §4.3's "never emit the body field populated" rule, enforced
    /// here at the type level rather than by convention.
    pub fn fallback(
        kind: SymbolKind,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        parent: Option<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            qualified_name: qualified_name.into(),
            file_path: file_path.into(),
            line_start,
            line_end,
            signature: None,
            docstring: None,
            parent,
            visibility,
            body: None,
        }
    }

    /// `true` if this symbol can contribute to body-based analysis.
    pub fn has_analyzable_body(&self) -> bool {
        self.body.is_some()
    }
}

/// `(file_path, line, module, alias?, is_from_import, imported_names)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// File the import statement appears in
    pub file_path: String,
    /// Source line number
    pub line: usize,
    /// Imported module/package path as written
    pub module: String,
    /// Local alias, if any (`import x as y`)
    pub alias: Option<String>,
    /// Whether this is a `from X import Y` style import
    pub is_from_import: bool,
    /// Names imported from `module` (empty for whole-module imports)
    pub imported_names: Vec<String>,
}

/// `(file_path, line, caller_qname, callee_expression)`. `callee_expression`
/// is the syntactic call target before resolution (done in the Indexer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    /// File the call site appears in
    pub file_path: String,
    /// Source line number
    pub line: usize,
    /// Qualified name of the enclosing symbol making the call
    pub caller_qname: String,
    /// Raw syntactic callee expression, unresolved
    pub callee_expression: String,
}

/// `(file_snapshot, start_line, end_line, snippet_text, snippet_hash, …)`.
/// `snippet_text` is redacted; `snippet_hash` is stable across identical
/// redacted content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    /// File path the snippet was extracted from
    pub file_path: String,
    /// Inclusive start line of the snippet (after context expansion)
    pub start_line: usize,
    /// Inclusive end line of the snippet (after context expansion)
    pub end_line: usize,
    /// Redacted snippet text
    pub snippet_text: String,
    /// `SHA-256(snippet_text)` after redaction
    pub snippet_hash: String,
    /// Lines immediately before the core range
    pub context_before: Vec<String>,
    /// Lines immediately after the core range
    pub context_after: Vec<String>,
}

/// Severity enum, ordered `critical > high > medium > low > info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Lowest rank — ordering requires this to sort first
    Info,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity
    High,
    /// Highest rank
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// Confidence enum, ordered `high > medium > low > unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Lowest rank
    Unknown,
    /// Low confidence
    Low,
    /// Medium confidence
    Medium,
    /// Highest rank
    High,
}

impl Confidence {
    /// Step this confidence down by one tier, saturating at `Unknown`.
    pub fn downgrade(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium => Confidence::Low,
            Confidence::Low => Confidence::Unknown,
            Confidence::Unknown => Confidence::Unknown,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Impact score breakdown (§4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactScore {
    /// 0-100 combined score
    pub score: u8,
    /// Data-sensitivity classification driving the score
    pub data_sensitivity: Option<String>,
    /// Flow-width classification driving the score
    pub flow_width: Option<String>,
    /// Regulatory tags attached from the data-sensitivity mapping
    pub regulatory_tags: Vec<String>,
}

/// Exploitability score breakdown (§4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExploitabilityScore {
    /// 0-100 combined score
    pub score: u8,
    /// Network-exposure classification driving the score
    pub network_exposure: Option<String>,
    /// Attack-complexity classification driving the score
    pub attack_complexity: Option<String>,
}

/// Root record after deduplication. One Finding may have many
/// [`FindingInstance`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable rule identifier that produced this finding
    pub rule_id: String,
    /// Canonical category (`security`, `privacy`, `reliability`,
    /// `performance`, `maintainability`, `architecture`, or one of the
    /// high-precision categories)
    pub category: String,
    /// Short human title
    pub title: String,
    /// Longer human description
    pub description: String,
    /// Severity, possibly auto-downgraded to `info`
    pub severity: Severity,
    /// Confidence, possibly downgraded for coverage/AST unavailability
    pub confidence: Confidence,
    /// Data-sensitivity / flow-width impact breakdown
    pub impact: ImpactScore,
    /// Network-exposure / attack-complexity exploitability breakdown
    pub likelihood: ExploitabilityScore,
    /// Free-form tags
    pub tags: Vec<String>,
    /// `SHA-256(rule_id | normalized_sink | normalized_source | symbol | dir(path))`
    pub dedupe_key: String,
    /// Short remediation guidance
    pub remediation_summary: String,
    /// Individual occurrences collapsed into this root finding
    pub instances: Vec<FindingInstance>,
}

/// One occurrence of a [`Finding`], pointing at an [`EvidenceSnippet`] and
/// optionally a symbol or call trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingInstance {
    /// The evidence this instance is anchored to
    pub evidence: EvidenceSnippet,
    /// Enclosing symbol's qualified name, if resolvable
    pub symbol_qname: Option<String>,
    /// Call trace qualified names, if the finding is call-graph derived
    pub trace: Vec<String>,
    /// Non-empty reason the rule fired, required for evidence completeness
    pub rule_trigger_reason: String,
}

/// Emitted by an analyzer before grouping/scoring/dedup. Becomes a
/// [`FindingInstance`] of some root [`Finding`] after C7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingMatch {
    /// Rule that produced this match
    pub rule_id: String,
    /// Canonical category
    pub category: String,
    /// File the match occurred in
    pub file_path: String,
    /// 1-based inclusive start line
    pub start_line: usize,
    /// 1-based inclusive end line
    pub end_line: usize,
    /// Non-empty explanation of why the rule fired
    pub rule_trigger_reason: String,
    /// Raw (pre-redaction) snippet text, if captured
    pub snippet: Option<String>,
    /// Raw (pre-redaction) lines immediately before `start_line`, up to
    /// the Evidence Builder's context window
    pub context_before: Vec<String>,
    /// Raw (pre-redaction) lines immediately after `end_line`, up to the
    /// Evidence Builder's context window
    pub context_after: Vec<String>,
    /// Enclosing symbol qualified name, if known
    pub symbol_qname: Option<String>,
    /// Severity as proposed by the rule, before auto-downgrade
    pub proposed_severity: Severity,
    /// Confidence as proposed by the rule, before coverage adjustment
    pub proposed_confidence: Confidence,
    /// Normalized taint sink, for dedup-key computation
    pub normalized_sink: Option<String>,
    /// Normalized taint source, for dedup-key computation
    pub normalized_source: Option<String>,
    /// Short human title
    pub title: String,
    /// Longer human description
    pub description: String,
    /// Short remediation guidance
    pub remediation_summary: String,
    /// Free-form tags
    pub tags: Vec<String>,
    /// `true` if this match only applies to diff lines (for PR-scoped review)
    pub diff_lines: Option<Vec<usize>>,
}

impl FindingMatch {
    /// `check_evidence_completeness` (§4.7): required fields non-empty
    /// and well-formed. A match failing this is the "speculative
    /// finding" case and is auto-downgraded to `info` by the Scorer.
    pub fn has_complete_evidence(&self) -> bool {
        !self.file_path.is_empty()
            && !self.rule_trigger_reason.is_empty()
            && self.start_line > 0
            && self.end_line >= self.start_line
            && self.snippet.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Per-language discovered/parsed/skip-reason counters (§4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageCounts {
    /// Files discovered for this language
    pub discovered: usize,
    /// Files successfully parsed
    pub parsed: usize,
}

/// One scan's coverage accounting, one per scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Total files discovered (including excluded ones)
    pub total_discovered: usize,
    /// Files successfully parsed
    pub total_parsed: usize,
    /// `reason -> [paths]`
    pub skipped: HashMap<String, Vec<String>>,
    /// `(path, error_text)` for files that threw during parse
    pub failed: Vec<(String, String)>,
    /// Per-language counters
    pub per_language: HashMap<String, LanguageCounts>,
    /// `100 * parsed / discoverable`, 0 if discoverable is 0
    pub coverage_percent: f64,
    /// `coverage_percent < 80.0`
    pub incomplete: bool,
    /// Degradation flags (`tree_sitter_unavailable`, `low_coverage`, `parse_errors`)
    pub degraded_flags: Vec<String>,
}

/// Embedding unit. Stable id = `hash(file_path + qualified_name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk id
    pub id: String,
    /// Owning repository id
    pub repo_id: String,
    /// Source file path
    pub file_path: String,
    /// Inclusive start line
    pub line_start: usize,
    /// Inclusive end line
    pub line_end: usize,
    /// Enclosing/contained symbol name
    pub symbol_name: String,
    /// Symbol kind as a string (`class`, `function`, `method`)
    pub symbol_type: String,
    /// Short preview of chunk content, for display without a secondary lookup
    pub content_preview: String,
    /// Full chunk content that was embedded
    pub content: String,
    /// Embedding vector, once computed
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// `hash(file_path + qualified_name)`, stable across re-chunking of
    /// unchanged code.
    pub fn stable_id(repo_id: &str, file_path: &str, qualified_name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(repo_id.as_bytes());
        hasher.update(b"|");
        hasher.update(file_path.as_bytes());
        hasher.update(b"|");
        hasher.update(qualified_name.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Discrete confidence tier for an [`Answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Zero verified quotes
    None,
    /// Some verification, but weak
    Low,
    /// Solid verification across multiple sections/files
    Medium,
    /// Strong verification across multiple sections/files with good retrieval scores
    High,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceTier::None => "none",
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        };
        write!(f, "{s}")
    }
}

/// One quoted span within an answer section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedSpan {
    /// The verbatim (claimed) quote
    pub quote: String,
    /// Which numbered source this quote is claimed against
    pub source_index: usize,
    /// Whether the quote-matching ladder found this quote in the source
    pub verified: bool,
}

/// One claim section of a proof-carrying answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSection {
    /// Section prose
    pub text: String,
    /// Source indices this section cites
    pub source_ids: Vec<usize>,
    /// Quoted spans backing this section's claims
    pub quoted_spans: Vec<QuotedSpan>,
    /// `true` if this section had no quotes supplied at all
    pub unverified: bool,
}

/// `(repo, question, answer_sections, unknowns, confidence_tier, …)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Owning repository id
    pub repo_id: String,
    /// The question asked
    pub question: String,
    /// Claim sections
    pub answer_sections: Vec<AnswerSection>,
    /// Claims the engine could not substantiate
    pub unknowns: Vec<String>,
    /// Discrete confidence tier
    pub confidence_tier: ConfidenceTier,
    /// Inputs to the confidence-tiering formula, for display/debugging
    pub confidence_factors: ConfidenceFactors,
    /// Whether JSON ingestion and verification both succeeded
    pub validation_passed: bool,
    /// Reasons sections/quotes were rejected
    pub validation_errors: Vec<String>,
    /// Citations keyed by source_index
    pub citations: Vec<Citation>,
}

/// Inputs to the confidence-tiering formula (§4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    /// V: count of verified quotes
    pub verified_quotes: usize,
    /// T: total quotes
    pub total_quotes: usize,
    /// S: sections with >= 1 verified quote
    pub sections_with_verified_quote: usize,
    /// F: unique files among cited sources
    pub unique_files: usize,
    /// mean retrieval score across cited sources
    pub avg_retrieval_score: f64,
}

/// `(answer, source_index, file_path, start_line, end_line, snippet, …)`.
/// Unique per `(answer, file_path, start_line, end_line)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
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
    pub symbol_name: Option<String>,
    /// Deep link to the hosting platform, when available
    pub github_url: Option<String>,
}

/// Summary of redactions performed by [`crate::redaction::RedactionEngine`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactionSummary {
    /// Total number of redactions performed
    pub total_redactions: usize,
    /// Redactions broken out by secret-type name
    pub by_type: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_correctly() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn confidence_orders_correctly() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert!(Confidence::Low > Confidence::Unknown);
    }

    #[test]
    fn confidence_downgrade_saturates() {
        assert_eq!(Confidence::Low.downgrade(), Confidence::Unknown);
        assert_eq!(Confidence::Unknown.downgrade(), Confidence::Unknown);
    }

    #[test]
    fn fallback_symbol_never_has_body() {
        let s = Symbol::fallback(
            SymbolKind::Function,
            "foo",
            "mod.foo",
            "mod.py",
            1,
            2,
            None,
            Visibility::Public,
        );
        assert!(s.body.is_none());
        assert!(!s.has_analyzable_body());
    }

    #[test]
    fn finding_match_requires_all_fields_for_complete_evidence() {
        let base = FindingMatch {
            rule_id: "r1".into(),
            category: "security".into(),
            file_path: "a.py".into(),
            start_line: 1,
            end_line: 1,
            rule_trigger_reason: "matched secret pattern".into(),
            snippet: Some("secret = 'x'".into()),
            context_before: vec![],
            context_after: vec![],
            symbol_qname: None,
            proposed_severity: Severity::Critical,
            proposed_confidence: Confidence::High,
            normalized_sink: None,
            normalized_source: None,
            title: "t".into(),
            description: "d".into(),
            remediation_summary: "r".into(),
            tags: vec![],
            diff_lines: None,
        };
        assert!(base.has_complete_evidence());

        let mut missing_snippet = base.clone();
        missing_snippet.snippet = None;
        assert!(!missing_snippet.has_complete_evidence());

        let mut bad_lines = base.clone();
        bad_lines.end_line = 0;
        bad_lines.start_line = 1;
        assert!(!bad_lines.has_complete_evidence());
    }

    #[test]
    fn chunk_stable_id_is_deterministic() {
        let a = Chunk::stable_id("repo1", "a.py", "mod.foo");
        let b = Chunk::stable_id("repo1", "a.py", "mod.foo");
        let c = Chunk::stable_id("repo1", "a.py", "mod.bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn scan_run_config_hash_ignores_order() {
        let h1 = ScanRun::compute_config_hash(&["b".into(), "a".into()], Some(10));
        let h2 = ScanRun::compute_config_hash(&["a".into(), "b".into()], Some(10));
        assert_eq!(h1, h2);
    }
}

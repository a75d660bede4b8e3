//! Pattern-based analyzers (§4.6), one rule table per category.
//!
//! Grounded on the teacher's `local_risk_checks` family
//! (`check_env_files`, `check_code_secrets`, `check_security_patterns`,
//! `check_code_quality`, `check_config_issues`, `check_suspicious_files`)
//! and the six analyzer category names from
//! `original_source/backend/app/analyzers/*.py`.

use std::sync::OnceLock;

use regex::Regex;
use veritas_core::{Confidence, Severity};

/// One line-oriented pattern rule.
pub struct PatternRule {
    /// Stable rule identifier
    pub rule_id: &'static str,
    /// Canonical category
    pub category: &'static str,
    /// Compiled detection pattern
    pub pattern: Regex,
    /// Severity proposed when the pattern matches
    pub severity: Severity,
    /// Confidence proposed when the pattern matches
    pub confidence: Confidence,
    /// Short human title
    pub title: &'static str,
    /// Longer human description
    pub description: &'static str,
    /// Short remediation guidance
    pub remediation: &'static str,
    /// File extensions this rule applies to; empty means "any source file"
    pub extensions: &'static [&'static str],
}

fn comment_prefixed(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("(*")
        || trimmed.starts_with("/*")
        || trimmed.starts_with("--")
        || trimmed.starts_with('*')
}

/// `true` if `line` should be skipped by a rule due to comment/test/doc
/// conventions, mirroring the teacher's per-check exclusions.
pub fn is_excluded_line(line: &str) -> bool {
    comment_prefixed(line.trim())
}

/// `true` if `file_path` looks like a test/fixture/example file, which
/// secret-detection rules skip to avoid flagging intentionally-fake
/// credentials.
pub fn is_test_or_fixture_file(file_path: &str) -> bool {
    let name = file_path.rsplit('/').next().unwrap_or(file_path).to_lowercase();
    ["test", "spec", "fixture", "example", "mock"]
        .iter()
        .any(|p| name.contains(p))
}

/// `true` if `file_path` is a documentation file, exempt from code rules.
pub fn is_doc_file(file_path: &str) -> bool {
    let lower = file_path.to_lowercase();
    [".md", ".txt", ".rst", ".adoc", ".markdown"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static pattern {pattern:?}: {e}"))
}

/// The full default rule set, compiled once.
pub fn default_rules() -> &'static [PatternRule] {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            // --- security ---
            PatternRule {
                rule_id: "SEC_API_KEY",
                category: "security",
                pattern: re(r#"(?i)(api[_-]?key|apikey)\s*[=:]\s*['"][a-zA-Z0-9_-]{16,}['"]"#),
                severity: Severity::Critical,
                confidence: Confidence::High,
                title: "Hardcoded API key",
                description: "An API key literal appears directly in source code",
                remediation: "Use environment variables or a secrets manager",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_PASSWORD",
                category: "security",
                pattern: re(r#"(?i)(password|passwd|pwd)\s*[=:]\s*['"][^'"]{4,}['"]"#),
                severity: Severity::Critical,
                confidence: Confidence::High,
                title: "Hardcoded password",
                description: "A password literal appears directly in source code",
                remediation: "Use environment variables or a secrets manager",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_GENERIC_SECRET",
                category: "security",
                pattern: re(r#"(?i)(secret|private[_-]?key)\s*[=:]\s*['"][a-zA-Z0-9_-]{8,}['"]"#),
                severity: Severity::Critical,
                confidence: Confidence::High,
                title: "Hardcoded secret",
                description: "A secret or private key literal appears directly in source code",
                remediation: "Use environment variables or a secrets manager",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_TOKEN",
                category: "security",
                pattern: re(r#"(?i)(token|auth[_-]?token)\s*[=:]\s*['"][a-zA-Z0-9_-]{10,}['"]"#),
                severity: Severity::High,
                confidence: Confidence::Medium,
                title: "Hardcoded auth token",
                description: "An authentication token literal appears directly in source code",
                remediation: "Use environment variables or a secrets manager",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_AWS_KEY",
                category: "security",
                pattern: re(r"AKIA[0-9A-Z]{16}"),
                severity: Severity::Critical,
                confidence: Confidence::High,
                title: "AWS access key",
                description: "An AWS access key ID appears directly in source code",
                remediation: "Rotate the key and use IAM roles or a secrets manager",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_SQL_INJECTION",
                category: "security",
                pattern: re(r"(?i)(select |insert |update |delete |drop )[^;]*(format!\(|format\(|\+\s|\s\+)"),
                severity: Severity::High,
                confidence: Confidence::Medium,
                title: "Potential SQL injection",
                description: "SQL keywords combined with dynamic string construction",
                remediation: "Use parameterized queries or prepared statements",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_INSECURE_HTTP",
                category: "security",
                pattern: re(r"(?i)http://(?!localhost|127\.0\.0\.1)"),
                severity: Severity::Medium,
                confidence: Confidence::High,
                title: "Insecure HTTP URL",
                description: "A non-loopback URL uses plaintext HTTP instead of HTTPS",
                remediation: "Use HTTPS instead of HTTP",
                extensions: &[],
            },
            PatternRule {
                rule_id: "SEC_DANGEROUS_EVAL",
                category: "security",
                pattern: re(r"(?i)\beval\s*\("),
                severity: Severity::High,
                confidence: Confidence::Medium,
                title: "Dangerous eval() usage",
                description: "eval() executes dynamically constructed code",
                remediation: "Avoid eval(); use safer alternatives such as explicit parsers",
                extensions: &[],
            },
            // --- privacy ---
            PatternRule {
                rule_id: "PRIV_PII_LOGGING",
                category: "privacy",
                pattern: re(r"(?i)log(ger)?\.(info|debug|warn|error)\([^)]*\b(ssn|email|password|credit_card|phone_number)\b"),
                severity: Severity::High,
                confidence: Confidence::Medium,
                title: "Potential PII in logs",
                description: "A log statement appears to include personally identifiable data",
                remediation: "Redact or omit PII fields before logging",
                extensions: &[],
            },
            // --- reliability ---
            PatternRule {
                rule_id: "REL_BARE_EXCEPT",
                category: "reliability",
                pattern: re(r"(?m)^\s*except\s*:\s*$"),
                severity: Severity::Medium,
                confidence: Confidence::High,
                title: "Bare except clause",
                description: "A bare except silently swallows all exceptions, including system-exit",
                remediation: "Catch specific exception types",
                extensions: &[".py"],
            },
            PatternRule {
                rule_id: "REL_UNWRAP_IN_RUST",
                category: "reliability",
                pattern: re(r"\.unwrap\(\)"),
                severity: Severity::Low,
                confidence: Confidence::Medium,
                title: "Unchecked unwrap()",
                description: "unwrap() panics on an Err/None instead of propagating the error",
                remediation: "Propagate the error with `?` or handle it explicitly",
                extensions: &[".rs"],
            },
            // --- performance ---
            PatternRule {
                rule_id: "PERF_N_PLUS_ONE_QUERY",
                category: "performance",
                pattern: re(r"(?i)for\s+\w+\s+in\s+[^:]+:\s*$"),
                severity: Severity::Low,
                confidence: Confidence::Low,
                title: "Potential N+1 query pattern",
                description: "A loop precedes code that may issue one query per iteration",
                remediation: "Batch the query or eager-load the related data",
                extensions: &[".py"],
            },
            // --- maintainability ---
            PatternRule {
                rule_id: "MAINT_TODO_FIXME",
                category: "maintainability",
                pattern: re(r"(?i)\b(TODO|FIXME|HACK)\b"),
                severity: Severity::Info,
                confidence: Confidence::High,
                title: "Outstanding TODO/FIXME marker",
                description: "Code contains an unresolved TODO, FIXME, or HACK marker",
                remediation: "Resolve the marker or file a tracked issue",
                extensions: &[],
            },
            // --- architecture ---
            PatternRule {
                rule_id: "ARCH_WILDCARD_IMPORT",
                category: "architecture",
                pattern: re(r"(?m)^\s*from\s+[\w.]+\s+import\s+\*\s*$"),
                severity: Severity::Low,
                confidence: Confidence::High,
                title: "Wildcard import",
                description: "A wildcard import obscures the module's true dependency surface",
                remediation: "Import only the names actually used",
                extensions: &[".py"],
            },
        ]
    })
}

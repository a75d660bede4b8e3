//! Coverage Tracker (C2, §4.2).

use std::collections::HashMap;

use crate::models::{CoverageSummary, LanguageCounts};

const VENDOR_DIRS: &[&str] = &[
    ".git/",
    ".svn/",
    ".hg/",
    "node_modules/",
    "target/",
    "dist/",
    "build/",
    ".next/",
    ".nuxt/",
    "vendor/",
    "__pycache__/",
    ".pytest_cache/",
    ".venv/",
    "venv/",
    ".idea/",
    ".vscode/",
];

const BINARY_EXTENSIONS: &[&str] = &[
    ".exe", ".dll", ".so", ".dylib", ".bin", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".ico",
    ".mp3", ".mp4", ".avi", ".mov", ".wav", ".zip", ".tar", ".gz", ".bz2", ".7z", ".rar", ".pdf",
    ".doc", ".docx", ".xls", ".xlsx", ".ttf", ".otf", ".woff", ".woff2", ".eot", ".class", ".jar",
    ".pyc", ".wasm",
];

/// Per-file size bound (§4.2): files larger than this are skipped with
/// [`SkipReason::TooLarge`] rather than parsed.
pub const MAX_FILE_BYTES: u64 = 1_000_000;
const COVERAGE_INCOMPLETE_THRESHOLD: f64 = 80.0;

/// Reason a file was excluded before parsing was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Classified as a binary by extension or content sniff
    Binary,
    /// Under a vendor/build-output directory
    VendorOrBuildDir,
    /// Exceeds the per-file size limit
    TooLarge,
    /// Looks minified or bundled (very long lines, no whitespace structure)
    MinifiedOrBundle,
    /// No parser exists for this language
    UnsupportedLanguage,
}

impl SkipReason {
    /// Stable taxonomy string, used as the key in [`CoverageSummary::skipped`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Binary => "binary",
            SkipReason::VendorOrBuildDir => "vendor_or_build_dir",
            SkipReason::TooLarge => "too_large",
            SkipReason::MinifiedOrBundle => "minified_or_bundle",
            SkipReason::UnsupportedLanguage => "unsupported_language",
        }
    }
}

/// `true` if `path` sits under a vendor/build-output directory.
pub fn is_vendor_or_build_dir(path: &str) -> bool {
    VENDOR_DIRS.iter().any(|dir| path.contains(dir))
}

/// `true` if `path`'s extension marks it as binary content.
pub fn is_binary_extension(path: &str) -> bool {
    let lower = path.to_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Heuristic minified/bundle detector: a very long longest-line with low
/// average whitespace density.
pub fn looks_minified_or_bundle(content: &str) -> bool {
    let longest_line = content.lines().map(|l| l.len()).max().unwrap_or(0);
    if longest_line < 1000 {
        return false;
    }
    let total_chars = content.len().max(1);
    let whitespace_chars = content.chars().filter(|c| c.is_whitespace()).count();
    (whitespace_chars as f64 / total_chars as f64) < 0.05
}

/// Accumulates discovered/parsed/skipped/failed counts for one scan run
/// and derives [`CoverageSummary`] from them.
#[derive(Debug, Default)]
pub struct CoverageTracker {
    total_discovered: usize,
    total_parsed: usize,
    skipped: HashMap<String, Vec<String>>,
    failed: Vec<(String, String)>,
    per_language: HashMap<String, LanguageCounts>,
    tree_sitter_unavailable: bool,
}

impl CoverageTracker {
    /// New tracker. `tree_sitter_unavailable` is recorded up front since
    /// it's a deployment-wide capability, not a per-file outcome.
    pub fn new(tree_sitter_unavailable: bool) -> Self {
        Self {
            tree_sitter_unavailable,
            ..Default::default()
        }
    }

    /// Record a file that was classified for exclusion before parsing.
    pub fn record_skip(&mut self, path: impl Into<String>, language: &str, reason: SkipReason) {
        self.total_discovered += 1;
        self.skipped.entry(reason.as_str().to_string()).or_default().push(path.into());
        self.per_language.entry(language.to_string()).or_default().discovered += 1;
    }

    /// Record a file that was discovered and successfully parsed.
    pub fn record_parsed(&mut self, path: impl Into<String>, language: &str) {
        let _ = path.into();
        self.total_discovered += 1;
        self.total_parsed += 1;
        let counts = self.per_language.entry(language.to_string()).or_default();
        counts.discovered += 1;
        counts.parsed += 1;
    }

    /// Record a file that was discovered but threw during parsing.
    pub fn record_failed(&mut self, path: impl Into<String>, language: &str, error: impl Into<String>) {
        self.total_discovered += 1;
        self.failed.push((path.into(), error.into()));
        self.per_language.entry(language.to_string()).or_default().discovered += 1;
    }

    /// Discoverable denominator `D`: discovered files minus binary and
    /// vendor/build-dir skips.
    fn discoverable(&self) -> usize {
        let excluded: usize = [SkipReason::Binary, SkipReason::VendorOrBuildDir]
            .iter()
            .map(|reason| self.skipped.get(reason.as_str()).map(Vec::len).unwrap_or(0))
            .sum();
        self.total_discovered.saturating_sub(excluded)
    }

    /// Finalize into a [`CoverageSummary`], computing `coverage_percent`,
    /// `incomplete`, and `degraded_flags`.
    pub fn finish(self) -> CoverageSummary {
        let discoverable = self.discoverable();
        let coverage_percent = if discoverable == 0 {
            0.0
        } else {
            100.0 * self.total_parsed as f64 / discoverable as f64
        };
        let incomplete = coverage_percent < COVERAGE_INCOMPLETE_THRESHOLD;

        let mut degraded_flags = Vec::new();
        if self.tree_sitter_unavailable {
            degraded_flags.push("tree_sitter_unavailable".to_string());
        }
        if incomplete {
            degraded_flags.push("low_coverage".to_string());
        }
        if !self.failed.is_empty() {
            degraded_flags.push("parse_errors".to_string());
        }

        CoverageSummary {
            total_discovered: self.total_discovered,
            total_parsed: self.total_parsed,
            skipped: self.skipped,
            failed: self.failed,
            per_language: self.per_language,
            coverage_percent,
            incomplete,
            degraded_flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_and_vendor_excluded_from_denominator() {
        let mut t = CoverageTracker::new(false);
        t.record_parsed("src/main.rs", "rust");
        t.record_skip("assets/logo.png", "unknown", SkipReason::Binary);
        t.record_skip("node_modules/x/index.js", "javascript", SkipReason::VendorOrBuildDir);
        let summary = t.finish();
        assert_eq!(summary.total_discovered, 3);
        assert_eq!(summary.total_parsed, 1);
        assert_eq!(summary.coverage_percent, 100.0);
        assert!(!summary.incomplete);
    }

    #[test]
    fn unsupported_language_counts_against_coverage() {
        let mut t = CoverageTracker::new(false);
        t.record_parsed("src/main.rs", "rust");
        t.record_skip("main.zig", "zig", SkipReason::UnsupportedLanguage);
        let summary = t.finish();
        assert_eq!(summary.coverage_percent, 50.0);
        assert!(summary.incomplete);
        assert!(summary.degraded_flags.contains(&"low_coverage".to_string()));
    }

    #[test]
    fn parse_failures_set_degraded_flag() {
        let mut t = CoverageTracker::new(false);
        t.record_parsed("a.py", "python");
        t.record_failed("b.py", "python", "unexpected indent");
        let summary = t.finish();
        assert!(summary.degraded_flags.contains(&"parse_errors".to_string()));
    }

    #[test]
    fn coverage_is_zero_when_nothing_discoverable() {
        let t = CoverageTracker::new(false);
        let summary = t.finish();
        assert_eq!(summary.coverage_percent, 0.0);
        assert!(summary.incomplete);
    }

    #[test]
    fn tree_sitter_unavailable_flag_always_present_when_set() {
        let t = CoverageTracker::new(true);
        let summary = t.finish();
        assert!(summary.degraded_flags.contains(&"tree_sitter_unavailable".to_string()));
    }

    #[test]
    fn vendor_dir_detection() {
        assert!(is_vendor_or_build_dir("node_modules/lodash/index.js"));
        assert!(is_vendor_or_build_dir("target/debug/build"));
        assert!(!is_vendor_or_build_dir("src/main.rs"));
    }

    #[test]
    fn binary_extension_detection() {
        assert!(is_binary_extension("/path/to/image.png"));
        assert!(!is_binary_extension("/path/to/main.rs"));
    }

    #[test]
    fn minified_detection_needs_both_long_line_and_low_whitespace() {
        let minified = format!("var x={{{}}};", "a:1,".repeat(400));
        assert!(looks_minified_or_bundle(&minified));
        let long_but_readable = "x".repeat(999) + "\n" + &" ".repeat(500);
        assert!(!looks_minified_or_bundle(&long_but_readable));
    }
}

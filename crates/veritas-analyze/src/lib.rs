//! Deterministic analyzers (C6, §4.6) and finding post-processing
//! (C7, §4.7).
//!
//! Analyzers run a fixed rule table (see [`rules`]) line-by-line over a
//! file's content and emit [`veritas_core::FindingMatch`]es. The Scorer
//! (see [`scorer`]) then dedups matches into [`veritas_core::Finding`]s,
//! computes impact/exploitability breakdowns, and auto-downgrades
//! matches with incomplete evidence.
//!
//! Grounded on the teacher's `local_risk_checks` family in `repo.rs`
//! (per-extension regex tables, comment/test-file exclusion, "first
//! occurrence per pattern per file" dedup-at-source) and the
//! `severity_rank`/`risk_rank`/health-score formula in `scan.rs`.

#![warn(missing_docs)]

pub mod rules;
pub mod scorer;

use veritas_core::{Confidence, FindingMatch, Severity};
use veritas_index::Indexer;

/// Run every applicable rule over one file's content, returning raw
/// matches (not yet deduped or scored).
///
/// `index`, if given, is used to resolve the enclosing symbol for each
/// match by finding the innermost symbol in `file_path` whose line range
/// contains the match.
pub fn analyze_file(file_path: &str, content: &str, index: Option<&Indexer>) -> Vec<FindingMatch> {
    if rules::is_doc_file(file_path) {
        return Vec::new();
    }

    let ext = file_path.rsplit('.').next().map(|e| format!(".{e}")).unwrap_or_default();
    let lines: Vec<&str> = content.lines().collect();
    let mut matches = Vec::new();

    for rule in rules::default_rules() {
        if !rule.extensions.is_empty() && !rule.extensions.contains(&ext.as_str()) {
            continue;
        }
        if rule.rule_id.starts_with("SEC_") && rules::is_test_or_fixture_file(file_path) {
            continue;
        }

        let mut fired_once = false;
        for (idx, line) in lines.iter().enumerate() {
            if rules::is_excluded_line(line) {
                continue;
            }
            // "first occurrence per pattern per file": maintainability
            // markers are the exception, every occurrence is tracked
            // since unresolved TODOs accumulate independently.
            if fired_once && rule.rule_id != "MAINT_TODO_FIXME" {
                break;
            }
            if !rule.pattern.is_match(line) {
                continue;
            }
            fired_once = true;
            let line_no = idx + 1;
            let symbol_qname = index.and_then(|ix| enclosing_symbol(ix, file_path, line_no));
            let before_idx = idx.saturating_sub(veritas_core::evidence::CONTEXT_LINES);
            let after_idx = (idx + veritas_core::evidence::CONTEXT_LINES).min(lines.len().saturating_sub(1));
            let context_before: Vec<String> = lines[before_idx..idx].iter().map(|l| l.to_string()).collect();
            let context_after: Vec<String> = if idx + 1 <= after_idx {
                lines[(idx + 1)..=after_idx].iter().map(|l| l.to_string()).collect()
            } else {
                Vec::new()
            };

            matches.push(FindingMatch {
                rule_id: rule.rule_id.to_string(),
                category: rule.category.to_string(),
                file_path: file_path.to_string(),
                start_line: line_no,
                end_line: line_no,
                rule_trigger_reason: format!("line matched pattern for rule {}", rule.rule_id),
                snippet: Some(line.to_string()),
                context_before,
                context_after,
                symbol_qname,
                proposed_severity: rule.severity,
                proposed_confidence: rule.confidence,
                normalized_sink: None,
                normalized_source: None,
                title: rule.title.to_string(),
                description: rule.description.to_string(),
                remediation_summary: rule.remediation.to_string(),
                tags: vec![rule.category.to_string()],
                diff_lines: None,
            });
        }
    }

    matches
}

fn enclosing_symbol(index: &Indexer, file_path: &str, line_no: usize) -> Option<String> {
    index
        .symbols_in_file(file_path)
        .into_iter()
        .filter(|s| s.line_start <= line_no && line_no <= s.line_end)
        .min_by_key(|s| s.line_end - s.line_start)
        .map(|s| s.qualified_name.clone())
}

/// Downgrade `confidence` once for every AST-unavailable parse in the
/// coverage summary, mirroring the rationale in [`scorer::group_and_score`]
/// but applied pre-grouping, at match-proposal time, when a caller wants
/// per-match rather than per-finding adjustment.
pub fn downgrade_for_fallback_parse(confidence: Confidence, used_fallback_parser: bool) -> Confidence {
    if used_fallback_parser {
        confidence.downgrade()
    } else {
        confidence
    }
}

/// Restrict `matches` to those overlapping `diff_lines`, tagging the
/// survivors with the matching diff line set. Used for PR-scoped review
/// where only changed lines should surface findings.
pub fn scope_to_diff(mut matches: Vec<FindingMatch>, diff_lines: &[usize]) -> Vec<FindingMatch> {
    matches.retain_mut(|m| {
        let overlap: Vec<usize> = (m.start_line..=m.end_line).filter(|l| diff_lines.contains(l)).collect();
        if overlap.is_empty() {
            false
        } else {
            m.diff_lines = Some(overlap);
            true
        }
    });
    matches
}

/// Aggregate a repository's open findings into a single 0-10 health
/// score, mirroring the teacher's scan-summary health indicator.
pub fn repository_health_score(findings: &[veritas_core::Finding]) -> u8 {
    scorer::health_score(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hardcoded_api_key() {
        let content = "API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\n";
        let matches = analyze_file("config.py", content, None);
        assert!(matches.iter().any(|m| m.rule_id == "SEC_API_KEY"));
    }

    #[test]
    fn skips_test_fixture_files_for_security_rules() {
        let content = "API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\n";
        let matches = analyze_file("tests/fixtures/config_test.py", content, None);
        assert!(!matches.iter().any(|m| m.rule_id.starts_with("SEC_")));
    }

    #[test]
    fn skips_commented_lines() {
        let content = "# API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\n";
        let matches = analyze_file("config.py", content, None);
        assert!(matches.is_empty());
    }

    #[test]
    fn rust_only_rule_does_not_fire_on_python_file() {
        let content = "result.unwrap()\n";
        let matches = analyze_file("app.py", content, None);
        assert!(matches.is_empty());
    }

    #[test]
    fn doc_files_are_exempt() {
        let content = "API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\n";
        let matches = analyze_file("README.md", content, None);
        assert!(matches.is_empty());
    }

    #[test]
    fn scope_to_diff_drops_matches_outside_changed_lines() {
        let content = "API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\nresult.unwrap()\n";
        let matches = analyze_file("config.rs", content, None);
        let scoped = scope_to_diff(matches, &[2]);
        assert!(scoped.iter().all(|m| m.start_line == 2));
    }

    #[test]
    fn resolves_enclosing_symbol_from_index() {
        let mut index = Indexer::new();
        let src = "def load_config():\n    API_KEY = \"sk-abcdefghijklmnopqrstuvwxyz\"\n";
        let parsed = veritas_parse::parse_file("config.py", src).unwrap();
        index.ingest("config.py", &parsed);

        let matches = analyze_file("config.py", src, Some(&index));
        let m = matches.iter().find(|m| m.rule_id == "SEC_API_KEY").unwrap();
        assert_eq!(m.symbol_qname.as_deref(), Some("load_config"));
    }
}

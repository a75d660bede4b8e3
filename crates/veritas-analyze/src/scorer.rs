//! Post-processing (C7, §4.7): dedup, impact/exploitability scoring, and
//! evidence-completeness auto-downgrade.
//!
//! Grounded on the teacher's `severity_rank`/`risk_rank`/health-score
//! formula in `scan.rs`, generalized from a single priority-sort key
//! into dedupe-key + scoring-table computation.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use veritas_core::{
    Confidence, EvidenceBuilder, ExploitabilityScore, Finding, FindingInstance, FindingMatch, ImpactScore, Severity,
};

/// `severity_rank` (§4.7): numeric ordering used for sorting and for the
/// health-score penalty.
pub fn severity_rank(severity: &Severity) -> u8 {
    match severity {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
        Severity::Info => 0,
    }
}

/// `risk_rank`: secondary sort key combining severity and confidence so
/// that, at equal severity, higher-confidence findings sort first.
pub fn risk_rank(severity: &Severity, confidence: &Confidence) -> u8 {
    severity_rank(severity) * 4
        + match confidence {
            Confidence::High => 3,
            Confidence::Medium => 2,
            Confidence::Low => 1,
            Confidence::Unknown => 0,
        }
}

/// `dedupe_key` (§4.7): `SHA-256(rule_id | normalized_sink |
/// normalized_source | symbol | dir(path))`.
pub fn dedupe_key(m: &FindingMatch) -> String {
    let dir = m.file_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let parts = [
        m.rule_id.as_str(),
        m.normalized_sink.as_deref().unwrap_or(""),
        m.normalized_source.as_deref().unwrap_or(""),
        m.symbol_qname.as_deref().unwrap_or(""),
        dir,
    ];
    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    format!("{:x}", hasher.finalize())
}

const DATA_SENSITIVITY_WEIGHTS: &[(&str, u8)] = &[
    ("credentials", 100),
    ("pii", 80),
    ("financial", 80),
    ("internal", 40),
    ("public", 10),
];

const FLOW_WIDTH_WEIGHTS: &[(&str, u8)] = &[("repo_wide", 100), ("module", 60), ("file", 30), ("local", 10)];

const NETWORK_EXPOSURE_WEIGHTS: &[(&str, u8)] = &[("public_internet", 100), ("internal_network", 50), ("local_only", 10)];

const ATTACK_COMPLEXITY_WEIGHTS: &[(&str, u8)] = &[("low", 100), ("medium", 50), ("high", 10)];

fn weight_for(table: &[(&str, u8)], key: Option<&str>) -> u8 {
    key.and_then(|k| table.iter().find(|(name, _)| *name == k).map(|(_, w)| *w)).unwrap_or(0)
}

/// Classify a category into a default data-sensitivity/flow-width pair,
/// used when a rule doesn't narrow the classification itself.
fn default_impact_classification(category: &str) -> (&'static str, &'static str) {
    match category {
        "security" => ("credentials", "module"),
        "privacy" => ("pii", "module"),
        "reliability" => ("internal", "file"),
        "performance" => ("internal", "local"),
        "architecture" => ("internal", "repo_wide"),
        _ => ("internal", "local"),
    }
}

fn default_exploitability_classification(category: &str) -> (&'static str, &'static str) {
    match category {
        "security" => ("public_internet", "low"),
        "privacy" => ("internal_network", "medium"),
        _ => ("local_only", "high"),
    }
}

/// Compute the impact breakdown (§4.7) for a match.
pub fn score_impact(m: &FindingMatch) -> ImpactScore {
    let (sensitivity, flow_width) = default_impact_classification(&m.category);
    let score = ((weight_for(DATA_SENSITIVITY_WEIGHTS, Some(sensitivity)) as u16
        + weight_for(FLOW_WIDTH_WEIGHTS, Some(flow_width)) as u16)
        / 2) as u8;
    let regulatory_tags = match sensitivity {
        "pii" => vec!["GDPR".to_string(), "CCPA".to_string()],
        "financial" => vec!["PCI-DSS".to_string()],
        "credentials" => vec!["SOC2".to_string()],
        _ => Vec::new(),
    };
    ImpactScore {
        score,
        data_sensitivity: Some(sensitivity.to_string()),
        flow_width: Some(flow_width.to_string()),
        regulatory_tags,
    }
}

/// Compute the exploitability breakdown (§4.7) for a match.
pub fn score_exploitability(m: &FindingMatch) -> ExploitabilityScore {
    let (exposure, complexity) = default_exploitability_classification(&m.category);
    let score = ((weight_for(NETWORK_EXPOSURE_WEIGHTS, Some(exposure)) as u16
        + weight_for(ATTACK_COMPLEXITY_WEIGHTS, Some(complexity)) as u16)
        / 2) as u8;
    ExploitabilityScore {
        score,
        network_exposure: Some(exposure.to_string()),
        attack_complexity: Some(complexity.to_string()),
    }
}

/// `health_score` (§4.7): `(10 - penalty).max(0)` where penalty scales
/// with the sum of severity ranks of open findings, capped at 10.
pub fn health_score(findings: &[Finding]) -> u8 {
    let total_penalty: f64 = findings.iter().map(|f| severity_rank(&f.severity) as f64).sum();
    let penalty_scaled = (total_penalty / 4.0).min(10.0);
    (10.0 - penalty_scaled).max(0.0) as u8
}

/// Group raw matches into deduplicated [`Finding`]s (C7), applying the
/// evidence-completeness auto-downgrade and coverage-driven confidence
/// downgrade along the way.
///
/// `coverage_incomplete` mirrors the orchestrator's
/// `CoverageSummary::incomplete` flag: when the scan under-covered the
/// repository, every surviving finding's confidence is downgraded by one
/// tier, since the absence of a contradicting instance elsewhere in the
/// repo carries less weight.
pub fn group_and_score(matches: Vec<FindingMatch>, coverage_incomplete: bool) -> Vec<Finding> {
    let mut groups: HashMap<String, Vec<FindingMatch>> = HashMap::new();
    for m in matches {
        groups.entry(dedupe_key(&m)).or_default().push(m);
    }

    let mut findings: Vec<Finding> = groups
        .into_iter()
        .map(|(key, group)| build_finding(key, group, coverage_incomplete))
        .collect();

    findings.sort_by(|a, b| risk_rank(&b.severity, &b.confidence).cmp(&risk_rank(&a.severity, &a.confidence)));
    findings
}

fn build_finding(dedupe_key: String, group: Vec<FindingMatch>, coverage_incomplete: bool) -> Finding {
    let head = &group[0];
    let rule_id = head.rule_id.clone();
    let category = head.category.clone();
    let title = head.title.clone();
    let description = head.description.clone();
    let remediation_summary = head.remediation_summary.clone();
    let mut tags = head.tags.clone();
    tags.sort();
    tags.dedup();

    let any_incomplete = group.iter().any(|m| !m.has_complete_evidence());
    let mut severity = group.iter().map(|m| m.proposed_severity).max().unwrap_or(Severity::Info);
    let mut confidence = group.iter().map(|m| m.proposed_confidence).max().unwrap_or(Confidence::Unknown);

    if any_incomplete {
        severity = Severity::Info;
        confidence = confidence.downgrade();
    }
    if coverage_incomplete {
        confidence = confidence.downgrade();
    }

    let impact = score_impact(head);
    let likelihood = score_exploitability(head);

    let mut builder = EvidenceBuilder::new();
    let instances = group
        .into_iter()
        .filter_map(|m| {
            let snippet = m.snippet?;
            let evidence = builder.build(&m.file_path, m.start_line, m.end_line, &snippet, &m.context_before, &m.context_after);
            Some(FindingInstance {
                evidence,
                symbol_qname: m.symbol_qname,
                trace: Vec::new(),
                rule_trigger_reason: m.rule_trigger_reason,
            })
        })
        .collect();

    Finding {
        rule_id,
        category,
        title,
        description,
        severity,
        confidence,
        impact,
        likelihood,
        tags,
        dedupe_key,
        remediation_summary,
        instances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_match() -> FindingMatch {
        FindingMatch {
            rule_id: "SEC_API_KEY".to_string(),
            category: "security".to_string(),
            file_path: "src/config.py".to_string(),
            start_line: 10,
            end_line: 10,
            rule_trigger_reason: "matched hardcoded API key pattern".to_string(),
            snippet: Some("API_KEY = \"sk-aaaaaaaaaaaaaaaaaaaaaa\"".to_string()),
            context_before: vec![],
            context_after: vec![],
            symbol_qname: Some("load_config".to_string()),
            proposed_severity: Severity::Critical,
            proposed_confidence: Confidence::High,
            normalized_sink: None,
            normalized_source: None,
            title: "Hardcoded API key".to_string(),
            description: "desc".to_string(),
            remediation_summary: "use env vars".to_string(),
            tags: vec!["secret".to_string()],
            diff_lines: None,
        }
    }

    #[test]
    fn dedupe_key_is_stable_and_sensitive_to_dir() {
        let a = base_match();
        let mut b = base_match();
        b.file_path = "other/config.py".to_string();
        assert_eq!(dedupe_key(&a), dedupe_key(&a));
        assert_ne!(dedupe_key(&a), dedupe_key(&b));
    }

    #[test]
    fn incomplete_evidence_downgrades_to_info() {
        let mut m = base_match();
        m.snippet = None;
        assert!(!m.has_complete_evidence());
        let findings = group_and_score(vec![m], false);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].confidence, Confidence::Medium);
    }

    #[test]
    fn complete_evidence_keeps_proposed_severity() {
        let m = base_match();
        assert!(m.has_complete_evidence());
        let findings = group_and_score(vec![m], false);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].confidence, Confidence::High);
    }

    #[test]
    fn incomplete_coverage_downgrades_confidence_once_more() {
        let m = base_match();
        let findings = group_and_score(vec![m], true);
        assert_eq!(findings[0].confidence, Confidence::Medium);
    }

    #[test]
    fn duplicate_matches_in_same_dedupe_group_collapse_into_one_finding_with_two_instances() {
        let a = base_match();
        let b = base_match();
        let findings = group_and_score(vec![a, b], false);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].instances.len(), 2);
    }

    #[test]
    fn health_score_drops_as_severity_rises() {
        let clean = health_score(&[]);
        assert_eq!(clean, 10);
        let m = base_match();
        let findings = group_and_score(vec![m], false);
        assert!(health_score(&findings) < 10);
    }

    #[test]
    fn severity_rank_orders_critical_highest() {
        assert!(severity_rank(&Severity::Critical) > severity_rank(&Severity::High));
        assert!(severity_rank(&Severity::Info) == 0);
    }
}

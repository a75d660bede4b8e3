//! Local artifact writer: JSON + Markdown rendering of scan and answer
//! results, for CLI and test consumption.
//!
//! Grounded on the teacher's `ArtifactWriter` in `hqe-artifacts/src/lib.rs`
//! — the same `ensure_dir`/`#[instrument]`-per-write-method/
//! `ArtifactPaths`-returning `write_all` shape. The content is new: the
//! teacher wrote an `HqeReport` with PR-harvest/TODO-backlog/
//! implementation-plan/session-log sections that have no counterpart
//! here (removed rather than generalized); this crate instead renders a
//! `ScanRun` + its `Finding`s + `CoverageSummary` + control results, and
//! separately an `Answer`.

#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use veritas_core::{Answer, CoverageSummary, Finding, ScanRun};

/// Artifact writer: saves scan and answer results to disk under one
/// output directory.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create a new artifact writer for the given output directory.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self { output_dir: output_dir.as_ref().to_path_buf() }
    }

    fn ensure_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Write the scan run record as JSON.
    #[instrument(skip(self, run))]
    pub async fn write_scan_run_json(&self, run: &ScanRun) -> anyhow::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.output_dir.join("scan-run.json");
        let json = serde_json::to_string_pretty(run)?;
        tokio::fs::write(&path, json).await?;
        info!("Wrote scan run: {}", path.display());
        Ok(path)
    }

    /// Write the deduplicated findings as JSON.
    #[instrument(skip(self, findings))]
    pub async fn write_findings_json(&self, findings: &[Finding]) -> anyhow::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.output_dir.join("findings.json");
        let json = serde_json::to_string_pretty(findings)?;
        tokio::fs::write(&path, json).await?;
        info!("Wrote {} finding(s): {}", findings.len(), path.display());
        Ok(path)
    }

    /// Write the coverage summary as JSON.
    #[instrument(skip(self, summary))]
    pub async fn write_coverage_json(&self, summary: &CoverageSummary) -> anyhow::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.output_dir.join("coverage.json");
        let json = serde_json::to_string_pretty(summary)?;
        tokio::fs::write(&path, json).await?;
        info!("Wrote coverage summary: {}", path.display());
        Ok(path)
    }

    /// Write a proof-carrying answer as JSON.
    #[instrument(skip(self, answer))]
    pub async fn write_answer_json(&self, answer: &Answer) -> anyhow::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.output_dir.join("answer.json");
        let json = serde_json::to_string_pretty(answer)?;
        tokio::fs::write(&path, json).await?;
        info!("Wrote answer: {}", path.display());
        Ok(path)
    }

    /// Write a human-readable Markdown scan report.
    #[instrument(skip(self, run, findings, coverage, control_results))]
    pub async fn write_scan_report_md(&self, run: &ScanRun, findings: &[Finding], coverage: &CoverageSummary, control_results: &[(String, bool)]) -> anyhow::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.output_dir.join("report.md");
        let md = render_markdown(run, findings, coverage, control_results);
        tokio::fs::write(&path, md).await?;
        info!("Wrote Markdown report: {}", path.display());
        Ok(path)
    }

    /// Write every scan artifact (run, findings, coverage, Markdown
    /// report).
    pub async fn write_all(&self, run: &ScanRun, findings: &[Finding], coverage: &CoverageSummary, control_results: &[(String, bool)]) -> anyhow::Result<ArtifactPaths> {
        let scan_run_json = self.write_scan_run_json(run).await?;
        let findings_json = self.write_findings_json(findings).await?;
        let coverage_json = self.write_coverage_json(coverage).await?;
        let report_md = self.write_scan_report_md(run, findings, coverage, control_results).await?;

        Ok(ArtifactPaths { scan_run_json, findings_json, coverage_json, report_md })
    }
}

fn render_markdown(run: &ScanRun, findings: &[Finding], coverage: &CoverageSummary, control_results: &[(String, bool)]) -> String {
    let mut md = String::new();

    md.push_str("# Veritas Scan Report\n\n");
    md.push_str(&format!("Run ID: `{}`\n\n", run.id));
    md.push_str(&format!("Commit: `{}`\n\n", run.commit_sha));
    md.push_str(&format!("Status: `{:?}`\n\n", run.status));

    let health_score = veritas_analyze::repository_health_score(findings);
    md.push_str(&format!("**Health Score:** {health_score}/10\n\n"));

    md.push_str("## Coverage\n\n");
    md.push_str(&format!(
        "Discovered {} file(s), parsed {} ({:.1}%)\n\n",
        coverage.total_discovered, coverage.total_parsed, coverage.coverage_percent
    ));
    if coverage.incomplete {
        md.push_str("> Coverage is below the completeness threshold; confidence has been downgraded accordingly.\n\n");
    }
    if !coverage.degraded_flags.is_empty() {
        md.push_str(&format!("Degraded flags: {}\n\n", coverage.degraded_flags.join(", ")));
    }

    if !control_results.is_empty() {
        md.push_str("## Controls\n\n");
        md.push_str("| Category | Status |\n|----------|--------|\n");
        for (category, passed) in control_results {
            md.push_str(&format!("| {} | {} |\n", category, if *passed { "pass" } else { "fail" }));
        }
        md.push('\n');
    }

    md.push_str("## Findings\n\n");
    if findings.is_empty() {
        md.push_str("No findings.\n\n");
    } else {
        for finding in findings {
            md.push_str(&format!("### {}: {}\n\n", finding.rule_id, finding.title));
            md.push_str(&format!("- **Category:** {}\n", finding.category));
            md.push_str(&format!("- **Severity:** {}\n", finding.severity));
            md.push_str(&format!("- **Confidence:** {}\n", finding.confidence));
            md.push_str(&format!("- **Remediation:** {}\n", finding.remediation_summary));
            md.push_str(&format!("- **Instances:** {}\n\n", finding.instances.len()));
            for instance in &finding.instances {
                md.push_str(&format!(
                    "  - `{}:{}-{}`\n",
                    instance.evidence.file_path, instance.evidence.start_line, instance.evidence.end_line
                ));
                md.push_str(&format!("    ```\n    {}\n    ```\n", instance.evidence.snippet_text));
            }
            md.push('\n');
        }
    }

    md
}

/// Paths to generated scan artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// Path to scan-run.json
    pub scan_run_json: PathBuf,
    /// Path to findings.json
    pub findings_json: PathBuf,
    /// Path to coverage.json
    pub coverage_json: PathBuf,
    /// Path to report.md
    pub report_md: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use veritas_core::{Confidence, ScanRunStatus, Severity};

    fn sample_run() -> ScanRun {
        ScanRun {
            id: "scan-1".to_string(),
            repo_id: "repo-1".to_string(),
            commit_sha: "abc123".to_string(),
            config_hash: "hash".to_string(),
            status: ScanRunStatus::Completed,
            degraded_reasons: vec![],
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
        }
    }

    fn sample_finding() -> Finding {
        Finding {
            rule_id: "SEC_HARDCODED_SECRET".to_string(),
            category: "security".to_string(),
            title: "Hardcoded secret".to_string(),
            description: "A secret literal was found in source.".to_string(),
            severity: Severity::High,
            confidence: Confidence::High,
            impact: Default::default(),
            likelihood: Default::default(),
            tags: vec!["security".to_string()],
            dedupe_key: "key".to_string(),
            remediation_summary: "Move the secret to a secrets manager.".to_string(),
            instances: vec![],
        }
    }

    #[tokio::test]
    async fn write_all_produces_every_artifact() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let writer = ArtifactWriter::new(temp.path());

        let run = sample_run();
        let findings = vec![sample_finding()];
        let coverage = CoverageSummary::default();
        let controls = vec![("security".to_string(), false)];

        let paths = writer.write_all(&run, &findings, &coverage, &controls).await?;

        assert!(paths.scan_run_json.exists());
        assert!(paths.findings_json.exists());
        assert!(paths.coverage_json.exists());
        assert!(paths.report_md.exists());

        let md = tokio::fs::read_to_string(&paths.report_md).await?;
        assert!(md.contains("Veritas Scan Report"));
        assert!(md.contains("SEC_HARDCODED_SECRET"));
        assert!(md.contains("| security | fail |"));
        Ok(())
    }

    #[tokio::test]
    async fn write_answer_json_roundtrips() -> anyhow::Result<()> {
        use veritas_core::{ConfidenceFactors, ConfidenceTier};

        let temp = TempDir::new()?;
        let writer = ArtifactWriter::new(temp.path());

        let answer = Answer {
            repo_id: "repo-1".to_string(),
            question: "What does main do?".to_string(),
            answer_sections: vec![],
            unknowns: vec![],
            confidence_tier: ConfidenceTier::Medium,
            confidence_factors: ConfidenceFactors::default(),
            validation_passed: true,
            validation_errors: vec![],
            citations: vec![],
        };

        let path = writer.write_answer_json(&answer).await?;
        let content = tokio::fs::read_to_string(&path).await?;
        assert!(content.contains("What does main do?"));
        Ok(())
    }
}

//! Proof-carrying Answer Engine (C10, §4.10): prompt composition, a
//! JSON ingestion ladder, per-quote verification, and confidence
//! tiering.
//!
//! The JSON ladder's balanced-brace scanner is grounded on the
//! teacher's `extract_json_object`/`extract_fenced_json` in the
//! now-removed `hqe-openai/src/analysis.rs`, generalized from
//! first-complete-object to greedy-largest-object per the spec, with
//! a `repair_json` step and a truncation-walk step the teacher never
//! had (its analyzer only ever saw complete, well-formed responses).

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::Deserialize;
use veritas_core::{Answer, AnswerSection, Citation, ConfidenceFactors, ConfidenceTier, QuotedSpan};
use veritas_retrieval::RetrievedSource;

use crate::prompts::sanitize_for_prompt;
use crate::LLM;

const ANSWER_SYSTEM_PROMPT: &str = r#"You answer questions about a codebase using only the numbered sources provided below. You never invent evidence.

For every claim you make, cite the source_ids it came from and include one or more quoted_spans that are VERBATIM substrings of the referenced source's content. If you cannot support a claim with a verbatim quote, say so in "unknowns" instead of asserting it.

Return ONLY a single JSON object. No markdown fences, no commentary before or after it."#;

const ANSWER_JSON_SCHEMA: &str = r#"
# Response schema

Return exactly this shape:
{
  "sections": [
    {
      "text": "one paragraph of prose answering part of the question",
      "source_ids": [1, 2],
      "quoted_spans": [
        {"quote": "verbatim substring of Source 1's content", "source_index": 1}
      ]
    }
  ],
  "unknowns": ["claims you could not substantiate from the sources"]
}
"#;

/// Compose the Answer Engine's prompt: the question, the numbered
/// sources as `[Source i] path:s-e` + fenced snippet, and the JSON
/// schema. Returns `(system, user)`.
pub fn build_answer_prompt(question: &str, sources: &[RetrievedSource]) -> (String, String) {
    let mut user = format!("# Question\n\n{}\n\n# Sources\n\n", sanitize_for_prompt(question));
    for source in sources {
        user.push_str(&format!(
            "[Source {}] {}:{}-{}\n```\n{}\n```\n\n",
            source.source_index,
            source.file_path,
            source.start_line,
            source.end_line,
            sanitize_for_prompt(source.content.as_deref().unwrap_or(""))
        ));
    }
    user.push_str(ANSWER_JSON_SCHEMA);
    (ANSWER_SYSTEM_PROMPT.to_string(), user)
}

#[derive(Debug, Deserialize)]
struct RawQuotedSpan {
    quote: String,
    source_index: usize,
}

#[derive(Debug, Deserialize, Default)]
struct RawSection {
    text: String,
    #[serde(default)]
    source_ids: Vec<usize>,
    #[serde(default)]
    quoted_spans: Vec<RawQuotedSpan>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAnswerPayload {
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    unknowns: Vec<String>,
}

fn extract_fenced(input: &str) -> Option<String> {
    for fence in ["```json", "```"] {
        if let Some(start) = input.find(fence) {
            let after = &input[start + fence.len()..];
            if let Some(end) = after.find("```") {
                let candidate = after[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }
    None
}

/// Every balanced top-level `{...}` substring in `input`, in order of
/// appearance, string/escape aware.
fn balanced_objects(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut depth = 0usize;
    let mut start_idx: Option<usize> = None;

    for (idx, ch) in input.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start_idx = Some(idx);
                }
                depth = depth.saturating_add(1);
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(start) = start_idx {
                            out.push(input[start..=idx].to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn greedy_largest_object(input: &str) -> Option<String> {
    balanced_objects(input).into_iter().max_by_key(|s| s.len())
}

fn repair_json(input: &str) -> String {
    let no_control: String = input.chars().filter(|c| !c.is_control() || matches!(c, '\n' | '\t')).collect();

    let trailing_comma = Regex::new(r",(\s*[}\]])").expect("static regex");
    let stripped = trailing_comma.replace_all(&no_control, "$1").to_string();

    let bare_key = Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)"#).expect("static regex");
    let quoted_keys = bare_key.replace_all(&stripped, r#"$1"$2"$3"#).to_string();

    if quoted_keys.contains('\'') && !quoted_keys.contains('"') {
        quoted_keys.replace('\'', "\"")
    } else {
        quoted_keys
    }
}

/// Walk `input` looking for the last balanced `{...}`; if the only
/// top-level object is truncated mid-stream (never reaches `depth ==
/// 0`), close out the remaining depth by hand.
fn truncated_balanced(input: &str) -> Option<String> {
    let mut in_string = false;
    let mut escape = false;
    let mut depth = 0usize;
    let mut start_idx: Option<usize> = None;
    let mut last_end: Option<usize> = None;

    for (idx, ch) in input.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start_idx = Some(idx);
                }
                depth = depth.saturating_add(1);
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        last_end = Some(idx);
                    }
                }
            }
            _ => {}
        }
    }

    let start = start_idx?;
    if depth == 0 {
        return last_end.map(|end| input[start..=end].to_string());
    }

    let mut candidate = input[start..].trim_end().to_string();
    while candidate.ends_with(',') || candidate.ends_with(':') {
        candidate.pop();
    }
    for _ in 0..depth {
        candidate.push('}');
    }
    Some(candidate)
}

/// Run the JSON ingestion ladder (§4.10): direct parse, fenced-markdown
/// parse, greedy largest-object parse, `repair_json`, then a
/// last-balanced-object truncation walk. Returns `None` if every step
/// fails.
fn ingest_json(text: &str) -> Option<RawAnswerPayload> {
    let direct = text.trim();
    if let Ok(payload) = serde_json::from_str(direct) {
        return Some(payload);
    }

    if let Some(fenced) = extract_fenced(text) {
        if let Ok(payload) = serde_json::from_str(&fenced) {
            return Some(payload);
        }
    }

    let greedy = greedy_largest_object(text);
    if let Some(candidate) = &greedy {
        if let Ok(payload) = serde_json::from_str(candidate) {
            return Some(payload);
        }
    }

    let repair_base = extract_fenced(text).or(greedy.clone()).unwrap_or_else(|| direct.to_string());
    let repaired = repair_json(&repair_base);
    if let Ok(payload) = serde_json::from_str(&repaired) {
        return Some(payload);
    }

    if let Some(truncated) = truncated_balanced(&repaired).or_else(|| truncated_balanced(text)) {
        if let Ok(payload) = serde_json::from_str(&truncated) {
            return Some(payload);
        }
    }

    None
}

/// Matching strategy (ordered, first success wins): exact;
/// whitespace-normalized; case-insensitive; line-wise containment of
/// all non-empty lines; for spans of <= 3 tokens, all-tokens-present
/// set match.
fn verify_quote(quote: &str, source_content: &str) -> bool {
    if quote.is_empty() {
        return false;
    }
    if source_content.contains(quote) {
        return true;
    }

    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalize(source_content).contains(&normalize(quote)) {
        return true;
    }

    if source_content.to_lowercase().contains(&quote.to_lowercase()) {
        return true;
    }

    let quote_lines: Vec<&str> = quote.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if !quote_lines.is_empty() && quote_lines.iter().all(|line| source_content.contains(line)) {
        return true;
    }

    let tokens: Vec<&str> = quote.split_whitespace().collect();
    if !tokens.is_empty() && tokens.len() <= 3 {
        let lower_source = source_content.to_lowercase();
        if tokens.iter().all(|t| lower_source.contains(&t.to_lowercase())) {
            return true;
        }
    }

    false
}

fn confidence_tier(f: &ConfidenceFactors) -> ConfidenceTier {
    if f.verified_quotes == 0 {
        return ConfidenceTier::None;
    }
    let ratio = f.verified_quotes as f64 / f.total_quotes.max(1) as f64;

    if f.total_quotes > 0 && ratio < 0.5 {
        return ConfidenceTier::Low;
    }
    if f.sections_with_verified_quote >= 2 && f.unique_files >= 2 && ratio >= 0.75 && f.avg_retrieval_score >= 0.5 {
        return ConfidenceTier::High;
    }
    if ratio >= 0.5 && f.sections_with_verified_quote >= 1 && f.avg_retrieval_score >= 0.3 {
        return ConfidenceTier::Medium;
    }
    ConfidenceTier::Low
}

fn truncate_for_error(text: &str) -> String {
    text.chars().take(80).collect()
}

fn citation_for(source: &RetrievedSource) -> Citation {
    Citation {
        source_index: source.source_index,
        file_path: source.file_path.clone(),
        start_line: source.start_line,
        end_line: source.end_line,
        snippet: source.content.clone().unwrap_or_default(),
        symbol_name: source.symbol_name.clone(),
        github_url: None,
    }
}

fn build_answer(repo_id: &str, question: &str, payload: RawAnswerPayload, sources: &[RetrievedSource]) -> Answer {
    let source_by_index: HashMap<usize, &RetrievedSource> = sources.iter().map(|s| (s.source_index, s)).collect();

    let mut answer_sections = Vec::new();
    let mut validation_errors = Vec::new();
    let mut cited_indices: HashSet<usize> = HashSet::new();

    for raw in payload.sections {
        if raw.quoted_spans.is_empty() {
            cited_indices.extend(raw.source_ids.iter().copied());
            answer_sections.push(AnswerSection { text: raw.text, source_ids: raw.source_ids, quoted_spans: Vec::new(), unverified: true });
            continue;
        }

        let mut quoted_spans = Vec::new();
        let mut any_verified = false;
        for span in raw.quoted_spans {
            let verified = source_by_index
                .get(&span.source_index)
                .and_then(|s| s.content.as_deref())
                .is_some_and(|content| verify_quote(&span.quote, content));
            any_verified |= verified;
            quoted_spans.push(QuotedSpan { quote: span.quote, source_index: span.source_index, verified });
        }

        if any_verified {
            cited_indices.extend(raw.source_ids.iter().copied());
            cited_indices.extend(quoted_spans.iter().map(|q| q.source_index));
            answer_sections.push(AnswerSection { text: raw.text, source_ids: raw.source_ids, quoted_spans, unverified: false });
        } else {
            validation_errors.push(format!("section rejected, no verified quotes: \"{}\"", truncate_for_error(&raw.text)));
        }
    }

    let verified_quotes = answer_sections.iter().flat_map(|s| &s.quoted_spans).filter(|q| q.verified).count();
    let total_quotes = answer_sections.iter().map(|s| s.quoted_spans.len()).sum();
    let sections_with_verified_quote = answer_sections.iter().filter(|s| s.quoted_spans.iter().any(|q| q.verified)).count();
    let unique_files = cited_indices
        .iter()
        .filter_map(|i| source_by_index.get(i))
        .map(|s| s.file_path.as_str())
        .collect::<HashSet<_>>()
        .len();
    let avg_retrieval_score = {
        let scores: Vec<f64> = cited_indices.iter().filter_map(|i| source_by_index.get(i)).map(|s| s.score as f64).collect();
        if scores.is_empty() { 0.0 } else { scores.iter().sum::<f64>() / scores.len() as f64 }
    };

    let factors = ConfidenceFactors { verified_quotes, total_quotes, sections_with_verified_quote, unique_files, avg_retrieval_score };
    let tier = confidence_tier(&factors);

    let mut citations: Vec<Citation> = cited_indices.iter().filter_map(|i| source_by_index.get(i)).map(|s| citation_for(s)).collect();
    citations.sort_by_key(|c| c.source_index);

    Answer {
        repo_id: repo_id.to_string(),
        question: question.to_string(),
        answer_sections,
        unknowns: payload.unknowns,
        confidence_tier: tier,
        confidence_factors: factors,
        validation_passed: validation_errors.is_empty(),
        validation_errors,
        citations,
    }
}

fn degraded_answer(repo_id: &str, question: &str, sources: &[RetrievedSource], reason: &str) -> Answer {
    let citations = sources.iter().take(3).map(citation_for).collect();
    Answer {
        repo_id: repo_id.to_string(),
        question: question.to_string(),
        answer_sections: Vec::new(),
        unknowns: vec!["the answer engine could not produce a verified answer; see cited sources".to_string()],
        confidence_tier: ConfidenceTier::None,
        confidence_factors: ConfidenceFactors::default(),
        validation_passed: false,
        validation_errors: vec![reason.to_string()],
        citations,
    }
}

/// Run the full Answer Engine (§4.10) over already-retrieved,
/// snippet-filled `sources`: compose the prompt, call `llm` (retrying
/// once with reinforced instructions on transport error or failed JSON
/// ingestion), verify every quoted span, and score confidence. Falls
/// back to a degraded evidence-only [`Answer`] if both attempts fail.
pub async fn generate_answer(llm: &dyn LLM, repo_id: &str, question: &str, sources: &[RetrievedSource]) -> Answer {
    let (system, user) = build_answer_prompt(question, sources);

    let first = llm.complete_json(&system, &user).await.ok().and_then(|text| ingest_json(&text));
    if let Some(payload) = first {
        return build_answer(repo_id, question, payload, sources);
    }

    let reinforced_system = format!(
        "{system}\n\nYour previous response could not be parsed. Return ONLY one JSON object matching the schema, with no markdown fences, no commentary, and no trailing text."
    );
    let second = llm.complete_json(&reinforced_system, &user).await.ok().and_then(|text| ingest_json(&text));
    match second {
        Some(payload) => build_answer(repo_id, question, payload, sources),
        None => degraded_answer(repo_id, question, sources, "LLM response could not be parsed as JSON after one retry"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(index: usize, file: &str, content: &str, score: f32) -> RetrievedSource {
        RetrievedSource {
            source_index: index,
            file_path: file.to_string(),
            start_line: 1,
            end_line: 10,
            score,
            symbol_name: None,
            content: Some(content.to_string()),
        }
    }

    #[test]
    fn ingest_direct_json() {
        let text = r#"{"sections": [], "unknowns": []}"#;
        assert!(ingest_json(text).is_some());
    }

    #[test]
    fn ingest_fenced_json() {
        let text = "Sure, here it is:\n```json\n{\"sections\": [], \"unknowns\": []}\n```\nHope that helps.";
        assert!(ingest_json(text).is_some());
    }

    #[test]
    fn ingest_greedy_largest_object() {
        let text = r#"noise {"a": 1} then the real one {"sections": [], "unknowns": ["x"]} trailing"#;
        let payload = ingest_json(text).unwrap();
        assert_eq!(payload.unknowns, vec!["x".to_string()]);
    }

    #[test]
    fn ingest_repairs_trailing_comma_and_bare_keys() {
        let text = r#"{sections: [], unknowns: ["x"],}"#;
        let payload = ingest_json(text).unwrap();
        assert_eq!(payload.unknowns, vec!["x".to_string()]);
    }

    #[test]
    fn ingest_walks_truncated_object_missing_closing_brace() {
        let text = r#"{"sections": [], "unknowns": ["ok"]"#;
        let payload = ingest_json(text).expect("truncation walk should repair a missing closing brace");
        assert_eq!(payload.unknowns, vec!["ok".to_string()]);
    }

    #[test]
    fn ingest_all_steps_fail_on_garbage() {
        assert!(ingest_json("not json at all, just prose").is_none());
    }

    #[test]
    fn verify_quote_exact_match() {
        assert!(verify_quote("fn main()", "pub fn main() {}"));
    }

    #[test]
    fn verify_quote_whitespace_normalized() {
        assert!(verify_quote("fn   main( )", "pub fn main( ) {}"));
    }

    #[test]
    fn verify_quote_case_insensitive() {
        assert!(verify_quote("FN MAIN", "fn main() {}"));
    }

    #[test]
    fn verify_quote_line_wise_containment() {
        let source = "line one\nline two\nline three";
        assert!(verify_quote("line one\nline three", source));
    }

    #[test]
    fn verify_quote_short_token_set_match() {
        assert!(verify_quote("foo bar", "... bar stuff foo ..."));
    }

    #[test]
    fn verify_quote_fails_when_absent() {
        assert!(!verify_quote("totally absent phrase", "nothing related here"));
    }

    #[test]
    fn confidence_tier_none_when_zero_verified() {
        let f = ConfidenceFactors { verified_quotes: 0, total_quotes: 3, sections_with_verified_quote: 0, unique_files: 1, avg_retrieval_score: 0.9 };
        assert_eq!(confidence_tier(&f), ConfidenceTier::None);
    }

    #[test]
    fn confidence_tier_high_requires_all_four_conditions() {
        let f = ConfidenceFactors { verified_quotes: 3, total_quotes: 4, sections_with_verified_quote: 2, unique_files: 2, avg_retrieval_score: 0.6 };
        assert_eq!(confidence_tier(&f), ConfidenceTier::High);
    }

    #[test]
    fn confidence_tier_medium_when_ratio_ok_but_not_high() {
        let f = ConfidenceFactors { verified_quotes: 2, total_quotes: 3, sections_with_verified_quote: 1, unique_files: 1, avg_retrieval_score: 0.4 };
        assert_eq!(confidence_tier(&f), ConfidenceTier::Medium);
    }

    #[test]
    fn confidence_tier_low_when_ratio_below_half() {
        let f = ConfidenceFactors { verified_quotes: 1, total_quotes: 3, sections_with_verified_quote: 1, unique_files: 1, avg_retrieval_score: 0.9 };
        assert_eq!(confidence_tier(&f), ConfidenceTier::Low);
    }

    #[test]
    fn build_answer_accepts_unverified_no_quote_section() {
        let sources = vec![source(1, "a.py", "def foo(): pass", 0.5)];
        let payload = RawAnswerPayload {
            sections: vec![RawSection { text: "general description".to_string(), source_ids: vec![1], quoted_spans: vec![] }],
            unknowns: vec![],
        };
        let answer = build_answer("repo1", "what does this do", payload, &sources);
        assert_eq!(answer.answer_sections.len(), 1);
        assert!(answer.answer_sections[0].unverified);
        assert_eq!(answer.confidence_tier, ConfidenceTier::None);
    }

    #[test]
    fn build_answer_rejects_section_with_all_failed_quotes() {
        let sources = vec![source(1, "a.py", "def foo(): pass", 0.5)];
        let payload = RawAnswerPayload {
            sections: vec![RawSection {
                text: "fabricated claim".to_string(),
                source_ids: vec![1],
                quoted_spans: vec![RawQuotedSpan { quote: "this text does not exist anywhere".to_string(), source_index: 1 }],
            }],
            unknowns: vec![],
        };
        let answer = build_answer("repo1", "q", payload, &sources);
        assert!(answer.answer_sections.is_empty());
        assert_eq!(answer.validation_errors.len(), 1);
        assert!(!answer.validation_passed);
    }

    #[test]
    fn build_answer_keeps_section_with_one_verified_quote() {
        let sources = vec![source(1, "a.py", "def foo(): pass", 0.6), source(2, "b.py", "def bar(): pass", 0.4)];
        let payload = RawAnswerPayload {
            sections: vec![RawSection {
                text: "foo is a no-op function".to_string(),
                source_ids: vec![1],
                quoted_spans: vec![RawQuotedSpan { quote: "def foo(): pass".to_string(), source_index: 1 }],
            }],
            unknowns: vec![],
        };
        let answer = build_answer("repo1", "q", payload, &sources);
        assert_eq!(answer.answer_sections.len(), 1);
        assert!(answer.answer_sections[0].quoted_spans[0].verified);
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].file_path, "a.py");
    }

    #[test]
    fn degraded_answer_cites_top_three_sources_only() {
        let sources: Vec<RetrievedSource> = (1..=5).map(|i| source(i, "a.py", "content", 0.5)).collect();
        let answer = degraded_answer("repo1", "q", &sources, "test reason");
        assert_eq!(answer.citations.len(), 3);
        assert_eq!(answer.confidence_tier, ConfidenceTier::None);
        assert!(!answer.validation_passed);
    }
}

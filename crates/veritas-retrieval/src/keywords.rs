//! Code-aware keyword extractor (glossary).
//!
//! From a free-text query, preserves as first-class tokens: file paths
//! matching `*.ext`, qualified names joined by `.`, `::`, or `\`, dunder
//! identifiers `__x__`, ALLCAPS (≥2 chars), and tokens containing
//! digits; then emits split parts of camelCase and snake_case alongside
//! the originals. Stopwords are removed. Result sorted by length desc,
//! capped at 10.

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "has", "have", "how", "i", "in", "is",
    "it", "of", "on", "or", "that", "the", "this", "to", "was", "we", "what", "when", "where", "which", "who", "why", "will",
    "with", "you",
];

const MAX_KEYWORDS: usize = 10;

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token.to_lowercase().as_str())
}

fn looks_like_file_path(token: &str) -> bool {
    token.contains('.') && token.rsplit('.').next().is_some_and(|ext| !ext.is_empty() && ext.chars().all(char::is_alphanumeric))
}

fn looks_like_qualified_name(token: &str) -> bool {
    token.contains("::") || token.contains('\\') || (token.contains('.') && !looks_like_file_path(token))
}

fn is_dunder(token: &str) -> bool {
    token.starts_with("__") && token.ends_with("__") && token.len() > 4
}

fn is_allcaps(token: &str) -> bool {
    token.len() >= 2 && token.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

fn contains_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

fn split_camel_case(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in token.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn split_snake_case(token: &str) -> Vec<String> {
    token.split('_').filter(|p| !p.is_empty()).map(String::from).collect()
}

/// Extract keywords from `query`, preserving code-specific tokens and
/// splitting identifier-cased ones, capped at 10, sorted by length
/// descending.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    let mut push = |token: &str, seen: &mut HashSet<String>, keywords: &mut Vec<String>| {
        let token = token.trim_matches(|c: char| c.is_ascii_punctuation() && c != '_' && c != '.' && c != ':');
        if token.is_empty() || is_stopword(token) {
            return;
        }
        if seen.insert(token.to_string()) {
            keywords.push(token.to_string());
        }
    };

    for raw in query.split_whitespace() {
        let token = raw.trim_matches(|c: char| matches!(c, '?' | '!' | ',' | ';' | '"' | '\''));
        if token.is_empty() {
            continue;
        }

        if looks_like_file_path(token) || looks_like_qualified_name(token) || is_dunder(token) || is_allcaps(token) || contains_digit(token)
        {
            push(token, &mut seen, &mut keywords);
            continue;
        }

        push(token, &mut seen, &mut keywords);
        for part in split_camel_case(token) {
            push(&part, &mut seen, &mut keywords);
        }
        for part in split_snake_case(token) {
            push(&part, &mut seen, &mut keywords);
        }
    }

    keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_file_paths() {
        let keywords = extract_keywords("where is parser.rs defined");
        assert!(keywords.contains(&"parser.rs".to_string()));
    }

    #[test]
    fn preserves_qualified_names() {
        let keywords = extract_keywords("what does std::collections::HashMap do");
        assert!(keywords.contains(&"std::collections::HashMap".to_string()));
    }

    #[test]
    fn splits_camel_case_and_keeps_original() {
        let keywords = extract_keywords("how does parseJsonObject work");
        assert!(keywords.contains(&"parseJsonObject".to_string()));
        assert!(keywords.contains(&"Json".to_string()));
    }

    #[test]
    fn splits_snake_case_and_keeps_original() {
        let keywords = extract_keywords("explain extract_json_object please");
        assert!(keywords.contains(&"extract_json_object".to_string()));
        assert!(keywords.contains(&"json".to_string()));
    }

    #[test]
    fn removes_stopwords() {
        let keywords = extract_keywords("what is the main function");
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"is".to_string()));
    }

    #[test]
    fn preserves_dunder_identifiers() {
        let keywords = extract_keywords("what does __init__ do here");
        assert!(keywords.contains(&"__init__".to_string()));
    }

    #[test]
    fn caps_at_ten_keywords_sorted_by_length_desc() {
        let query = "aaaaaaaaaa bbbbbbbbb cccccccc ddddddd eeeeee fffff gggg hhh ii j kkkkkkkkkkkk";
        let keywords = extract_keywords(query);
        assert_eq!(keywords.len(), 10);
        assert_eq!(keywords[0], "kkkkkkkkkkkk");
    }
}

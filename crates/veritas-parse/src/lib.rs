//! Parser (C3, §4.3): AST-based symbol/import/call extraction, with a
//! regex-based fallback for languages without a first-class parser path.
//!
//! Python is parsed via [`rustpython_parser`] and Rust via [`syn`] — both
//! first-class AST paths. Everything else falls back to
//! [`fallback::parse_fallback`], whose output can never populate
//! [`veritas_core::Symbol::body`] (enforced at the type level by
//! [`veritas_core::Symbol::fallback`] taking no body parameter at all).

#![warn(missing_docs)]

mod fallback;
mod python;
mod rust_lang;

use thiserror::Error;
use veritas_core::{CallEdge, Import, Symbol};

/// Errors produced while parsing a single file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The parser's own syntax error, carrying the underlying message
    #[error("syntax error: {0}")]
    Syntax(String),

    /// No parser is registered for this language
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Output of parsing one file.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Symbols discovered in the file
    pub symbols: Vec<Symbol>,
    /// Import statements discovered in the file
    pub imports: Vec<Import>,
    /// Call sites discovered in the file
    pub calls: Vec<CallEdge>,
    /// Non-fatal parse errors (e.g. a single malformed nested block)
    pub errors: Vec<String>,
}

/// Language a file was classified as, for parser dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Python — parsed via the first-class `rustpython-parser` AST path
    Python,
    /// Rust — parsed via the first-class `syn` AST path
    Rust,
    /// Any other language with a registered extension, parsed via regex fallback
    Other,
}

/// Classify `file_path` by extension into a [`Language`] and its display name.
pub fn classify_language(file_path: &str) -> (Language, &'static str) {
    let lower = file_path.to_lowercase();
    if lower.ends_with(".py") || lower.ends_with(".pyi") {
        (Language::Python, "python")
    } else if lower.ends_with(".rs") {
        (Language::Rust, "rust")
    } else if lower.ends_with(".js") || lower.ends_with(".jsx") {
        (Language::Other, "javascript")
    } else if lower.ends_with(".ts") || lower.ends_with(".tsx") {
        (Language::Other, "typescript")
    } else if lower.ends_with(".go") {
        (Language::Other, "go")
    } else if lower.ends_with(".java") {
        (Language::Other, "java")
    } else if lower.ends_with(".rb") {
        (Language::Other, "ruby")
    } else {
        (Language::Other, "unknown")
    }
}

/// Parse `content` from `file_path`, dispatching on its classified language.
pub fn parse_file(file_path: &str, content: &str) -> Result<ParseResult, ParseError> {
    let (language, language_name) = classify_language(file_path);
    match language {
        Language::Python => python::parse_python(file_path, content),
        Language::Rust => rust_lang::parse_rust(file_path, content),
        Language::Other => Ok(fallback::parse_fallback(file_path, content, language_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(classify_language("app.py").0, Language::Python);
        assert_eq!(classify_language("lib.rs").0, Language::Rust);
        assert_eq!(classify_language("index.ts").0, Language::Other);
    }
}

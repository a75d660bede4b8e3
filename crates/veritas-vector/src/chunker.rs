//! Per-symbol chunking (§4.8).
//!
//! One chunk per indexable symbol (class, function, method) whose body
//! or docstring is non-empty. Content concatenates a file-path marker, a
//! type marker, a parent marker (if any), the signature, the docstring
//! (if any), and the body — body truncated to ~2000 characters with an
//! elided marker appended.

use veritas_core::{Chunk, Symbol, SymbolKind};

const MAX_BODY_CHARS: usize = 2000;
const BODY_ELIDED_MARKER: &str = "… [elided]";
const PREVIEW_CHARS: usize = 200;

fn symbol_kind_label(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class => "class",
        SymbolKind::Interface => "interface",
        SymbolKind::Function => "function",
        SymbolKind::Method => "method",
        SymbolKind::Constant => "constant",
    }
}

fn is_indexable(kind: SymbolKind) -> bool {
    matches!(kind, SymbolKind::Class | SymbolKind::Function | SymbolKind::Method)
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        return body.to_string();
    }
    let truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
    format!("{truncated}{BODY_ELIDED_MARKER}")
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    content.chars().take(PREVIEW_CHARS).collect::<String>() + "…"
}

/// Build a [`Chunk`] for `symbol`, or `None` if it isn't indexable or
/// has neither a body nor a docstring.
pub fn chunk_symbol(repo_id: &str, symbol: &Symbol) -> Option<Chunk> {
    if !is_indexable(symbol.kind) {
        return None;
    }
    let has_docstring = symbol.docstring.as_deref().is_some_and(|d| !d.is_empty());
    let has_body = symbol.body.as_deref().is_some_and(|b| !b.is_empty());
    if !has_docstring && !has_body {
        return None;
    }

    let mut content = format!("# file: {}\n# type: {}\n", symbol.file_path, symbol_kind_label(symbol.kind));
    if let Some(parent) = &symbol.parent {
        content.push_str(&format!("# parent: {parent}\n"));
    }
    if let Some(signature) = &symbol.signature {
        content.push_str(signature);
        content.push('\n');
    }
    if let Some(docstring) = symbol.docstring.as_deref().filter(|d| !d.is_empty()) {
        content.push_str(docstring);
        content.push('\n');
    }
    if let Some(body) = symbol.body.as_deref().filter(|b| !b.is_empty()) {
        content.push_str(&truncate_body(body));
    }

    Some(Chunk {
        id: veritas_core::Chunk::stable_id(repo_id, &symbol.file_path, &symbol.qualified_name),
        repo_id: repo_id.to_string(),
        file_path: symbol.file_path.clone(),
        line_start: symbol.line_start,
        line_end: symbol.line_end,
        symbol_name: symbol.name.clone(),
        symbol_type: symbol_kind_label(symbol.kind).to_string(),
        content_preview: preview(&content),
        content,
        embedding: None,
    })
}

/// Chunk every indexable symbol in `symbols`, skipping the ones with no
/// analyzable content.
pub fn chunk_symbols(repo_id: &str, symbols: &[Symbol]) -> Vec<Chunk> {
    symbols.iter().filter_map(|s| chunk_symbol(repo_id, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_core::Visibility;

    fn function_with(body: Option<&str>, docstring: Option<&str>) -> Symbol {
        let mut symbol = Symbol::ast(
            SymbolKind::Function,
            "helper",
            "helper",
            "src/lib.py",
            1,
            5,
            None,
            Visibility::Public,
            body.map(String::from),
        );
        symbol.docstring = docstring.map(String::from);
        symbol
    }

    #[test]
    fn skips_symbol_with_no_body_or_docstring() {
        let symbol = function_with(None, None);
        assert!(chunk_symbol("repo1", &symbol).is_none());
    }

    #[test]
    fn chunks_symbol_with_body() {
        let symbol = function_with(Some("return 1"), None);
        let chunk = chunk_symbol("repo1", &symbol).unwrap();
        assert!(chunk.content.contains("return 1"));
        assert_eq!(chunk.symbol_type, "function");
    }

    #[test]
    fn truncates_oversized_body() {
        let long_body = "x".repeat(3000);
        let symbol = function_with(Some(&long_body), None);
        let chunk = chunk_symbol("repo1", &symbol).unwrap();
        assert!(chunk.content.ends_with(BODY_ELIDED_MARKER));
    }

    #[test]
    fn stable_id_is_deterministic() {
        let symbol = function_with(Some("return 1"), None);
        let a = chunk_symbol("repo1", &symbol).unwrap();
        let b = chunk_symbol("repo1", &symbol).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn skips_non_indexable_constant() {
        let mut symbol = function_with(Some("42"), None);
        symbol.kind = SymbolKind::Constant;
        assert!(chunk_symbol("repo1", &symbol).is_none());
    }
}

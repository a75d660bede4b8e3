//! Regex-based fallback parser for languages without a first-class AST
//! path. Grounded on the per-extension pattern-table idiom used
//! throughout the teacher's local risk checks, generalized here to
//! symbol/import extraction instead of secret/pattern matching.
//!
//! Symbols produced here are always constructed via
//! [`veritas_core::Symbol::fallback`], which has no `body` parameter —
//! this parser can never claim to know a function body, since it never
//! resolves block boundaries.

use regex::Regex;
use std::sync::OnceLock;

use veritas_core::{Import, Symbol, SymbolKind, Visibility};

use crate::ParseResult;

struct Patterns {
    function: Regex,
    class: Regex,
    interface: Regex,
    import_js: Regex,
    import_go: Regex,
    import_java: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        function: Regex::new(
            r"(?m)^\s*(?:export\s+)?(?:public\s+|private\s+|protected\s+|static\s+|async\s+|func\s+)*(?:function\s+(?P<name1>\w+)|func\s+(?P<name2>\w+)|def\s+(?P<name3>\w+))\s*\(",
        )
        .expect("static fallback function pattern is valid"),
        class: Regex::new(r"(?m)^\s*(?:export\s+)?(?:public\s+|abstract\s+)*class\s+(?P<name>\w+)")
            .expect("static fallback class pattern is valid"),
        interface: Regex::new(r"(?m)^\s*(?:export\s+)?(?:public\s+)*(?:interface|trait|protocol)\s+(?P<name>\w+)")
            .expect("static fallback interface pattern is valid"),
        import_js: Regex::new(r#"(?m)^\s*import\s+.*?\s+from\s+['"](?P<module>[^'"]+)['"]"#)
            .expect("static fallback js import pattern is valid"),
        import_go: Regex::new(r#"(?m)^\s*(?:import\s+)?"(?P<module>[^"]+)"\s*$"#)
            .expect("static fallback go import pattern is valid"),
        import_java: Regex::new(r"(?m)^\s*import\s+(?:static\s+)?(?P<module>[\w.]+);")
            .expect("static fallback java import pattern is valid"),
    })
}

fn line_of(content: &str, byte_offset: usize) -> usize {
    content[..byte_offset.min(content.len())].matches('\n').count() + 1
}

/// Best-effort symbol/import extraction by regex. No call-graph
/// extraction is attempted — callee resolution without an AST is too
/// unreliable to be worth the false-positive rate.
pub(crate) fn parse_fallback(file_path: &str, content: &str, language_name: &str) -> ParseResult {
    let p = patterns();
    let mut result = ParseResult::default();

    for caps in p.function.captures_iter(content) {
        let name = caps
            .name("name1")
            .or_else(|| caps.name("name2"))
            .or_else(|| caps.name("name3"));
        if let Some(name) = name {
            let line = line_of(content, caps.get(0).expect("whole match present").start());
            result.symbols.push(Symbol::fallback(
                SymbolKind::Function,
                name.as_str(),
                name.as_str(),
                file_path,
                line,
                line,
                None,
                visibility_for(name.as_str()),
            ));
        }
    }

    for caps in p.class.captures_iter(content) {
        if let Some(name) = caps.name("name") {
            let line = line_of(content, caps.get(0).expect("whole match present").start());
            result.symbols.push(Symbol::fallback(
                SymbolKind::Class,
                name.as_str(),
                name.as_str(),
                file_path,
                line,
                line,
                None,
                visibility_for(name.as_str()),
            ));
        }
    }

    for caps in p.interface.captures_iter(content) {
        if let Some(name) = caps.name("name") {
            let line = line_of(content, caps.get(0).expect("whole match present").start());
            result.symbols.push(Symbol::fallback(
                SymbolKind::Interface,
                name.as_str(),
                name.as_str(),
                file_path,
                line,
                line,
                None,
                visibility_for(name.as_str()),
            ));
        }
    }

    let import_pattern = match language_name {
        "javascript" | "typescript" => Some(&p.import_js),
        "go" => Some(&p.import_go),
        "java" => Some(&p.import_java),
        _ => None,
    };
    if let Some(pattern) = import_pattern {
        for caps in pattern.captures_iter(content) {
            if let Some(module) = caps.name("module") {
                let line = line_of(content, caps.get(0).expect("whole match present").start());
                result.imports.push(Import {
                    file_path: file_path.to_string(),
                    line,
                    module: module.as_str().to_string(),
                    alias: None,
                    is_from_import: false,
                    imported_names: Vec::new(),
                });
            }
        }
    }

    result
}

fn visibility_for(name: &str) -> Visibility {
    if name.starts_with('_') {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_symbols_never_carry_a_body() {
        let content = "function doThing() {\n  return 1;\n}\n";
        let result = parse_fallback("app.js", content, "javascript");
        assert_eq!(result.symbols.len(), 1);
        assert!(result.symbols[0].body.is_none());
    }

    #[test]
    fn extracts_go_style_function() {
        let content = "func Handler(w http.ResponseWriter, r *http.Request) {\n}\n";
        let result = parse_fallback("main.go", content, "go");
        assert_eq!(result.symbols[0].name, "Handler");
    }

    #[test]
    fn extracts_js_imports() {
        let content = "import { useState } from 'react';\n";
        let result = parse_fallback("app.jsx", content, "javascript");
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].module, "react");
    }

    #[test]
    fn extracts_java_class_and_import() {
        let content = "import java.util.List;\n\npublic class Widget {\n}\n";
        let result = parse_fallback("Widget.java", content, "java");
        assert!(result.symbols.iter().any(|s| s.name == "Widget"));
        assert_eq!(result.imports[0].module, "java.util.List");
    }
}

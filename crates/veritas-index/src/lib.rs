//! Indexer (C4, §4.4): symbol table, import/call graphs (and their
//! reverses), entry-point detection, and top-level ranking.
//!
//! Grounded on the entry-point/tech-stack detection idiom in the
//! teacher's repository scanner — generalized here from a one-shot
//! heuristic scan into a structural index built from
//! [`veritas_parse::ParseResult`]s collected across a whole repository.
//!
//! Import and call edges are kept raw at [`Indexer::ingest`] time and
//! resolved lazily at query time: a file's imports/calls may name a
//! file or symbol that hasn't been ingested yet when `ingest` first
//! sees it, so resolution can only happen once the whole repository is
//! known.

#![warn(missing_docs)]

use std::collections::{HashMap, HashSet};

use regex::Regex;
use veritas_core::{Symbol, SymbolKind};
use veritas_parse::ParseResult;

const ENTRY_POINT_NAMES: &[&str] = &["main", "handle", "handler", "route", "cli", "start", "run", "init", "index"];

/// Suffix candidates tried, in order, when resolving a raw import module
/// string to a file path known to the index (§4.4 item 2).
const IMPORT_SUFFIXES: &[&str] = &[".py", "/__init__.py", ".js", ".ts", "/index.js"];

const FRAMEWORK_MODULES: &[(&str, &str)] = &[
    ("fastapi", "FastAPI"),
    ("flask", "Flask"),
    ("django", "Django"),
    ("express", "Express"),
    ("axum", "Axum"),
    ("actix_web", "Actix Web"),
    ("tokio", "Tokio"),
    ("react", "React"),
    ("vue", "Vue"),
    ("celery", "Celery"),
    ("sqlalchemy", "SQLAlchemy"),
];

/// Web-routing decorator markers (§4.4): `@*.route`, `@*.get/post/put/delete`,
/// `@app.`, `@router.`.
fn web_routing_decorator_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(?:\w+\.)*(?:route|get|post|put|delete)\b|@app\.|@router\.").expect("static decorator pattern is valid"))
}

/// One detected repository entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Qualified name of the entry symbol
    pub qualified_name: String,
    /// File it lives in
    pub file_path: String,
    /// Why it was classified as an entry point
    pub reason: String,
}

/// Aggregated index over every parsed file in a repository.
#[derive(Debug, Default)]
pub struct Indexer {
    symbols: HashMap<String, Symbol>,
    symbols_by_file: HashMap<String, Vec<String>>,
    files: HashSet<String>,
    raw_imports: HashMap<String, Vec<String>>,
    raw_calls: HashMap<String, Vec<String>>,
    tech_stack: HashSet<String>,
}

impl Indexer {
    /// New, empty indexer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's parse result into the index. Import/call edges
    /// are kept raw here; see [`Self::imports_of`]/[`Self::callees_of`]
    /// and their reverses for resolution.
    pub fn ingest(&mut self, file_path: &str, result: &ParseResult) {
        self.files.insert(file_path.to_string());

        for symbol in &result.symbols {
            self.symbols_by_file
                .entry(file_path.to_string())
                .or_default()
                .push(symbol.qualified_name.clone());
            self.symbols.insert(symbol.qualified_name.clone(), symbol.clone());
        }

        for import in &result.imports {
            self.raw_imports.entry(file_path.to_string()).or_default().push(import.module.clone());

            let root_module = import.module.split(['.', '/']).next().unwrap_or(&import.module);
            if let Some((_, label)) = FRAMEWORK_MODULES.iter().find(|(m, _)| *m == root_module) {
                self.tech_stack.insert((*label).to_string());
            }
        }

        for call in &result.calls {
            self.raw_calls
                .entry(call.caller_qname.clone())
                .or_default()
                .push(call.callee_expression.clone());
        }
    }

    /// Look up a symbol by its qualified name.
    pub fn symbol(&self, qualified_name: &str) -> Option<&Symbol> {
        self.symbols.get(qualified_name)
    }

    /// All symbols declared in `file_path`.
    pub fn symbols_in_file(&self, file_path: &str) -> Vec<&Symbol> {
        self.symbols_by_file
            .get(file_path)
            .into_iter()
            .flatten()
            .filter_map(|qname| self.symbols.get(qname))
            .collect()
    }

    /// Resolve a raw import module string, written in `from_file`, to a
    /// file path known to this index, trying [`IMPORT_SUFFIXES`] against
    /// the dotted path and, for a relative import, against `from_file`'s
    /// own directory. `None` if nothing ingested matches.
    fn resolve_import(&self, from_file: &str, module: &str) -> Option<String> {
        let from_dir = from_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let dotted = module.trim_start_matches('.').replace('.', "/");

        let mut bases = Vec::new();
        if module.starts_with('.') {
            bases.push(if from_dir.is_empty() { dotted } else { format!("{from_dir}/{dotted}") });
        } else {
            if !dotted.is_empty() {
                bases.push(dotted);
            }
            if !from_dir.is_empty() {
                bases.push(format!("{from_dir}/{module}"));
            }
        }

        for base in &bases {
            for suffix in IMPORT_SUFFIXES {
                let candidate = format!("{base}{suffix}");
                if self.files.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Files resolved from the imports declared in `file_path` (§4.4
    /// item 2). An import with no matching file under the working
    /// directory is dropped rather than kept as a raw module string.
    pub fn imports_of(&self, file_path: &str) -> HashSet<String> {
        self.raw_imports
            .get(file_path)
            .into_iter()
            .flatten()
            .filter_map(|module| self.resolve_import(file_path, module))
            .collect()
    }

    /// Files that import `resolved_file` (the reverse import graph).
    pub fn importers_of(&self, resolved_file: &str) -> HashSet<String> {
        self.raw_imports
            .iter()
            .filter(|(from_file, modules)| modules.iter().any(|m| self.resolve_import(from_file, m).as_deref() == Some(resolved_file)))
            .map(|(from_file, _)| from_file.clone())
            .collect()
    }

    /// Resolve a raw callee expression (§4.4 item 3): take its last
    /// dotted segment, look it up in the symbol table by unqualified
    /// name, preferring a [`SymbolKind::Method`] match over a
    /// [`SymbolKind::Function`] match, and fall back to the raw
    /// expression when nothing matches.
    fn resolve_callee(&self, callee_expression: &str) -> String {
        let last_segment = callee_expression.rsplit('.').next().unwrap_or(callee_expression);

        let mut candidates: Vec<&Symbol> = self.symbols.values().filter(|s| s.name == last_segment).collect();
        if candidates.is_empty() {
            return callee_expression.to_string();
        }
        candidates.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

        candidates
            .iter()
            .find(|s| s.kind == SymbolKind::Method)
            .or_else(|| candidates.first())
            .map(|s| s.qualified_name.clone())
            .unwrap_or_else(|| callee_expression.to_string())
    }

    /// Qualified names (or, unresolved, raw expressions) invoked from
    /// `caller_qname`.
    pub fn callees_of(&self, caller_qname: &str) -> HashSet<String> {
        self.raw_calls
            .get(caller_qname)
            .into_iter()
            .flatten()
            .map(|expr| self.resolve_callee(expr))
            .collect()
    }

    /// Callers of `target` — a resolved qualified name, or a raw
    /// expression that resolved to nothing (the reverse call graph,
    /// fan-in).
    pub fn callers_of(&self, target: &str) -> HashSet<String> {
        self.raw_calls
            .iter()
            .filter(|(_, exprs)| exprs.iter().any(|expr| self.resolve_callee(expr) == target))
            .map(|(caller, _)| caller.clone())
            .collect()
    }

    /// Frameworks detected from import roots, via [`FRAMEWORK_MODULES`].
    pub fn tech_stack(&self) -> Vec<String> {
        let mut v: Vec<String> = self.tech_stack.iter().cloned().collect();
        v.sort();
        v
    }

    /// Detect repository entry points (§4.4): a symbol whose name
    /// matches a known entry-point pattern and has no inbound callers,
    /// or a symbol whose body carries a web-routing decorator marker.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        let mut found = Vec::new();
        for (qname, symbol) in &self.symbols {
            if ENTRY_POINT_NAMES.contains(&symbol.name.as_str()) && self.callers_of(qname).is_empty() {
                found.push(EntryPoint {
                    qualified_name: qname.clone(),
                    file_path: symbol.file_path.clone(),
                    reason: format!("symbol name '{}' matches known entry-point convention with no inbound callers", symbol.name),
                });
                continue;
            }
            if let Some(body) = &symbol.body {
                if web_routing_decorator_pattern().is_match(body) {
                    found.push(EntryPoint {
                        qualified_name: qname.clone(),
                        file_path: symbol.file_path.clone(),
                        reason: "symbol body carries a web-routing decorator marker".to_string(),
                    });
                }
            }
        }
        found.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        found
    }

    /// Classes and top-level functions ranked for chunking/embedding
    /// priority and as a retrieval boost signal (§4.4): classes ordered
    /// by child-symbol count descending, top-level functions ordered by
    /// inbound-caller count descending, interleaved.
    pub fn top_ranked(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut child_counts: HashMap<&str, usize> = HashMap::new();
        for symbol in self.symbols.values() {
            if let Some(parent) = &symbol.parent {
                *child_counts.entry(parent.as_str()).or_insert(0) += 1;
            }
        }

        let mut classes: Vec<(&str, usize)> = self
            .symbols
            .values()
            .filter(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Interface))
            .map(|s| (s.qualified_name.as_str(), child_counts.get(s.qualified_name.as_str()).copied().unwrap_or(0)))
            .collect();
        classes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut functions: Vec<(&str, usize)> = self
            .symbols
            .values()
            .filter(|s| s.kind == SymbolKind::Function && s.parent.is_none())
            .map(|s| (s.qualified_name.as_str(), self.callers_of(s.qualified_name.as_str()).len()))
            .collect();
        functions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut ranked = Vec::with_capacity(classes.len() + functions.len());
        let mut classes = classes.into_iter();
        let mut functions = functions.into_iter();
        loop {
            let mut progressed = false;
            if let Some(c) = classes.next() {
                ranked.push(c);
                progressed = true;
            }
            if let Some(f) = functions.next() {
                ranked.push(f);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        ranked.truncate(limit);
        ranked
    }

    /// Total number of indexed symbols.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Every indexed symbol, in no particular order. Used by the Chunker
    /// (C8), which chunks repo-wide rather than per-file.
    pub fn all_symbols(&self) -> Vec<&Symbol> {
        self.symbols.values().collect()
    }

    /// Every file path folded into this index via [`Self::ingest`].
    pub fn files(&self) -> Vec<&str> {
        self.files.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_parse::parse_file;

    #[test]
    fn ingest_builds_symbol_table_and_call_graph() {
        let mut idx = Indexer::new();
        let src = "def helper():\n    pass\n\ndef main():\n    helper()\n";
        let result = parse_file("main.py", src).unwrap();
        idx.ingest("main.py", &result);

        assert!(idx.symbol("main").is_some());
        assert!(idx.symbol("helper").is_some());
        assert!(idx.callees_of("main").contains("helper"));
        assert!(idx.callers_of("helper").contains("main"));
    }

    #[test]
    fn resolves_dotted_call_expression_to_qualified_name() {
        let mut idx = Indexer::new();
        let src = "class Service:\n    def run(self):\n        pass\n\ndef main():\n    svc.run()\n";
        let result = parse_file("app.py", src).unwrap();
        idx.ingest("app.py", &result);

        assert!(idx.callees_of("main").contains("Service.run"));
    }

    #[test]
    fn resolves_import_to_file_path_under_working_dir() {
        let mut idx = Indexer::new();
        let helper_src = "def helper():\n    pass\n";
        let helper_result = parse_file("pkg/helper.py", helper_src).unwrap();
        idx.ingest("pkg/helper.py", &helper_result);

        let main_src = "import pkg.helper\n";
        let main_result = parse_file("main.py", main_src).unwrap();
        idx.ingest("main.py", &main_result);

        assert!(idx.imports_of("main.py").contains("pkg/helper.py"));
        assert!(idx.importers_of("pkg/helper.py").contains("main.py"));
    }

    #[test]
    fn detects_entry_point_by_name_with_no_inbound_callers() {
        let mut idx = Indexer::new();
        let src = "def main():\n    pass\n";
        let result = parse_file("main.py", src).unwrap();
        idx.ingest("main.py", &result);

        let entries = idx.entry_points();
        assert!(entries.iter().any(|e| e.qualified_name == "main"));
    }

    #[test]
    fn name_match_with_inbound_callers_is_not_an_entry_point() {
        let mut idx = Indexer::new();
        let src = "def init():\n    pass\n\ndef main():\n    init()\n";
        let result = parse_file("app.py", src).unwrap();
        idx.ingest("app.py", &result);

        let entries = idx.entry_points();
        assert!(!entries.iter().any(|e| e.qualified_name == "init"));
        assert!(entries.iter().any(|e| e.qualified_name == "main"));
    }

    #[test]
    fn detects_tech_stack_from_imports() {
        let mut idx = Indexer::new();
        let src = "from fastapi import FastAPI\n";
        let result = parse_file("app.py", src).unwrap();
        idx.ingest("app.py", &result);
        assert_eq!(idx.tech_stack(), vec!["FastAPI".to_string()]);
    }

    #[test]
    fn top_ranked_interleaves_classes_by_child_count_and_functions_by_fan_in() {
        let mut idx = Indexer::new();
        let src = "class Big:\n    def a(self):\n        pass\n    def b(self):\n        pass\n\ndef shared():\n    pass\n\ndef caller_one():\n    shared()\n\ndef caller_two():\n    shared()\n";
        let result = parse_file("m.py", src).unwrap();
        idx.ingest("m.py", &result);

        let top = idx.top_ranked(2);
        assert_eq!(top[0].0, "Big");
        assert_eq!(top[0].1, 2);
        assert_eq!(top[1].0, "shared");
        assert_eq!(top[1].1, 2);
    }
}

//! Rust AST parsing via `syn`.

use proc_macro2::LineColumn;
use syn::spanned::Spanned;
use syn::{Item, ItemFn, ItemImpl, ImplItem, Visibility as SynVisibility};

use veritas_core::{CallEdge, Import, Symbol, SymbolKind, Visibility};

use crate::{ParseError, ParseResult};

pub(crate) fn parse_rust(file_path: &str, content: &str) -> Result<ParseResult, ParseError> {
    let file = syn::parse_file(content).map_err(|e| ParseError::Syntax(e.to_string()))?;

    let mut result = ParseResult::default();
    walk_items(&file.items, file_path, None, &mut result);
    Ok(result)
}

fn visibility_of(vis: &SynVisibility) -> Visibility {
    match vis {
        SynVisibility::Public(_) => Visibility::Public,
        _ => Visibility::Private,
    }
}

fn span_lines(span: proc_macro2::Span) -> (usize, usize) {
    let LineColumn { line: start, .. } = span.start();
    let LineColumn { line: end, .. } = span.end();
    (start, end)
}

fn qualify(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(p) => format!("{p}::{name}"),
        None => name.to_string(),
    }
}

fn walk_items(items: &[Item], file_path: &str, parent: Option<&str>, out: &mut ParseResult) {
    for item in items {
        match item {
            Item::Fn(f) => record_fn(f, file_path, parent, out),
            Item::Struct(s) => {
                let (start, end) = span_lines(s.span());
                let qname = qualify(parent, &s.ident.to_string());
                out.symbols.push(Symbol::ast(
                    SymbolKind::Class,
                    s.ident.to_string(),
                    qname,
                    file_path.to_string(),
                    start,
                    end,
                    parent.map(str::to_string),
                    visibility_of(&s.vis),
                    None,
                ));
            }
            Item::Trait(t) => {
                let (start, end) = span_lines(t.span());
                let qname = qualify(parent, &t.ident.to_string());
                out.symbols.push(Symbol::ast(
                    SymbolKind::Interface,
                    t.ident.to_string(),
                    qname,
                    file_path.to_string(),
                    start,
                    end,
                    parent.map(str::to_string),
                    visibility_of(&t.vis),
                    None,
                ));
            }
            Item::Const(c) => {
                let (start, end) = span_lines(c.span());
                let qname = qualify(parent, &c.ident.to_string());
                out.symbols.push(Symbol::ast(
                    SymbolKind::Constant,
                    c.ident.to_string(),
                    qname,
                    file_path.to_string(),
                    start,
                    end,
                    parent.map(str::to_string),
                    visibility_of(&c.vis),
                    None,
                ));
            }
            Item::Impl(imp) => record_impl(imp, file_path, out),
            Item::Mod(m) => {
                if let Some((_, nested)) = &m.content {
                    let qname = qualify(parent, &m.ident.to_string());
                    walk_items(nested, file_path, Some(&qname), out);
                }
            }
            Item::Use(u) => record_use(u, file_path, out),
            _ => {}
        }
    }
}

fn record_fn(f: &ItemFn, file_path: &str, parent: Option<&str>, out: &mut ParseResult) {
    let (start, end) = span_lines(f.span());
    let qname = qualify(parent, &f.sig.ident.to_string());
    out.symbols.push(Symbol::ast(
        if parent.is_some() { SymbolKind::Method } else { SymbolKind::Function },
        f.sig.ident.to_string(),
        qname.clone(),
        file_path.to_string(),
        start,
        end,
        parent.map(str::to_string),
        visibility_of(&f.vis),
        Some(quote::quote!(#f).to_string()),
    ));
    walk_calls_in_block(&f.block, file_path, &qname, out);
}

fn record_impl(imp: &ItemImpl, file_path: &str, out: &mut ParseResult) {
    let self_ty = &*imp.self_ty;
    let type_name = quote::quote!(#self_ty).to_string().replace(' ', "");
    for item in &imp.items {
        if let ImplItem::Fn(method) = item {
            let (start, end) = span_lines(method.span());
            let qname = format!("{type_name}::{}", method.sig.ident);
            out.symbols.push(Symbol::ast(
                SymbolKind::Method,
                method.sig.ident.to_string(),
                qname.clone(),
                file_path.to_string(),
                start,
                end,
                Some(type_name.clone()),
                visibility_of(&method.vis),
                Some(quote::quote!(#method).to_string()),
            ));
            walk_calls_in_block(&method.block, file_path, &qname, out);
        }
    }
}

fn record_use(u: &syn::ItemUse, file_path: &str, out: &mut ParseResult) {
    let line = u.span().start().line;
    let flat = quote::quote!(#u).to_string();
    out.imports.push(Import {
        file_path: file_path.to_string(),
        line,
        module: flat.trim_start_matches("use ").trim_end_matches(';').to_string(),
        alias: None,
        is_from_import: false,
        imported_names: Vec::new(),
    });
}

fn walk_calls_in_block(block: &syn::Block, file_path: &str, caller_qname: &str, out: &mut ParseResult) {
    for stmt in &block.stmts {
        walk_calls_in_stmt(stmt, file_path, caller_qname, out);
    }
}

fn walk_calls_in_stmt(stmt: &syn::Stmt, file_path: &str, caller_qname: &str, out: &mut ParseResult) {
    if let syn::Stmt::Expr(expr, _) = stmt {
        walk_calls_in_expr(expr, file_path, caller_qname, out);
    }
}

fn walk_calls_in_expr(expr: &syn::Expr, file_path: &str, caller_qname: &str, out: &mut ParseResult) {
    match expr {
        syn::Expr::Call(call) => {
            let func = &*call.func;
            let callee_expression = quote::quote!(#func).to_string().replace(' ', "");
            out.calls.push(CallEdge {
                file_path: file_path.to_string(),
                line: call.span().start().line,
                caller_qname: caller_qname.to_string(),
                callee_expression,
            });
            for arg in &call.args {
                walk_calls_in_expr(arg, file_path, caller_qname, out);
            }
        }
        syn::Expr::MethodCall(mc) => {
            out.calls.push(CallEdge {
                file_path: file_path.to_string(),
                line: mc.span().start().line,
                caller_qname: caller_qname.to_string(),
                callee_expression: format!(".{}", mc.method),
            });
            walk_calls_in_expr(&mc.receiver, file_path, caller_qname, out);
        }
        syn::Expr::Block(b) => walk_calls_in_block(&b.block, file_path, caller_qname, out),
        syn::Expr::If(i) => {
            walk_calls_in_block(&i.then_branch, file_path, caller_qname, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_struct_and_impl_methods() {
        let src = "struct Greeter;\nimpl Greeter {\n    fn greet(&self) {\n        helper();\n    }\n}\n";
        let result = parse_rust("greet.rs", src).unwrap();
        let names: Vec<&str> = result.symbols.iter().map(|s| s.qualified_name.as_str()).collect();
        assert!(names.contains(&"Greeter"));
        assert!(names.iter().any(|n| n.ends_with("::greet")));
    }

    #[test]
    fn extracts_call_edges() {
        let src = "fn caller() {\n    helper(1, 2);\n}\n";
        let result = parse_rust("c.rs", src).unwrap();
        assert_eq!(result.calls.len(), 1);
        assert_eq!(result.calls[0].callee_expression, "helper");
    }

    #[test]
    fn syntax_error_surfaces_as_parse_error() {
        let err = parse_rust("bad.rs", "fn (").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }
}

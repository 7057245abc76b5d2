//! Inlining of calls to trivial top-level functions: identity bodies forward
//! their argument, empty bodies evaluate arguments for effect and yield
//! `undefined`.

use std::collections::HashMap;

use crate::ast::bind::{SymbolId, SymbolTable};
use crate::ast::{
    self, ArrowBody, ArrowExpr, BlockStmt, CallExpr, Callee, Decl, Expr, Function, Lit, Pat,
    SeqExpr, Stmt,
};
use crate::tree_shaking::statement_graph::expr_has_effects;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InlinableFn {
    /// `function id(x) { return x; }`
    Identity,
    /// `function noop() {}`, or a body that is one bare `return`.
    Empty,
}

/// Top-level bindings whose calls can be rewritten away. A binding written
/// to after its declaration keeps its calls regardless of shape.
pub(crate) fn collect_inlinable_fns(
    module: &ast::Module,
    symbols: &SymbolTable,
) -> HashMap<SymbolId, InlinableFn> {
    let mut out = HashMap::new();
    for stmt in &module.stmts {
        let decl = match stmt {
            Stmt::Decl(decl) => decl,
            Stmt::ExportDecl(export) => &export.decl,
            _ => continue,
        };
        match decl {
            Decl::Fn(decl) => {
                let Some(symbol) = decl.ident.symbol else {
                    continue;
                };
                if symbols.symbol(symbol).assigned {
                    continue;
                }
                if let Some(kind) = classify_function(&decl.function) {
                    out.insert(symbol, kind);
                }
            }
            Decl::Var(var) => {
                for declarator in &var.decls {
                    let Pat::Ident(name) = &declarator.name else {
                        continue;
                    };
                    let Some(symbol) = name.symbol else {
                        continue;
                    };
                    if symbols.symbol(symbol).assigned {
                        continue;
                    }
                    let kind = match &declarator.init {
                        Some(Expr::Fn(f)) => classify_function(&f.function),
                        Some(Expr::Arrow(arrow)) => classify_arrow(arrow),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        out.insert(symbol, kind);
                    }
                }
            }
            Decl::Class(_) => {}
        }
    }
    out
}

fn classify_function(function: &Function) -> Option<InlinableFn> {
    if function.is_async || function.is_generator {
        return None;
    }
    classify_body(&function.params, &function.body)
}

fn classify_arrow(arrow: &ArrowExpr) -> Option<InlinableFn> {
    if arrow.is_async {
        return None;
    }
    match arrow.body.as_ref() {
        ArrowBody::Block(block) => classify_body(&arrow.params, block),
        ArrowBody::Expr(expr) => returns_first_param(&arrow.params, expr),
    }
}

fn classify_body(params: &[Pat], body: &BlockStmt) -> Option<InlinableFn> {
    if params.iter().any(|p| p.is_complex()) {
        return None;
    }
    match body.stmts.as_slice() {
        [] => Some(InlinableFn::Empty),
        [Stmt::Return(ret)] => match &ret.arg {
            None => Some(InlinableFn::Empty),
            Some(expr) => returns_first_param(params, expr),
        },
        _ => None,
    }
}

fn returns_first_param(params: &[Pat], expr: &Expr) -> Option<InlinableFn> {
    if params.len() != 1 || params.iter().any(|p| p.is_complex()) {
        return None;
    }
    let Pat::Ident(param) = &params[0] else {
        return None;
    };
    let returned = expr.as_ident()?.symbol?;
    if param.symbol? == returned {
        Some(InlinableFn::Identity)
    } else {
        None
    }
}

/// Rewrites a call whose callee is a known trivial function. A spread
/// argument always disables the rewrite.
pub(crate) fn try_inline(
    call: &mut CallExpr,
    fns: &HashMap<SymbolId, InlinableFn>,
) -> Option<Expr> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let symbol = callee.as_ident()?.symbol?;
    let kind = *fns.get(&symbol)?;
    if call.args.iter().any(|arg| arg.spread) {
        return None;
    }
    match kind {
        InlinableFn::Identity => match call.args.len() {
            0 => Some(Expr::undefined()),
            1 => Some(call.args.remove(0).expr),
            // The value is the first argument but the later ones still
            // evaluate after it; a sequence would reorder them.
            _ => None,
        },
        InlinableFn::Empty => {
            if call.args.iter().all(|arg| !expr_has_effects(&arg.expr)) {
                return Some(Expr::undefined());
            }
            let mut exprs: Vec<Expr> = call.args.drain(..).map(|arg| arg.expr).collect();
            exprs.push(Expr::undefined());
            Some(Expr::Seq(SeqExpr {
                exprs,
                span: call.span,
            }))
        }
    }
}

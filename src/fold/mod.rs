//! Constant folding over the module graph: literal algebra, template
//! collapse, undefined-`typeof` guards, branch elimination, trivial call
//! inlining and const reads resolved across module boundaries. The optimize
//! loop interleaves this with the shaker until neither finds a change.

pub mod consteval;
pub mod inline;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::bind::{SymbolId, SymbolTable};
use crate::ast::visit::{self, VisitMut};
use crate::ast::{self, BlockStmt, Decl, Expr, Lit, Pat, Prop, PropName, Stmt, UnaryOp, VarDeclKind};
use crate::exports::{resolve_export, ImportedName, ResolvedExport};
use crate::module::{ModuleId, ModuleKind};
use crate::module_graph::ModuleGraph;
use crate::tree_shaking::sweep;
use inline::InlinableFn;

/// One folding pass over every live ESM module. Returns the number of
/// rewrites applied; zero means a fixpoint.
pub fn fold_module_graph(module_graph: &mut ModuleGraph) -> usize {
    let (sorted, cycles) = module_graph.toposort();
    let cycle_members: HashSet<&ModuleId> = cycles.iter().flatten().collect();

    // Const values and function shapes are collected before any module is
    // rewritten, so the whole pass reads one consistent snapshot.
    let mut module_consts: HashMap<ModuleId, HashMap<SymbolId, Lit>> = HashMap::new();
    let mut module_fns: HashMap<ModuleId, HashMap<SymbolId, InlinableFn>> = HashMap::new();
    for module_id in &sorted {
        let info = module_graph.get_module(module_id).unwrap().info();
        if !info.live || info.kind != ModuleKind::Esm {
            continue;
        }
        module_consts.insert(
            module_id.clone(),
            collect_foldable_consts(&info.ast, &info.symbols),
        );
        if !info.symbols.has_eval() {
            module_fns.insert(
                module_id.clone(),
                inline::collect_inlinable_fns(&info.ast, &info.symbols),
            );
        }
    }

    // Resolve each module's substitution environment up front; `resolve_export`
    // needs the graph, and the rewrite below needs it mutably.
    let mut environments: HashMap<ModuleId, HashMap<SymbolId, Lit>> = HashMap::new();
    for module_id in &sorted {
        let info = module_graph.get_module(module_id).unwrap().info();
        if !info.live || info.kind != ModuleKind::Esm || info.symbols.has_eval() {
            continue;
        }
        let mut env = module_consts.get(module_id).cloned().unwrap_or_default();
        for (local, target) in info.imports.iter() {
            let ImportedName::Named(name) = &target.imported else {
                continue;
            };
            let Ok(ResolvedExport::Symbol { module, symbol }) =
                resolve_export(module_graph, &target.source, name)
            else {
                continue;
            };
            // A binding inside an import cycle may still be in its temporal
            // dead zone when this module reads it.
            if cycle_members.contains(&module) {
                continue;
            }
            if let Some(lit) = module_consts.get(&module).and_then(|c| c.get(&symbol)) {
                env.insert(*local, lit.clone());
            }
        }
        if !env.is_empty() {
            environments.insert(module_id.clone(), env);
        }
    }

    let empty_consts = HashMap::new();
    let empty_fns = HashMap::new();
    let mut changed = 0;
    for module_id in &sorted {
        let info = module_graph.get_module_mut(module_id).unwrap().info_mut();
        if !info.live || info.kind != ModuleKind::Esm {
            continue;
        }
        let consts = environments.get(module_id).unwrap_or(&empty_consts);
        let fns = module_fns.get(module_id).unwrap_or(&empty_fns);
        changed += fold_module(&mut info.ast, &info.symbols, consts, fns);
    }
    debug!("fold pass: {} changes", changed);
    changed
}

/// Top-level `const name = <literal>` bindings of a module. Only these feed
/// read substitution, locally and across imports.
pub(crate) fn collect_foldable_consts(
    module: &ast::Module,
    symbols: &SymbolTable,
) -> HashMap<SymbolId, Lit> {
    let mut out = HashMap::new();
    for stmt in &module.stmts {
        let var = match stmt {
            Stmt::Decl(Decl::Var(var)) => var,
            Stmt::ExportDecl(export) => match &export.decl {
                Decl::Var(var) => var,
                _ => continue,
            },
            _ => continue,
        };
        if var.kind != VarDeclKind::Const {
            continue;
        }
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
            if let Some(Expr::Lit(lit)) = &declarator.init {
                out.insert(symbol, lit.clone());
            }
        }
    }
    out
}

/// One folding pass over a single module body.
pub(crate) fn fold_module(
    module: &mut ast::Module,
    symbols: &SymbolTable,
    consts: &HashMap<SymbolId, Lit>,
    fns: &HashMap<SymbolId, InlinableFn>,
) -> usize {
    let mut visitor = FoldVisitor {
        symbols,
        consts,
        fns,
        changed: 0,
    };
    visitor.visit_mut_module(module);
    visitor.changed
}

struct FoldVisitor<'a> {
    symbols: &'a SymbolTable,
    consts: &'a HashMap<SymbolId, Lit>,
    fns: &'a HashMap<SymbolId, InlinableFn>,
    changed: usize,
}

impl VisitMut for FoldVisitor<'_> {
    fn visit_mut_expr(&mut self, e: &mut Expr) {
        // Nothing folds inside a `typeof` argument; the guard comparison is
        // evaluated at the enclosing equality instead.
        if let Expr::Unary(unary) = e {
            if unary.op == UnaryOp::TypeOf {
                return;
            }
        }
        if let Expr::Object(object) = e {
            // Shorthand properties read their binding. Rewrite to an
            // explicit key so the value position can take the literal.
            for prop in object.props.iter_mut() {
                let Prop::Shorthand(name) = prop else {
                    continue;
                };
                let Some(lit) = name.symbol.and_then(|s| self.consts.get(&s)) else {
                    continue;
                };
                *prop = Prop::KeyValue {
                    key: PropName::Ident(name.sym.clone()),
                    value: Expr::Lit(lit.clone()),
                };
                self.changed += 1;
            }
        }
        visit::walk_mut_expr(self, e);

        if let Expr::Ident(ident) = e {
            if let Some(lit) = ident.symbol.and_then(|s| self.consts.get(&s)) {
                *e = Expr::Lit(lit.clone());
                self.changed += 1;
                return;
            }
        }
        if let Expr::Call(call) = e {
            if let Some(inlined) = inline::try_inline(call, self.fns) {
                *e = inlined;
                self.changed += 1;
            }
        }
        if let Some(folded) = consteval::eval_expr(e, self.symbols) {
            *e = folded;
            self.changed += 1;
        }
    }

    fn visit_mut_stmt(&mut self, s: &mut Stmt) {
        visit::walk_mut_stmt(self, s);
        if let Stmt::If(stmt) = s {
            if let Some(test) = stmt.test.as_lit() {
                let truthy = consteval::lit_truthiness(test);
                let replacement = fold_branch(stmt, truthy);
                *s = replacement;
                self.changed += 1;
            }
        }
    }
}

/// Replaces a branch whose test folded to a literal. The dropped side keeps
/// its hoisted declarations through the same rewrite the sweeper applies to
/// unreachable tails.
fn fold_branch(stmt: &ast::IfStmt, truthy: bool) -> Stmt {
    let (kept, dropped) = if truthy {
        (Some(stmt.cons.as_ref()), stmt.alt.as_deref())
    } else {
        (stmt.alt.as_deref(), Some(stmt.cons.as_ref()))
    };
    let mut stmts = Vec::new();
    if let Some(dropped) = dropped {
        match sweep::hoisted_form(dropped) {
            sweep::Hoisted::Keep => stmts.push(dropped.clone()),
            sweep::Hoisted::Rewritten(bare) => stmts.push(bare),
            sweep::Hoisted::Removed => {}
        }
    }
    if let Some(kept) = kept {
        stmts.push(kept.clone());
    }
    match stmts.len() {
        0 => Stmt::Empty(stmt.span),
        1 => stmts.pop().unwrap(),
        _ => Stmt::Block(BlockStmt {
            stmts,
            span: stmt.span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::bind::bind_module;
    use crate::ast::{BinaryOp, ObjectLit, VarDeclKind, DUMMY_SP};
    use crate::test_helper::ast::*;
    use crate::test_helper::memory::{compiler_with, MemoryHost};

    fn folded(stmts: Vec<Stmt>) -> (ast::Module, usize) {
        let mut m = module(stmts);
        let table = bind_module(&mut m);
        let consts = collect_foldable_consts(&m, &table);
        let fns = inline::collect_inlinable_fns(&m, &table);
        let changes = fold_module(&mut m, &table, &consts, &fns);
        (m, changes)
    }

    fn var_init(stmt: &Stmt) -> &Expr {
        let decl = match stmt {
            Stmt::Decl(Decl::Var(var)) => var,
            Stmt::ExportDecl(export) => match &export.decl {
                Decl::Var(var) => var,
                _ => panic!("statement declares nothing"),
            },
            _ => panic!("statement declares nothing"),
        };
        decl.decls[0].init.as_ref().unwrap()
    }

    #[test]
    fn test_local_const_reads_fold_through_branches() {
        let (m, changes) = folded(vec![
            const_decl("DEBUG", bool_lit(false)),
            if_stmt(
                id_expr("DEBUG"),
                block_stmt(vec![expr_stmt(call("trace", vec![]))]),
                None,
            ),
        ]);
        assert_eq!(changes, 2);
        assert_eq!(m.stmts[1], Stmt::Empty(DUMMY_SP));
    }

    #[test]
    fn test_arithmetic_chains_collapse_bottom_up() {
        let (m, changes) = folded(vec![const_decl(
            "n",
            bin(
                BinaryOp::Add,
                bin(BinaryOp::Mul, num(6.0), num(7.0)),
                num(0.5),
            ),
        )]);
        assert_eq!(changes, 2);
        assert_eq!(var_init(&m.stmts[0]), &num(42.5));
    }

    #[test]
    fn test_template_uses_exact_number_strings() {
        let (m, changes) = folded(vec![const_decl(
            "msg",
            tpl(&["v", ""], vec![num(1e21)]),
        )]);
        assert_eq!(changes, 1);
        assert_eq!(var_init(&m.stmts[0]), &str_lit("v1e+21"));
    }

    #[test]
    fn test_typeof_guard_folds_only_against_undefined() {
        let (m, changes) = folded(vec![
            const_decl(
                "nav",
                cond(
                    bin(
                        BinaryOp::NotEqEq,
                        typeof_of(id_expr("navigator")),
                        str_lit("undefined"),
                    ),
                    id_expr("navigator"),
                    null_lit(),
                ),
            ),
            const_decl(
                "obj",
                cond(
                    bin(
                        BinaryOp::NotEqEq,
                        typeof_of(id_expr("navigator")),
                        str_lit("object"),
                    ),
                    id_expr("navigator"),
                    null_lit(),
                ),
            ),
        ]);
        assert_eq!(changes, 2);
        assert_eq!(var_init(&m.stmts[0]), &null_lit());
        assert!(matches!(var_init(&m.stmts[1]), Expr::Cond(_)));
    }

    #[test]
    fn test_trivial_calls_inline_at_their_sites() {
        let (m, changes) = folded(vec![
            fn_decl("id", &["x"], vec![return_stmt(Some(id_expr("x")))]),
            fn_decl("noop", &[], vec![]),
            const_decl("a", call("id", vec![call("make", vec![])])),
            expr_stmt(spread_call("id", id_expr("xs"))),
            const_decl("b", call("noop", vec![])),
        ]);
        assert_eq!(changes, 2);
        assert_eq!(var_init(&m.stmts[2]), &call("make", vec![]));
        assert_eq!(m.stmts[3], expr_stmt(spread_call("id", id_expr("xs"))));
        assert_eq!(var_init(&m.stmts[4]), &Expr::undefined());
    }

    #[test]
    fn test_dead_branch_keeps_hoisted_var_names() {
        let (m, changes) = folded(vec![if_stmt(
            bool_lit(false),
            block_stmt(vec![
                var_decl(VarDeclKind::Var, "cache", Some(call("init", vec![]))),
                expr_stmt(call("warm", vec![])),
            ]),
            Some(block_stmt(vec![expr_stmt(call("run", vec![]))])),
        )]);
        assert_eq!(changes, 1);
        let Stmt::Block(block) = &m.stmts[0] else {
            panic!("expected a block, got {:?}", m.stmts[0]);
        };
        assert_eq!(block.stmts.len(), 2);
        let Stmt::Decl(Decl::Var(hoisted)) = &block.stmts[0] else {
            panic!("expected a bare var, got {:?}", block.stmts[0]);
        };
        assert_eq!(hoisted.kind, VarDeclKind::Var);
        assert!(hoisted.decls[0].init.is_none());
        assert_eq!(block.stmts[1], block_stmt(vec![expr_stmt(call("run", vec![]))]));
    }

    #[test]
    fn test_object_shorthand_takes_the_literal() {
        let (m, changes) = folded(vec![
            const_decl("DEBUG", bool_lit(true)),
            export_default_expr(Expr::Object(ObjectLit {
                props: vec![Prop::Shorthand(ident("DEBUG"))],
                span: DUMMY_SP,
            })),
        ]);
        assert_eq!(changes, 1);
        let Stmt::ExportDefault(export) = &m.stmts[1] else {
            panic!("expected a default export");
        };
        let crate::ast::DefaultDecl::Expr(Expr::Object(object)) = &export.decl else {
            panic!("expected an object literal");
        };
        assert_eq!(
            object.props[0],
            Prop::KeyValue {
                key: PropName::Ident("DEBUG".to_string()),
                value: bool_lit(true),
            }
        );
    }

    #[test]
    fn test_cross_module_consts_inline_into_consumers() {
        let mut host = MemoryHost::new();
        host.add("flags", vec![export_const("LIMIT", num(10.0))]);
        host.add(
            "entry",
            vec![
                import_named("flags", &[("LIMIT", "LIMIT")]),
                export_const("n", bin(BinaryOp::Add, id_expr("LIMIT"), num(1.0))),
            ],
        );
        let compiler = compiler_with(host, &["entry"]);
        compiler.build().unwrap();
        let mut graph = compiler.context.module_graph.write().unwrap();

        let first = fold_module_graph(&mut graph);
        assert_eq!(first, 2);
        let info = graph.get_module(&"entry".into()).unwrap().info();
        assert_eq!(var_init(&info.ast.stmts[1]), &num(11.0));

        let second = fold_module_graph(&mut graph);
        assert_eq!(second, 0);
    }

    #[test]
    fn test_import_cycle_blocks_const_inlining() {
        let mut host = MemoryHost::new();
        host.add(
            "a",
            vec![
                import_named("b", &[("B", "B")]),
                export_const("A", num(1.0)),
                const_decl("x", id_expr("B")),
            ],
        );
        host.add(
            "b",
            vec![
                import_named("a", &[("A", "A")]),
                export_const("B", num(2.0)),
            ],
        );
        let compiler = compiler_with(host, &["a"]);
        compiler.build().unwrap();
        let mut graph = compiler.context.module_graph.write().unwrap();

        let changed = fold_module_graph(&mut graph);
        assert_eq!(changed, 0);
        let info = graph.get_module(&"a".into()).unwrap().info();
        assert!(matches!(var_init(&info.ast.stmts[2]), Expr::Ident(_)));
    }

    #[test]
    fn test_eval_disables_substitution_and_inlining() {
        let mut host = MemoryHost::new();
        host.add("flags", vec![export_const("LIMIT", num(10.0))]);
        host.add(
            "entry",
            vec![
                import_named("flags", &[("LIMIT", "LIMIT")]),
                fn_decl("id", &["x"], vec![return_stmt(Some(id_expr("x")))]),
                expr_stmt(call("eval", vec![str_lit("LIMIT")])),
                const_decl("y", id_expr("LIMIT")),
                expr_stmt(call("id", vec![num(3.0)])),
            ],
        );
        let compiler = compiler_with(host, &["entry"]);
        compiler.build().unwrap();
        let mut graph = compiler.context.module_graph.write().unwrap();

        let changed = fold_module_graph(&mut graph);
        assert_eq!(changed, 0);
        let info = graph.get_module(&"entry".into()).unwrap().info();
        assert!(matches!(var_init(&info.ast.stmts[3]), Expr::Ident(_)));
        assert!(matches!(
            &info.ast.stmts[4],
            Stmt::Expr(stmt) if matches!(&stmt.expr, Expr::Call(_))
        ));
    }

    #[test]
    fn test_commonjs_modules_are_left_alone() {
        let mut host = MemoryHost::new();
        host.add(
            "entry",
            vec![expr_stmt(assign_to(
                member_expr(id_expr("exports"), "total"),
                bin(BinaryOp::Add, num(1.0), num(1.0)),
            ))],
        );
        let compiler = compiler_with(host, &["entry"]);
        compiler.build().unwrap();
        let mut graph = compiler.context.module_graph.write().unwrap();

        let changed = fold_module_graph(&mut graph);
        assert_eq!(changed, 0);
    }
}

//! Applies marking results to module bodies: statement removal, specifier
//! and declarator strips, unreachable-tail truncation, and the liveness
//! bookkeeping later phases read.

use std::collections::HashSet;

use crate::ast::bind::SymbolId;
use crate::ast::visit::{self, Visit, VisitMut};
use crate::ast::{
    ArrowBody, Class, Decl, Expr, ForInit, Function, Ident, Pat, Span, Stmt, VarDecl, VarDeclKind,
    VarDeclarator,
};
use crate::build::record_keys;
use crate::module::{DceMarker, DceReason, ModuleId, ModuleKind, ResolveKind};
use crate::module_graph::ModuleGraph;
use crate::tree_shaking::module::ShakeModule;
use crate::tree_shaking::statement_graph::{
    has_pure_marked_call, DeclaratorInfo, Statement, StatementId, UsedStatement, UsedStatements,
};

enum SweepPlan {
    Dead,
    WholeLive,
    Live(UsedStatements),
}

/// Rewrites every module body down to the statements the marking kept.
/// Returns the number of removed or rewritten statements plus newly dead
/// modules.
pub(crate) fn sweep(module_graph: &mut ModuleGraph, states: &[ShakeModule]) -> usize {
    let mut plans: Vec<SweepPlan> = Vec::with_capacity(states.len());
    for state in states {
        let plan = if !state.reached {
            SweepPlan::Dead
        } else if state.kind != ModuleKind::Esm {
            SweepPlan::WholeLive
        } else {
            let (used, _) = state.used_statements(module_graph);
            SweepPlan::Live(used)
        };
        plans.push(plan);
    }

    let mut changed = 0;
    for (state, plan) in states.iter().zip(plans) {
        match plan {
            SweepPlan::Dead => changed += sweep_dead(module_graph, state),
            SweepPlan::WholeLive => sweep_whole(module_graph, state),
            SweepPlan::Live(used) => changed += sweep_live(module_graph, state, used),
        }
    }
    changed
}

fn sweep_dead(module_graph: &mut ModuleGraph, state: &ShakeModule) -> usize {
    let module = module_graph.get_module_mut(&state.module_id).unwrap();
    let info = module.info_mut();
    if !info.live {
        return 0;
    }
    info.live = false;
    let mut markers: Vec<DceMarker> = info
        .dce_markers
        .iter()
        .filter(|m| !m.kept)
        .cloned()
        .collect();
    markers.extend(info.ast.stmts.iter().map(|stmt| DceMarker {
        start: stmt.span().lo,
        end: stmt.span().hi,
        kept: false,
        reason: DceReason::Unreferenced,
    }));
    markers.sort_by_key(|m| (m.start, m.end));
    info.dce_markers = markers;
    let ids: Vec<SymbolId> = info.symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        info.symbols.symbol_mut(id).live = false;
    }
    1
}

fn sweep_whole(module_graph: &mut ModuleGraph, state: &ShakeModule) {
    let module = module_graph.get_module_mut(&state.module_id).unwrap();
    let info = module.info_mut();
    info.live = true;
    info.dce_markers = info
        .ast
        .stmts
        .iter()
        .map(|stmt| DceMarker {
            start: stmt.span().lo,
            end: stmt.span().hi,
            kept: true,
            reason: DceReason::Reachable,
        })
        .collect();
    let ids: Vec<SymbolId> = info.symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        info.symbols.symbol_mut(id).live = true;
    }
}

fn sweep_live(
    module_graph: &mut ModuleGraph,
    state: &ShakeModule,
    used: UsedStatements,
) -> usize {
    let mut changed = 0;
    let module = module_graph.get_module_mut(&state.module_id).unwrap();
    let info = module.info_mut();
    info.live = true;

    // Removal history accumulates across passes; keep markers are
    // rewritten from scratch each time.
    let mut markers: Vec<DceMarker> = info
        .dce_markers
        .iter()
        .filter(|m| !m.kept)
        .cloned()
        .collect();

    let stmts = std::mem::take(&mut info.ast.stmts);
    let mut kept: Vec<(StatementId, Stmt)> = Vec::new();
    for (id, mut stmt) in stmts.into_iter().enumerate() {
        let Some(demand) = used.get(&id) else {
            changed += 1;
            markers.push(DceMarker {
                start: stmt.span().lo,
                end: stmt.span().hi,
                kept: false,
                reason: if has_pure_marked_call(&stmt) {
                    DceReason::PragmaForced
                } else {
                    DceReason::Unreferenced
                },
            });
            continue;
        };
        if strip_statement(&mut stmt, state.stmt_graph.stmt(id), demand) {
            changed += 1;
            markers.push(DceMarker {
                start: stmt.span().lo,
                end: stmt.span().hi,
                kept: false,
                reason: DceReason::Unreferenced,
            });
            continue;
        }
        kept.push((id, stmt));
    }

    // Nothing after an unconditional terminator runs; only hoisted
    // declarations and module linkage survive past it.
    if let Some(cut) = kept.iter().position(|(_, stmt)| is_terminator(stmt)) {
        let tail = kept.split_off(cut + 1);
        for (id, stmt) in tail {
            match hoisted_form(&stmt) {
                Hoisted::Keep => kept.push((id, stmt)),
                Hoisted::Rewritten(rewritten) => {
                    changed += 1;
                    kept.push((id, rewritten));
                }
                Hoisted::Removed => {
                    changed += 1;
                    markers.push(DceMarker {
                        start: stmt.span().lo,
                        end: stmt.span().hi,
                        kept: false,
                        reason: DceReason::Unreachable,
                    });
                }
            }
        }
    }

    let mut truncator = Truncator { changed: 0 };
    for (_, stmt) in kept.iter_mut() {
        truncator.visit_mut_stmt(stmt);
    }
    changed += truncator.changed;

    let mut live_symbols = LiveSymbols {
        live: HashSet::new(),
    };
    for (id, stmt) in &kept {
        markers.push(DceMarker {
            start: stmt.span().lo,
            end: stmt.span().hi,
            kept: true,
            reason: used[id].reason,
        });
        live_symbols.visit_stmt(stmt);
        // Anonymous default exports carry their symbol outside any ident.
        if let Stmt::ExportDefault(export) = stmt {
            if let Some(symbol) = export.symbol {
                live_symbols.live.insert(symbol);
            }
        }
    }
    markers.sort_by_key(|m| (m.start, m.end));

    info.ast.stmts = kept.into_iter().map(|(_, stmt)| stmt).collect();
    info.dce_markers = markers;
    let ids: Vec<SymbolId> = info.symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        let live = live_symbols.live.contains(&id);
        info.symbols.symbol_mut(id).live = live;
    }
    changed
}

/// Drops graph edges whose backing records no longer exist in the swept
/// bodies, and every outgoing edge of a dead module.
pub(crate) fn reconcile_edges(module_graph: &mut ModuleGraph) -> usize {
    let mut stale: Vec<(ModuleId, ModuleId, ResolveKind)> = Vec::new();
    for module in module_graph.get_modules() {
        let info = module.info();
        if !info.live {
            for (to, dep) in module_graph.get_dependencies(&module.id) {
                stale.push((module.id.clone(), to.clone(), dep.resolve_kind));
            }
            continue;
        }
        if info.kind != ModuleKind::Esm {
            continue;
        }
        let keys = record_keys(&info.ast, info.kind);
        for (to, dep) in module_graph.get_dependencies(&module.id) {
            if !keys.contains(&(dep.source.clone(), dep.resolve_kind)) {
                stale.push((module.id.clone(), to.clone(), dep.resolve_kind));
            }
        }
    }
    let count = stale.len();
    for (from, to, kind) in stale {
        module_graph.remove_dependency(&from, &to, kind);
    }
    count
}

/// Reduces a kept statement to its demanded parts. Returns true when
/// nothing of it remains.
fn strip_statement(stmt: &mut Stmt, snapshot: &Statement, demand: &UsedStatement) -> bool {
    match stmt {
        Stmt::Import(import) => {
            import.specifiers.retain(|spec| match spec.local().symbol {
                Some(symbol) => demand.needed.contains(&symbol),
                None => false,
            });
            false
        }
        Stmt::ExportNamed(export) => {
            if !demand.all_exports {
                export
                    .specifiers
                    .retain(|spec| demand.export_names.contains(spec.exported_name()));
            }
            false
        }
        Stmt::Decl(Decl::Var(var)) => strip_var(var, &snapshot.declarators, &demand.needed),
        Stmt::ExportDecl(export) => {
            if let Decl::Var(var) = &mut export.decl {
                strip_var(var, &snapshot.declarators, &demand.needed)
            } else {
                false
            }
        }
        _ => false,
    }
}

fn strip_var(
    var: &mut VarDecl,
    declarators: &[DeclaratorInfo],
    needed: &HashSet<SymbolId>,
) -> bool {
    debug_assert_eq!(var.decls.len(), declarators.len());
    let mut index = 0;
    var.decls.retain(|_| {
        let keep = declarators[index]
            .symbols
            .iter()
            .any(|symbol| needed.contains(symbol));
        index += 1;
        keep
    });
    var.decls.is_empty()
}

fn is_terminator(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Return(_) | Stmt::Throw(_) | Stmt::Break(_) | Stmt::Continue(_)
    )
}

#[derive(Debug)]
pub(crate) enum Hoisted {
    Keep,
    Rewritten(Stmt),
    Removed,
}

/// What remains of a statement that sits past a terminator. Module linkage
/// and function declarations stay whole, `var` names survive as bare
/// declarations, everything else vanishes.
pub(crate) fn hoisted_form(stmt: &Stmt) -> Hoisted {
    match stmt {
        Stmt::Import(_)
        | Stmt::ExportDecl(_)
        | Stmt::ExportNamed(_)
        | Stmt::ExportDefault(_)
        | Stmt::ExportStar(_)
        | Stmt::Decl(Decl::Fn(_)) => Hoisted::Keep,
        Stmt::Decl(Decl::Var(var)) if var.kind == VarDeclKind::Var => {
            if var
                .decls
                .iter()
                .all(|declarator| declarator.init.is_none() && !declarator.name.is_complex())
            {
                return Hoisted::Keep;
            }
            let mut idents = Vec::new();
            for declarator in &var.decls {
                pat_idents(&declarator.name, &mut idents);
            }
            hoisted_var(idents, var.span)
        }
        _ => {
            let mut collector = HoistedIdents { idents: Vec::new() };
            collector.visit_stmt(stmt);
            hoisted_var(collector.idents, stmt.span())
        }
    }
}

fn hoisted_var(idents: Vec<Ident>, span: Span) -> Hoisted {
    if idents.is_empty() {
        return Hoisted::Removed;
    }
    let decls = idents
        .into_iter()
        .map(|ident| VarDeclarator {
            span: ident.span,
            name: Pat::Ident(ident),
            init: None,
        })
        .collect();
    Hoisted::Rewritten(Stmt::Decl(Decl::Var(VarDecl {
        kind: VarDeclKind::Var,
        decls,
        span,
    })))
}

fn pat_idents(pat: &Pat, out: &mut Vec<Ident>) {
    match pat {
        Pat::Ident(ident) => out.push(ident.clone()),
        Pat::Assign(assign) => pat_idents(&assign.pat, out),
        Pat::Rest(rest) => pat_idents(rest, out),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_idents(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                if let Some(value) = &prop.value {
                    pat_idents(value, out);
                }
            }
            if let Some(rest) = &object.rest {
                pat_idents(rest, out);
            }
        }
    }
}

/// Names that `var` declarations under a statement hoist past it, without
/// descending into nested function bodies.
struct HoistedIdents {
    idents: Vec<Ident>,
}

impl HoistedIdents {
    fn add_var_decl(&mut self, decl: &VarDecl) {
        if decl.kind != VarDeclKind::Var {
            return;
        }
        for declarator in &decl.decls {
            pat_idents(&declarator.name, &mut self.idents);
        }
    }
}

impl Visit for HoistedIdents {
    fn visit_stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Decl(Decl::Var(decl)) => self.add_var_decl(decl),
            Stmt::For(stmt) => {
                if let Some(ForInit::Var(decl)) = &stmt.init {
                    self.add_var_decl(decl);
                }
                self.visit_stmt(&stmt.body);
            }
            _ => visit::walk_stmt(self, s),
        }
    }

    fn visit_expr(&mut self, _e: &Expr) {}
    fn visit_function(&mut self, _f: &Function) {}
    fn visit_class(&mut self, _c: &Class) {}
}

/// Truncates nested statement lists after their first terminator.
struct Truncator {
    changed: usize,
}

impl Truncator {
    fn truncate(&mut self, stmts: &mut Vec<Stmt>) {
        let Some(cut) = stmts.iter().position(is_terminator) else {
            return;
        };
        if cut + 1 == stmts.len() {
            return;
        }
        let tail = stmts.split_off(cut + 1);
        for stmt in tail {
            match hoisted_form(&stmt) {
                Hoisted::Keep => stmts.push(stmt),
                Hoisted::Rewritten(rewritten) => {
                    self.changed += 1;
                    stmts.push(rewritten);
                }
                Hoisted::Removed => self.changed += 1,
            }
        }
    }
}

impl VisitMut for Truncator {
    fn visit_mut_stmt(&mut self, s: &mut Stmt) {
        if let Stmt::Block(block) = s {
            self.truncate(&mut block.stmts);
        }
        visit::walk_mut_stmt(self, s);
    }

    fn visit_mut_function(&mut self, f: &mut Function) {
        self.truncate(&mut f.body.stmts);
        visit::walk_mut_function(self, f);
    }

    fn visit_mut_expr(&mut self, e: &mut Expr) {
        if let Expr::Arrow(arrow) = e {
            if let ArrowBody::Block(block) = arrow.body.as_mut() {
                self.truncate(&mut block.stmts);
            }
        }
        visit::walk_mut_expr(self, e);
    }
}

/// Every symbol mentioned by a surviving statement stays live.
struct LiveSymbols {
    live: HashSet<SymbolId>,
}

impl Visit for LiveSymbols {
    fn visit_ident(&mut self, i: &Ident) {
        if let Some(symbol) = i.symbol {
            self.live.insert(symbol);
        }
    }
}

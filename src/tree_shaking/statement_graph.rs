//! Per-module statement dependency graph. Every top-level statement becomes
//! a node carrying the symbols it defines and reads; edges run from a reader
//! to the statements defining what it reads, labelled with the crossing
//! symbols. Liveness is a closure over these edges from a root set.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ast::bind::{SymbolId, SymbolTable};
use crate::ast::visit::{self, Visit};
use crate::ast::{
    self, BinaryOp, Callee, Class, ClassMemberBody, Decl, DefaultDecl, Expr, ForInit, Ident,
    MemberExpr, MemberProp, Pat, Prop, PropName, Span, Stmt, UnaryOp, VarDecl, VarDeclKind,
    VarDeclarator,
};
use crate::build::RecordCollector;
use crate::exports::ImportedName;
use crate::module::{DceReason, ModuleKind, ResolveKind};

pub type StatementId = usize;

/// Import statement facts: which local symbol stands for which name on the
/// source module.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    pub source: String,
    pub specifiers: Vec<(SymbolId, ImportedName)>,
}

/// One name an export statement makes visible.
#[derive(Debug, Clone)]
pub enum ProvidedExport {
    /// Binding declared in this module.
    Local {
        exported: String,
        symbol: Option<SymbolId>,
    },
    /// `export { orig as exported } from "source"`.
    Reexport { exported: String, orig: String },
    /// `export * as exported from "source"`.
    StarNamespace { exported: String },
}

impl ProvidedExport {
    pub fn exported(&self) -> &str {
        match self {
            ProvidedExport::Local { exported, .. }
            | ProvidedExport::Reexport { exported, .. }
            | ProvidedExport::StarNamespace { exported } => exported,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportInfo {
    pub source: Option<String>,
    pub provided: Vec<ProvidedExport>,
    /// Plain `export * from`, which provides names nobody can list here.
    pub star: bool,
}

/// Slice of a variable statement, so `const a = f(), b = g()` can keep `a`
/// without keeping `g()`.
#[derive(Debug, Clone)]
pub struct DeclaratorInfo {
    pub symbols: Vec<SymbolId>,
    pub used: HashSet<SymbolId>,
    pub effectful: bool,
}

#[derive(Debug)]
pub struct Statement {
    pub id: StatementId,
    /// Module-scope symbols this statement declares, hoisted `var`s
    /// included.
    pub defined: HashSet<SymbolId>,
    /// Module-scope symbols read or written anywhere inside it.
    pub used: HashSet<SymbolId>,
    pub declarators: Vec<DeclaratorInfo>,
    /// Runs observable work when the module evaluates.
    pub is_self_executed: bool,
    pub import: Option<ImportInfo>,
    pub export: Option<ExportInfo>,
    /// Dynamic import and worker records anywhere inside the statement.
    pub records: Vec<(String, ResolveKind)>,
    pub span: Span,
}

#[derive(Debug)]
pub struct StatementGraphEdge {
    pub symbols: HashSet<SymbolId>,
}

pub struct StatementGraph {
    graph: Graph<Statement, StatementGraphEdge>,
    id_index_map: HashMap<StatementId, NodeIndex>,
}

impl StatementGraph {
    pub fn new(module: &ast::Module, symbols: &SymbolTable) -> Self {
        let mut graph = Graph::new();
        let mut id_index_map = HashMap::new();
        for (id, stmt) in module.stmts.iter().enumerate() {
            let index = graph.add_node(analyze_stmt(id, stmt, symbols));
            id_index_map.insert(id, index);
        }

        let mut definers: HashMap<SymbolId, Vec<StatementId>> = HashMap::new();
        for index in graph.node_indices() {
            let stmt = &graph[index];
            for symbol in &stmt.defined {
                definers.entry(*symbol).or_default().push(stmt.id);
            }
        }

        let mut edges: HashMap<(StatementId, StatementId), HashSet<SymbolId>> = HashMap::new();
        for index in graph.node_indices() {
            let stmt = &graph[index];
            for symbol in &stmt.used {
                for definer in definers.get(symbol).into_iter().flatten() {
                    if *definer != stmt.id {
                        edges
                            .entry((stmt.id, *definer))
                            .or_default()
                            .insert(*symbol);
                    }
                }
            }
        }
        for ((from, to), symbols) in edges {
            graph.add_edge(
                id_index_map[&from],
                id_index_map[&to],
                StatementGraphEdge { symbols },
            );
        }

        Self {
            graph,
            id_index_map,
        }
    }

    /// Graph with no statements, for modules that are not shaken
    /// statement-wise.
    pub fn empty() -> Self {
        Self {
            graph: Graph::new(),
            id_index_map: HashMap::new(),
        }
    }

    pub fn stmts(&self) -> impl Iterator<Item = &Statement> + '_ {
        self.graph.node_indices().map(|index| &self.graph[index])
    }

    pub fn stmt(&self, id: StatementId) -> &Statement {
        &self.graph[*self.id_index_map.get(&id).unwrap()]
    }

    pub fn dependencies(&self, id: StatementId) -> Vec<(&Statement, &StatementGraphEdge)> {
        let index = *self.id_index_map.get(&id).unwrap();
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (&self.graph[edge.target()], edge.weight()))
            .collect()
    }

    /// Closes the root set over def-use edges. A demanded declarator pulls
    /// only the symbols its own initializer reads, and a demanded export
    /// specifier pulls only the binding behind its exported name.
    pub fn analyze_used(&self, mut used: UsedStatements) -> UsedStatements {
        let mut queue: VecDeque<StatementId> = used.keys().copied().collect();
        while let Some(id) = queue.pop_front() {
            let stmt = self.stmt(id);
            let pulled = pulled_symbols(stmt, &used[&id]);
            for (dep, edge) in self.dependencies(id) {
                let request: Vec<SymbolId> =
                    edge.symbols.intersection(&pulled).copied().collect();
                if request.is_empty() {
                    continue;
                }
                match used.entry(dep.id) {
                    Entry::Occupied(mut entry) => {
                        let state = entry.get_mut();
                        let before = state.needed.len();
                        state.needed.extend(request);
                        if state.needed.len() > before {
                            queue.push_back(dep.id);
                        }
                    }
                    Entry::Vacant(entry) => {
                        let mut state = UsedStatement::new(DceReason::Reachable);
                        state.needed.extend(request);
                        entry.insert(state);
                        queue.push_back(dep.id);
                    }
                }
            }
        }
        used
    }
}

/// Keep decision for one statement: why it stays and which of its symbols
/// and export names are demanded.
#[derive(Debug, Clone)]
pub struct UsedStatement {
    pub needed: HashSet<SymbolId>,
    pub reason: DceReason,
    pub export_names: HashSet<String>,
    pub all_exports: bool,
}

impl UsedStatement {
    pub fn new(reason: DceReason) -> Self {
        Self {
            needed: HashSet::new(),
            reason,
            export_names: HashSet::new(),
            all_exports: false,
        }
    }
}

pub type UsedStatements = HashMap<StatementId, UsedStatement>;

/// The symbols a kept statement actually reads, given what is demanded of
/// it. Ground truth for which edges to follow out of the statement.
pub(crate) fn pulled_symbols(stmt: &Statement, used: &UsedStatement) -> HashSet<SymbolId> {
    if let Some(export) = &stmt.export {
        // `export { a as x, b as y }` reads only the bindings behind the
        // demanded names.
        if export.source.is_none() && stmt.defined.is_empty() && !export.provided.is_empty() {
            if used.all_exports {
                return stmt.used.clone();
            }
            let mut pulled = HashSet::new();
            for provided in &export.provided {
                if let ProvidedExport::Local {
                    exported,
                    symbol: Some(symbol),
                } = provided
                {
                    if used.export_names.contains(exported) {
                        pulled.insert(*symbol);
                    }
                }
            }
            return pulled;
        }
    }
    if !stmt.declarators.is_empty() {
        let mut pulled = HashSet::new();
        for declarator in &stmt.declarators {
            if declarator.symbols.iter().any(|s| used.needed.contains(s)) {
                pulled.extend(declarator.used.iter().copied());
            }
        }
        return pulled;
    }
    stmt.used.clone()
}

fn analyze_stmt(id: StatementId, stmt: &Stmt, symbols: &SymbolTable) -> Statement {
    let mut out = Statement {
        id,
        defined: HashSet::new(),
        used: HashSet::new(),
        declarators: Vec::new(),
        is_self_executed: false,
        import: None,
        export: None,
        records: collect_records(stmt),
        span: stmt.span(),
    };
    match stmt {
        Stmt::Import(import) => {
            let mut specifiers = Vec::new();
            for spec in &import.specifiers {
                let Some(symbol) = spec.local().symbol else {
                    continue;
                };
                out.defined.insert(symbol);
                let imported = match spec.imported_name() {
                    Some(name) => ImportedName::Named(name.to_string()),
                    None => ImportedName::Namespace,
                };
                specifiers.push((symbol, imported));
            }
            out.import = Some(ImportInfo {
                source: import.source.clone(),
                specifiers,
            });
        }
        Stmt::ExportDecl(export) => {
            analyze_decl(&export.decl, symbols, &mut out);
            out.export = Some(ExportInfo {
                source: None,
                provided: decl_provides(&export.decl),
                star: false,
            });
        }
        Stmt::ExportNamed(export) => {
            let mut provided = Vec::new();
            for spec in &export.specifiers {
                let exported = spec.exported_name().to_string();
                if export.source.is_some() {
                    provided.push(ProvidedExport::Reexport {
                        exported,
                        orig: spec.orig.sym.clone(),
                    });
                } else {
                    if let Some(symbol) = spec.orig.symbol {
                        if symbols.symbol(symbol).top_level {
                            out.used.insert(symbol);
                        }
                    }
                    provided.push(ProvidedExport::Local {
                        exported,
                        symbol: spec.orig.symbol,
                    });
                }
            }
            out.export = Some(ExportInfo {
                source: export.source.clone(),
                provided,
                star: false,
            });
        }
        Stmt::ExportDefault(export) => {
            if let Some(symbol) = export.symbol {
                out.defined.insert(symbol);
            }
            let mut collector = UsedSymbols::new(symbols);
            match &export.decl {
                DefaultDecl::Fn(f) => collector.visit_function(&f.function),
                DefaultDecl::Class(c) => {
                    collector.visit_class(&c.class);
                    out.is_self_executed = class_has_effects(&c.class);
                }
                DefaultDecl::Expr(e) => {
                    collector.visit_expr(e);
                    out.is_self_executed = expr_has_effects(e);
                }
            }
            out.used = collector.used;
            out.export = Some(ExportInfo {
                source: None,
                provided: vec![ProvidedExport::Local {
                    exported: "default".to_string(),
                    symbol: export.symbol,
                }],
                star: false,
            });
        }
        Stmt::ExportStar(export) => {
            out.export = Some(match &export.alias {
                Some(alias) => ExportInfo {
                    source: Some(export.source.clone()),
                    provided: vec![ProvidedExport::StarNamespace {
                        exported: alias.sym.clone(),
                    }],
                    star: false,
                },
                None => ExportInfo {
                    source: Some(export.source.clone()),
                    provided: Vec::new(),
                    star: true,
                },
            });
        }
        Stmt::Decl(decl) => analyze_decl(decl, symbols, &mut out),
        _ => {
            let mut hoisted = HoistedVars::new(symbols);
            hoisted.visit_stmt(stmt);
            out.defined = hoisted.defined;
            let mut collector = UsedSymbols::new(symbols);
            collector.visit_stmt(stmt);
            out.used = collector.used;
            out.is_self_executed = stmt_has_effects(stmt);
        }
    }
    out
}

fn analyze_decl(decl: &Decl, symbols: &SymbolTable, out: &mut Statement) {
    match decl {
        Decl::Var(var) => {
            for declarator in &var.decls {
                let mut info = DeclaratorInfo {
                    symbols: Vec::new(),
                    used: HashSet::new(),
                    effectful: declarator_has_effects(declarator),
                };
                collect_pat_symbols(&declarator.name, symbols, &mut info.symbols);
                let mut collector = UsedSymbols::new(symbols);
                collector.visit_pat(&declarator.name);
                if let Some(init) = &declarator.init {
                    collector.visit_expr(init);
                }
                info.used = collector.used;
                out.defined.extend(info.symbols.iter().copied());
                out.used.extend(info.used.iter().copied());
                if info.effectful {
                    out.is_self_executed = true;
                }
                out.declarators.push(info);
            }
        }
        Decl::Fn(f) => {
            if let Some(symbol) = f.ident.symbol {
                out.defined.insert(symbol);
            }
            let mut collector = UsedSymbols::new(symbols);
            collector.visit_function(&f.function);
            out.used = collector.used;
        }
        Decl::Class(c) => {
            if let Some(symbol) = c.ident.symbol {
                out.defined.insert(symbol);
            }
            let mut collector = UsedSymbols::new(symbols);
            collector.visit_class(&c.class);
            out.used = collector.used;
            out.is_self_executed = class_has_effects(&c.class);
        }
    }
}

fn decl_provides(decl: &Decl) -> Vec<ProvidedExport> {
    match decl {
        Decl::Var(var) => {
            let mut provided = Vec::new();
            for declarator in &var.decls {
                collect_pat_provides(&declarator.name, &mut provided);
            }
            provided
        }
        Decl::Fn(f) => vec![ProvidedExport::Local {
            exported: f.ident.sym.clone(),
            symbol: f.ident.symbol,
        }],
        Decl::Class(c) => vec![ProvidedExport::Local {
            exported: c.ident.sym.clone(),
            symbol: c.ident.symbol,
        }],
    }
}

fn collect_pat_provides(pat: &Pat, out: &mut Vec<ProvidedExport>) {
    match pat {
        Pat::Ident(ident) => out.push(ProvidedExport::Local {
            exported: ident.sym.clone(),
            symbol: ident.symbol,
        }),
        Pat::Assign(assign) => collect_pat_provides(&assign.pat, out),
        Pat::Rest(rest) => collect_pat_provides(rest, out),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_provides(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                if let Some(value) = &prop.value {
                    collect_pat_provides(value, out);
                }
            }
            if let Some(rest) = &object.rest {
                collect_pat_provides(rest, out);
            }
        }
    }
}

fn collect_pat_symbols(pat: &Pat, symbols: &SymbolTable, out: &mut Vec<SymbolId>) {
    match pat {
        Pat::Ident(ident) => {
            if let Some(id) = ident.symbol {
                if symbols.symbol(id).top_level {
                    out.push(id);
                }
            }
        }
        Pat::Assign(assign) => collect_pat_symbols(&assign.pat, symbols, out),
        Pat::Rest(rest) => collect_pat_symbols(rest, symbols, out),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_pat_symbols(elem, symbols, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                if let Some(value) = &prop.value {
                    collect_pat_symbols(value, symbols, out);
                }
            }
            if let Some(rest) = &object.rest {
                collect_pat_symbols(rest, symbols, out);
            }
        }
    }
}

fn collect_records(stmt: &Stmt) -> Vec<(String, ResolveKind)> {
    let mut collector = RecordCollector::new(ModuleKind::Esm);
    collector.visit_stmt(stmt);
    collector
        .records
        .into_iter()
        .filter(|record| {
            matches!(
                record.kind,
                ResolveKind::DynamicImport | ResolveKind::Worker
            )
        })
        .map(|record| (record.source, record.kind))
        .collect()
}

/// Module-scope symbols an AST fragment mentions. Binding positions resolve
/// to the fragment's own declarations and fall out as self-edges, which the
/// graph skips.
struct UsedSymbols<'a> {
    symbols: &'a SymbolTable,
    used: HashSet<SymbolId>,
}

impl<'a> UsedSymbols<'a> {
    fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            used: HashSet::new(),
        }
    }
}

impl Visit for UsedSymbols<'_> {
    fn visit_ident(&mut self, i: &Ident) {
        if let Some(id) = i.symbol {
            if self.symbols.symbol(id).top_level {
                self.used.insert(id);
            }
        }
    }
}

/// `var` names a nested statement hoists into module scope. These count as
/// definitions of the statement that contains them.
struct HoistedVars<'a> {
    symbols: &'a SymbolTable,
    defined: HashSet<SymbolId>,
}

impl<'a> HoistedVars<'a> {
    fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            defined: HashSet::new(),
        }
    }

    fn add_var_decl(&mut self, decl: &VarDecl) {
        if decl.kind != VarDeclKind::Var {
            return;
        }
        let mut found = Vec::new();
        for declarator in &decl.decls {
            collect_pat_symbols(&declarator.name, self.symbols, &mut found);
        }
        self.defined.extend(found);
    }
}

impl Visit for HoistedVars<'_> {
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

    // `var` never hoists out of a function body.
    fn visit_expr(&mut self, _e: &Expr) {}
    fn visit_function(&mut self, _f: &ast::Function) {}
    fn visit_class(&mut self, _c: &Class) {}
}

/// Whether removing the whole statement could drop observable work.
pub(crate) fn stmt_has_effects(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(stmt) => expr_has_effects(&stmt.expr),
        Stmt::Block(block) => block.stmts.iter().any(stmt_has_effects),
        Stmt::If(stmt) => {
            expr_has_effects(&stmt.test)
                || stmt_has_effects(&stmt.cons)
                || stmt.alt.as_deref().map_or(false, stmt_has_effects)
        }
        // Loop bodies run an unknown number of times.
        Stmt::While(_) | Stmt::For(_) => true,
        Stmt::Return(_) | Stmt::Throw(_) | Stmt::Break(_) | Stmt::Continue(_) => true,
        Stmt::Empty(_) => false,
        Stmt::Decl(decl) => decl_has_effects(decl),
        // Import and export forms have their own liveness rules.
        Stmt::Import(_)
        | Stmt::ExportDecl(_)
        | Stmt::ExportNamed(_)
        | Stmt::ExportDefault(_)
        | Stmt::ExportStar(_) => false,
    }
}

pub(crate) fn decl_has_effects(decl: &Decl) -> bool {
    match decl {
        Decl::Var(var) => var.decls.iter().any(declarator_has_effects),
        Decl::Fn(_) => false,
        Decl::Class(c) => class_has_effects(&c.class),
    }
}

/// Destructuring counts as effectful: binding it walks the value and can
/// trigger getters.
pub(crate) fn declarator_has_effects(declarator: &VarDeclarator) -> bool {
    declarator.name.is_complex()
        || declarator.init.as_ref().map_or(false, expr_has_effects)
}

/// Conservative effect test: anything not recognized as pure counts as
/// effectful. Calls and constructions only pass when `@__PURE__`-marked.
pub(crate) fn expr_has_effects(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) | Expr::Lit(_) | Expr::Fn(_) | Expr::Arrow(_) | Expr::MetaProp(_) => false,
        Expr::Tpl(tpl) => tpl.exprs.iter().any(expr_has_effects),
        Expr::Unary(unary) => match unary.op {
            UnaryOp::Bang | UnaryOp::Void => expr_has_effects(&unary.arg),
            // `typeof x` on a bare name neither throws nor coerces.
            UnaryOp::TypeOf => unary.arg.as_ident().is_none(),
            UnaryOp::Minus | UnaryOp::Plus | UnaryOp::Tilde | UnaryOp::Delete => true,
        },
        Expr::Update(_) | Expr::Assign(_) => true,
        Expr::Bin(bin) => match bin.op {
            // These never coerce their operands.
            BinaryOp::EqEqEq
            | BinaryOp::NotEqEq
            | BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::NullishCoalescing => {
                expr_has_effects(&bin.left) || expr_has_effects(&bin.right)
            }
            _ => true,
        },
        Expr::Cond(cond) => {
            expr_has_effects(&cond.test)
                || expr_has_effects(&cond.cons)
                || expr_has_effects(&cond.alt)
        }
        Expr::Call(call) => {
            if !call.pure {
                return true;
            }
            match &call.callee {
                Callee::Import => true,
                Callee::Expr(callee) => {
                    expr_has_effects(callee)
                        || call
                            .args
                            .iter()
                            .any(|arg| arg.spread || expr_has_effects(&arg.expr))
                }
            }
        }
        Expr::New(new) => {
            !new.pure
                || expr_has_effects(&new.callee)
                || new
                    .args
                    .iter()
                    .any(|arg| arg.spread || expr_has_effects(&arg.expr))
        }
        Expr::Member(member) => member_has_effects(member),
        Expr::Seq(seq) => seq.exprs.iter().any(expr_has_effects),
        Expr::Object(object) => object.props.iter().any(|prop| match prop {
            Prop::KeyValue { key, value } => {
                prop_name_has_effects(key) || expr_has_effects(value)
            }
            Prop::Shorthand(_) => false,
            Prop::Method { key, .. } => prop_name_has_effects(key),
            Prop::Spread(_) => true,
        }),
        Expr::Array(array) => array
            .elems
            .iter()
            .flatten()
            .any(|elem| elem.spread || expr_has_effects(&elem.expr)),
        Expr::Class(class) => class_has_effects(&class.class),
    }
}

fn member_has_effects(member: &MemberExpr) -> bool {
    match &member.prop {
        MemberProp::Ident(_) => expr_has_effects(&member.obj),
        MemberProp::Computed(_) => true,
    }
}

fn prop_name_has_effects(name: &PropName) -> bool {
    match name {
        PropName::Computed(expr) => expr_has_effects(expr),
        _ => false,
    }
}

/// A class definition evaluates its heritage, computed keys and static
/// property initializers immediately.
pub(crate) fn class_has_effects(class: &Class) -> bool {
    if class
        .super_class
        .as_deref()
        .map_or(false, expr_has_effects)
    {
        return true;
    }
    class.members.iter().any(|member| {
        if prop_name_has_effects(&member.key) {
            return true;
        }
        match &member.body {
            ClassMemberBody::Method(_) => false,
            ClassMemberBody::Property(value) => {
                member.is_static && value.as_ref().map_or(false, expr_has_effects)
            }
        }
    })
}

/// Whether the statement contains any `@__PURE__`-marked call. Removal of
/// such a statement is forced by the annotation rather than plain
/// unreachability.
pub(crate) fn has_pure_marked_call(stmt: &Stmt) -> bool {
    struct Finder {
        found: bool,
    }
    impl Visit for Finder {
        fn visit_expr(&mut self, e: &Expr) {
            if self.found {
                return;
            }
            match e {
                Expr::Call(call) if call.pure => self.found = true,
                Expr::New(new) if new.pure => self.found = true,
                _ => visit::walk_expr(self, e),
            }
        }
    }
    let mut finder = Finder { found: false };
    finder.visit_stmt(stmt);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::bind::bind_module;
    use crate::ast::DUMMY_SP;
    use crate::test_helper::ast::*;

    fn graph_of(stmts: Vec<Stmt>) -> StatementGraph {
        let mut m = module(stmts);
        let symbols = bind_module(&mut m);
        StatementGraph::new(&m, &symbols)
    }

    fn single_defined(graph: &StatementGraph, id: StatementId) -> SymbolId {
        let defined = &graph.stmt(id).defined;
        assert_eq!(defined.len(), 1, "statement {} defines {:?}", id, defined);
        *defined.iter().next().unwrap()
    }

    #[test]
    fn test_edges_follow_symbol_reads() {
        let graph = graph_of(vec![
            const_decl("base", num(1.0)),
            const_decl("derived", bin(BinaryOp::Add, id_expr("base"), num(1.0))),
            export_named(&[("derived", "derived")]),
        ]);

        let deps = graph.dependencies(1);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.id, 0);
        let base = single_defined(&graph, 0);
        assert!(deps[0].1.symbols.contains(&base));

        let deps = graph.dependencies(2);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.id, 1);
    }

    #[test]
    fn test_import_statement_defines_locals() {
        let graph = graph_of(vec![
            import_named("./dep.js", &[("value", "value")]),
            export_const("twice", bin(BinaryOp::Mul, id_expr("value"), num(2.0))),
        ]);

        let import = graph.stmt(0);
        assert_eq!(import.defined.len(), 1);
        let info = import.import.as_ref().unwrap();
        assert_eq!(info.source, "./dep.js");
        assert_eq!(info.specifiers.len(), 1);
        assert_eq!(
            info.specifiers[0].1,
            ImportedName::Named("value".to_string())
        );

        let deps = graph.dependencies(1);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.id, 0);
    }

    #[test]
    fn test_export_statement_shapes() {
        let graph = graph_of(vec![
            reexport_named("./a.js", &[("orig", "renamed")]),
            export_star("./b.js"),
            export_star_as("./c.js", "ns"),
            export_default_expr(num(1.0)),
        ]);

        let reexport = graph.stmt(0).export.as_ref().unwrap();
        assert_eq!(reexport.source.as_deref(), Some("./a.js"));
        assert!(matches!(
            &reexport.provided[0],
            ProvidedExport::Reexport { exported, orig } if exported == "renamed" && orig == "orig"
        ));

        let star = graph.stmt(1).export.as_ref().unwrap();
        assert!(star.star);
        assert!(star.provided.is_empty());

        let star_as = graph.stmt(2).export.as_ref().unwrap();
        assert!(!star_as.star);
        assert!(matches!(
            &star_as.provided[0],
            ProvidedExport::StarNamespace { exported } if exported == "ns"
        ));

        let default = graph.stmt(3);
        assert_eq!(default.defined.len(), 1);
        assert!(matches!(
            &default.export.as_ref().unwrap().provided[0],
            ProvidedExport::Local { exported, symbol: Some(_) } if exported == "default"
        ));
    }

    #[test]
    fn test_self_executed_classification() {
        let graph = graph_of(vec![
            expr_stmt(call("boot", vec![])),
            expr_stmt(pure_call("styled", vec![str_lit("div")])),
            const_decl("config", call("load", vec![])),
            const_decl("limit", num(10.0)),
            fn_decl("helper", &[], vec![]),
            expr_stmt(un(UnaryOp::Bang, id_expr("flag"))),
        ]);

        assert!(graph.stmt(0).is_self_executed);
        assert!(!graph.stmt(1).is_self_executed);
        assert!(graph.stmt(2).is_self_executed);
        assert!(!graph.stmt(3).is_self_executed);
        assert!(!graph.stmt(4).is_self_executed);
        assert!(!graph.stmt(5).is_self_executed);
    }

    #[test]
    fn test_purity_rules() {
        assert!(expr_has_effects(&call("f", vec![])));
        assert!(!expr_has_effects(&pure_call("f", vec![id_expr("x")])));
        assert!(expr_has_effects(&spread_call("f", id_expr("xs"))));
        assert!(expr_has_effects(&assign(ident("x"), num(1.0))));
        assert!(expr_has_effects(&bin(
            BinaryOp::Add,
            id_expr("a"),
            id_expr("b")
        )));
        assert!(!expr_has_effects(&bin(
            BinaryOp::EqEqEq,
            id_expr("a"),
            id_expr("b")
        )));
        assert!(!expr_has_effects(&typeof_of(id_expr("window"))));
        assert!(expr_has_effects(&typeof_of(call("f", vec![]))));
        assert!(expr_has_effects(&un(UnaryOp::Minus, num(1.0))));
        assert!(!expr_has_effects(&member(id_expr("config"), "mode")));
        assert!(expr_has_effects(&Expr::Member(computed_member(
            id_expr("list"),
            num(0.0)
        ))));
        assert!(!expr_has_effects(&object_lit(vec![("a", num(1.0))])));
        assert!(expr_has_effects(&dynamic_import("./lazy.js")));
    }

    #[test]
    fn test_declarator_slices_track_their_own_reads() {
        let mut m = module(vec![
            fn_decl("f", &[], vec![]),
            fn_decl("g", &[], vec![]),
            Stmt::Decl(Decl::Var(VarDecl {
                kind: VarDeclKind::Const,
                decls: vec![
                    VarDeclarator {
                        name: Pat::Ident(ident("a")),
                        init: Some(call("f", vec![])),
                        span: DUMMY_SP,
                    },
                    VarDeclarator {
                        name: Pat::Ident(ident("b")),
                        init: Some(call("g", vec![])),
                        span: DUMMY_SP,
                    },
                ],
                span: DUMMY_SP,
            })),
        ]);
        let symbols = bind_module(&mut m);
        let graph = StatementGraph::new(&m, &symbols);

        let f = single_defined(&graph, 0);
        let g = single_defined(&graph, 1);
        let decl = graph.stmt(2);
        assert_eq!(decl.declarators.len(), 2);
        assert!(decl.declarators[0].used.contains(&f));
        assert!(!decl.declarators[0].used.contains(&g));
        assert!(decl.declarators[1].used.contains(&g));

        // Demanding `a` alone pulls `f` but leaves `g` unused.
        let a = decl.declarators[0].symbols[0];
        let mut roots = UsedStatements::new();
        let mut root = UsedStatement::new(DceReason::Reachable);
        root.needed.insert(a);
        roots.insert(2, root);
        let used = graph.analyze_used(roots);
        assert!(used.contains_key(&0));
        assert!(!used.contains_key(&1));
    }

    #[test]
    fn test_named_export_pulls_only_demanded_bindings() {
        let graph = graph_of(vec![
            const_decl("kept", num(1.0)),
            const_decl("dropped", num(2.0)),
            export_named(&[("kept", "kept"), ("dropped", "dropped")]),
        ]);

        let mut roots = UsedStatements::new();
        let mut root = UsedStatement::new(DceReason::Reachable);
        root.export_names.insert("kept".to_string());
        roots.insert(2, root);
        let used = graph.analyze_used(roots);
        assert!(used.contains_key(&0));
        assert!(!used.contains_key(&1));
        assert_eq!(used[&0].reason, DceReason::Reachable);
    }

    #[test]
    fn test_hoisted_var_counts_as_definition() {
        let graph = graph_of(vec![
            if_stmt(
                id_expr("cond"),
                var_decl(VarDeclKind::Var, "cached", Some(num(1.0))),
                None,
            ),
            export_const("value", id_expr("cached")),
        ]);

        assert_eq!(graph.stmt(0).defined.len(), 1);
        assert!(!graph.stmt(0).is_self_executed);
        let deps = graph.dependencies(1);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.id, 0);
    }

    #[test]
    fn test_records_found_in_nested_positions() {
        let graph = graph_of(vec![
            expr_stmt(dynamic_import("./lazy.js")),
            export_fn(
                "load",
                &[],
                vec![return_stmt(Some(dynamic_import("./deferred.js")))],
            ),
        ]);

        assert_eq!(
            graph.stmt(0).records,
            vec![("./lazy.js".to_string(), ResolveKind::DynamicImport)]
        );
        assert_eq!(
            graph.stmt(1).records,
            vec![("./deferred.js".to_string(), ResolveKind::DynamicImport)]
        );
    }

    #[test]
    fn test_pure_marked_call_detection() {
        assert!(has_pure_marked_call(&const_decl(
            "styled",
            pure_call("factory", vec![])
        )));
        assert!(!has_pure_marked_call(&const_decl(
            "plain",
            call("factory", vec![])
        )));
    }
}

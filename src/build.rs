use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use colored::Colorize;
use indexmap::IndexSet;
use rayon::ThreadPool;
use thiserror::Error;
use tracing::debug;

use crate::ast::bind::{bind_module, SymbolId};
use crate::ast::comments::stamp_pure_calls;
use crate::ast::visit::{walk_expr, walk_stmt, Visit};
use crate::ast::{
    self, Arg, AssignExpr, AssignTarget, Callee, Decl, Expr, Ident, Lit, MemberExpr, MemberProp,
    Pat, Prop, PropName, Span, Stmt,
};
use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::exports::{
    CjsExports, ExportBinding, ExportMap, ImportMap, ImportTarget, ImportedName,
};
use crate::host::{Loader, Parser, ParsedSource, Resolver};
use crate::module::{
    Dependency, Module, ModuleId, ModuleInfo, ModuleKind, PackageInfo, ResolveKind,
};
use crate::util::{content_hash, create_thread_pool};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{:}\n{:}", "Build failed.".to_string().red().to_string(), errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    BuildTasksError { errors: Vec<anyhow::Error> },
}

pub type ModuleDeps = Vec<(ModuleId, Dependency)>;

#[derive(Debug, Clone)]
pub struct Task {
    pub id: ModuleId,
    pub is_entry: bool,
}

impl Compiler {
    /// Builds the module graph from the configured entries. Modules are
    /// discovered breadth-first; each newly seen id is parsed, bound and
    /// resolved on the thread pool and merged here.
    pub fn build(&self) -> Result<HashSet<ModuleId>> {
        debug!("build");
        let mut tasks = vec![];
        for specifier in self.context.config.entry.values() {
            let resolved = self
                .resolver
                .resolve(specifier, None, ResolveKind::Import)
                .map_err(CompileError::Resolve)?;
            tasks.push(Task {
                id: resolved.id,
                is_entry: true,
            });
        }
        self.build_tasks(tasks)
    }

    pub fn build_tasks(&self, tasks: Vec<Task>) -> Result<HashSet<ModuleId>> {
        debug!("build tasks: {:?}", tasks);
        if tasks.is_empty() {
            return Ok(HashSet::new());
        }

        let (pool, rs, rr) = create_thread_pool::<Result<(Module, ModuleDeps)>>();
        let mut count = 0;
        let mut module_ids = HashSet::new();
        {
            // A placeholder in the graph marks the id as scheduled, so a
            // second discovery of the same id cannot spawn a second task.
            let mut module_graph = self.context.module_graph.write().unwrap();
            for task in tasks {
                if module_graph.has_module(&task.id) {
                    continue;
                }
                module_ids.insert(task.id.clone());
                module_graph.add_module(Module::new(task.id.clone(), task.is_entry, None));
                count += 1;
                self.build_with_pool(pool.clone(), task, rs.clone());
            }
        }
        if count == 0 {
            return Ok(module_ids);
        }

        let mut errors = vec![];
        for r in rr {
            count -= 1;
            let cancelled = self.context.is_cancelled();
            match r {
                Ok((module, deps)) if !cancelled => {
                    let mut module_graph = self.context.module_graph.write().unwrap();
                    let module_id = module.id.clone();
                    module_graph
                        .get_module_mut(&module_id)
                        .unwrap()
                        .add_info(module.info);

                    for (dep_module_id, dependency) in deps {
                        if !module_graph.has_module(&dep_module_id) {
                            module_ids.insert(dep_module_id.clone());
                            module_graph.add_module(Module::new(
                                dep_module_id.clone(),
                                false,
                                None,
                            ));
                            count += 1;
                            self.build_with_pool(
                                pool.clone(),
                                Task {
                                    id: dep_module_id.clone(),
                                    is_entry: false,
                                },
                                rs.clone(),
                            );
                        }
                        module_graph.add_dependency(&module_id, &dep_module_id, dependency);
                    }
                }
                Ok(_) => {}
                Err(err) => errors.push(err),
            }
            if count == 0 {
                break;
            }
        }
        debug!("build tasks done");
        drop(rs);

        if self.context.is_cancelled() {
            return Err(anyhow!(CompileError::Cancelled));
        }
        if !errors.is_empty() {
            return Err(anyhow!(BuildError::BuildTasksError { errors }));
        }

        Ok(module_ids)
    }

    fn build_with_pool(
        &self,
        pool: Arc<ThreadPool>,
        task: Task,
        rs: Sender<Result<(Module, ModuleDeps)>>,
    ) {
        let parser = self.parser.clone();
        let resolver = self.resolver.clone();
        let loader = self.loader.clone();
        pool.spawn(move || {
            let result = build_module(&*parser, &*resolver, &*loader, task);
            rs.send(result).unwrap();
        });
    }
}

/// Loads, parses, binds and resolves one module. Pure with respect to the
/// graph: the coordinator merges the result.
pub fn build_module(
    parser: &dyn Parser,
    resolver: &dyn Resolver,
    loader: &dyn Loader,
    task: Task,
) -> Result<(Module, ModuleDeps)> {
    let loaded = loader.load(&task.id)?;
    let raw_hash = content_hash(&loaded.source);

    // JSON and assets are opaque leaves with a default-only surface.
    if !loaded.kind.is_script() {
        let info = ModuleInfo {
            ast: ast::Module::default(),
            symbols: Default::default(),
            exports: ExportMap::default(),
            imports: ImportMap::default(),
            kind: loaded.kind,
            path: task.id.id.clone(),
            package: loaded.package,
            raw_hash,
            live: true,
            dce_markers: vec![],
        };
        return Ok((Module::new(task.id, task.is_entry, Some(info)), vec![]));
    }

    let ParsedSource {
        module: mut module_ast,
        comments,
    } = parser.parse(&loaded.source, &task.id.id)?;
    stamp_pure_calls(&mut module_ast, &comments);
    let symbols = bind_module(&mut module_ast);

    let mut cjs_scan = CjsScan::default();
    cjs_scan.visit_module(&module_ast);
    let kind = classify_kind(&module_ast, loaded.kind, loaded.package.as_ref(), &cjs_scan);

    let mut collector = RecordCollector::new(kind);
    collector.visit_module(&module_ast);

    let mut deps: ModuleDeps = vec![];
    let mut resolved: HashMap<(String, ResolveKind), ModuleId> = HashMap::new();
    for (order, record) in collector.records.into_iter().enumerate() {
        let target = resolver
            .resolve(&record.source, Some(&task.id), record.kind)
            .map_err(CompileError::Resolve)?;
        resolved.insert((record.source.clone(), record.kind), target.id.clone());
        deps.push((
            target.id,
            Dependency {
                source: record.source,
                resolve_kind: record.kind,
                order,
                span: record.span,
            },
        ));
    }

    let (exports, imports) = extract_records(&module_ast, kind, &cjs_scan, &resolved);

    let info = ModuleInfo {
        ast: module_ast,
        symbols,
        exports,
        imports,
        kind,
        path: task.id.id.clone(),
        package: loaded.package,
        raw_hash,
        live: true,
        dce_markers: vec![],
    };
    Ok((Module::new(task.id, task.is_entry, Some(info)), deps))
}

fn classify_kind(
    ast: &ast::Module,
    hint: ModuleKind,
    package: Option<&PackageInfo>,
    scan: &CjsScan,
) -> ModuleKind {
    if hint == ModuleKind::Cjs {
        return ModuleKind::Cjs;
    }
    if has_esm_syntax(ast) {
        return ModuleKind::Esm;
    }
    if scan.uses_cjs_globals || package.is_some_and(|p| p.is_commonjs()) {
        return ModuleKind::Cjs;
    }
    ModuleKind::Esm
}

fn has_esm_syntax(ast: &ast::Module) -> bool {
    ast.stmts.iter().any(|stmt| {
        matches!(
            stmt,
            Stmt::Import(_)
                | Stmt::ExportDecl(_)
                | Stmt::ExportNamed(_)
                | Stmt::ExportDefault(_)
                | Stmt::ExportStar(_)
        )
    })
}

pub(crate) fn is_free(ident: &Ident, name: &str) -> bool {
    ident.symbol.is_none() && ident.sym == name
}

/// Builds the export and import surfaces once every record has a resolved
/// target.
fn extract_records(
    ast: &ast::Module,
    kind: ModuleKind,
    cjs_scan: &CjsScan,
    resolved: &HashMap<(String, ResolveKind), ModuleId>,
) -> (ExportMap, ImportMap) {
    let mut exports = ExportMap::default();
    let mut imports = ImportMap::default();
    for stmt in &ast.stmts {
        match stmt {
            Stmt::Import(import) => {
                let key = (import.source.clone(), ResolveKind::Import);
                let Some(source_id) = resolved.get(&key) else {
                    continue;
                };
                for spec in &import.specifiers {
                    let Some(symbol) = spec.local().symbol else {
                        continue;
                    };
                    let imported = match spec.imported_name() {
                        Some(name) => ImportedName::Named(name.to_string()),
                        None => ImportedName::Namespace,
                    };
                    imports.insert(
                        symbol,
                        ImportTarget {
                            source: source_id.clone(),
                            imported,
                        },
                    );
                }
            }
            Stmt::ExportDecl(export) => {
                for (name, symbol) in decl_bound_names(&export.decl) {
                    exports.insert(name, ExportBinding::Local(symbol));
                }
            }
            Stmt::ExportNamed(export) => match &export.source {
                Some(source) => {
                    let key = (source.clone(), ResolveKind::ExportFrom);
                    let Some(source_id) = resolved.get(&key) else {
                        continue;
                    };
                    for spec in &export.specifiers {
                        exports.insert(
                            spec.exported_name(),
                            ExportBinding::Reexport {
                                source: source_id.clone(),
                                name: spec.orig.sym.clone(),
                            },
                        );
                    }
                }
                None => {
                    for spec in &export.specifiers {
                        if let Some(symbol) = spec.orig.symbol {
                            exports.insert(spec.exported_name(), ExportBinding::Local(symbol));
                        }
                    }
                }
            },
            Stmt::ExportDefault(export) => {
                if let Some(symbol) = export.symbol {
                    exports.insert("default", ExportBinding::Local(symbol));
                }
            }
            Stmt::ExportStar(export) => {
                let key = (export.source.clone(), ResolveKind::ExportFrom);
                let Some(source_id) = resolved.get(&key) else {
                    continue;
                };
                match &export.alias {
                    Some(alias) => exports.insert(
                        alias.sym.clone(),
                        ExportBinding::Namespace {
                            source: source_id.clone(),
                        },
                    ),
                    None => exports.add_star(source_id.clone()),
                }
            }
            _ => {}
        }
    }
    if kind == ModuleKind::Cjs {
        exports.set_cjs(cjs_scan.to_cjs_exports());
    }
    (exports, imports)
}

fn decl_bound_names(decl: &Decl) -> Vec<(String, SymbolId)> {
    let mut names = vec![];
    match decl {
        Decl::Var(var) => {
            for declarator in &var.decls {
                pat_bound_names(&declarator.name, &mut names);
            }
        }
        Decl::Fn(f) => {
            if let Some(symbol) = f.ident.symbol {
                names.push((f.ident.sym.clone(), symbol));
            }
        }
        Decl::Class(c) => {
            if let Some(symbol) = c.ident.symbol {
                names.push((c.ident.sym.clone(), symbol));
            }
        }
    }
    names
}

fn pat_bound_names(pat: &Pat, out: &mut Vec<(String, SymbolId)>) {
    match pat {
        Pat::Ident(ident) => {
            if let Some(symbol) = ident.symbol {
                out.push((ident.sym.clone(), symbol));
            }
        }
        Pat::Assign(assign) => pat_bound_names(&assign.pat, out),
        Pat::Rest(rest) => pat_bound_names(rest, out),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_bound_names(elem, out);
            }
        }
        Pat::Object(object) => {
            // Shorthand props carry their binding in `value` after binding.
            for prop in &object.props {
                if let Some(value) = &prop.value {
                    pat_bound_names(value, out);
                }
            }
            if let Some(rest) = &object.rest {
                pat_bound_names(rest, out);
            }
        }
    }
}

pub(crate) struct RawDep {
    pub(crate) source: String,
    pub(crate) kind: ResolveKind,
    span: Span,
}

/// Walks the module for everything that resolves to another module: static
/// imports and re-exports, `import()`, `require()` and `new Worker(...)`
/// sites with literal specifiers. One record per `(source, kind)` pair, in
/// source order.
pub(crate) struct RecordCollector {
    kind: ModuleKind,
    pub(crate) records: Vec<RawDep>,
    seen: HashSet<(String, ResolveKind)>,
}

/// Record key set of a module body. The optimizer reconciles graph edges
/// against this after it has rewritten statements.
pub(crate) fn record_keys(ast: &ast::Module, kind: ModuleKind) -> HashSet<(String, ResolveKind)> {
    let mut collector = RecordCollector::new(kind);
    collector.visit_module(ast);
    collector.seen
}

impl RecordCollector {
    pub(crate) fn new(kind: ModuleKind) -> Self {
        Self {
            kind,
            records: vec![],
            seen: HashSet::new(),
        }
    }

    fn add(&mut self, source: &str, kind: ResolveKind, span: Span) {
        if self.seen.insert((source.to_string(), kind)) {
            self.records.push(RawDep {
                source: source.to_string(),
                kind,
                span,
            });
        }
    }
}

impl Visit for RecordCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(import) => self.add(&import.source, ResolveKind::Import, import.span),
            Stmt::ExportNamed(export) => {
                if let Some(source) = &export.source {
                    self.add(source, ResolveKind::ExportFrom, export.span);
                }
            }
            Stmt::ExportStar(export) => {
                self.add(&export.source, ResolveKind::ExportFrom, export.span)
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(call) => match &call.callee {
                Callee::Import => {
                    if let Some(source) = plain_str_arg(&call.args) {
                        self.add(source, ResolveKind::DynamicImport, call.span);
                    }
                }
                Callee::Expr(callee) => {
                    if self.kind == ModuleKind::Cjs
                        && callee.as_ident().is_some_and(|i| is_free(i, "require"))
                    {
                        if let Some(source) = plain_str_arg(&call.args) {
                            self.add(source, ResolveKind::Require, call.span);
                        }
                    }
                }
            },
            Expr::New(new) => {
                if new.callee.as_ident().is_some_and(|i| is_free(i, "Worker")) {
                    if let Some(source) = worker_specifier(&new.args) {
                        self.add(source, ResolveKind::Worker, new.span);
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn plain_str_arg(args: &[Arg]) -> Option<&str> {
    let first = args.first()?;
    if first.spread {
        return None;
    }
    first.expr.as_str_lit()
}

/// `new Worker("./w.js")` or `new Worker(new URL("./w.js", import.meta.url))`.
fn worker_specifier(args: &[Arg]) -> Option<&str> {
    let first = args.first()?;
    if first.spread {
        return None;
    }
    match &first.expr {
        Expr::Lit(Lit::Str(source)) => Some(source),
        Expr::New(url) => {
            if !url.callee.as_ident().is_some_and(|i| is_free(i, "URL")) {
                return None;
            }
            let base = url.args.get(1)?;
            let base_is_meta_url = !base.spread
                && matches!(
                    &base.expr,
                    Expr::Member(member)
                        if matches!(&*member.obj, Expr::MetaProp(_))
                            && matches!(&member.prop, MemberProp::Ident(p) if p == "url")
                );
            if !base_is_meta_url {
                return None;
            }
            plain_str_arg(&url.args)
        }
        _ => None,
    }
}

/// Static scan of the CommonJS surface: which names are written through
/// `module.exports`/`exports`, and whether any write escapes the shapes the
/// scan can follow.
#[derive(Default)]
struct CjsScan {
    uses_cjs_globals: bool,
    names: IndexSet<String>,
    dynamic: bool,
}

enum ExportsTarget {
    /// `module.exports = ...`.
    Whole,
    /// `exports.name = ...` or `module.exports.name = ...`.
    Named(String),
    /// A computed member on the exports object.
    Unfollowed,
}

impl CjsScan {
    fn to_cjs_exports(&self) -> CjsExports {
        if self.dynamic || self.names.is_empty() {
            CjsExports::Dynamic
        } else {
            CjsExports::Static(self.names.iter().cloned().collect())
        }
    }

    fn record_assign(&mut self, assign: &AssignExpr) -> bool {
        let AssignTarget::Member(member) = &assign.target else {
            return false;
        };
        let Some(target) = exports_assign_target(member) else {
            return false;
        };
        self.uses_cjs_globals = true;
        match target {
            ExportsTarget::Whole => match object_literal_keys(&assign.value) {
                Some(keys) => self.names.extend(keys),
                None => self.dynamic = true,
            },
            ExportsTarget::Named(name) => {
                self.names.insert(name);
            }
            ExportsTarget::Unfollowed => self.dynamic = true,
        }
        true
    }
}

impl Visit for CjsScan {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign(assign) => {
                if self.record_assign(assign) {
                    self.visit_expr(&assign.value);
                    return;
                }
                if let AssignTarget::Ident(ident) = &assign.target {
                    if is_free(ident, "exports") || is_free(ident, "module") {
                        // Rebinding the exports object itself cannot be
                        // followed.
                        self.uses_cjs_globals = true;
                        self.dynamic = true;
                        self.visit_expr(&assign.value);
                        return;
                    }
                }
            }
            Expr::Member(member) => {
                if is_exports_member(member) {
                    self.uses_cjs_globals = true;
                    if let MemberProp::Computed(prop) = &member.prop {
                        self.visit_expr(prop);
                    }
                    return;
                }
            }
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &call.callee {
                    if callee.as_ident().is_some_and(|i| is_free(i, "require")) {
                        self.uses_cjs_globals = true;
                    }
                }
            }
            Expr::Ident(ident) => {
                if is_free(ident, "exports") || is_free(ident, "module") {
                    // The object escapes; writes through the alias are
                    // invisible to the scan.
                    self.uses_cjs_globals = true;
                    self.dynamic = true;
                    return;
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// `module.exports` as a member read, or a read through it.
fn is_exports_member(member: &MemberExpr) -> bool {
    if let Some(ident) = member.obj.as_ident() {
        if is_free(ident, "exports") {
            return true;
        }
        if is_free(ident, "module") {
            return matches!(&member.prop, MemberProp::Ident(p) if p == "exports");
        }
        return false;
    }
    if let Expr::Member(inner) = &*member.obj {
        return is_module_exports(inner);
    }
    false
}

fn is_module_exports(member: &MemberExpr) -> bool {
    member.obj.as_ident().is_some_and(|i| is_free(i, "module"))
        && matches!(&member.prop, MemberProp::Ident(p) if p == "exports")
}

fn exports_assign_target(member: &MemberExpr) -> Option<ExportsTarget> {
    if let Some(ident) = member.obj.as_ident() {
        if is_free(ident, "exports") {
            return Some(match &member.prop {
                MemberProp::Ident(name) => ExportsTarget::Named(name.clone()),
                MemberProp::Computed(_) => ExportsTarget::Unfollowed,
            });
        }
        if is_free(ident, "module") {
            if matches!(&member.prop, MemberProp::Ident(p) if p == "exports") {
                return Some(ExportsTarget::Whole);
            }
        }
        return None;
    }
    if let Expr::Member(inner) = &*member.obj {
        if is_module_exports(inner) {
            return Some(match &member.prop {
                MemberProp::Ident(name) => ExportsTarget::Named(name.clone()),
                MemberProp::Computed(_) => ExportsTarget::Unfollowed,
            });
        }
    }
    None
}

/// Keys of an object literal whose every property has a statically known
/// name. `None` when any property defeats that.
fn object_literal_keys(expr: &Expr) -> Option<Vec<String>> {
    let Expr::Object(object) = expr else {
        return None;
    };
    let mut keys = vec![];
    for prop in &object.props {
        let key = match prop {
            Prop::KeyValue { key, .. } | Prop::Method { key, .. } => key,
            Prop::Shorthand(ident) => {
                keys.push(ident.sym.clone());
                continue;
            }
            Prop::Spread(_) => return None,
        };
        match key {
            PropName::Ident(name) | PropName::Str(name) => keys.push(name.clone()),
            PropName::Num(n) => keys.push(n.to_js_string()),
            PropName::Computed(_) => return None,
        }
    }
    Some(keys)
}

//! Export surfaces and the linking rules between them: lazy re-export
//! chains, `export *` merging, and the CommonJS interop shape.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::bind::SymbolId;
use crate::error::CompileError;
use crate::module::{ModuleId, ModuleInfo, ModuleKind};
use crate::module_graph::ModuleGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportBinding {
    /// Export of a local symbol.
    Local(SymbolId),
    /// `export { name as exported } from "source"`; followed lazily.
    Reexport { source: ModuleId, name: String },
    /// `export * as ns from "source"`.
    Namespace { source: ModuleId },
}

/// How a module's exports exist at runtime, derived purely from the module
/// kind and its analyzed surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeExportShape {
    /// Live bindings, re-exported directly.
    EsmBindings,
    /// CommonJS with statically known names; a namespace can be built from
    /// them.
    CjsStatic(Vec<String>),
    /// CommonJS whose writes cannot be followed statically; consumers get a
    /// namespace object snapshotted when first accessed.
    CjsSnapshot,
    /// JSON and assets expose a single default export.
    DefaultOnly,
}

pub fn runtime_export_shape(kind: ModuleKind, exports: &ExportMap) -> RuntimeExportShape {
    match kind {
        ModuleKind::Esm => RuntimeExportShape::EsmBindings,
        ModuleKind::Cjs => match exports.cjs() {
            Some(CjsExports::Static(names)) => RuntimeExportShape::CjsStatic(names.clone()),
            _ => RuntimeExportShape::CjsSnapshot,
        },
        ModuleKind::Json | ModuleKind::Asset => RuntimeExportShape::DefaultOnly,
    }
}

/// Best-effort static view of a CommonJS module's named exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CjsExports {
    Static(Vec<String>),
    /// Assignment shapes the scan could not follow.
    Dynamic,
}

#[derive(Debug, Default)]
pub struct ExportMap {
    bindings: IndexMap<String, ExportBinding>,
    stars: Vec<ModuleId>,
    cjs: Option<CjsExports>,
}

impl ExportMap {
    pub fn insert(&mut self, name: impl Into<String>, binding: ExportBinding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&ExportBinding> {
        self.bindings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExportBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn add_star(&mut self, source: ModuleId) {
        if !self.stars.contains(&source) {
            self.stars.push(source);
        }
    }

    pub fn stars(&self) -> &[ModuleId] {
        &self.stars
    }

    pub fn set_cjs(&mut self, cjs: CjsExports) {
        self.cjs = Some(cjs);
    }

    pub fn cjs(&self) -> Option<&CjsExports> {
        self.cjs.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.stars.is_empty() && self.cjs.is_none()
    }
}

/// Local binding introduced by an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub source: ModuleId,
    pub imported: ImportedName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Namespace,
}

pub type ImportMap = IndexMap<SymbolId, ImportTarget>;

/// Where a name of a module's export surface finally lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedExport {
    Symbol { module: ModuleId, symbol: SymbolId },
    /// The whole namespace of `module`.
    Namespace { module: ModuleId },
    /// Lands in a module whose exports only exist at runtime.
    Dynamic { module: ModuleId },
    /// Supplied by more than one `export *` source; excluded from the
    /// namespace rather than resolved arbitrarily.
    Ambiguous,
    NotFound,
}

/// Follows re-export chains and `export *` merges until a terminal binding.
/// Chains that revisit a (module, name) pair without terminating are a hard
/// error; star cycles merely stop contributing names.
pub fn resolve_export(
    graph: &ModuleGraph,
    module: &ModuleId,
    name: &str,
) -> Result<ResolvedExport, CompileError> {
    let mut visited = HashSet::new();
    resolve_chain(graph, module.clone(), name.to_string(), &mut visited)
}

fn resolve_chain(
    graph: &ModuleGraph,
    mut module: ModuleId,
    mut name: String,
    visited: &mut HashSet<(ModuleId, String)>,
) -> Result<ResolvedExport, CompileError> {
    loop {
        if !visited.insert((module.clone(), name.clone())) {
            return Err(CompileError::ExportCycle { module, name });
        }
        let Some(info) = graph.get_module(&module).and_then(|m| m.info.as_ref()) else {
            return Ok(ResolvedExport::NotFound);
        };
        match info.kind {
            ModuleKind::Cjs => return Ok(ResolvedExport::Dynamic { module }),
            ModuleKind::Json | ModuleKind::Asset => {
                return Ok(if name == "default" {
                    ResolvedExport::Dynamic { module }
                } else {
                    ResolvedExport::NotFound
                });
            }
            ModuleKind::Esm => {}
        }
        match info.exports.get(&name) {
            Some(ExportBinding::Local(symbol)) => {
                return Ok(ResolvedExport::Symbol {
                    module,
                    symbol: *symbol,
                })
            }
            Some(ExportBinding::Namespace { source }) => {
                return Ok(ResolvedExport::Namespace {
                    module: source.clone(),
                })
            }
            Some(ExportBinding::Reexport { source, name: next }) => {
                module = source.clone();
                name = next.clone();
            }
            None => {
                let mut visiting = HashSet::new();
                visiting.insert(module.clone());
                return Ok(match resolve_star(graph, info, &name, &mut visiting)? {
                    StarHit::Unique(resolved) => resolved,
                    StarHit::Ambiguous => ResolvedExport::Ambiguous,
                    StarHit::None => ResolvedExport::NotFound,
                });
            }
        }
    }
}

enum StarHit {
    Unique(ResolvedExport),
    Ambiguous,
    None,
}

fn resolve_star(
    graph: &ModuleGraph,
    info: &ModuleInfo,
    name: &str,
    visiting: &mut HashSet<ModuleId>,
) -> Result<StarHit, CompileError> {
    // `default` never flows through `export *`.
    if name == "default" {
        return Ok(StarHit::None);
    }
    let mut hit = None;
    let mut sources_hit = 0usize;
    for source in info.exports.stars() {
        if visiting.contains(source) {
            continue;
        }
        visiting.insert(source.clone());
        let resolved = resolve_in_star_source(graph, source, name, visiting)?;
        visiting.remove(source);
        match resolved {
            StarHit::Ambiguous => return Ok(StarHit::Ambiguous),
            StarHit::Unique(resolved) => {
                sources_hit += 1;
                hit = Some(resolved);
            }
            StarHit::None => {}
        }
    }
    Ok(match (sources_hit, hit) {
        (0, _) => StarHit::None,
        (1, Some(resolved)) => StarHit::Unique(resolved),
        _ => StarHit::Ambiguous,
    })
}

fn resolve_in_star_source(
    graph: &ModuleGraph,
    module: &ModuleId,
    name: &str,
    visiting: &mut HashSet<ModuleId>,
) -> Result<StarHit, CompileError> {
    let Some(info) = graph.get_module(module).and_then(|m| m.info.as_ref()) else {
        return Ok(StarHit::None);
    };
    match info.kind {
        // `export * from "cjs"` forwards whatever exists at runtime.
        ModuleKind::Cjs => {
            return Ok(StarHit::Unique(ResolvedExport::Dynamic {
                module: module.clone(),
            }))
        }
        ModuleKind::Json | ModuleKind::Asset => return Ok(StarHit::None),
        ModuleKind::Esm => {}
    }
    match info.exports.get(name) {
        Some(ExportBinding::Local(symbol)) => Ok(StarHit::Unique(ResolvedExport::Symbol {
            module: module.clone(),
            symbol: *symbol,
        })),
        Some(ExportBinding::Namespace { source }) => {
            Ok(StarHit::Unique(ResolvedExport::Namespace {
                module: source.clone(),
            }))
        }
        Some(ExportBinding::Reexport { source, name: next }) => {
            let mut chain = HashSet::new();
            chain.insert((module.clone(), name.to_string()));
            match resolve_chain(graph, source.clone(), next.clone(), &mut chain)? {
                ResolvedExport::NotFound => Ok(StarHit::None),
                ResolvedExport::Ambiguous => Ok(StarHit::Ambiguous),
                resolved => Ok(StarHit::Unique(resolved)),
            }
        }
        None => resolve_star(graph, info, name, visiting),
    }
}

/// Every module transitively reachable through `export *` edges, sorted for
/// determinism. Used when a whole namespace is consumed and all star sources
/// have to surrender their exports.
pub fn collect_star_sources(graph: &ModuleGraph, module: &ModuleId) -> Vec<ModuleId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(module.clone());
    let mut stack = vec![module.clone()];
    while let Some(current) = stack.pop() {
        let Some(info) = graph.get_module(&current).and_then(|m| m.info.as_ref()) else {
            continue;
        };
        for source in info.exports.stars() {
            if seen.insert(source.clone()) {
                out.push(source.clone());
                stack.push(source.clone());
            }
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::ast::*;
    use crate::test_helper::memory::{compiler_with, MemoryHost};

    fn built(host: MemoryHost, entries: &[&str]) -> crate::compiler::Compiler {
        let compiler = compiler_with(host, entries);
        compiler.build().unwrap();
        compiler
    }

    #[test]
    fn test_star_export_resolves_through_one_source() {
        let mut host = MemoryHost::new();
        host.add("barrel", vec![export_star("a")]);
        host.add("a", vec![export_const("x", num(1.0))]);

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        let resolved = resolve_export(&module_graph, &ModuleId::new("barrel"), "x").unwrap();
        assert!(
            matches!(resolved, ResolvedExport::Symbol { module, .. } if module == ModuleId::new("a"))
        );
    }

    #[test]
    fn test_name_supplied_by_two_stars_is_ambiguous() {
        let mut host = MemoryHost::new();
        host.add("barrel", vec![export_star("a"), export_star("b")]);
        host.add(
            "a",
            vec![
                export_const("x", num(1.0)),
                export_const("only_a", num(3.0)),
            ],
        );
        host.add("b", vec![export_const("x", num(2.0))]);

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        let barrel = ModuleId::new("barrel");
        assert_eq!(
            resolve_export(&module_graph, &barrel, "x").unwrap(),
            ResolvedExport::Ambiguous
        );
        // A name only one source supplies is unaffected by the collision.
        let resolved = resolve_export(&module_graph, &barrel, "only_a").unwrap();
        assert!(
            matches!(resolved, ResolvedExport::Symbol { module, .. } if module == ModuleId::new("a"))
        );
    }

    #[test]
    fn test_explicit_export_shadows_star_sources() {
        let mut host = MemoryHost::new();
        host.add(
            "barrel",
            vec![export_const("x", num(9.0)), export_star("a")],
        );
        host.add("a", vec![export_const("x", num(1.0))]);

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        let resolved = resolve_export(&module_graph, &ModuleId::new("barrel"), "x").unwrap();
        assert!(
            matches!(resolved, ResolvedExport::Symbol { module, .. } if module == ModuleId::new("barrel"))
        );
    }

    #[test]
    fn test_default_never_crosses_a_star() {
        let mut host = MemoryHost::new();
        host.add("barrel", vec![export_star("a")]);
        host.add("a", vec![export_default_expr(num(1.0))]);

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        assert_eq!(
            resolve_export(&module_graph, &ModuleId::new("barrel"), "default").unwrap(),
            ResolvedExport::NotFound
        );
    }

    #[test]
    fn test_reexport_cycle_is_fatal() {
        let mut host = MemoryHost::new();
        host.add("a", vec![reexport_named("b", &[("x", "x")])]);
        host.add("b", vec![reexport_named("a", &[("x", "x")])]);

        let compiler = built(host, &["a"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        let err = resolve_export(&module_graph, &ModuleId::new("a"), "x").unwrap_err();
        assert!(matches!(err, CompileError::ExportCycle { .. }));
    }

    #[test]
    fn test_mutual_stars_terminate() {
        let mut host = MemoryHost::new();
        host.add(
            "a",
            vec![export_star("b"), export_const("ax", num(1.0))],
        );
        host.add(
            "b",
            vec![export_star("a"), export_const("bx", num(2.0))],
        );

        let compiler = built(host, &["a"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        let a = ModuleId::new("a");
        let resolved = resolve_export(&module_graph, &a, "bx").unwrap();
        assert!(
            matches!(resolved, ResolvedExport::Symbol { module, .. } if module == ModuleId::new("b"))
        );
        // The cycle stops contributing names instead of looping.
        assert_eq!(
            resolve_export(&module_graph, &a, "missing").unwrap(),
            ResolvedExport::NotFound
        );
    }

    #[test]
    fn test_star_into_cjs_is_runtime_resolved() {
        let mut host = MemoryHost::new();
        host.add("barrel", vec![export_star("legacy")]);
        host.add(
            "legacy",
            vec![expr_stmt(assign_to(
                member_expr(id_expr("exports"), "x"),
                num(1.0),
            ))],
        );

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        assert_eq!(
            resolve_export(&module_graph, &ModuleId::new("barrel"), "x").unwrap(),
            ResolvedExport::Dynamic {
                module: ModuleId::new("legacy")
            }
        );
    }

    #[test]
    fn test_collect_star_sources_transitive_and_sorted() {
        let mut host = MemoryHost::new();
        host.add("barrel", vec![export_star("b"), export_star("a")]);
        host.add("a", vec![export_star("c")]);
        host.add("b", vec![export_const("b", num(1.0))]);
        host.add("c", vec![export_const("c", num(2.0))]);

        let compiler = built(host, &["barrel"]);
        let module_graph = compiler.context.module_graph.read().unwrap();
        assert_eq!(
            collect_star_sources(&module_graph, &ModuleId::new("barrel")),
            vec![ModuleId::new("a"), ModuleId::new("b"), ModuleId::new("c")]
        );
    }
}

//! Per-module shaking state: reachability, the demand recorded against the
//! module's exports, and the statement graph that demand is resolved
//! against.

use std::collections::{HashMap, HashSet};

use crate::exports::{resolve_export, ResolvedExport};
use crate::module::{DceReason, Module, ModuleId, ModuleKind, ResolveKind};
use crate::module_graph::ModuleGraph;
use crate::tree_shaking::statement_graph::{
    ProvidedExport, StatementGraph, UsedStatement, UsedStatements,
};

/// Demand recorded against a module's export surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsedExports {
    /// Consumed wholesale: namespace import, dynamic import, worker entry
    /// or a CommonJS consumer.
    All,
    Partial(HashSet<String>),
}

pub struct ShakeModule {
    pub module_id: ModuleId,
    pub kind: ModuleKind,
    pub is_entry: bool,
    /// Effective side-effect policy of the module itself.
    pub side_effects: bool,
    pub has_eval: bool,
    /// Some live statement evaluates this module.
    pub reached: bool,
    pub used_exports: UsedExports,
    pub stmt_graph: StatementGraph,
}

impl ShakeModule {
    pub fn new(module: &Module) -> Self {
        let info = module.info();
        let stmt_graph = if info.kind == ModuleKind::Esm {
            StatementGraph::new(&info.ast, &info.symbols)
        } else {
            StatementGraph::empty()
        };
        Self {
            module_id: module.id.clone(),
            kind: info.kind,
            is_entry: module.is_entry,
            side_effects: module.side_effects(),
            has_eval: info.symbols.has_eval(),
            reached: false,
            used_exports: UsedExports::Partial(HashSet::new()),
            stmt_graph,
        }
    }

    /// Records demand for one exported name. Returns whether the demand
    /// grew.
    pub fn add_used_export(&mut self, name: String) -> bool {
        match &mut self.used_exports {
            UsedExports::All => false,
            UsedExports::Partial(names) => names.insert(name),
        }
    }

    pub fn use_all_exports(&mut self) -> bool {
        match self.used_exports {
            UsedExports::All => false,
            UsedExports::Partial(_) => {
                self.used_exports = UsedExports::All;
                true
            }
        }
    }

    /// Statements to keep under the demand recorded so far, plus the names
    /// that have to be forwarded through `export *` to other modules.
    ///
    /// Roots are entry statements, statements the side-effect policy keeps,
    /// imports of effectful modules and the providers of demanded exports;
    /// everything else must earn its keep through the def-use closure.
    pub fn used_statements(
        &self,
        module_graph: &ModuleGraph,
    ) -> (UsedStatements, Vec<(ModuleId, String)>) {
        let mut used = UsedStatements::new();
        let mut star_forwards: Vec<(ModuleId, String)> = Vec::new();

        // Entry bodies run top to bottom; a module mentioning `eval` can
        // reach anything by name.
        if self.is_entry || self.has_eval {
            let reason = if self.is_entry {
                DceReason::EntryRoot
            } else {
                DceReason::SideEffecting
            };
            for stmt in self.stmt_graph.stmts() {
                let mut root = UsedStatement::new(reason);
                root.needed.extend(stmt.defined.iter().copied());
                root.all_exports = true;
                used.insert(stmt.id, root);
            }
            return (self.stmt_graph.analyze_used(used), star_forwards);
        }

        let mut dep_targets: HashMap<(String, ResolveKind), ModuleId> = HashMap::new();
        for (to, dep) in module_graph.get_dependencies(&self.module_id) {
            dep_targets.insert((dep.source.clone(), dep.resolve_kind), to.clone());
        }

        if self.side_effects {
            for stmt in self.stmt_graph.stmts() {
                if !stmt.is_self_executed {
                    continue;
                }
                let mut root = UsedStatement::new(DceReason::SideEffecting);
                if stmt.declarators.is_empty() {
                    root.needed.extend(stmt.defined.iter().copied());
                } else {
                    // Pure declarators of an effectful statement stay
                    // droppable; only the effectful ones anchor it.
                    for declarator in stmt.declarators.iter().filter(|d| d.effectful) {
                        root.needed.extend(declarator.symbols.iter().copied());
                    }
                }
                used.insert(stmt.id, root);
            }
        }

        // An import or re-export of an effectful module evaluates it, so
        // the statement survives at least in bare form.
        for stmt in self.stmt_graph.stmts() {
            let target = match (&stmt.import, &stmt.export) {
                (Some(import), _) => {
                    dep_targets.get(&(import.source.clone(), ResolveKind::Import))
                }
                (_, Some(export)) => export
                    .source
                    .as_ref()
                    .and_then(|s| dep_targets.get(&(s.clone(), ResolveKind::ExportFrom))),
                _ => None,
            };
            let Some(target) = target else {
                continue;
            };
            let effectful = module_graph
                .get_module(target)
                .map(|m| m.side_effects())
                .unwrap_or(true);
            if effectful {
                used.entry(stmt.id)
                    .or_insert_with(|| UsedStatement::new(DceReason::SideEffecting));
            }
        }

        match &self.used_exports {
            UsedExports::All => {
                for stmt in self.stmt_graph.stmts() {
                    let Some(export) = &stmt.export else {
                        continue;
                    };
                    let root = used
                        .entry(stmt.id)
                        .or_insert_with(|| UsedStatement::new(DceReason::Reachable));
                    root.reason = DceReason::Reachable;
                    root.all_exports = true;
                    for provided in &export.provided {
                        if let ProvidedExport::Local {
                            symbol: Some(symbol),
                            ..
                        } = provided
                        {
                            root.needed.insert(*symbol);
                        }
                    }
                }
            }
            UsedExports::Partial(names) => {
                let mut names: Vec<&String> = names.iter().collect();
                names.sort();
                let mut unprovided: Vec<&str> = Vec::new();
                for name in names {
                    // Later statements shadow earlier providers of the same
                    // name.
                    let mut provider: Option<(usize, &ProvidedExport)> = None;
                    for stmt in self.stmt_graph.stmts() {
                        let Some(export) = &stmt.export else {
                            continue;
                        };
                        for provided in &export.provided {
                            if provided.exported() == name {
                                provider = Some((stmt.id, provided));
                            }
                        }
                    }
                    match provider {
                        Some((id, provided)) => {
                            let root = used
                                .entry(id)
                                .or_insert_with(|| UsedStatement::new(DceReason::Reachable));
                            root.reason = DceReason::Reachable;
                            root.export_names.insert(name.clone());
                            if let ProvidedExport::Local {
                                symbol: Some(symbol),
                                ..
                            } = provided
                            {
                                root.needed.insert(*symbol);
                            }
                        }
                        // `default` never flows through `export *`.
                        None if name != "default" => unprovided.push(name),
                        None => {}
                    }
                }
                for name in unprovided {
                    for stmt in self.stmt_graph.stmts() {
                        let Some(export) = &stmt.export else {
                            continue;
                        };
                        if !export.star {
                            continue;
                        }
                        let Some(source) = &export.source else {
                            continue;
                        };
                        let Some(target) =
                            dep_targets.get(&(source.clone(), ResolveKind::ExportFrom))
                        else {
                            continue;
                        };
                        let hit = matches!(
                            resolve_export(module_graph, target, name),
                            Ok(ResolvedExport::Symbol { .. }
                                | ResolvedExport::Namespace { .. }
                                | ResolvedExport::Dynamic { .. })
                        );
                        if hit {
                            used.entry(stmt.id)
                                .or_insert_with(|| UsedStatement::new(DceReason::Reachable));
                            star_forwards.push((target.clone(), name.to_string()));
                        }
                    }
                }
            }
        }

        (self.stmt_graph.analyze_used(used), star_forwards)
    }
}

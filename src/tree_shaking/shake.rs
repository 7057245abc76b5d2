//! Usage marking across the module graph. Modules are walked in
//! topological order; when demand lands on an earlier module the walk
//! jumps back to it, so cycles and late re-exports settle without a
//! whole-graph restart.

use std::collections::HashMap;

use tracing::debug;

use crate::exports::ImportedName;
use crate::module::{ModuleId, ModuleKind, ResolveKind};
use crate::module_graph::ModuleGraph;
use crate::tree_shaking::module::ShakeModule;
use crate::tree_shaking::statement_graph::{ProvidedExport, StatementId};
use crate::tree_shaking::sweep;

/// How one consumer statement demands a target module.
enum Usage {
    /// Evaluate for side effects only.
    Reach,
    Named(String),
    All,
}

/// One marking round over the whole graph followed by the statement sweep.
/// Returns how many statements and modules changed, `0` once stable.
pub(crate) fn shake_pass(module_graph: &mut ModuleGraph) -> usize {
    let (sorted, _) = module_graph.toposort();
    let mut order: HashMap<ModuleId, usize> = HashMap::new();
    let mut states: Vec<ShakeModule> = Vec::with_capacity(sorted.len());
    for (index, module_id) in sorted.iter().enumerate() {
        let module = module_graph.get_module(module_id).unwrap();
        order.insert(module_id.clone(), index);
        states.push(ShakeModule::new(module));
    }

    for state in states.iter_mut() {
        if state.is_entry {
            state.reached = true;
            state.use_all_exports();
        }
    }

    let mut current = 0;
    while current < states.len() {
        let mut next = current + 1;
        if states[current].reached {
            let usages = collect_usages(&states[current], module_graph);
            for (target, usage) in usages {
                let Some(&index) = order.get(&target) else {
                    continue;
                };
                if apply_usage(&mut states[index], usage) && index < next {
                    next = index;
                }
            }
        }
        current = next;
    }

    let changed = sweep::sweep(module_graph, &states);
    let stale = sweep::reconcile_edges(module_graph);
    debug!(
        "shake pass: {} statement or module changes, {} stale edges dropped",
        changed, stale
    );
    changed
}

fn apply_usage(state: &mut ShakeModule, usage: Usage) -> bool {
    let newly = !state.reached;
    state.reached = true;
    match usage {
        Usage::Reach => newly,
        // `|` and not `||`: the export set must grow even when the module
        // was already reached.
        Usage::Named(name) => state.add_used_export(name) | newly,
        Usage::All => state.use_all_exports() | newly,
    }
}

/// The demands a reached module currently places on its dependencies.
fn collect_usages(state: &ShakeModule, module_graph: &ModuleGraph) -> Vec<(ModuleId, Usage)> {
    match state.kind {
        ModuleKind::Json | ModuleKind::Asset => Vec::new(),
        // CommonJS requires are opaque; every dependency stays whole.
        ModuleKind::Cjs => module_graph
            .get_dependencies(&state.module_id)
            .into_iter()
            .map(|(to, _)| (to.clone(), Usage::All))
            .collect(),
        ModuleKind::Esm => esm_usages(state, module_graph),
    }
}

fn esm_usages(state: &ShakeModule, module_graph: &ModuleGraph) -> Vec<(ModuleId, Usage)> {
    let mut dep_targets: HashMap<(String, ResolveKind), ModuleId> = HashMap::new();
    for (to, dep) in module_graph.get_dependencies(&state.module_id) {
        dep_targets.insert((dep.source.clone(), dep.resolve_kind), to.clone());
    }

    let (used, star_forwards) = state.used_statements(module_graph);
    let mut usages: Vec<(ModuleId, Usage)> = star_forwards
        .into_iter()
        .map(|(target, name)| (target, Usage::Named(name)))
        .collect();

    let mut ids: Vec<StatementId> = used.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let demand = &used[&id];
        let stmt = state.stmt_graph.stmt(id);

        if let Some(import) = &stmt.import {
            if let Some(target) = dep_targets.get(&(import.source.clone(), ResolveKind::Import)) {
                let mut any = false;
                for (symbol, imported) in &import.specifiers {
                    if !demand.needed.contains(symbol) {
                        continue;
                    }
                    any = true;
                    match imported {
                        ImportedName::Named(name) => {
                            usages.push((target.clone(), Usage::Named(name.clone())));
                        }
                        ImportedName::Namespace => {
                            usages.push((target.clone(), Usage::All));
                        }
                    }
                }
                if !any {
                    usages.push((target.clone(), Usage::Reach));
                }
            }
        }

        if let Some(export) = &stmt.export {
            if let Some(source) = &export.source {
                if let Some(target) = dep_targets.get(&(source.clone(), ResolveKind::ExportFrom)) {
                    if export.star {
                        let usage = if demand.all_exports {
                            Usage::All
                        } else {
                            Usage::Reach
                        };
                        usages.push((target.clone(), usage));
                    } else {
                        let mut any = false;
                        for provided in &export.provided {
                            let wanted = demand.all_exports
                                || demand.export_names.contains(provided.exported());
                            if !wanted {
                                continue;
                            }
                            match provided {
                                ProvidedExport::Reexport { orig, .. } => {
                                    any = true;
                                    usages.push((target.clone(), Usage::Named(orig.clone())));
                                }
                                ProvidedExport::StarNamespace { .. } => {
                                    any = true;
                                    usages.push((target.clone(), Usage::All));
                                }
                                ProvidedExport::Local { .. } => {}
                            }
                        }
                        if !any {
                            usages.push((target.clone(), Usage::Reach));
                        }
                    }
                }
            }
        }

        // Dynamic imports and workers load the target as a fresh entry.
        for (source, kind) in &stmt.records {
            if let Some(target) = dep_targets.get(&(source.clone(), *kind)) {
                usages.push((target.clone(), Usage::All));
            }
        }
    }
    usages
}

//! Symbol-level dead code elimination. Each pass marks the statements the
//! entries can observe, sweeps everything else out of the module bodies,
//! and the driver repeats passes (interleaved with constant folding) until
//! nothing changes. A final link check verifies the surviving imports.

pub mod module;
pub mod shake;
pub mod statement_graph;
pub mod sweep;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::ast::Stmt;
use crate::build::BuildError;
use crate::compiler::Context;
use crate::diagnostics::DiagnosticKind;
use crate::error::CompileError;
use crate::exports::{resolve_export, runtime_export_shape, ResolvedExport, RuntimeExportShape};
use crate::module::{ModuleId, ModuleKind, ResolveKind};
use crate::module_graph::ModuleGraph;

/// Runs folding and shaking to a joint fixpoint, then checks that every
/// surviving import still lands on a real export. Cancellation stops
/// between passes and leaves the graph as the last pass wrote it.
pub fn optimize_module_graph(context: &Arc<Context>) -> Result<()> {
    let mut module_graph = context.module_graph.write().unwrap();
    let mut round = 0;
    loop {
        if context.is_cancelled() {
            return Ok(());
        }
        let mut changed = 0;
        if context.config.fold_constants {
            changed += crate::fold::fold_module_graph(&mut module_graph);
        }
        if context.config.tree_shaking {
            changed += shake::shake_pass(&mut module_graph);
        }
        round += 1;
        debug!("optimize round {}: {} changes", round, changed);
        if changed == 0 {
            break;
        }
    }
    // Folding alone can erase records (a require in a dead branch); the
    // shaker normally reconciles, so cover the fold-only configuration.
    if !context.config.tree_shaking && context.config.fold_constants {
        sweep::reconcile_edges(&mut module_graph);
    }
    link_check(&module_graph, context)?;
    Ok(())
}

/// Verifies every surviving static import and named re-export against the
/// target's export surface. Misses on modules with static exports are
/// fatal; CommonJS interop boundaries come back as warnings.
fn link_check(module_graph: &ModuleGraph, context: &Arc<Context>) -> Result<()> {
    let mut errors: Vec<anyhow::Error> = Vec::new();
    let mut warned: HashSet<(ModuleId, ModuleId)> = HashSet::new();
    for module_id in module_graph.get_module_ids() {
        let module = module_graph.get_module(&module_id).unwrap();
        let info = module.info();
        if !info.live || info.kind != ModuleKind::Esm {
            continue;
        }
        let mut deps: HashMap<(String, ResolveKind), ModuleId> = HashMap::new();
        for (to, dep) in module_graph.get_dependencies(&module_id) {
            deps.insert((dep.source.clone(), dep.resolve_kind), to.clone());
        }
        for stmt in &info.ast.stmts {
            match stmt {
                Stmt::Import(import) => {
                    let Some(target) = deps.get(&(import.source.clone(), ResolveKind::Import))
                    else {
                        continue;
                    };
                    for spec in &import.specifiers {
                        if let Some(name) = spec.imported_name() {
                            check_required(
                                module_graph,
                                &module_id,
                                target,
                                name,
                                &mut errors,
                                &mut warned,
                                context,
                            );
                        }
                    }
                }
                Stmt::ExportNamed(export) => {
                    let Some(source) = &export.source else {
                        continue;
                    };
                    let Some(target) = deps.get(&(source.clone(), ResolveKind::ExportFrom))
                    else {
                        continue;
                    };
                    for spec in &export.specifiers {
                        check_required(
                            module_graph,
                            &module_id,
                            target,
                            &spec.orig.sym,
                            &mut errors,
                            &mut warned,
                            context,
                        );
                    }
                }
                _ => {}
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BuildError::BuildTasksError { errors }.into())
    }
}

fn check_required(
    module_graph: &ModuleGraph,
    importer: &ModuleId,
    target: &ModuleId,
    name: &str,
    errors: &mut Vec<anyhow::Error>,
    warned: &mut HashSet<(ModuleId, ModuleId)>,
    context: &Arc<Context>,
) {
    match resolve_export(module_graph, target, name) {
        Ok(ResolvedExport::Symbol { .. }) | Ok(ResolvedExport::Namespace { .. }) => {}
        Ok(ResolvedExport::Dynamic { module }) => {
            if name == "default" {
                return;
            }
            let info = module_graph.get_module(&module).unwrap().info();
            match runtime_export_shape(info.kind, &info.exports) {
                RuntimeExportShape::CjsStatic(names) => {
                    if !names.iter().any(|n| n == name) {
                        context.diagnostics.warn(
                            DiagnosticKind::UndefinedExport,
                            &importer.id,
                            format!("\"{}\" is always undefined on \"{}\"", name, module),
                        );
                    }
                }
                RuntimeExportShape::CjsSnapshot => {
                    if warned.insert((importer.clone(), module.clone())) {
                        context.diagnostics.warn(
                            DiagnosticKind::Interop,
                            &importer.id,
                            format!("named imports from \"{}\" read a runtime snapshot", module),
                        );
                    }
                }
                RuntimeExportShape::DefaultOnly | RuntimeExportShape::EsmBindings => {}
            }
        }
        Ok(ResolvedExport::NotFound) | Ok(ResolvedExport::Ambiguous) => {
            errors.push(
                CompileError::ExportMismatch {
                    exporter: target.clone(),
                    name: name.to_string(),
                    importer: importer.clone(),
                }
                .into(),
            );
        }
        Err(err) => errors.push(err.into()),
    }
}

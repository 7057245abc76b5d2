//! Splits the live module graph into chunks: one per entry in configuration
//! order, one per `import()` or `new Worker(...)` target, and, with
//! splitting enabled, one shared chunk per distinct set of entry chunks
//! consuming the same modules. Boundary call sites are rewritten to the
//! emitted filenames, and every reference that crosses a chunk edge lands
//! in the import-record table for the emitter.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hasher;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;
use twox_hash::XxHash64;

use crate::ast::visit::{walk_mut_expr, VisitMut};
use crate::ast::{Arg, Callee, Expr, Lit, MemberProp, ObjectLit, Prop, PropName, DUMMY_SP};
use crate::build::is_free;
use crate::chunk::{Chunk, ChunkId, ChunkType};
use crate::chunk_graph::ChunkGraph;
use crate::compiler::Context;
use crate::config::Config;
use crate::error::CompileError;
use crate::exports::{ExportBinding, ImportedName};
use crate::module::{ModuleId, ModuleInfo, ModuleKind, ResolveKind};
use crate::module_graph::ModuleGraph;

/// One emitted chunk: identity, filename, and its modules in execution
/// order (dependencies first, root last).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkManifest {
    pub id: ChunkId,
    pub chunk_type: ChunkType,
    pub filename: String,
    pub modules: Vec<ModuleId>,
    /// Hash over the member sources, for emitter caching.
    pub hash: u64,
}

/// One cross-chunk reference: `from` imports `names` of `module` from the
/// chunk that owns it. `"*"` stands for the whole namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChunkImport {
    pub from: ChunkId,
    pub to: ChunkId,
    pub module: ModuleId,
    pub names: Vec<String>,
}

/// Emitter-facing result of partitioning: manifests in emission order
/// (entries in configuration order, then shared chunks, then async and
/// worker chunks in discovery order) plus the cross-chunk import table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionOutput {
    pub chunks: Vec<ChunkManifest>,
    pub imports: Vec<CrossChunkImport>,
}

pub fn partition_chunks(context: &Arc<Context>) -> Result<PartitionOutput> {
    debug!("partition");
    let mut module_graph = context.module_graph.write().unwrap();
    let mut chunk_graph = context.chunk_graph.write().unwrap();
    chunk_graph.clear();

    let entries = module_graph.get_entry_modules();
    let entry_roots: HashSet<ModuleId> = entries.iter().cloned().collect();
    let mut state = PartitionState::default();
    let mut edges: HashSet<(ChunkId, ChunkId)> = HashSet::new();

    for (root, name) in entry_names(&context.config, &entries) {
        let mut chunk = Chunk::new(root.clone(), ChunkType::Entry(root.clone(), name));
        let placed = fill_chunk(
            &mut chunk,
            &root,
            FillMode::Entry,
            &entry_roots,
            &module_graph,
            &mut state,
        );
        chunk_graph.add_chunk(chunk);
        state.ordered.push(root.clone());
        for id in placed {
            state.placements.entry(id).or_default().push(root.clone());
        }
    }
    let entry_chunk_ids = state.ordered.clone();

    if context.config.splitting {
        extract_shared_chunks(&mut chunk_graph, &entry_chunk_ids, &mut state, &mut edges);
    }

    // The queue grows while async and worker chunks are filled; nested
    // boundaries are processed in discovery order.
    let mut next = 0;
    while next < state.queue.len() {
        let Boundary { root, kind, from } = state.queue[next].clone();
        next += 1;
        if chunk_graph.has_chunk(&root) {
            if from != root && edges.insert((from.clone(), root.clone())) {
                chunk_graph.add_edge(&from, &root);
            }
            continue;
        }
        let isolated = kind == ResolveKind::Worker && context.config.isolate_workers;
        let chunk_type = if kind == ResolveKind::Worker {
            ChunkType::Worker(root.clone())
        } else {
            ChunkType::Async
        };
        let mode = if isolated {
            FillMode::All
        } else {
            FillMode::SkipPlaced
        };
        let mut chunk = Chunk::new(root.clone(), chunk_type);
        let placed = fill_chunk(&mut chunk, &root, mode, &entry_roots, &module_graph, &mut state);
        if !chunk.has_module(&root) {
            // The target already lives elsewhere; this chunk stays an empty
            // facade that re-exports from the owner.
            let owner = unique_home(&state.placements, &root).cloned();
            if let Some(owner) = owner {
                state.facades.push((root.clone(), owner, root.clone()));
            }
        }
        chunk_graph.add_chunk(chunk);
        state.ordered.push(root.clone());
        if edges.insert((from.clone(), root.clone())) {
            chunk_graph.add_edge(&from, &root);
        }
        let homes = if isolated {
            &mut state.worker_homes
        } else {
            &mut state.placements
        };
        for id in placed {
            homes.entry(id).or_default().push(root.clone());
        }
    }

    check_claims(&module_graph, &state, context.config.splitting)?;
    let imports = collect_cross_imports(&module_graph, &chunk_graph, &state)?;
    let rewritten = rewrite_boundary_refs(&mut module_graph, &chunk_graph);

    let mut chunks = Vec::with_capacity(state.ordered.len());
    for chunk_id in &state.ordered {
        let chunk = chunk_graph.chunk(chunk_id).unwrap();
        chunks.push(ChunkManifest {
            id: chunk.id.clone(),
            chunk_type: chunk.chunk_type.clone(),
            filename: chunk.filename(),
            modules: chunk.get_modules().iter().cloned().collect(),
            hash: chunk.hash(&module_graph),
        });
    }
    debug!(
        "partition: {} chunks, {} cross-chunk imports, {} boundary refs rewritten",
        chunks.len(),
        imports.len(),
        rewritten
    );
    Ok(PartitionOutput { chunks, imports })
}

/// Pairs each entry root with its configured name, in configuration order.
fn entry_names(config: &Config, entries: &[ModuleId]) -> Vec<(ModuleId, String)> {
    if entries.len() == config.entry.len() {
        entries
            .iter()
            .cloned()
            .zip(config.entry.keys().cloned())
            .collect()
    } else {
        // Several configured names resolved to one module; fall back to ids
        // so the pairing cannot skew.
        entries
            .iter()
            .map(|id| (id.clone(), id.id.clone()))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Boundary {
    root: ModuleId,
    kind: ResolveKind,
    from: ChunkId,
}

#[derive(Default)]
struct PartitionState {
    /// Chunks a module landed in, excluding isolated worker copies.
    placements: HashMap<ModuleId, Vec<ChunkId>>,
    /// Isolated worker copies, counted separately by the claim check.
    worker_homes: HashMap<ModuleId, Vec<ChunkId>>,
    /// Boundary targets discovered while filling.
    queue: Vec<Boundary>,
    /// Chunk ids in emission order.
    ordered: Vec<ChunkId>,
    /// `(facade chunk, owning chunk, module)` for boundary targets that
    /// already live elsewhere.
    facades: Vec<(ChunkId, ChunkId, ModuleId)>,
}

#[derive(Clone, Copy)]
enum FillMode {
    /// Place every live statically reachable module except other entry
    /// roots, which keep their own chunk.
    Entry,
    /// Reference modules that already have a unique home; place the rest.
    SkipPlaced,
    /// Place the full static closure, duplicating freely.
    All,
}

/// Walks the static dependency closure of `root`, inserting live modules
/// dependencies-first so the chunk root lands at the end. Dynamic-import
/// and worker edges are queued as new chunk roots instead of followed.
fn fill_chunk(
    chunk: &mut Chunk,
    root: &ModuleId,
    mode: FillMode,
    entry_roots: &HashSet<ModuleId>,
    module_graph: &ModuleGraph,
    state: &mut PartitionState,
) -> Vec<ModuleId> {
    enum Frame {
        Enter(ModuleId),
        Leave(ModuleId),
    }
    let mut visited = HashSet::new();
    let mut placed = vec![];
    let mut stack = vec![Frame::Enter(root.clone())];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(id) => {
                if !visited.insert(id.clone()) {
                    continue;
                }
                let live = module_graph
                    .get_module(&id)
                    .and_then(|m| m.info.as_ref())
                    .is_some_and(|info| info.live);
                if !live {
                    continue;
                }
                match mode {
                    FillMode::Entry => {
                        if id != *root && entry_roots.contains(&id) {
                            continue;
                        }
                    }
                    FillMode::SkipPlaced => {
                        if unique_home(&state.placements, &id).is_some() {
                            continue;
                        }
                    }
                    FillMode::All => {}
                }
                stack.push(Frame::Leave(id.clone()));
                let deps = module_graph.get_dependencies(&id);
                for (dep_id, dep) in &deps {
                    if !dep.resolve_kind.is_sync() {
                        state.queue.push(Boundary {
                            root: (*dep_id).clone(),
                            kind: dep.resolve_kind,
                            from: chunk.id.clone(),
                        });
                    }
                }
                for (dep_id, dep) in deps.iter().rev() {
                    if dep.resolve_kind.is_sync() && !visited.contains(*dep_id) {
                        stack.push(Frame::Enter((*dep_id).clone()));
                    }
                }
            }
            Frame::Leave(id) => {
                chunk.add_module(id.clone());
                placed.push(id);
            }
        }
    }
    placed
}

fn unique_home<'a>(
    placements: &'a HashMap<ModuleId, Vec<ChunkId>>,
    id: &ModuleId,
) -> Option<&'a ChunkId> {
    match placements.get(id).map(Vec::as_slice) {
        Some([home]) => Some(home),
        _ => None,
    }
}

/// Moves modules shared by several entry chunks into shared chunks, one per
/// distinct consumer set. Entry roots stay where they are; a chunk that
/// reaches one imports it instead.
fn extract_shared_chunks(
    chunk_graph: &mut ChunkGraph,
    entry_chunks: &[ChunkId],
    state: &mut PartitionState,
    edges: &mut HashSet<(ChunkId, ChunkId)>,
) {
    let mut consumers: HashMap<ModuleId, Vec<ChunkId>> = HashMap::new();
    for chunk_id in entry_chunks {
        for module_id in chunk_graph.chunk(chunk_id).unwrap().get_modules().iter() {
            consumers
                .entry(module_id.clone())
                .or_default()
                .push(chunk_id.clone());
        }
    }

    // Keyed by sorted consumer set; the map order makes shared-chunk order
    // and naming reproducible. Module order inside a group follows the
    // first consuming chunk, so dependencies keep preceding their users.
    let mut groups: BTreeMap<Vec<ChunkId>, Vec<ModuleId>> = BTreeMap::new();
    for chunk_id in entry_chunks {
        for module_id in chunk_graph.chunk(chunk_id).unwrap().get_modules().iter() {
            if entry_chunks.contains(module_id) {
                continue;
            }
            let owners = &consumers[module_id];
            if owners.len() < 2 || owners[0] != *chunk_id {
                continue;
            }
            let mut key = owners.clone();
            key.sort();
            groups.entry(key).or_default().push(module_id.clone());
        }
    }

    for (owners, modules) in groups {
        let id = shared_chunk_id(&owners);
        let mut shared = Chunk::new(id.clone(), ChunkType::Shared);
        for module_id in &modules {
            shared.add_module(module_id.clone());
        }
        chunk_graph.add_chunk(shared);
        state.ordered.push(id.clone());
        for owner in &owners {
            let chunk = chunk_graph.mut_chunk(owner).unwrap();
            for module_id in &modules {
                chunk.remove_module(module_id);
            }
            if edges.insert((owner.clone(), id.clone())) {
                chunk_graph.add_edge(owner, &id);
            }
        }
        for module_id in modules {
            state.placements.insert(module_id, vec![id.clone()]);
        }
    }
}

fn shared_chunk_id(consumers: &[ChunkId]) -> ChunkId {
    let mut hasher: XxHash64 = Default::default();
    for id in consumers {
        hasher.write(id.id.as_bytes());
        hasher.write_u8(0);
    }
    ChunkId::new(format!("shared-{:016x}", hasher.finish()))
}

/// Every live module must have landed somewhere, and under splitting no
/// module may keep more than one importable home. A violation is a bug in
/// the partitioner, not in user input.
fn check_claims(module_graph: &ModuleGraph, state: &PartitionState, splitting: bool) -> Result<()> {
    let mut ids = module_graph.get_module_ids();
    ids.sort();
    for id in ids {
        let live = module_graph
            .get_module(&id)
            .and_then(|m| m.info.as_ref())
            .is_some_and(|info| info.live);
        if !live {
            continue;
        }
        let homes = state.placements.get(&id).map_or(0, |h| h.len());
        let worker_homes = state.worker_homes.get(&id).map_or(0, |h| h.len());
        if homes + worker_homes == 0 {
            return Err(anyhow!(CompileError::Partition {
                module: id,
                claims: 0,
            }));
        }
        if splitting && homes > 1 {
            return Err(anyhow!(CompileError::Partition {
                module: id,
                claims: homes,
            }));
        }
    }
    Ok(())
}

/// Builds the import-record table from every static edge that leaves its
/// chunk. The target of such an edge must have exactly one importable home.
fn collect_cross_imports(
    module_graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
    state: &PartitionState,
) -> Result<Vec<CrossChunkImport>> {
    let mut table: BTreeMap<(ChunkId, ChunkId, ModuleId), BTreeSet<String>> = BTreeMap::new();
    for (facade, owner, module) in &state.facades {
        table
            .entry((facade.clone(), owner.clone(), module.clone()))
            .or_default()
            .insert("*".to_string());
    }
    for chunk_id in &state.ordered {
        let chunk = chunk_graph.chunk(chunk_id).unwrap();
        for module_id in chunk.get_modules().iter() {
            let Some(module) = module_graph.get_module(module_id) else {
                continue;
            };
            let Some(info) = &module.info else {
                continue;
            };
            for (dep_id, dep) in module_graph.get_dependencies(module_id) {
                if !dep.resolve_kind.is_sync() || chunk.has_module(dep_id) {
                    continue;
                }
                let homes = state.placements.get(dep_id).map_or(&[][..], Vec::as_slice);
                let [owner] = homes else {
                    return Err(anyhow!(CompileError::Partition {
                        module: dep_id.clone(),
                        claims: homes.len(),
                    }));
                };
                let names = table
                    .entry((chunk_id.clone(), owner.clone(), dep_id.clone()))
                    .or_default();
                if dep.resolve_kind == ResolveKind::Require {
                    names.insert("*".to_string());
                }
                collect_binding_names(info, dep_id, names);
            }
        }
    }
    Ok(table
        .into_iter()
        .map(|((from, to, module), names)| CrossChunkImport {
            from,
            to,
            module,
            names: names.into_iter().collect(),
        })
        .collect())
}

/// Names `info` binds from `target`: import specifiers plus re-export
/// names. `"*"` stands for the whole namespace.
fn collect_binding_names(info: &ModuleInfo, target: &ModuleId, names: &mut BTreeSet<String>) {
    for import in info.imports.values() {
        if import.source == *target {
            match &import.imported {
                ImportedName::Named(name) => names.insert(name.clone()),
                ImportedName::Namespace => names.insert("*".to_string()),
            };
        }
    }
    for (_, binding) in info.exports.iter() {
        match binding {
            ExportBinding::Reexport { source, name } if source == target => {
                names.insert(name.clone());
            }
            ExportBinding::Namespace { source } if source == target => {
                names.insert("*".to_string());
            }
            _ => {}
        }
    }
    if info.exports.stars().contains(target) {
        names.insert("*".to_string());
    }
}

#[derive(Debug, Clone)]
struct BoundaryRewrite {
    filename: String,
    /// Append `{type: "module"}` to the `Worker` call.
    module_worker: bool,
}

/// Rewrites `import()` and `new Worker(...)` specifiers to the filenames of
/// the chunks they load. Worker calls of ESM chunks that pass no options
/// gain a `{type: "module"}` argument.
fn rewrite_boundary_refs(module_graph: &mut ModuleGraph, chunk_graph: &ChunkGraph) -> usize {
    let mut plans: Vec<(ModuleId, HashMap<(String, ResolveKind), BoundaryRewrite>)> = vec![];
    let mut ids = module_graph.get_module_ids();
    ids.sort();
    for id in &ids {
        let Some(module) = module_graph.get_module(id) else {
            continue;
        };
        let Some(info) = &module.info else {
            continue;
        };
        if !info.live || !info.kind.is_script() {
            continue;
        }
        let mut map = HashMap::new();
        for (dep_id, dep) in module_graph.get_dependencies(id) {
            if dep.resolve_kind.is_sync() {
                continue;
            }
            let Some(chunk) = chunk_graph.chunk(dep_id) else {
                continue;
            };
            let esm = module_graph
                .get_module(dep_id)
                .and_then(|m| m.info.as_ref())
                .is_some_and(|i| i.kind == ModuleKind::Esm);
            map.insert(
                (dep.source.clone(), dep.resolve_kind),
                BoundaryRewrite {
                    filename: chunk.filename(),
                    module_worker: dep.resolve_kind == ResolveKind::Worker && esm,
                },
            );
        }
        if !map.is_empty() {
            plans.push((id.clone(), map));
        }
    }

    let mut changed = 0;
    for (id, map) in plans {
        let info = module_graph.get_module_mut(&id).unwrap().info_mut();
        let mut rewriter = RewriteBoundaries {
            map: &map,
            changed: 0,
        };
        rewriter.visit_mut_module(&mut info.ast);
        changed += rewriter.changed;
    }
    changed
}

struct RewriteBoundaries<'a> {
    map: &'a HashMap<(String, ResolveKind), BoundaryRewrite>,
    changed: usize,
}

impl VisitMut for RewriteBoundaries<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        walk_mut_expr(self, expr);
        match expr {
            Expr::Call(call) => {
                if !matches!(call.callee, Callee::Import) {
                    return;
                }
                let Some(first) = call.args.first_mut() else {
                    return;
                };
                if first.spread {
                    return;
                }
                let Expr::Lit(Lit::Str(source)) = &mut first.expr else {
                    return;
                };
                if let Some(rewrite) = self.map.get(&(source.clone(), ResolveKind::DynamicImport)) {
                    *source = rewrite.filename.clone();
                    self.changed += 1;
                }
            }
            Expr::New(new) => {
                if !new.callee.as_ident().is_some_and(|i| is_free(i, "Worker")) {
                    return;
                }
                let Some(source) = worker_url_slot(&mut new.args) else {
                    return;
                };
                let Some(rewrite) = self.map.get(&(source.clone(), ResolveKind::Worker)) else {
                    return;
                };
                *source = rewrite.filename.clone();
                self.changed += 1;
                if rewrite.module_worker && new.args.len() == 1 {
                    new.args.push(Arg::plain(module_worker_options()));
                }
            }
            _ => {}
        }
    }
}

/// A mutable handle on the worker specifier, for either supported shape:
/// `new Worker("./w.js")` or `new Worker(new URL("./w.js", import.meta.url))`.
fn worker_url_slot(args: &mut [Arg]) -> Option<&mut String> {
    let first = args.first_mut()?;
    if first.spread {
        return None;
    }
    match &mut first.expr {
        Expr::Lit(Lit::Str(source)) => Some(source),
        Expr::New(url) => {
            if !url.callee.as_ident().is_some_and(|i| is_free(i, "URL")) {
                return None;
            }
            let base_is_meta_url = url.args.get(1).is_some_and(|base| {
                !base.spread
                    && matches!(
                        &base.expr,
                        Expr::Member(member)
                            if matches!(&*member.obj, Expr::MetaProp(_))
                                && matches!(&member.prop, MemberProp::Ident(p) if p == "url")
                    )
            });
            if !base_is_meta_url {
                return None;
            }
            let spec = url.args.first_mut()?;
            if spec.spread {
                return None;
            }
            match &mut spec.expr {
                Expr::Lit(Lit::Str(source)) => Some(source),
                _ => None,
            }
        }
        _ => None,
    }
}

fn module_worker_options() -> Expr {
    Expr::Object(ObjectLit {
        props: vec![Prop::KeyValue {
            key: PropName::Ident("type".to_string()),
            value: Expr::Lit(Lit::Str("module".to_string())),
        }],
        span: DUMMY_SP,
    })
}

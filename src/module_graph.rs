use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::prelude::EdgeRef;
use petgraph::stable_graph::{StableDiGraph, WalkNeighbors};
use petgraph::visit::IntoEdgeReferences;
use petgraph::Direction;

use crate::module::{Dependency, Module, ModuleId, ResolveKind};

pub struct ModuleGraph {
    id_index_map: HashMap<ModuleId, NodeIndex<DefaultIx>>,
    pub graph: StableDiGraph<Module, Dependency>,
    /// Entry ids in configuration order.
    entries: Vec<ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self {
            id_index_map: HashMap::new(),
            graph: StableDiGraph::new(),
            entries: Vec::new(),
        }
    }

    pub fn get_entry_modules(&self) -> Vec<ModuleId> {
        self.entries.clone()
    }

    pub fn add_module(&mut self, module: Module) {
        let id_for_map = module.id.clone();
        let id_for_entry = module.id.clone();
        let is_entry = module.is_entry;
        let idx = self.graph.add_node(module);
        self.id_index_map.insert(id_for_map, idx);
        if is_entry && !self.entries.contains(&id_for_entry) {
            self.entries.push(id_for_entry);
        }
    }

    pub fn has_module(&self, module_id: &ModuleId) -> bool {
        self.id_index_map.contains_key(module_id)
    }

    pub fn get_module(&self, module_id: &ModuleId) -> Option<&Module> {
        self.id_index_map
            .get(module_id)
            .and_then(|i| self.graph.node_weight(*i))
    }

    pub fn get_module_mut(&mut self, module_id: &ModuleId) -> Option<&mut Module> {
        self.id_index_map
            .get(module_id)
            .and_then(|i| self.graph.node_weight_mut(*i))
    }

    pub fn get_modules(&self) -> Vec<&Module> {
        self.graph.node_weights().collect()
    }

    pub fn get_module_ids(&self) -> Vec<ModuleId> {
        self.graph
            .node_weights()
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn add_dependency(&mut self, from: &ModuleId, to: &ModuleId, edge: Dependency) {
        let from = self
            .id_index_map
            .get(from)
            .unwrap_or_else(|| panic!("module_id {:?} not found in the module graph", from));
        let to = self
            .id_index_map
            .get(to)
            .unwrap_or_else(|| panic!("module_id {:?} not found in the module graph", to));
        // Parallel edges are meaningful (a module can be both statically and
        // dynamically imported by the same importer), but a repeat of the
        // same record kind is not.
        let duplicate = self
            .graph
            .edges_connecting(*from, *to)
            .any(|e| e.weight().resolve_kind == edge.resolve_kind);
        if !duplicate {
            self.graph.add_edge(*from, *to, edge);
        }
    }

    /// Drops the edge a removed record backed. A no-op when either side is
    /// gone or the edge never existed.
    pub fn remove_dependency(&mut self, from: &ModuleId, to: &ModuleId, kind: ResolveKind) {
        let (Some(from), Some(to)) = (self.id_index_map.get(from), self.id_index_map.get(to))
        else {
            return;
        };
        let stale: Vec<_> = self
            .graph
            .edges_connecting(*from, *to)
            .filter(|e| e.weight().resolve_kind == kind)
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
    }

    fn get_edges(&self, module_id: &ModuleId, direction: Direction) -> WalkNeighbors<u32> {
        let i = self
            .id_index_map
            .get(module_id)
            .unwrap_or_else(|| panic!("module_id {:?} not found in the module graph", module_id));
        self.graph.neighbors_directed(*i, direction).detach()
    }

    pub fn get_dependencies(&self, module_id: &ModuleId) -> Vec<(&ModuleId, &Dependency)> {
        let mut edges = self.get_edges(module_id, Direction::Outgoing);
        let mut deps: Vec<(&ModuleId, &Dependency)> = vec![];
        while let Some((edge_index, node_index)) = edges.next(&self.graph) {
            let dependency = self.graph.edge_weight(edge_index).unwrap();
            let module = self.graph.node_weight(node_index).unwrap();
            deps.push((&module.id, dependency));
        }
        deps.sort_by_key(|(_, dep)| dep.order);
        deps
    }

    pub fn get_dependents(&self, module_id: &ModuleId) -> Vec<ModuleId> {
        let mut edges = self.get_edges(module_id, Direction::Incoming);
        let mut dependents = vec![];
        while let Some((_, node_index)) = edges.next(&self.graph) {
            let module = self.graph.node_weight(node_index).unwrap();
            dependents.push(module.id.clone());
        }
        dependents.sort();
        dependents
    }

    /// Topological order (importers before what they import) plus the
    /// strongly connected cycle groups. The order comes from a DFS over
    /// entry-reachable modules in record order, so it is identical no
    /// matter in which order parallel discovery inserted the nodes.
    pub fn toposort(&self) -> (Vec<ModuleId>, Vec<Vec<ModuleId>>) {
        let mut visited = HashSet::new();
        let mut post = Vec::new();
        for entry in &self.entries {
            self.dfs_postorder(entry, &mut visited, &mut post);
        }
        let mut unreached: Vec<ModuleId> = self
            .graph
            .node_weights()
            .map(|m| m.id.clone())
            .filter(|id| !visited.contains(id))
            .collect();
        unreached.sort();
        for id in unreached {
            self.dfs_postorder(&id, &mut visited, &mut post);
        }
        post.reverse();

        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || (scc.len() == 1 && self.graph.find_edge(scc[0], scc[0]).is_some())
            })
            .map(|scc| {
                let mut ids: Vec<ModuleId> = scc
                    .iter()
                    .filter_map(|i| self.graph.node_weight(*i))
                    .map(|m| m.id.clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();

        (post, cycles)
    }

    fn dfs_postorder(
        &self,
        start: &ModuleId,
        visited: &mut HashSet<ModuleId>,
        out: &mut Vec<ModuleId>,
    ) {
        enum Frame {
            Enter(ModuleId),
            Leave(ModuleId),
        }
        let mut stack = vec![Frame::Enter(start.clone())];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if !visited.insert(id.clone()) {
                        continue;
                    }
                    if !self.has_module(&id) {
                        continue;
                    }
                    stack.push(Frame::Leave(id.clone()));
                    let deps = self.get_dependencies(&id);
                    for (dep_id, _) in deps.iter().rev() {
                        if !visited.contains(*dep_id) {
                            stack.push(Frame::Enter((*dep_id).clone()));
                        }
                    }
                }
                Frame::Leave(id) => out.push(id),
            }
        }
    }
}

impl fmt::Display for ModuleGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut nodes = self
            .graph
            .node_weights()
            .map(|node| &node.id.id)
            .collect::<Vec<_>>();
        let mut references = self
            .graph
            .edge_references()
            .map(|edge| {
                let source = &self.graph[edge.source()].id.id;
                let target = &self.graph[edge.target()].id.id;
                format!("{} -> {}", source, target)
            })
            .collect::<Vec<_>>();
        nodes.sort_by_key(|id| id.to_string());
        references.sort_by_key(|id| id.to_string());
        write!(
            f,
            "graph\n nodes:{:?} \n references:{:?}",
            &nodes, &references
        )
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

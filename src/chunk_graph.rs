use core::fmt;
use std::collections::HashMap;
use std::hash::Hasher;

use petgraph::stable_graph::{DefaultIx, NodeIndex, StableDiGraph};
use petgraph::Direction;
use twox_hash::XxHash64;

use crate::chunk::{Chunk, ChunkId, ChunkType};
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;

pub struct ChunkGraph {
    pub(crate) graph: StableDiGraph<Chunk, ()>,
    id_index_map: HashMap<ChunkId, NodeIndex<DefaultIx>>,
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index_map: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index_map.clear();
    }

    pub fn add_chunk(&mut self, chunk: Chunk) {
        let chunk_id = chunk.id.clone();
        let node_index = self.graph.add_node(chunk);
        self.id_index_map.insert(chunk_id, node_index);
    }

    pub fn has_chunk(&self, chunk_id: &ChunkId) -> bool {
        self.id_index_map.contains_key(chunk_id)
    }

    pub fn get_chunks(&self) -> Vec<&Chunk> {
        self.get_all_chunks()
            .into_iter()
            .filter(|c| !c.modules.is_empty())
            .collect()
    }

    pub fn get_all_chunks(&self) -> Vec<&Chunk> {
        self.graph.node_weights().collect()
    }

    pub fn mut_chunks(&mut self) -> Vec<&mut Chunk> {
        self.graph.node_weights_mut().collect()
    }

    pub fn get_chunk_for_module(&self, module_id: &ModuleId) -> Option<&Chunk> {
        self.graph.node_weights().find(|c| c.has_module(module_id))
    }

    pub fn chunk(&self, chunk_id: &ChunkId) -> Option<&Chunk> {
        match self.id_index_map.get(chunk_id) {
            Some(idx) => self.graph.node_weight(*idx),
            None => None,
        }
    }

    pub fn mut_chunk(&mut self, chunk_id: &ChunkId) -> Option<&mut Chunk> {
        match self.id_index_map.get(chunk_id) {
            Some(idx) => self.graph.node_weight_mut(*idx),
            None => None,
        }
    }

    pub fn add_edge(&mut self, from: &ChunkId, to: &ChunkId) {
        let from = self.id_index_map.get(from).unwrap();
        let to = self.id_index_map.get(to).unwrap();
        self.graph.add_edge(*from, *to, ());
    }

    pub fn full_hash(&self, module_graph: &ModuleGraph) -> u64 {
        let mut chunks = self.get_all_chunks();
        chunks.sort_by_key(|c| c.id.id.clone());

        let mut hasher: XxHash64 = Default::default();
        for c in chunks {
            hasher.write_u64(c.hash(module_graph))
        }
        hasher.finish()
    }

    /// Entry chunks that transitively load the given chunk, sorted by id.
    pub fn entry_ancestors_chunk(&self, chunk_id: &ChunkId) -> Vec<ChunkId> {
        let mut stack = vec![*self.id_index_map.get(chunk_id).unwrap()];
        let mut ret = vec![];
        let mut visited = vec![];

        while let Some(idx) = stack.pop() {
            if visited.contains(&idx.index()) {
                continue;
            }
            visited.push(idx.index());

            if matches!(self.graph[idx].chunk_type, ChunkType::Entry(_, _)) {
                ret.push(self.graph[idx].id.clone());
            }

            stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
        }

        ret.sort_by_key(|id| id.id.clone());
        ret
    }
}

impl Default for ChunkGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes = self
            .graph
            .node_weights()
            .map(|node| &node.id.id)
            .collect::<Vec<_>>();
        nodes.sort_by_key(|id| id.to_string());
        write!(f, "graph\n nodes:{:?}", &nodes)
    }
}

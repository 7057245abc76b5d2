use std::fmt::{Debug, Formatter};
use std::hash::Hasher;
use std::path::{Component, Path};

use hashlink::LinkedHashSet;
use twox_hash::XxHash64;

use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;

pub type ChunkId = ModuleId;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChunkType {
    /**
     * Entry(root_module_id, entry_name)
     */
    Entry(ModuleId, String),
    /// Modules consumed by more than one entry chunk, extracted exactly once.
    Shared,
    /// `import()` target, loaded on demand.
    Async,
    /// `new Worker(...)` target; the payload is the worker's root module.
    Worker(ModuleId),
}

pub struct Chunk {
    pub id: ChunkId,
    pub chunk_type: ChunkType,
    pub modules: LinkedHashSet<ModuleId>,
}

impl Debug for Chunk {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{}({:?})",
            self.id.id,
            self.modules.len(),
            self.chunk_type
        )?;
        Ok(())
    }
}

impl Chunk {
    pub fn new(id: ChunkId, chunk_type: ChunkType) -> Self {
        Self {
            modules: LinkedHashSet::new(),
            id,
            chunk_type,
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.chunk_type, ChunkType::Entry(_, _))
    }

    pub fn is_worker(&self) -> bool {
        matches!(self.chunk_type, ChunkType::Worker(_))
    }

    pub fn filename(&self) -> String {
        match &self.chunk_type {
            // foo/bar.tsx -> bar.js
            ChunkType::Entry(_, name) => format!("{}.js", name),
            // the id already carries the consumer-set hash
            ChunkType::Shared => format!("{}.js", self.id.id),
            // foo/bar.tsx -> foo_bar_tsx-async.js
            ChunkType::Async | ChunkType::Worker(_) => {
                let path = Path::new(&self.id.id);

                let name = path
                    .components()
                    .filter(|c| !matches!(c, Component::RootDir | Component::CurDir))
                    .map(|c| match c {
                        Component::ParentDir => "pd_".to_string(),
                        Component::Prefix(_) => "ps_".to_string(),
                        Component::RootDir => "".to_string(),
                        Component::CurDir => "".to_string(),
                        Component::Normal(seg) => {
                            seg.to_string_lossy().replace(['.', '?', '@'], "_")
                        }
                    })
                    .collect::<Vec<String>>()
                    .join("_");

                format!(
                    "{}-{}.js",
                    name,
                    if matches!(self.chunk_type, ChunkType::Worker(_)) {
                        "worker"
                    } else {
                        "async"
                    }
                )
            }
        }
    }

    pub fn add_module(&mut self, module_id: ModuleId) {
        self.modules.insert(module_id);
    }

    pub fn get_modules(&self) -> &LinkedHashSet<ModuleId> {
        &self.modules
    }

    pub fn remove_module(&mut self, module_id: &ModuleId) {
        self.modules.remove(module_id);
    }

    pub fn has_module(&self, module_id: &ModuleId) -> bool {
        self.modules.contains(module_id)
    }

    /// The module whose execution starts this chunk. Modules are inserted
    /// dependencies-first, so the root sits at the end of the set.
    pub fn root_module(&self) -> Option<&ModuleId> {
        self.modules.back()
    }

    pub fn hash(&self, mg: &ModuleGraph) -> u64 {
        let mut sorted_module_ids = self.modules.iter().cloned().collect::<Vec<ModuleId>>();
        sorted_module_ids.sort_by_key(|m| m.id.to_string());

        let mut hash: XxHash64 = Default::default();

        for id in sorted_module_ids {
            let m = mg.get_module(&id).unwrap();

            if let Some(info) = &m.info {
                hash.write_u64(info.raw_hash);
            } else {
                hash.write(m.id.id.as_bytes());
            }
        }

        hash.finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::chunk::{Chunk, ChunkType};
    use crate::module::ModuleId;

    #[test]
    fn test_filename() {
        let module_id = ModuleId::new("foo/bar.tsx");
        let chunk = Chunk::new(
            module_id.clone(),
            ChunkType::Entry(module_id, "foo_bar".to_string()),
        );
        assert_eq!(chunk.filename(), "foo_bar.js");

        let chunk = Chunk::new(ModuleId::new("./foo/bar.tsx"), ChunkType::Async);
        assert_eq!(chunk.filename(), "foo_bar_tsx-async.js");

        let worker_id = ModuleId::new("foo/w.js");
        let chunk = Chunk::new(worker_id.clone(), ChunkType::Worker(worker_id));
        assert_eq!(chunk.filename(), "foo_w_js-worker.js");

        let chunk = Chunk::new(ModuleId::new("shared-73cafa8e29a14a10"), ChunkType::Shared);
        assert_eq!(chunk.filename(), "shared-73cafa8e29a14a10.js");
    }

    #[test]
    fn test_root_module_is_last() {
        let mut chunk = Chunk::new(ModuleId::new("entry"), ChunkType::Async);
        chunk.add_module(ModuleId::new("leaf"));
        chunk.add_module(ModuleId::new("mid"));
        chunk.add_module(ModuleId::new("entry"));
        assert_eq!(chunk.root_module(), Some(&ModuleId::new("entry")));
    }
}

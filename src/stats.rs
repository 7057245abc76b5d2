//! Build report assembled after partitioning: per-chunk and per-module
//! summaries plus the collected diagnostics, serializable for whatever
//! surface consumes the core. The core never prints a report itself.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::chunk::ChunkType;
use crate::compiler::Context;
use crate::diagnostics::Diagnostic;
use crate::module::DceMarker;
use crate::partition::PartitionOutput;

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub chunks: Vec<ChunkReport>,
    pub modules: Vec<ModuleReport>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub filename: String,
    pub kind: &'static str,
    pub modules: Vec<String>,
    /// Entry chunks that can end up loading this chunk.
    pub entries: Vec<String>,
    /// Content hash as hex, for cache keys downstream.
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub id: String,
    pub live: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dce: Vec<DceMarker>,
}

pub fn build_report(context: &Arc<Context>, output: &PartitionOutput) -> BuildReport {
    let module_graph = context.module_graph.read().unwrap();
    let chunk_graph = context.chunk_graph.read().unwrap();

    let chunks = output
        .chunks
        .iter()
        .map(|manifest| ChunkReport {
            filename: manifest.filename.clone(),
            kind: chunk_kind(&manifest.chunk_type),
            modules: manifest.modules.iter().map(|m| m.id.clone()).collect(),
            entries: chunk_graph
                .entry_ancestors_chunk(&manifest.id)
                .into_iter()
                .map(|id| id.id)
                .collect(),
            hash: format!("{:016x}", manifest.hash),
        })
        .collect();

    let mut ids = module_graph.get_module_ids();
    ids.sort();
    let modules: Vec<ModuleReport> = ids
        .into_iter()
        .filter_map(|id| {
            let module = module_graph.get_module(&id)?;
            let info = module.info.as_ref()?;
            Some(ModuleReport {
                id: id.id,
                live: info.live,
                dce: info.dce_markers.clone(),
            })
        })
        .collect();

    let report = BuildReport {
        chunks,
        modules,
        diagnostics: context.diagnostics.collect(),
    };
    debug!(
        "report: {} chunks, {} modules, {} diagnostics",
        report.chunks.len(),
        report.modules.len(),
        report.diagnostics.len()
    );
    report
}

fn chunk_kind(chunk_type: &ChunkType) -> &'static str {
    match chunk_type {
        ChunkType::Entry(_, _) => "entry",
        ChunkType::Shared => "shared",
        ChunkType::Async => "async",
        ChunkType::Worker(_) => "worker",
    }
}

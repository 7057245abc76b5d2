use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::chunk_graph::ChunkGraph;
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::error::CompileError;
use crate::host::{Loader, Parser, Resolver};
use crate::module_graph::ModuleGraph;
use crate::partition::PartitionOutput;
use crate::stats::BuildReport;
use crate::{partition, stats, tree_shaking};

pub struct Context {
    pub module_graph: RwLock<ModuleGraph>,
    pub chunk_graph: RwLock<ChunkGraph>,
    pub config: Config,
    pub diagnostics: DiagnosticSink,
    cancelled: AtomicBool,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self {
            module_graph: RwLock::new(ModuleGraph::new()),
            chunk_graph: RwLock::new(ChunkGraph::new()),
            config,
            diagnostics: DiagnosticSink::default(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Ask the in-progress build to stop. Checked between pipeline stages
    /// and between discovery steps; a cancelled build never emits.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

pub struct CompileOutput {
    pub chunks: PartitionOutput,
    pub report: BuildReport,
}

pub struct Compiler {
    pub context: Arc<Context>,
    pub(crate) parser: Arc<dyn Parser>,
    pub(crate) resolver: Arc<dyn Resolver>,
    pub(crate) loader: Arc<dyn Loader>,
}

impl Compiler {
    pub fn new(
        config: Config,
        parser: Arc<dyn Parser>,
        resolver: Arc<dyn Resolver>,
        loader: Arc<dyn Loader>,
    ) -> Self {
        Self {
            context: Arc::new(Context::new(config)),
            parser,
            resolver,
            loader,
        }
    }

    /// The whole pipeline: graph build, shaking and folding to a fixpoint,
    /// then chunk partitioning and the build report.
    pub fn compile(&self) -> Result<CompileOutput> {
        debug!("compile");
        let t_compile = Instant::now();
        let module_ids = self.build()?;
        self.check_cancelled()?;
        tree_shaking::optimize_module_graph(&self.context)?;
        self.check_cancelled()?;
        let chunks = partition::partition_chunks(&self.context)?;
        let report = stats::build_report(&self.context, &chunks);
        info!(
            "{} modules transformed in {}ms",
            module_ids.len(),
            t_compile.elapsed().as_millis()
        );
        Ok(CompileOutput { chunks, report })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.context.is_cancelled() {
            let mut module_graph = self.context.module_graph.write().unwrap();
            *module_graph = ModuleGraph::new();
            return Err(anyhow!(CompileError::Cancelled));
        }
        Ok(())
    }
}

use thiserror::Error;

use crate::ast;
use crate::ast::comments::CommentStore;
use crate::error::ResolveError;
use crate::module::{ModuleId, ModuleKind, PackageInfo, ResolveKind};

/// Parse result: the statement list plus the comment positions the parser
/// saw. Symbols are bound by the graph builder, so the AST may come in
/// unbound.
pub struct ParsedSource {
    pub module: ast::Module,
    pub comments: CommentStore,
}

#[derive(Debug, Error)]
#[error("parse error in \"{path}\": {message}")]
pub struct ParseError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: ModuleId,
}

impl ResolvedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ModuleId::new(id),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to load \"{id}\": {message}")]
pub struct LoadError {
    pub id: String,
    pub message: String,
}

/// What the loader hands back for a resolved id: the source text, how the
/// module should be treated, and the nearest enclosing package manifest
/// excerpt (side-effect policy, commonjs tag).
pub struct LoadedModule {
    pub source: String,
    pub kind: ModuleKind,
    pub package: Option<PackageInfo>,
}

pub trait Parser: Send + Sync {
    fn parse(&self, source: &str, path: &str) -> Result<ParsedSource, ParseError>;
}

pub trait Resolver: Send + Sync {
    /// `importer` is `None` when resolving a configured entry.
    fn resolve(
        &self,
        specifier: &str,
        importer: Option<&ModuleId>,
        kind: ResolveKind,
    ) -> Result<ResolvedId, ResolveError>;
}

pub trait Loader: Send + Sync {
    fn load(&self, id: &ModuleId) -> Result<LoadedModule, LoadError>;
}

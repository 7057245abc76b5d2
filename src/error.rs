use thiserror::Error;

use crate::module::ModuleId;

/// An import specifier no installed resolver could satisfy. Always fatal,
/// attributed to the importer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot resolve \"{specifier}\" from \"{importer}\"")]
pub struct ResolveError {
    pub specifier: String,
    pub importer: String,
}

/// Fatal build errors. Non-fatal findings travel through
/// [`crate::diagnostics::DiagnosticSink`] instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("\"{exporter}\" has no export named \"{name}\", imported by \"{importer}\"")]
    ExportMismatch {
        exporter: ModuleId,
        name: String,
        importer: ModuleId,
    },

    #[error("re-export of \"{name}\" cycles through \"{module}\" without reaching a binding")]
    ExportCycle { module: ModuleId, name: String },

    /// A module ended up in zero or several chunks. This is an internal
    /// invariant, not a user error.
    #[error("chunk partition claimed module \"{module}\" {claims} times")]
    Partition { module: ModuleId, claims: usize },

    #[error("build cancelled")]
    Cancelled,
}

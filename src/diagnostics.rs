//! Non-fatal findings collected across the whole build and handed to the
//! report consumer at the end. The core never prints these itself.

use std::sync::Mutex;

use serde::Serialize;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A CommonJS shape the static analysis could not see through; the
    /// import degrades to a dynamic namespace object.
    Interop,
    /// A star-namespace member that no source module supplies; reads yield
    /// `undefined` at runtime.
    UndefinedExport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub module: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u32>,
}

/// Shared sink on the build context. Locked per push; contention is
/// irrelevant next to parse work.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn warn(&self, kind: DiagnosticKind, module: &str, message: impl Into<String>) {
        self.warn_at(kind, module, message, None);
    }

    pub fn warn_at(
        &self,
        kind: DiagnosticKind,
        module: &str,
        message: impl Into<String>,
        span: Option<Span>,
    ) {
        let message = message.into();
        tracing::warn!("{}: {}", module, message);
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                kind,
                module: module.to_string(),
                message,
                start: span.map(|s| s.lo),
                end: span.map(|s| s.hi),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.is_empty())
            .unwrap_or(true)
    }

    /// Snapshot for the build report, ordered by module then position so
    /// output is stable.
    pub fn collect(&self) -> Vec<Diagnostic> {
        let mut out = self
            .diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default();
        out.sort_by(|a, b| {
            a.module
                .cmp(&b.module)
                .then(a.start.cmp(&b.start))
                .then(a.message.cmp(&b.message))
        });
        out
    }
}

use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ast;
use crate::ast::bind::SymbolTable;
use crate::exports::{ExportMap, ImportMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub source: String,
    pub resolve_kind: ResolveKind,
    /// Source order of the record inside the importer, used to keep
    /// dependency iteration deterministic.
    pub order: usize,
    pub span: ast::Span,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ResolveKind {
    Import,
    ExportFrom,
    Require,
    DynamicImport,
    Worker,
    Css,
}

impl ResolveKind {
    /// Whether the edge keeps the target in the same chunk group. Dynamic
    /// imports and workers are always chunk boundaries.
    pub fn is_sync(&self) -> bool {
        !matches!(self, ResolveKind::DynamicImport | ResolveKind::Worker)
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct ModuleId {
    pub id: String,
}

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        ModuleId::new(id)
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Closed set of module formats the core understands. Everything the graph
/// does downstream branches on this tag, never on file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Esm,
    Cjs,
    Json,
    Asset,
}

impl ModuleKind {
    pub fn is_script(&self) -> bool {
        matches!(self, ModuleKind::Esm | ModuleKind::Cjs)
    }
}

/// The slice of the nearest enclosing package manifest the loader hands
/// over. `root` is where the manifest sits, so `sideEffects` globs can be
/// matched against package-relative paths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageInfo {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub pkg_type: Option<String>,
    #[serde(rename = "sideEffects")]
    pub side_effects: Option<serde_json::Value>,
    #[serde(skip)]
    pub root: Option<String>,
}

impl PackageInfo {
    pub fn is_commonjs(&self) -> bool {
        self.pkg_type.as_deref() == Some("commonjs")
    }
}

/// Keep/remove decision for one top-level statement, recorded by the last
/// shake pass for the build report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DceMarker {
    pub start: u32,
    pub end: u32,
    pub kept: bool,
    pub reason: DceReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DceReason {
    /// Statement of an entry module; every entry statement runs.
    EntryRoot,
    /// Demanded through a used export or a symbol a live statement reads.
    Reachable,
    /// Executes at load time and the side-effect policy keeps it.
    SideEffecting,
    /// Nothing demanded it.
    Unreferenced,
    /// Follows a statement that unconditionally ends evaluation.
    Unreachable,
    /// Contained calls, every one `@__PURE__`-annotated, so removal was
    /// allowed despite them.
    PragmaForced,
}

pub struct ModuleInfo {
    pub ast: ast::Module,
    pub symbols: SymbolTable,
    pub exports: ExportMap,
    pub imports: ImportMap,
    pub kind: ModuleKind,
    pub path: String,
    pub package: Option<PackageInfo>,
    /// XxHash64 of the loaded source, carried into chunk hashes.
    pub raw_hash: u64,
    /// Cleared by the shaker once no live statement needs the module.
    pub live: bool,
    pub dce_markers: Vec<DceMarker>,
}

impl ModuleInfo {
    /// What the package manifest says about this module's side effects.
    /// `None` when no manifest declares anything.
    pub fn described_side_effect(&self) -> Option<bool> {
        let package = self.package.as_ref()?;
        let flag = package.side_effects.as_ref()?;
        let relative = match &package.root {
            Some(root) => crate::side_effects::relative_to_root(&self.path, root),
            None => self.path.clone(),
        };
        Some(crate::side_effects::match_flag(flag, &relative))
    }
}

pub struct Module {
    pub id: ModuleId,
    pub is_entry: bool,
    pub info: Option<ModuleInfo>,
}

impl Module {
    pub fn new(id: ModuleId, is_entry: bool, info: Option<ModuleInfo>) -> Self {
        Self { id, is_entry, info }
    }

    pub fn add_info(&mut self, info: Option<ModuleInfo>) {
        self.info = info;
    }

    pub fn info(&self) -> &ModuleInfo {
        match &self.info {
            Some(info) => info,
            None => panic!("module {} has not finished building", self.id),
        }
    }

    pub fn info_mut(&mut self) -> &mut ModuleInfo {
        let id = self.id.clone();
        match &mut self.info {
            Some(info) => info,
            None => panic!("module {} has not finished building", id),
        }
    }

    /// Effective side-effect assumption: an undeclared module is assumed to
    /// have side effects.
    pub fn side_effects(&self) -> bool {
        self.info
            .as_ref()
            .and_then(|info| info.described_side_effect())
            .unwrap_or(true)
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module id={}", self.id.id)
    }
}

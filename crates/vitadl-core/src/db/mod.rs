//! Module/symbol identifier database.
//!
//! The database maps module names to [`ModuleRecord`]s; each record owns a
//! symbol-name → NID table. It is built from one or more line-oriented
//! description sources (see [`parser`]) before any lookup or lifecycle
//! operation runs, and is only ever torn down whole.

pub mod parser;

use std::collections::HashMap;

use crate::error::{ParseError, ParseWarning};
use crate::platform::RuntimeId;

/// Maximum length, in bytes, of a module or symbol name.
pub const NAME_LENGTH_MAX: usize = 59;

/// How a module is brought into (and out of) the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Started and stopped through the platform service manager by id.
    SystemService,
    /// Loaded from a file image on demand.
    FileImage,
    /// Already resident; load and unload are no-ops.
    Preloaded,
}

impl ModuleKind {
    /// Parse the single-character kind tag used by database sources.
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            's' => Some(Self::SystemService),
            'f' => Some(Self::FileImage),
            'p' => Some(Self::Preloaded),
            _ => None,
        }
    }

    /// The kind tag this variant is written as in database sources.
    pub fn tag(self) -> char {
        match self {
            Self::SystemService => 's',
            Self::FileImage => 'f',
            Self::Preloaded => 'p',
        }
    }
}

/// Kind-specific state of a module record.
///
/// Only the fields relevant to each kind exist: a service id for system
/// services, the platform-assigned runtime id for file images while loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleBacking {
    SystemService { service_id: u32 },
    FileImage { runtime_id: Option<RuntimeId> },
    Preloaded,
}

impl ModuleBacking {
    fn for_kind(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::SystemService => Self::SystemService { service_id: 0 },
            ModuleKind::FileImage => Self::FileImage { runtime_id: None },
            ModuleKind::Preloaded => Self::Preloaded,
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::SystemService { .. } => ModuleKind::SystemService,
            Self::FileImage { .. } => ModuleKind::FileImage,
            Self::Preloaded => ModuleKind::Preloaded,
        }
    }
}

/// One exported symbol: human-readable name mapped to its 32-bit NID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub nid: u32,
}

/// A loadable module and the symbols it exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    name: String,
    backing: ModuleBacking,
    /// Number of outstanding open handles. `> 0` iff the module is loaded.
    pub(crate) refcount: u32,
    symbols: HashMap<String, SymbolEntry>,
}

impl ModuleRecord {
    /// Create an unloaded record with an empty symbol table.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            backing: ModuleBacking::for_kind(kind),
            refcount: 0,
            symbols: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.backing.kind()
    }

    pub fn backing(&self) -> &ModuleBacking {
        &self.backing
    }

    pub(crate) fn backing_mut(&mut self) -> &mut ModuleBacking {
        &mut self.backing
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// True while the underlying image or service is active.
    pub fn is_loaded(&self) -> bool {
        self.refcount > 0
    }

    pub fn symbol(&self, name: &str) -> Option<&SymbolEntry> {
        self.symbols.get(name)
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.symbols.values()
    }

    /// Insert a symbol, returning the entry it replaced if the name was
    /// already present (last write wins).
    pub(crate) fn insert_symbol(&mut self, entry: SymbolEntry) -> Option<SymbolEntry> {
        self.symbols.insert(entry.name.clone(), entry)
    }

    /// Store the service id. Accepted and ignored for kinds other than
    /// [`ModuleKind::SystemService`]; the database format allows the
    /// directive on any module.
    pub(crate) fn set_service_id(&mut self, service_id: u32) {
        if let ModuleBacking::SystemService { service_id: slot } = &mut self.backing {
            *slot = service_id;
        }
    }

    pub fn service_id(&self) -> Option<u32> {
        match self.backing {
            ModuleBacking::SystemService { service_id } => Some(service_id),
            _ => None,
        }
    }

    pub fn runtime_id(&self) -> Option<RuntimeId> {
        match self.backing {
            ModuleBacking::FileImage { runtime_id } => runtime_id,
            _ => None,
        }
    }
}

/// Point-in-time view of one record, for tooling and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub name: String,
    pub kind: ModuleKind,
    pub service_id: Option<u32>,
    pub refcount: u32,
    pub symbols: usize,
}

/// Name-indexed table of all known modules.
///
/// Uniqueness of module names (and of symbol names within a module) is
/// enforced structurally: both levels are hash maps keyed by name.
#[derive(Debug, Default)]
pub struct IdentifierDatabase {
    modules: HashMap<String, ModuleRecord>,
}

impl IdentifierDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ModuleRecord> {
        self.modules.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub(crate) fn insert(&mut self, record: ModuleRecord) {
        self.modules.insert(record.name().to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut ModuleRecord> {
        self.modules.values_mut()
    }

    /// Drop every record. Loaded modules must be unloaded by the caller
    /// first; this is pure bookkeeping.
    pub(crate) fn clear(&mut self) {
        self.modules.clear();
    }

    /// Merge one description source into this database.
    ///
    /// On success returns the non-fatal duplicate-symbol warnings. On any
    /// structural error the whole database is discarded (fail closed) and
    /// the error returned; a half-populated table is never observable.
    ///
    /// This entry point is for offline tooling on databases with no loaded
    /// modules. The runtime path is `DlContext::populate_str`, which also
    /// unloads live modules before discarding.
    pub fn populate(&mut self, source: &str, origin: &str) -> Result<Vec<ParseWarning>, ParseError> {
        parser::apply_source(self, source, origin).inspect_err(|_| self.clear())
    }

    pub fn summaries(&self) -> Vec<ModuleSummary> {
        let mut all: Vec<ModuleSummary> = self
            .modules
            .values()
            .map(|record| ModuleSummary {
                name: record.name().to_string(),
                kind: record.kind(),
                service_id: record.service_id(),
                refcount: record.refcount,
                symbols: record.symbol_count(),
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

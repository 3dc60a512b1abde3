//! Offline NID database tooling.
//!
//! Databases are hand-maintained text files; mistakes in them surface at
//! runtime as resolution failures on the target, which is the worst place to
//! debug them. This crate backs the `niddb` binary: it parses sources with
//! the same parser the runtime uses and reports contents, duplicate-symbol
//! warnings, and recorded NIDs as JSON.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use vitadl_core::resolve::export_identity;
use vitadl_core::{IdentifierDatabase, ParseError, ParseWarning};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("module {0:?} is not in the database")]
    UnknownModule(String),

    #[error("symbol {symbol:?} is not exported by module {module:?}")]
    UnknownSymbol { module: String, symbol: String },
}

/// One module as reported by `niddb check`.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub kind: char,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub symbols: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarningReport {
    pub origin: String,
    pub line: usize,
    pub module: String,
    pub symbol: String,
}

impl From<ParseWarning> for WarningReport {
    fn from(warning: ParseWarning) -> Self {
        Self {
            origin: warning.origin,
            line: warning.line,
            module: warning.module,
            symbol: warning.symbol,
        }
    }
}

/// Output of `niddb check`.
#[derive(Debug, Serialize)]
pub struct DbReport {
    pub sources: usize,
    pub modules: Vec<ModuleReport>,
    pub warnings: Vec<WarningReport>,
}

/// Output of `niddb lookup`.
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub module: String,
    pub kind: char,
    /// The identity the export resolver would be handed at runtime (file
    /// images resolve under their stripped basename).
    pub identity: String,
    pub symbol: String,
    pub nid: String,
}

/// Parse every source, in order, into one database.
pub fn load_database(
    sources: &[PathBuf],
) -> Result<(IdentifierDatabase, Vec<ParseWarning>), HarnessError> {
    let mut db = IdentifierDatabase::new();
    let mut warnings = Vec::new();
    for path in sources {
        let source = read_source(path)?;
        warnings.extend(db.populate(&source, &path.display().to_string())?);
    }
    Ok((db, warnings))
}

/// Lint `sources` and summarize what they declare.
pub fn check(sources: &[PathBuf]) -> Result<DbReport, HarnessError> {
    let (db, warnings) = load_database(sources)?;
    let modules = db
        .summaries()
        .into_iter()
        .map(|summary| ModuleReport {
            name: summary.name,
            kind: summary.kind.tag(),
            service_id: summary.service_id.map(hex32),
            symbols: summary.symbols,
        })
        .collect();
    Ok(DbReport {
        sources: sources.len(),
        modules,
        warnings: warnings.into_iter().map(WarningReport::from).collect(),
    })
}

/// Report the NID recorded for `symbol` in `module`.
pub fn lookup(sources: &[PathBuf], module: &str, symbol: &str) -> Result<LookupReport, HarnessError> {
    let (db, _) = load_database(sources)?;
    let record = db
        .get(module)
        .ok_or_else(|| HarnessError::UnknownModule(module.to_string()))?;
    let entry = record
        .symbol(symbol)
        .ok_or_else(|| HarnessError::UnknownSymbol {
            module: module.to_string(),
            symbol: symbol.to_string(),
        })?;
    Ok(LookupReport {
        module: module.to_string(),
        kind: record.kind().tag(),
        identity: export_identity(record).to_string(),
        symbol: symbol.to_string(),
        nid: hex32(entry.nid),
    })
}

fn read_source(path: &Path) -> Result<String, HarnessError> {
    std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn hex32(value: u32) -> String {
    format!("{value:#010x}")
}

/// True when the report describes a database the runtime would accept
/// without complaint.
pub fn is_clean(report: &DbReport) -> bool {
    report.warnings.is_empty()
}

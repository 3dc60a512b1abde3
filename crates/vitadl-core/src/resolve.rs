//! Symbol resolution: (module, symbol) → NID → callable address.
//!
//! A pure read-side path: it consults the database under the shared lock and
//! never touches refcounts or symbol tables, so any number of resolutions
//! can run concurrently with each other.

use crate::db::{IdentifierDatabase, ModuleBacking, ModuleRecord};
use crate::error::DlError;
use crate::platform::{Address, ExportResolver};

/// Modules searched, in order, when a symbol is resolved without a handle.
/// The platform's base runtime library exports the common kernel API.
pub const DEFAULT_MODULES: &[&str] = &["SceLibKernel"];

/// The module identity handed to the export resolver.
///
/// File images are registered under their load path, but the platform knows
/// the running module by its bare name: the directory prefix and trailing
/// extension are stripped (`path/foo.suprx` → `foo`). Other kinds resolve
/// under their registered name.
pub fn export_identity(record: &ModuleRecord) -> &str {
    match record.backing() {
        ModuleBacking::FileImage { .. } => file_image_identity(record.name()),
        _ => record.name(),
    }
}

fn file_image_identity(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rfind('.') {
        // Keep dotfile-style names whole; there is no extension to strip.
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    }
}

/// Resolve `symbol` from the module registered as `module`.
///
/// Called with the read lock held (the caller owns the guard around `db`).
pub fn lookup(
    db: &IdentifierDatabase,
    module: &str,
    symbol: &str,
    resolver: &dyn ExportResolver,
) -> Result<Address, DlError> {
    let record = db
        .get(module)
        .ok_or_else(|| DlError::ModuleNotFound(module.to_string()))?;
    let entry = record.symbol(symbol).ok_or_else(|| DlError::SymbolNotFound {
        module: module.to_string(),
        symbol: symbol.to_string(),
    })?;
    let identity = export_identity(record);
    resolver
        .resolve_export(identity, entry.nid)
        .map_err(|source| DlError::ResolveFailed {
            identity: identity.to_string(),
            nid: entry.nid,
            source,
        })
}

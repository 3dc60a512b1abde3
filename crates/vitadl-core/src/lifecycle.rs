//! Refcounted module load/unload transitions.
//!
//! The external load/unload primitives are expensive and, for file images,
//! stateful (each load assigns a fresh runtime id), so physical transitions
//! happen only at the refcount edges: 0→1 loads, 1→0 unloads. Everything in
//! between reuses the existing load. All functions here are called with the
//! database write lock held.

use crate::db::{ModuleBacking, ModuleRecord};
use crate::error::DlError;
use crate::platform::ModuleLoader;

/// Make sure the record's image or service is active.
///
/// A no-op when `refcount > 0` (the existing load is reused). On the 0→1
/// path, dispatches on the record's backing; for file images the returned
/// runtime id is stored for the eventual unload. On failure the record is
/// left unloaded.
pub(crate) fn ensure_loaded(
    record: &mut ModuleRecord,
    loader: &dyn ModuleLoader,
) -> Result<(), DlError> {
    if record.is_loaded() {
        return Ok(());
    }
    let name = record.name().to_string();
    match record.backing_mut() {
        ModuleBacking::FileImage { runtime_id } => {
            let id = loader
                .load_by_path(&name)
                .map_err(|source| DlError::Load { name: name.clone(), source })?;
            *runtime_id = Some(id);
        }
        ModuleBacking::SystemService { service_id } => {
            loader
                .load_by_service_id(*service_id)
                .map_err(|source| DlError::Load { name: name.clone(), source })?;
        }
        ModuleBacking::Preloaded => {}
    }
    log::debug!("loaded module {name}");
    Ok(())
}

/// Unload the record's image or service if this release is the 1→0
/// transition; otherwise a no-op. The caller decrements the refcount.
pub(crate) fn ensure_unloaded(
    record: &mut ModuleRecord,
    loader: &dyn ModuleLoader,
) -> Result<(), DlError> {
    if record.refcount() != 1 {
        return Ok(());
    }
    unload(record, loader)
}

/// Unconditionally unload the record's image or service. Used by
/// [`ensure_unloaded`] at the refcount edge and by whole-database teardown.
pub(crate) fn unload(record: &mut ModuleRecord, loader: &dyn ModuleLoader) -> Result<(), DlError> {
    let name = record.name().to_string();
    match record.backing_mut() {
        ModuleBacking::FileImage { runtime_id } => {
            if let Some(id) = *runtime_id {
                loader
                    .unload_by_runtime_id(id)
                    .map_err(|source| DlError::Unload { name: name.clone(), source })?;
                *runtime_id = None;
            }
        }
        ModuleBacking::SystemService { service_id } => {
            loader
                .unload_by_service_id(*service_id)
                .map_err(|source| DlError::Unload { name: name.clone(), source })?;
        }
        ModuleBacking::Preloaded => {}
    }
    log::debug!("unloaded module {name}");
    Ok(())
}

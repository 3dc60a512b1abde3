//! # vitadl-abi
//!
//! The process-wide, `<dlfcn.h>`-flavored surface over [`vitadl_core`]:
//! `dlinit`/`dlfree` manage one global [`DlContext`], `dldbadd` merges NID
//! database sources into it, and `dlopen`/`dlsym`/`dlclose`/`dlerror` mirror
//! the POSIX calls. The platform loader and export resolver are injected at
//! `dlinit`, so the whole surface stays testable off-target.
//!
//! Unlike the API this emulates, stale handles are detected: tokens are
//! invalidated by `dlclose` and any later use fails with
//! [`AbiError::InvalidHandle`] instead of touching freed state.

#![deny(unsafe_code)]

mod handles;

use parking_lot::RwLock;
use thiserror::Error;

use std::path::Path;

use vitadl_core::{
    Address, DlContext, DlError, ExportResolver, ModuleLoader, ParseWarning,
};

pub use handles::HandleId;

/// Failures of the process-wide surface.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("dynamic loading support is not initialized")]
    NotInitialized,

    #[error("dynamic loading support is already initialized")]
    AlreadyInitialized,

    /// The token was never issued, or was already passed to [`dlclose`].
    #[error("handle is invalid or already closed")]
    InvalidHandle,

    #[error(transparent)]
    Dl(#[from] DlError),
}

struct Runtime {
    ctx: DlContext,
    handles: handles::HandleTable,
}

/// The one process-wide runtime. The outer lock only guards init/teardown;
/// per-call concurrency is handled inside [`DlContext`] and the handle table.
static RUNTIME: RwLock<Option<Runtime>> = RwLock::new(None);

fn with_runtime<T>(f: impl FnOnce(&Runtime) -> Result<T, AbiError>) -> Result<T, AbiError> {
    match RUNTIME.read().as_ref() {
        Some(runtime) => f(runtime),
        None => Err(AbiError::NotInitialized),
    }
}

/// One-time process setup: install the platform collaborators and create the
/// empty database, lock, and error channel.
pub fn dlinit(
    loader: Box<dyn ModuleLoader>,
    resolver: Box<dyn ExportResolver>,
) -> Result<(), AbiError> {
    let mut slot = RUNTIME.write();
    if slot.is_some() {
        return Err(AbiError::AlreadyInitialized);
    }
    *slot = Some(Runtime {
        ctx: DlContext::new(loader, resolver),
        handles: handles::HandleTable::new(),
    });
    Ok(())
}

/// Tear down the runtime: unload every loaded module, discard the database,
/// and drop the platform collaborators. Safe to call at any time, including
/// before [`dlinit`] or twice in a row.
pub fn dlfree() {
    let mut slot = RUNTIME.write();
    if let Some(runtime) = slot.take() {
        runtime.ctx.teardown_all();
    }
}

/// Merge a NID database source file into the process database.
///
/// Returns the non-fatal duplicate-symbol warnings. On a structural error
/// the whole database is discarded (fail closed).
pub fn dldbadd(path: impl AsRef<Path>) -> Result<Vec<ParseWarning>, AbiError> {
    with_runtime(|rt| Ok(rt.ctx.populate_file(path)?))
}

/// Open a module by its registered name, loading it on the first open.
pub fn dlopen(name: &str) -> Result<HandleId, AbiError> {
    with_runtime(|rt| {
        let handle = rt.ctx.open(name)?;
        Ok(rt.handles.insert(handle))
    })
}

/// Resolve a symbol. With a handle the lookup is scoped to that module;
/// without one the default-module list is searched.
pub fn dlsym(handle: Option<HandleId>, symbol: &str) -> Result<Address, AbiError> {
    with_runtime(|rt| match handle {
        Some(id) => {
            // The table lock covers bookkeeping only; resolution runs
            // without it so concurrent dlsym calls stay concurrent.
            let Some(module) = rt.handles.module_of(id) else {
                return Err(invalid_handle(rt));
            };
            Ok(rt.ctx.resolve_in(&module, symbol)?)
        }
        None => Ok(rt.ctx.resolve(None, symbol)?),
    })
}

/// Release the reference behind `handle` and invalidate the token. The last
/// release of a module unloads it.
pub fn dlclose(handle: HandleId) -> Result<(), AbiError> {
    with_runtime(|rt| match rt.handles.remove(handle) {
        Some(owned) => Ok(rt.ctx.close(owned)?),
        None => Err(invalid_handle(rt)),
    })
}

/// Drain the process-wide last-error slot. Returns `None` when no failure
/// happened since the previous call (or the runtime is not initialized).
pub fn dlerror() -> Option<String> {
    RUNTIME.read().as_ref().and_then(|rt| rt.ctx.last_error())
}

fn invalid_handle(rt: &Runtime) -> AbiError {
    let err = AbiError::InvalidHandle;
    rt.ctx.error_channel().record(&err);
    err
}

//! The dynamic-loading context: database, lock, error channel, platform.
//!
//! [`DlContext`] ties the identifier database to the platform collaborators
//! behind a single reader/writer lock. The lock is coarse by design —
//! population, teardown, and lifecycle transitions are rare next to symbol
//! lookups, so one lock over the whole database keeps the invariants simple:
//! writers (populate, teardown, open, close) are exclusive, readers
//! (resolve) run concurrently.

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::db::{parser, IdentifierDatabase, ModuleSummary};
use crate::errchan::ErrorChannel;
use crate::error::{DlError, ParseWarning};
use crate::lifecycle;
use crate::platform::{Address, ExportResolver, ModuleLoader};
use crate::resolve;

/// One outstanding open reference to a module.
///
/// A weak reference by name: every operation re-resolves it through the
/// database, so a handle stays valid exactly as long as its module is
/// registered. Handles are not cloneable and [`DlContext::close`] consumes
/// them, so a reference can only be released once.
#[derive(Debug)]
pub struct Handle {
    module: String,
}

impl Handle {
    /// Name of the module this handle keeps open.
    pub fn module(&self) -> &str {
        &self.module
    }
}

/// Process context for the dynamic-loading emulation.
pub struct DlContext {
    db: RwLock<IdentifierDatabase>,
    errors: ErrorChannel,
    loader: Box<dyn ModuleLoader>,
    resolver: Box<dyn ExportResolver>,
}

impl DlContext {
    /// Set up an empty context over the given platform collaborators.
    pub fn new(loader: Box<dyn ModuleLoader>, resolver: Box<dyn ExportResolver>) -> Self {
        Self {
            db: RwLock::new(IdentifierDatabase::new()),
            errors: ErrorChannel::new(),
            loader,
            resolver,
        }
    }

    /// Record `err` in the error channel and return it.
    fn fail<T>(&self, err: DlError) -> Result<T, DlError> {
        self.errors.record(&err);
        Err(err)
    }

    /// Merge one database description source, holding the write lock for the
    /// whole call.
    ///
    /// On success returns the non-fatal duplicate-symbol warnings. On a
    /// structural error the entire database is discarded — any loaded
    /// modules are best-effort unloaded first — so a half-populated registry
    /// is never observable (the configuration is internally consistent or
    /// not loaded at all).
    pub fn populate_str(
        &self,
        source: &str,
        origin: &str,
    ) -> Result<Vec<ParseWarning>, DlError> {
        let mut db = self.db.write();
        match parser::apply_source(&mut db, source, origin) {
            Ok(warnings) => Ok(warnings),
            Err(err) => {
                discard_all(&mut db, self.loader.as_ref());
                self.fail(err.into())
            }
        }
    }

    /// [`Self::populate_str`] over the contents of a source file.
    pub fn populate_file(&self, path: impl AsRef<Path>) -> Result<Vec<ParseWarning>, DlError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(source) => return self.fail(DlError::Io { path: origin, source }),
        };
        self.populate_str(&source, &origin)
    }

    /// Open a module by its registered name.
    ///
    /// The first open of a module loads it through the platform; further
    /// opens reuse the existing load and only bump the refcount. On load
    /// failure the refcount stays at zero and no handle is issued.
    pub fn open(&self, name: &str) -> Result<Handle, DlError> {
        let mut db = self.db.write();
        let Some(record) = db.get_mut(name) else {
            return self.fail(DlError::ModuleNotFound(name.to_string()));
        };
        if let Err(err) = lifecycle::ensure_loaded(record, self.loader.as_ref()) {
            return self.fail(err);
        }
        record.refcount += 1;
        Ok(Handle {
            module: record.name().to_string(),
        })
    }

    /// Release one open reference, consuming the handle.
    ///
    /// The last release unloads the module. A handle that outlives database
    /// teardown is a caller contract violation and reports
    /// [`DlError::StaleHandle`]. An unload failure is surfaced, but the
    /// reference is still considered released.
    pub fn close(&self, handle: Handle) -> Result<(), DlError> {
        let mut db = self.db.write();
        let Some(record) = db.get_mut(handle.module()) else {
            return self.fail(DlError::StaleHandle(handle.module));
        };
        let unloaded = lifecycle::ensure_unloaded(record, self.loader.as_ref());
        record.refcount = record.refcount.saturating_sub(1);
        match unloaded {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    /// Resolve `symbol` to a callable address.
    ///
    /// With a handle, the lookup is scoped to that module. Without one, the
    /// fixed default-module list is searched in order and the first
    /// successful resolution wins; only after the list is exhausted does the
    /// call fail.
    pub fn resolve(&self, handle: Option<&Handle>, symbol: &str) -> Result<Address, DlError> {
        match handle {
            Some(handle) => self.resolve_in(handle.module(), symbol),
            None => {
                let db = self.db.read();
                for module in resolve::DEFAULT_MODULES {
                    if let Ok(addr) =
                        resolve::lookup(&db, module, symbol, self.resolver.as_ref())
                    {
                        return Ok(addr);
                    }
                }
                self.fail(DlError::DefaultLookupFailed(symbol.to_string()))
            }
        }
    }

    /// Resolve `symbol` from the module registered as `module` — the scoped
    /// half of [`Self::resolve`], for callers that track modules by name
    /// rather than by [`Handle`].
    pub fn resolve_in(&self, module: &str, symbol: &str) -> Result<Address, DlError> {
        let db = self.db.read();
        match resolve::lookup(&db, module, symbol, self.resolver.as_ref()) {
            Ok(addr) => Ok(addr),
            Err(err) => self.fail(err),
        }
    }

    /// Unload every loaded module (best-effort; individual failures are
    /// logged and ignored) and discard the database. Safe to call on an
    /// empty database, so teardown is idempotent.
    pub fn teardown_all(&self) {
        let mut db = self.db.write();
        discard_all(&mut db, self.loader.as_ref());
    }

    /// Drain the last-error channel.
    pub fn last_error(&self) -> Option<String> {
        self.errors.take()
    }

    /// The shared last-error channel (for layers that report failures of
    /// their own, such as the process-wide surface).
    pub fn error_channel(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Snapshot of every registered module, sorted by name.
    pub fn modules(&self) -> Vec<ModuleSummary> {
        self.db.read().summaries()
    }

    /// Current refcount of a module, if registered.
    pub fn refcount(&self, name: &str) -> Option<u32> {
        self.db.read().get(name).map(|record| record.refcount())
    }
}

fn discard_all(db: &mut IdentifierDatabase, loader: &dyn ModuleLoader) {
    for record in db.records_mut() {
        if record.is_loaded()
            && let Err(err) = lifecycle::unload(record, loader)
        {
            log::warn!("ignoring unload failure during teardown: {err}");
        }
    }
    db.clear();
}

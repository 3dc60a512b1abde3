//! Caller-facing handle table.
//!
//! The core's [`Handle`] is move-only, which is the safety story inside one
//! owner. A `dlopen`-style surface instead hands out copyable tokens, so
//! this table maps monotonically increasing ids to the owned handles. Ids
//! are never reused: a token presented after its `dlclose` misses the table
//! and is rejected instead of silently aliasing a newer open.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use vitadl_core::Handle;

/// Opaque token for one outstanding open reference, as handed to callers of
/// [`crate::dlopen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    entries: Mutex<HashMap<u64, Handle>>,
    next: AtomicU64,
}

impl HandleTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, handle: Handle) -> HandleId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(id, handle);
        HandleId(id)
    }

    /// Take the handle back out; `None` if the id was never issued or was
    /// already closed.
    pub(crate) fn remove(&self, id: HandleId) -> Option<Handle> {
        self.entries.lock().remove(&id.0)
    }

    /// Module name behind `id`, if the token is still live. The name is
    /// cloned out so the table lock is never held across a resolution.
    pub(crate) fn module_of(&self, id: HandleId) -> Option<String> {
        self.entries
            .lock()
            .get(&id.0)
            .map(|handle| handle.module().to_string())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

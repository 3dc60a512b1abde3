//! Process-wide last-error slot.
//!
//! A single mutable slot shared by every component and every thread; the
//! newest failure overwrites whatever was there. This mirrors `dlerror`
//! semantics, with one deliberate quirk preserved from the emulated API:
//! the slot is shared across threads, not thread-local, so a failure on one
//! thread is observable from another.

use parking_lot::Mutex;

/// Maximum recorded message length in bytes; longer messages are truncated.
pub const ERRMSG_LENGTH_MAX: usize = 127;

/// Last-error channel. One instance per [`crate::DlContext`]; the abi layer
/// makes that instance process-wide.
#[derive(Debug, Default)]
pub struct ErrorChannel {
    slot: Mutex<Option<String>>,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, replacing any previous message. Truncated to
    /// [`ERRMSG_LENGTH_MAX`] bytes on a character boundary.
    pub fn record(&self, message: impl ToString) {
        let mut text = message.to_string();
        if text.len() > ERRMSG_LENGTH_MAX {
            let mut cut = ERRMSG_LENGTH_MAX;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        *self.slot.lock() = Some(text);
    }

    /// Drain the slot: returns the pending message and clears it.
    pub fn take(&self) -> Option<String> {
        self.slot.lock().take()
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

//! Error taxonomy for database population, lifecycle, and resolution.

use std::fmt;

use thiserror::Error;

use crate::platform::PlatformError;

/// Structural error in a database description source.
///
/// Any of these aborts the population call and discards the whole database
/// (fail closed); see `DlContext::populate_str`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `#` or `*` directive appeared before any `$` module declaration.
    #[error("{origin}:{line}: {directive:?} directive before any module declaration")]
    NoCurrentModule {
        origin: String,
        line: usize,
        directive: char,
    },

    /// The line started a known directive but did not match its grammar.
    #[error("{origin}:{line}: could not parse line {text:?}")]
    Malformed {
        origin: String,
        line: usize,
        text: String,
    },

    /// A module or symbol name exceeded the 59-byte limit.
    #[error("{origin}:{line}: name {name:?} exceeds the maximum name length")]
    NameTooLong {
        origin: String,
        line: usize,
        name: String,
    },

    /// A `$` line used a kind character other than `s`, `f`, or `p`.
    #[error("{origin}:{line}: unknown module kind {tag:?}")]
    UnknownKind {
        origin: String,
        line: usize,
        tag: char,
    },

    /// A `$` line re-declared an existing module under a different kind.
    #[error(
        "{origin}:{line}: module {name:?} redeclared as kind {requested:?} (registered as {existing:?})"
    )]
    KindMismatch {
        origin: String,
        line: usize,
        name: String,
        existing: char,
        requested: char,
    },
}

/// Non-fatal duplicate-symbol report produced while parsing.
///
/// The later entry wins; population continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub origin: String,
    pub line: usize,
    pub module: String,
    pub symbol: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: duplicated symbol {:?} in module {:?}",
            self.origin, self.line, self.symbol, self.module
        )
    }
}

/// Any failure surfaced by the public dynamic-loading operations.
#[derive(Debug, Error)]
pub enum DlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to find module {0:?} in database")]
    ModuleNotFound(String),

    #[error("failed to find symbol {symbol:?} in module {module:?}")]
    SymbolNotFound { module: String, symbol: String },

    #[error("failed to find symbol {0:?} in default modules")]
    DefaultLookupFailed(String),

    #[error("failed to load module {name:?}: {source}")]
    Load {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to unload module {name:?}: {source}")]
    Unload {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to resolve export {nid:#010x} from {identity:?}: {source}")]
    ResolveFailed {
        identity: String,
        nid: u32,
        #[source]
        source: PlatformError,
    },

    /// The handle names a module that is no longer registered. This only
    /// happens when a handle outlives database teardown, which is a caller
    /// contract violation.
    #[error("handle references module {0:?} which is no longer registered")]
    StaleHandle(String),
}

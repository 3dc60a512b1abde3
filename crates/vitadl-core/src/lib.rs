//! # vitadl-core
//!
//! Emulation of a POSIX dynamic-loading API on a platform without a public
//! symbol table. Exported functions are found through an offline NID
//! database — a hand-maintained map from symbol names to 32-bit numeric
//! identifiers — and turned into callable addresses by a platform export
//! resolver.
//!
//! The crate provides the registry ([`IdentifierDatabase`]) and its text
//! format parser, the refcounted module lifecycle behind opaque [`Handle`]s,
//! the symbol resolution path, and the `dlerror`-style [`ErrorChannel`],
//! all tied together by [`DlContext`]. The platform's loader and export
//! resolver are consumed through the traits in [`platform`].

#![deny(unsafe_code)]

pub mod context;
pub mod db;
pub mod errchan;
pub mod error;
mod lifecycle;
pub mod platform;
pub mod resolve;

pub use context::{DlContext, Handle};
pub use db::{
    IdentifierDatabase, ModuleBacking, ModuleKind, ModuleRecord, ModuleSummary, NAME_LENGTH_MAX,
    SymbolEntry,
};
pub use errchan::{ERRMSG_LENGTH_MAX, ErrorChannel};
pub use error::{DlError, ParseError, ParseWarning};
pub use platform::{Address, ExportResolver, ModuleLoader, PlatformError, RuntimeId};
pub use resolve::DEFAULT_MODULES;

//! Platform collaborator boundaries.
//!
//! The core never loads code or resolves addresses itself. It drives two
//! narrow platform services: a module loader/unloader that starts or stops a
//! code image, and an export resolver that turns (module identity, NID) into
//! a callable address. On the target these are kernel services; in tests they
//! are recording mocks.

use thiserror::Error;

/// Runtime identifier assigned by the platform when a file-backed module is
/// loaded. Valid only between a load and the matching unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(pub i32);

/// A callable address returned by the export resolver.
pub type Address = usize;

/// Raw platform status code carried out of a failed collaborator call.
///
/// Formatted as the two's-complement hex the platform reports
/// (e.g. `0x8002d068`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("platform status {0:#010x}")]
pub struct PlatformError(pub i32);

/// Loads and unloads module images.
///
/// File-backed modules are addressed by filesystem path and yield a
/// [`RuntimeId`]; system services are addressed by their fixed service id.
pub trait ModuleLoader: Send + Sync {
    /// Load a module image from `path`, returning its runtime identifier.
    fn load_by_path(&self, path: &str) -> Result<RuntimeId, PlatformError>;

    /// Start the system service with the given id.
    fn load_by_service_id(&self, service_id: u32) -> Result<(), PlatformError>;

    /// Stop and unload the image previously returned by [`Self::load_by_path`].
    fn unload_by_runtime_id(&self, id: RuntimeId) -> Result<(), PlatformError>;

    /// Stop the system service with the given id.
    fn unload_by_service_id(&self, service_id: u32) -> Result<(), PlatformError>;
}

/// Resolves an exported function address from a loaded module.
pub trait ExportResolver: Send + Sync {
    /// Look up the export identified by `nid` in the module named `identity`.
    fn resolve_export(&self, identity: &str, nid: u32) -> Result<Address, PlatformError>;
}

//! Mount-level operations: capacity and lifecycle.

use crate::{FsError, StatFs};

/// Mount-level operations.
///
/// A session is mounted when constructed and stays usable until
/// [`unmount`](SessionMount::unmount); the façade calls it from
/// [`CephFileSystem::close`](crate::CephFileSystem::close).
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn SessionMount`.
pub trait SessionMount: Send + Sync {
    /// Get cluster-level capacity.
    ///
    /// # Errors
    ///
    /// - [`FsError::Session`] for backend-specific failures
    fn statfs(&self) -> Result<StatFs, FsError>;

    /// Tear down the connection. Every later call fails.
    ///
    /// # Errors
    ///
    /// - [`FsError::Session`] if the session was already unmounted
    fn unmount(&self) -> Result<(), FsError>;
}

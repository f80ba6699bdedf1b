//! Handle-based file I/O against a cluster session.
//!
//! The workflow mirrors the cluster client library:
//!
//! 1. `open()` - Open a path and get a [`Handle`]
//! 2. `read_at()` / `write_at()` / `fstat()` - Operate on the handle
//! 3. `close()` - Release the handle
//!
//! # Example
//!
//! ```rust
//! use cephfs_adapter::{FsError, OpenFlags, Permissions, SessionIo};
//! use std::path::Path;
//!
//! fn read_header<S: SessionIo>(session: &S, path: &Path) -> Result<[u8; 16], FsError> {
//!     let handle = session.open(path, OpenFlags::READ, Permissions::default_file())?;
//!     let mut header = [0u8; 16];
//!     let result = session.read_at(handle, &mut header, 0);
//!     session.close(handle)?;
//!     result.map(|_| header)
//! }
//! ```

use std::path::Path;

use crate::{FsError, Handle, OpenFlags, Permissions, StatRecord};

/// Handle-based file operations.
///
/// Opening a directory is allowed at this level (the placement selector
/// opens `/` to discover the default pool); rejecting directories for
/// stream access is the façade's job.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. A single handle must not be
/// used by two logical streams at once; the adapter does not guard this.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn SessionIo`.
pub trait SessionIo: Send + Sync {
    /// Open a path and return a handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path doesn't exist and `create` is false
    /// - [`FsError::NotADirectory`] if a parent component is a file
    /// - [`FsError::NotSupported`] if the backend cannot honor the flags
    fn open(&self, path: &Path, flags: OpenFlags, mode: Permissions) -> Result<Handle, FsError>;

    /// Read data from a file at a specific offset.
    ///
    /// Returns the number of bytes read, 0 at end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError>;

    /// Write data to a file at a specific offset.
    ///
    /// Handles opened with `append` always write at the end of the file.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    /// - [`FsError::PermissionDenied`] if the handle wasn't opened for writing
    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Stat an open handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn fstat(&self, handle: Handle) -> Result<StatRecord, FsError>;

    /// Flush a handle's data to the cluster.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn fsync(&self, handle: Handle) -> Result<(), FsError>;

    /// Close a handle. The handle is invalid afterwards.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is already closed or invalid
    fn close(&self, handle: Handle) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_io_is_object_safe() {
        fn _check(_: &dyn SessionIo) {}
    }

    #[test]
    fn session_io_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: SessionIo>() {
            _assert_send_sync::<T>();
        }
    }
}

//! Pool and layout metadata used when placing new files.

use std::path::Path;

use crate::{FileLayout, FsError, Handle, OpenFlags, Permissions};

/// Pool and layout metadata.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn SessionPlacement`.
pub trait SessionPlacement: Send + Sync {
    /// Like [`SessionIo::open`](crate::SessionIo::open), but applies
    /// `layout` when the file is created by this call. An existing file
    /// keeps its layout.
    ///
    /// # Errors
    ///
    /// - [`FsError::PoolLookup`] if `layout.pool` does not exist
    /// - Every error of [`SessionIo::open`](crate::SessionIo::open)
    fn open_with_layout(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: Permissions,
        layout: &FileLayout,
    ) -> Result<Handle, FsError>;

    /// Name of the pool holding an open file's data. Directories report the
    /// pool new children inherit.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn file_pool_name(&self, handle: Handle) -> Result<String, FsError>;

    /// Replication factor of a pool.
    ///
    /// # Errors
    ///
    /// - [`FsError::PoolLookup`] if the pool does not exist
    fn pool_replication(&self, pool: &str) -> Result<u32, FsError>;

    /// Replication factor an open file is stored with.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn file_replication(&self, handle: Handle) -> Result<u32, FsError>;

    /// Alignment unit every stripe unit must be a multiple of.
    fn stripe_unit_granularity(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_placement_is_object_safe() {
        fn _check(_: &dyn SessionPlacement) {}
    }
}

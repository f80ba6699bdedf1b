//! Path-based namespace operations against a cluster session.

use std::path::Path;

use crate::{DirEntry, FsError, SetAttr, StatRecord};

/// Namespace operations: stat, list, create, remove, rename, setattr.
///
/// Paths are absolute in the session's namespace (relative to the mount
/// root). None of these operations recurse; recursive behavior lives in
/// [`TreeExt`](crate::TreeExt).
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn SessionNamespace`.
pub trait SessionNamespace: Send + Sync {
    /// Stat a path without following links.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist, including when a
    ///   parent component is a file
    fn lstat(&self, path: &Path) -> Result<StatRecord, FsError>;

    /// List the immediate children of a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is a file
    fn listdir(&self, path: &Path) -> Result<ReadDirIter, FsError>;

    /// Create a single directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn mkdir(&self, path: &Path, mode: crate::Permissions) -> Result<(), FsError>;

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn unlink(&self, path: &Path) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn rmdir(&self, path: &Path) -> Result<(), FsError>;

    /// Rename a file or directory. Atomic on the cluster.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source does not exist
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Apply the fields set in `attr`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn setattr(&self, path: &Path, attr: &SetAttr) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// - Outer `Result` (from [`SessionNamespace::listdir`]) = "can I open this directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl std::fmt::Debug for ReadDirIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadDirIter").finish_non_exhaustive()
    }
}

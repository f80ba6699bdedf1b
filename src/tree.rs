//! # Tree Operations
//!
//! Recursive directory creation and removal built from single-entry
//! namespace primitives.
//!
//! ## Overview
//!
//! [`TreeExt`] has a blanket implementation, so every
//! [`SessionNamespace`] gets these methods for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`exists`](TreeExt::exists) | Check if a path exists |
//! | [`is_file`](TreeExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](TreeExt::is_dir) | Check if path is a directory |
//! | [`mkdirs`](TreeExt::mkdirs) | Create a directory and its missing ancestors |
//! | [`delete`](TreeExt::delete) | Remove a file or a directory tree |
//!
//! Neither recursive operation is atomic. Another client creating the same
//! directory during `mkdirs`, or removing a child during `delete`, is not an
//! error. A failure partway through `delete` leaves the entries removed so
//! far removed.

use std::path::Path;

use tracing::debug;

use crate::{FsError, Permissions, SessionNamespace};

/// Recursive namespace operations for any session.
///
/// # Example
///
/// ```rust
/// use cephfs_adapter::{FsError, Permissions, SessionNamespace, TreeExt};
/// use std::path::Path;
///
/// fn reset_dir<S: SessionNamespace>(session: &S, dir: &Path) -> Result<(), FsError> {
///     session.delete(dir, true)?;
///     session.mkdirs(dir, Permissions::default_dir())
/// }
/// ```
pub trait TreeExt: SessionNamespace {
    /// Check if the path exists.
    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.lstat(path) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        match self.lstat(path) {
            Ok(s) => Ok(s.is_file()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        match self.lstat(path) {
            Ok(s) => Ok(s.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create `path` and any missing ancestors.
    ///
    /// An existing directory is success and nothing is modified.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `path` or an ancestor is a file
    fn mkdirs(&self, path: &Path, mode: Permissions) -> Result<(), FsError> {
        match self.lstat(path) {
            Ok(stat) if stat.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(FsError::AlreadyExists {
                    path: path.to_path_buf(),
                    operation: "mkdirs",
                });
            }
            Err(FsError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        if let Some(parent) = path.parent() {
            self.mkdirs(parent, mode)?;
        }

        debug!(path = %path.display(), "mkdir");
        match self.mkdir(path, mode) {
            Ok(()) => Ok(()),
            // Created concurrently; only a directory counts.
            Err(FsError::AlreadyExists { .. }) if self.is_dir(path)? => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Remove a file, or a directory and, when `recursive`, its contents.
    ///
    /// Returns `Ok(false)` if the path does not exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::DirectoryNotEmpty`] if the directory has children and
    ///   `recursive` is false; nothing is removed
    /// - The first error removing a child; the walk stops there
    fn delete(&self, path: &Path, recursive: bool) -> Result<bool, FsError> {
        let stat = match self.lstat(path) {
            Ok(stat) => stat,
            Err(FsError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        if stat.is_file() {
            debug!(path = %path.display(), "unlink");
            return match self.unlink(path) {
                Ok(()) => Ok(true),
                Err(FsError::NotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            };
        }

        let children = match self.listdir(path).and_then(|it| it.collect_all()) {
            Ok(children) => children,
            Err(FsError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        if !children.is_empty() {
            if !recursive {
                return Err(FsError::DirectoryNotEmpty {
                    path: path.to_path_buf(),
                });
            }
            for child in &children {
                if !self.delete(&child.path, true)? {
                    debug!(path = %child.path.display(), "child already removed");
                }
            }
        }

        debug!(path = %path.display(), "rmdir");
        match self.rmdir(path) {
            Ok(()) | Err(FsError::NotFound { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation - any session gets TreeExt for free
impl<S: SessionNamespace + ?Sized> TreeExt for S {}

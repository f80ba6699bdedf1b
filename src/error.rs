//! Error types for the Ceph filesystem adapter.

use std::path::PathBuf;

use crate::{Handle, NodeId};

/// Filesystem error type with contextual variants.
///
/// Variants carry the path, pool or handle involved so a caller can report
/// the failing target without extra bookkeeping. Uses `#[non_exhaustive]`
/// for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use cephfs_adapter::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/File Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Expected a file but found a directory.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The path that is a directory.
        path: PathBuf,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// File handle is invalid or closed.
    #[error("invalid handle: {}", handle.0)]
    InvalidHandle {
        /// The invalid handle.
        handle: Handle,
    },

    // Argument/Configuration Errors
    /// An argument or configuration value was rejected.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    // Placement/Topology Errors
    /// A pool could not be resolved or has no usable replication factor.
    #[error("pool lookup failed: {pool} ({reason})")]
    PoolLookup {
        /// The pool name that failed to resolve.
        pool: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// A storage node id is unknown to the cluster map.
    #[error("storage node not found: osd.{}", node.0)]
    NodeNotFound {
        /// The unknown node.
        node: NodeId,
    },

    // Permission/Access Errors
    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: PathBuf,
        /// The operation that was denied.
        operation: &'static str,
    },

    // Backend/Operation Errors
    /// Operation is not supported by this backend.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// Transport, authentication or cluster failure reported by the session.
    #[error("session error: {0}")]
    Session(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Shorthand for an [`FsError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        FsError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`FsError::NotFound`].
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied {
                path: PathBuf::new(),
                operation: "io",
            },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: PathBuf::new(),
                operation: "io",
            },
            _ => FsError::Io {
                operation: "io",
                path: PathBuf::new(),
                source: error,
            },
        }
    }
}

impl From<FsError> for std::io::Error {
    fn from(error: FsError) -> Self {
        use std::io::ErrorKind;

        let kind = match &error {
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FsError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FsError::InvalidArgument { .. } => ErrorKind::InvalidInput,
            FsError::NotSupported { .. } => ErrorKind::Unsupported,
            FsError::Io { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: PathBuf::from("/exists"),
            operation: "create",
        };
        assert_eq!(err.to_string(), "create: already exists: /exists");
    }

    #[test]
    fn fs_error_pool_lookup_display() {
        let err = FsError::PoolLookup {
            pool: "ssd".into(),
            reason: "no such pool".into(),
        };
        assert_eq!(err.to_string(), "pool lookup failed: ssd (no such pool)");
    }

    #[test]
    fn fs_error_node_not_found_display() {
        let err = FsError::NodeNotFound { node: NodeId(7) };
        assert_eq!(err.to_string(), "storage node not found: osd.7");
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(fs_err.is_not_found());
    }

    #[test]
    fn fs_error_from_io_already_exists() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = std::io::Error::other("test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
    }

    #[test]
    fn fs_error_into_io_keeps_kind() {
        let io_err: std::io::Error = FsError::NotSupported {
            operation: "append",
        }
        .into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::Unsupported);

        let io_err: std::io::Error = FsError::invalid_argument("block size").into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidInput);
    }
}

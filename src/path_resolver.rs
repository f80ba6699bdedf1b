//! # PathResolver Trait
//!
//! Turns caller paths into the absolute paths a session expects.
//!
//! ## Responsibility
//! - Anchor relative paths at a working directory
//! - Leave absolute paths alone (idempotent)
//!
//! ## Usage
//!
//! ```rust
//! use cephfs_adapter::{MountContext, PathResolver};
//! use std::path::{Path, PathBuf};
//!
//! let ctx = MountContext::builder().working_dir("/user/alice").build();
//! assert_eq!(ctx.resolve(Path::new("logs/a.txt")), PathBuf::from("/user/alice/logs/a.txt"));
//! assert_eq!(ctx.resolve(Path::new("/tmp/b")), PathBuf::from("/tmp/b"));
//! ```

use std::path::{Path, PathBuf};

// ============================================================================
// Trait Definition
// ============================================================================

/// Strategy trait for path resolution.
///
/// Resolution is pure string work: no session I/O, no failure modes. It
/// does not follow links or collapse `..`; the in-memory sessions reject
/// paths containing `..`.
///
/// # Implementors
///
/// - [`MountContext`](crate::MountContext): resolves against its working directory
pub trait PathResolver: Send + Sync {
    /// Resolve `path` to an absolute path.
    ///
    /// Must be idempotent: `resolve(resolve(p)) == resolve(p)`.
    fn resolve(&self, path: &Path) -> PathBuf;
}

// ============================================================================
// Default Implementation
// ============================================================================

/// Resolve `path` against `working_dir`.
///
/// Absolute paths come back unchanged apart from dropping `.` components and
/// repeated separators. Relative paths are joined under `working_dir`; an
/// empty path means the working directory itself.
pub fn resolve_against(working_dir: &Path, path: &Path) -> PathBuf {
    if path.has_root() {
        return path.components().collect();
    }
    if path.as_os_str().is_empty() {
        return working_dir.components().collect();
    }
    working_dir.join(path).components().collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(PathBuf);

    impl PathResolver for FixedResolver {
        fn resolve(&self, path: &Path) -> PathBuf {
            resolve_against(&self.0, path)
        }
    }

    #[test]
    fn absolute_path_is_unchanged() {
        let wd = Path::new("/user/alice");
        assert_eq!(
            resolve_against(wd, Path::new("/data/file.txt")),
            PathBuf::from("/data/file.txt")
        );
    }

    #[test]
    fn relative_path_joins_working_dir() {
        let wd = Path::new("/user/alice");
        assert_eq!(
            resolve_against(wd, Path::new("out/part-0000")),
            PathBuf::from("/user/alice/out/part-0000")
        );
    }

    #[test]
    fn empty_path_is_working_dir() {
        let wd = Path::new("/user/alice");
        assert_eq!(resolve_against(wd, Path::new("")), PathBuf::from("/user/alice"));
    }

    #[test]
    fn current_dir_components_are_dropped() {
        let wd = Path::new("/");
        assert_eq!(
            resolve_against(wd, Path::new("./a/./b")),
            PathBuf::from("/a/b")
        );
        assert_eq!(resolve_against(wd, Path::new("/a//b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let resolver = FixedResolver(PathBuf::from("/work"));
        for p in ["x", "/x", "x/y/z", "/", ""] {
            let once = resolver.resolve(Path::new(p));
            let twice = resolver.resolve(&once);
            assert_eq!(once, twice, "not idempotent for {p:?}");
            assert!(once.has_root());
        }
    }

    #[test]
    fn path_resolver_can_be_boxed() {
        let resolver: Box<dyn PathResolver> = Box::new(FixedResolver(PathBuf::from("/")));
        assert_eq!(resolver.resolve(Path::new("a")), PathBuf::from("/a"));
    }
}

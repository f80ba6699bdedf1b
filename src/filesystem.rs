//! # Filesystem Façade
//!
//! [`CephFileSystem`] exposes Hadoop-style filesystem operations over any
//! [`ClusterSession`]. It resolves paths against the mount's working
//! directory, picks data pools for new files, aligns block sizes to the
//! cluster's stripe granularity and maps byte ranges to replica locations.
//!
//! The façade holds no mutable state and caches nothing; every call goes to
//! the session.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use crate::placement::select_data_pool;
use crate::{
    BlockLocation, BlockLocations, ClusterInputStream, ClusterOutputStream, ClusterSession,
    FileLayout, FileStatus, FsError, Handle, MountConfig, MountContext, OpenFlags, PathResolver,
    Permissions, SetAttr, StatFs, TreeExt,
};

/// Largest block size a file layout can carry.
pub const MAX_BLOCK_SIZE: u64 = i32::MAX as u64;

/// Validate a requested block size and align it to `granularity`.
///
/// Sizes above [`MAX_BLOCK_SIZE`] are clamped. Sizes that are not a multiple
/// of `granularity` are rounded up. When rounding up would pass the maximum,
/// the largest aligned size below it is used instead.
///
/// # Errors
///
/// - [`FsError::InvalidArgument`] if `block_size` is 0
///
/// ```rust
/// use cephfs_adapter::align_block_size;
///
/// assert_eq!(align_block_size(5000, 4096).unwrap(), 8192);
/// assert_eq!(align_block_size(8192, 4096).unwrap(), 8192);
/// assert!(align_block_size(0, 4096).is_err());
/// ```
pub fn align_block_size(block_size: u64, granularity: u64) -> Result<u64, FsError> {
    if block_size == 0 {
        return Err(FsError::invalid_argument("block size must be positive"));
    }
    let mut size = block_size;
    if size > MAX_BLOCK_SIZE {
        info!(requested = block_size, max = MAX_BLOCK_SIZE, "clamping block size");
        size = MAX_BLOCK_SIZE;
    }
    let granularity = granularity.max(1);
    let aligned = size.div_ceil(granularity) * granularity;
    if aligned > MAX_BLOCK_SIZE {
        let floor = MAX_BLOCK_SIZE / granularity * granularity;
        if floor == 0 {
            return Err(FsError::invalid_argument(format!(
                "stripe granularity {granularity} exceeds the largest block size"
            )));
        }
        return Ok(floor);
    }
    if aligned != block_size {
        debug!(requested = block_size, aligned, "aligned block size");
    }
    Ok(aligned)
}

/// A mounted cluster filesystem.
///
/// # Example
///
/// ```rust
/// use cephfs_adapter::{CephFileSystem, MemoryCluster, MemoryMount, MountConfig, Permissions};
/// use std::path::Path;
///
/// let cluster = MemoryCluster::new();
/// let config = MountConfig::default();
/// let session = MemoryMount::mount(&cluster, &config).unwrap();
/// let fs = CephFileSystem::initialize(session, &config).unwrap();
///
/// fs.mkdirs(Path::new("/a/b"), Permissions::default_dir()).unwrap();
/// assert!(fs.is_directory(Path::new("/a")).unwrap());
/// assert!(fs.delete(Path::new("/a"), true).unwrap());
/// ```
pub struct CephFileSystem<S: ClusterSession> {
    session: S,
    context: MountContext,
}

impl<S: ClusterSession> CephFileSystem<S> {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Wrap a mounted session.
    pub fn new(session: S, context: MountContext) -> Self {
        Self { session, context }
    }

    /// Wrap a session mounted with `config`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `config` fails validation
    pub fn initialize(session: S, config: &MountConfig) -> Result<Self, FsError> {
        config.validate()?;
        let context = MountContext::from_config(config);
        debug!(
            working_dir = %context.working_dir().display(),
            replication = context.default_replication(),
            pools = ?context.data_pools(),
            "initialized"
        );
        Ok(Self::new(session, context))
    }

    /// Same filesystem with a different working directory.
    pub fn with_working_directory(mut self, dir: &Path) -> Self {
        self.set_working_directory(dir);
        self
    }

    /// Change the working directory. Relative paths resolve against the
    /// current one.
    pub fn set_working_directory(&mut self, dir: &Path) {
        self.context = self.context.with_working_dir(dir);
    }

    /// The underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Mount settings.
    pub fn context(&self) -> &MountContext {
        &self.context
    }

    /// Current working directory.
    pub fn working_directory(&self) -> &Path {
        self.context.working_dir()
    }

    /// Home directory of the mounting identity.
    pub fn home_directory(&self) -> &Path {
        self.context.home_dir()
    }

    /// Absolute form of `path`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.context.resolve(path)
    }

    /// Unmount the session.
    ///
    /// # Errors
    ///
    /// - Whatever the session reports for `unmount`
    pub fn close(self) -> Result<(), FsError> {
        debug!("unmount");
        self.session.unmount()
    }

    // -------------------------------------------------------------------------
    // Streams
    // -------------------------------------------------------------------------

    /// Create a file and open it for writing.
    ///
    /// Missing parent directories are created. The file is placed in the
    /// pool whose replication factor best matches `replication`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `block_size` is 0
    /// - [`FsError::IsADirectory`] if `path` is a directory
    /// - [`FsError::AlreadyExists`] if `path` exists and `overwrite` is false,
    ///   or a parent component is a file
    /// - Any error resolving the default pool
    pub fn create(
        &self,
        path: &Path,
        permission: Permissions,
        overwrite: bool,
        replication: u32,
        block_size: u64,
    ) -> Result<ClusterOutputStream<'_, S>, FsError> {
        let path = self.resolve(path);
        debug!(
            path = %path.display(),
            overwrite,
            replication,
            block_size,
            "create"
        );
        let block_size = align_block_size(block_size, self.session.stripe_unit_granularity())?;

        let flags = match self.session.lstat(&path) {
            Ok(stat) if stat.is_dir() => return Err(FsError::IsADirectory { path }),
            Ok(_) if overwrite => OpenFlags::CREATE_TRUNCATE,
            Ok(_) => {
                return Err(FsError::AlreadyExists {
                    path,
                    operation: "create",
                });
            }
            Err(FsError::NotFound { .. }) => {
                if let Some(parent) = path.parent() {
                    self.session.mkdirs(parent, Permissions::default_dir())?;
                }
                OpenFlags::CREATE
            }
            Err(e) => return Err(e),
        };

        let choice = select_data_pool(&self.session, self.context.data_pools(), replication)?;
        let layout = FileLayout::single_stripe(block_size, choice.pool);
        let handle = self
            .session
            .open_with_layout(&path, flags, permission, &layout)?;
        Ok(ClusterOutputStream::new(&self.session, handle, 0))
    }

    /// [`create`](Self::create) with default permission, replication and
    /// block size.
    ///
    /// # Errors
    ///
    /// - Every error of [`create`](Self::create)
    pub fn create_default(
        &self,
        path: &Path,
        overwrite: bool,
    ) -> Result<ClusterOutputStream<'_, S>, FsError> {
        self.create(
            path,
            Permissions::default_file(),
            overwrite,
            self.get_default_replication(),
            self.get_default_block_size(),
        )
    }

    /// Like [`create`](Self::create), but the parent directory must already
    /// exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent does not exist
    /// - [`FsError::AlreadyExists`] if the parent is a file
    /// - Every error of [`create`](Self::create)
    pub fn create_non_recursive(
        &self,
        path: &Path,
        permission: Permissions,
        overwrite: bool,
        replication: u32,
        block_size: u64,
    ) -> Result<ClusterOutputStream<'_, S>, FsError> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent() {
            let stat = self.session.lstat(parent)?;
            if !stat.is_dir() {
                return Err(FsError::AlreadyExists {
                    path: parent.to_path_buf(),
                    operation: "create",
                });
            }
        }
        self.create(&path, permission, overwrite, replication, block_size)
    }

    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::IsADirectory`] if `path` is a directory
    pub fn open(&self, path: &Path) -> Result<ClusterInputStream<'_, S>, FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), "open");
        let handle = self
            .session
            .open(&path, OpenFlags::READ, Permissions::default_file())?;
        let size = self.file_size(handle, &path)?;
        Ok(ClusterInputStream::new(&self.session, handle, size))
    }

    /// Open an existing file for writing at its end.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::IsADirectory`] if `path` is a directory
    /// - [`FsError::NotSupported`] if the backend cannot append
    pub fn append(&self, path: &Path) -> Result<ClusterOutputStream<'_, S>, FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), "append");
        let handle = self
            .session
            .open(&path, OpenFlags::APPEND, Permissions::default_file())?;
        let size = self.file_size(handle, &path)?;
        Ok(ClusterOutputStream::new(&self.session, handle, size))
    }

    /// Size of the file behind `handle`. Closes the handle when it is a
    /// directory or cannot be stat'ed.
    fn file_size(&self, handle: Handle, path: &Path) -> Result<u64, FsError> {
        let checked = self.session.fstat(handle).and_then(|stat| {
            if stat.is_dir() {
                Err(FsError::IsADirectory {
                    path: path.to_path_buf(),
                })
            } else {
                Ok(stat.size)
            }
        });
        if checked.is_err() {
            if let Err(e) = self.session.close(handle) {
                warn!(path = %path.display(), error = %e, "close failed");
            }
        }
        checked
    }

    // -------------------------------------------------------------------------
    // Namespace
    // -------------------------------------------------------------------------

    /// Rename `src` to `dst`.
    ///
    /// When `dst` is an existing directory, `src` moves inside it under its
    /// own name. Returns `Ok(false)` if `src` does not exist, if the final
    /// destination already exists, or if a directory would move into itself.
    ///
    /// # Errors
    ///
    /// - Session failures other than a missing entry
    pub fn rename(&self, src: &Path, dst: &Path) -> Result<bool, FsError> {
        let src = self.resolve(src);
        let dst = self.resolve(dst);
        debug!(src = %src.display(), dst = %dst.display(), "rename");

        if !self.session.exists(&src)? {
            return Ok(false);
        }

        let target = match self.session.lstat(&dst) {
            Ok(stat) if stat.is_dir() => {
                let Some(name) = src.file_name() else {
                    return Ok(false);
                };
                let inner = dst.join(name);
                if self.session.exists(&inner)? {
                    debug!(target = %inner.display(), "rename target exists");
                    return Ok(false);
                }
                inner
            }
            Ok(_) => return Ok(false),
            Err(FsError::NotFound { .. }) => dst,
            Err(e) => return Err(e),
        };

        if target.starts_with(&src) {
            return Ok(false);
        }

        match self.session.rename(&src, &target) {
            Ok(()) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a file or directory. See [`TreeExt::delete`].
    ///
    /// # Errors
    ///
    /// - [`FsError::DirectoryNotEmpty`] if `path` has children and
    ///   `recursive` is false
    pub fn delete(&self, path: &Path, recursive: bool) -> Result<bool, FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), recursive, "delete");
        self.session.delete(&path, recursive)
    }

    /// Create a directory and any missing ancestors.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `path` or an ancestor is a file
    pub fn mkdirs(&self, path: &Path, permission: Permissions) -> Result<(), FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), mode = permission.mode(), "mkdirs");
        self.session.mkdirs(&path, permission)
    }

    /// Check if `path` exists.
    pub fn exists(&self, path: &Path) -> Result<bool, FsError> {
        self.session.exists(&self.resolve(path))
    }

    /// Check if `path` is a regular file.
    pub fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        self.session.is_file(&self.resolve(path))
    }

    /// Check if `path` is a directory.
    pub fn is_directory(&self, path: &Path) -> Result<bool, FsError> {
        self.session.is_dir(&self.resolve(path))
    }

    /// Status of `path`. Files report the replication of their pool,
    /// directories report 1.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    pub fn get_file_status(&self, path: &Path) -> Result<FileStatus, FsError> {
        let path = self.resolve(path);
        let stat = self.session.lstat(&path)?;
        let replication = if stat.is_file() {
            self.replication_of(&path)?
        } else {
            1
        };
        Ok(FileStatus::from_stat(path, &stat, replication))
    }

    fn replication_of(&self, path: &Path) -> Result<u32, FsError> {
        let handle = self
            .session
            .open(path, OpenFlags::READ, Permissions::default_file())?;
        let replication = self.session.file_replication(handle);
        let closed = self.session.close(handle);
        let replication = replication?;
        closed?;
        Ok(replication)
    }

    /// Status of every child of a directory, or of the file itself when
    /// `path` is a file.
    ///
    /// Children removed while the listing runs are left out.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    pub fn list_status(&self, path: &Path) -> Result<Vec<FileStatus>, FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), "list");
        let entries = match self.session.listdir(&path) {
            Ok(entries) => entries.collect_all()?,
            Err(FsError::NotADirectory { .. }) => return Ok(vec![self.get_file_status(&path)?]),
            Err(e) => return Err(e),
        };

        let mut statuses = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.get_file_status(&entry.path) {
                Ok(status) => statuses.push(status),
                Err(FsError::NotFound { .. }) => {
                    debug!(path = %entry.path.display(), "entry vanished during listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(statuses)
    }

    /// Replica locations for `[start, start + len)` of a file.
    ///
    /// Locations come back in ascending offset order, contiguous and
    /// covering exactly the requested range. Returns `Ok(None)` if the
    /// session loses the file handle partway through.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - Topology lookup failures
    pub fn get_file_block_locations(
        &self,
        path: &Path,
        start: u64,
        len: u64,
    ) -> Result<Option<Vec<BlockLocation>>, FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), start, len, "block locations");
        let handle = self
            .session
            .open(&path, OpenFlags::READ, Permissions::default_file())?;

        let blocks: Result<Vec<_>, _> =
            BlockLocations::new(&self.session, handle, start, len).collect();
        let closed = self.session.close(handle);

        match blocks {
            Ok(blocks) => {
                closed?;
                Ok(Some(blocks))
            }
            Err(FsError::InvalidHandle { handle }) => {
                error!(path = %path.display(), handle = handle.0, "file handle lost");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Change the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    pub fn set_permission(&self, path: &Path, permission: Permissions) -> Result<(), FsError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), mode = permission.mode(), "chmod");
        self.session.setattr(
            &path,
            &SetAttr {
                mode: Some(permission),
                ..Default::default()
            },
        )
    }

    /// Change the modification and access times of `path`. `None` leaves a
    /// time unchanged; with both `None` only the existence of `path` is
    /// checked.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    pub fn set_times(
        &self,
        path: &Path,
        mtime: Option<SystemTime>,
        atime: Option<SystemTime>,
    ) -> Result<(), FsError> {
        let attr = SetAttr {
            mode: None,
            mtime,
            atime,
        };
        let path = self.resolve(path);
        debug!(path = %path.display(), "set times");
        if attr.is_empty() {
            return self.session.lstat(&path).map(|_| ());
        }
        self.session.setattr(&path, &attr)
    }

    // -------------------------------------------------------------------------
    // Defaults and capacity
    // -------------------------------------------------------------------------

    /// Replication factor for files created without an explicit one.
    pub fn get_default_replication(&self) -> u32 {
        self.context.default_replication()
    }

    /// Block size for files created without an explicit one.
    pub fn get_default_block_size(&self) -> u64 {
        self.context.default_block_size()
    }

    /// Cluster capacity.
    ///
    /// # Errors
    ///
    /// - Whatever the session reports for `statfs`
    pub fn get_status(&self) -> Result<StatFs, FsError> {
        self.session.statfs()
    }
}

impl<S: ClusterSession> std::fmt::Debug for CephFileSystem<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CephFileSystem")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CrushBucket, MemoryCluster, MemoryMount};
    use std::io::{Read, Write};
    use std::net::IpAddr;

    fn cluster() -> MemoryCluster {
        MemoryCluster::builder()
            .default_pool("data", 3)
            .pool("fast", 2)
            .stripe_unit_granularity(4096)
            .osd(0, IpAddr::from([10, 0, 0, 1]), vec![
                CrushBucket::new("host", "h0"),
                CrushBucket::new("rack", "r0"),
            ])
            .osd(1, IpAddr::from([10, 0, 0, 2]), vec![CrushBucket::new("host", "h1")])
            .osd(2, IpAddr::from([10, 0, 0, 3]), vec![CrushBucket::new("host", "h2")])
            .build()
    }

    fn fs_with(config: MountConfig) -> CephFileSystem<MemoryMount> {
        let session = MemoryMount::mount(&cluster(), &config).unwrap();
        CephFileSystem::initialize(session, &config).unwrap()
    }

    fn fs() -> CephFileSystem<MemoryMount> {
        fs_with(MountConfig::default())
    }

    fn write_file(fs: &CephFileSystem<MemoryMount>, path: &str, data: &[u8]) {
        let mut out = fs.create_default(Path::new(path), true).unwrap();
        out.write_all(data).unwrap();
        out.close().unwrap();
    }

    #[test]
    fn align_rounds_up_to_granularity() {
        assert_eq!(align_block_size(5000, 4096).unwrap(), 8192);
        assert_eq!(align_block_size(1, 4096).unwrap(), 4096);
        assert_eq!(align_block_size(4096, 4096).unwrap(), 4096);
        assert_eq!(align_block_size(7, 0).unwrap(), 7);
    }

    #[test]
    fn align_rejects_zero() {
        assert!(matches!(
            align_block_size(0, 4096),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn align_clamps_oversized() {
        let aligned = align_block_size(u64::MAX, 65536).unwrap();
        assert!(aligned <= MAX_BLOCK_SIZE);
        assert_eq!(aligned % 65536, 0);
        assert_eq!(align_block_size(u64::MAX, 1).unwrap(), MAX_BLOCK_SIZE);
    }

    #[test]
    fn create_rounds_block_size() {
        let fs = fs();
        let out = fs
            .create(Path::new("/f"), Permissions::default_file(), false, 3, 5000)
            .unwrap();
        drop(out);
        assert_eq!(fs.get_file_status(Path::new("/f")).unwrap().block_size, 8192);
    }

    #[test]
    fn create_makes_parents_and_reports_status() {
        let fs = fs();
        let out = fs
            .create(
                Path::new("/a/b/c.txt"),
                Permissions::from_mode(0o600),
                false,
                3,
                4096,
            )
            .unwrap();
        out.close().unwrap();

        assert!(fs.is_directory(Path::new("/a/b")).unwrap());
        let status = fs.get_file_status(Path::new("/a/b/c.txt")).unwrap();
        assert!(status.is_file());
        assert_eq!(status.permission.mode(), 0o600);
        assert_eq!(status.replication, 3);
        assert_eq!(status.path, PathBuf::from("/a/b/c.txt"));
    }

    #[test]
    fn create_existing_without_overwrite_fails() {
        let fs = fs();
        write_file(&fs, "/f", b"one");
        let err = fs
            .create(Path::new("/f"), Permissions::default_file(), false, 3, 4096)
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn create_with_overwrite_truncates() {
        let fs = fs();
        write_file(&fs, "/f", b"long contents");
        write_file(&fs, "/f", b"x");
        assert_eq!(fs.get_file_status(Path::new("/f")).unwrap().length, 1);
    }

    #[test]
    fn create_over_directory_fails() {
        let fs = fs();
        fs.mkdirs(Path::new("/d"), Permissions::default_dir()).unwrap();
        let err = fs.create_default(Path::new("/d"), true).unwrap_err();
        assert!(matches!(err, FsError::IsADirectory { .. }));
    }

    #[test]
    fn create_zero_block_size_fails() {
        let fs = fs();
        let err = fs
            .create(Path::new("/f"), Permissions::default_file(), true, 3, 0)
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument { .. }));
        assert!(!fs.exists(Path::new("/f")).unwrap());
    }

    #[test]
    fn create_picks_matching_pool() {
        let fs = fs_with(MountConfig {
            data_pools: vec!["fast".into()],
            ..Default::default()
        });
        fs.create(Path::new("/two"), Permissions::default_file(), false, 2, 4096)
            .unwrap()
            .close()
            .unwrap();
        fs.create(Path::new("/ten"), Permissions::default_file(), false, 10, 4096)
            .unwrap()
            .close()
            .unwrap();
        assert_eq!(fs.get_file_status(Path::new("/two")).unwrap().replication, 2);
        assert_eq!(fs.get_file_status(Path::new("/ten")).unwrap().replication, 3);
    }

    #[test]
    fn unknown_data_pool_is_skipped() {
        let fs = fs_with(MountConfig {
            data_pools: vec!["missing".into(), "fast".into()],
            ..Default::default()
        });
        fs.create(Path::new("/f"), Permissions::default_file(), false, 1, 4096)
            .unwrap()
            .close()
            .unwrap();
        assert_eq!(fs.get_file_status(Path::new("/f")).unwrap().replication, 2);
    }

    #[test]
    fn create_non_recursive_requires_parent() {
        let fs = fs();
        let err = fs
            .create_non_recursive(Path::new("/no/f"), Permissions::default_file(), false, 3, 4096)
            .unwrap_err();
        assert!(err.is_not_found());

        write_file(&fs, "/file", b"");
        let err = fs
            .create_non_recursive(
                Path::new("/file/f"),
                Permissions::default_file(),
                false,
                3,
                4096,
            )
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn open_reads_back_and_closes() {
        let fs = fs();
        write_file(&fs, "/f", b"payload");
        let mut input = fs.open(Path::new("/f")).unwrap();
        assert_eq!(input.len(), 7);
        let mut data = String::new();
        input.read_to_string(&mut data).unwrap();
        assert_eq!(data, "payload");
        input.close().unwrap();
        assert_eq!(fs.session().open_handles(), 0);
    }

    #[test]
    fn open_directory_fails_without_leaking() {
        let fs = fs();
        fs.mkdirs(Path::new("/d"), Permissions::default_dir()).unwrap();
        let err = fs.open(Path::new("/d")).unwrap_err();
        assert!(matches!(err, FsError::IsADirectory { .. }));
        assert_eq!(fs.session().open_handles(), 0);
    }

    #[test]
    fn append_writes_at_end() {
        let fs = fs();
        write_file(&fs, "/log", b"one,");
        let mut out = fs.append(Path::new("/log")).unwrap();
        assert_eq!(out.position(), 4);
        out.write_all(b"two").unwrap();
        out.close().unwrap();

        let mut data = String::new();
        fs.open(Path::new("/log"))
            .unwrap()
            .read_to_string(&mut data)
            .unwrap();
        assert_eq!(data, "one,two");
    }

    #[test]
    fn relative_paths_use_working_directory() {
        let fs = fs().with_working_directory(Path::new("/user/me"));
        write_file(&fs, "part-0", b"x");
        assert!(fs.is_file(Path::new("/user/me/part-0")).unwrap());
        assert_eq!(fs.working_directory(), Path::new("/user/me"));
    }

    #[test]
    fn rename_into_existing_directory() {
        let fs = fs();
        write_file(&fs, "/a", b"x");
        fs.mkdirs(Path::new("/d"), Permissions::default_dir()).unwrap();
        assert!(fs.rename(Path::new("/a"), Path::new("/d")).unwrap());
        assert!(fs.is_file(Path::new("/d/a")).unwrap());
        assert!(!fs.exists(Path::new("/a")).unwrap());
    }

    #[test]
    fn rename_refusals() {
        let fs = fs();
        assert!(!fs.rename(Path::new("/missing"), Path::new("/x")).unwrap());

        write_file(&fs, "/a", b"");
        write_file(&fs, "/b", b"");
        assert!(!fs.rename(Path::new("/a"), Path::new("/b")).unwrap());

        fs.mkdirs(Path::new("/d"), Permissions::default_dir()).unwrap();
        write_file(&fs, "/d/a", b"");
        assert!(!fs.rename(Path::new("/a"), Path::new("/d")).unwrap());
        assert!(fs.exists(Path::new("/a")).unwrap());

        assert!(!fs.rename(Path::new("/d"), Path::new("/d")).unwrap());
    }

    #[test]
    fn list_status_variants() {
        let fs = fs();
        fs.mkdirs(Path::new("/empty"), Permissions::default_dir()).unwrap();
        assert!(fs.list_status(Path::new("/empty")).unwrap().is_empty());

        write_file(&fs, "/f", b"abc");
        let single = fs.list_status(Path::new("/f")).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].length, 3);

        assert!(fs.list_status(Path::new("/missing")).unwrap_err().is_not_found());

        let root = fs.list_status(Path::new("/")).unwrap();
        let dir = root.iter().find(|s| s.path == Path::new("/empty")).unwrap();
        assert_eq!(dir.replication, 1);
    }

    #[test]
    fn block_locations_cover_window() {
        let fs = fs();
        let out = fs
            .create(Path::new("/big"), Permissions::default_file(), false, 3, 4096)
            .unwrap();
        out.close().unwrap();

        let blocks = fs
            .get_file_block_locations(Path::new("/big"), 1000, 10_000)
            .unwrap()
            .unwrap();
        assert_eq!(blocks.first().unwrap().offset, 1000);
        let mut cursor = 1000;
        for block in &blocks {
            assert_eq!(block.offset, cursor);
            assert_eq!(block.replicas.len(), 3);
            cursor += block.length;
        }
        assert_eq!(cursor, 11_000);
        assert_eq!(fs.session().open_handles(), 0);
    }

    #[test]
    fn set_permission_and_times() {
        let fs = fs();
        write_file(&fs, "/f", b"");
        fs.set_permission(Path::new("/f"), Permissions::from_mode(0o640))
            .unwrap();
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000);
        fs.set_times(Path::new("/f"), Some(t), None).unwrap();

        let status = fs.get_file_status(Path::new("/f")).unwrap();
        assert_eq!(status.permission.mode(), 0o640);
        assert_eq!(status.modification_time, t);
        assert_ne!(status.access_time, t);

        fs.set_times(Path::new("/f"), None, None).unwrap();
        assert_eq!(
            fs.get_file_status(Path::new("/f")).unwrap().modification_time,
            t
        );
        let err = fs.set_times(Path::new("/missing"), None, None).unwrap_err();
        assert!(err.is_not_found());
        let err = fs
            .set_times(Path::new("/missing"), Some(t), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn defaults_come_from_config() {
        let fs = fs_with(MountConfig {
            replication: 2,
            object_size: 1 << 20,
            ..Default::default()
        });
        assert_eq!(fs.get_default_replication(), 2);
        assert_eq!(fs.get_default_block_size(), 1 << 20);
    }

    #[test]
    fn close_unmounts() {
        let cluster = cluster();
        let config = MountConfig::default();
        let session = MemoryMount::mount(&cluster, &config).unwrap();
        let fs = CephFileSystem::initialize(session, &config).unwrap();
        assert!(fs.get_status().unwrap().total_bytes > 0);
        fs.close().unwrap();
    }
}

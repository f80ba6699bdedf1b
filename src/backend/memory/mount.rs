//! Cluster-native mount of a [`MemoryCluster`].

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::cluster::MemoryCluster;
use super::rooted::Rooted;
use crate::{
    FileExtent, FileLayout, FsError, Handle, MountConfig, NodeId, OpenFlags, Permissions,
    ReadDirIter, SessionIo, SessionMount, SessionNamespace, SessionPlacement, SessionTopology,
    SetAttr, StatFs, StatRecord, TopologyPath,
};

/// A session against a [`MemoryCluster`], as a cluster-native client would
/// see it.
///
/// Honors `root_dir` (the session's `/`), the authentication identity and
/// backend option overrides from [`MountConfig`]. Every file op goes
/// straight to the shared cluster state, so two mounts of one cluster see
/// each other's changes.
///
/// ```rust
/// use cephfs_adapter::{MemoryCluster, MemoryMount, MountConfig, SessionNamespace};
/// use std::path::Path;
///
/// let cluster = MemoryCluster::builder().directory("/hadoop").build();
/// let config = MountConfig {
///     root_dir: Some("/hadoop".into()),
///     ..Default::default()
/// };
/// let mount = MemoryMount::mount(&cluster, &config).unwrap();
/// assert!(mount.lstat(Path::new("/")).unwrap().is_dir());
/// ```
pub struct MemoryMount {
    inner: Rooted,
    localize_reads: bool,
    options: BTreeMap<String, String>,
}

impl MemoryMount {
    /// Mount `cluster` using `config`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `config` fails validation
    /// - [`FsError::Session`] if the identity is not accepted
    /// - [`FsError::NotFound`] if `root_dir` does not exist
    pub fn mount(cluster: &MemoryCluster, config: &MountConfig) -> Result<Self, FsError> {
        config.validate()?;
        cluster.authenticate(config.auth_id.as_deref())?;
        let root = config
            .root_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("/"));
        for (key, value) in &config.conf_options {
            debug!(key = %key, value = %value, "backend option");
        }
        Ok(Self {
            inner: Rooted::new(cluster.clone(), root)?,
            localize_reads: config.localize_reads,
            options: config.conf_options.clone(),
        })
    }

    /// The cluster this session is mounted on.
    pub fn cluster(&self) -> &MemoryCluster {
        self.inner.cluster()
    }

    /// Directory of the cluster namespace mounted as `/`.
    pub fn root(&self) -> &Path {
        self.inner.root()
    }

    /// Whether reads may be served by the nearest replica.
    pub fn localize_reads(&self) -> bool {
        self.localize_reads
    }

    /// A backend option override, if one was configured.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles()
    }

    fn pool_of(&self, handle: Handle) -> Result<String, FsError> {
        let layout = self.inner.layout(handle)?;
        Ok(layout
            .pool
            .unwrap_or_else(|| self.cluster().default_pool().to_string()))
    }
}

impl std::fmt::Debug for MemoryMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMount")
            .field("root", &self.inner.root())
            .field("localize_reads", &self.localize_reads)
            .field("open_handles", &self.inner.open_handles())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Layer 1
// =============================================================================

impl SessionIo for MemoryMount {
    fn open(&self, path: &Path, flags: OpenFlags, mode: Permissions) -> Result<Handle, FsError> {
        self.inner.open(path, flags, mode, None)
    }

    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        self.inner.read_at(handle, buf, offset)
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.inner.write_at(handle, data, offset)
    }

    fn fstat(&self, handle: Handle) -> Result<StatRecord, FsError> {
        self.inner.fstat(handle)
    }

    fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        self.inner.fsync(handle)
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        self.inner.close(handle)
    }
}

impl SessionNamespace for MemoryMount {
    fn lstat(&self, path: &Path) -> Result<StatRecord, FsError> {
        self.inner.lstat(path)
    }

    fn listdir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        self.inner.listdir(path)
    }

    fn mkdir(&self, path: &Path, mode: Permissions) -> Result<(), FsError> {
        self.inner.mkdir(path, mode)
    }

    fn unlink(&self, path: &Path) -> Result<(), FsError> {
        self.inner.unlink(path)
    }

    fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        self.inner.rmdir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.inner.rename(from, to)
    }

    fn setattr(&self, path: &Path, attr: &SetAttr) -> Result<(), FsError> {
        self.inner.setattr(path, attr)
    }
}

impl SessionMount for MemoryMount {
    fn statfs(&self) -> Result<StatFs, FsError> {
        self.inner.live()?;
        Ok(self.cluster().statfs())
    }

    fn unmount(&self) -> Result<(), FsError> {
        self.inner.unmount()
    }
}

// =============================================================================
// Layer 2
// =============================================================================

impl SessionPlacement for MemoryMount {
    fn open_with_layout(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: Permissions,
        layout: &FileLayout,
    ) -> Result<Handle, FsError> {
        self.inner.open(path, flags, mode, Some(layout))
    }

    fn file_pool_name(&self, handle: Handle) -> Result<String, FsError> {
        self.pool_of(handle)
    }

    fn pool_replication(&self, pool: &str) -> Result<u32, FsError> {
        self.inner.live()?;
        self.cluster().pool_replication(pool)
    }

    fn file_replication(&self, handle: Handle) -> Result<u32, FsError> {
        let pool = self.pool_of(handle)?;
        self.cluster().pool_replication(&pool)
    }

    fn stripe_unit_granularity(&self) -> u64 {
        self.cluster().granularity()
    }
}

impl SessionTopology for MemoryMount {
    fn extent_at(&self, handle: Handle, offset: u64) -> Result<FileExtent, FsError> {
        let file = self.inner.file(handle)?;
        let layout = self.inner.layout(handle)?;
        let replication = self.file_replication(handle)?;
        let object_size = layout.object_size.max(1);
        let index = offset / object_size;
        Ok(FileExtent {
            offset: index * object_size,
            length: object_size,
            nodes: self.cluster().place(file.ino, index, replication),
        })
    }

    fn node_address(&self, node: NodeId) -> Result<IpAddr, FsError> {
        self.cluster().osd_address(node)
    }

    fn node_topology(&self, node: NodeId) -> Result<TopologyPath, FsError> {
        let location = self.cluster().osd_location(node)?;
        Ok(TopologyPath::from_crush(&location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CrushBucket;

    fn cluster() -> MemoryCluster {
        MemoryCluster::builder()
            .default_pool("data", 3)
            .pool("fast", 2)
            .directory("/hadoop")
            .stripe_unit_granularity(4096)
            .osd(0, IpAddr::from([10, 0, 0, 1]), vec![CrushBucket::new("host", "a")])
            .osd(1, IpAddr::from([10, 0, 0, 2]), vec![CrushBucket::new("host", "b")])
            .osd(2, IpAddr::from([10, 0, 0, 3]), vec![CrushBucket::new("host", "c")])
            .user("hadoop")
            .build()
    }

    fn mount(cluster: &MemoryCluster) -> MemoryMount {
        let config = MountConfig {
            root_dir: Some("/hadoop".into()),
            auth_id: Some("hadoop".into()),
            ..Default::default()
        };
        MemoryMount::mount(cluster, &config).unwrap()
    }

    #[test]
    fn rejects_unknown_identity() {
        let config = MountConfig {
            auth_id: Some("mallory".into()),
            ..Default::default()
        };
        let err = MemoryMount::mount(&cluster(), &config).unwrap_err();
        assert!(matches!(err, FsError::Session(_)));
    }

    #[test]
    fn missing_root_dir_is_not_found() {
        let config = MountConfig {
            root_dir: Some("/nope".into()),
            auth_id: Some("hadoop".into()),
            ..Default::default()
        };
        let err = MemoryMount::mount(&cluster(), &config).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn paths_are_relative_to_root_dir() {
        let cluster = cluster();
        let m = mount(&cluster);
        m.mkdir(Path::new("/jobs"), Permissions::default_dir())
            .unwrap();
        assert!(cluster.contains(Path::new("/hadoop/jobs")));

        let err = m.lstat(Path::new("/missing")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { path } if path == Path::new("/missing")));
    }

    #[test]
    fn listdir_reports_session_paths() {
        let m = mount(&cluster());
        m.mkdir(Path::new("/d"), Permissions::default_dir()).unwrap();
        let h = m
            .open(Path::new("/d/f"), OpenFlags::CREATE, Permissions::default_file())
            .unwrap();
        m.close(h).unwrap();

        let entries = m.listdir(Path::new("/d")).unwrap().collect_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "f");
        assert_eq!(entries[0].path, PathBuf::from("/d/f"));
    }

    #[test]
    fn write_requires_write_flag() {
        let m = mount(&cluster());
        let h = m
            .open(Path::new("/f"), OpenFlags::CREATE, Permissions::default_file())
            .unwrap();
        m.close(h).unwrap();
        let h = m
            .open(Path::new("/f"), OpenFlags::READ, Permissions::default_file())
            .unwrap();
        let err = m.write_at(h, b"x", 0).unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
        m.close(h).unwrap();
    }

    #[test]
    fn layout_pool_drives_replication() {
        let m = mount(&cluster());
        let layout = FileLayout::single_stripe(8192, "fast");
        let h = m
            .open_with_layout(
                Path::new("/f"),
                OpenFlags::CREATE,
                Permissions::default_file(),
                &layout,
            )
            .unwrap();
        assert_eq!(m.file_pool_name(h).unwrap(), "fast");
        assert_eq!(m.file_replication(h).unwrap(), 2);
        assert_eq!(m.fstat(h).unwrap().block_size, 8192);

        let extent = m.extent_at(h, 10_000).unwrap();
        assert_eq!(extent.offset, 8192);
        assert_eq!(extent.length, 8192);
        assert_eq!(extent.nodes.len(), 2);
        m.close(h).unwrap();
    }

    #[test]
    fn root_reports_default_pool() {
        let m = mount(&cluster());
        let h = m
            .open(Path::new("/"), OpenFlags::READ, Permissions::default_dir())
            .unwrap();
        assert_eq!(m.file_pool_name(h).unwrap(), "data");
        m.close(h).unwrap();
    }

    #[test]
    fn unmount_invalidates_session() {
        let m = mount(&cluster());
        m.unmount().unwrap();
        assert!(matches!(m.lstat(Path::new("/")), Err(FsError::Session(_))));
        assert!(m.unmount().is_err());
    }

    #[test]
    fn mount_root_cannot_be_removed() {
        let m = mount(&cluster());
        let err = m.rmdir(Path::new("/")).unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
    }

    #[test]
    fn keeps_backend_options() {
        let config = MountConfig {
            auth_id: Some("hadoop".into()),
            localize_reads: false,
            conf_options: [("debug_client".to_string(), "0".to_string())].into(),
            ..Default::default()
        };
        let m = MemoryMount::mount(&cluster(), &config).unwrap();
        assert!(!m.localize_reads());
        assert_eq!(m.option("debug_client"), Some("0"));
        assert_eq!(m.option("missing"), None);
    }
}

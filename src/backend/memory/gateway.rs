//! Object-gateway view of a [`MemoryCluster`]: one bucket mounted as `/`.

use std::net::IpAddr;
use std::path::Path;

use tracing::debug;

use super::cluster::MemoryCluster;
use super::rooted::Rooted;
use crate::{
    FileExtent, FileLayout, FsError, GatewayConfig, Handle, NodeId, OpenFlags, Permissions,
    ReadDirIter, SessionIo, SessionMount, SessionNamespace, SessionPlacement, SessionTopology,
    SetAttr, StatFs, StatRecord, TopologyPath,
};

/// A session against one bucket of a [`MemoryCluster`] through its object
/// gateway.
///
/// Differences from [`MemoryMount`](super::MemoryMount):
///
/// - Appending is not supported.
/// - Every file lives in a pool named after the bucket, with the replication
///   factor from [`GatewayConfig`]. Layout hints on create are ignored.
/// - Block size comes from the gateway configuration.
/// - Extents are served by the gateway endpoints rather than storage nodes.
pub struct MemoryGateway {
    inner: Rooted,
    bucket: String,
    block_size: u64,
    replication: u32,
}

impl MemoryGateway {
    /// Mount `bucket` of `cluster`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidArgument`] if `config` fails validation
    /// - [`FsError::Session`] if the credentials are not accepted
    /// - [`FsError::NotFound`] if the bucket does not exist
    pub fn mount(
        cluster: &MemoryCluster,
        bucket: &str,
        config: &GatewayConfig,
    ) -> Result<Self, FsError> {
        config.validate()?;
        cluster.authenticate_gateway(
            config.user_id.as_deref(),
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
        )?;
        debug!(bucket, args = %config.args, "gateway mount");
        Ok(Self {
            inner: Rooted::new(cluster.clone(), Path::new("/").join(bucket))?,
            bucket: bucket.to_string(),
            block_size: config.block_size,
            replication: config.replication,
        })
    }

    /// The mounted bucket.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.inner.open_handles()
    }

    fn with_block_size(&self, mut stat: StatRecord) -> StatRecord {
        stat.block_size = self.block_size;
        stat
    }
}

impl std::fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGateway")
            .field("bucket", &self.bucket)
            .field("block_size", &self.block_size)
            .field("replication", &self.replication)
            .finish_non_exhaustive()
    }
}

impl SessionIo for MemoryGateway {
    fn open(&self, path: &Path, flags: OpenFlags, mode: Permissions) -> Result<Handle, FsError> {
        if flags.append {
            return Err(FsError::NotSupported {
                operation: "append",
            });
        }
        self.inner.open(path, flags, mode, None)
    }

    fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
        self.inner.read_at(handle, buf, offset)
    }

    fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.inner.write_at(handle, data, offset)
    }

    fn fstat(&self, handle: Handle) -> Result<StatRecord, FsError> {
        self.inner.fstat(handle).map(|s| self.with_block_size(s))
    }

    fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        self.inner.fsync(handle)
    }

    fn close(&self, handle: Handle) -> Result<(), FsError> {
        self.inner.close(handle)
    }
}

impl SessionNamespace for MemoryGateway {
    fn lstat(&self, path: &Path) -> Result<StatRecord, FsError> {
        self.inner.lstat(path).map(|s| self.with_block_size(s))
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

impl SessionMount for MemoryGateway {
    fn statfs(&self) -> Result<StatFs, FsError> {
        self.inner.live()?;
        let mut stat = self.inner.cluster().statfs();
        stat.block_size = self.block_size;
        Ok(stat)
    }

    fn unmount(&self) -> Result<(), FsError> {
        self.inner.unmount()
    }
}

impl SessionPlacement for MemoryGateway {
    fn open_with_layout(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: Permissions,
        _layout: &FileLayout,
    ) -> Result<Handle, FsError> {
        self.open(path, flags, mode)
    }

    fn file_pool_name(&self, handle: Handle) -> Result<String, FsError> {
        self.inner.file(handle)?;
        Ok(self.bucket.clone())
    }

    fn pool_replication(&self, pool: &str) -> Result<u32, FsError> {
        self.inner.live()?;
        if pool == self.bucket {
            Ok(self.replication)
        } else {
            Err(FsError::PoolLookup {
                pool: pool.to_string(),
                reason: format!("gateway only serves bucket {}", self.bucket),
            })
        }
    }

    fn file_replication(&self, handle: Handle) -> Result<u32, FsError> {
        self.inner.file(handle)?;
        Ok(self.replication)
    }

    fn stripe_unit_granularity(&self) -> u64 {
        1
    }
}

impl SessionTopology for MemoryGateway {
    fn extent_at(&self, handle: Handle, offset: u64) -> Result<FileExtent, FsError> {
        self.inner.file(handle)?;
        let index = offset / self.block_size;
        let endpoints = self.inner.cluster().gateway_count() as u32;
        Ok(FileExtent {
            offset: index * self.block_size,
            length: self.block_size,
            nodes: (0..endpoints).map(NodeId).collect(),
        })
    }

    fn node_address(&self, node: NodeId) -> Result<IpAddr, FsError> {
        self.inner.cluster().gateway_address(node)
    }

    fn node_topology(&self, node: NodeId) -> Result<TopologyPath, FsError> {
        let location = self.inner.cluster().gateway_location(node)?;
        Ok(TopologyPath::from_gateway(&location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> MemoryCluster {
        MemoryCluster::builder()
            .bucket("logs")
            .gateway_endpoint(IpAddr::from([10, 1, 0, 1]), "rgw-a", Some("zone-1"))
            .gateway_endpoint(IpAddr::from([10, 1, 0, 2]), "rgw-b", None)
            .gateway_user("testid", "AK", "SK")
            .build()
    }

    fn config() -> GatewayConfig {
        GatewayConfig {
            user_id: Some("testid".into()),
            access_key: Some("AK".into()),
            secret_key: Some("SK".into()),
            block_size: 1024,
            replication: 2,
            ..Default::default()
        }
    }

    #[test]
    fn bad_credentials_are_rejected() {
        let config = GatewayConfig {
            secret_key: Some("wrong".into()),
            ..config()
        };
        let err = MemoryGateway::mount(&cluster(), "logs", &config).unwrap_err();
        assert!(matches!(err, FsError::Session(_)));
    }

    #[test]
    fn missing_bucket_is_not_found() {
        let err = MemoryGateway::mount(&cluster(), "nope", &config()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn append_is_not_supported() {
        let gw = MemoryGateway::mount(&cluster(), "logs", &config()).unwrap();
        let err = gw
            .open(Path::new("/f"), OpenFlags::APPEND, Permissions::default_file())
            .unwrap_err();
        assert!(matches!(err, FsError::NotSupported { operation: "append" }));
    }

    #[test]
    fn bucket_is_the_pool() {
        let gw = MemoryGateway::mount(&cluster(), "logs", &config()).unwrap();
        let h = gw
            .open(Path::new("/"), OpenFlags::READ, Permissions::default_dir())
            .unwrap();
        assert_eq!(gw.file_pool_name(h).unwrap(), "logs");
        assert_eq!(gw.pool_replication("logs").unwrap(), 2);
        assert!(gw.pool_replication("data").is_err());
        gw.close(h).unwrap();
    }

    #[test]
    fn extents_are_served_by_endpoints() {
        let gw = MemoryGateway::mount(&cluster(), "logs", &config()).unwrap();
        let h = gw
            .open(Path::new("/f"), OpenFlags::CREATE, Permissions::default_file())
            .unwrap();
        let extent = gw.extent_at(h, 1500).unwrap();
        assert_eq!((extent.offset, extent.length), (1024, 1024));
        assert_eq!(extent.nodes, vec![NodeId(0), NodeId(1)]);

        let path = gw.node_topology(NodeId(0)).unwrap();
        assert_eq!(path.host(), Some("rgw-a"));
        assert_eq!(path.rack(), Some("zone-1"));
        assert!(gw.node_address(NodeId(5)).is_err());
        gw.close(h).unwrap();
    }

    #[test]
    fn parent_components_cannot_leave_the_bucket() {
        let cluster = cluster();
        let gw = MemoryGateway::mount(&cluster, "logs", &config()).unwrap();
        let err = gw
            .mkdir(Path::new("/../x"), Permissions::default_dir())
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument { .. }));
        assert!(!cluster.contains(Path::new("/logs/..")));
        assert!(!cluster.contains(Path::new("/x")));

        let err = gw.lstat(Path::new("/a/../b")).unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument { .. }));
    }
}

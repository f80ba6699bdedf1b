//! Shared state of a simulated cluster: pools, storage nodes, gateways and
//! one namespace that every mount sees.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::ops::Bound;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::{
    CrushBucket, FileLayout, FileType, FsError, GatewayLocation, Handle, NodeId, OpenFlags,
    Permissions, SetAttr, StatFs, StatRecord,
};

/// Stripe units must be multiples of this unless configured otherwise.
pub const DEFAULT_STRIPE_UNIT_GRANULARITY: u64 = 64 * 1024;

/// Object size of files created without an explicit layout.
pub const DEFAULT_CLUSTER_OBJECT_SIZE: u64 = 4 * 1024 * 1024;

const ROOT_INO: u64 = 1;

// =============================================================================
// Public handle
// =============================================================================

/// A simulated cluster shared by any number of mounts.
///
/// Cheap to clone; clones share state. Mount it with
/// [`MemoryMount::mount`](super::MemoryMount::mount) or
/// [`MemoryGateway::mount`](super::MemoryGateway::mount).
///
/// ```rust
/// use cephfs_adapter::{CrushBucket, MemoryCluster};
///
/// let cluster = MemoryCluster::builder()
///     .default_pool("data", 3)
///     .pool("scratch", 1)
///     .osd(0, "10.0.0.1".parse().unwrap(), vec![
///         CrushBucket::new("host", "node-a"),
///         CrushBucket::new("rack", "r1"),
///     ])
///     .build();
/// assert_eq!(cluster.pool_names(), vec!["data", "scratch"]);
/// ```
#[derive(Clone)]
pub struct MemoryCluster(Arc<ClusterState>);

struct ClusterState {
    namespace: RwLock<Namespace>,
    pools: BTreeMap<String, u32>,
    default_pool: String,
    osds: BTreeMap<NodeId, Osd>,
    gateways: Vec<GatewayEndpoint>,
    users: Vec<String>,
    gateway_users: BTreeMap<String, GatewayCredentials>,
    granularity: u64,
    object_size: u64,
    capacity: u64,
}

#[derive(Debug, Clone)]
struct Osd {
    address: IpAddr,
    location: Vec<CrushBucket>,
}

#[derive(Debug, Clone)]
struct GatewayEndpoint {
    address: IpAddr,
    location: GatewayLocation,
}

#[derive(Clone)]
struct GatewayCredentials {
    access_key: String,
    secret_key: String,
}

impl MemoryCluster {
    /// Start building a cluster.
    pub fn builder() -> MemoryClusterBuilder {
        MemoryClusterBuilder::default()
    }

    /// A cluster with one pool `data` (replication 3) and no storage nodes.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Names of all pools.
    pub fn pool_names(&self) -> Vec<&str> {
        self.0.pools.keys().map(String::as_str).collect()
    }

    /// Pool backing the namespace root.
    pub fn default_pool(&self) -> &str {
        &self.0.default_pool
    }

    /// Returns `true` if `path` exists in the cluster namespace.
    pub fn contains(&self, path: &Path) -> bool {
        self.0.namespace.read().names.contains_key(path)
    }

    /// Number of entries in the namespace, the root included.
    pub fn entry_count(&self) -> usize {
        self.0.namespace.read().names.len()
    }

    // -------------------------------------------------------------------------
    // Crate-internal operations on cluster-absolute paths
    // -------------------------------------------------------------------------

    pub(crate) fn granularity(&self) -> u64 {
        self.0.granularity
    }

    pub(crate) fn pool_replication(&self, pool: &str) -> Result<u32, FsError> {
        self.0
            .pools
            .get(pool)
            .copied()
            .ok_or_else(|| FsError::PoolLookup {
                pool: pool.to_string(),
                reason: "no such pool".into(),
            })
    }

    pub(crate) fn authenticate(&self, id: Option<&str>) -> Result<(), FsError> {
        if self.0.users.is_empty() {
            return Ok(());
        }
        match id {
            Some(id) if self.0.users.iter().any(|u| u == id) => Ok(()),
            _ => Err(FsError::Session(format!(
                "authentication failed for {}",
                id.unwrap_or("anonymous")
            ))),
        }
    }

    pub(crate) fn authenticate_gateway(
        &self,
        user: Option<&str>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
    ) -> Result<(), FsError> {
        if self.0.gateway_users.is_empty() {
            return Ok(());
        }
        let accepted = user
            .and_then(|u| self.0.gateway_users.get(u))
            .is_some_and(|c| {
                access_key == Some(c.access_key.as_str())
                    && secret_key == Some(c.secret_key.as_str())
            });
        if accepted {
            Ok(())
        } else {
            Err(FsError::Session(format!(
                "gateway authentication failed for {}",
                user.unwrap_or("anonymous")
            )))
        }
    }

    pub(crate) fn stat(&self, path: &Path) -> Result<StatRecord, FsError> {
        let ns = self.0.namespace.read();
        let (ino, inode) = ns.get(path)?;
        Ok(inode.stat(ino))
    }

    pub(crate) fn stat_ino(&self, ino: u64) -> Option<StatRecord> {
        self.0.namespace.read().inodes.get(&ino).map(|i| i.stat(ino))
    }

    pub(crate) fn layout_of(&self, ino: u64) -> Option<FileLayout> {
        self.0
            .namespace
            .read()
            .inodes
            .get(&ino)
            .map(|i| i.layout.clone())
    }

    pub(crate) fn children(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        self.0.namespace.read().children(dir)
    }

    pub(crate) fn mkdir(&self, path: &Path, mode: Permissions) -> Result<(), FsError> {
        self.0.namespace.write().mkdir(path, mode)
    }

    pub(crate) fn unlink(&self, path: &Path) -> Result<(), FsError> {
        self.0.namespace.write().unlink(path)
    }

    pub(crate) fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        self.0.namespace.write().rmdir(path)
    }

    pub(crate) fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.0.namespace.write().rename(from, to)
    }

    pub(crate) fn setattr(&self, path: &Path, attr: &SetAttr) -> Result<(), FsError> {
        let mut ns = self.0.namespace.write();
        let ino = ns.lookup(path)?;
        let inode = ns.inode_mut(ino, path)?;
        if let Some(mode) = attr.mode {
            inode.mode = mode;
        }
        if let Some(mtime) = attr.mtime {
            inode.modified = mtime;
        }
        if let Some(atime) = attr.atime {
            inode.accessed = atime;
        }
        Ok(())
    }

    /// Open or create `path`, returning its inode number. `layout` applies
    /// only when the file is created.
    pub(crate) fn open(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: Permissions,
        layout: Option<&FileLayout>,
    ) -> Result<u64, FsError> {
        if let Some(layout) = layout {
            self.check_layout(layout)?;
        }

        let mut ns = self.0.namespace.write();
        if let Some(&ino) = ns.names.get(path) {
            let inode = ns.inode_mut(ino, path)?;
            if inode.file_type == FileType::Directory && (flags.write || flags.append) {
                return Err(FsError::IsADirectory {
                    path: path.to_path_buf(),
                });
            }
            if flags.truncate && inode.file_type == FileType::File {
                inode.data.clear();
                inode.modified = SystemTime::now();
            }
            return Ok(ino);
        }

        if !flags.create {
            return Err(FsError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let parent_pool = ns.parent_dir(path)?.layout.pool.clone();
        let layout = match layout {
            Some(layout) => layout.clone(),
            None => FileLayout {
                stripe_unit: self.0.object_size,
                stripe_count: 1,
                object_size: self.0.object_size,
                pool: parent_pool,
            },
        };
        Ok(ns.insert(path.to_path_buf(), Inode::file(mode, layout)))
    }

    pub(crate) fn read(&self, ino: u64, buf: &mut [u8], offset: u64) -> Option<usize> {
        let mut ns = self.0.namespace.write();
        let inode = ns.inodes.get_mut(&ino)?;
        inode.accessed = SystemTime::now();
        let len = inode.data.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
        let n = buf.len().min(len - start);
        buf[..n].copy_from_slice(&inode.data[start..start + n]);
        Some(n)
    }

    pub(crate) fn write(&self, ino: u64, data: &[u8], offset: u64, append: bool) -> Option<usize> {
        let mut ns = self.0.namespace.write();
        let inode = ns.inodes.get_mut(&ino)?;
        let start = if append {
            inode.data.len()
        } else {
            usize::try_from(offset).ok()?
        };
        let end = start.checked_add(data.len())?;
        if inode.data.len() < end {
            inode.data.resize(end, 0);
        }
        inode.data[start..end].copy_from_slice(data);
        inode.modified = SystemTime::now();
        Some(data.len())
    }

    /// Replica nodes for object `index` of inode `ino`, primary first.
    pub(crate) fn place(&self, ino: u64, index: u64, replication: u32) -> Vec<NodeId> {
        let ids: Vec<NodeId> = self.0.osds.keys().copied().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        let n = ids.len() as u64;
        let start = (ino.wrapping_mul(31).wrapping_add(index)) % n;
        (0..u64::from(replication).min(n))
            .map(|i| ids[((start + i) % n) as usize])
            .collect()
    }

    pub(crate) fn osd_address(&self, node: NodeId) -> Result<IpAddr, FsError> {
        self.0
            .osds
            .get(&node)
            .map(|o| o.address)
            .ok_or(FsError::NodeNotFound { node })
    }

    pub(crate) fn osd_location(&self, node: NodeId) -> Result<Vec<CrushBucket>, FsError> {
        self.0
            .osds
            .get(&node)
            .map(|o| o.location.clone())
            .ok_or(FsError::NodeNotFound { node })
    }

    pub(crate) fn gateway_count(&self) -> usize {
        self.0.gateways.len()
    }

    pub(crate) fn gateway_address(&self, node: NodeId) -> Result<IpAddr, FsError> {
        self.0
            .gateways
            .get(node.0 as usize)
            .map(|g| g.address)
            .ok_or(FsError::NodeNotFound { node })
    }

    pub(crate) fn gateway_location(&self, node: NodeId) -> Result<GatewayLocation, FsError> {
        self.0
            .gateways
            .get(node.0 as usize)
            .map(|g| g.location.clone())
            .ok_or(FsError::NodeNotFound { node })
    }

    pub(crate) fn statfs(&self) -> StatFs {
        let used: u64 = self
            .0
            .namespace
            .read()
            .inodes
            .values()
            .map(|i| i.data.len() as u64)
            .sum();
        StatFs {
            total_bytes: self.0.capacity,
            used_bytes: used,
            available_bytes: self.0.capacity.saturating_sub(used),
            block_size: self.0.object_size,
        }
    }

    fn check_layout(&self, layout: &FileLayout) -> Result<(), FsError> {
        if let Some(pool) = &layout.pool {
            self.pool_replication(pool)?;
        }
        if layout.stripe_unit == 0 || layout.stripe_unit % self.0.granularity != 0 {
            return Err(FsError::invalid_argument(format!(
                "stripe unit {} is not a multiple of {}",
                layout.stripe_unit, self.0.granularity
            )));
        }
        if layout.stripe_unit > i32::MAX as u64 || layout.object_size % layout.stripe_unit != 0 {
            return Err(FsError::invalid_argument(format!(
                "object size {} does not fit stripe unit {}",
                layout.object_size, layout.stripe_unit
            )));
        }
        Ok(())
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCluster")
            .field("pools", &self.0.pools)
            .field("default_pool", &self.0.default_pool)
            .field("osds", &self.0.osds.len())
            .field("gateways", &self.0.gateways.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`MemoryCluster`].
#[derive(Debug, Clone)]
pub struct MemoryClusterBuilder {
    pools: BTreeMap<String, u32>,
    default_pool: Option<String>,
    osds: BTreeMap<NodeId, Osd>,
    gateways: Vec<GatewayEndpoint>,
    users: Vec<String>,
    gateway_users: Vec<(String, String, String)>,
    directories: Vec<PathBuf>,
    granularity: u64,
    object_size: u64,
    capacity: u64,
}

impl Default for MemoryClusterBuilder {
    fn default() -> Self {
        Self {
            pools: BTreeMap::new(),
            default_pool: None,
            osds: BTreeMap::new(),
            gateways: Vec::new(),
            users: Vec::new(),
            gateway_users: Vec::new(),
            directories: Vec::new(),
            granularity: DEFAULT_STRIPE_UNIT_GRANULARITY,
            object_size: DEFAULT_CLUSTER_OBJECT_SIZE,
            capacity: 1 << 40,
        }
    }
}

impl MemoryClusterBuilder {
    /// Pool backing the namespace root. Defaults to `data` with replication 3.
    pub fn default_pool(mut self, name: impl Into<String>, replication: u32) -> Self {
        let name = name.into();
        self.pools.insert(name.clone(), replication);
        self.default_pool = Some(name);
        self
    }

    /// Add a pool.
    pub fn pool(mut self, name: impl Into<String>, replication: u32) -> Self {
        self.pools.insert(name.into(), replication);
        self
    }

    /// Add a storage node and its CRUSH location, leaf first.
    pub fn osd(mut self, id: u32, address: IpAddr, location: Vec<CrushBucket>) -> Self {
        self.osds.insert(NodeId(id), Osd { address, location });
        self
    }

    /// Add an object-gateway endpoint.
    pub fn gateway_endpoint(
        mut self,
        address: IpAddr,
        host: impl Into<String>,
        zone: Option<&str>,
    ) -> Self {
        self.gateways.push(GatewayEndpoint {
            address,
            location: GatewayLocation {
                host: host.into(),
                zone: zone.map(str::to_string),
            },
        });
        self
    }

    /// Accept this identity on cluster-native mounts. With no users
    /// configured every identity is accepted.
    pub fn user(mut self, id: impl Into<String>) -> Self {
        self.users.push(id.into());
        self
    }

    /// Accept these gateway credentials. With none configured every
    /// gateway client is accepted.
    pub fn gateway_user(
        mut self,
        user: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.gateway_users
            .push((user.into(), access_key.into(), secret_key.into()));
        self
    }

    /// Create a directory and its ancestors at build time.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directories.push(path.into());
        self
    }

    /// Create a gateway bucket, the top-level directory `/<name>`.
    pub fn bucket(self, name: &str) -> Self {
        self.directory(Path::new("/").join(name))
    }

    /// Stripe-unit alignment. Zero is treated as one.
    pub fn stripe_unit_granularity(mut self, granularity: u64) -> Self {
        self.granularity = granularity.max(1);
        self
    }

    /// Object size of files created without a layout.
    pub fn object_size(mut self, object_size: u64) -> Self {
        self.object_size = object_size.max(1);
        self
    }

    /// Total capacity reported by `statfs`.
    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Finish building.
    pub fn build(mut self) -> MemoryCluster {
        let default_pool = match self.default_pool.take() {
            Some(name) => name,
            None => {
                self.pools.entry("data".to_string()).or_insert(3);
                "data".to_string()
            }
        };

        let root_layout = FileLayout {
            stripe_unit: self.object_size,
            stripe_count: 1,
            object_size: self.object_size,
            pool: Some(default_pool.clone()),
        };
        let mut namespace = Namespace::new(root_layout);
        for dir in &self.directories {
            namespace.mkdir_all(dir);
        }

        MemoryCluster(Arc::new(ClusterState {
            namespace: RwLock::new(namespace),
            pools: self.pools,
            default_pool,
            osds: self.osds,
            gateways: self.gateways,
            users: self.users,
            gateway_users: self
                .gateway_users
                .into_iter()
                .map(|(user, access_key, secret_key)| {
                    (
                        user,
                        GatewayCredentials {
                            access_key,
                            secret_key,
                        },
                    )
                })
                .collect(),
            granularity: self.granularity,
            object_size: self.object_size,
            capacity: self.capacity,
        }))
    }
}

// =============================================================================
// Namespace
// =============================================================================

#[derive(Debug, Clone)]
struct Inode {
    file_type: FileType,
    data: Vec<u8>,
    mode: Permissions,
    modified: SystemTime,
    accessed: SystemTime,
    layout: FileLayout,
}

impl Inode {
    fn file(mode: Permissions, layout: FileLayout) -> Self {
        let now = SystemTime::now();
        Self {
            file_type: FileType::File,
            data: Vec::new(),
            mode,
            modified: now,
            accessed: now,
            layout,
        }
    }

    fn directory(mode: Permissions, layout: FileLayout) -> Self {
        Self {
            file_type: FileType::Directory,
            ..Self::file(mode, layout)
        }
    }

    fn stat(&self, ino: u64) -> StatRecord {
        StatRecord {
            file_type: self.file_type,
            size: match self.file_type {
                FileType::File => self.data.len() as u64,
                FileType::Directory => 0,
            },
            permissions: self.mode,
            modified: self.modified,
            accessed: self.accessed,
            block_size: self.layout.object_size,
            inode: ino,
        }
    }
}

/// Inodes by number plus a name index. Every name is an absolute cluster
/// path; `/` always exists.
struct Namespace {
    inodes: HashMap<u64, Inode>,
    names: BTreeMap<PathBuf, u64>,
    next_ino: u64,
}

impl Namespace {
    fn new(root_layout: FileLayout) -> Self {
        let mut ns = Self {
            inodes: HashMap::new(),
            names: BTreeMap::new(),
            next_ino: ROOT_INO,
        };
        ns.insert(
            PathBuf::from("/"),
            Inode::directory(Permissions::default_dir(), root_layout),
        );
        ns
    }

    fn insert(&mut self, path: PathBuf, inode: Inode) -> u64 {
        let ino = self.next_ino;
        self.next_ino += 1;
        self.inodes.insert(ino, inode);
        self.names.insert(path, ino);
        ino
    }

    fn lookup(&self, path: &Path) -> Result<u64, FsError> {
        self.names.get(path).copied().ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })
    }

    fn get(&self, path: &Path) -> Result<(u64, &Inode), FsError> {
        let ino = self.lookup(path)?;
        let inode = self.inodes.get(&ino).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok((ino, inode))
    }

    fn inode_mut(&mut self, ino: u64, path: &Path) -> Result<&mut Inode, FsError> {
        self.inodes.get_mut(&ino).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })
    }

    fn parent_dir(&self, path: &Path) -> Result<&Inode, FsError> {
        let parent = path.parent().unwrap_or(Path::new("/"));
        let (_, inode) = self.get(parent)?;
        if inode.file_type != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: parent.to_path_buf(),
            });
        }
        Ok(inode)
    }

    /// Names at or below `dir`, in order.
    fn subtree<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = (&'a PathBuf, &'a u64)> + 'a {
        self.names
            .range::<Path, _>((Bound::Included(dir), Bound::Unbounded))
            .take_while(move |(p, _)| p.starts_with(dir))
    }

    fn children(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        let (_, inode) = self.get(dir)?;
        if inode.file_type != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        Ok(self
            .subtree(dir)
            .filter(|(p, _)| p.parent() == Some(dir))
            .filter_map(|(p, _)| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn mkdir(&mut self, path: &Path, mode: Permissions) -> Result<(), FsError> {
        if self.names.contains_key(path) {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation: "mkdir",
            });
        }
        let layout = self.parent_dir(path)?.layout.clone();
        self.insert(path.to_path_buf(), Inode::directory(mode, layout));
        Ok(())
    }

    fn mkdir_all(&mut self, path: &Path) {
        let mut current = PathBuf::from("/");
        for component in path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
        {
            current.push(component);
            if !self.names.contains_key(&current) {
                // Parent was created on the previous iteration.
                let _ = self.mkdir(&current, Permissions::default_dir());
            }
        }
    }

    fn unlink(&mut self, path: &Path) -> Result<(), FsError> {
        let (ino, inode) = self.get(path)?;
        if inode.file_type == FileType::Directory {
            return Err(FsError::IsADirectory {
                path: path.to_path_buf(),
            });
        }
        self.names.remove(path);
        self.inodes.remove(&ino);
        Ok(())
    }

    fn rmdir(&mut self, path: &Path) -> Result<(), FsError> {
        let (ino, inode) = self.get(path)?;
        if inode.file_type != FileType::Directory {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        if ino == ROOT_INO {
            return Err(FsError::PermissionDenied {
                path: path.to_path_buf(),
                operation: "rmdir",
            });
        }
        if self.subtree(path).nth(1).is_some() {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_path_buf(),
            });
        }
        self.names.remove(path);
        self.inodes.remove(&ino);
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError> {
        let (from_ino, from_inode) = self.get(from)?;
        let moving_dir = from_inode.file_type == FileType::Directory;
        if from_ino == ROOT_INO || (to.starts_with(from) && to != from) {
            return Err(FsError::invalid_argument(format!(
                "cannot move {} to {}",
                from.display(),
                to.display()
            )));
        }
        if from == to {
            return Ok(());
        }
        self.parent_dir(to)?;

        if let Some(&to_ino) = self.names.get(to) {
            let target_is_dir = self
                .inodes
                .get(&to_ino)
                .is_some_and(|i| i.file_type == FileType::Directory);
            match (moving_dir, target_is_dir) {
                (false, false) => {}
                (true, true) if self.subtree(to).nth(1).is_none() => {}
                (true, true) => {
                    return Err(FsError::DirectoryNotEmpty {
                        path: to.to_path_buf(),
                    });
                }
                (false, true) => {
                    return Err(FsError::IsADirectory {
                        path: to.to_path_buf(),
                    });
                }
                (true, false) => {
                    return Err(FsError::NotADirectory {
                        path: to.to_path_buf(),
                    });
                }
            }
            self.names.remove(to);
            self.inodes.remove(&to_ino);
        }

        let moved: Vec<(PathBuf, u64)> = self
            .subtree(from)
            .map(|(p, &ino)| (p.clone(), ino))
            .collect();
        for (old, ino) in moved {
            self.names.remove(&old);
            let new = match old.strip_prefix(from) {
                Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
                _ => to.to_path_buf(),
            };
            self.names.insert(new, ino);
        }
        Ok(())
    }
}

// =============================================================================
// Handles
// =============================================================================

/// What a handle refers to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenFile {
    pub(crate) ino: u64,
    pub(crate) flags: OpenFlags,
}

/// Per-mount table of open handles.
#[derive(Debug, Default)]
pub(crate) struct HandleTable {
    next: AtomicU64,
    open: Mutex<HashMap<u64, OpenFile>>,
}

impl HandleTable {
    pub(crate) fn insert(&self, file: OpenFile) -> Handle {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.open.lock().insert(id, file);
        Handle(id)
    }

    pub(crate) fn get(&self, handle: Handle) -> Result<OpenFile, FsError> {
        self.open
            .lock()
            .get(&handle.0)
            .copied()
            .ok_or(FsError::InvalidHandle { handle })
    }

    pub(crate) fn remove(&self, handle: Handle) -> Result<OpenFile, FsError> {
        self.open
            .lock()
            .remove(&handle.0)
            .ok_or(FsError::InvalidHandle { handle })
    }

    pub(crate) fn len(&self) -> usize {
        self.open.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.open.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> MemoryCluster {
        MemoryCluster::builder()
            .default_pool("data", 3)
            .pool("fast", 2)
            .directory("/a/b")
            .stripe_unit_granularity(4096)
            .build()
    }

    #[test]
    fn builder_creates_directories() {
        let c = cluster();
        assert!(c.contains(Path::new("/a")));
        assert!(c.contains(Path::new("/a/b")));
        assert!(c.stat(Path::new("/a/b")).unwrap().is_dir());
    }

    #[test]
    fn default_pool_when_unset() {
        let c = MemoryCluster::new();
        assert_eq!(c.default_pool(), "data");
        assert_eq!(c.pool_replication("data").unwrap(), 3);
    }

    #[test]
    fn children_lists_direct_entries_only() {
        let c = cluster();
        c.mkdir(Path::new("/a/c"), Permissions::default_dir()).unwrap();
        c.mkdir(Path::new("/a-b"), Permissions::default_dir()).unwrap();
        let mut names = c.children(Path::new("/a")).unwrap();
        names.sort();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn rename_moves_subtree() {
        let c = cluster();
        let ino = c
            .open(
                Path::new("/a/b/f"),
                OpenFlags::CREATE,
                Permissions::default_file(),
                None,
            )
            .unwrap();
        c.write(ino, b"xyz", 0, false).unwrap();

        c.rename(Path::new("/a"), Path::new("/z")).unwrap();
        assert!(!c.contains(Path::new("/a")));
        assert!(!c.contains(Path::new("/a/b/f")));
        assert_eq!(c.stat(Path::new("/z/b/f")).unwrap().size, 3);
    }

    #[test]
    fn rename_into_own_subtree_fails() {
        let c = cluster();
        let err = c.rename(Path::new("/a"), Path::new("/a/b/a")).unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument { .. }));
    }

    #[test]
    fn rmdir_requires_empty() {
        let c = cluster();
        let err = c.rmdir(Path::new("/a")).unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
        c.rmdir(Path::new("/a/b")).unwrap();
        c.rmdir(Path::new("/a")).unwrap();
    }

    #[test]
    fn open_rejects_unaligned_layout() {
        let c = cluster();
        let layout = FileLayout::single_stripe(5000, "data");
        let err = c
            .open(
                Path::new("/f"),
                OpenFlags::CREATE,
                Permissions::default_file(),
                Some(&layout),
            )
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument { .. }));
    }

    #[test]
    fn open_rejects_unknown_pool() {
        let c = cluster();
        let layout = FileLayout::single_stripe(8192, "nope");
        let err = c
            .open(
                Path::new("/f"),
                OpenFlags::CREATE,
                Permissions::default_file(),
                Some(&layout),
            )
            .unwrap_err();
        assert!(matches!(err, FsError::PoolLookup { .. }));
    }

    #[test]
    fn placement_is_deterministic_and_distinct() {
        let mut builder = MemoryCluster::builder();
        for id in 0..5 {
            builder = builder.osd(id, IpAddr::from([10, 0, 0, id as u8]), vec![]);
        }
        let c = builder.build();
        let first = c.place(7, 3, 3);
        assert_eq!(first, c.place(7, 3, 3));
        assert_eq!(first.len(), 3);
        let mut dedup = first.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 3);
        assert_eq!(c.place(7, 3, 9).len(), 5);
    }

    #[test]
    fn handle_table_rejects_closed() {
        let table = HandleTable::default();
        let h = table.insert(OpenFile {
            ino: 1,
            flags: OpenFlags::READ,
        });
        assert!(table.get(h).is_ok());
        table.remove(h).unwrap();
        assert!(matches!(table.get(h), Err(FsError::InvalidHandle { .. })));
        assert!(table.remove(h).is_err());
    }
}

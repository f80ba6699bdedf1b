//! # cephfs-adapter
//!
//! Hadoop-style **hierarchical filesystem semantics over a Ceph cluster
//! session**.
//!
//! The cluster client already knows how to open, read, stat and rename
//! single entries. This crate adds what a filesystem framework expects on
//! top: relative paths, pool placement by replication factor, aligned block
//! sizes, replica locations per byte range, and recursive `mkdirs` and
//! `delete`.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use cephfs_adapter::{CephFileSystem, MemoryCluster, MemoryMount, MountConfig, Permissions};
//! use std::io::{Read, Write};
//! use std::path::Path;
//!
//! let cluster = MemoryCluster::builder()
//!     .default_pool("data", 3)
//!     .pool("scratch", 1)
//!     .stripe_unit_granularity(4096)
//!     .build();
//! let config = MountConfig::from_properties([("ceph.data.pools", "scratch")]).unwrap();
//! let fs = CephFileSystem::initialize(MemoryMount::mount(&cluster, &config).unwrap(), &config).unwrap();
//!
//! let mut out = fs
//!     .create(Path::new("/tmp/part-0"), Permissions::default_file(), false, 1, 5000)
//!     .unwrap();
//! out.write_all(b"records").unwrap();
//! out.close().unwrap();
//!
//! let status = fs.get_file_status(Path::new("/tmp/part-0")).unwrap();
//! assert_eq!(status.replication, 1);
//! assert_eq!(status.block_size, 8192);
//!
//! let mut text = String::new();
//! fs.open(Path::new("/tmp/part-0")).unwrap().read_to_string(&mut text).unwrap();
//! assert_eq!(text, "records");
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`CephFileSystem`] | The façade: create, open, rename, delete, status, block locations |
//! | [`ClusterSession`] | Everything a session must provide |
//! | [`MountContext`] | Working directory and per-mount defaults |
//! | [`MountConfig`] / [`GatewayConfig`] | Recognized options |
//! | [`FileStatus`] | Status of a path |
//! | [`BlockLocation`] | Replica locations of a byte range |
//! | [`FsError`] | Error type with context |
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! Layer 1 (Basic):   SessionIo + SessionNamespace + SessionMount = BasicSession
//!                                                                ↓
//! Layer 2 (Cluster): BasicSession + SessionPlacement + SessionTopology = ClusterSession
//! ```
//!
//! Both composites have blanket implementations. [`TreeExt`] adds recursive
//! operations to every [`SessionNamespace`].
//!
//! ---
//!
//! ## Backends
//!
//! [`MemoryCluster`] simulates a cluster in process. Open it as a
//! cluster-native mount ([`MemoryMount`]) or through its object gateway
//! ([`MemoryGateway`], rooted at one bucket, no append).
//!
//! ---
//!
//! ## Logging
//!
//! Operations emit [`tracing`] events: `debug` per call, `info` when a
//! requested replication or block size cannot be honored exactly, `warn`
//! for skipped data pools and failed implicit closes, `error` when a file
//! handle disappears during a block-location walk. Install any subscriber
//! to see them.

// Private modules
mod context;
mod error;
mod filesystem;
mod path_resolver;
mod placement;
mod stream;
mod topology;
mod traits;
mod tree;
mod types;

// Public modules
pub mod backend;
pub mod config;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{
    DirEntry, FileExtent, FileLayout, FileStatus, FileType, Handle, NodeId, OpenFlags,
    Permissions, SetAttr, StatFs, StatRecord,
};

// Public re-exports - Layer 1 session traits
pub use traits::{BasicSession, ReadDirIter, SessionIo, SessionMount, SessionNamespace};

// Public re-exports - Layer 2 session traits
pub use traits::{ClusterSession, SessionPlacement, SessionTopology};

// Public re-exports - path resolution and mount settings
pub use context::{MountContext, MountContextBuilder};
pub use path_resolver::{PathResolver, resolve_against};

// Public re-exports - configuration
pub use config::{GatewayConfig, MountConfig};

// Public re-exports - placement and topology
pub use placement::{PoolChoice, select_data_pool, select_from};
pub use topology::{
    BlockLocation, BlockLocations, CrushBucket, GatewayLocation, TierKind, TopologyLocation,
    TopologyPath, TopologyTier,
};

// Public re-exports - tree operations and streams
pub use stream::{ClusterInputStream, ClusterOutputStream};
pub use tree::TreeExt;

// Public re-exports - façade
pub use filesystem::{CephFileSystem, MAX_BLOCK_SIZE, align_block_size};

// Public re-exports - in-memory backend
pub use backend::memory::{MemoryCluster, MemoryGateway, MemoryMount};

//! # In-Memory Cluster
//!
//! A simulated cluster for tests and local development. One
//! [`MemoryCluster`] holds pools, storage nodes, gateway endpoints and a
//! shared namespace; [`MemoryMount`] and [`MemoryGateway`] are the two ways
//! to open a session on it.
//!
//! ```rust
//! use cephfs_adapter::{CephFileSystem, MemoryCluster, MemoryMount, MountConfig};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let cluster = MemoryCluster::builder().stripe_unit_granularity(4096).build();
//! let config = MountConfig::default();
//! let fs = CephFileSystem::initialize(MemoryMount::mount(&cluster, &config).unwrap(), &config).unwrap();
//!
//! let mut out = fs.create_default(Path::new("/hello.txt"), true).unwrap();
//! out.write_all(b"hello").unwrap();
//! out.close().unwrap();
//! assert_eq!(fs.get_file_status(Path::new("/hello.txt")).unwrap().length, 5);
//! ```

mod cluster;
mod gateway;
mod mount;
mod rooted;

pub use cluster::{
    DEFAULT_CLUSTER_OBJECT_SIZE, DEFAULT_STRIPE_UNIT_GRANULARITY, MemoryCluster,
    MemoryClusterBuilder,
};
pub use gateway::MemoryGateway;
pub use mount::MemoryMount;

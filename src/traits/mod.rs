//! # Session Traits
//!
//! The capability traits a cluster session implements. The façade is
//! written once against these and is parameterized over the session type,
//! so the cluster-native mount and the object-gateway backend share all
//! path, placement, topology and tree logic.
//!
//! ## Trait Layers
//!
//! ```text
//! Layer 1 (Basic):   SessionIo + SessionNamespace + SessionMount = BasicSession
//!                                                                ↓
//! Layer 2 (Cluster): BasicSession + SessionPlacement + SessionTopology = ClusterSession
//! ```
//!
//! | Layer | Composite Trait | Component Traits | Used By |
//! |-------|-----------------|------------------|---------|
//! | 1 | [`BasicSession`] | [`SessionIo`], [`SessionNamespace`], [`SessionMount`] | Streams, tree operations |
//! | 2 | [`ClusterSession`] | + [`SessionPlacement`], [`SessionTopology`] | [`CephFileSystem`](crate::CephFileSystem) |
//!
//! ## Blanket Implementations
//!
//! Both composites have blanket implementations. Implement the component
//! traits and the composite comes for free.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. Whether concurrent
//! calls are actually safe is the session's business: the adapter neither
//! serializes nor multiplexes them.

mod session_io;
mod session_mount;
mod session_namespace;
mod session_placement;
mod session_topology;

// Layer 1
pub use session_io::SessionIo;
pub use session_mount::SessionMount;
pub use session_namespace::{ReadDirIter, SessionNamespace};

// Layer 2
pub use session_placement::SessionPlacement;
pub use session_topology::SessionTopology;

/// A session that can do file I/O and namespace operations.
///
/// Automatically implemented for any type implementing [`SessionIo`],
/// [`SessionNamespace`] and [`SessionMount`].
///
/// # Example
///
/// ```rust
/// use cephfs_adapter::{BasicSession, FsError};
/// use std::path::Path;
///
/// fn count_children<S: BasicSession>(session: &S, dir: &Path) -> Result<usize, FsError> {
///     Ok(session.listdir(dir)?.collect_all()?.len())
/// }
/// ```
pub trait BasicSession: SessionIo + SessionNamespace + SessionMount {}

// Blanket implementation
impl<T: SessionIo + SessionNamespace + SessionMount> BasicSession for T {}

/// A full cluster session: basic operations plus pool placement and
/// replica topology.
///
/// Automatically implemented for any type implementing [`BasicSession`],
/// [`SessionPlacement`] and [`SessionTopology`].
///
/// # Example
///
/// ```rust
/// use cephfs_adapter::{ClusterSession, FsError, OpenFlags, Permissions};
/// use std::path::Path;
///
/// fn root_pool<S: ClusterSession>(session: &S) -> Result<String, FsError> {
///     let handle = session.open(Path::new("/"), OpenFlags::READ, Permissions::default_dir())?;
///     let pool = session.file_pool_name(handle);
///     session.close(handle)?;
///     pool
/// }
/// ```
pub trait ClusterSession: BasicSession + SessionPlacement + SessionTopology {}

// Blanket implementation
impl<T: BasicSession + SessionPlacement + SessionTopology> ClusterSession for T {}

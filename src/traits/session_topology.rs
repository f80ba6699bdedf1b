//! Extent and node-location queries backing block-location lookups.

use std::net::IpAddr;

use crate::{FileExtent, FsError, Handle, NodeId, TopologyPath};

/// Extent and node-location queries.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn SessionTopology`.
pub trait SessionTopology: Send + Sync {
    /// The extent of an open file containing `offset`, with its replica
    /// nodes primary first. Offsets past end of file still map through the
    /// file layout.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidHandle`] if the handle is invalid or closed
    fn extent_at(&self, handle: Handle, offset: u64) -> Result<FileExtent, FsError>;

    /// Network address of a storage node.
    ///
    /// # Errors
    ///
    /// - [`FsError::NodeNotFound`] if the node is unknown
    fn node_address(&self, node: NodeId) -> Result<IpAddr, FsError>;

    /// Location hierarchy of a storage node, leaf to root.
    ///
    /// # Errors
    ///
    /// - [`FsError::NodeNotFound`] if the node is unknown
    fn node_topology(&self, node: NodeId) -> Result<TopologyPath, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_topology_is_object_safe() {
        fn _check(_: &dyn SessionTopology) {}
    }
}

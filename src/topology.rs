//! Replica topology: location hierarchies of storage nodes and the lazy
//! block-location walk over an open file.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{FsError, Handle, SessionTopology};

/// Kind of a location tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierKind {
    /// A physical host.
    Host,
    /// A rack or other failure domain grouping hosts.
    Rack,
    /// Any other tier (row, room, datacenter, root...).
    Other(String),
}

impl TierKind {
    fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "host" => TierKind::Host,
            "rack" => TierKind::Rack,
            other => TierKind::Other(other.to_string()),
        }
    }
}

/// One named tier of a node's location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopologyTier {
    /// Kind of tier.
    pub kind: TierKind,
    /// Name of the bucket at this tier.
    pub name: String,
}

/// A bucket of a CRUSH location as reported by a cluster-native session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrushBucket {
    /// Bucket type, e.g. `host`, `rack`, `root`.
    pub type_name: String,
    /// Bucket name.
    pub name: String,
}

impl CrushBucket {
    /// Convenience constructor.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// Location of an object-gateway endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayLocation {
    /// Host serving the endpoint.
    pub host: String,
    /// Zone of the endpoint; treated as the rack-level failure domain.
    pub zone: Option<String>,
}

/// Ordered location hierarchy of a storage node, leaf to root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyPath(Vec<TopologyTier>);

impl TopologyPath {
    /// Build from tiers, leaf first.
    pub fn new(tiers: Vec<TopologyTier>) -> Self {
        Self(tiers)
    }

    /// Build from a CRUSH location. Bucket types other than `host` and
    /// `rack` are kept as [`TierKind::Other`].
    pub fn from_crush(buckets: &[CrushBucket]) -> Self {
        Self(
            buckets
                .iter()
                .map(|b| TopologyTier {
                    kind: TierKind::from_type_name(&b.type_name),
                    name: b.name.clone(),
                })
                .collect(),
        )
    }

    /// Build from a gateway endpoint location.
    pub fn from_gateway(location: &GatewayLocation) -> Self {
        let mut tiers = vec![TopologyTier {
            kind: TierKind::Host,
            name: location.host.clone(),
        }];
        if let Some(zone) = &location.zone {
            tiers.push(TopologyTier {
                kind: TierKind::Rack,
                name: zone.clone(),
            });
        }
        Self(tiers)
    }

    /// All tiers, leaf first.
    pub fn tiers(&self) -> &[TopologyTier] {
        &self.0
    }

    /// Name of the first host tier.
    pub fn host(&self) -> Option<&str> {
        self.first_of(&TierKind::Host)
    }

    /// Name of the first rack tier.
    pub fn rack(&self) -> Option<&str> {
        self.first_of(&TierKind::Rack)
    }

    fn first_of(&self, kind: &TierKind) -> Option<&str> {
        self.0
            .iter()
            .find(|tier| &tier.kind == kind)
            .map(|tier| tier.name.as_str())
    }
}

/// Where one replica of a block lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLocation {
    /// Network address of the storage node.
    pub address: IpAddr,
    /// Host name, if the node's location has a host tier.
    pub host: Option<String>,
    /// Rack name, if the node's location has a rack tier.
    pub rack: Option<String>,
}

impl TopologyLocation {
    /// Rack used in network paths when the location has none.
    pub const DEFAULT_RACK: &'static str = "default-rack";

    /// Hadoop-style network topology path, `/<rack>/<host>`. A missing host
    /// falls back to the node address.
    pub fn network_path(&self) -> String {
        let rack = self.rack.as_deref().unwrap_or(Self::DEFAULT_RACK);
        match &self.host {
            Some(host) => format!("/{rack}/{host}"),
            None => format!("/{rack}/{}", self.address),
        }
    }
}

impl fmt::Display for TopologyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.network_path(), self.address)
    }
}

/// A byte range of a file and the replicas holding it, primary first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    /// Start of the range within the file.
    pub offset: u64,
    /// Length of the range.
    pub length: u64,
    /// Replica locations.
    pub replicas: Vec<TopologyLocation>,
}

impl BlockLocation {
    /// Host names of the replicas that have one.
    pub fn hosts(&self) -> Vec<&str> {
        self.replicas.iter().filter_map(|r| r.host.as_deref()).collect()
    }
}

/// Lazy walk over the extents covering `[start, start + length)` of an open
/// file.
///
/// Each item is clipped to the window, so the items are contiguous and cover
/// the window exactly. The walk stops after the first error.
pub struct BlockLocations<'a, S: SessionTopology + ?Sized> {
    session: &'a S,
    handle: Handle,
    cursor: u64,
    end: u64,
    failed: bool,
}

impl<'a, S: SessionTopology + ?Sized> BlockLocations<'a, S> {
    /// Start a walk. A zero `length` yields nothing.
    pub fn new(session: &'a S, handle: Handle, start: u64, length: u64) -> Self {
        Self {
            session,
            handle,
            cursor: start,
            end: start.saturating_add(length),
            failed: false,
        }
    }

    fn locate(&self, node: crate::NodeId) -> Result<TopologyLocation, FsError> {
        let address = self.session.node_address(node)?;
        let path = self.session.node_topology(node)?;
        Ok(TopologyLocation {
            address,
            host: path.host().map(str::to_string),
            rack: path.rack().map(str::to_string),
        })
    }

    fn step(&mut self) -> Result<BlockLocation, FsError> {
        let extent = self.session.extent_at(self.handle, self.cursor)?;
        let extent_end = extent.offset.saturating_add(extent.length);
        if extent.length == 0 || extent_end <= self.cursor {
            return Err(FsError::Session(format!(
                "extent at offset {} does not advance",
                self.cursor
            )));
        }

        let replicas = extent
            .nodes
            .iter()
            .map(|&node| self.locate(node))
            .collect::<Result<Vec<_>, _>>()?;

        let offset = self.cursor;
        let next = extent_end.min(self.end);
        self.cursor = next;
        Ok(BlockLocation {
            offset,
            length: next - offset,
            replicas,
        })
    }
}

impl<S: SessionTopology + ?Sized> Iterator for BlockLocations<'_, S> {
    type Item = Result<BlockLocation, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.end {
            return None;
        }
        let item = self.step();
        self.failed = item.is_err();
        Some(item)
    }
}

impl<S: SessionTopology + ?Sized> fmt::Debug for BlockLocations<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLocations")
            .field("handle", &self.handle)
            .field("cursor", &self.cursor)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

//! Core types shared by the sessions and the filesystem façade.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Raw stat information as reported by a session.
///
/// Produced per call and never cached by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits.
    pub permissions: Permissions,
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time.
    pub accessed: SystemTime,
    /// Preferred block size (the object size of the file layout).
    pub block_size: u64,
    /// Inode number.
    pub inode: u64,
}

impl StatRecord {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

impl Default for StatRecord {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            permissions: Permissions::default_file(),
            modified: SystemTime::UNIX_EPOCH,
            accessed: SystemTime::UNIX_EPOCH,
            block_size: 0,
            inode: 0,
        }
    }
}

/// Status of a path as exposed by [`CephFileSystem`](crate::CephFileSystem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Length in bytes (0 for directories).
    pub length: u64,
    /// Type of the entry.
    pub file_type: FileType,
    /// Replication factor of the pool holding the file.
    pub replication: u32,
    /// Block size of the file layout.
    pub block_size: u64,
    /// Last modification time.
    #[serde(with = "system_time_millis")]
    pub modification_time: SystemTime,
    /// Last access time.
    #[serde(with = "system_time_millis")]
    pub access_time: SystemTime,
    /// Permission bits.
    pub permission: Permissions,
}

impl FileStatus {
    /// Build a status from a raw stat record.
    pub fn from_stat(path: PathBuf, stat: &StatRecord, replication: u32) -> Self {
        Self {
            path,
            length: stat.size,
            file_type: stat.file_type,
            replication,
            block_size: stat.block_size,
            modification_time: stat.modified,
            access_time: stat.accessed,
            permission: stat.permissions,
        }
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// A directory entry returned from `listdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (filename only, not full path).
    pub name: String,
    /// Full path to the entry, in the session's namespace.
    pub path: PathBuf,
}

/// Unix-style permissions stored as a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Cluster capacity, as reported by `statfs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFs {
    /// Total size in bytes.
    pub total_bytes: u64,
    /// Currently used bytes.
    pub used_bytes: u64,
    /// Available bytes for use.
    pub available_bytes: u64,
    /// Fundamental block size in bytes.
    pub block_size: u64,
}

/// Opaque file handle returned by a session on open.
///
/// Owned by whoever opened it until closed; the adapter never pools or
/// shares handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

/// Identifier of a storage node (OSD) holding replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Flags for opening a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Truncate file to zero length.
    pub truncate: bool,
    /// Append to end of file.
    pub append: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
        append: false,
    };

    /// Write access, creating the file when missing.
    pub const CREATE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: false,
        append: false,
    };

    /// Write access with create and truncate.
    pub const CREATE_TRUNCATE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
        append: false,
    };

    /// Append mode on an existing file.
    pub const APPEND: Self = Self {
        read: false,
        write: true,
        create: false,
        truncate: false,
        append: true,
    };
}

/// Placement hints handed to the session when a file is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLayout {
    /// Stripe unit in bytes.
    pub stripe_unit: u64,
    /// Number of objects a stripe spans.
    pub stripe_count: u32,
    /// Object size in bytes.
    pub object_size: u64,
    /// Pool that stores the file data.
    pub pool: Option<String>,
}

impl FileLayout {
    /// A layout with one object per stripe, where stripe unit and object
    /// size are both `block_size`.
    pub fn single_stripe(block_size: u64, pool: impl Into<String>) -> Self {
        Self {
            stripe_unit: block_size,
            stripe_count: 1,
            object_size: block_size,
            pool: Some(pool.into()),
        }
    }
}

/// Attribute changes applied by `setattr`. `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttr {
    /// New permission bits.
    pub mode: Option<Permissions>,
    /// New modification time.
    pub mtime: Option<SystemTime>,
    /// New access time.
    pub atime: Option<SystemTime>,
}

impl SetAttr {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.mtime.is_none() && self.atime.is_none()
    }
}

/// One extent of a file as mapped by the cluster: a contiguous byte range
/// and the nodes holding its replicas, primary first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtent {
    /// Byte offset of the extent within the file.
    pub offset: u64,
    /// Length of the extent in bytes.
    pub length: u64,
    /// Replica-holding nodes.
    pub nodes: Vec<NodeId>,
}

/// Timestamps as milliseconds since the Unix epoch, the unit Hadoop-style
/// callers expect.
mod system_time_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

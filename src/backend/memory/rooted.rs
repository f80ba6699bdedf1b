//! Namespace view shared by both in-memory front-ends: a cluster seen
//! through a root directory, with its own handle table.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::cluster::{HandleTable, MemoryCluster, OpenFile};
use crate::{
    DirEntry, FileLayout, FsError, Handle, OpenFlags, Permissions, ReadDirIter, SetAttr,
    StatRecord,
};

pub(crate) struct Rooted {
    cluster: MemoryCluster,
    root: PathBuf,
    handles: HandleTable,
    mounted: AtomicBool,
}

impl Rooted {
    /// Mount `root`, which must be an existing directory of the cluster.
    pub(crate) fn new(cluster: MemoryCluster, root: PathBuf) -> Result<Self, FsError> {
        let stat = cluster.stat(&root)?;
        if !stat.is_dir() {
            return Err(FsError::NotADirectory { path: root });
        }
        debug!(root = %root.display(), "mounted");
        Ok(Self {
            cluster,
            root,
            handles: HandleTable::default(),
            mounted: AtomicBool::new(true),
        })
    }

    pub(crate) fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn open_handles(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn live(&self) -> Result<(), FsError> {
        if self.mounted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FsError::Session("not mounted".into()))
        }
    }

    /// Map a session path under the root. Paths with `..` are rejected.
    fn to_cluster(&self, path: &Path) -> Result<PathBuf, FsError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(FsError::invalid_argument(format!(
                "parent directory component in {}",
                path.display()
            )));
        }
        Ok(match path.strip_prefix("/") {
            Ok(rel) if !rel.as_os_str().is_empty() => self.root.join(rel),
            Ok(_) => self.root.clone(),
            Err(_) => self.root.join(path),
        })
    }

    fn to_session(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.root) {
            Ok(rel) => Path::new("/").join(rel),
            Err(_) => path.to_path_buf(),
        }
    }

    /// Rewrite cluster paths in an error to paths under this root.
    fn localize(&self, error: FsError) -> FsError {
        match error {
            FsError::NotFound { path } => FsError::NotFound {
                path: self.to_session(&path),
            },
            FsError::AlreadyExists { path, operation } => FsError::AlreadyExists {
                path: self.to_session(&path),
                operation,
            },
            FsError::NotADirectory { path } => FsError::NotADirectory {
                path: self.to_session(&path),
            },
            FsError::IsADirectory { path } => FsError::IsADirectory {
                path: self.to_session(&path),
            },
            FsError::DirectoryNotEmpty { path } => FsError::DirectoryNotEmpty {
                path: self.to_session(&path),
            },
            FsError::PermissionDenied { path, operation } => FsError::PermissionDenied {
                path: self.to_session(&path),
                operation,
            },
            other => other,
        }
    }

    /// The open file behind a handle, if its inode still exists.
    pub(crate) fn file(&self, handle: Handle) -> Result<OpenFile, FsError> {
        self.live()?;
        self.handles.get(handle)
    }

    pub(crate) fn layout(&self, handle: Handle) -> Result<FileLayout, FsError> {
        let file = self.file(handle)?;
        self.cluster
            .layout_of(file.ino)
            .ok_or(FsError::InvalidHandle { handle })
    }

    // -------------------------------------------------------------------------
    // Handle I/O
    // -------------------------------------------------------------------------

    pub(crate) fn open(
        &self,
        path: &Path,
        flags: OpenFlags,
        mode: Permissions,
        layout: Option<&FileLayout>,
    ) -> Result<Handle, FsError> {
        self.live()?;
        let ino = self
            .cluster
            .open(&self.to_cluster(path)?, flags, mode, layout)
            .map_err(|e| self.localize(e))?;
        Ok(self.handles.insert(OpenFile { ino, flags }))
    }

    pub(crate) fn read_at(
        &self,
        handle: Handle,
        buf: &mut [u8],
        offset: u64,
    ) -> Result<usize, FsError> {
        let file = self.file(handle)?;
        self.cluster
            .read(file.ino, buf, offset)
            .ok_or(FsError::InvalidHandle { handle })
    }

    pub(crate) fn write_at(&self, handle: Handle, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let file = self.file(handle)?;
        if !file.flags.write && !file.flags.append {
            return Err(FsError::PermissionDenied {
                path: PathBuf::new(),
                operation: "write",
            });
        }
        self.cluster
            .write(file.ino, data, offset, file.flags.append)
            .ok_or(FsError::InvalidHandle { handle })
    }

    pub(crate) fn fstat(&self, handle: Handle) -> Result<StatRecord, FsError> {
        let file = self.file(handle)?;
        self.cluster
            .stat_ino(file.ino)
            .ok_or(FsError::InvalidHandle { handle })
    }

    pub(crate) fn fsync(&self, handle: Handle) -> Result<(), FsError> {
        self.file(handle).map(|_| ())
    }

    pub(crate) fn close(&self, handle: Handle) -> Result<(), FsError> {
        self.live()?;
        self.handles.remove(handle).map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Namespace
    // -------------------------------------------------------------------------

    pub(crate) fn lstat(&self, path: &Path) -> Result<StatRecord, FsError> {
        self.live()?;
        self.cluster
            .stat(&self.to_cluster(path)?)
            .map_err(|e| self.localize(e))
    }

    pub(crate) fn listdir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        self.live()?;
        let names = self
            .cluster
            .children(&self.to_cluster(path)?)
            .map_err(|e| self.localize(e))?;
        let entries: Vec<_> = names
            .into_iter()
            .map(|name| {
                Ok(DirEntry {
                    path: path.join(&name),
                    name,
                })
            })
            .collect();
        Ok(ReadDirIter::from_vec(entries))
    }

    pub(crate) fn mkdir(&self, path: &Path, mode: Permissions) -> Result<(), FsError> {
        self.live()?;
        self.cluster
            .mkdir(&self.to_cluster(path)?, mode)
            .map_err(|e| self.localize(e))
    }

    pub(crate) fn unlink(&self, path: &Path) -> Result<(), FsError> {
        self.live()?;
        self.cluster
            .unlink(&self.to_cluster(path)?)
            .map_err(|e| self.localize(e))
    }

    pub(crate) fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        self.live()?;
        let target = self.to_cluster(path)?;
        if target == self.root {
            return Err(FsError::PermissionDenied {
                path: path.to_path_buf(),
                operation: "rmdir",
            });
        }
        self.cluster.rmdir(&target).map_err(|e| self.localize(e))
    }

    pub(crate) fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.live()?;
        let source = self.to_cluster(from)?;
        if source == self.root {
            return Err(FsError::invalid_argument("cannot rename the mount root"));
        }
        self.cluster
            .rename(&source, &self.to_cluster(to)?)
            .map_err(|e| self.localize(e))
    }

    pub(crate) fn setattr(&self, path: &Path, attr: &SetAttr) -> Result<(), FsError> {
        self.live()?;
        self.cluster
            .setattr(&self.to_cluster(path)?, attr)
            .map_err(|e| self.localize(e))
    }

    pub(crate) fn unmount(&self) -> Result<(), FsError> {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return Err(FsError::Session("already unmounted".into()));
        }
        let leaked = self.handles.len();
        if leaked > 0 {
            debug!(handles = leaked, "dropping open handles on unmount");
        }
        self.handles.clear();
        Ok(())
    }
}

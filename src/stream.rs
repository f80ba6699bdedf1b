//! Byte streams over an open session handle.
//!
//! Each stream owns exactly one handle and closes it once, either through
//! `close` or when dropped.

use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::warn;

use crate::{FsError, Handle, SessionIo};

/// Sequential, seekable reads from a file.
///
/// Returned by [`CephFileSystem::open`](crate::CephFileSystem::open).
pub struct ClusterInputStream<'a, S: SessionIo + ?Sized> {
    session: &'a S,
    handle: Option<Handle>,
    position: u64,
    size: u64,
}

impl<'a, S: SessionIo + ?Sized> ClusterInputStream<'a, S> {
    /// Wrap an open handle. `size` is the file length at open time.
    pub fn new(session: &'a S, handle: Handle, size: u64) -> Self {
        Self {
            session,
            handle: Some(handle),
            position: 0,
            size,
        }
    }

    /// Length of the file when it was opened.
    pub fn len(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the file was empty when opened.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Close the handle and report any failure.
    ///
    /// # Errors
    ///
    /// - Whatever the session reports for `close`
    pub fn close(mut self) -> Result<(), FsError> {
        match self.handle.take() {
            Some(handle) => self.session.close(handle),
            None => Ok(()),
        }
    }

    fn handle(&self) -> io::Result<Handle> {
        self.handle
            .ok_or_else(|| io::Error::other("stream is closed"))
    }
}

impl<S: SessionIo + ?Sized> Read for ClusterInputStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let handle = self.handle()?;
        let n = self.session.read_at(handle, buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<S: SessionIo + ?Sized> Seek for ClusterInputStream<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.position = target;
        Ok(target)
    }
}

impl<S: SessionIo + ?Sized> Drop for ClusterInputStream<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.session.close(handle) {
                warn!(handle = handle.0, error = %e, "failed to close input stream");
            }
        }
    }
}

impl<S: SessionIo + ?Sized> std::fmt::Debug for ClusterInputStream<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterInputStream")
            .field("handle", &self.handle)
            .field("position", &self.position)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Sequential writes to a file.
///
/// Returned by [`CephFileSystem::create`](crate::CephFileSystem::create) and
/// [`CephFileSystem::append`](crate::CephFileSystem::append). `flush` syncs
/// the data to the cluster.
pub struct ClusterOutputStream<'a, S: SessionIo + ?Sized> {
    session: &'a S,
    handle: Option<Handle>,
    position: u64,
}

impl<'a, S: SessionIo + ?Sized> ClusterOutputStream<'a, S> {
    /// Wrap an open handle, writing from `position`.
    pub fn new(session: &'a S, handle: Handle, position: u64) -> Self {
        Self {
            session,
            handle: Some(handle),
            position,
        }
    }

    /// Offset the next write goes to.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Sync and close the handle.
    ///
    /// # Errors
    ///
    /// - Whatever the session reports for `fsync` or `close`; the handle is
    ///   closed even when the sync fails
    pub fn close(mut self) -> Result<(), FsError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let synced = self.session.fsync(handle);
        let closed = self.session.close(handle);
        synced?;
        closed
    }

    fn handle(&self) -> io::Result<Handle> {
        self.handle
            .ok_or_else(|| io::Error::other("stream is closed"))
    }
}

impl<S: SessionIo + ?Sized> Write for ClusterOutputStream<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let handle = self.handle()?;
        let n = self.session.write_at(handle, buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        let handle = self.handle()?;
        self.session.fsync(handle)?;
        Ok(())
    }
}

impl<S: SessionIo + ?Sized> Drop for ClusterOutputStream<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.session.close(handle) {
                warn!(handle = handle.0, error = %e, "failed to close output stream");
            }
        }
    }
}

impl<S: SessionIo + ?Sized> std::fmt::Debug for ClusterOutputStream<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterOutputStream")
            .field("handle", &self.handle)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OpenFlags, Permissions, StatRecord};
    use parking_lot::Mutex;
    use std::path::Path;

    /// One in-memory file behind handle 1.
    #[derive(Default)]
    struct OneFile {
        data: Mutex<Vec<u8>>,
        open: Mutex<bool>,
        syncs: Mutex<usize>,
    }

    impl SessionIo for OneFile {
        fn open(&self, _: &Path, _: OpenFlags, _: Permissions) -> Result<Handle, FsError> {
            *self.open.lock() = true;
            Ok(Handle(1))
        }

        fn read_at(&self, handle: Handle, buf: &mut [u8], offset: u64) -> Result<usize, FsError> {
            if !*self.open.lock() {
                return Err(FsError::InvalidHandle { handle });
            }
            let data = self.data.lock();
            let start = (offset as usize).min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            Ok(n)
        }

        fn write_at(&self, handle: Handle, buf: &[u8], offset: u64) -> Result<usize, FsError> {
            if !*self.open.lock() {
                return Err(FsError::InvalidHandle { handle });
            }
            let mut data = self.data.lock();
            let end = offset as usize + buf.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[offset as usize..end].copy_from_slice(buf);
            Ok(buf.len())
        }

        fn fstat(&self, _: Handle) -> Result<StatRecord, FsError> {
            Ok(StatRecord {
                size: self.data.lock().len() as u64,
                ..Default::default()
            })
        }

        fn fsync(&self, _: Handle) -> Result<(), FsError> {
            *self.syncs.lock() += 1;
            Ok(())
        }

        fn close(&self, handle: Handle) -> Result<(), FsError> {
            let mut open = self.open.lock();
            if !*open {
                return Err(FsError::InvalidHandle { handle });
            }
            *open = false;
            Ok(())
        }
    }

    fn opened(session: &OneFile) -> Handle {
        session
            .open(Path::new("/f"), OpenFlags::READ, Permissions::default_file())
            .unwrap()
    }

    #[test]
    fn write_then_read_back() {
        let session = OneFile::default();
        let mut out = ClusterOutputStream::new(&session, opened(&session), 0);
        out.write_all(b"hello world").unwrap();
        assert_eq!(out.position(), 11);
        out.close().unwrap();
        assert_eq!(*session.syncs.lock(), 1);
        assert!(!*session.open.lock());

        let mut input = ClusterInputStream::new(&session, opened(&session), 11);
        let mut text = String::new();
        input.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn seek_from_end_and_current() {
        let session = OneFile::default();
        *session.data.lock() = b"0123456789".to_vec();
        let mut input = ClusterInputStream::new(&session, opened(&session), 10);

        input.seek(SeekFrom::End(-3)).unwrap();
        let mut buf = [0u8; 3];
        input.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"789");

        input.seek(SeekFrom::Current(-5)).unwrap();
        input.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], b'5');

        assert!(input.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn drop_closes_handle() {
        let session = OneFile::default();
        {
            let _input = ClusterInputStream::new(&session, opened(&session), 0);
            assert!(*session.open.lock());
        }
        assert!(!*session.open.lock());
    }

    #[test]
    fn output_starts_at_given_position() {
        let session = OneFile::default();
        *session.data.lock() = b"abc".to_vec();
        let mut out = ClusterOutputStream::new(&session, opened(&session), 3);
        out.write_all(b"def").unwrap();
        out.flush().unwrap();
        drop(out);
        assert_eq!(&*session.data.lock(), b"abcdef");
    }
}

//! File-backed store

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, TowerError};

use super::{check_write_range, in_range, Store, STORE_HEADER_SIZE};

/// Store persisted to a random-access file
///
/// ## Concurrency:
/// - `allocate` bumps the size counter and rewrites the header under the file
///   mutex, so a closed store never grows and header writes happen in
///   allocation order
/// - `size()` is an atomic load and never takes the mutex
/// - Reads and writes take the file mutex for the seek + transfer, so a read
///   never observes half of a concurrent write
pub struct FileStore {
    path: PathBuf,
    file: Mutex<Option<File>>,
    size: AtomicU64,
    delete_on_close: bool,
}

impl FileStore {
    /// Open or create the store at `path`, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), false)
    }

    /// Open a scratch store that is deleted (not flushed) on close
    pub fn open_temporary(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, delete_on_close: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let size = Self::determine_size(&mut file)?;
        debug!(path = %path.display(), size, "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
            size: AtomicU64::new(size),
            delete_on_close,
        })
    }

    /// Size from the header, or a fresh header for an empty file
    fn determine_size(file: &mut File) -> Result<u64> {
        let physical = file.metadata()?.len();
        if physical < STORE_HEADER_SIZE {
            Self::write_header(file, STORE_HEADER_SIZE)?;
            return Ok(STORE_HEADER_SIZE);
        }

        let mut header = [0u8; STORE_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        let size = u64::from_be_bytes(header);
        if size < STORE_HEADER_SIZE {
            return Err(TowerError::Corruption(format!(
                "store header records size {} (below the header itself)",
                size
            )));
        }
        Ok(size)
    }

    fn write_header(file: &mut File, size: u64) -> Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&size.to_be_bytes())?;
        Ok(())
    }

    /// Whether the file is removed instead of flushed on close
    pub fn is_temporary(&self) -> bool {
        self.delete_on_close
    }

    fn remove_file(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read as much of `buf` as the file holds; the rest stays zeroed
fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl Store for FileStore {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    fn allocate(&self, size: u64) -> Result<u64> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(TowerError::StoreClosed)?;

        let position = self.size.fetch_add(size, Ordering::AcqRel);
        Self::write_header(file, self.size.load(Ordering::Acquire))?;
        Ok(position)
    }

    fn read(&self, position: u64, size: usize) -> Result<Option<Bytes>> {
        if !in_range(position, size, self.size()) {
            return Ok(None);
        }

        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(TowerError::StoreClosed)?;

        // Allocated space past the physical end of file reads as zeroes
        let mut buf = vec![0u8; size];
        file.seek(SeekFrom::Start(position))?;
        read_fully(file, &mut buf)?;
        Ok(Some(Bytes::from(buf)))
    }

    fn write(&self, bytes: &[u8], position: u64) -> Result<usize> {
        check_write_range(position, bytes.len(), self.size())?;

        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(TowerError::StoreClosed)?;
        file.seek(SeekFrom::Start(position))?;
        file.write_all(bytes)?;
        Ok(bytes.len())
    }

    fn commit(&self) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(TowerError::StoreClosed)?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn close(&self) -> Result<bool> {
        let Some(mut file) = self.file.lock().take() else {
            return Ok(false);
        };

        if self.delete_on_close {
            drop(file);
            self.remove_file()?;
            debug!(path = %self.path.display(), "deleted temporary store");
        } else {
            file.flush()?;
            file.sync_all()?;
            debug!(path = %self.path.display(), size = self.size(), "closed file store");
        }
        Ok(true)
    }

    fn delete(&self) -> Result<()> {
        drop(self.file.lock().take());
        self.remove_file()
    }

    fn reset(&self) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(TowerError::StoreClosed)?;

        file.set_len(STORE_HEADER_SIZE)?;
        self.size.store(STORE_HEADER_SIZE, Ordering::Release);
        Self::write_header(file, STORE_HEADER_SIZE)?;
        debug!(path = %self.path.display(), "reset file store");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("size", &self.size())
            .field("temporary", &self.delete_on_close)
            .finish()
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to close store on drop");
        }
    }
}

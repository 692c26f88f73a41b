//! Read-only access to carving sources (image files and block devices).

use crate::error::{CarveError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A source opened for reading only.
///
/// Block devices report a zero length through their metadata, so the size is
/// measured by seeking to the end instead.
#[derive(Debug)]
pub struct SourceReader {
    path: PathBuf,
    file: File,
    size: u64,
}

impl SourceReader {
    /// Opens `path`, failing with [`CarveError::InputNotFound`] before any
    /// read when it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.try_exists().map_err(|e| CarveError::read(path, e))? {
            return Err(CarveError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(false)
            .open(path)
            .map_err(|e| CarveError::read(path, e))?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{Advice, fadvise};

            let _ = fadvise(&file, 0, None, Advice::Sequential);
        }

        let size = file
            .seek(SeekFrom::End(0))
            .and_then(|end| file.seek(SeekFrom::Start(0)).map(|_| end))
            .map_err(|e| CarveError::read(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads at most `limit` bytes from the start of the source
    pub fn read_prefix(&mut self, limit: u64) -> Result<Vec<u8>> {
        let len = limit.min(self.size);
        self.read_range(0, len)
    }

    /// Reads `len` bytes starting at `offset`.
    ///
    /// Fails with [`CarveError::ReadFailure`] if the source ends early.
    pub fn read_range(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(&mut buf))
            .map_err(|e| CarveError::read(&self.path, e))?;
        Ok(buf)
    }

    /// Sequential reader over the whole source, starting at offset 0
    pub fn stream(&mut self) -> Result<impl Read + '_> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| CarveError::read(&self.path, e))?;
        let size = self.size;
        Ok((&mut self.file).take(size))
    }
}

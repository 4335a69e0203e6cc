//! Pager for fixdb
//!
//! This module handles positioned byte I/O against a single file. Every
//! open file in the engine is owned by exactly one pager; the engine is
//! single-threaded, so no locking is involved.

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Sized, positioned byte I/O against one file
#[derive(Debug)]
pub struct Pager {
    file: File,
}

impl Pager {
    /// Create a new file, truncating any existing content
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Open an existing file in read/write mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Open a file, creating it empty when it does not exist
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Current file length in bytes
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Read exactly `buf.len()` bytes at `offset`; reads past the end of
    /// the file fail with an I/O error
    pub fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write `buf` at `offset`, extending the file when writing past the
    /// current end
    pub fn write(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_extends_and_read_back() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::create(dir.path().join("p.bin")).unwrap();
        assert_eq!(pager.size().unwrap(), 0);

        pager.write(10, b"hello").unwrap();
        assert_eq!(pager.size().unwrap(), 15);

        let mut buf = [0u8; 5];
        pager.read(10, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        // the gap is zero-filled
        let mut gap = [9u8; 10];
        pager.read(0, &mut gap).unwrap();
        assert_eq!(gap, [0u8; 10]);
    }

    #[test]
    fn test_read_past_eof_is_error() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::create(dir.path().join("p.bin")).unwrap();
        pager.write(0, b"abc").unwrap();

        let mut buf = [0u8; 8];
        assert!(pager.read(0, &mut buf).is_err());
        assert!(pager.read(100, &mut buf[..1]).is_err());
    }

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempdir().unwrap();
        assert!(Pager::open(dir.path().join("missing.bin")).is_err());
    }
}

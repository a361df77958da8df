//! Random-access byte sources
//!
//! The index engine only ever reads from a source. [`FileSource`] maps a file
//! read-only; [`MemorySource`] wraps an owned buffer (tests, carved data).

use crate::error::{IndexError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

/// Read-only random-access view over a fixed-length byte sequence
///
/// `len()` never changes for the lifetime of a handle and `read_range`
/// never yields bytes outside `[0, len)`.
pub trait ByteSource: Send + Sync {
    /// Total number of bytes in the source
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy bytes starting at `offset` into `buf`
    ///
    /// Returns the number of bytes copied, clamped at end of source.
    /// Offsets at or past the end copy nothing.
    fn read_range(&self, offset: u64, buf: &mut [u8]) -> usize;

    /// Stable identity of this source, used as the cache key
    fn identity(&self) -> String;

    /// Backing file path, if any (enables sidecar persistence)
    fn path(&self) -> Option<&Path> {
        None
    }

    /// Whole contents as one slice when they are already addressable
    fn as_bytes(&self) -> Option<&[u8]> {
        None
    }
}

/// Copy from `data` into `buf`, clamped at the end of `data`
#[inline]
fn copy_clamped(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let Ok(start) = usize::try_from(offset) else {
        return 0;
    };
    if start >= data.len() {
        return 0;
    }
    let count = buf.len().min(data.len() - start);
    buf[..count].copy_from_slice(&data[start..start + count]);
    count
}

/// Memory-mapped file source
pub struct FileSource {
    path: PathBuf,
    /// `None` for empty files, which cannot be mapped on every platform
    mmap: Option<Mmap>,
    len: u64,
    identity: String,
}

impl FileSource {
    /// Open and map a file read-only
    pub fn open(path: &Path) -> Result<Self> {
        let canonical = path
            .canonicalize()
            .map_err(|e| IndexError::io(path, e))?;
        let file = File::open(&canonical).map_err(|e| IndexError::io(&canonical, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| IndexError::io(&canonical, e))?;
        let len = metadata.len();

        let mmap = if len == 0 {
            None
        } else {
            // The map is read-only; truncating the file underneath a live map is
            // the caller's problem, as with any mmap reader.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IndexError::io(&canonical, e))?;
            Some(mmap)
        };

        let mtime = metadata
            .modified()
            .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos())
            .unwrap_or(0);
        let identity = format!("{}|{}|{}", canonical.display(), len, mtime);

        Ok(Self {
            path: canonical,
            mmap,
            len,
            identity,
        })
    }

    /// Canonical path of the mapped file
    pub fn file_path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, offset: u64, buf: &mut [u8]) -> usize {
        match &self.mmap {
            Some(mmap) => copy_clamped(mmap, offset, buf),
            None => 0,
        }
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        Some(self.mmap.as_deref().unwrap_or(&[]))
    }
}

static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory source with a per-instance identity
pub struct MemorySource {
    data: Vec<u8>,
    identity: String,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let id = NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed);
        let identity = format!("mem:{}|{}", id, data.len());
        Self { data, identity }
    }

    /// Use a caller-chosen identity (e.g. a digest of the contents)
    pub fn with_identity(data: impl Into<Vec<u8>>, identity: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            identity: identity.into(),
        }
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, offset: u64, buf: &mut [u8]) -> usize {
        copy_clamped(&self.data, offset, buf)
    }

    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_memory_read_range_clamps() {
        let source = MemorySource::new(b"hello".to_vec());
        let mut buf = [0u8; 4];

        assert_eq!(source.read_range(0, &mut buf), 4);
        assert_eq!(&buf, b"hell");

        assert_eq!(source.read_range(3, &mut buf), 2);
        assert_eq!(&buf[..2], b"lo");

        assert_eq!(source.read_range(5, &mut buf), 0);
        assert_eq!(source.read_range(u64::MAX, &mut buf), 0);
    }

    #[test]
    fn test_memory_identities_differ() {
        let a = MemorySource::new(b"same".to_vec());
        let b = MemorySource::new(b"same".to_vec());
        assert_ne!(a.identity(), b.identity());
        assert!(a.path().is_none());

        let c = MemorySource::with_identity(b"same".to_vec(), "fixed");
        assert_eq!(c.identity(), "fixed");
    }

    #[test]
    fn test_file_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        fs::write(&path, b"\x00\x01\x02\x03binary").unwrap();

        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.len(), 10);
        assert_eq!(source.as_bytes().unwrap(), b"\x00\x01\x02\x03binary");

        let mut buf = [0u8; 6];
        assert_eq!(source.read_range(4, &mut buf), 6);
        assert_eq!(&buf, b"binary");

        let identity = source.identity();
        assert!(identity.contains("sample.bin|10|"));
        assert_eq!(source.path().unwrap(), source.file_path());
    }

    #[test]
    fn test_empty_file_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();

        let source = FileSource::open(&path).unwrap();
        assert!(source.is_empty());
        assert_eq!(source.as_bytes().unwrap(), b"");

        let mut buf = [0u8; 4];
        assert_eq!(source.read_range(0, &mut buf), 0);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = FileSource::open(&dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, IndexError::Io { .. }));
    }
}

//! Suffix array writer
//!
//! Persists a suffix array and its LCP array to a sidecar file. The data is
//! written to a temporary file first and renamed into place, so readers
//! never observe a half-written sidecar.

use super::types::*;
use crate::error::{IndexError, Result};
use crate::index::types::SuffixEntry;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes sidecar index files
pub struct SuffixArrayWriter;

impl SuffixArrayWriter {
    /// Write `sa` and `lcp` to `path`, replacing any existing sidecar
    pub fn write(path: &Path, sa: &[SuffixEntry], lcp: &[u32]) -> Result<()> {
        if sa.len() != lcp.len() {
            return Err(IndexError::Build(format!(
                "suffix array and LCP lengths differ ({} vs {})",
                sa.len(),
                lcp.len()
            )));
        }
        let length = i32::try_from(sa.len()).map_err(|_| IndexError::SourceTooLarge {
            len: sa.len() as u64,
            limit: i32::MAX as u64,
        })?;

        let tmp_path = temp_path(path);
        let result = Self::write_file(&tmp_path, length, sa, lcp)
            .and_then(|()| fs::rename(&tmp_path, path).map_err(|e| IndexError::io(path, e)));

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn write_file(path: &Path, length: i32, sa: &[SuffixEntry], lcp: &[u32]) -> Result<()> {
        let io_err = |e: std::io::Error| IndexError::io(path, e);
        let file = File::create(path).map_err(io_err)?;
        let mut file = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        file.write_all(&IndexHeader::new(length).to_bytes())
            .map_err(io_err)?;
        Self::write_entries(&mut file, sa).map_err(io_err)?;
        Self::write_entries(&mut file, lcp).map_err(io_err)?;

        let file = file.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }

    /// Write entries as little-endian `i32`s
    fn write_entries<W: Write>(out: &mut W, entries: &[u32]) -> std::io::Result<()> {
        // Using a buffer to reduce per-entry write overhead
        let mut buffer = Vec::with_capacity(WRITE_BUFFER_SIZE);
        for &entry in entries {
            buffer.extend_from_slice(&(entry as i32).to_le_bytes());
            if buffer.len() >= WRITE_BUFFER_SIZE {
                out.write_all(&buffer)?;
                buffer.clear();
            }
        }
        if !buffer.is_empty() {
            out.write_all(&buffer)?;
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("banana.idx");

        SuffixArrayWriter::write(&path, &[5, 3, 1, 0, 4, 2], &[0, 1, 3, 0, 0, 2]).unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len() as u64, sidecar_size(6));
        assert_eq!(&data[0..4], &1i32.to_le_bytes());
        assert_eq!(&data[4..8], &6i32.to_le_bytes());
        assert_eq!(&data[8..12], &5i32.to_le_bytes());
        assert_eq!(&data[32..36], &0i32.to_le_bytes());
        assert_eq!(&data[40..44], &3i32.to_le_bytes());

        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_write_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.idx");

        SuffixArrayWriter::write(&path, &[], &[]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.idx");
        fs::write(&path, b"garbage that is not an index").unwrap();

        SuffixArrayWriter::write(&path, &[0], &[0]).unwrap();
        assert_eq!(fs::read(&path).unwrap().len() as u64, sidecar_size(1));
    }

    #[test]
    fn test_mismatched_lengths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.idx");

        let err = SuffixArrayWriter::write(&path, &[0, 1], &[0]).unwrap_err();
        assert!(matches!(err, IndexError::Build(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("x.idx");

        let err = SuffixArrayWriter::write(&path, &[0], &[0]).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }
}

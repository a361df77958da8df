//! Suffix array reader
//!
//! Loads a persisted sidecar through a read-only memory map and validates it
//! before handing the arrays back. Anything that does not look like an index
//! for the expected source is reported as corrupt; the caller decides to
//! rebuild.

use super::types::*;
use crate::error::{IndexError, Result};
use crate::index::types::{IndexOrigin, SuffixEntry, SuffixIndex};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Reader for sidecar index files
pub struct SuffixArrayReader;

impl SuffixArrayReader {
    /// Load and validate the sidecar at `path`
    ///
    /// Returns `Ok(None)` if no sidecar exists. When `expected_len` is given,
    /// a sidecar built for a different source length is rejected as stale.
    pub fn load(path: &Path, expected_len: Option<u64>) -> Result<Option<SuffixIndex>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexError::io(path, e)),
        };

        let file_len = file.metadata().map_err(|e| IndexError::io(path, e))?.len();
        if file_len < HEADER_SIZE as u64 {
            return Err(IndexError::corrupt(path, "file too small for header"));
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IndexError::io(path, e))?;
        let (header, payload) = mmap.split_at(HEADER_SIZE);
        let header = parse_header(path, header)?;
        let n = header.length as usize;

        if let Some(expected) = expected_len {
            if expected != n as u64 {
                return Err(IndexError::corrupt(
                    path,
                    format!("stale index: built for {} bytes, source has {}", n, expected),
                ));
            }
        }

        if file_len != sidecar_size(n) {
            return Err(IndexError::corrupt(
                path,
                format!(
                    "expected {} bytes for {} suffixes, found {}",
                    sidecar_size(n),
                    n,
                    file_len
                ),
            ));
        }

        let (sa_bytes, lcp_bytes) = payload.split_at(n * ENTRY_SIZE);
        let sa = decode_entries(path, sa_bytes, n)?;
        let lcp = decode_entries(path, lcp_bytes, n)?;
        validate(path, &sa, &lcp)?;

        Ok(Some(SuffixIndex::new(sa, lcp, IndexOrigin::Sidecar)))
    }

    /// Read only the header of a sidecar
    pub fn read_header(path: &Path) -> Result<Option<IndexHeader>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexError::io(path, e)),
        };

        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => Ok(Some(IndexHeader::from_bytes(&header))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(IndexError::corrupt(path, "file too small for header"))
            }
            Err(e) => Err(IndexError::io(path, e)),
        }
    }

    /// Delete a sidecar; a missing file is not an error
    pub fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(IndexError::io(path, e)),
        }
    }
}

fn parse_header(path: &Path, bytes: &[u8]) -> Result<IndexHeader> {
    let bytes: &[u8; HEADER_SIZE] = bytes
        .try_into()
        .map_err(|_| IndexError::corrupt(path, "file too small for header"))?;
    let header = IndexHeader::from_bytes(bytes);

    if header.version != INDEX_VERSION {
        return Err(IndexError::corrupt(
            path,
            format!("unsupported version {}", header.version),
        ));
    }
    if header.length < 0 {
        return Err(IndexError::corrupt(
            path,
            format!("negative length {}", header.length),
        ));
    }
    Ok(header)
}

fn decode_entries(path: &Path, bytes: &[u8], n: usize) -> Result<Vec<u32>> {
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(n)
        .map_err(|_| IndexError::AllocationFailure {
            bytes: n * ENTRY_SIZE,
        })?;

    for chunk in bytes.chunks_exact(ENTRY_SIZE) {
        let value = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let value = u32::try_from(value)
            .map_err(|_| IndexError::corrupt(path, format!("negative entry {}", value)))?;
        entries.push(value);
    }
    Ok(entries)
}

/// Range checks plus a permutation check on the suffix array
fn validate(path: &Path, sa: &[SuffixEntry], lcp: &[u32]) -> Result<()> {
    let n = sa.len();
    let mut seen = vec![false; n];
    for &pos in sa {
        let pos = pos as usize;
        if pos >= n {
            return Err(IndexError::corrupt(
                path,
                format!("suffix offset {} out of range", pos),
            ));
        }
        if std::mem::replace(&mut seen[pos], true) {
            return Err(IndexError::corrupt(
                path,
                format!("suffix offset {} appears twice", pos),
            ));
        }
    }

    if lcp.first().is_some_and(|&l| l != 0) {
        return Err(IndexError::corrupt(path, "lcp[0] must be 0"));
    }
    if let Some((i, &l)) = lcp
        .iter()
        .enumerate()
        .find(|&(i, &l)| i > 0 && l as usize >= n)
    {
        return Err(IndexError::corrupt(
            path,
            format!("lcp[{}] = {} exceeds source length", i, l),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::suffix_array::writer::SuffixArrayWriter;
    use tempfile::tempdir;

    const SA: [u32; 6] = [5, 3, 1, 0, 4, 2];
    const LCP: [u32; 6] = [0, 1, 3, 0, 0, 2];

    fn setup_sidecar() -> (tempfile::TempDir, std::path::PathBuf) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("banana.bin.idx");
        SuffixArrayWriter::write(&path, &SA, &LCP).unwrap();
        (temp_dir, path)
    }

    fn expect_corrupt(path: &Path, expected_len: Option<u64>) -> String {
        match SuffixArrayReader::load(path, expected_len) {
            Err(IndexError::PersistedIndexCorrupt { reason, .. }) => reason,
            other => panic!("expected corrupt index, got {:?}", other.map(|o| o.is_some())),
        }
    }

    #[test]
    fn test_round_trip() {
        let (_temp_dir, path) = setup_sidecar();
        let index = SuffixArrayReader::load(&path, Some(6)).unwrap().unwrap();

        assert_eq!(index.sa(), &SA);
        assert_eq!(index.lcp(), &LCP);
        assert_eq!(index.origin(), IndexOrigin::Sidecar);
    }

    #[test]
    fn test_missing_sidecar() {
        let temp_dir = tempdir().unwrap();
        let result = SuffixArrayReader::load(&temp_dir.path().join("nope.idx"), None).unwrap();
        assert!(result.is_none());
        assert!(SuffixArrayReader::read_header(&temp_dir.path().join("nope.idx"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_index_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("empty.idx");
        SuffixArrayWriter::write(&path, &[], &[]).unwrap();

        let index = SuffixArrayReader::load(&path, Some(0)).unwrap().unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_version_mismatch() {
        let (_temp_dir, path) = setup_sidecar();
        let mut data = fs::read(&path).unwrap();
        data[0..4].copy_from_slice(&2i32.to_le_bytes());
        fs::write(&path, &data).unwrap();

        assert!(expect_corrupt(&path, None).contains("version"));
    }

    #[test]
    fn test_truncated() {
        let (_temp_dir, path) = setup_sidecar();
        let data = fs::read(&path).unwrap();

        fs::write(&path, &data[..data.len() - 3]).unwrap();
        assert!(expect_corrupt(&path, None).contains("expected"));

        fs::write(&path, &data[..5]).unwrap();
        assert!(expect_corrupt(&path, None).contains("header"));
        assert!(matches!(
            SuffixArrayReader::read_header(&path),
            Err(IndexError::PersistedIndexCorrupt { .. })
        ));
    }

    #[test]
    fn test_stale_length() {
        let (_temp_dir, path) = setup_sidecar();
        assert!(expect_corrupt(&path, Some(7)).contains("stale"));
    }

    #[test]
    fn test_not_a_permutation() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("dup.idx");
        SuffixArrayWriter::write(&path, &[0, 0, 1], &[0, 0, 0]).unwrap();
        assert!(expect_corrupt(&path, None).contains("twice"));

        SuffixArrayWriter::write(&path, &[0, 9, 1], &[0, 0, 0]).unwrap();
        assert!(expect_corrupt(&path, None).contains("out of range"));
    }

    #[test]
    fn test_negative_entry() {
        let (_temp_dir, path) = setup_sidecar();
        let mut data = fs::read(&path).unwrap();
        data[8..12].copy_from_slice(&(-1i32).to_le_bytes());
        fs::write(&path, &data).unwrap();

        assert!(expect_corrupt(&path, None).contains("negative"));
    }

    #[test]
    fn test_read_header() {
        let (_temp_dir, path) = setup_sidecar();
        let header = SuffixArrayReader::read_header(&path).unwrap().unwrap();
        assert_eq!(header, IndexHeader::new(6));
    }

    #[test]
    fn test_remove() {
        let (_temp_dir, path) = setup_sidecar();
        assert!(SuffixArrayReader::remove(&path).unwrap());
        assert!(!SuffixArrayReader::remove(&path).unwrap());
    }
}

//! Types for the persisted suffix array sidecar
//!
//! A sidecar sits next to the source it indexes (`<source>.idx`) and holds:
//!
//! ```text
//! i32 version          (INDEX_VERSION)
//! i32 length           (n, one suffix per source byte)
//! i32[n] suffix array
//! i32[n] lcp array
//! ```
//!
//! All integers are little-endian. There is no checksum; the loader instead
//! validates sizes, value ranges and that the suffix array is a permutation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Current (and only) sidecar format version
pub const INDEX_VERSION: i32 = 1;

/// Header size in bytes: version + length
pub const HEADER_SIZE: usize = 4 + 4;

/// Size of each persisted entry
pub const ENTRY_SIZE: usize = 4;

/// Buffer size used when writing sidecars
pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Expected sidecar size in bytes for `n` suffixes
pub fn sidecar_size(n: usize) -> u64 {
    HEADER_SIZE as u64 + 2 * n as u64 * ENTRY_SIZE as u64
}

/// Sidecar path for a source: the extension is appended, not substituted
///
/// `dump.bin` with extension `idx` becomes `dump.bin.idx`.
pub fn sidecar_path(source_path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(source_path.as_os_str());
    name.push(".");
    name.push(extension.trim_start_matches('.'));
    PathBuf::from(name)
}

/// Header of a persisted index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: i32,
    pub length: i32,
}

impl IndexHeader {
    pub fn new(length: i32) -> Self {
        Self {
            version: INDEX_VERSION,
            length,
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let [v0, v1, v2, v3, l0, l1, l2, l3] = *bytes;
        Self {
            version: i32::from_le_bytes([v0, v1, v2, v3]),
            length: i32::from_le_bytes([l0, l1, l2, l3]),
        }
    }
}

//! Suffix array indexing module
//!
//! This module provides O(m log n) exact byte-pattern search over a single
//! source using a suffix array, plus the LCP array used for repeat analysis.
//!
//! ## Architecture
//!
//! - `builder`: Constructs suffix and LCP arrays (prefix doubling + Kasai)
//! - `backend`: Pluggable construction strategies (rayon CPU backend)
//! - `search`: Binary search for pattern occurrences
//! - `writer`: Persists arrays to a sidecar file
//! - `reader`: Memory-mapped loading and validation of sidecars
//! - `types`: Sidecar format definitions
//!
//! ## File Format
//!
//! One sidecar per source, named `<source>.idx`: an `i32` version, an `i32`
//! length `n`, then `n` suffix offsets and `n` LCP values, all little-endian
//! `i32`.

pub mod backend;
pub mod builder;
pub mod reader;
pub mod search;
pub mod types;
pub mod writer;

// Re-exports for convenience
pub use backend::{BuildBackend, CpuBackend};
pub use builder::{BuiltSuffixArray, SuffixArrayBuilder, verify_lcp, verify_suffix_array};
pub use reader::SuffixArrayReader;
pub use search::{MatchContext, SearchHits, SuffixSearcher, match_context, scan, search};
pub use types::{INDEX_VERSION, IndexHeader, sidecar_path};
pub use writer::SuffixArrayWriter;

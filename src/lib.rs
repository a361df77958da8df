//! # binsa - Suffix Array Search for Binary Data
//!
//! binsa indexes a single binary source (a disk image, memory dump or any
//! other file) with a suffix array so that every occurrence of an arbitrary
//! byte pattern can be found in O(m log n) time, and repeated content can be
//! enumerated from the LCP array.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Suffix array construction, search, persistence and caching
//! - [`source`] - Random-access byte sources (memory-mapped files, buffers)
//! - [`query`] - Pattern parsing (escaped text, literal text, hex)
//! - [`output`] - Offset listings and hex dumps of matches
//! - [`error`] - Error types
//! - [`utils`] - Configuration and terminal progress
//!
//! ## Quick Start
//!
//! ```no_run
//! use binsa::index::{ForensicIndexService, IndexConfig, NoProgress};
//! use binsa::source::FileSource;
//! use std::path::Path;
//!
//! let service = ForensicIndexService::new(IndexConfig::default()).unwrap();
//! let source = FileSource::open(Path::new("/evidence/disk.img")).unwrap();
//!
//! // Loads the `.idx` sidecar if present, otherwise builds and persists it
//! let index = service.get_or_build(&source, &NoProgress).unwrap();
//!
//! for offset in service.search(&source, &index, b"\x4d\x5a\x90\x00") {
//!     println!("MZ header at 0x{:x}", offset);
//! }
//! ```
//!
//! ## Performance
//!
//! Construction is parallel prefix doubling on rayon: each round orders
//! suffixes by rank pairs with two stable counting sorts, and stops as soon
//! as every suffix is distinguished. The LCP array follows in one linear
//! Kasai pass. Built indexes are persisted next to the source and loaded
//! through a memory map on later runs.

pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod source;
pub mod utils;

pub use error::{IndexError, PatternError, Result};
pub use index::{ForensicIndexService, IndexConfig, SuffixIndex};
pub use source::{ByteSource, FileSource, MemorySource};

//! Suffix index engine
//!
//! - [`suffix_array`] - Construction, search and sidecar persistence
//! - [`service`] - Cache-aware façade with single-flight builds
//! - [`cache`] - Bounded FIFO/LRU cache of built indexes
//! - [`repeats`] - Repeated-substring analysis over the LCP array
//! - [`progress`] - Progress events and cooperative cancellation
//! - [`stats`] - Human-readable sidecar and index summaries

pub mod cache;
pub mod progress;
pub mod repeats;
pub mod service;
pub mod stats;
pub mod suffix_array;
pub mod types;

pub use cache::SuffixIndexCache;
pub use progress::{CancelFlag, NoProgress, ProgressEvent, ProgressSink, Stage};
pub use repeats::{Repeat, distinct_substrings, longest_repeat, top_repeats};
pub use service::{CacheStats, ForensicIndexService};
pub use types::*;

//! Error types for index construction, persistence and lookup

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by the index engine
///
/// The type is `Clone` so a single failed build can be handed to every
/// caller waiting on the same in-flight build.
#[derive(Error, Debug, Clone)]
pub enum IndexError {
    #[error("source is too large for in-memory indexing: {len} bytes (limit: {limit} bytes)")]
    SourceTooLarge { len: u64, limit: u64 },

    #[error("persisted index {} is corrupt: {reason}", .path.display())]
    PersistedIndexCorrupt { path: PathBuf, reason: String },

    #[error("failed to allocate {bytes} bytes for index construction")]
    AllocationFailure { bytes: usize },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("index build was cancelled")]
    Cancelled,

    #[error("index build failed: {0}")]
    Build(String),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IndexError::PersistedIndexCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from reading or writing a persisted index
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            IndexError::PersistedIndexCorrupt { .. } | IndexError::Io { .. }
        )
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors produced while turning user input into a byte pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("invalid hex string (must have an even number of digits, got {0})")]
    OddHexLength(usize),

    #[error("invalid hex digit {digit:?} at position {position}")]
    InvalidHexDigit { digit: char, position: usize },

    #[error("invalid escape sequence {sequence:?} at position {position}")]
    InvalidEscape { sequence: String, position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IndexError::SourceTooLarge {
            len: 200,
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "source is too large for in-memory indexing: 200 bytes (limit: 100 bytes)"
        );

        let err = IndexError::corrupt("/tmp/a.bin.idx", "truncated");
        assert_eq!(
            err.to_string(),
            "persisted index /tmp/a.bin.idx is corrupt: truncated"
        );
    }

    #[test]
    fn test_persistence_classification() {
        let io = IndexError::io("/x", io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(io.is_persistence());
        assert!(IndexError::corrupt("/x", "bad").is_persistence());
        assert!(!IndexError::Cancelled.is_persistence());
        assert!(!IndexError::AllocationFailure { bytes: 4 }.is_persistence());
    }

    #[test]
    fn test_clone_keeps_source() {
        use std::error::Error as _;

        let err = IndexError::io("/x", io::Error::new(io::ErrorKind::NotFound, "gone"));
        let cloned = err.clone();
        assert!(cloned.source().is_some());
        assert_eq!(err.to_string(), cloned.to_string());
    }
}

//! Progress reporting for long-running index builds
//!
//! The engine emits [`ProgressEvent`]s to a [`ProgressSink`]; presenting them
//! is the consumer's job (see `utils::progress` for the terminal bar).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Build stage reported to progress sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the source or a persisted index into memory
    Loading,
    BuildingSuffixArray,
    BuildingLcp,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loading => "loading",
            Stage::BuildingSuffixArray => "building suffix array",
            Stage::BuildingLcp => "building LCP array",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current: u64,
    pub total: u64,
    /// 0.0 to 100.0, non-decreasing within a stage
    pub percentage: f64,
}

impl ProgressEvent {
    pub fn new(stage: Stage, current: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            (current as f64 * 100.0 / total as f64).min(100.0)
        };
        Self {
            stage,
            current,
            total,
            percentage,
        }
    }

    pub fn complete(total: u64) -> Self {
        Self::new(Stage::Complete, total, total)
    }
}

/// Receiver of build progress
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Cooperative cancellation flag, checked at round boundaries
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so it can guard another build
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

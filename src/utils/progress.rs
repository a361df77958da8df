//! Progress bar abstraction that becomes no-op when the `progress` feature is disabled

use crate::index::progress::{ProgressEvent, ProgressSink, Stage};
use std::sync::{Mutex, PoisonError};

#[cfg(feature = "progress")]
pub use indicatif::{ProgressBar, ProgressStyle};

#[cfg(not(feature = "progress"))]
pub use self::noop::*;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}";

/// Terminal progress display: one bar per build stage
pub struct TerminalProgress {
    current: Mutex<Option<(Stage, ProgressBar)>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn start_bar(stage: Stage, total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        bar.set_message(stage.as_str());
        bar
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn report(&self, event: &ProgressEvent) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        if event.stage == Stage::Complete {
            if let Some((_, bar)) = current.take() {
                bar.finish_and_clear();
            }
            return;
        }

        let same_stage = matches!(&*current, Some((stage, _)) if *stage == event.stage);
        if !same_stage {
            if let Some((_, bar)) = current.take() {
                bar.finish_and_clear();
            }
            *current = Some((event.stage, Self::start_bar(event.stage, event.total)));
        }

        if let Some((_, bar)) = current.as_ref() {
            bar.set_length(event.total);
            bar.set_position(event.current);
        }
    }
}

#[cfg(not(feature = "progress"))]
mod noop {
    /// No-op progress bar when `progress` feature is disabled
    #[derive(Clone)]
    pub struct ProgressBar;

    impl ProgressBar {
        pub fn new(_len: u64) -> Self {
            ProgressBar
        }

        pub fn set_style(&self, _style: ProgressStyle) {}
        pub fn set_message(&self, _msg: impl Into<std::borrow::Cow<'static, str>>) {}
        pub fn set_length(&self, _len: u64) {}
        pub fn set_position(&self, _pos: u64) {}
        pub fn finish_and_clear(&self) {}
    }

    /// No-op progress style
    pub struct ProgressStyle;

    impl ProgressStyle {
        pub fn default_bar() -> Self {
            ProgressStyle
        }

        pub fn template(self, _template: &str) -> Result<Self, std::convert::Infallible> {
            Ok(self)
        }

        pub fn progress_chars(self, _chars: &str) -> Self {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_transitions() {
        let progress = TerminalProgress::new();

        progress.report(&ProgressEvent::new(Stage::Loading, 0, 10));
        progress.report(&ProgressEvent::new(Stage::Loading, 10, 10));
        progress.report(&ProgressEvent::new(Stage::BuildingSuffixArray, 1, 4));
        {
            let current = progress.current.lock().unwrap();
            assert_eq!(current.as_ref().map(|(s, _)| *s), Some(Stage::BuildingSuffixArray));
        }

        progress.report(&ProgressEvent::complete(10));
        assert!(progress.current.lock().unwrap().is_none());
    }
}

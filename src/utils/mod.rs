//! Utility functions shared by the library and the CLI.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory and `config.json` management
//! - [`progress`] - Terminal progress bars (no-op without the `progress` feature)

pub mod app_data;
pub mod progress;

pub use app_data::*;
pub use progress::TerminalProgress;

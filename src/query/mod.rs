//! Search pattern input
//!
//! Turns command-line pattern arguments (text with escapes, literal text or
//! hex) into the byte strings handed to the suffix array search.

pub mod parser;

pub use parser::{PatternMode, parse_hex, parse_pattern};

#![no_main]

use binsa::query::{PatternMode, parse_pattern};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz pattern parsing - should never panic
    let _ = parse_pattern(data, PatternMode::Escaped);
    let _ = parse_pattern(data, PatternMode::Literal);
    let _ = parse_pattern(data, PatternMode::Hex);
});

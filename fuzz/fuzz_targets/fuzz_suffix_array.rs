#![no_main]

use arbitrary::Arbitrary;
use binsa::index::NoProgress;
use binsa::index::suffix_array::{
    SuffixArrayBuilder, scan, search, verify_lcp, verify_suffix_array,
};
use binsa::source::MemorySource;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    data: Vec<u8>,
    pattern: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Build over arbitrary bytes, check both invariants, and cross-check
    // search and scan against direct window comparison
    let built = SuffixArrayBuilder::with_defaults()
        .build(&input.data, &NoProgress)
        .unwrap();
    assert!(verify_suffix_array(&input.data, &built.suffix_array));
    assert!(verify_lcp(&input.data, &built.suffix_array, &built.lcp));

    let expected: Vec<u64> = if input.pattern.is_empty() {
        Vec::new()
    } else {
        input
            .data
            .windows(input.pattern.len())
            .enumerate()
            .filter(|(_, window)| *window == input.pattern.as_slice())
            .map(|(i, _)| i as u64)
            .collect()
    };

    let source = MemorySource::new(input.data);
    assert_eq!(search(&source, &built.suffix_array, &input.pattern), expected);
    assert_eq!(scan(&source, &input.pattern), expected);
});

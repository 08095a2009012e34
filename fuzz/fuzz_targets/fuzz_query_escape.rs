//! Fuzz target for literal escaping.
//!
//! Caller text is embedded into query strings after escaping. Any input
//! must survive an unescape round trip, and no reserved character may
//! appear without a preceding backslash.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use metacat_core::translate::{escape_query_chars, unescape_query_chars, RESERVED_CHARS};

#[derive(Arbitrary, Debug)]
struct Input {
    literal: String,
}

fuzz_target!(|input: Input| {
    let escaped = escape_query_chars(&input.literal);
    assert_eq!(unescape_query_chars(&escaped), input.literal);

    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            assert!(chars.next().is_some(), "dangling escape in {escaped:?}");
        } else {
            assert!(!RESERVED_CHARS.contains(&c), "bare {c:?} in {escaped:?}");
        }
    }
});
